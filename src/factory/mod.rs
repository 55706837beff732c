//! Browser factory implementations.
//!
//! This module provides the [`BrowserFactory`] trait and implementations
//! for launching browser engines.
//!
//! # Overview
//!
//! The factory pattern abstracts browser launch, allowing:
//! - Custom Chrome launch configurations
//! - Test doubles that count launches and sessions
//!
//! # Available Factories
//!
//! | Factory | Description |
//! |---------|-------------|
//! | [`ChromeBrowserFactory`] | Launches headless Chrome/Chromium |
//! | [`mock::MockBrowserFactory`] | In-memory engine for tests (feature-gated) |
//!
//! # Example
//!
//! ```rust,ignore
//! use html2pdf_overlay_api::{BrowserFactory, ChromeBrowserFactory};
//!
//! let factory = ChromeBrowserFactory::with_defaults();
//! let engine = factory.create()?;
//! let session = engine.new_session()?;
//! ```

mod chrome;

#[cfg(any(test, feature = "test-utils"))]
pub mod mock;

pub use chrome::{ChromeBrowserFactory, ChromeEngine, create_chrome_options};

use std::sync::Arc;

use crate::error::Result;
use crate::traits::BrowserEngine;

/// Trait for launching a browser engine.
///
/// Called by [`BrowserManager`](crate::BrowserManager) at most once per
/// successful launch, on tokio's blocking pool.
///
/// # Thread Safety
///
/// Requires `Send + Sync` because the factory lives inside the shared manager.
pub trait BrowserFactory: Send + Sync {
    /// Launch a new browser engine.
    ///
    /// # Errors
    ///
    /// - [`BrowserError::Configuration`](crate::BrowserError::Configuration) -
    ///   invalid launch options
    /// - [`BrowserError::Launch`](crate::BrowserError::Launch) -
    ///   binary not found, process failed to start, etc.
    fn create(&self) -> Result<Arc<dyn BrowserEngine>>;
}
