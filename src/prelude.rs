//! Convenient imports for common usage patterns.
//!
//! ```rust,ignore
//! use html2pdf_overlay_api::prelude::*;
//! ```
//!
//! This imports the manager, factory, configuration, error and service
//! request types, plus `Arc`.

pub use crate::SharedBrowserManager;
pub use crate::config::{ConfigSource, ServiceConfig, ServiceConfigBuilder};
pub use crate::deadline::{CancellationFlag, Deadline};
pub use crate::error::{BrowserError, Result};
pub use crate::factory::{BrowserFactory, ChromeBrowserFactory};
pub use crate::manager::BrowserManager;
pub use crate::service::{
    PdfResponse, PdfServiceError, RenderRequest, RenderSettings, StampImage, generate_pdf,
};
pub use crate::session::SessionGuard;
pub use crate::traits::{BrowserEngine, PageSession, PdfPrintOptions};

#[cfg(feature = "env-config")]
pub use crate::config::env::from_env;

pub use std::sync::Arc;
