//! # html2pdf-overlay-api
//!
//! HTTP service that renders a URL or an HTML document to PDF through headless
//! Chrome, optionally overlaying a diagonal text watermark and a corner image
//! stamp.
//!
//! Rendering, layout and PDF encoding are left to Chrome. This crate owns the
//! parts around it: one shared browser per process, an isolated browsing
//! context per request, the API-key gate, overlay injection and the HTTP
//! surface.
//!
//! ## Features
//!
//! - **Single-flight launch**: the browser starts lazily, once, however many
//!   requests arrive together
//! - **Per-request isolation**: every render gets its own browsing context,
//!   released on every exit path (RAII)
//! - **Deadlines**: one budget per request, checked before every browser step
//! - **Safe overlays**: untrusted text and images are injected as JSON
//!   literals, never spliced into markup
//! - **Readiness, not sleeps**: overlays are confirmed in the DOM before the
//!   page is printed
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │        axum Router (integrations::axum)     │
//! │   request id ─▶ API-key gate ─▶ handlers    │
//! └─────────────────┬───────────────────────────┘
//!                   │ spawn_blocking + Deadline
//!                   ▼
//! ┌─────────────────────────────────────────────┐
//! │              service::generate_pdf          │
//! │  SessionGuard ─▶ loader ─▶ overlay ─▶ render│
//! └─────────────────┬───────────────────────────┘
//!                   │
//!                   ▼
//! ┌─────────────────────────────────────────────┐
//! │  BrowserManager ─▶ Arc<dyn BrowserEngine>   │
//! │     (one headless Chrome, many contexts)    │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use html2pdf_overlay_api::prelude::*;
//! use html2pdf_overlay_api::integrations::axum::{AppState, build_router};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ServiceConfigBuilder::new().api_key("change-me-please").build()?;
//!
//!     let manager = BrowserManager::new(Box::new(ChromeBrowserFactory::with_defaults()))
//!         .into_shared();
//!
//!     let app = build_router(AppState::new(Arc::clone(&manager), config));
//!     let listener = tokio::net::TcpListener::bind("0.0.0.0:8080").await?;
//!     axum::serve(listener, app).await?;
//!
//!     manager.shutdown();
//!     Ok(())
//! }
//! ```
//!
//! ## Environment Configuration
//!
//! With the `env-config` feature (default), [`config::env::from_env`] reads
//! the process environment and an optional `app.env` file:
//!
//! ```text
//! API_KEY=change-me-please
//! PORT=8080
//! RENDER_TIMEOUT_SECS=60
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Description | Default |
//! |---------|-------------|---------|
//! | `env-config` | Load configuration from environment / `app.env` | ✅ |
//! | `test-utils` | Expose [`factory::mock`] for tests | ❌ |

#![warn(rustdoc::missing_crate_level_docs)]

// ============================================================================
// Modules
// ============================================================================

pub mod auth;
pub mod config;
pub mod deadline;
pub mod error;
pub mod factory;
pub mod integrations;
pub mod manager;
pub mod prelude;
pub mod service;
pub mod session;
pub mod traits;

// ============================================================================
// Re-exports (Public API)
// ============================================================================

pub use auth::{AuthError, mask_key, verify_api_key};
pub use config::{ConfigError, ConfigSource, ServiceConfig, ServiceConfigBuilder};
pub use deadline::{CancellationFlag, Deadline};
pub use error::{BrowserError, Result};
pub use factory::{BrowserFactory, ChromeBrowserFactory, create_chrome_options};
pub use manager::BrowserManager;
pub use session::SessionGuard;
pub use traits::{BrowserEngine, PageSession, PdfPrintOptions};

#[cfg(feature = "env-config")]
pub use config::env::from_env;

/// Shared browser manager type held in application state.
pub type SharedBrowserManager = std::sync::Arc<BrowserManager>;
