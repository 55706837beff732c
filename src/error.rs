//! Error types for the browser layer.
//!
//! This module provides [`BrowserError`], a unified error type for every
//! operation that touches the headless browser (launch, sessions, scripts,
//! printing), and a convenient [`Result`] type alias.
//!
//! Service-level errors that carry an HTTP status live in
//! [`crate::service::PdfServiceError`]; authentication failures live in
//! [`crate::auth::AuthError`].
//!
//! # Example
//!
//! ```rust
//! use html2pdf_overlay_api::{BrowserError, Result};
//!
//! fn render() -> Result<Vec<u8>> {
//!     Err(BrowserError::PdfGeneration("printer offline".to_string()))
//! }
//!
//! match render() {
//!     Ok(pdf) => println!("Generated {} bytes", pdf.len()),
//!     Err(BrowserError::ShuttingDown) => println!("Service is shutting down"),
//!     Err(e) => eprintln!("Error: {}", e),
//! }
//! ```

/// Errors that can occur while driving the headless browser.
///
/// Each variant carries the engine's message for server-side logging. None
/// of these messages are ever sent to HTTP clients.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BrowserError {
    /// Failed to launch the browser process.
    ///
    /// # Common Causes
    ///
    /// - Chrome/Chromium binary not found or not installed
    /// - Invalid `CHROME_PATH`
    /// - Container missing shared libraries
    #[error("Failed to launch browser: {0}")]
    Launch(String),

    /// Failed to create an isolated browsing context or its page.
    #[error("Failed to create browser session: {0}")]
    SessionCreation(String),

    /// Closing a page or disposing of its browsing context failed.
    #[error("Failed to close browser session: {0}")]
    SessionClose(String),

    /// Navigation or document replacement failed.
    #[error("Navigation failed: {0}")]
    Navigation(String),

    /// A script evaluated in the page threw or could not be delivered.
    #[error("Script evaluation failed: {0}")]
    Script(String),

    /// The engine failed to produce a PDF rendition.
    #[error("PDF generation failed: {0}")]
    PdfGeneration(String),

    /// Injected overlay nodes were not confirmed in the DOM in time.
    #[error("Overlay not ready: {0}")]
    OverlayNotReady(String),

    /// The request deadline elapsed before the step completed.
    #[error("Deadline exceeded during {0}")]
    Timeout(String),

    /// The request was cancelled by its caller.
    #[error("Operation cancelled")]
    Cancelled,

    /// The browser manager has been shut down.
    #[error("Browser manager is shutting down")]
    ShuttingDown,

    /// Invalid launch configuration.
    #[error("Configuration error: {0}")]
    Configuration(String),
}

/// Convenience conversion from `&str` to [`BrowserError::Configuration`].
impl From<&str> for BrowserError {
    fn from(msg: &str) -> Self {
        BrowserError::Configuration(msg.to_string())
    }
}

/// Result type alias using [`BrowserError`].
pub type Result<T> = std::result::Result<T, BrowserError>;

// ============================================================================
// Unit Tests
// ============================================================================
