//! Browser engine and page session traits.

use std::time::Duration;

use crate::error::Result;

/// One launched headless browser.
///
/// Shared by every in-flight request behind an `Arc`; implementations must be
/// safe to use concurrently. The only thing requests do with it is spawn
/// isolated sessions.
pub trait BrowserEngine: Send + Sync {
    /// Create a new isolated browsing context with a single page.
    ///
    /// # Errors
    ///
    /// - [`BrowserError::SessionCreation`](crate::BrowserError::SessionCreation)
    ///   if the context or page cannot be created
    /// - [`BrowserError::ShuttingDown`](crate::BrowserError::ShuttingDown)
    ///   after [`shutdown`](Self::shutdown)
    fn new_session(&self) -> Result<Box<dyn PageSession>>;

    /// Release the browser process.
    ///
    /// Sessions already handed out may finish; new sessions are refused.
    fn shutdown(&self);
}

/// One isolated browsing context + page, owned by exactly one request.
///
/// Every call blocks the current thread until the engine answers, so sessions
/// are only driven from tokio's blocking pool.
pub trait PageSession: Send {
    /// Identifier of the underlying browsing context (for logs).
    fn id(&self) -> &str;

    /// Upper bound applied by the engine to each following call.
    fn set_timeout(&self, timeout: Duration);

    /// Navigate to `url` and wait until the navigation has committed and the
    /// load event has fired.
    fn navigate(&self, url: &str) -> Result<()>;

    /// Evaluate `script` in the page and return its JSON value
    /// (`Value::Null` for `undefined`).
    ///
    /// With `await_promise`, a returned promise is awaited first.
    fn evaluate(&self, script: &str, await_promise: bool) -> Result<serde_json::Value>;

    /// Network requests the page has started but not yet finished or failed.
    fn pending_requests(&self) -> usize;

    /// Print the current page state.
    fn print_to_pdf(&self, options: &PdfPrintOptions) -> Result<Vec<u8>>;

    /// Close the page and dispose of its browsing context.
    ///
    /// Called at most once, by [`SessionGuard`](crate::SessionGuard).
    fn close(&mut self) -> Result<()>;
}

/// Engine-neutral print settings.
///
/// All lengths are in inches, which is what the DevTools protocol expects.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PdfPrintOptions {
    pub paper_width: f64,
    pub paper_height: f64,
    pub margin: f64,
    pub print_background: bool,
}

/// Centimetres per inch.
const CM_PER_INCH: f64 = 2.54;

impl PdfPrintOptions {
    /// A4 portrait (210 × 297 mm), 1 cm margins on every side, backgrounds on.
    pub fn a4() -> Self {
        Self {
            paper_width: 21.0 / CM_PER_INCH,
            paper_height: 29.7 / CM_PER_INCH,
            margin: 1.0 / CM_PER_INCH,
            print_background: true,
        }
    }
}

impl Default for PdfPrintOptions {
    fn default() -> Self {
        Self::a4()
    }
}
