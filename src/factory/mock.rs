//! Mock browser factory for testing.
//!
//! This module provides an in-memory [`BrowserFactory`] whose engine and
//! sessions never start a real browser. It counts launches, opened sessions
//! and closed sessions, records every navigation and script, and can be told
//! to fail at a chosen step. Sessions can also report a request still in
//! flight for a set number of checks.
//!
//! # Feature Flag
//!
//! This module is only available when:
//! - The `test-utils` feature is enabled, OR
//! - During testing (`#[cfg(test)]`)
//!
//! # Example
//!
//! ```rust,ignore
//! use html2pdf_overlay_api::factory::mock::{FailurePoint, MockBrowserFactory};
//!
//! // Engine whose PDF step always fails
//! let factory = MockBrowserFactory::new().failing_at(FailurePoint::Print);
//! let recorder = factory.recorder();
//!
//! // ... run a request ...
//! assert_eq!(recorder.sessions_opened(), recorder.sessions_closed());
//! ```

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use super::BrowserFactory;
use crate::error::{BrowserError, Result};
use crate::service::loader::NETWORK_CHECK_SCRIPT;
use crate::traits::{BrowserEngine, PageSession, PdfPrintOptions};

/// Bytes returned by every successful mock print.
pub const MOCK_PDF: &[u8] = b"%PDF-1.7\n% mock rendition\n%%EOF\n";

/// Step at which the mock engine reports an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailurePoint {
    SessionCreation,
    Navigate,
    Script,
    Print,
    Close,
}

/// Shared counters and recordings, observable after the factory has moved
/// into a manager.
#[derive(Debug, Default)]
pub struct MockRecorder {
    launches: AtomicUsize,
    sessions_opened: AtomicUsize,
    sessions_closed: AtomicUsize,
    engine_shutdowns: AtomicUsize,
    pending_checks: AtomicUsize,
    navigations: Mutex<Vec<String>>,
    scripts: Mutex<Vec<String>>,
    print_options: Mutex<Vec<PdfPrintOptions>>,
}

impl MockRecorder {
    pub fn launches(&self) -> usize {
        self.launches.load(Ordering::SeqCst)
    }

    pub fn sessions_opened(&self) -> usize {
        self.sessions_opened.load(Ordering::SeqCst)
    }

    /// Number of `PageSession::close` calls, including repeated ones.
    pub fn sessions_closed(&self) -> usize {
        self.sessions_closed.load(Ordering::SeqCst)
    }

    pub fn engine_shutdowns(&self) -> usize {
        self.engine_shutdowns.load(Ordering::SeqCst)
    }

    /// Number of `PageSession::pending_requests` calls.
    pub fn pending_checks(&self) -> usize {
        self.pending_checks.load(Ordering::SeqCst)
    }

    pub fn navigations(&self) -> Vec<String> {
        self.navigations.lock().map(|v| v.clone()).unwrap_or_default()
    }

    pub fn scripts(&self) -> Vec<String> {
        self.scripts.lock().map(|v| v.clone()).unwrap_or_default()
    }

    pub fn print_options(&self) -> Vec<PdfPrintOptions> {
        self.print_options.lock().map(|v| v.clone()).unwrap_or_default()
    }
}

/// Mock browser factory for testing without Chrome.
///
/// # Thread Safety
///
/// `Send + Sync`; all state is atomic or mutex-guarded.
pub struct MockBrowserFactory {
    /// Launch error message, if launches should fail.
    launch_error: Option<String>,

    /// Simulated launch duration, to widen race windows in tests.
    launch_delay: Duration,

    failure: Option<FailurePoint>,

    /// Checks per session that report one request still in flight.
    pending_polls: usize,

    recorder: Arc<MockRecorder>,
}

impl MockBrowserFactory {
    /// Factory whose launches and sessions always succeed.
    pub fn new() -> Self {
        Self {
            launch_error: None,
            launch_delay: Duration::ZERO,
            failure: None,
            pending_polls: 0,
            recorder: Arc::new(MockRecorder::default()),
        }
    }

    /// Factory whose launches always fail with `message`.
    pub fn always_fails<S: Into<String>>(message: S) -> Self {
        Self {
            launch_error: Some(message.into()),
            ..Self::new()
        }
    }

    /// Make every launch take `delay`.
    pub fn with_launch_delay(mut self, delay: Duration) -> Self {
        self.launch_delay = delay;
        self
    }

    /// Make sessions fail at `point`.
    pub fn failing_at(mut self, point: FailurePoint) -> Self {
        self.failure = Some(point);
        self
    }

    /// Make each session report one in-flight request for its first
    /// `polls` checks. `usize::MAX` keeps the request pending forever.
    pub fn with_pending_requests(mut self, polls: usize) -> Self {
        self.pending_polls = polls;
        self
    }

    /// Shared counters for verification after the factory is moved.
    pub fn recorder(&self) -> Arc<MockRecorder> {
        Arc::clone(&self.recorder)
    }
}

impl Default for MockBrowserFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl BrowserFactory for MockBrowserFactory {
    fn create(&self) -> Result<Arc<dyn BrowserEngine>> {
        let count = self.recorder.launches.fetch_add(1, Ordering::SeqCst) + 1;
        log::debug!("MockBrowserFactory: launch #{}", count);

        if !self.launch_delay.is_zero() {
            std::thread::sleep(self.launch_delay);
        }

        if let Some(message) = &self.launch_error {
            return Err(BrowserError::Launch(message.clone()));
        }

        Ok(Arc::new(MockEngine {
            failure: self.failure,
            pending_polls: self.pending_polls,
            recorder: Arc::clone(&self.recorder),
            shut_down: Mutex::new(false),
        }))
    }
}

impl std::fmt::Debug for MockBrowserFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockBrowserFactory")
            .field("launch_error", &self.launch_error)
            .field("launch_delay", &self.launch_delay)
            .field("failure", &self.failure)
            .field("pending_polls", &self.pending_polls)
            .field("launches", &self.recorder.launches())
            .finish()
    }
}

/// Engine produced by [`MockBrowserFactory`].
pub struct MockEngine {
    failure: Option<FailurePoint>,
    pending_polls: usize,
    recorder: Arc<MockRecorder>,
    shut_down: Mutex<bool>,
}

impl BrowserEngine for MockEngine {
    fn new_session(&self) -> Result<Box<dyn PageSession>> {
        if self.shut_down.lock().map(|flag| *flag).unwrap_or(true) {
            return Err(BrowserError::ShuttingDown);
        }
        if self.failure == Some(FailurePoint::SessionCreation) {
            return Err(BrowserError::SessionCreation("mock failure".to_string()));
        }

        let n = self.recorder.sessions_opened.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(Box::new(MockSession {
            id: format!("mock-context-{}", n),
            failure: self.failure,
            pending_left: AtomicUsize::new(self.pending_polls),
            recorder: Arc::clone(&self.recorder),
        }))
    }

    fn shutdown(&self) {
        if let Ok(mut flag) = self.shut_down.lock() {
            *flag = true;
        }
        self.recorder.engine_shutdowns.fetch_add(1, Ordering::SeqCst);
    }
}

/// Session produced by [`MockEngine`].
pub struct MockSession {
    id: String,
    failure: Option<FailurePoint>,
    pending_left: AtomicUsize,
    recorder: Arc<MockRecorder>,
}

impl MockSession {
    fn fails_at(&self, point: FailurePoint) -> bool {
        self.failure == Some(point)
    }
}

impl PageSession for MockSession {
    fn id(&self) -> &str {
        &self.id
    }

    fn set_timeout(&self, _timeout: Duration) {}

    fn navigate(&self, url: &str) -> Result<()> {
        if let Ok(mut navigations) = self.recorder.navigations.lock() {
            navigations.push(url.to_string());
        }
        if self.fails_at(FailurePoint::Navigate) {
            return Err(BrowserError::Navigation("net::ERR_NAME_NOT_RESOLVED".to_string()));
        }
        Ok(())
    }

    fn evaluate(&self, script: &str, _await_promise: bool) -> Result<serde_json::Value> {
        if let Ok(mut scripts) = self.recorder.scripts.lock() {
            scripts.push(script.to_string());
        }
        if self.fails_at(FailurePoint::Script) {
            return Err(BrowserError::Script("Uncaught TypeError".to_string()));
        }
        if script == NETWORK_CHECK_SCRIPT {
            return Ok(serde_json::json!(0));
        }
        Ok(serde_json::Value::Bool(true))
    }

    fn pending_requests(&self) -> usize {
        self.recorder.pending_checks.fetch_add(1, Ordering::SeqCst);
        let still_pending = self
            .pending_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
            .is_ok();
        usize::from(still_pending)
    }

    fn print_to_pdf(&self, options: &PdfPrintOptions) -> Result<Vec<u8>> {
        if let Ok(mut recorded) = self.recorder.print_options.lock() {
            recorded.push(*options);
        }
        if self.fails_at(FailurePoint::Print) {
            return Err(BrowserError::PdfGeneration("Printing failed".to_string()));
        }
        Ok(MOCK_PDF.to_vec())
    }

    fn close(&mut self) -> Result<()> {
        self.recorder.sessions_closed.fetch_add(1, Ordering::SeqCst);
        if self.fails_at(FailurePoint::Close) {
            return Err(BrowserError::SessionClose("target already gone".to_string()));
        }
        Ok(())
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_always_fails_counts_attempts() {
        let factory = MockBrowserFactory::always_fails("Chrome not installed");
        let recorder = factory.recorder();

        assert!(matches!(factory.create(), Err(BrowserError::Launch(msg)) if msg == "Chrome not installed"));
        assert!(factory.create().is_err());
        assert_eq!(recorder.launches(), 2);
    }

    #[test]
    fn test_sessions_are_counted() {
        let factory = MockBrowserFactory::new();
        let recorder = factory.recorder();
        let engine = factory.create().unwrap();

        let mut session = engine.new_session().unwrap();
        assert_eq!(session.id(), "mock-context-1");
        session.close().unwrap();

        assert_eq!(recorder.sessions_opened(), 1);
        assert_eq!(recorder.sessions_closed(), 1);
    }

    #[test]
    fn test_network_check_reports_idle() {
        let engine = MockBrowserFactory::new().create().unwrap();
        let session = engine.new_session().unwrap();

        let value = session.evaluate(NETWORK_CHECK_SCRIPT, false).unwrap();
        assert_eq!(value.as_i64(), Some(0));
    }

    #[test]
    fn test_pending_requests_drain() {
        let engine = MockBrowserFactory::new()
            .with_pending_requests(2)
            .create()
            .unwrap();
        let session = engine.new_session().unwrap();

        assert_eq!(session.pending_requests(), 1);
        assert_eq!(session.pending_requests(), 1);
        assert_eq!(session.pending_requests(), 0);
        assert_eq!(session.pending_requests(), 0);
    }

    #[test]
    fn test_close_failure_uses_close_variant() {
        let engine = MockBrowserFactory::new()
            .failing_at(FailurePoint::Close)
            .create()
            .unwrap();
        let mut session = engine.new_session().unwrap();

        assert!(matches!(session.close(), Err(BrowserError::SessionClose(_))));
    }

    #[test]
    fn test_failure_injection() {
        let engine = MockBrowserFactory::new()
            .failing_at(FailurePoint::Print)
            .create()
            .unwrap();
        let session = engine.new_session().unwrap();

        assert!(session.navigate("https://example.com/").is_ok());
        assert!(matches!(
            session.print_to_pdf(&PdfPrintOptions::a4()),
            Err(BrowserError::PdfGeneration(_))
        ));
    }

    #[test]
    fn test_shutdown_refuses_sessions() {
        let factory = MockBrowserFactory::new();
        let recorder = factory.recorder();
        let engine = factory.create().unwrap();

        engine.shutdown();

        assert!(matches!(engine.new_session(), Err(BrowserError::ShuttingDown)));
        assert_eq!(recorder.engine_shutdowns(), 1);
    }

    #[test]
    fn test_debug_output() {
        let factory = MockBrowserFactory::always_fails("Test");
        let debug_str = format!("{:?}", factory);
        assert!(debug_str.contains("MockBrowserFactory"));
        assert!(debug_str.contains("Test"));
    }
}
