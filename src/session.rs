//! RAII guard for per-request browser sessions.
//!
//! This module provides [`SessionGuard`], which owns one isolated browsing
//! context + page and closes it exactly once, whichever way the request ends:
//! - normal return (explicit [`close`](SessionGuard::close))
//! - early `?` return on an error
//! - a panic unwinding through the handler
//!
//! # Usage Pattern
//!
//! ```rust,ignore
//! let mut session = SessionGuard::open(engine.as_ref())?;
//!
//! session.navigate("https://example.com")?;   // via Deref
//! let pdf = session.print_to_pdf(&PdfPrintOptions::a4())?;
//!
//! session.close();   // or just let it drop
//! ```

use std::ops::Deref;

use crate::error::Result;
use crate::traits::{BrowserEngine, PageSession};

/// Exclusive owner of one [`PageSession`].
pub struct SessionGuard {
    session: Option<Box<dyn PageSession>>,
}

impl SessionGuard {
    /// Create a new session on `engine`.
    pub fn open(engine: &dyn BrowserEngine) -> Result<Self> {
        let session = engine.new_session()?;
        log::debug!("📄 Session {} opened", session.id());
        Ok(Self {
            session: Some(session),
        })
    }

    /// Close the session now.
    ///
    /// Close errors are logged, not returned: by the time a session is
    /// released the response is already decided.
    pub fn close(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if let Some(mut session) = self.session.take() {
            match session.close() {
                Ok(()) => log::debug!("📄 Session {} closed", session.id()),
                Err(e) => log::warn!(
                    "Failed to close session {} cleanly (continuing): {}",
                    session.id(),
                    e
                ),
            }
        }
    }
}

impl Deref for SessionGuard {
    type Target = dyn PageSession;

    fn deref(&self) -> &Self::Target {
        // `session` is only `None` inside `release`, which consumes or drops
        // the guard.
        match &self.session {
            Some(session) => session.as_ref(),
            None => unreachable!("session accessed after release"),
        }
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        if self.session.is_some() {
            log::trace!("SessionGuard dropped while open, releasing");
        }
        self.release();
    }
}

impl std::fmt::Debug for SessionGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.session {
            Some(session) => f
                .debug_struct("SessionGuard")
                .field("id", &session.id())
                .finish(),
            None => f
                .debug_struct("SessionGuard")
                .field("state", &"released")
                .finish(),
        }
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::factory::BrowserFactory;
    use crate::factory::mock::{FailurePoint, MockBrowserFactory};

    #[test]
    fn test_explicit_close_releases_once() {
        let factory = MockBrowserFactory::new();
        let recorder = factory.recorder();
        let engine = factory.create().unwrap();

        let guard = SessionGuard::open(engine.as_ref()).unwrap();
        guard.close();

        assert_eq!(recorder.sessions_opened(), 1);
        assert_eq!(recorder.sessions_closed(), 1);
    }

    #[test]
    fn test_drop_releases_once() {
        let factory = MockBrowserFactory::new();
        let recorder = factory.recorder();
        let engine = factory.create().unwrap();

        {
            let _guard = SessionGuard::open(engine.as_ref()).unwrap();
        }

        assert_eq!(recorder.sessions_closed(), 1);
    }

    #[test]
    fn test_error_path_releases_once() {
        fn failing_step(engine: &dyn BrowserEngine) -> Result<()> {
            let session = SessionGuard::open(engine)?;
            session.navigate("https://unreachable.invalid/")?;
            session.close();
            Ok(())
        }

        let factory = MockBrowserFactory::new().failing_at(FailurePoint::Navigate);
        let recorder = factory.recorder();
        let engine = factory.create().unwrap();

        assert!(failing_step(engine.as_ref()).is_err());
        assert_eq!(recorder.sessions_closed(), 1);
    }

    #[test]
    fn test_close_error_is_swallowed() {
        let factory = MockBrowserFactory::new().failing_at(FailurePoint::Close);
        let recorder = factory.recorder();
        let engine = factory.create().unwrap();

        SessionGuard::open(engine.as_ref()).unwrap().close();

        assert_eq!(recorder.sessions_closed(), 1);
    }

    #[test]
    fn test_failed_open_has_nothing_to_release() {
        let factory = MockBrowserFactory::new().failing_at(FailurePoint::SessionCreation);
        let recorder = factory.recorder();
        let engine = factory.create().unwrap();

        assert!(SessionGuard::open(engine.as_ref()).is_err());
        assert_eq!(recorder.sessions_opened(), 0);
        assert_eq!(recorder.sessions_closed(), 0);
    }

    #[test]
    fn test_debug_shows_id() {
        let engine = MockBrowserFactory::new().create().unwrap();
        let guard = SessionGuard::open(engine.as_ref()).unwrap();
        assert!(format!("{:?}", guard).contains("mock-context-1"));
    }
}
