//! Per-request deadline and cancellation.
//!
//! Browser work runs on tokio's blocking pool, where a future cannot simply be
//! dropped to cancel it. [`Deadline`] bundles the request's time budget with a
//! [`CancellationFlag`] that the async handler trips when it gives up, and
//! every browser step calls [`Deadline::check`] before it suspends on the
//! engine.
//!
//! ```text
//! handler (async)                      blocking job
//! ───────────────                      ────────────
//! timeout(budget, spawn_blocking) ───▶ check("navigation")
//!        │                             navigate ...
//!        │ elapsed                     check("watermark")   ◀── sees flag
//!        └─ flag.cancel() ───────────▶ Err(Cancelled)
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use crate::error::{BrowserError, Result};

/// Shared cancellation flag.
///
/// Cloning shares the underlying flag.
#[derive(Debug, Clone, Default)]
pub struct CancellationFlag(Arc<AtomicBool>);

impl CancellationFlag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. Idempotent.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// Guard that cancels this flag when dropped.
    ///
    /// Held by the async side of a request, so the blocking job also stops
    /// when the handler future is dropped (client disconnect).
    pub fn cancel_on_drop(&self) -> CancelOnDrop {
        CancelOnDrop(self.clone())
    }
}

/// See [`CancellationFlag::cancel_on_drop`].
#[derive(Debug)]
pub struct CancelOnDrop(CancellationFlag);

impl Drop for CancelOnDrop {
    fn drop(&mut self) {
        self.0.cancel();
    }
}

/// Time budget plus cancellation flag for one request.
#[derive(Debug, Clone)]
pub struct Deadline {
    expires_at: Instant,
    cancel: CancellationFlag,
}

impl Deadline {
    /// Deadline `budget` from now with a fresh cancellation flag.
    pub fn after(budget: Duration) -> Self {
        Self::with_flag(budget, CancellationFlag::new())
    }

    /// Deadline `budget` from now sharing an existing flag.
    pub fn with_flag(budget: Duration, cancel: CancellationFlag) -> Self {
        Self {
            expires_at: Instant::now() + budget,
            cancel,
        }
    }

    /// Time left before expiry, zero once expired.
    pub fn remaining(&self) -> Duration {
        self.expires_at.saturating_duration_since(Instant::now())
    }

    pub fn is_expired(&self) -> bool {
        self.remaining().is_zero()
    }

    pub fn cancellation(&self) -> &CancellationFlag {
        &self.cancel
    }

    /// Fail fast if the request was cancelled or ran out of time.
    ///
    /// `step` names the operation about to start and ends up in the
    /// [`BrowserError::Timeout`] message.
    pub fn check(&self, step: &str) -> Result<()> {
        if self.cancel.is_cancelled() {
            log::debug!("Cancellation observed before {}", step);
            return Err(BrowserError::Cancelled);
        }
        if self.is_expired() {
            log::debug!("Deadline expired before {}", step);
            return Err(BrowserError::Timeout(step.to_string()));
        }
        Ok(())
    }

    /// Sleep for at most `interval`, never past the deadline.
    pub fn sleep(&self, interval: Duration) {
        let nap = interval.min(self.remaining());
        if !nap.is_zero() {
            std::thread::sleep(nap);
        }
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fresh_deadline_passes_check() {
        let deadline = Deadline::after(Duration::from_secs(30));
        assert!(deadline.check("navigation").is_ok());
        assert!(deadline.remaining() > Duration::from_secs(29));
    }

    #[test]
    fn test_zero_budget_times_out() {
        let deadline = Deadline::after(Duration::ZERO);
        assert_eq!(
            deadline.check("render"),
            Err(BrowserError::Timeout("render".to_string()))
        );
    }

    #[test]
    fn test_cancellation_wins_over_budget() {
        let flag = CancellationFlag::new();
        let deadline = Deadline::with_flag(Duration::from_secs(30), flag.clone());

        flag.cancel();

        assert_eq!(deadline.check("watermark"), Err(BrowserError::Cancelled));
        assert!(deadline.cancellation().is_cancelled());
    }

    #[test]
    fn test_cancel_on_drop() {
        let flag = CancellationFlag::new();
        {
            let _guard = flag.cancel_on_drop();
            assert!(!flag.is_cancelled());
        }
        assert!(flag.is_cancelled());
    }

    #[test]
    fn test_sleep_is_bounded_by_deadline() {
        let deadline = Deadline::after(Duration::from_millis(20));
        let start = Instant::now();
        deadline.sleep(Duration::from_secs(5));
        assert!(start.elapsed() < Duration::from_secs(1));
    }
}
