//! Browser lifecycle management.
//!
//! This module provides [`BrowserManager`], which owns the single long-lived
//! browser engine shared by every request.
//!
//! # Overview
//!
//! - **Lazy, single-flight launch**: the first [`get_browser`](BrowserManager::get_browser)
//!   call launches the browser; concurrent first callers await that same
//!   launch instead of racing their own.
//! - **Explicit lifecycle**: optional [`warmup`](BrowserManager::warmup) at
//!   startup, [`shutdown`](BrowserManager::shutdown) at process exit.
//! - **Injected, not global**: the manager travels inside the HTTP
//!   application state.
//!
//! # Launch Sequence
//!
//! ```text
//! request A ──┐
//! request B ──┼──▶ tokio::spawn ──▶ OnceCell::get_or_try_init ──▶ spawn_blocking(factory.create)
//! request C ──┘                        (one in flight)                    │
//!                                                                         ▼
//!                            all three receive the same Arc<dyn BrowserEngine>
//! ```
//!
//! The launch runs in a task owned by the manager, not in the caller's
//! future. A request that times out or disconnects mid-launch stops waiting,
//! but the launch completes and fills the cell for everyone after it.
//!
//! A failed launch is not memoized: the error goes to the caller(s) of that
//! launch and the next call starts a fresh attempt. Nothing retries on its
//! own.
//!
//! # Example
//!
//! ```rust,ignore
//! use html2pdf_overlay_api::{BrowserManager, ChromeBrowserFactory};
//!
//! let manager = BrowserManager::new(Box::new(ChromeBrowserFactory::with_defaults()));
//!
//! let engine = manager.get_browser().await?;   // launches Chrome
//! let again = manager.get_browser().await?;    // same engine, no relaunch
//!
//! manager.shutdown();
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use tokio::sync::OnceCell;

use crate::error::{BrowserError, Result};
use crate::factory::BrowserFactory;
use crate::traits::BrowserEngine;

/// Owner of the process-wide browser engine.
///
/// # Thread Safety
///
/// `Send + Sync`; share it behind an `Arc`.
pub struct BrowserManager {
    inner: Arc<ManagerInner>,
}

/// State shared with in-flight launch tasks.
struct ManagerInner {
    factory: Arc<dyn BrowserFactory>,
    engine: OnceCell<Arc<dyn BrowserEngine>>,
    launch_attempts: AtomicUsize,
    shutting_down: AtomicBool,
}

impl BrowserManager {
    /// Create a manager. Nothing is launched until first use.
    pub fn new(factory: Box<dyn BrowserFactory>) -> Self {
        Self {
            inner: Arc::new(ManagerInner {
                factory: Arc::from(factory),
                engine: OnceCell::new(),
                launch_attempts: AtomicUsize::new(0),
                shutting_down: AtomicBool::new(false),
            }),
        }
    }

    /// Wrap in an `Arc` for sharing.
    pub fn into_shared(self) -> Arc<Self> {
        Arc::new(self)
    }

    /// Return the browser engine, launching it on first call.
    ///
    /// Idempotent and safe to call concurrently: at most one launch is in
    /// flight at any time and a successful launch happens at most once.
    ///
    /// # Errors
    ///
    /// - [`BrowserError::ShuttingDown`] after [`shutdown`](Self::shutdown)
    /// - [`BrowserError::Launch`] / [`BrowserError::Configuration`] from the
    ///   factory, passed through unchanged
    pub async fn get_browser(&self) -> Result<Arc<dyn BrowserEngine>> {
        if self.is_shutting_down() {
            return Err(BrowserError::ShuttingDown);
        }

        if let Some(engine) = self.inner.engine.get() {
            return Ok(Arc::clone(engine));
        }

        // Dropping the JoinHandle detaches the task; the launch carries on.
        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move {
            inner
                .engine
                .get_or_try_init(|| inner.launch())
                .await
                .map(Arc::clone)
        })
        .await
        .map_err(|e| {
            log::error!("❌ Browser launch task failed: {}", e);
            BrowserError::Launch(e.to_string())
        })?
    }

    /// Launch eagerly at startup instead of on the first request.
    pub async fn warmup(&self) -> Result<()> {
        log::info!("🔥 Warming up browser...");
        self.get_browser().await?;
        log::info!("✅ Browser warmed up");
        Ok(())
    }

    /// Stop handing out the engine and release the browser process.
    ///
    /// Idempotent. Requests already holding the engine finish their current
    /// session; new sessions are refused by the engine.
    pub fn shutdown(&self) {
        if self.inner.shutting_down.swap(true, Ordering::SeqCst) {
            log::debug!("Browser manager already shut down");
            return;
        }

        log::info!("🛑 Shutting down browser manager...");
        match self.inner.engine.get() {
            Some(engine) => engine.shutdown(),
            None => log::debug!("Browser was never launched, nothing to release"),
        }
        log::info!("✅ Browser manager shut down");
    }

    pub fn is_shutting_down(&self) -> bool {
        self.inner.shutting_down.load(Ordering::SeqCst)
    }

    /// Whether a launch has completed successfully.
    pub fn is_launched(&self) -> bool {
        self.inner.engine.initialized()
    }

    /// Number of launch attempts so far (successful or not).
    pub fn launch_count(&self) -> usize {
        self.inner.launch_attempts.load(Ordering::SeqCst)
    }
}

impl ManagerInner {
    /// One launch attempt, on the blocking pool.
    async fn launch(&self) -> Result<Arc<dyn BrowserEngine>> {
        let attempt = self.launch_attempts.fetch_add(1, Ordering::SeqCst) + 1;
        log::info!("🚀 Launching headless browser (attempt {})", attempt);

        let factory = Arc::clone(&self.factory);
        let engine = tokio::task::spawn_blocking(move || factory.create())
            .await
            .map_err(|e| {
                log::error!("❌ Browser launch task failed: {}", e);
                BrowserError::Launch(e.to_string())
            })?
            .map_err(|e| {
                log::error!("❌ Browser launch failed: {}", e);
                e
            })?;

        // Shutdown may have started while the launch was in flight.
        if self.shutting_down.load(Ordering::SeqCst) {
            engine.shutdown();
            return Err(BrowserError::ShuttingDown);
        }

        log::info!("✅ Headless browser ready");
        Ok(engine)
    }
}

impl std::fmt::Debug for BrowserManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BrowserManager")
            .field("launched", &self.is_launched())
            .field("launch_attempts", &self.launch_count())
            .field("shutting_down", &self.is_shutting_down())
            .finish()
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::factory::mock::MockBrowserFactory;
    use std::time::Duration;

    #[tokio::test]
    async fn test_lazy_launch() {
        let factory = MockBrowserFactory::new();
        let recorder = factory.recorder();
        let manager = BrowserManager::new(Box::new(factory));

        assert!(!manager.is_launched());
        assert_eq!(recorder.launches(), 0);

        manager.get_browser().await.unwrap();

        assert!(manager.is_launched());
        assert_eq!(recorder.launches(), 1);
    }

    #[tokio::test]
    async fn test_repeated_calls_reuse_engine() {
        let factory = MockBrowserFactory::new();
        let recorder = factory.recorder();
        let manager = BrowserManager::new(Box::new(factory));

        let first = manager.get_browser().await.unwrap();
        let second = manager.get_browser().await.unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(recorder.launches(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_first_calls_launch_once() {
        let factory = MockBrowserFactory::new().with_launch_delay(Duration::from_millis(100));
        let recorder = factory.recorder();
        let manager = BrowserManager::new(Box::new(factory)).into_shared();

        let mut handles = Vec::new();
        for _ in 0..16 {
            let manager = Arc::clone(&manager);
            handles.push(tokio::spawn(async move { manager.get_browser().await }));
        }
        for handle in handles {
            assert!(handle.await.unwrap().is_ok());
        }

        assert_eq!(recorder.launches(), 1);
        assert_eq!(manager.launch_count(), 1);
    }

    #[tokio::test]
    async fn test_abandoned_launch_is_kept() {
        let factory = MockBrowserFactory::new().with_launch_delay(Duration::from_millis(300));
        let recorder = factory.recorder();
        let manager = BrowserManager::new(Box::new(factory));

        let gave_up = tokio::time::timeout(Duration::from_millis(50), manager.get_browser()).await;
        assert!(gave_up.is_err(), "caller should stop waiting before the launch ends");

        tokio::time::sleep(Duration::from_millis(600)).await;
        assert!(manager.is_launched(), "launch finished without its caller");

        manager.get_browser().await.unwrap();
        assert_eq!(recorder.launches(), 1);
        assert_eq!(manager.launch_count(), 1);
    }

    #[tokio::test]
    async fn test_launch_failure_propagates_and_is_not_memoized() {
        let factory = MockBrowserFactory::always_fails("Chrome not installed");
        let recorder = factory.recorder();
        let manager = BrowserManager::new(Box::new(factory));

        let result = manager.get_browser().await;
        assert!(matches!(result, Err(BrowserError::Launch(msg)) if msg == "Chrome not installed"));
        assert!(!manager.is_launched());

        // A later call tries again
        assert!(manager.get_browser().await.is_err());
        assert_eq!(recorder.launches(), 2);
    }

    #[tokio::test]
    async fn test_shutdown_releases_engine_and_rejects_calls() {
        let factory = MockBrowserFactory::new();
        let recorder = factory.recorder();
        let manager = BrowserManager::new(Box::new(factory));

        manager.warmup().await.unwrap();
        manager.shutdown();
        manager.shutdown();

        assert_eq!(recorder.engine_shutdowns(), 1);
        assert!(matches!(
            manager.get_browser().await,
            Err(BrowserError::ShuttingDown)
        ));
    }

    #[tokio::test]
    async fn test_shutdown_without_launch() {
        let factory = MockBrowserFactory::new();
        let recorder = factory.recorder();
        let manager = BrowserManager::new(Box::new(factory));

        manager.shutdown();

        assert_eq!(recorder.launches(), 0);
        assert_eq!(recorder.engine_shutdowns(), 0);
    }
}
