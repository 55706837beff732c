//! Chrome/Chromium browser factory implementation.
//!
//! This module provides [`ChromeBrowserFactory`] for launching headless Chrome
//! with production-ready configurations, plus the [`ChromeEngine`] and
//! per-request session types that implement the crate's browser traits on top
//! of `headless_chrome`.
//!
//! # Overview
//!
//! The factory handles:
//! - Chrome binary path detection (or custom path)
//! - Launch options configuration
//! - Memory and stability optimizations
//!
//! Each session is an isolated browser context (separate cookies, storage and
//! cache) with exactly one tab:
//!
//! ```text
//! ChromeEngine (one process)
//! ├── Context A ── Tab   ◀── request 1
//! ├── Context B ── Tab   ◀── request 2
//! └── ...
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use html2pdf_overlay_api::ChromeBrowserFactory;
//!
//! // Auto-detect Chrome installation
//! let factory = ChromeBrowserFactory::with_defaults();
//!
//! // Or specify custom path
//! let factory = ChromeBrowserFactory::with_path("/usr/bin/google-chrome".to_string());
//! ```

use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use headless_chrome::protocol::cdp::types::Event;
use headless_chrome::protocol::cdp::{Network, Target};
use headless_chrome::types::PrintToPdfOptions;
use headless_chrome::{Browser, LaunchOptions, Tab};

use super::BrowserFactory;
use crate::error::{BrowserError, Result};
use crate::traits::{BrowserEngine, PageSession, PdfPrintOptions};

/// How long Chrome may sit without any session before `headless_chrome`
/// tears the connection down. The engine lives for the whole service, so
/// this is effectively "never".
const IDLE_BROWSER_TIMEOUT: Duration = Duration::from_secs(60 * 60 * 24 * 365);

/// Factory for launching Chrome/Chromium.
///
/// Handles Chrome-specific launch options and path detection.
///
/// # Thread Safety
///
/// This factory is `Send + Sync` and can be safely shared across threads.
pub struct ChromeBrowserFactory {
    /// Function that generates launch options for each launch.
    launch_options_fn: Box<dyn Fn() -> Result<LaunchOptions<'static>> + Send + Sync>,
}

impl ChromeBrowserFactory {
    /// Create factory with custom launch options function.
    ///
    /// # Example
    ///
    /// ```rust,ignore
    /// use html2pdf_overlay_api::{BrowserError, ChromeBrowserFactory, create_chrome_options};
    ///
    /// let factory = ChromeBrowserFactory::new(|| {
    ///     create_chrome_options(Some("/custom/path"))
    ///         .map_err(|e| BrowserError::Configuration(e.to_string()))
    /// });
    /// ```
    pub fn new<F>(launch_options_fn: F) -> Self
    where
        F: Fn() -> Result<LaunchOptions<'static>> + Send + Sync + 'static,
    {
        Self {
            launch_options_fn: Box::new(launch_options_fn),
        }
    }

    /// Create factory with auto-detected Chrome path.
    ///
    /// The `headless_chrome` crate searches common installation paths:
    ///
    /// | Platform | Paths Searched |
    /// |----------|----------------|
    /// | Linux | `/usr/bin/google-chrome`, `/usr/bin/chromium`, etc. |
    /// | macOS | `/Applications/Google Chrome.app/...` |
    /// | Windows | `C:\Program Files\Google\Chrome\...` |
    pub fn with_defaults() -> Self {
        log::debug!("🔧 Creating ChromeBrowserFactory with auto-detect");
        Self::new(|| {
            create_chrome_options(None).map_err(|e| BrowserError::Configuration(e.to_string()))
        })
    }

    /// Create factory with custom Chrome binary path.
    pub fn with_path(chrome_path: String) -> Self {
        log::debug!(
            "🔧 Creating ChromeBrowserFactory with custom path: {}",
            chrome_path
        );
        Self::new(move || {
            create_chrome_options(Some(&chrome_path))
                .map_err(|e| BrowserError::Configuration(e.to_string()))
        })
    }

    /// Auto-detect unless a path is given.
    pub fn from_optional_path(chrome_path: Option<String>) -> Self {
        match chrome_path {
            Some(path) => Self::with_path(path),
            None => Self::with_defaults(),
        }
    }
}

impl BrowserFactory for ChromeBrowserFactory {
    /// Launch Chrome in headless mode.
    ///
    /// # Errors
    ///
    /// * [`BrowserError::Configuration`] if launch options generation fails.
    /// * [`BrowserError::Launch`] if Chrome fails to start.
    fn create(&self) -> Result<Arc<dyn BrowserEngine>> {
        let options = (self.launch_options_fn)()?;

        log::debug!("🚀 Launching Chrome browser...");
        let browser = Browser::new(options).map_err(|e| {
            log::error!("❌ Chrome launch failed: {}", e);
            BrowserError::Launch(e.to_string())
        })?;

        match browser.get_version() {
            Ok(version) => log::info!("✅ Chrome launched: {}", version.product),
            Err(e) => log::warn!("Chrome launched but version query failed: {}", e),
        }

        Ok(Arc::new(ChromeEngine::new(browser)?))
    }
}

/// Create Chrome launch options with optional custom path.
///
/// # Chrome Flags Applied
///
/// ## Memory and Performance
/// - `--disable-dev-shm-usage` - Use /tmp instead of /dev/shm (container-friendly)
/// - `--disable-crash-reporter`
/// - `--max_old_space_size=1024` - Limit V8 heap to 1GB
///
/// ## GPU and Rendering
/// - `--disable-gpu-compositing`
/// - `--disable-software-rasterizer`
/// - `--disable-accelerated-2d-canvas`
/// - `--disable-webgl`, `--disable-webgl2`
///
/// ## Disabled Features
/// - `--disable-extensions`, `--disable-plugins`, `--disable-sync`,
///   `--disable-default-apps`
///
/// ## Stability
/// - `--disable-background-timer-throttling`
/// - `--disable-backgrounding-occluded-windows`
/// - `--disable-renderer-backgrounding`
/// - `--disable-hang-monitor`
/// - `--disable-ipc-flooding-protection`
///
/// Unlike a scraping setup, web security stays enabled: pages rendered here
/// are supplied by API clients.
pub fn create_chrome_options(
    chrome_path: Option<&str>,
) -> std::result::Result<LaunchOptions<'static>, Box<dyn std::error::Error + Send + Sync>> {
    match chrome_path {
        Some(path) => log::debug!("🔧 Creating Chrome options with custom path: {}", path),
        None => log::debug!("🔧 Creating Chrome options (auto-detect browser)"),
    }

    let mut builder = LaunchOptions::default_builder();

    if let Some(path) = chrome_path {
        builder.path(Some(path.to_string().into()));
    }

    builder
        .headless(true)
        .sandbox(false) // required in most containers
        .idle_browser_timeout(IDLE_BROWSER_TIMEOUT)
        .disable_default_args(true)
        .args(vec![
            // ===== Memory and Performance =====
            "--disable-dev-shm-usage".as_ref(),
            "--disable-crash-reporter".as_ref(),
            "--max_old_space_size=1024".as_ref(),
            // ===== GPU and Rendering =====
            "--disable-gpu-compositing".as_ref(),
            "--disable-software-rasterizer".as_ref(),
            "--disable-accelerated-2d-canvas".as_ref(),
            "--disable-webgl".as_ref(),
            "--disable-webgl2".as_ref(),
            // ===== Disable Unnecessary Features =====
            "--disable-extensions".as_ref(),
            "--disable-plugins".as_ref(),
            "--disable-sync".as_ref(),
            "--disable-default-apps".as_ref(),
            // ===== Stability =====
            "--disable-background-timer-throttling".as_ref(),
            "--disable-backgrounding-occluded-windows".as_ref(),
            "--disable-renderer-backgrounding".as_ref(),
            "--disable-hang-monitor".as_ref(),
            "--disable-ipc-flooding-protection".as_ref(),
            // ===== Fonts render the same regardless of host locale =====
            "--font-render-hinting=none".as_ref(),
        ])
        .build()
        .map_err(|e| -> Box<dyn std::error::Error + Send + Sync> {
            let path_msg = chrome_path.unwrap_or("auto-detect");
            log::error!(
                "❌ Failed to build Chrome launch options (path: {}): {}",
                path_msg,
                e
            );
            e.into()
        })
}

// ============================================================================
// Engine
// ============================================================================

/// Browser process plus the control tab used for browser-level commands.
///
/// The control tab lives in the default context, so disposing a request's
/// context never closes it.
#[derive(Clone)]
struct ChromeHandle {
    browser: Arc<Browser>,
    control: Arc<Tab>,
}

/// A launched Chrome process.
///
/// The handle sits behind `Mutex<Option<..>>` so [`shutdown`](BrowserEngine::shutdown)
/// can release it while sessions that already cloned it finish.
pub struct ChromeEngine {
    handle: Mutex<Option<ChromeHandle>>,
}

impl ChromeEngine {
    /// Wrap a launched browser, opening its control tab.
    ///
    /// # Errors
    ///
    /// [`BrowserError::Launch`] if the control tab cannot be opened.
    pub fn new(browser: Browser) -> Result<Self> {
        let control = browser.new_tab().map_err(|e| {
            log::error!("❌ Failed to open Chrome control tab: {}", e);
            BrowserError::Launch(format!("control tab: {}", e))
        })?;

        Ok(Self {
            handle: Mutex::new(Some(ChromeHandle {
                browser: Arc::new(browser),
                control,
            })),
        })
    }

    fn current_handle(&self) -> Result<ChromeHandle> {
        let guard = self.handle.lock().map_err(|e| {
            log::error!("❌ Chrome engine lock poisoned: {}", e);
            BrowserError::SessionCreation(e.to_string())
        })?;
        guard.as_ref().cloned().ok_or(BrowserError::ShuttingDown)
    }
}

impl BrowserEngine for ChromeEngine {
    fn new_session(&self) -> Result<Box<dyn PageSession>> {
        let handle = self.current_handle()?;

        let (context_id, tab) = {
            let context = handle.browser.new_context().map_err(|e| {
                log::error!("❌ Failed to create browser context: {}", e);
                BrowserError::SessionCreation(e.to_string())
            })?;
            let context_id = context.get_id().to_string();

            match context.new_tab() {
                Ok(tab) => (context_id, tab),
                Err(e) => {
                    log::error!("❌ Failed to open tab in context {}: {}", context_id, e);
                    if let Err(dispose_err) = dispose_context(&handle.control, &context_id) {
                        log::warn!("{}", dispose_err);
                    }
                    return Err(BrowserError::SessionCreation(e.to_string()));
                }
            }
        };

        let in_flight = match track_requests(&tab) {
            Ok(in_flight) => in_flight,
            Err(e) => {
                log::error!("❌ Failed to enable network tracking in {}: {}", context_id, e);
                let _ = tab.close(false);
                if let Err(dispose_err) = dispose_context(&handle.control, &context_id) {
                    log::warn!("{}", dispose_err);
                }
                return Err(e);
            }
        };

        log::trace!("Opened Chrome session {}", context_id);

        Ok(Box::new(ChromeSession {
            handle,
            context_id,
            tab,
            in_flight,
            closed: false,
        }))
    }

    fn shutdown(&self) {
        match self.handle.lock() {
            Ok(mut guard) => {
                if guard.take().is_some() {
                    log::info!("🛑 Chrome engine released");
                }
            }
            Err(e) => log::error!("❌ Chrome engine lock poisoned during shutdown: {}", e),
        }
    }
}

/// DevTools command deleting browsing context `context_id` and its pages.
fn dispose_context_command(context_id: &str) -> Target::DisposeBrowserContext {
    Target::DisposeBrowserContext {
        browser_context_id: context_id.to_string(),
    }
}

/// Dispose of a browsing context through the control tab.
fn dispose_context(control: &Tab, context_id: &str) -> Result<()> {
    control
        .call_method(dispose_context_command(context_id))
        .map(|_| ())
        .map_err(|e| {
            BrowserError::SessionClose(format!(
                "failed to dispose browser context {}: {}",
                context_id, e
            ))
        })
}

/// Ids of network requests started but not yet finished or failed.
type InFlight = Arc<Mutex<HashSet<String>>>;

/// Enable the Network domain on `tab` and follow its request lifecycle.
fn track_requests(tab: &Tab) -> Result<InFlight> {
    tab.call_method(Network::Enable {
        max_total_buffer_size: None,
        max_resource_buffer_size: None,
        max_post_data_size: None,
        report_direct_socket_traffic: None,
        enable_durable_messages: None,
    })
    .map_err(|e| BrowserError::SessionCreation(format!("network tracking: {}", e)))?;

    let in_flight: InFlight = Arc::default();
    let requests = Arc::clone(&in_flight);

    tab.add_event_listener(Arc::new(move |event: &Event| {
        let Ok(mut requests) = requests.lock() else {
            return;
        };
        match event {
            Event::NetworkRequestWillBeSent(ev) => {
                requests.insert(ev.params.request_id.clone());
            }
            Event::NetworkLoadingFinished(ev) => {
                requests.remove(&ev.params.request_id);
            }
            Event::NetworkLoadingFailed(ev) => {
                requests.remove(&ev.params.request_id);
            }
            _ => {}
        }
    }))
    .map_err(|e| BrowserError::SessionCreation(format!("network tracking: {}", e)))?;

    Ok(in_flight)
}

// ============================================================================
// Session
// ============================================================================

struct ChromeSession {
    handle: ChromeHandle,
    context_id: String,
    tab: Arc<Tab>,
    in_flight: InFlight,
    closed: bool,
}

impl PageSession for ChromeSession {
    fn id(&self) -> &str {
        &self.context_id
    }

    fn set_timeout(&self, timeout: Duration) {
        self.tab.set_default_timeout(timeout);
    }

    fn navigate(&self, url: &str) -> Result<()> {
        self.tab
            .navigate_to(url)
            .map_err(|e| BrowserError::Navigation(e.to_string()))?
            .wait_until_navigated()
            .map_err(|e| BrowserError::Navigation(e.to_string()))?;
        Ok(())
    }

    fn evaluate(&self, script: &str, await_promise: bool) -> Result<serde_json::Value> {
        let remote = self
            .tab
            .evaluate(script, await_promise)
            .map_err(|e| BrowserError::Script(e.to_string()))?;
        Ok(remote.value.unwrap_or(serde_json::Value::Null))
    }

    fn pending_requests(&self) -> usize {
        self.in_flight.lock().map(|set| set.len()).unwrap_or(0)
    }

    fn print_to_pdf(&self, options: &PdfPrintOptions) -> Result<Vec<u8>> {
        self.tab
            .print_to_pdf(Some(build_print_options(options)))
            .map_err(|e| BrowserError::PdfGeneration(e.to_string()))
    }

    /// Close the tab, then dispose of its context. Both are attempted; the
    /// first failure is reported.
    fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;

        let tab_result = self
            .tab
            .close(true)
            .map(|_| ())
            .map_err(|e| BrowserError::SessionClose(format!("tab close: {}", e)));
        let dispose_result = dispose_context(&self.handle.control, &self.context_id);

        tab_result.and(dispose_result)
    }
}

/// Translate engine-neutral options into DevTools print options.
///
/// No header/footer, scale 1.0, every page.
fn build_print_options(options: &PdfPrintOptions) -> PrintToPdfOptions {
    PrintToPdfOptions {
        landscape: Some(false),
        display_header_footer: Some(false),
        print_background: Some(options.print_background),
        paper_width: Some(options.paper_width),
        paper_height: Some(options.paper_height),
        margin_top: Some(options.margin),
        margin_bottom: Some(options.margin),
        margin_left: Some(options.margin),
        margin_right: Some(options.margin),
        ..Default::default()
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
