//! Content loading: put a URL or an HTML document into a session and wait
//! until it has settled.
//!
//! # Network Idle
//!
//! After the load event the loader keeps polling until, for a whole
//! [`QUIET_WINDOW`]:
//!
//! - the document reports `complete` ([`NETWORK_CHECK_SCRIPT`])
//! - no request is in flight ([`PageSession::pending_requests`])
//! - the number of resource-timing entries has not changed
//!
//! Late images, fonts and XHR-driven content are therefore part of the PDF,
//! including requests that take longer than the quiet window.
//!
//! ```text
//! navigate ──▶ load event ──▶ poll every 200ms ──▶ quiet 500ms ──▶ done
//!                                  │
//!                                  └── deadline.check() on every iteration
//! ```

use std::time::{Duration, Instant};

use super::types::PdfServiceError;
use crate::deadline::Deadline;
use crate::error::{BrowserError, Result};
use crate::traits::PageSession;

/// Resource-entry count once the document is complete, `-1` before that.
///
/// Also lifts the resource-timing buffer cap (250 by default) so the count
/// keeps moving on large pages.
pub const NETWORK_CHECK_SCRIPT: &str = "(performance.setResourceTimingBufferSize(100000), \
     document.readyState === 'complete' \
     ? performance.getEntriesByType('resource').length \
     : -1)";

/// Delay between two network checks.
pub const POLL_INTERVAL: Duration = Duration::from_millis(200);

/// How long the resource count must stay unchanged.
pub const QUIET_WINDOW: Duration = Duration::from_millis(500);

// ============================================================================
// Input Validation
// ============================================================================

/// Check that `raw` is an absolute `http`/`https` URL.
///
/// Runs before any browser work so bad input never costs a session.
pub fn validate_url(raw: &str) -> std::result::Result<url::Url, PdfServiceError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(PdfServiceError::MissingField("url"));
    }

    let parsed = url::Url::parse(trimmed)
        .map_err(|e| PdfServiceError::InvalidUrl(e.to_string()))?;

    match parsed.scheme() {
        "http" | "https" => Ok(parsed),
        other => Err(PdfServiceError::InvalidUrl(format!(
            "unsupported scheme '{}'",
            other
        ))),
    }
}

/// Reject blank markup.
pub fn validate_html(html: &str) -> std::result::Result<(), PdfServiceError> {
    if html.trim().is_empty() {
        return Err(PdfServiceError::EmptyHtml);
    }
    Ok(())
}

// ============================================================================
// Loading
// ============================================================================

/// Navigate `session` to `url` and wait for network idle.
pub fn load_from_url(session: &dyn PageSession, url: &str, deadline: &Deadline) -> Result<()> {
    deadline.check("navigation")?;
    session.set_timeout(deadline.remaining());

    log::debug!("🌐 [{}] Navigating to {}", session.id(), url);
    session.navigate(url)?;

    wait_for_network_idle(session, deadline)
}

/// Replace the session's document with `html` and wait for network idle.
///
/// The page starts from `about:blank`; the markup travels as a JSON string
/// literal into `document.write`.
pub fn load_from_html(session: &dyn PageSession, html: &str, deadline: &Deadline) -> Result<()> {
    deadline.check("navigation")?;
    session.set_timeout(deadline.remaining());
    session.navigate("about:blank")?;

    deadline.check("document write")?;
    let script = document_write_script(html)?;
    log::debug!(
        "📝 [{}] Writing {} bytes of HTML into blank page",
        session.id(),
        html.len()
    );
    session
        .evaluate(&script, false)
        .map_err(|e| BrowserError::Navigation(format!("document write failed: {}", e)))?;

    wait_for_network_idle(session, deadline)
}

/// Poll until the document is complete, nothing is in flight and the
/// resource count holds still for [`QUIET_WINDOW`].
///
/// # Errors
///
/// [`BrowserError::Timeout`] / [`BrowserError::Cancelled`] if the deadline
/// runs out first, or the engine's error if a check fails.
pub fn wait_for_network_idle(session: &dyn PageSession, deadline: &Deadline) -> Result<()> {
    let mut last_count: Option<i64> = None;
    let mut stable_since = Instant::now();

    loop {
        deadline.check("network idle")?;

        let count = session
            .evaluate(NETWORK_CHECK_SCRIPT, false)?
            .as_i64()
            .unwrap_or(-1);
        let pending = session.pending_requests();
        let quiet = count >= 0 && pending == 0;

        if quiet && last_count == Some(count) {
            if stable_since.elapsed() >= QUIET_WINDOW {
                log::trace!(
                    "[{}] Network idle ({} resources)",
                    session.id(),
                    count
                );
                return Ok(());
            }
        } else {
            if pending > 0 {
                log::trace!("[{}] {} request(s) in flight", session.id(), pending);
            }
            last_count = quiet.then_some(count);
            stable_since = Instant::now();
        }

        deadline.sleep(POLL_INTERVAL);
    }
}

fn document_write_script(html: &str) -> Result<String> {
    let literal = serde_json::to_string(html)
        .map_err(|e| BrowserError::Script(format!("failed to encode HTML: {}", e)))?;
    Ok(format!(
        "(() => {{ document.open(); document.write({}); document.close(); return true; }})()",
        literal
    ))
}

// ============================================================================
// Unit Tests
// ============================================================================
