//! Core PDF generation (framework-agnostic).
//!
//! The functions here are **synchronous/blocking** and must run inside
//! `tokio::task::spawn_blocking` (or an equivalent blocking context).
//!
//! # Pipeline
//!
//! ```text
//! ┌──────┐  open   ┌────────────────┐  load   ┌───────────────┐
//! │ Idle │ ──────▶ │ SessionCreated │ ──────▶ │ ContentLoaded │
//! └──────┘         └───────┬────────┘         └───────┬───────┘
//!                          │ error                    │ watermark? stamp?
//!                          ▼                          ▼
//!                  ┌──────────────┐  error   ┌──────────────┐
//!                  │    Failed    │ ◀─────── │   Overlaid   │
//!                  └──────┬───────┘          └──────┬───────┘
//!                         │                         │ print
//!                         ▼                         ▼
//!                  session released          ┌──────────────┐
//!                  (SessionGuard drop)       │   Rendered   │ ── session.close()
//!                                            └──────────────┘
//! ```
//!
//! Every transition first calls [`Deadline::check`], so a request that has
//! been given up on by its handler stops at the next step.
//!
//! # Example
//!
//! ```rust,ignore
//! use html2pdf_overlay_api::service::{generate_pdf, RenderRequest, RenderSettings};
//!
//! let request = RenderRequest::from_html("<h1>Invoice</h1>").with_watermark("PAID");
//!
//! let pdf = tokio::task::spawn_blocking(move || {
//!     generate_pdf(engine.as_ref(), &request, &deadline, &RenderSettings::default())
//! })
//! .await??;
//! ```

use crate::deadline::Deadline;
use crate::error::{BrowserError, Result};
use crate::session::SessionGuard;
use crate::traits::{BrowserEngine, PageSession, PdfPrintOptions};

use super::loader;
use super::overlay;
use super::types::*;

/// Characters of HTML kept in failure logs.
pub const HTML_PREVIEW_CHARS: usize = 100;

// ============================================================================
// Public API
// ============================================================================

/// Render `request`, whichever source it carries.
pub fn generate_pdf(
    engine: &dyn BrowserEngine,
    request: &RenderRequest,
    deadline: &Deadline,
    settings: &RenderSettings,
) -> std::result::Result<PdfResponse, PdfServiceError> {
    match &request.source {
        RenderSource::Url(url) => generate_pdf_from_url(engine, url, request, deadline, settings),
        RenderSource::Html(html) => {
            generate_pdf_from_html(engine, html, request, deadline, settings)
        }
    }
}

/// Load `url`, apply the request's overlays and print.
///
/// The URL is validated before a session is opened.
///
/// # Errors
///
/// | Error | Cause |
/// |-------|-------|
/// | [`PdfServiceError::MissingField`] / [`PdfServiceError::InvalidUrl`] | Bad URL |
/// | [`PdfServiceError::SessionCreationFailed`] | Context or page could not be created |
/// | [`PdfServiceError::ContentLoadFailed`] | Navigation or network-idle check failed |
/// | [`PdfServiceError::OverlayFailed`] | Overlay script failed or never appeared |
/// | [`PdfServiceError::PdfGenerationFailed`] | Printing failed |
/// | [`PdfServiceError::Timeout`] | Deadline hit at any step |
pub fn generate_pdf_from_url(
    engine: &dyn BrowserEngine,
    url: &str,
    request: &RenderRequest,
    deadline: &Deadline,
    settings: &RenderSettings,
) -> std::result::Result<PdfResponse, PdfServiceError> {
    let url = loader::validate_url(url)?;

    log::debug!(
        "Generating PDF from URL: {} (watermark={}, stamp={})",
        url,
        request.watermark().is_some(),
        request.stamp.is_some()
    );

    let data = run_pipeline(
        engine,
        |session| loader::load_from_url(session, url.as_str(), deadline),
        request,
        settings.stamp_size_url,
        deadline,
        settings,
    )?;

    log::info!(
        "✅ PDF generated successfully from URL: {} ({} bytes)",
        url,
        data.len()
    );
    Ok(PdfResponse::new(data))
}

/// Load inline `html`, apply the request's overlays and print.
///
/// Same error table as [`generate_pdf_from_url`], with
/// [`PdfServiceError::EmptyHtml`] for blank markup.
pub fn generate_pdf_from_html(
    engine: &dyn BrowserEngine,
    html: &str,
    request: &RenderRequest,
    deadline: &Deadline,
    settings: &RenderSettings,
) -> std::result::Result<PdfResponse, PdfServiceError> {
    loader::validate_html(html)?;

    log::debug!(
        "Generating PDF from HTML ({} bytes, watermark={}, stamp={})",
        html.len(),
        request.watermark().is_some(),
        request.stamp.is_some()
    );

    let data = run_pipeline(
        engine,
        |session| loader::load_from_html(session, html, deadline),
        request,
        settings.stamp_size_html,
        deadline,
        settings,
    )?;

    log::info!(
        "✅ PDF generated successfully from HTML ({} bytes)",
        data.len()
    );
    Ok(PdfResponse::new(data))
}

/// Print the session's current page: A4 portrait, 1 cm margins, backgrounds,
/// no header or footer.
pub fn render(session: &dyn PageSession, deadline: &Deadline) -> Result<Vec<u8>> {
    deadline.check("pdf rendering")?;
    session.set_timeout(deadline.remaining());

    let data = session.print_to_pdf(&PdfPrintOptions::a4())?;
    if data.is_empty() {
        return Err(BrowserError::PdfGeneration(
            "engine returned an empty document".to_string(),
        ));
    }
    Ok(data)
}

/// First `max_chars` characters of `text`, with `...` when cut.
pub fn truncate_for_log(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}

// ============================================================================
// Internal
// ============================================================================

/// Open a session, load, overlay, render. The guard releases the session on
/// every path.
fn run_pipeline<L>(
    engine: &dyn BrowserEngine,
    load: L,
    request: &RenderRequest,
    stamp_size: StampSize,
    deadline: &Deadline,
    settings: &RenderSettings,
) -> std::result::Result<Vec<u8>, PdfServiceError>
where
    L: FnOnce(&dyn PageSession) -> Result<()>,
{
    deadline.check("session creation")?;
    let session = SessionGuard::open(engine)?;

    load(&*session).map_err(PdfServiceError::content_load)?;

    overlay::apply_watermark(
        &*session,
        request.watermark(),
        deadline,
        settings.overlay_settle_timeout,
    )
    .map_err(PdfServiceError::overlay)?;

    overlay::apply_stamp(
        &*session,
        request.stamp.as_ref(),
        stamp_size,
        deadline,
        settings.overlay_settle_timeout,
    )
    .map_err(PdfServiceError::overlay)?;

    let data = render(&*session, deadline).map_err(PdfServiceError::pdf_generation)?;

    session.close();
    Ok(data)
}

// ============================================================================
// Unit Tests
// ============================================================================
