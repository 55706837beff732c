//! Watermark and stamp overlays.
//!
//! Both overlays are injected into the loaded page as fixed-position nodes
//! that ignore pointer events, so they print on every page without shifting
//! the document's own layout.
//!
//! | Overlay | Node id | Position | z-index |
//! |---------|---------|----------|---------|
//! | Watermark | `__pdf_watermark` | full viewport, centered, rotated −45° | 2147483646 |
//! | Stamp | `__pdf_stamp` | bottom-right, 20px inset | 2147483647 |
//!
//! # Injection
//!
//! Untrusted values (watermark text, stamp data URL) are embedded as JSON
//! string literals and assigned through `textContent` / `src`; they are never
//! parsed as markup or code.
//!
//! Each script returns a promise that resolves once the node is attached (and,
//! for the stamp, the image has decoded) plus two animation frames. The
//! injector then polls for the node until it is confirmed or the settle
//! timeout runs out.

use std::time::{Duration, Instant};

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;

use super::types::{StampImage, StampSize};
use crate::deadline::Deadline;
use crate::error::{BrowserError, Result};
use crate::traits::PageSession;

pub const WATERMARK_ID: &str = "__pdf_watermark";
pub const STAMP_ID: &str = "__pdf_stamp";

pub const WATERMARK_Z_INDEX: u32 = 2_147_483_646;
pub const STAMP_Z_INDEX: u32 = 2_147_483_647;

/// Distance of the stamp from the bottom and right edges, in px.
pub const STAMP_INSET_PX: u32 = 20;

const PRESENCE_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Font size tiers: (max characters, px).
const FONT_TIERS: &[(usize, u32)] = &[(10, 120), (20, 96), (30, 72), (40, 56)];
const MIN_FONT_PX: u32 = 40;

/// Watermark font size for `text`, shrinking as the text grows.
///
/// Length is counted in characters, not bytes.
pub fn watermark_font_size(text: &str) -> u32 {
    let len = text.chars().count();
    FONT_TIERS
        .iter()
        .find(|(max, _)| len <= *max)
        .map(|(_, px)| *px)
        .unwrap_or(MIN_FONT_PX)
}

/// Draw `text` as a diagonal watermark. No-op for `None` or blank text.
pub fn apply_watermark(
    session: &dyn PageSession,
    text: Option<&str>,
    deadline: &Deadline,
    settle_timeout: Duration,
) -> Result<()> {
    let Some(text) = text.filter(|t| !t.trim().is_empty()) else {
        return Ok(());
    };

    deadline.check("watermark")?;
    let font_px = watermark_font_size(text);
    log::debug!(
        "💧 [{}] Applying watermark ({} chars, {}px)",
        session.id(),
        text.chars().count(),
        font_px
    );

    let script = watermark_script(text, font_px)?;
    inject(session, &script, WATERMARK_ID)?;
    confirm_present(session, WATERMARK_ID, deadline, settle_timeout)
}

/// Place `stamp` in the bottom-right corner. No-op for `None` or empty bytes.
pub fn apply_stamp(
    session: &dyn PageSession,
    stamp: Option<&StampImage>,
    size: StampSize,
    deadline: &Deadline,
    settle_timeout: Duration,
) -> Result<()> {
    let Some(stamp) = stamp.filter(|s| !s.bytes.is_empty()) else {
        return Ok(());
    };

    deadline.check("stamp")?;
    log::debug!(
        "🖋️ [{}] Applying stamp ({}, {} bytes, {}x{})",
        session.id(),
        stamp.content_type,
        stamp.bytes.len(),
        size.width,
        size.height
    );

    let script = stamp_script(&data_url(stamp), size)?;
    inject(session, &script, STAMP_ID)?;
    confirm_present(session, STAMP_ID, deadline, settle_timeout)
}

/// `data:` URL carrying the stamp bytes.
pub fn data_url(stamp: &StampImage) -> String {
    format!(
        "data:{};base64,{}",
        stamp.content_type,
        STANDARD.encode(&stamp.bytes)
    )
}

// ============================================================================
// Scripts
// ============================================================================

fn js_string(value: &str) -> Result<String> {
    serde_json::to_string(value)
        .map_err(|e| BrowserError::Script(format!("failed to encode overlay value: {}", e)))
}

/// Resolves `value` after two animation frames, or 100ms if frames stall.
const SETTLE_JS: &str = "(value) => new Promise((resolve) => { \
     requestAnimationFrame(() => requestAnimationFrame(() => resolve(value))); \
     setTimeout(() => resolve(value), 100); })";

fn watermark_script(text: &str, font_px: u32) -> Result<String> {
    let container_style = format!(
        "position:fixed;inset:0;display:flex;align-items:center;justify-content:center;\
         pointer-events:none;z-index:{};overflow:hidden;",
        WATERMARK_Z_INDEX
    );
    let label_style = format!(
        "transform:rotate(-45deg);font-size:{}px;font-weight:bold;font-family:sans-serif;\
         color:rgba(0,0,0,0.15);white-space:nowrap;user-select:none;",
        font_px
    );

    Ok(format!(
        "(() => {{ \
           const settle = {settle}; \
           const old = document.getElementById({id}); if (old) old.remove(); \
           const el = document.createElement('div'); el.id = {id}; \
           el.setAttribute('style', {container}); \
           const label = document.createElement('span'); \
           label.setAttribute('style', {label}); \
           label.textContent = {text}; \
           el.appendChild(label); \
           (document.body || document.documentElement).appendChild(el); \
           return settle(true); \
         }})()",
        settle = SETTLE_JS,
        id = js_string(WATERMARK_ID)?,
        container = js_string(&container_style)?,
        label = js_string(&label_style)?,
        text = js_string(text)?,
    ))
}

fn stamp_script(data_url: &str, size: StampSize) -> Result<String> {
    let style = format!(
        "position:fixed;right:{inset}px;bottom:{inset}px;width:{w}px;height:{h}px;\
         object-fit:contain;pointer-events:none;z-index:{z};",
        inset = STAMP_INSET_PX,
        w = size.width,
        h = size.height,
        z = STAMP_Z_INDEX
    );

    Ok(format!(
        "(() => {{ \
           const settle = {settle}; \
           const old = document.getElementById({id}); if (old) old.remove(); \
           const img = document.createElement('img'); img.id = {id}; img.alt = ''; \
           img.setAttribute('style', {style}); \
           const decoded = new Promise((resolve) => {{ \
             img.onload = () => resolve(true); img.onerror = () => resolve(false); }}); \
           img.src = {src}; \
           (document.body || document.documentElement).appendChild(img); \
           return decoded.then(settle); \
         }})()",
        settle = SETTLE_JS,
        id = js_string(STAMP_ID)?,
        style = js_string(&style)?,
        src = js_string(data_url)?,
    ))
}

fn presence_script(id: &str) -> Result<String> {
    Ok(format!("document.getElementById({}) !== null", js_string(id)?))
}

// ============================================================================
// Readiness
// ============================================================================

fn inject(session: &dyn PageSession, script: &str, id: &str) -> Result<()> {
    let ready = session
        .evaluate(script, true)
        .map_err(|e| BrowserError::Script(format!("{} injection failed: {}", id, e)))?;

    if ready.as_bool() == Some(false) {
        return Err(BrowserError::OverlayNotReady(format!(
            "{} could not be rendered",
            id
        )));
    }
    Ok(())
}

/// Poll until node `id` exists, bounded by `settle_timeout` and `deadline`.
fn confirm_present(
    session: &dyn PageSession,
    id: &str,
    deadline: &Deadline,
    settle_timeout: Duration,
) -> Result<()> {
    let script = presence_script(id)?;
    let started = Instant::now();

    loop {
        deadline.check("overlay readiness")?;

        if session.evaluate(&script, false)?.as_bool() == Some(true) {
            log::trace!("[{}] {} confirmed after {:?}", session.id(), id, started.elapsed());
            return Ok(());
        }

        if started.elapsed() >= settle_timeout {
            return Err(BrowserError::OverlayNotReady(format!(
                "{} not present after {:?}",
                id, settle_timeout
            )));
        }

        deadline.sleep(PRESENCE_POLL_INTERVAL);
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
