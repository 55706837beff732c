//! Request, response, and error types for the PDF service.
//!
//! These types are framework-agnostic; the axum integration maps them onto
//! HTTP.
//!
//! # Overview
//!
//! | Type | Purpose |
//! |------|---------|
//! | [`RenderRequest`] | One immutable render job (source + overlays) |
//! | [`RenderSource`] | URL or inline HTML |
//! | [`StampImage`] | Uploaded stamp bytes + declared content type |
//! | [`RenderSettings`] | Stamp sizes and overlay settle timeout |
//! | [`PdfResponse`] | Rendered PDF bytes + fixed download name |
//! | [`HealthResponse`] | `GET /health` body |
//! | [`DebugConfigResponse`] | `GET /debug/config` body |
//! | [`ProblemDetails`] | Generic error body (`application/problem+json`) |
//! | [`PdfServiceError`] | Every service failure, with HTTP status mapping |

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::BrowserError;

/// File name used for every rendered PDF.
pub const PDF_FILENAME: &str = "document.pdf";

/// Stamp content type assumed when the upload does not declare one.
pub const DEFAULT_STAMP_CONTENT_TYPE: &str = "image/png";

pub const DEFAULT_STAMP_SIZE_URL_PX: u32 = 150;
pub const DEFAULT_STAMP_SIZE_HTML_PX: u32 = 180;
pub const DEFAULT_OVERLAY_SETTLE_TIMEOUT_MS: u64 = 2000;

/// Content types accepted for stamp images.
const ALLOWED_STAMP_TYPES: &[&str] = &[
    "image/png",
    "image/jpeg",
    "image/jpg",
    "image/gif",
    "image/webp",
    "image/svg+xml",
    "image/bmp",
];

// ============================================================================
// Request Types
// ============================================================================

/// Where the document comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderSource {
    Url(String),
    Html(String),
}

impl RenderSource {
    /// Short label for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Url(_) => "url",
            Self::Html(_) => "html",
        }
    }
}

/// Uploaded stamp image.
#[derive(Clone, PartialEq, Eq)]
pub struct StampImage {
    pub bytes: Vec<u8>,
    pub content_type: String,
}

impl StampImage {
    /// Build a stamp, defaulting and validating the content type.
    ///
    /// Parameters such as `; charset=...` are stripped and the type is
    /// lower-cased.
    ///
    /// # Errors
    ///
    /// [`PdfServiceError::InvalidStamp`] if the bytes are empty or the type is
    /// not an image type.
    pub fn new(bytes: Vec<u8>, content_type: Option<&str>) -> Result<Self, PdfServiceError> {
        if bytes.is_empty() {
            return Err(PdfServiceError::InvalidStamp(
                "stamp image is empty".to_string(),
            ));
        }

        let content_type = content_type
            .and_then(|ct| ct.split(';').next())
            .map(|ct| ct.trim().to_ascii_lowercase())
            .filter(|ct| !ct.is_empty())
            .unwrap_or_else(|| DEFAULT_STAMP_CONTENT_TYPE.to_string());

        if !ALLOWED_STAMP_TYPES.contains(&content_type.as_str()) {
            return Err(PdfServiceError::InvalidStamp(format!(
                "unsupported stamp content type '{}'",
                content_type
            )));
        }

        Ok(Self {
            bytes,
            content_type,
        })
    }
}

impl std::fmt::Debug for StampImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StampImage")
            .field("bytes", &self.bytes.len())
            .field("content_type", &self.content_type)
            .finish()
    }
}

/// One render job. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderRequest {
    pub source: RenderSource,
    pub watermark_text: Option<String>,
    pub stamp: Option<StampImage>,
}

impl RenderRequest {
    pub fn from_url(url: impl Into<String>) -> Self {
        Self {
            source: RenderSource::Url(url.into()),
            watermark_text: None,
            stamp: None,
        }
    }

    pub fn from_html(html: impl Into<String>) -> Self {
        Self {
            source: RenderSource::Html(html.into()),
            watermark_text: None,
            stamp: None,
        }
    }

    pub fn with_watermark(mut self, text: impl Into<String>) -> Self {
        self.watermark_text = Some(text.into());
        self
    }

    pub fn with_stamp(mut self, stamp: StampImage) -> Self {
        self.stamp = Some(stamp);
        self
    }

    /// Watermark text if it is worth drawing (non-blank).
    pub fn watermark(&self) -> Option<&str> {
        self.watermark_text
            .as_deref()
            .filter(|text| !text.trim().is_empty())
    }
}

/// Pixel size of the stamp image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StampSize {
    pub width: u32,
    pub height: u32,
}

impl StampSize {
    pub const fn square(px: u32) -> Self {
        Self {
            width: px,
            height: px,
        }
    }
}

/// Per-deployment rendering knobs, shared by every request.
///
/// | Field | Default |
/// |-------|---------|
/// | `stamp_size_url` | 150×150 px |
/// | `stamp_size_html` | 180×180 px |
/// | `overlay_settle_timeout` | 2s |
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderSettings {
    pub stamp_size_url: StampSize,
    pub stamp_size_html: StampSize,
    /// Upper bound for confirming an injected overlay is in the DOM.
    pub overlay_settle_timeout: Duration,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            stamp_size_url: StampSize::square(DEFAULT_STAMP_SIZE_URL_PX),
            stamp_size_html: StampSize::square(DEFAULT_STAMP_SIZE_HTML_PX),
            overlay_settle_timeout: Duration::from_millis(DEFAULT_OVERLAY_SETTLE_TIMEOUT_MS),
        }
    }
}

// ============================================================================
// Response Types
// ============================================================================

/// A rendered PDF.
#[derive(Debug, Clone)]
pub struct PdfResponse {
    pub data: Vec<u8>,
    pub filename: String,
}

impl PdfResponse {
    /// Wrap PDF bytes under the fixed download name.
    pub fn new(data: Vec<u8>) -> Self {
        Self {
            data,
            filename: PDF_FILENAME.to_string(),
        }
    }

    /// `Content-Disposition` header value (always a download).
    pub fn content_disposition(&self) -> String {
        format!("attachment; filename=\"{}\"", self.filename)
    }

    pub fn size(&self) -> usize {
        self.data.len()
    }
}

/// Body of `GET /health`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

impl HealthResponse {
    pub fn healthy() -> Self {
        Self {
            status: "Healthy".to_string(),
            timestamp: chrono::Utc::now(),
        }
    }
}

/// Body of `GET /debug/config`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DebugConfigResponse {
    pub api_key_configured: bool,
    pub api_key_masked: String,
    pub configuration_source: String,
}

/// RFC 7807 problem body.
///
/// Only generic text goes here; engine messages stay in the server log.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProblemDetails {
    #[serde(rename = "type")]
    pub kind: String,
    pub title: String,
    pub status: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    pub trace_id: String,
}

impl ProblemDetails {
    /// Problem body for `error`, tagged with `trace_id`.
    ///
    /// Client errors (4xx) carry a `detail` naming the bad input; server
    /// errors never do.
    pub fn from_error(error: &PdfServiceError, trace_id: &str) -> Self {
        let status = error.status_code();
        Self {
            kind: "about:blank".to_string(),
            title: error.public_title().to_string(),
            status,
            detail: error.client_detail(),
            trace_id: trace_id.to_string(),
        }
    }
}

// ============================================================================
// Error Types
// ============================================================================

/// Errors that can occur while serving a PDF request.
///
/// | Error | HTTP Status | Retryable |
/// |-------|-------------|-----------|
/// | `MissingField` / `InvalidUrl` / `EmptyHtml` / `InvalidStamp` / `InvalidForm` | 400 | No |
/// | `PayloadTooLarge` | 413 | No |
/// | `BrowserUnavailable` / `ShuttingDown` | 503 | Yes |
/// | `Timeout` | 504 | Yes |
/// | everything else | 500 | No |
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PdfServiceError {
    /// A required input field was absent or blank.
    MissingField(&'static str),

    InvalidUrl(String),

    EmptyHtml,

    InvalidStamp(String),

    /// The request body could not be parsed.
    InvalidForm(String),

    PayloadTooLarge,

    /// The browser could not be launched.
    BrowserUnavailable(String),

    SessionCreationFailed(String),

    ContentLoadFailed(String),

    OverlayFailed(String),

    PdfGenerationFailed(String),

    /// The request deadline elapsed.
    Timeout(String),

    ShuttingDown,

    Internal(String),
}

impl std::fmt::Display for PdfServiceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingField(field) => write!(f, "Missing required field: {}", field),
            Self::InvalidUrl(msg) => write!(f, "Invalid URL: {}", msg),
            Self::EmptyHtml => write!(f, "HTML content is required"),
            Self::InvalidStamp(msg) => write!(f, "Invalid stamp image: {}", msg),
            Self::InvalidForm(msg) => write!(f, "Invalid form data: {}", msg),
            Self::PayloadTooLarge => write!(f, "Request body exceeds the upload limit"),
            Self::BrowserUnavailable(msg) => write!(f, "Browser unavailable: {}", msg),
            Self::SessionCreationFailed(msg) => write!(f, "Failed to create session: {}", msg),
            Self::ContentLoadFailed(msg) => write!(f, "Content load failed: {}", msg),
            Self::OverlayFailed(msg) => write!(f, "Overlay injection failed: {}", msg),
            Self::PdfGenerationFailed(msg) => write!(f, "PDF generation failed: {}", msg),
            Self::Timeout(msg) => write!(f, "Operation timeout: {}", msg),
            Self::ShuttingDown => write!(f, "Service is shutting down"),
            Self::Internal(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for PdfServiceError {}

impl PdfServiceError {
    /// HTTP status code for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::MissingField(_)
            | Self::InvalidUrl(_)
            | Self::EmptyHtml
            | Self::InvalidStamp(_)
            | Self::InvalidForm(_) => 400,
            Self::PayloadTooLarge => 413,
            Self::BrowserUnavailable(_) | Self::ShuttingDown => 503,
            Self::Timeout(_) => 504,
            Self::SessionCreationFailed(_)
            | Self::ContentLoadFailed(_)
            | Self::OverlayFailed(_)
            | Self::PdfGenerationFailed(_)
            | Self::Internal(_) => 500,
        }
    }

    /// Machine-readable code for logs.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::MissingField(_) => "MISSING_FIELD",
            Self::InvalidUrl(_) => "INVALID_URL",
            Self::EmptyHtml => "EMPTY_HTML",
            Self::InvalidStamp(_) => "INVALID_STAMP",
            Self::InvalidForm(_) => "INVALID_FORM",
            Self::PayloadTooLarge => "PAYLOAD_TOO_LARGE",
            Self::BrowserUnavailable(_) => "BROWSER_UNAVAILABLE",
            Self::SessionCreationFailed(_) => "SESSION_CREATION_FAILED",
            Self::ContentLoadFailed(_) => "CONTENT_LOAD_FAILED",
            Self::OverlayFailed(_) => "OVERLAY_FAILED",
            Self::PdfGenerationFailed(_) => "PDF_GENERATION_FAILED",
            Self::Timeout(_) => "TIMEOUT",
            Self::ShuttingDown => "SHUTTING_DOWN",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    pub fn is_client_error(&self) -> bool {
        (400..500).contains(&self.status_code())
    }

    /// Title safe to show to clients.
    pub fn public_title(&self) -> &'static str {
        match self.status_code() {
            400 => "The request is invalid.",
            413 => "The request body is too large.",
            503 => "The PDF service is temporarily unavailable.",
            504 => "PDF generation timed out.",
            _ => "An error occurred while generating the PDF.",
        }
    }

    /// Detail safe to show to clients: only for caller mistakes.
    pub fn client_detail(&self) -> Option<String> {
        self.is_client_error().then(|| self.to_string())
    }

    /// Wrap a browser error raised while loading content.
    pub fn content_load(error: BrowserError) -> Self {
        Self::from_browser(error, Self::ContentLoadFailed)
    }

    /// Wrap a browser error raised while injecting overlays.
    pub fn overlay(error: BrowserError) -> Self {
        Self::from_browser(error, Self::OverlayFailed)
    }

    /// Wrap a browser error raised while printing.
    pub fn pdf_generation(error: BrowserError) -> Self {
        Self::from_browser(error, Self::PdfGenerationFailed)
    }

    /// Deadline and shutdown errors keep their own variant whatever the step.
    fn from_browser(error: BrowserError, wrap: fn(String) -> Self) -> Self {
        match error {
            BrowserError::Timeout(step) => Self::Timeout(step),
            BrowserError::Cancelled => Self::Timeout("request cancelled".to_string()),
            BrowserError::ShuttingDown => Self::ShuttingDown,
            other => wrap(other.to_string()),
        }
    }
}

impl From<BrowserError> for PdfServiceError {
    /// Errors from acquiring the browser or a session.
    fn from(error: BrowserError) -> Self {
        match error {
            BrowserError::Launch(msg) | BrowserError::Configuration(msg) => {
                Self::BrowserUnavailable(msg)
            }
            BrowserError::SessionCreation(msg) => Self::SessionCreationFailed(msg),
            other => Self::from_browser(other, Self::Internal),
        }
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
