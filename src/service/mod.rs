//! PDF generation service module.
//!
//! This module is the **framework-agnostic core** of the service: request and
//! error types, content loading, overlay injection and the render pipeline.
//! The axum integration only maps HTTP onto it.
//!
//! # Module Overview
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────────┐
//! │                     service module (this module)                  │
//! │                                                                   │
//! │  ┌──────────────┐  ┌──────────────┐  ┌──────────────┐  ┌────────┐ │
//! │  │  types.rs    │  │  loader.rs   │  │  overlay.rs  │  │ pdf.rs │ │
//! │  │ RenderRequest│  │ validate_url │  │ watermark    │  │pipeline│ │
//! │  │ PdfResponse  │  │ load_from_*  │  │ stamp        │  │ render │ │
//! │  │ errors       │  │ network idle │  │ readiness    │  │        │ │
//! │  └──────────────┘  └──────────────┘  └──────────────┘  └────────┘ │
//! └───────────────────────────────────┬───────────────────────────────┘
//!                                     │ used by
//!                                     ▼
//!                      integrations::axum (handlers)
//! ```
//!
//! # Design Philosophy
//!
//! | Layer | Responsibility | This Module? |
//! |-------|----------------|--------------|
//! | **Service** | Validation, loading, overlays, PDF generation | ✅ Yes |
//! | **Handler** | HTTP parsing, auth, response mapping | ❌ No (integrations) |
//!
//! # Blocking
//!
//! Everything that touches a session blocks. Call it from
//! `tokio::task::spawn_blocking`.

pub mod loader;
pub mod overlay;
mod pdf;
mod types;

pub use types::{
    DebugConfigResponse, HealthResponse, PdfResponse, PdfServiceError, ProblemDetails,
    RenderRequest, RenderSettings, RenderSource, StampImage, StampSize,
};
pub use types::{
    DEFAULT_OVERLAY_SETTLE_TIMEOUT_MS, DEFAULT_STAMP_CONTENT_TYPE, DEFAULT_STAMP_SIZE_HTML_PX,
    DEFAULT_STAMP_SIZE_URL_PX, PDF_FILENAME,
};

pub use pdf::{
    HTML_PREVIEW_CHARS, generate_pdf, generate_pdf_from_html, generate_pdf_from_url, render,
    truncate_for_log,
};

pub use overlay::watermark_font_size;
