//! Axum HTTP surface.
//!
//! This module wires the service into an axum [`Router`]: application state,
//! the API-key middleware, request ids, form extraction and the four
//! handlers.
//!
//! # Routes
//!
//! | Method | Path | Auth | Handler |
//! |--------|------|------|---------|
//! | POST | `/api/pdf/from-url` | ✅ | [`pdf_from_url`] |
//! | POST | `/api/pdf/from-html` | ✅ | [`pdf_from_html`] |
//! | GET | `/health` | ❌ | [`health`] |
//! | GET | `/debug/config` | ✅ | [`debug_config`] |
//!
//! # Layers
//!
//! ```text
//! request ──▶ assign_request_id ──▶ DefaultBodyLimit ──▶ require_api_key ──▶ handler
//!                  │                                        (route_layer,
//!                  └── X-Request-Id on every response        not on /health)
//! ```
//!
//! # Usage
//!
//! ```rust,ignore
//! use html2pdf_overlay_api::integrations::axum::{AppState, build_router};
//!
//! let state = AppState::new(manager, config);
//! let app = build_router(state);
//!
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:8080").await?;
//! axum::serve(listener, app).await?;
//! ```

use std::sync::Arc;
use std::time::Instant;

use axum::Json;
use axum::Router;
use axum::extract::{
    DefaultBodyLimit, Form, FromRequest, FromRequestParts, Multipart, Query, Request, State,
};
use axum::http::header::{CACHE_CONTROL, CONTENT_DISPOSITION, CONTENT_TYPE};
use axum::http::request::Parts;
use axum::http::{HeaderName, HeaderValue, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use serde::Deserialize;
use tower::ServiceBuilder;

use crate::auth::{self, API_KEY_HEADER};
use crate::config::ServiceConfig;
use crate::deadline::{CancellationFlag, Deadline};
use crate::manager::BrowserManager;
use crate::service::{
    self, DebugConfigResponse, HTML_PREVIEW_CHARS, HealthResponse, PdfResponse, PdfServiceError,
    ProblemDetails, RenderRequest, RenderSettings, RenderSource, StampImage,
};

/// Response header echoing the request id.
pub const REQUEST_ID_HEADER: HeaderName = HeaderName::from_static("x-request-id");

// ============================================================================
// State
// ============================================================================

/// Shared application state.
///
/// Cheap to clone; both fields are `Arc`s.
#[derive(Clone)]
pub struct AppState {
    pub manager: Arc<BrowserManager>,
    pub config: Arc<ServiceConfig>,
}

impl AppState {
    pub fn new(manager: Arc<BrowserManager>, config: ServiceConfig) -> Self {
        Self {
            manager,
            config: Arc::new(config),
        }
    }
}

// ============================================================================
// Router
// ============================================================================

/// Build the application router.
pub fn build_router(state: AppState) -> Router {
    let protected = Router::new()
        .route("/api/pdf/from-url", post(pdf_from_url))
        .route("/api/pdf/from-html", post(pdf_from_html))
        .route("/debug/config", get(debug_config))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            require_api_key,
        ));

    Router::new()
        .route("/health", get(health))
        .merge(protected)
        .layer(
            ServiceBuilder::new()
                .layer(middleware::from_fn(assign_request_id))
                .layer(DefaultBodyLimit::max(state.config.max_upload_bytes)),
        )
        .with_state(state)
}

// ============================================================================
// Middleware
// ============================================================================

/// Per-request identifier (uuid v4), also used as the problem `traceId`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestId(pub String);

impl RequestId {
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl<S> FromRequestParts<S> for RequestId
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(parts
            .extensions
            .get::<RequestId>()
            .cloned()
            .unwrap_or_else(RequestId::generate))
    }
}

/// Tag the request with a [`RequestId`] and echo it as `X-Request-Id`.
pub async fn assign_request_id(mut request: Request, next: Next) -> Response {
    let request_id = RequestId::generate();
    request.extensions_mut().insert(request_id.clone());

    let mut response = next.run(request).await;
    if let Ok(value) = HeaderValue::from_str(request_id.as_str()) {
        response
            .headers_mut()
            .insert(REQUEST_ID_HEADER, value);
    }
    response
}

/// API-key gate. Failures answer with a fixed plaintext body.
pub async fn require_api_key(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let provided = request
        .headers()
        .get(API_KEY_HEADER)
        .map(|value| String::from_utf8_lossy(value.as_bytes()).into_owned());

    match auth::verify_api_key(provided.as_deref(), state.config.api_key.as_deref()) {
        Ok(()) => next.run(request).await,
        Err(e) => {
            let status =
                StatusCode::from_u16(e.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
            (
                status,
                [(CONTENT_TYPE, "text/plain; charset=utf-8")],
                e.message(),
            )
                .into_response()
        }
    }
}

// ============================================================================
// Form Extraction
// ============================================================================

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FormFields {
    url: Option<String>,
    html_content: Option<String>,
    watermark_text: Option<String>,
}

/// Render inputs merged from the query string and the body.
///
/// The body may be `application/x-www-form-urlencoded` or
/// `multipart/form-data`; body fields override query fields. The stamp
/// (`stampImageFile`) only arrives as a multipart file part.
#[derive(Debug, Default)]
pub struct RenderForm {
    pub url: Option<String>,
    pub html_content: Option<String>,
    pub watermark_text: Option<String>,
    pub stamp: Option<StampImage>,
}

impl RenderForm {
    /// Build a URL render request, validating `url` before any browser work.
    pub fn into_url_request(self) -> Result<RenderRequest, PdfServiceError> {
        let url = self
            .url
            .as_deref()
            .ok_or(PdfServiceError::MissingField("url"))?;
        let url = service::loader::validate_url(url)?;
        Ok(self.with_source(RenderSource::Url(url.to_string())))
    }

    pub fn into_html_request(self) -> Result<RenderRequest, PdfServiceError> {
        let html = self
            .html_content
            .as_deref()
            .ok_or(PdfServiceError::MissingField("htmlContent"))?;
        service::loader::validate_html(html)?;
        let source = RenderSource::Html(html.to_string());
        Ok(self.with_source(source))
    }

    fn with_source(self, source: RenderSource) -> RenderRequest {
        RenderRequest {
            source,
            watermark_text: self.watermark_text,
            stamp: self.stamp,
        }
    }
}

impl<S> FromRequest<S> for RenderForm
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let request_id = req
            .extensions()
            .get::<RequestId>()
            .cloned()
            .unwrap_or_else(RequestId::generate);
        let reject = |error: PdfServiceError| ApiError::new(error, request_id.clone());

        let Query(query) = Query::<FormFields>::try_from_uri(req.uri())
            .map_err(|e| reject(PdfServiceError::InvalidForm(e.body_text())))?;

        let content_type = req
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default()
            .to_ascii_lowercase();

        let (body, stamp) = if content_type.starts_with("multipart/form-data") {
            let multipart = Multipart::from_request(req, state)
                .await
                .map_err(|e| reject(body_error(e.status(), e.body_text())))?;
            read_multipart(multipart).await.map_err(reject)?
        } else if content_type.starts_with("application/x-www-form-urlencoded") {
            let Form(fields) = Form::<FormFields>::from_request(req, state)
                .await
                .map_err(|e| reject(body_error(e.status(), e.body_text())))?;
            (fields, None)
        } else {
            (FormFields::default(), None)
        };

        Ok(RenderForm {
            url: body.url.or(query.url),
            html_content: body.html_content.or(query.html_content),
            watermark_text: body.watermark_text.or(query.watermark_text),
            stamp,
        })
    }
}

async fn read_multipart(
    mut multipart: Multipart,
) -> Result<(FormFields, Option<StampImage>), PdfServiceError> {
    let mut fields = FormFields::default();
    let mut stamp = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| body_error(e.status(), e.body_text()))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "url" | "htmlContent" | "watermarkText" => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| body_error(e.status(), e.body_text()))?;
                match name.as_str() {
                    "url" => fields.url = Some(text),
                    "htmlContent" => fields.html_content = Some(text),
                    _ => fields.watermark_text = Some(text),
                }
            }
            "stampImageFile" => {
                let content_type = field.content_type().map(str::to_string);
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| body_error(e.status(), e.body_text()))?;
                // Browsers send an empty part when no file was chosen
                if !bytes.is_empty() {
                    stamp = Some(StampImage::new(bytes.to_vec(), content_type.as_deref())?);
                }
            }
            other => log::trace!("Ignoring multipart field '{}'", other),
        }
    }

    Ok((fields, stamp))
}

fn body_error(status: StatusCode, text: String) -> PdfServiceError {
    if status == StatusCode::PAYLOAD_TOO_LARGE {
        PdfServiceError::PayloadTooLarge
    } else {
        PdfServiceError::InvalidForm(text)
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// Render a URL to PDF.
///
/// # Endpoint
///
/// ```text
/// POST /api/pdf/from-url?url=https://example.com&watermarkText=DRAFT
/// X-API-KEY: <secret>
/// ```
///
/// | Field | Required | Description |
/// |-------|----------|-------------|
/// | `url` | **Yes** | `http`/`https` URL |
/// | `watermarkText` | No | Diagonal watermark text |
/// | `stampImageFile` | No | Multipart image part, stamped bottom-right (150px) |
///
/// # Errors
///
/// | Status | Cause |
/// |--------|-------|
/// | 400 | Missing/invalid `url`, bad stamp, malformed body |
/// | 401 / 500 | API key gate |
/// | 500 | Load, overlay or print failure (generic problem body) |
/// | 503 | Browser unavailable or shutting down |
/// | 504 | Render budget exceeded |
pub async fn pdf_from_url(
    State(state): State<AppState>,
    request_id: RequestId,
    form: RenderForm,
) -> Response {
    match form.into_url_request() {
        Ok(request) => render(state, request, request_id).await,
        Err(e) => ApiError::new(e, request_id).into_response(),
    }
}

/// Render inline HTML to PDF.
///
/// Same contract as [`pdf_from_url`] with `htmlContent` (required) instead of
/// `url`; the stamp is 180px.
pub async fn pdf_from_html(
    State(state): State<AppState>,
    request_id: RequestId,
    form: RenderForm,
) -> Response {
    match form.into_html_request() {
        Ok(request) => render(state, request, request_id).await,
        Err(e) => ApiError::new(e, request_id).into_response(),
    }
}

/// Liveness recorder. Never touches the browser.
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse::healthy())
}

/// Report whether an API key is configured, masked, and where it came from.
pub async fn debug_config(State(state): State<AppState>) -> Json<DebugConfigResponse> {
    let config = &state.config;
    Json(DebugConfigResponse {
        api_key_configured: config.api_key_configured(),
        api_key_masked: auth::mask_key(config.api_key.as_deref()),
        configuration_source: config.api_key_source.to_string(),
    })
}

/// Acquire the browser and run the blocking pipeline under the render budget.
async fn render(state: AppState, request: RenderRequest, request_id: RequestId) -> Response {
    let started = Instant::now();
    let budget = state.config.render_timeout;
    let settings = state.config.render_settings();

    let kind = request.source.kind();
    let source = describe_source(&request.source);
    log::info!(
        "📥 [{}] PDF request: {} (watermark={}, stamp={})",
        request_id,
        source,
        request.watermark().is_some(),
        request.stamp.is_some()
    );

    let flag = CancellationFlag::new();
    let _cancel_guard = flag.cancel_on_drop();
    let deadline = Deadline::with_flag(budget, flag.clone());
    let job = run_render(Arc::clone(&state.manager), request, deadline, settings);

    let outcome = match tokio::time::timeout(budget, job).await {
        Ok(result) => result,
        Err(_elapsed) => {
            flag.cancel();
            Err(PdfServiceError::Timeout(format!(
                "render exceeded {}s",
                budget.as_secs()
            )))
        }
    };

    match outcome {
        Ok(pdf) => {
            log::info!(
                "✅ [{}] PDF ready ({}): {} bytes in {:?}",
                request_id,
                kind,
                pdf.size(),
                started.elapsed()
            );
            pdf_response(pdf)
        }
        Err(e) => {
            log::error!(
                "❌ [{}] PDF generation failed after {:?} ({}): {} | source: {}",
                request_id,
                started.elapsed(),
                e.error_code(),
                e,
                source
            );
            ApiError::new(e, request_id).into_response()
        }
    }
}

/// Launch-or-reuse the browser, then render on the blocking pool.
async fn run_render(
    manager: Arc<BrowserManager>,
    request: RenderRequest,
    deadline: Deadline,
    settings: RenderSettings,
) -> Result<PdfResponse, PdfServiceError> {
    let engine = manager.get_browser().await?;

    tokio::task::spawn_blocking(move || {
        service::generate_pdf(engine.as_ref(), &request, &deadline, &settings)
    })
    .await
    .map_err(|e| PdfServiceError::Internal(format!("render task failed: {}", e)))?
}

/// Log-safe description: the URL, or a truncated HTML preview.
fn describe_source(source: &RenderSource) -> String {
    match source {
        RenderSource::Url(url) => format!("url {}", url),
        RenderSource::Html(html) => format!(
            "html {:?}",
            service::truncate_for_log(html, HTML_PREVIEW_CHARS)
        ),
    }
}

// ============================================================================
// Responses
// ============================================================================

fn pdf_response(pdf: PdfResponse) -> Response {
    let disposition = pdf.content_disposition();
    (
        StatusCode::OK,
        [
            (CONTENT_TYPE, "application/pdf".to_string()),
            (CONTENT_DISPOSITION, disposition),
            (CACHE_CONTROL, "no-cache".to_string()),
        ],
        pdf.data,
    )
        .into_response()
}

/// A service error bound to its request, rendered as `application/problem+json`.
#[derive(Debug)]
pub struct ApiError {
    pub error: PdfServiceError,
    pub request_id: RequestId,
}

impl ApiError {
    pub fn new(error: PdfServiceError, request_id: RequestId) -> Self {
        Self { error, request_id }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.error.is_client_error() {
            log::warn!(
                "⚠️ [{}] Rejected request ({}): {}",
                self.request_id,
                self.error.error_code(),
                self.error
            );
        }

        let problem = ProblemDetails::from_error(&self.error, self.request_id.as_str());
        let status = StatusCode::from_u16(problem.status)
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let body = serde_json::to_vec(&problem).unwrap_or_default();

        (
            status,
            [(CONTENT_TYPE, "application/problem+json")],
            body,
        )
            .into_response()
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_form_requires_url() {
        let result = RenderForm::default().into_url_request();
        assert_eq!(result.unwrap_err(), PdfServiceError::MissingField("url"));
    }

    #[test]
    fn test_url_form_validates_scheme() {
        let form = RenderForm {
            url: Some("file:///etc/hosts".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            form.into_url_request(),
            Err(PdfServiceError::InvalidUrl(_))
        ));
    }

    #[test]
    fn test_html_form_carries_overlays() {
        let form = RenderForm {
            html_content: Some("<p>x</p>".to_string()),
            watermark_text: Some("DRAFT".to_string()),
            ..Default::default()
        };
        let request = form.into_html_request().unwrap();

        assert_eq!(request.source, RenderSource::Html("<p>x</p>".to_string()));
        assert_eq!(request.watermark(), Some("DRAFT"));
    }

    #[test]
    fn test_html_form_distinguishes_missing_and_empty() {
        assert_eq!(
            RenderForm::default().into_html_request().unwrap_err(),
            PdfServiceError::MissingField("htmlContent")
        );

        let form = RenderForm {
            html_content: Some("  ".to_string()),
            ..Default::default()
        };
        assert_eq!(form.into_html_request().unwrap_err(), PdfServiceError::EmptyHtml);
    }

    #[test]
    fn test_body_error_mapping() {
        assert_eq!(
            body_error(StatusCode::PAYLOAD_TOO_LARGE, String::new()),
            PdfServiceError::PayloadTooLarge
        );
        assert!(matches!(
            body_error(StatusCode::BAD_REQUEST, "bad".to_string()),
            PdfServiceError::InvalidForm(_)
        ));
    }

    #[test]
    fn test_describe_source_truncates_html() {
        let html = format!("<p>{}</p>", "x".repeat(500));
        let described = describe_source(&RenderSource::Html(html));
        assert!(described.len() < 130);
        assert!(described.contains("..."));
    }

    #[test]
    fn test_request_ids_are_unique() {
        assert_ne!(RequestId::generate(), RequestId::generate());
    }
}
