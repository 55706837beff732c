//! Shared helpers for HTTP-level tests.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::body::{Body, Bytes};
use axum::http::{HeaderMap, Request, StatusCode};
use html2pdf_overlay_api::factory::mock::MockBrowserFactory;
use html2pdf_overlay_api::integrations::axum::{AppState, build_router};
use html2pdf_overlay_api::{BrowserManager, ServiceConfig, ServiceConfigBuilder};
use tower::ServiceExt;

pub const API_KEY: &str = "test-api-key-0123456789";

pub const HELLO_HTML_ENCODED: &str = "%3Chtml%3E%3Cbody%3EHi%3C%2Fbody%3E%3C%2Fhtml%3E";

pub const BOUNDARY: &str = "----html2pdf-test-boundary";

pub fn config(api_key: Option<&str>) -> ServiceConfig {
    let builder = ServiceConfigBuilder::new()
        .render_timeout(Duration::from_secs(20))
        .overlay_settle_timeout(Duration::from_secs(2));
    let builder = match api_key {
        Some(key) => builder.api_key(key),
        None => builder,
    };
    builder.build().unwrap()
}

/// Router backed by `factory`, plus the manager for later inspection.
pub fn app_with_config(factory: MockBrowserFactory, config: ServiceConfig) -> (Router, Arc<BrowserManager>) {
    let manager = BrowserManager::new(Box::new(factory)).into_shared();
    let router = build_router(AppState::new(Arc::clone(&manager), config));
    (router, manager)
}

pub fn app(factory: MockBrowserFactory) -> (Router, Arc<BrowserManager>) {
    app_with_config(factory, config(Some(API_KEY)))
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl TestResponse {
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    pub fn json(&self) -> serde_json::Value {
        serde_json::from_slice(&self.body).unwrap()
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

pub async fn send(app: &Router, request: Request<Body>) -> TestResponse {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    TestResponse {
        status,
        headers,
        body,
    }
}

pub fn get(uri: &str, api_key: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some(key) = api_key {
        builder = builder.header("X-API-KEY", key);
    }
    builder.body(Body::empty()).unwrap()
}

pub fn post_form(uri: &str, api_key: Option<&str>, body: &str) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/x-www-form-urlencoded");
    if let Some(key) = api_key {
        builder = builder.header("X-API-KEY", key);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

/// Multipart body with text `fields` and an optional `stampImageFile` part.
pub fn post_multipart(
    uri: &str,
    api_key: Option<&str>,
    fields: &[(&str, &str)],
    stamp: Option<(&str, &[u8])>,
) -> Request<Body> {
    let mut body = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            )
            .as_bytes(),
        );
    }
    if let Some((content_type, bytes)) = stamp {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"stampImageFile\"; \
                 filename=\"stamp\"\r\nContent-Type: {content_type}\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", format!("multipart/form-data; boundary={BOUNDARY}"));
    if let Some(key) = api_key {
        builder = builder.header("X-API-KEY", key);
    }
    builder.body(Body::from(body)).unwrap()
}
