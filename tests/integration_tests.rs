//! Integration tests for the HTTP surface, driven through the router with a
//! mock browser.

mod common;

use std::time::Duration;

use axum::http::StatusCode;
use common::*;
use html2pdf_overlay_api::ServiceConfigBuilder;
use html2pdf_overlay_api::factory::mock::{FailurePoint, MOCK_PDF, MockBrowserFactory};

const FROM_URL: &str = "/api/pdf/from-url";
const FROM_HTML: &str = "/api/pdf/from-html";

// ============================================================================
// API-key gate
// ============================================================================

/// Protected routes without the header answer 401 with the fixed message.
#[tokio::test]
async fn test_missing_key_is_rejected() {
    let (app, manager) = app(MockBrowserFactory::new());

    for request in [
        post_form(FROM_URL, None, "url=https%3A%2F%2Fexample.com"),
        post_form(FROM_HTML, None, &format!("htmlContent={}", HELLO_HTML_ENCODED)),
        get("/debug/config", None),
    ] {
        let response = send(&app, request).await;
        assert_eq!(response.status, StatusCode::UNAUTHORIZED);
        assert_eq!(response.text(), "API Key was not provided.");
    }

    assert_eq!(manager.launch_count(), 0, "Rejected requests must not launch");
}

/// One character off, or a case difference, is a mismatch.
#[tokio::test]
async fn test_wrong_key_is_rejected() {
    let (app, _manager) = app(MockBrowserFactory::new());

    let one_off = format!("{}x", &API_KEY[..API_KEY.len() - 1]);
    let upper = API_KEY.to_uppercase();

    for key in [one_off.as_str(), upper.as_str(), ""] {
        let request = post_form(FROM_HTML, Some(key), &format!("htmlContent={}", HELLO_HTML_ENCODED));
        let response = send(&app, request).await;

        assert_eq!(response.status, StatusCode::UNAUTHORIZED, "key {:?}", key);
        assert_eq!(response.text(), "Unauthorized client.");
    }
}

/// No configured secret: every protected request is a server error.
#[tokio::test]
async fn test_unconfigured_key_is_server_error() {
    let (app, _manager) = app_with_config(MockBrowserFactory::new(), config(None));

    for request in [
        post_form(FROM_URL, Some(API_KEY), "url=https%3A%2F%2Fexample.com"),
        post_form(FROM_HTML, Some("anything"), &format!("htmlContent={}", HELLO_HTML_ENCODED)),
        get("/debug/config", Some(API_KEY)),
    ] {
        let response = send(&app, request).await;
        assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(response.text(), "API Key is not configured on the server.");
    }
}

/// Header absence is checked before configuration.
#[tokio::test]
async fn test_missing_key_wins_over_unconfigured() {
    let (app, _manager) = app_with_config(MockBrowserFactory::new(), config(None));

    let response = send(&app, get("/debug/config", None)).await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
}

// ============================================================================
// Health & debug
// ============================================================================

#[tokio::test]
async fn test_health_needs_no_key() {
    let (app, manager) = app_with_config(MockBrowserFactory::new(), config(None));

    for key in [None, Some("wrong"), Some(API_KEY)] {
        let response = send(&app, get("/health", key)).await;
        assert_eq!(response.status, StatusCode::OK);

        let body = response.json();
        assert_eq!(body["status"], "Healthy");
        assert!(body["timestamp"].is_string());
    }

    assert!(!manager.is_launched(), "Health checks must not launch the browser");
}

#[tokio::test]
async fn test_debug_config_is_masked() {
    let (app, _manager) = app(MockBrowserFactory::new());

    let response = send(&app, get("/debug/config", Some(API_KEY))).await;
    assert_eq!(response.status, StatusCode::OK);

    let body = response.json();
    assert_eq!(body["apiKeyConfigured"], true);
    assert_eq!(body["apiKeyMasked"], "test***************6789");
    assert_eq!(body["configurationSource"], "environment");
    assert!(!response.text().contains(API_KEY));
}

#[tokio::test]
async fn test_every_response_has_request_id() {
    let (app, _manager) = app(MockBrowserFactory::new());

    let ok = send(&app, get("/health", None)).await;
    let denied = send(&app, get("/debug/config", None)).await;

    let first = ok.header("x-request-id").unwrap().to_string();
    let second = denied.header("x-request-id").unwrap().to_string();
    assert_eq!(first.len(), 36);
    assert_ne!(first, second);
}

// ============================================================================
// Rendering
// ============================================================================

#[tokio::test]
async fn test_html_without_overlays_renders_pdf() {
    let factory = MockBrowserFactory::new();
    let recorder = factory.recorder();
    let (app, _manager) = app(factory);

    let body = format!("htmlContent={}", HELLO_HTML_ENCODED);
    let response = send(&app, post_form(FROM_HTML, Some(API_KEY), &body)).await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.header("content-type"), Some("application/pdf"));
    assert_eq!(
        response.header("content-disposition"),
        Some("attachment; filename=\"document.pdf\"")
    );
    assert_eq!(response.header("cache-control"), Some("no-cache"));
    assert!(!response.body.is_empty());
    assert_eq!(&response.body[..], MOCK_PDF);

    assert_eq!(recorder.sessions_opened(), 1);
    assert_eq!(recorder.sessions_closed(), 1);
    assert!(!recorder.scripts().iter().any(|s| s.contains("__pdf_watermark")));
}

#[tokio::test]
async fn test_url_from_query_string() {
    let factory = MockBrowserFactory::new();
    let recorder = factory.recorder();
    let (app, _manager) = app(factory);

    let uri = format!("{}?url=https%3A%2F%2Fexample.com%2Freport", FROM_URL);
    let response = send(&app, post_form(&uri, Some(API_KEY), "")).await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(recorder.navigations(), vec!["https://example.com/report".to_string()]);
}

#[tokio::test]
async fn test_body_overrides_query() {
    let factory = MockBrowserFactory::new();
    let recorder = factory.recorder();
    let (app, _manager) = app(factory);

    let uri = format!("{}?url=https%3A%2F%2Fquery.example%2F", FROM_URL);
    let request = post_form(&uri, Some(API_KEY), "url=https%3A%2F%2Fbody.example%2F");
    let response = send(&app, request).await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(recorder.navigations(), vec!["https://body.example/".to_string()]);
}

/// Short and long watermarks are drawn with different font tiers.
#[tokio::test]
async fn test_watermark_font_tiers() {
    let factory = MockBrowserFactory::new();
    let recorder = factory.recorder();
    let (app, _manager) = app(factory);

    let short = "DRAFT";
    let long = "X".repeat(45);

    for text in [short, long.as_str()] {
        let body = format!("htmlContent={}&watermarkText={}", HELLO_HTML_ENCODED, text);
        let response = send(&app, post_form(FROM_HTML, Some(API_KEY), &body)).await;
        assert_eq!(response.status, StatusCode::OK);
    }

    let watermark_scripts: Vec<String> = recorder
        .scripts()
        .into_iter()
        .filter(|s| s.contains("label.textContent"))
        .collect();
    assert_eq!(watermark_scripts.len(), 2);
    assert!(watermark_scripts[0].contains("font-size:120px"));
    assert!(watermark_scripts[1].contains("font-size:40px"));
}

#[tokio::test]
async fn test_multipart_stamp_is_embedded() {
    let factory = MockBrowserFactory::new();
    let recorder = factory.recorder();
    let (app, _manager) = app(factory);

    let request = post_multipart(
        FROM_URL,
        Some(API_KEY),
        &[("url", "https://example.com/"), ("watermarkText", "PAID")],
        Some(("image/png", b"hello")),
    );
    let response = send(&app, request).await;

    assert_eq!(response.status, StatusCode::OK);
    let scripts = recorder.scripts();
    assert!(scripts.iter().any(|s| s.contains("data:image/png;base64,aGVsbG8=")));
    assert!(scripts.iter().any(|s| s.contains("width:150px;height:150px")));
    assert!(scripts.iter().any(|s| s.contains("\"PAID\"")));
}

#[tokio::test]
async fn test_html_stamp_uses_html_size() {
    let factory = MockBrowserFactory::new();
    let recorder = factory.recorder();
    let (app, _manager) = app(factory);

    let request = post_multipart(
        FROM_HTML,
        Some(API_KEY),
        &[("htmlContent", "<p>Invoice</p>")],
        Some(("image/jpeg", &[0xFF, 0xD8, 0xFF])),
    );
    let response = send(&app, request).await;

    assert_eq!(response.status, StatusCode::OK);
    assert!(recorder.scripts().iter().any(|s| s.contains("width:180px;height:180px")));
}

// ============================================================================
// Client errors
// ============================================================================

#[tokio::test]
async fn test_input_errors_are_bad_requests() {
    let factory = MockBrowserFactory::new();
    let recorder = factory.recorder();
    let (app, _manager) = app(factory);

    let cases = [
        post_form(FROM_URL, Some(API_KEY), ""),
        post_form(FROM_URL, Some(API_KEY), "url=ftp%3A%2F%2Fexample.com"),
        post_form(FROM_HTML, Some(API_KEY), ""),
        post_form(FROM_HTML, Some(API_KEY), "htmlContent=%20%20"),
        post_multipart(
            FROM_HTML,
            Some(API_KEY),
            &[("htmlContent", "<p>x</p>")],
            Some(("text/html", b"<script>")),
        ),
    ];

    for request in cases {
        let response = send(&app, request).await;
        assert_eq!(response.status, StatusCode::BAD_REQUEST);
        assert_eq!(
            response.header("content-type"),
            Some("application/problem+json")
        );
        assert_eq!(response.json()["status"], 400);
    }

    assert_eq!(recorder.launches(), 0, "Bad input must not launch the browser");
}

#[tokio::test]
async fn test_oversized_upload_is_rejected() {
    let config = ServiceConfigBuilder::new()
        .api_key(API_KEY)
        .max_upload_bytes(1024)
        .build()
        .unwrap();
    let (app, _manager) = app_with_config(MockBrowserFactory::new(), config);

    let big = vec![0u8; 4096];
    let request = post_multipart(
        FROM_HTML,
        Some(API_KEY),
        &[("htmlContent", "<p>x</p>")],
        Some(("image/png", &big)),
    );
    let response = send(&app, request).await;

    assert_eq!(response.status, StatusCode::PAYLOAD_TOO_LARGE);
}

// ============================================================================
// Render failures
// ============================================================================

/// Loader failure: generic 500, no engine text, session released once.
#[tokio::test]
async fn test_loader_failure_is_generic_and_releases_session() {
    let factory = MockBrowserFactory::new().failing_at(FailurePoint::Navigate);
    let recorder = factory.recorder();
    let (app, _manager) = app(factory);

    let response = send(
        &app,
        post_form(FROM_URL, Some(API_KEY), "url=https%3A%2F%2Funreachable.invalid"),
    )
    .await;

    assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        response.header("content-type"),
        Some("application/problem+json")
    );

    let body = response.json();
    assert_eq!(body["status"], 500);
    assert_eq!(body["traceId"], response.header("x-request-id").unwrap());
    assert!(body.get("detail").is_none());
    assert!(!response.text().contains("ERR_NAME_NOT_RESOLVED"));

    assert_eq!(recorder.sessions_opened(), 1);
    assert_eq!(recorder.sessions_closed(), 1);
}

/// Renderer failure: generic 500, session released once.
#[tokio::test]
async fn test_render_failure_releases_session() {
    let factory = MockBrowserFactory::new().failing_at(FailurePoint::Print);
    let recorder = factory.recorder();
    let (app, _manager) = app(factory);

    let body = format!("htmlContent={}&watermarkText=DRAFT", HELLO_HTML_ENCODED);
    let response = send(&app, post_form(FROM_HTML, Some(API_KEY), &body)).await;

    assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(!response.text().contains("Printing failed"));
    assert_eq!(recorder.sessions_opened(), 1);
    assert_eq!(recorder.sessions_closed(), 1);
}

#[tokio::test]
async fn test_launch_failure_is_service_unavailable() {
    let factory = MockBrowserFactory::always_fails("Chrome not installed");
    let recorder = factory.recorder();
    let (app, _manager) = app(factory);

    let body = format!("htmlContent={}", HELLO_HTML_ENCODED);
    let first = send(&app, post_form(FROM_HTML, Some(API_KEY), &body)).await;
    let second = send(&app, post_form(FROM_HTML, Some(API_KEY), &body)).await;

    assert_eq!(first.status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(second.status, StatusCode::SERVICE_UNAVAILABLE);
    assert!(!first.text().contains("Chrome not installed"));
    assert_eq!(recorder.launches(), 2, "Failed launches are retried by later requests");
}

#[tokio::test]
async fn test_render_budget_exceeded_is_gateway_timeout() {
    let config = ServiceConfigBuilder::new()
        .api_key(API_KEY)
        .render_timeout(Duration::from_millis(300))
        .overlay_settle_timeout(Duration::from_millis(100))
        .build()
        .unwrap();
    let factory = MockBrowserFactory::new().with_launch_delay(Duration::from_secs(1));
    let (app, _manager) = app_with_config(factory, config);

    let body = format!("htmlContent={}", HELLO_HTML_ENCODED);
    let response = send(&app, post_form(FROM_HTML, Some(API_KEY), &body)).await;

    assert_eq!(response.status, StatusCode::GATEWAY_TIMEOUT);
    assert_eq!(response.json()["status"], 504);
}

#[tokio::test]
async fn test_launch_outlives_timed_out_requests() {
    let config = ServiceConfigBuilder::new()
        .api_key(API_KEY)
        .render_timeout(Duration::from_millis(1200))
        .overlay_settle_timeout(Duration::from_millis(500))
        .build()
        .unwrap();
    let factory = MockBrowserFactory::new().with_launch_delay(Duration::from_secs(2));
    let recorder = factory.recorder();
    let (app, manager) = app_with_config(factory, config);

    let body = format!("htmlContent={}", HELLO_HTML_ENCODED);
    let (first, second) = tokio::join!(
        send(&app, post_form(FROM_HTML, Some(API_KEY), &body)),
        send(&app, post_form(FROM_HTML, Some(API_KEY), &body)),
    );
    assert_eq!(first.status, StatusCode::GATEWAY_TIMEOUT);
    assert_eq!(second.status, StatusCode::GATEWAY_TIMEOUT);

    tokio::time::sleep(Duration::from_millis(1500)).await;
    assert!(manager.is_launched());

    let third = send(&app, post_form(FROM_HTML, Some(API_KEY), &body)).await;
    assert_eq!(third.status, StatusCode::OK);
    assert_eq!(recorder.launches(), 1, "timed-out requests must not restart the launch");
}

#[tokio::test]
async fn test_shutdown_refuses_renders() {
    let (app, manager) = app(MockBrowserFactory::new());
    manager.shutdown();

    let body = format!("htmlContent={}", HELLO_HTML_ENCODED);
    let response = send(&app, post_form(FROM_HTML, Some(API_KEY), &body)).await;

    assert_eq!(response.status, StatusCode::SERVICE_UNAVAILABLE);
}
