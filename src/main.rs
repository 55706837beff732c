//! html2pdf-overlay-api server binary.
//!
//! ```bash
//! API_KEY=change-me-please RUST_LOG=info html2pdf-overlay-api
//! ```
//!
//! Configuration comes from the environment and an optional `app.env` file;
//! see [`html2pdf_overlay_api::config::env`].

use std::sync::Arc;

use html2pdf_overlay_api::integrations::axum::{AppState, build_router};
use html2pdf_overlay_api::{BrowserManager, ChromeBrowserFactory, ServiceConfig};
use tokio::signal;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    log::info!("🚀 Starting html2pdf-overlay-api...");

    let config = load_config()?;
    let bind_address = config.bind_address();

    let factory = ChromeBrowserFactory::from_optional_path(config.chrome_path.clone());
    let manager = BrowserManager::new(Box::new(factory)).into_shared();

    if config.browser_warmup {
        // A failed warmup is not fatal: the first request launches again.
        if let Err(e) = manager.warmup().await {
            log::warn!("⚠️ Browser warmup failed, will launch on first request: {}", e);
        }
    }

    let app = build_router(AppState::new(Arc::clone(&manager), config));

    let listener = tokio::net::TcpListener::bind(&bind_address).await?;
    log::info!("🌐 Listening on http://{}", bind_address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    manager.shutdown();
    log::info!("👋 Server stopped");
    Ok(())
}

#[cfg(feature = "env-config")]
fn load_config() -> Result<ServiceConfig, Box<dyn std::error::Error>> {
    Ok(html2pdf_overlay_api::config::env::from_env()?)
}

#[cfg(not(feature = "env-config"))]
fn load_config() -> Result<ServiceConfig, Box<dyn std::error::Error>> {
    log::warn!("⚠️ env-config feature disabled, using defaults (no API key)");
    Ok(ServiceConfig::default())
}

/// Resolve on Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            log::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                log::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    log::info!("🛑 Shutdown signal received, draining requests...");
}
