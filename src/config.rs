//! Service configuration.
//!
//! This module provides [`ServiceConfig`] and [`ServiceConfigBuilder`] for the
//! HTTP listener, the API key, render time limits and overlay sizing.
//!
//! # Example
//!
//! ```rust
//! use std::time::Duration;
//! use html2pdf_overlay_api::ServiceConfigBuilder;
//!
//! let config = ServiceConfigBuilder::new()
//!     .api_key("s3cr3t-value")
//!     .port(3000)
//!     .render_timeout(Duration::from_secs(30))
//!     .build()
//!     .expect("Invalid configuration");
//!
//! assert_eq!(config.port, 3000);
//! assert!(config.api_key.is_some());
//! ```
//!
//! # Environment Configuration
//!
//! When the `env-config` feature is enabled, configuration is read from the
//! process environment and an optional `app.env` file:
//!
//! ```rust,ignore
//! use html2pdf_overlay_api::config::env::from_env;
//!
//! let config = from_env()?;
//! ```
//!
//! See [`mod@env`] module for available environment variables.

use std::time::Duration;

use crate::auth::mask_key;
use crate::service::{
    DEFAULT_OVERLAY_SETTLE_TIMEOUT_MS, DEFAULT_STAMP_SIZE_HTML_PX, DEFAULT_STAMP_SIZE_URL_PX,
    RenderSettings, StampSize,
};

/// Default listen address.
pub const DEFAULT_HOST: &str = "0.0.0.0";

pub const DEFAULT_PORT: u16 = 8080;

/// Default whole-request render budget in seconds.
pub const DEFAULT_RENDER_TIMEOUT_SECS: u64 = 60;

/// Default upper bound for request bodies (10 MiB).
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Where the API key came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConfigSource {
    /// Process environment variable.
    Environment,
    /// The `app.env` file.
    EnvFile,
    /// No key configured anywhere.
    #[default]
    NotConfigured,
}

impl ConfigSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Environment => "environment",
            Self::EnvFile => "app.env",
            Self::NotConfigured => "not configured",
        }
    }
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors raised while loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A variable was set but could not be parsed.
    #[error("Invalid value for {name}: '{value}'")]
    InvalidValue { name: &'static str, value: String },

    /// The assembled configuration failed validation.
    #[error("Invalid configuration: {0}")]
    Validation(String),
}

/// Service configuration.
///
/// # Fields Overview
///
/// | Field | Default | Description |
/// |-------|---------|-------------|
/// | `api_key` | none | Shared secret for `X-API-KEY` |
/// | `host` | `0.0.0.0` | Listen address |
/// | `port` | 8080 | Listen port |
/// | `chrome_path` | auto-detect | Browser binary |
/// | `render_timeout` | 60s | Budget for one render, end to end |
/// | `overlay_settle_timeout` | 2s | Budget for confirming one overlay |
/// | `stamp_size_url` | 150px | Stamp edge on URL renders |
/// | `stamp_size_html` | 180px | Stamp edge on HTML renders |
/// | `max_upload_bytes` | 10 MiB | Request body limit |
/// | `browser_warmup` | false | Launch the browser at startup |
#[derive(Clone)]
pub struct ServiceConfig {
    /// Shared secret. `None` means every protected request fails with 500.
    pub api_key: Option<String>,

    pub api_key_source: ConfigSource,

    pub host: String,

    pub port: u16,

    /// Path to a Chrome/Chromium binary. `None` lets headless_chrome search.
    pub chrome_path: Option<String>,

    /// Whole-pipeline budget: session, load, overlays and print.
    pub render_timeout: Duration,

    pub overlay_settle_timeout: Duration,

    pub stamp_size_url: u32,

    pub stamp_size_html: u32,

    /// Largest accepted request body, stamp upload included.
    pub max_upload_bytes: usize,

    /// Launch the browser before accepting traffic.
    pub browser_warmup: bool,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_key_source: ConfigSource::NotConfigured,
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            chrome_path: None,
            render_timeout: Duration::from_secs(DEFAULT_RENDER_TIMEOUT_SECS),
            overlay_settle_timeout: Duration::from_millis(DEFAULT_OVERLAY_SETTLE_TIMEOUT_MS),
            stamp_size_url: DEFAULT_STAMP_SIZE_URL_PX,
            stamp_size_html: DEFAULT_STAMP_SIZE_HTML_PX,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            browser_warmup: false,
        }
    }
}

impl ServiceConfig {
    /// `host:port` for the listener.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Rendering knobs handed to the service layer.
    pub fn render_settings(&self) -> RenderSettings {
        RenderSettings {
            stamp_size_url: StampSize::square(self.stamp_size_url),
            stamp_size_html: StampSize::square(self.stamp_size_html),
            overlay_settle_timeout: self.overlay_settle_timeout,
        }
    }

    pub fn api_key_configured(&self) -> bool {
        self.api_key.is_some()
    }
}

/// The API key never appears in logs unmasked.
impl std::fmt::Debug for ServiceConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceConfig")
            .field("api_key", &mask_key(self.api_key.as_deref()))
            .field("api_key_source", &self.api_key_source)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("chrome_path", &self.chrome_path)
            .field("render_timeout", &self.render_timeout)
            .field("overlay_settle_timeout", &self.overlay_settle_timeout)
            .field("stamp_size_url", &self.stamp_size_url)
            .field("stamp_size_html", &self.stamp_size_html)
            .field("max_upload_bytes", &self.max_upload_bytes)
            .field("browser_warmup", &self.browser_warmup)
            .finish()
    }
}

/// Builder for [`ServiceConfig`] with validation.
///
/// # Example
///
/// ```rust
/// use html2pdf_overlay_api::ServiceConfigBuilder;
///
/// let result = ServiceConfigBuilder::new().stamp_size_url(0).build();
/// assert!(result.is_err());
/// ```
pub struct ServiceConfigBuilder {
    config: ServiceConfig,
}

impl ServiceConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: ServiceConfig::default(),
        }
    }

    /// Set the API key, recorded as coming from the environment.
    ///
    /// Blank keys count as not configured.
    pub fn api_key(self, key: impl Into<String>) -> Self {
        self.api_key_from(key, ConfigSource::Environment)
    }

    /// Set the API key and where it came from.
    pub fn api_key_from(mut self, key: impl Into<String>, source: ConfigSource) -> Self {
        let key = key.into();
        if key.trim().is_empty() {
            self.config.api_key = None;
            self.config.api_key_source = ConfigSource::NotConfigured;
        } else {
            self.config.api_key = Some(key);
            self.config.api_key_source = source;
        }
        self
    }

    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.config.host = host.into();
        self
    }

    pub fn port(mut self, port: u16) -> Self {
        self.config.port = port;
        self
    }

    pub fn chrome_path(mut self, path: Option<String>) -> Self {
        self.config.chrome_path = path.filter(|p| !p.trim().is_empty());
        self
    }

    pub fn render_timeout(mut self, timeout: Duration) -> Self {
        self.config.render_timeout = timeout;
        self
    }

    pub fn overlay_settle_timeout(mut self, timeout: Duration) -> Self {
        self.config.overlay_settle_timeout = timeout;
        self
    }

    pub fn stamp_size_url(mut self, px: u32) -> Self {
        self.config.stamp_size_url = px;
        self
    }

    pub fn stamp_size_html(mut self, px: u32) -> Self {
        self.config.stamp_size_html = px;
        self
    }

    pub fn max_upload_bytes(mut self, bytes: usize) -> Self {
        self.config.max_upload_bytes = bytes;
        self
    }

    pub fn browser_warmup(mut self, warmup: bool) -> Self {
        self.config.browser_warmup = warmup;
        self
    }

    /// Build and validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - `host` is blank
    /// - `render_timeout` or `overlay_settle_timeout` is zero
    /// - `overlay_settle_timeout` exceeds `render_timeout`
    /// - either stamp size is zero
    /// - `max_upload_bytes` is zero
    pub fn build(self) -> std::result::Result<ServiceConfig, String> {
        let config = self.config;

        if config.host.trim().is_empty() {
            return Err("host must not be empty".to_string());
        }

        if config.render_timeout.is_zero() {
            return Err("render_timeout must be greater than 0".to_string());
        }

        if config.overlay_settle_timeout.is_zero() {
            return Err("overlay_settle_timeout must be greater than 0".to_string());
        }

        if config.overlay_settle_timeout > config.render_timeout {
            return Err("overlay_settle_timeout cannot exceed render_timeout".to_string());
        }

        if config.stamp_size_url == 0 || config.stamp_size_html == 0 {
            return Err("stamp sizes must be greater than 0".to_string());
        }

        if config.max_upload_bytes == 0 {
            return Err("max_upload_bytes must be greater than 0".to_string());
        }

        Ok(config)
    }
}

impl Default for ServiceConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Environment Configuration (feature-gated)
// ============================================================================

/// Environment-based configuration loading.
///
/// # Environment Variables
///
/// | Variable | Type | Default | Description |
/// |----------|------|---------|-------------|
/// | `API_KEY` | string | none | Shared secret for `X-API-KEY` |
/// | `HOST` | string | `0.0.0.0` | Listen address |
/// | `PORT` | u16 | 8080 | Listen port |
/// | `CHROME_PATH` | path | auto | Browser binary |
/// | `RENDER_TIMEOUT_SECS` | u64 | 60 | Render budget |
/// | `OVERLAY_SETTLE_TIMEOUT_MS` | u64 | 2000 | Overlay readiness budget |
/// | `STAMP_SIZE_URL_PX` | u32 | 150 | Stamp edge, URL renders |
/// | `STAMP_SIZE_HTML_PX` | u32 | 180 | Stamp edge, HTML renders |
/// | `MAX_UPLOAD_BYTES` | usize | 10485760 | Request body limit |
/// | `BROWSER_WARMUP` | bool | false | Launch at startup |
///
/// Values from `app.env` are used only where the process environment does not
/// set the variable. The file never modifies the process environment.
#[cfg(feature = "env-config")]
pub mod env {
    use std::collections::HashMap;
    use std::str::FromStr;

    use super::*;

    /// Default environment file name.
    pub const ENV_FILE_NAME: &str = "app.env";

    /// Read `app.env` into a map. A missing or unreadable file yields an
    /// empty map.
    pub fn load_env_file() -> HashMap<String, String> {
        match dotenvy::from_filename_iter(ENV_FILE_NAME) {
            Ok(iter) => {
                let vars: HashMap<String, String> = iter
                    .filter_map(|item| match item {
                        Ok(pair) => Some(pair),
                        Err(e) => {
                            log::warn!("⚠️ Skipping malformed line in {}: {}", ENV_FILE_NAME, e);
                            None
                        }
                    })
                    .collect();
                log::info!("📄 Loaded {} entries from {}", vars.len(), ENV_FILE_NAME);
                vars
            }
            Err(e) => {
                log::debug!(
                    "📄 No {} file found or failed to load: {} (using environment variables and defaults)",
                    ENV_FILE_NAME,
                    e
                );
                HashMap::new()
            }
        }
    }

    /// Load configuration from the process environment and `app.env`.
    ///
    /// # Errors
    ///
    /// [`ConfigError::InvalidValue`] for unparseable variables,
    /// [`ConfigError::Validation`] if the result fails [`ServiceConfigBuilder::build`].
    pub fn from_env() -> Result<ServiceConfig, ConfigError> {
        let file_vars = load_env_file();
        from_lookup(|name| std::env::var(name).ok(), &file_vars)
    }

    /// Build a configuration from an environment lookup plus file values.
    ///
    /// `env` wins over `file` for every variable.
    pub fn from_lookup<F>(env: F, file: &HashMap<String, String>) -> Result<ServiceConfig, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let source = Sources { env, file };
        let mut builder = ServiceConfigBuilder::new();

        if let Some((key, origin)) = source.get("API_KEY") {
            builder = builder.api_key_from(key, origin);
        }
        if let Some((host, _)) = source.get("HOST") {
            builder = builder.host(host);
        }
        builder = builder
            .chrome_path(source.get("CHROME_PATH").map(|(path, _)| path))
            .port(source.parse("PORT", DEFAULT_PORT)?)
            .render_timeout(Duration::from_secs(
                source.parse("RENDER_TIMEOUT_SECS", DEFAULT_RENDER_TIMEOUT_SECS)?,
            ))
            .overlay_settle_timeout(Duration::from_millis(
                source.parse("OVERLAY_SETTLE_TIMEOUT_MS", DEFAULT_OVERLAY_SETTLE_TIMEOUT_MS)?,
            ))
            .stamp_size_url(source.parse("STAMP_SIZE_URL_PX", DEFAULT_STAMP_SIZE_URL_PX)?)
            .stamp_size_html(source.parse("STAMP_SIZE_HTML_PX", DEFAULT_STAMP_SIZE_HTML_PX)?)
            .max_upload_bytes(source.parse("MAX_UPLOAD_BYTES", DEFAULT_MAX_UPLOAD_BYTES)?)
            .browser_warmup(source.flag("BROWSER_WARMUP")?);

        let config = builder.build().map_err(ConfigError::Validation)?;

        log::info!("⚙️ Loaded service configuration:");
        log::info!("   - Listen address: {}", config.bind_address());
        log::info!(
            "   - API key: {} (source: {})",
            mask_key(config.api_key.as_deref()),
            config.api_key_source
        );
        log::info!("   - Render timeout: {}s", config.render_timeout.as_secs());
        log::info!(
            "   - Overlay settle timeout: {}ms",
            config.overlay_settle_timeout.as_millis()
        );
        log::info!(
            "   - Stamp size: {}px (url), {}px (html)",
            config.stamp_size_url,
            config.stamp_size_html
        );
        log::info!("   - Max upload: {} bytes", config.max_upload_bytes);
        log::info!("   - Browser warmup: {}", config.browser_warmup);
        if config.api_key.is_none() {
            log::warn!("⚠️ API_KEY is not configured; protected endpoints will answer 500");
        }

        Ok(config)
    }

    struct Sources<'a, F> {
        env: F,
        file: &'a HashMap<String, String>,
    }

    impl<F> Sources<'_, F>
    where
        F: Fn(&str) -> Option<String>,
    {
        /// Non-blank value and its origin.
        fn get(&self, name: &str) -> Option<(String, ConfigSource)> {
            let from_env = (self.env)(name)
                .filter(|v| !v.trim().is_empty())
                .map(|v| (v, ConfigSource::Environment));
            from_env.or_else(|| {
                self.file
                    .get(name)
                    .filter(|v| !v.trim().is_empty())
                    .map(|v| (v.clone(), ConfigSource::EnvFile))
            })
        }

        fn parse<T: FromStr>(&self, name: &'static str, default: T) -> Result<T, ConfigError> {
            match self.get(name) {
                Some((value, _)) => value
                    .trim()
                    .parse()
                    .map_err(|_| ConfigError::InvalidValue { name, value }),
                None => Ok(default),
            }
        }

        fn flag(&self, name: &'static str) -> Result<bool, ConfigError> {
            match self.get(name) {
                Some((value, _)) => match value.trim().to_ascii_lowercase().as_str() {
                    "1" | "true" | "yes" | "on" => Ok(true),
                    "0" | "false" | "no" | "off" => Ok(false),
                    _ => Err(ConfigError::InvalidValue { name, value }),
                },
                None => Ok(false),
            }
        }
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
