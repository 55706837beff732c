//! Static shared-secret authentication.
//!
//! Every protected request carries the secret in the `X-API-KEY` header.
//! [`verify_api_key`] decides the outcome; the axum integration wraps it in a
//! middleware layer.
//!
//! | Check (in order) | Outcome |
//! |------------------|---------|
//! | header absent | 401 `API Key was not provided.` |
//! | no secret configured | 500 `API Key is not configured on the server.` |
//! | header ≠ secret | 401 `Unauthorized client.` |
//! | header = secret | pass |
//!
//! Keys only ever reach the log through [`mask_key`].

/// Request header carrying the key.
pub const API_KEY_HEADER: &str = "X-API-KEY";

/// Characters kept visible at each end of a masked key.
const MASK_VISIBLE: usize = 4;

/// Authentication failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthError {
    /// No `X-API-KEY` header on the request.
    MissingKey,
    /// The header did not match the configured secret.
    InvalidKey,
    /// The server has no secret to compare against.
    NotConfigured,
}

impl AuthError {
    pub fn status_code(&self) -> u16 {
        match self {
            Self::MissingKey | Self::InvalidKey => 401,
            Self::NotConfigured => 500,
        }
    }

    /// Fixed plaintext response body.
    pub fn message(&self) -> &'static str {
        match self {
            Self::MissingKey => "API Key was not provided.",
            Self::InvalidKey => "Unauthorized client.",
            Self::NotConfigured => "API Key is not configured on the server.",
        }
    }
}

impl std::fmt::Display for AuthError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.message())
    }
}

impl std::error::Error for AuthError {}

/// Check `provided` (the header value) against `expected` (the configured
/// secret).
///
/// An empty configured secret counts as not configured.
pub fn verify_api_key(provided: Option<&str>, expected: Option<&str>) -> Result<(), AuthError> {
    let expected = expected.filter(|key| !key.is_empty());

    log::debug!(
        "🔑 API key check: received={} configured={}",
        mask_key(provided),
        mask_key(expected)
    );

    let Some(provided) = provided else {
        log::warn!("🔒 Rejected request: {} header missing", API_KEY_HEADER);
        return Err(AuthError::MissingKey);
    };

    let Some(expected) = expected else {
        log::error!("❌ Rejected request: no API key configured on the server");
        return Err(AuthError::NotConfigured);
    };

    if !constant_time_eq(provided.as_bytes(), expected.as_bytes()) {
        log::warn!(
            "🔒 Rejected request: API key mismatch (received {})",
            mask_key(Some(provided))
        );
        return Err(AuthError::InvalidKey);
    }

    Ok(())
}

/// Mask a key for logging.
///
/// - `None` → `(null)`
/// - up to 8 characters → all `*`
/// - longer → first 4, `*` for the middle, last 4
pub fn mask_key(key: Option<&str>) -> String {
    let Some(key) = key else {
        return "(null)".to_string();
    };

    let chars: Vec<char> = key.chars().collect();
    let len = chars.len();
    if len <= MASK_VISIBLE * 2 {
        return "*".repeat(len);
    }

    let head: String = chars[..MASK_VISIBLE].iter().collect();
    let tail: String = chars[len - MASK_VISIBLE..].iter().collect();
    format!("{}{}{}", head, "*".repeat(len - MASK_VISIBLE * 2), tail)
}

/// Byte equality whose running time depends only on the lengths.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

// ============================================================================
// Unit Tests
// ============================================================================
