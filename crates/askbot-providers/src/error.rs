//! Failure taxonomy for the completion boundary, plus log-safety helpers.

use thiserror::Error;

/// Maximum characters of an upstream error body kept for diagnostics.
const MAX_BODY_CHARS: usize = 500;

/// Why a completion attempt produced no result.
#[derive(Debug, Error)]
pub enum CompletionError {
    /// The API key failed the provider's format check; no request was sent.
    #[error("API key failed the provider format check")]
    BadCredential,

    /// Connection failure or timeout before a status line was received.
    #[error("transport failure: {0}")]
    Transport(#[from] reqwest::Error),

    /// Non-2xx status from the provider. The body is truncated.
    #[error("provider returned status {code}")]
    Status { code: u16, body: String },

    /// 200 response whose body is missing the expected fields.
    #[error("provider response missing expected fields")]
    MalformedBody,
}

impl CompletionError {
    /// Whether this failure is an authentication/quota problem the user
    /// should hear about specifically (bad key, 401/403/429).
    pub fn is_auth(&self) -> bool {
        match self {
            CompletionError::BadCredential => true,
            CompletionError::Status { code, .. } => matches!(code, 401 | 403 | 429),
            _ => false,
        }
    }
}

/// Render an API key for logs: first and last few characters only.
pub fn mask_key(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    if chars.len() <= 8 {
        return "***".to_string();
    }
    let head: String = chars[..4].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{head}***{tail}")
}

/// Cap an upstream error body before it is stored or logged.
pub fn truncate_body(body: &str) -> String {
    let mut truncated: String = body.chars().take(MAX_BODY_CHARS).collect();
    if truncated.len() < body.len() {
        truncated.push('…');
    }
    truncated
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
