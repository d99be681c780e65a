//! Upstream client errors.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum KeyAuthError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("upstream returned HTTP {0}")]
    Status(u16),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    /// The upstream answered `success=false`. The message is meant for display.
    #[error("{0}")]
    Rejected(String),

    #[error("app session init failed: {0}")]
    SessionInit(String),

    #[error("app credentials not configured")]
    MissingAppCredentials,
}
