//! Handler errors and their HTTP mapping.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;
use tracing::error;

use crate::keyauth::KeyAuthError;
use crate::session::SessionError;

/// Stable, machine-readable error codes sent as `code` in error bodies.
pub mod error_code {
    pub const UNAUTHENTICATED: &str = "UNAUTHENTICATED";
    pub const LOGIN_FAILED: &str = "LOGIN_FAILED";
    pub const INVALID_INPUT: &str = "INVALID_INPUT";
    pub const ACCESS_DENIED: &str = "ACCESS_DENIED";
    pub const NOT_FOUND: &str = "NOT_FOUND";
    pub const UPSTREAM_REJECTED: &str = "UPSTREAM_REJECTED";
    pub const UPSTREAM_UNAVAILABLE: &str = "UPSTREAM_UNAVAILABLE";
    pub const INTERNAL: &str = "INTERNAL";
}

/// Every way a handler can refuse or fail a request.
///
/// All variants are terminal for the request; nothing is retried.
#[derive(Debug, Error)]
pub enum ApiError {
    /// No resolvable reseller identity. HTTP 401.
    #[error("Unauthorized")]
    Unauthenticated,

    /// Credentials were checked upstream and refused. HTTP 401.
    #[error("{0}")]
    LoginRejected(String),

    /// Missing or malformed required input. HTTP 400.
    #[error("{0}")]
    InvalidInput(String),

    /// The caller does not own the resource, or it does not exist where
    /// saying so would leak another reseller's data. HTTP 403.
    #[error("{0}")]
    AccessDenied(String),

    /// HTTP 404.
    #[error("{0}")]
    NotFound(String),

    /// Upstream answered `success=false`; its message is relayed. HTTP 500.
    #[error("{0}")]
    Upstream(String),

    /// Upstream app session could not be opened. HTTP 503.
    #[error("{0}")]
    Unavailable(String),

    /// Network or parse failure talking to upstream. The caller only sees
    /// `context`; the source is logged. HTTP 500.
    #[error("{context}")]
    Transport {
        context: &'static str,
        #[source]
        source: KeyAuthError,
    },

    /// Session cookie could not be issued. HTTP 500.
    #[error("Failed to create session")]
    Session(#[from] SessionError),
}

impl ApiError {
    /// Shared by "no such key" and "not your key" so the two are
    /// indistinguishable to the caller.
    pub fn key_not_accessible() -> Self {
        ApiError::AccessDenied("Key not found or access denied".to_string())
    }

    /// Classify an upstream error, keeping `context` as the public message
    /// for transport failures.
    pub fn upstream(context: &'static str, err: KeyAuthError) -> Self {
        match err {
            KeyAuthError::Rejected(message) => ApiError::Upstream(message),
            KeyAuthError::SessionInit(message) => ApiError::Unavailable(message),
            source => ApiError::Transport { context, source },
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            ApiError::Unauthenticated => error_code::UNAUTHENTICATED,
            ApiError::LoginRejected(_) => error_code::LOGIN_FAILED,
            ApiError::InvalidInput(_) => error_code::INVALID_INPUT,
            ApiError::AccessDenied(_) => error_code::ACCESS_DENIED,
            ApiError::NotFound(_) => error_code::NOT_FOUND,
            ApiError::Upstream(_) => error_code::UPSTREAM_REJECTED,
            ApiError::Unavailable(_) => error_code::UPSTREAM_UNAVAILABLE,
            ApiError::Transport { .. } | ApiError::Session(_) => error_code::INTERNAL,
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Unauthenticated | ApiError::LoginRejected(_) => StatusCode::UNAUTHORIZED,
            ApiError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            ApiError::AccessDenied(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Upstream(_) | ApiError::Transport { .. } | ApiError::Session(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match &self {
            ApiError::Transport { context, source } => {
                error!(error = %source, "{context}");
            }
            ApiError::Session(e) => error!(error = %e, "failed to issue session"),
            ApiError::Upstream(message) => error!(%message, "upstream rejected request"),
            _ => {}
        }

        let status = self.status_code();
        let body = serde_json::json!({
            "error": self.to_string(),
            "code": self.error_code(),
        });
        (status, Json(body)).into_response()
    }
}

/// Attach a public failure message to upstream results.
pub trait UpstreamResultExt<T> {
    fn or_fail(self, context: &'static str) -> Result<T, ApiError>;
}

impl<T> UpstreamResultExt<T> for Result<T, KeyAuthError> {
    fn or_fail(self, context: &'static str) -> Result<T, ApiError> {
        self.map_err(|e| ApiError::upstream(context, e))
    }
}
