//! Reseller login, registration, session status and logout.
//!
//! These are pass-through to the upstream app API plus a session cookie
//! write or clear. They take no part in tenancy decisions.

use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use chrono::Utc;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{info, warn};

use super::{ApiError, AppState};
use crate::keyauth::{KeyAuthError, LicenseService, UpstreamResponse};
use crate::types::SessionRecord;

/// Level that marks a license key as granting reseller access.
pub const RESELLER_LEVEL: i64 = 999;

const ACCESS_MARKERS: [&str; 2] = ["admin", "reseller"];

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthRequest {
    #[serde(default)]
    pub action: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub license_key: Option<String>,
}

fn present(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

/// Whether a license key (as reported by upstream `info`) grants reseller
/// access: level 999, or "admin"/"reseller" in its note or subscription.
pub fn grants_reseller_access(info: &UpstreamResponse) -> bool {
    let level = info
        .text("level")
        .and_then(|l| l.trim().parse::<i64>().ok())
        .unwrap_or(0);
    if level == RESELLER_LEVEL {
        return true;
    }

    let note = info.text("note").unwrap_or_default().to_lowercase();
    let subscription = info.text("subscription").unwrap_or_default().to_lowercase();
    ACCESS_MARKERS
        .iter()
        .any(|marker| note.contains(marker) || subscription.contains(marker))
}

fn already_used(info: &UpstreamResponse) -> bool {
    info.text("usedby").is_some() || info.text("usedon").is_some()
}

/// `POST /api/keyauth/login`: login with username/password, or register
/// with a license key.
pub async fn authenticate<S: LicenseService>(
    State(state): State<AppState<S>>,
    body: Result<Json<AuthRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(request) = body.map_err(|e| ApiError::InvalidInput(e.body_text()))?;
    let action = request.action.clone();
    let has_credentials = request.username.as_deref().is_some_and(|u| !u.is_empty())
        && request.password.as_deref().is_some_and(|p| !p.is_empty());

    match action.as_deref() {
        Some("register") => register(&state, request).await,
        Some("login") => login(&state, request).await,
        None if has_credentials => login(&state, request).await,
        _ => Err(ApiError::InvalidInput(
            "Invalid request. Provide username/password for login or licenseKey for register."
                .to_string(),
        )),
    }
}

async fn login<S: LicenseService>(
    state: &AppState<S>,
    request: AuthRequest,
) -> Result<Response, ApiError> {
    let (Some(username), Some(password)) = (present(request.username), present(request.password))
    else {
        return Err(ApiError::InvalidInput(
            "Username and password are required".to_string(),
        ));
    };

    let result = match state.upstream.login(&username, &password).await {
        Ok(result) => result,
        Err(KeyAuthError::SessionInit(message)) => {
            warn!(%message, "login unavailable: app session init failed");
            let message = if message.is_empty() {
                "Authentication service unavailable".to_string()
            } else {
                message
            };
            return Err(ApiError::Unavailable(message));
        }
        Err(source) => {
            return Err(ApiError::Transport {
                context: "Login failed. Please try again.",
                source,
            });
        }
    };

    if !result.success {
        info!("login rejected by upstream");
        let message = if result.message.is_empty() {
            "Invalid username or password".to_string()
        } else {
            result.message
        };
        return Err(ApiError::LoginRejected(message));
    }

    let subscriptions = result
        .field("info")
        .and_then(|info| info.get("subscriptions"))
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();

    let record = SessionRecord::login(&username, subscriptions, Utc::now());
    let cookie = state.sessions.issue(&record)?;
    info!(sid = %record.sid, "reseller logged in");

    Ok((
        [(header::SET_COOKIE, cookie)],
        Json(json!({
            "success": true,
            "message": "Login successful",
            "username": record.username,
        })),
    )
        .into_response())
}

async fn register<S: LicenseService>(
    state: &AppState<S>,
    request: AuthRequest,
) -> Result<Response, ApiError> {
    let Some(license_key) = present(request.license_key) else {
        return Err(ApiError::InvalidInput("License key is required".to_string()));
    };
    let (Some(username), Some(password)) = (present(request.username), present(request.password))
    else {
        return Err(ApiError::InvalidInput(
            "Username and password are required".to_string(),
        ));
    };

    let info = state
        .upstream
        .license_info(&license_key)
        .await
        .map_err(|source| ApiError::Transport {
            context: "Registration failed. Please try again.",
            source,
        })?;

    if !info.success {
        let message = if info.message.is_empty() {
            "Invalid license key".to_string()
        } else {
            info.message
        };
        return Err(ApiError::LoginRejected(message));
    }

    if !grants_reseller_access(&info) {
        return Err(ApiError::AccessDenied(
            "This license key does not have reseller access. Required: Level 999 or admin subscription."
                .to_string(),
        ));
    }

    if already_used(&info) {
        return Err(ApiError::InvalidInput(
            "This license key has already been used".to_string(),
        ));
    }

    let result = match state
        .upstream
        .register(&username, &password, &license_key)
        .await
    {
        Ok(result) => result,
        Err(KeyAuthError::SessionInit(message)) => {
            warn!(%message, "registration unavailable: app session init failed");
            return Err(ApiError::Unavailable(
                "Registration service unavailable".to_string(),
            ));
        }
        Err(source) => {
            return Err(ApiError::Transport {
                context: "Registration failed. Please try again.",
                source,
            });
        }
    };

    if !result.success {
        let message = if result.message.is_empty() {
            "Registration failed. Username may already exist.".to_string()
        } else {
            result.message
        };
        return Err(ApiError::InvalidInput(message));
    }

    info!("reseller registered");
    Ok(Json(json!({
        "success": true,
        "message": "Registration successful! You can now login with your credentials.",
    }))
    .into_response())
}

/// `GET /api/keyauth/login`: report the current session.
pub async fn session_status<S: LicenseService>(
    State(state): State<AppState<S>>,
    headers: HeaderMap,
) -> Response {
    match state.sessions.read(&headers) {
        Some(record) => Json(json!({
            "authenticated": true,
            "authType": record.auth_type,
            "username": record.username,
            "level": record.level,
        }))
        .into_response(),
        None => (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "authenticated": false })),
        )
            .into_response(),
    }
}

/// `DELETE /api/keyauth/login`: clear the session cookie.
pub async fn logout<S: LicenseService>(State(state): State<AppState<S>>) -> Response {
    (
        [(header::SET_COOKIE, state.sessions.clear())],
        Json(json!({
            "success": true,
            "message": "Logged out successfully",
        })),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info(json: Value) -> UpstreamResponse {
        serde_json::from_value(json).unwrap()
    }

    #[test]
    fn test_reseller_access_by_level() {
        assert!(grants_reseller_access(&info(json!({"success": true, "level": "999"}))));
        assert!(grants_reseller_access(&info(json!({"success": true, "level": 999}))));
        assert!(!grants_reseller_access(&info(json!({"success": true, "level": "1"}))));
    }

    #[test]
    fn test_reseller_access_by_marker() {
        assert!(grants_reseller_access(&info(
            json!({"success": true, "level": 1, "note": "Reseller pack"})
        )));
        assert!(grants_reseller_access(&info(
            json!({"success": true, "subscription": "ADMIN"})
        )));
        assert!(!grants_reseller_access(&info(
            json!({"success": true, "note": "WEBSITE", "subscription": "default"})
        )));
    }

    #[test]
    fn test_already_used() {
        assert!(already_used(&info(json!({"success": true, "usedby": "someone"}))));
        assert!(already_used(&info(json!({"success": true, "usedon": 1700000000}))));
        assert!(!already_used(&info(json!({"success": true, "usedby": "", "usedon": null}))));
    }
}
