//! Reseller end-user handlers.

use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::HeaderMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::{ApiError, AppState, UpstreamResultExt};
use crate::keyauth::{LicenseService, UpstreamResponse};
use crate::tenancy::{reseller_usernames, tag};
use crate::types::{EndUser, Scalar};

#[derive(Debug, Serialize, Deserialize)]
pub struct UserList {
    pub success: bool,
    /// Upstream listing message, passed through.
    #[serde(default)]
    pub message: String,
    pub users: Vec<EndUser>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UserActionRequest {
    #[serde(default)]
    pub action: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub subscription: Option<String>,
    #[serde(default)]
    pub expiry: Option<Scalar>,
}

/// A validated user action, ready to dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserAction {
    Ban { reason: Option<String> },
    Unban,
    ResetHwid,
    Extend { subscription: String, expiry_days: u32 },
    Delete,
    FetchData,
}

impl UserAction {
    pub fn name(&self) -> &'static str {
        match self {
            UserAction::Ban { .. } => "ban",
            UserAction::Unban => "unban",
            UserAction::ResetHwid => "resetHwid",
            UserAction::Extend { .. } => "extend",
            UserAction::Delete => "delete",
            UserAction::FetchData => "getData",
        }
    }
}

impl UserActionRequest {
    /// Check every required field before anything goes upstream.
    fn validate(self) -> Result<(String, UserAction), ApiError> {
        let (Some(action), Some(username)) = (
            self.action.filter(|a| !a.is_empty()),
            self.username.filter(|u| !u.is_empty()),
        ) else {
            return Err(ApiError::InvalidInput(
                "Action and username are required".to_string(),
            ));
        };

        let action = match action.as_str() {
            "ban" => UserAction::Ban {
                reason: self.reason.filter(|r| !r.is_empty()),
            },
            "unban" => UserAction::Unban,
            "resetHwid" | "reset-hwid" => UserAction::ResetHwid,
            "extend" => {
                let subscription = self.subscription.filter(|s| !s.is_empty());
                let expiry = self.expiry.filter(|e| e.as_text().is_some());
                let (Some(subscription), Some(expiry)) = (subscription, expiry) else {
                    return Err(ApiError::InvalidInput(
                        "Subscription and expiry are required for extend action".to_string(),
                    ));
                };
                let expiry_days = expiry.as_u32().filter(|d| *d > 0).ok_or_else(|| {
                    ApiError::InvalidInput("Expiry must be a positive number of days".to_string())
                })?;
                UserAction::Extend {
                    subscription,
                    expiry_days,
                }
            }
            "delete" => UserAction::Delete,
            "getData" | "fetch-data" => UserAction::FetchData,
            _ => return Err(ApiError::InvalidInput("Invalid action".to_string())),
        };

        Ok((username, action))
    }
}

/// `GET /api/keyauth/users`: end users who redeemed one of the caller's keys.
pub async fn list_users<S: LicenseService>(
    State(state): State<AppState<S>>,
    headers: HeaderMap,
) -> Result<Json<UserList>, ApiError> {
    let identity = state.identity(&headers)?;

    let (licenses, users) = futures::try_join!(
        state.upstream.fetch_all_licenses(),
        state.upstream.fetch_all_users()
    )
    .or_fail("Failed to fetch users")?;

    let owned = reseller_usernames(&licenses.items, &identity);
    let message = users.message;
    let users: Vec<EndUser> = users
        .items
        .into_iter()
        .filter(|user| owned.contains(user.username.as_str()))
        .collect();

    debug!(
        tenant = %tag(&identity),
        count = users.len(),
        banned = users.iter().filter(|u| u.is_banned()).count(),
        "listed users"
    );

    Ok(Json(UserList {
        success: true,
        message,
        users,
    }))
}

/// `POST /api/keyauth/users`: ban, unban, reset HWID, extend, delete or
/// fetch data for one of the caller's end users.
pub async fn user_action<S: LicenseService>(
    State(state): State<AppState<S>>,
    headers: HeaderMap,
    body: Result<Json<UserActionRequest>, JsonRejection>,
) -> Result<Json<UpstreamResponse>, ApiError> {
    let identity = state.identity(&headers)?;
    let Json(request) = body.map_err(|e| ApiError::InvalidInput(e.body_text()))?;
    let (username, action) = request.validate()?;

    let (licenses, users) = futures::try_join!(
        state.upstream.fetch_all_licenses(),
        state.upstream.fetch_all_users()
    )
    .or_fail("Failed to perform user action")?;

    if !users.items.iter().any(|user| user.username == username) {
        return Err(ApiError::NotFound("User not found".to_string()));
    }

    let owned = reseller_usernames(&licenses.items, &identity);
    if !owned.contains(username.as_str()) {
        warn!(tenant = %tag(&identity), action = action.name(), "user action refused: not owned");
        return Err(ApiError::AccessDenied("Access denied".to_string()));
    }

    let upstream = &state.upstream;
    let result = match &action {
        UserAction::Ban { reason } => upstream.ban_user(&username, reason.as_deref()).await,
        UserAction::Unban => upstream.unban_user(&username).await,
        UserAction::ResetHwid => upstream.reset_user_hwid(&username).await,
        UserAction::Extend {
            subscription,
            expiry_days,
        } => {
            upstream
                .extend_user(&username, subscription, *expiry_days)
                .await
        }
        UserAction::Delete => upstream.delete_user(&username).await,
        UserAction::FetchData => upstream.user_data(&username).await,
    }
    .or_fail("Failed to perform user action")?;

    info!(
        tenant = %tag(&identity),
        action = action.name(),
        success = result.success,
        "user action"
    );
    Ok(Json(result))
}
