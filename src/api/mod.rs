//! HTTP surface.
//!
//! | Method | Path | Effect |
//! |---|---|---|
//! | GET/POST/DELETE | `/api/keyauth/keys` | list / create / delete the caller's licenses |
//! | GET/POST | `/api/keyauth/users` | list / act on the caller's end users |
//! | GET/POST/DELETE | `/api/keyauth/login` | session status / login or register / logout |
//! | GET/POST | `/api/sellauth/webhook` | storefront key delivery (untagged keys) |
//! | GET | `/health` | liveness |
//!
//! Every reseller handler resolves identity first, validates input second,
//! and only then talks to upstream. Ownership is always checked against a
//! snapshot fetched within the same request.

mod auth;
mod error;
mod keys;
mod users;
mod webhook;


pub use error::{ApiError, UpstreamResultExt};

use std::sync::Arc;

use axum::http::HeaderMap;
use axum::routing::get;
use axum::{Json, Router};
use tower_http::trace::TraceLayer;

use crate::config::StorefrontConfig;
use crate::keyauth::LicenseService;
use crate::session::SessionStore;
use crate::types::ResellerIdentity;

/// Shared handler state. Holds no mutable data.
pub struct AppState<S> {
    pub upstream: Arc<S>,
    pub sessions: SessionStore,
    pub storefront: Arc<StorefrontConfig>,
}

impl<S> Clone for AppState<S> {
    fn clone(&self) -> Self {
        Self {
            upstream: Arc::clone(&self.upstream),
            sessions: self.sessions.clone(),
            storefront: Arc::clone(&self.storefront),
        }
    }
}

impl<S> AppState<S> {
    pub fn new(upstream: S, sessions: SessionStore, storefront: StorefrontConfig) -> Self {
        Self {
            upstream: Arc::new(upstream),
            sessions,
            storefront: Arc::new(storefront),
        }
    }

    /// The calling reseller, or 401.
    fn identity(&self, headers: &HeaderMap) -> Result<ResellerIdentity, ApiError> {
        self.sessions
            .resolve_identity(headers)
            .ok_or(ApiError::Unauthenticated)
    }
}

pub fn build_router<S: LicenseService>(state: AppState<S>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route(
            "/api/keyauth/keys",
            get(keys::list_licenses::<S>)
                .post(keys::create_license::<S>)
                .delete(keys::delete_license::<S>),
        )
        .route(
            "/api/keyauth/users",
            get(users::list_users::<S>).post(users::user_action::<S>),
        )
        .route(
            "/api/keyauth/login",
            get(auth::session_status::<S>)
                .post(auth::authenticate::<S>)
                .delete(auth::logout::<S>),
        )
        .route(
            "/api/sellauth/webhook",
            get(webhook::deliver_plain::<S>).post(webhook::deliver::<S>),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}
