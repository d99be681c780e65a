//! Storefront delivery webhook.
//!
//! The checkout provider calls this after a purchase and delivers the key we
//! return. Storefront keys carry a fixed note and no reseller tag, so they
//! never appear in any reseller's view.

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Query, State};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use serde::Deserialize;
use serde_json::json;
use tracing::{error, info, warn};

use crate::keyauth::{LicenseService, NewLicense};
use crate::types::Scalar;

use super::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct WebhookPayload {
    #[serde(default, alias = "variantId")]
    pub variant_id: Option<Scalar>,
    #[serde(default, alias = "productId")]
    pub product_id: Option<Scalar>,
}

#[derive(Debug, Deserialize)]
pub struct VariantQuery {
    pub variant_id: Option<String>,
}

enum Delivery {
    Key(String),
    Rejected(String),
    Failed,
}

async fn create_storefront_key<S: LicenseService>(state: &AppState<S>, variant_id: &str) -> Delivery {
    let expiry_days = state.storefront.expiry_for(variant_id);
    let license = NewLicense::new(expiry_days).with_note(state.storefront.note.clone());

    match state.upstream.create_license(&license).await {
        Ok(resp) if resp.success => {
            info!(variant_id, expiry_days, "storefront key delivered");
            Delivery::Key(resp.text("key").unwrap_or_default())
        }
        Ok(resp) => {
            warn!(variant_id, message = %resp.message, "storefront key creation rejected");
            Delivery::Rejected(resp.message)
        }
        Err(e) => {
            error!(variant_id, error = %e, "storefront key creation failed");
            Delivery::Failed
        }
    }
}

/// `POST /api/sellauth/webhook`: create a key for a purchase, JSON reply.
pub async fn deliver<S: LicenseService>(
    State(state): State<AppState<S>>,
    body: Result<Json<WebhookPayload>, JsonRejection>,
) -> Response {
    let payload = match body {
        Ok(Json(payload)) => payload,
        Err(e) => {
            warn!(error = %e.body_text(), "invalid webhook payload");
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({ "status": "error", "message": "Invalid payload" })),
            )
                .into_response();
        }
    };

    let variant_id = payload
        .variant_id
        .as_ref()
        .and_then(Scalar::as_text)
        .unwrap_or_default();
    let product_id = payload.product_id.as_ref().and_then(Scalar::as_text);
    info!(variant_id, product_id = ?product_id, "storefront purchase");

    match create_storefront_key(&state, &variant_id).await {
        Delivery::Key(key) => Json(json!({ "status": "success", "key": key })).into_response(),
        Delivery::Rejected(message) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "status": "error", "message": message })),
        )
            .into_response(),
        Delivery::Failed => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "status": "error", "message": "Internal server error" })),
        )
            .into_response(),
    }
}

/// `GET /api/sellauth/webhook?variant_id=…`: same, plain-text reply.
pub async fn deliver_plain<S: LicenseService>(
    State(state): State<AppState<S>>,
    Query(query): Query<VariantQuery>,
) -> Response {
    let variant_id = query.variant_id.unwrap_or_default();
    let plain = [(header::CONTENT_TYPE, "text/plain; charset=utf-8")];

    match create_storefront_key(&state, &variant_id).await {
        Delivery::Key(key) => (plain, key).into_response(),
        Delivery::Rejected(message) => (StatusCode::INTERNAL_SERVER_ERROR, plain, message).into_response(),
        Delivery::Failed => (
            StatusCode::INTERNAL_SERVER_ERROR,
            plain,
            "Internal server error",
        )
            .into_response(),
    }
}
