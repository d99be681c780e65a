//! Reseller license handlers.

use axum::Json;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Query, State};
use axum::http::HeaderMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::{ApiError, AppState, UpstreamResultExt};
use crate::keyauth::{LicenseService, NewLicense, UpstreamResponse};
use crate::tenancy::{TenantIndex, belongs_to, display_note, stamp_note, tag};
use crate::types::{License, Scalar};

#[derive(Debug, Serialize, Deserialize)]
pub struct LicenseList {
    pub success: bool,
    /// Upstream listing message, passed through.
    #[serde(default)]
    pub message: String,
    pub keys: Vec<License>,
}

#[derive(Debug, Default, Deserialize)]
pub struct CreateLicenseRequest {
    #[serde(default)]
    pub expiry: Option<Scalar>,
    #[serde(default)]
    pub amount: Option<Scalar>,
    #[serde(default)]
    pub mask: Option<String>,
    #[serde(default)]
    pub note: Option<String>,
    #[serde(default)]
    pub level: Option<Scalar>,
}

impl CreateLicenseRequest {
    /// Validate and build the upstream request. The note is used as given;
    /// tagging happens in the handler.
    fn into_new_license(self) -> Result<NewLicense, ApiError> {
        let expiry = self
            .expiry
            .filter(|e| e.as_text().is_some())
            .ok_or_else(|| ApiError::InvalidInput("Expiry is required".to_string()))?;
        let expiry_days = expiry
            .as_u32()
            .filter(|d| *d > 0)
            .ok_or_else(|| {
                ApiError::InvalidInput("Expiry must be a positive number of days".to_string())
            })?;

        let mut license = NewLicense::new(expiry_days);
        if let Some(amount) = positive(self.amount.as_ref()) {
            license.amount = amount;
        }
        if let Some(level) = positive(self.level.as_ref()) {
            license.level = level;
        }
        if let Some(mask) = self.mask.filter(|m| !m.is_empty()) {
            license.mask = mask;
        }
        license.note = self.note;
        Ok(license)
    }
}

/// Optional numeric form field; anything unparseable or zero means "use the default".
fn positive(value: Option<&Scalar>) -> Option<u32> {
    value.and_then(Scalar::as_u32).filter(|n| *n > 0)
}

#[derive(Debug, Deserialize)]
pub struct DeleteLicenseParams {
    pub key: Option<String>,
}

/// `GET /api/keyauth/keys`: the caller's licenses, notes de-tagged.
pub async fn list_licenses<S: LicenseService>(
    State(state): State<AppState<S>>,
    headers: HeaderMap,
) -> Result<Json<LicenseList>, ApiError> {
    let identity = state.identity(&headers)?;

    let listing = state
        .upstream
        .fetch_all_licenses()
        .await
        .or_fail("Failed to fetch licenses")?;

    let index = TenantIndex::build(&listing.items);
    let keys: Vec<License> = index
        .licenses(&identity)
        .iter()
        .map(|&license| License {
            note: Some(display_note(license, &identity)),
            ..license.clone()
        })
        .collect();

    debug!(
        tenant = %tag(&identity),
        count = keys.len(),
        total = listing.items.len(),
        tenants = index.tenant_count(),
        "listed licenses"
    );

    Ok(Json(LicenseList {
        success: true,
        message: listing.message,
        keys,
    }))
}

/// `POST /api/keyauth/keys`: create licenses owned by the caller.
pub async fn create_license<S: LicenseService>(
    State(state): State<AppState<S>>,
    headers: HeaderMap,
    body: Result<Json<CreateLicenseRequest>, JsonRejection>,
) -> Result<Json<UpstreamResponse>, ApiError> {
    let identity = state.identity(&headers)?;
    let Json(request) = body.map_err(|e| ApiError::InvalidInput(e.body_text()))?;

    let mut license = request.into_new_license()?;
    license.note = Some(stamp_note(license.note.as_deref().unwrap_or_default(), &identity));

    let result = state
        .upstream
        .create_license(&license)
        .await
        .or_fail("Failed to create license")?;

    info!(
        tenant = %tag(&identity),
        amount = license.amount,
        expiry_days = license.expiry_days,
        success = result.success,
        "created license"
    );

    Ok(Json(result))
}

/// `DELETE /api/keyauth/keys?key=…`: delete one of the caller's licenses.
pub async fn delete_license<S: LicenseService>(
    State(state): State<AppState<S>>,
    headers: HeaderMap,
    params: Result<Query<DeleteLicenseParams>, QueryRejection>,
) -> Result<Json<UpstreamResponse>, ApiError> {
    let identity = state.identity(&headers)?;
    let Query(params) = params.map_err(|e| ApiError::InvalidInput(e.body_text()))?;
    let key = params
        .key
        .filter(|k| !k.is_empty())
        .ok_or_else(|| ApiError::InvalidInput("Key is required".to_string()))?;

    let all = state
        .upstream
        .fetch_all_licenses()
        .await
        .or_fail("Failed to delete license")?;

    let owned = all
        .items
        .iter()
        .find(|license| license.key == key)
        .is_some_and(|license| belongs_to(license, &identity));
    if !owned {
        warn!(tenant = %tag(&identity), "delete refused: key missing or not owned");
        return Err(ApiError::key_not_accessible());
    }

    let result = state
        .upstream
        .delete_license(&key)
        .await
        .or_fail("Failed to delete license")?;

    info!(tenant = %tag(&identity), success = result.success, "deleted license");
    Ok(Json(result))
}
