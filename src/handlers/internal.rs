//! Administrative surface consumed by internal collaborators: the
//! checkout pipeline reports completed purchases here, and support staff
//! revoke licenses or park devices. All routes sit behind the internal
//! bearer token.

use axum::{Json, extract::State};
use serde::{Deserialize, Serialize};

use crate::db::{AppState, queries};
use crate::error::{AppError, Result};
use crate::issuance;
use crate::models::IssueLicense;
use crate::notify::Notification;
use crate::util::normalize_license_code;

#[derive(Debug, Serialize)]
pub struct IssueResponse {
    pub license_id: String,
    pub license_code: String,
    pub max_devices: i32,
    /// False when this purchase reference was already processed.
    pub newly_issued: bool,
}

/// Called once per completed purchase event. Safe under retried
/// delivery: the purchase reference is the idempotency key.
pub async fn issue_license(
    State(state): State<AppState>,
    Json(input): Json<IssueLicense>,
) -> Result<Json<IssueResponse>> {
    if input.email.trim().is_empty() {
        return Err(AppError::BadRequest("email is required".into()));
    }
    if input.purchase_reference.trim().is_empty() {
        return Err(AppError::BadRequest("purchase_reference is required".into()));
    }
    if input.amount_paid_cents < 0 {
        return Err(AppError::BadRequest("amount_paid_cents must not be negative".into()));
    }

    let conn = state.db.get()?;
    let outcome = issuance::issue_license(&conn, &input, state.default_max_devices)?;

    if outcome.newly_issued {
        state.notifier.dispatch(Notification::LicenseIssued {
            email: outcome.license.email.clone(),
            customer_name: outcome.license.customer_name.clone(),
            license_code: outcome.license.code.clone(),
            amount_paid_cents: outcome.license.amount_paid_cents,
            currency: outcome.license.currency.clone(),
            purchased_at: outcome.license.purchased_at,
        });
    }

    Ok(Json(IssueResponse {
        license_id: outcome.license.id,
        license_code: outcome.license.code,
        max_devices: outcome.license.max_devices,
        newly_issued: outcome.newly_issued,
    }))
}

#[derive(Debug, Deserialize)]
pub struct RevokeRequest {
    pub code: String,
}

#[derive(Debug, Serialize)]
pub struct RevokeResponse {
    pub success: bool,
}

pub async fn revoke_license(
    State(state): State<AppState>,
    Json(request): Json<RevokeRequest>,
) -> Result<Json<RevokeResponse>> {
    let conn = state.db.get()?;

    let license = queries::get_license_by_code(&conn, &normalize_license_code(&request.code))?
        .ok_or_else(|| AppError::NotFound("License not found".into()))?;

    queries::revoke_license(&conn, &license.id)?;
    tracing::info!(license_id = %license.id, "license revoked");

    Ok(Json(RevokeResponse { success: true }))
}

#[derive(Debug, Deserialize)]
pub struct DeactivateRequest {
    pub code: String,
    pub fingerprint: String,
}

#[derive(Debug, Serialize)]
pub struct DeactivateResponse {
    pub success: bool,
    /// False when the device was already inactive.
    pub deactivated: bool,
    pub active_devices: i64,
}

/// Park a device seat. The activation row is kept; the same fingerprint
/// reclaims it on its next activation attempt.
pub async fn deactivate_device(
    State(state): State<AppState>,
    Json(request): Json<DeactivateRequest>,
) -> Result<Json<DeactivateResponse>> {
    let conn = state.db.get()?;

    let license = queries::get_license_by_code(&conn, &normalize_license_code(&request.code))?
        .ok_or_else(|| AppError::NotFound("License not found".into()))?;

    let activation = queries::get_activation(&conn, &license.id, &request.fingerprint)?
        .ok_or_else(|| AppError::NotFound("Device not found".into()))?;

    let deactivated = queries::deactivate_activation(&conn, &activation.id)?;
    let active_devices = queries::count_active_activations(&conn, &license.id)?;

    tracing::info!(
        license_id = %license.id,
        fingerprint = %request.fingerprint,
        deactivated,
        "device deactivation requested"
    );

    Ok(Json(DeactivateResponse {
        success: true,
        deactivated,
        active_devices,
    }))
}
