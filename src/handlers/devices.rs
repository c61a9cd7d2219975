use axum::{
    Json,
    extract::{Query, State},
};
use serde::{Deserialize, Serialize};

use crate::db::{AppState, queries};
use crate::error::{AppError, Result};
use crate::util::normalize_license_code;

#[derive(Debug, Deserialize)]
pub struct DevicesQuery {
    pub code: String,
}

#[derive(Debug, Serialize)]
pub struct DeviceInfo {
    pub fingerprint: String,
    pub device_type: String,
    pub name: Option<String>,
    pub is_active: bool,
    pub activated_at: i64,
    pub last_used_at: i64,
}

#[derive(Debug, Serialize)]
pub struct DevicesResponse {
    pub devices: Vec<DeviceInfo>,
    pub max_devices: i32,
    pub active_devices: i64,
}

/// Every device ever seen for a license, so a client can render
/// "X of Y devices used" with per-device labels.
pub async fn list_devices(
    State(state): State<AppState>,
    Query(query): Query<DevicesQuery>,
) -> Result<Json<DevicesResponse>> {
    let conn = state.db.get()?;

    let license = queries::get_license_by_code(&conn, &normalize_license_code(&query.code))?
        .ok_or_else(|| AppError::NotFound("License not found".into()))?;

    let activations = queries::list_activations(&conn, &license.id)?;
    let active_devices = activations.iter().filter(|a| a.is_active).count() as i64;

    let devices = activations
        .into_iter()
        .map(|a| DeviceInfo {
            fingerprint: a.device_fingerprint,
            device_type: a.device_type.as_ref().to_string(),
            name: a.device_name,
            is_active: a.is_active,
            activated_at: a.created_at,
            last_used_at: a.last_used_at,
        })
        .collect();

    Ok(Json(DevicesResponse {
        devices,
        max_devices: license.max_devices,
        active_devices,
    }))
}
