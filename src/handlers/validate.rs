use axum::{Json, extract::State};
use serde::{Deserialize, Serialize};

use crate::admission::{self, ValidationOutcome};
use crate::db::AppState;
use crate::error::Result;

#[derive(Debug, Deserialize)]
pub struct ValidateRequest {
    pub code: String,
}

#[derive(Debug, Serialize)]
pub struct ValidateResponse {
    pub valid: bool,
    /// Flat comparison of active devices against the advertised limit.
    /// What a client shows as "X of Y devices used".
    pub can_activate: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_devices: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active_devices: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remaining_activations: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<&'static str>,
}

pub async fn validate_license(
    State(state): State<AppState>,
    Json(request): Json<ValidateRequest>,
) -> Result<Json<ValidateResponse>> {
    let conn = state.db.get()?;

    let response = match admission::validate_license(&conn, &request.code)? {
        ValidationOutcome::Valid(v) => ValidateResponse {
            valid: true,
            can_activate: v.can_activate,
            max_devices: Some(v.license.max_devices),
            active_devices: Some(v.active_devices),
            remaining_activations: Some(v.remaining_activations),
            error_code: None,
        },
        ValidationOutcome::Denied(denial) => ValidateResponse {
            valid: false,
            can_activate: false,
            max_devices: None,
            active_devices: None,
            remaining_activations: None,
            error_code: Some(denial.error_code()),
        },
    };

    Ok(Json(response))
}
