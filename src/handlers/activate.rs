use axum::{Json, extract::State, http::HeaderMap};
use serde::{Deserialize, Serialize};

use crate::admission::{self, ActivationOutcome, Denial};
use crate::db::AppState;
use crate::error::Result;
use crate::models::DeviceType;
use crate::util::{extract_request_info, normalize_license_code};

#[derive(Debug, Deserialize)]
pub struct ActivateRequest {
    pub code: String,
    pub fingerprint: String,
    #[serde(default)]
    pub device_name: Option<String>,
    pub device_type: DeviceType,
    /// Browser clients may pass the UA explicitly; otherwise the header
    /// value is used.
    #[serde(default)]
    pub user_agent: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ActivateResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub activation_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remaining_activations: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Escalation entry point, present on quota denials.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub support_claim_url: Option<String>,
}

pub async fn activate_device(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<ActivateRequest>,
) -> Result<Json<ActivateResponse>> {
    let (ip_address, header_user_agent) = extract_request_info(&headers);
    let user_agent = request.user_agent.clone().or(header_user_agent);

    let mut conn = state.db.get()?;
    let outcome = admission::activate_device(
        &mut conn,
        state.classifier.as_ref(),
        state.category_device_limit,
        &admission::ActivationRequest {
            code: &request.code,
            fingerprint: &request.fingerprint,
            device_name: request.device_name.as_deref(),
            device_type: request.device_type,
            ip_address: ip_address.as_deref(),
            user_agent: user_agent.as_deref(),
        },
    )?;

    let response = match outcome {
        ActivationOutcome::Activated {
            activation,
            remaining_activations,
        } => ActivateResponse {
            success: true,
            activation_id: Some(activation.id),
            remaining_activations: Some(remaining_activations),
            error_code: None,
            message: None,
            support_claim_url: None,
        },
        ActivationOutcome::Denied(denial) => {
            let support_claim_url = match &denial {
                Denial::DeviceLimitExceeded { .. } => Some(format!(
                    "{}/support-claim?license_code={}",
                    state.base_url,
                    normalize_license_code(&request.code)
                )),
                _ => None,
            };
            ActivateResponse {
                success: false,
                activation_id: None,
                remaining_activations: None,
                error_code: Some(denial.error_code()),
                message: Some(denial.message()),
                support_claim_url,
            }
        }
    };

    Ok(Json(response))
}
