use axum::{Json, extract::State};
use serde::Serialize;

use crate::db::AppState;
use crate::error::{AppError, Result};
use crate::escalation;
use crate::models::CreateSupportClaim;
use crate::notify::Notification;

#[derive(Debug, Serialize)]
pub struct ClaimResponse {
    pub success: bool,
    /// Shown to the end user as their reference.
    pub claim_number: String,
}

pub async fn create_support_claim(
    State(state): State<AppState>,
    Json(input): Json<CreateSupportClaim>,
) -> Result<Json<ClaimResponse>> {
    if input.email.trim().is_empty() {
        return Err(AppError::BadRequest("email is required".into()));
    }
    if input.subject.trim().is_empty() || input.message.trim().is_empty() {
        return Err(AppError::BadRequest("subject and message are required".into()));
    }

    let conn = state.db.get()?;
    let claim = escalation::create_support_claim(&conn, &input)?;

    // The claim is durable at this point; the operator alert must not
    // be able to fail the request.
    state.notifier.dispatch(Notification::ClaimCreated {
        claim_number: claim.claim_number.clone(),
        email: claim.email.clone(),
        claim_type: claim.claim_type.as_ref().to_string(),
        subject: claim.subject.clone(),
        license_code: claim.license_code.clone(),
    });

    Ok(Json(ClaimResponse {
        success: true,
        claim_number: claim.claim_number,
    }))
}
