mod activate;
mod claim;
mod devices;
mod internal;
mod validate;

pub use activate::*;
pub use claim::*;
pub use devices::*;
pub use internal::*;
pub use validate::*;

use axum::{
    Json, Router, middleware,
    routing::{get, post},
};
use serde::Serialize;

use crate::db::AppState;
use crate::middleware::internal_auth;

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

pub fn public_router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/validate-license", post(validate_license))
        .route("/activate-device", post(activate_device))
        .route("/support-claim", post(create_support_claim))
        .route("/devices", get(list_devices))
}

pub fn internal_router(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/internal/licenses", post(issue_license))
        .route("/internal/licenses/revoke", post(revoke_license))
        .route("/internal/devices/deactivate", post(deactivate_device))
        .layer(middleware::from_fn_with_state(state, internal_auth))
}
