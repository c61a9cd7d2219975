use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::Response,
};

use crate::db::AppState;
use crate::util::extract_bearer_token;

/// Guard for the /internal surface. With no token configured the whole
/// surface is hidden rather than open.
pub async fn internal_auth(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let Some(expected) = state.internal_api_token.as_deref() else {
        return Err(StatusCode::NOT_FOUND);
    };

    let token = extract_bearer_token(request.headers()).ok_or(StatusCode::UNAUTHORIZED)?;
    if token != expected {
        return Err(StatusCode::UNAUTHORIZED);
    }

    Ok(next.run(request).await)
}
