//! Admin authentication: static bearer token from `ROAMLY_ADMIN_TOKEN`.

use axum::http::header::AUTHORIZATION;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use sha2::{Digest, Sha256};

use crate::AppState;
use crate::error::AppError;

/// Axum middleware: requires `Authorization: Bearer <admin token>`.
pub async fn require_admin(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let expected = state
        .config
        .admin_token
        .as_deref()
        .ok_or_else(|| AppError::Unauthorized("Admin API is disabled".into()))?;

    let header = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| AppError::Unauthorized("Missing authorization header".into()))?;

    let token = header
        .strip_prefix("Bearer ")
        .ok_or_else(|| AppError::Unauthorized("Invalid authorization scheme".into()))?;

    if !tokens_match(token, expected) {
        return Err(AppError::Unauthorized("Invalid admin token".into()));
    }

    Ok(next.run(request).await)
}

/// Compare digests so the check does not short-circuit on a shared prefix.
fn tokens_match(given: &str, expected: &str) -> bool {
    Sha256::digest(given.as_bytes()) == Sha256::digest(expected.as_bytes())
}
