use axum::{
    body::Body as AxumBody,
    extract::State,
    http::{header, Request},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use tracing::warn;

use crate::web::{error::AppError, AppState};

/// Guards privileged routes with the configured admin token.
/// Without a configured token every request passes through unchanged.
pub async fn require_admin_token(
    State(state): State<Arc<AppState>>,
    req: Request<AxumBody>,
    next: Next,
) -> Result<Response, AppError> {
    let Some(expected) = state.config.admin_token.as_deref() else {
        return Ok(next.run(req).await);
    };

    let token = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|header| header.to_str().ok())
        .and_then(|header| header.strip_prefix("Bearer "))
        .map(str::trim)
        .ok_or_else(|| AppError::Unauthorized("Missing bearer token".to_string()))?;

    // Plain comparison; the guard is meant for a trusted LAN, not timing-hardened.
    if token != expected {
        warn!(path = %req.uri().path(), "Rejected privileged request with an invalid admin token.");
        return Err(AppError::Unauthorized("Invalid admin token".to_string()));
    }
    Ok(next.run(req).await)
}
