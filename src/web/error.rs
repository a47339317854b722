use axum::{
    extract::rejection::{JsonRejection, PathRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;
use tracing::error;

use crate::db::StoreError;
use crate::host::HostError;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Malformed request: {0}")]
    MalformedRequest(String),
    #[error("Unauthorized: {0}")]
    Unauthorized(String),
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("Host command error: {0}")]
    HostCommandError(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::MalformedRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg),
            AppError::DatabaseError(msg) => {
                error!(error = %msg, "Tag store operation failed.");
                (StatusCode::INTERNAL_SERVER_ERROR, format!("Database error: {msg}"))
            }
            AppError::HostCommandError(msg) => {
                error!(error = %msg, "Host power command failed.");
                (StatusCode::INTERNAL_SERVER_ERROR, format!("Host command error: {msg}"))
            }
        };
        (status, Json(serde_json::json!({ "error": error_message }))).into_response()
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        AppError::DatabaseError(err.to_string())
    }
}

impl From<HostError> for AppError {
    fn from(err: HostError) -> Self {
        AppError::HostCommandError(err.to_string())
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::MalformedRequest(rejection.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        AppError::MalformedRequest(rejection.body_text())
    }
}
