use axum::{
    extract::State,
    routing::{delete, get},
    Router,
};
use std::sync::Arc;
use tracing::warn;

use crate::web::{AppError, AppState};

async fn health_check_handler(State(app_state): State<Arc<AppState>>) -> Result<&'static str, AppError> {
    app_state.tag_store.tag_count()?;
    Ok("OK")
}

async fn reset_database_handler(State(app_state): State<Arc<AppState>>) -> Result<&'static str, AppError> {
    warn!("Resetting tag database on request.");
    app_state.tag_store.reset_database()?;
    Ok("Database destroyed and reseeded")
}

// The reply goes out before the host has actually gone down.
async fn shutdown_handler(State(app_state): State<Arc<AppState>>) -> Result<&'static str, AppError> {
    warn!("Host shutdown requested.");
    app_state.host.shutdown().await?;
    Ok("Shutting down Pi")
}

async fn restart_handler(State(app_state): State<Arc<AppState>>) -> Result<&'static str, AppError> {
    warn!("Host restart requested.");
    app_state.host.restart().await?;
    Ok("Restarting Pi")
}

pub fn create_public_router() -> Router<Arc<AppState>> {
    Router::new().route("/health", get(health_check_handler))
}

/// Routes that destroy data or power off the host.
pub fn create_privileged_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/resetdb", delete(reset_database_handler))
        .route("/shutdown", get(shutdown_handler))
        .route("/restart", get(restart_handler))
}
