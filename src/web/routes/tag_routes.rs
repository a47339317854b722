use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, State,
    },
    routing::{get, post},
    Json, Router,
};
use std::sync::Arc;
use tracing::info;

use crate::db::models::{LatestTag, NewTag, Tag};
use crate::web::{AppError, AppState};

// --- Route Handlers ---

async fn list_all_tags_handler(
    State(app_state): State<Arc<AppState>>,
) -> Result<Json<Vec<Tag>>, AppError> {
    let tags = app_state.tag_store.list_tags(true, None)?;
    Ok(Json(tags))
}

async fn create_tag_handler(
    State(app_state): State<Arc<AppState>>,
    payload: Result<Json<NewTag>, JsonRejection>,
) -> Result<String, AppError> {
    let Json(new_tag) = payload?;
    app_state.tag_store.insert_tag(&new_tag)?;
    Ok(format!("Inserted {} into table", new_tag.binary_value))
}

async fn get_tag_handler(
    State(app_state): State<Arc<AppState>>,
    tag_id: Result<Path<i64>, PathRejection>,
) -> Result<Json<Vec<Tag>>, AppError> {
    let Path(tag_id) = tag_id?;
    let tags = app_state.tag_store.list_tags(false, Some(tag_id))?;
    Ok(Json(tags))
}

async fn latest_tag_handler(
    State(app_state): State<Arc<AppState>>,
) -> Result<Json<Vec<LatestTag>>, AppError> {
    let latest = app_state.tag_store.list_latest_tag()?;
    Ok(Json(latest))
}

async fn delete_tag_handler(
    State(app_state): State<Arc<AppState>>,
    tag_id: Result<Path<i64>, PathRejection>,
) -> Result<String, AppError> {
    let Path(tag_id) = tag_id?;
    let rows_affected = app_state.tag_store.delete_tag(tag_id)?;
    info!(tag_id, rows_affected, "Delete tag requested.");
    Ok(format!("Deleted message {tag_id}"))
}

// --- Router ---

pub fn create_tags_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/tags", get(list_all_tags_handler))
        .route("/tag", post(create_tag_handler))
        .route("/tag/latest", get(latest_tag_handler))
        .route("/tag/{tag_id}", get(get_tag_handler).delete(delete_tag_handler))
}
