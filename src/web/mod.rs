use axum::{http::Method, middleware as axum_middleware, Router};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use crate::db::TagStore;
use crate::host::HostControl;
use crate::server::config::ServerConfig;

pub use self::error::AppError;
use self::middleware::auth;
use self::routes::*;

pub mod error;
pub mod middleware;
pub mod routes;

#[derive(Clone)]
pub struct AppState {
    pub tag_store: Arc<TagStore>,
    pub host: Arc<dyn HostControl>,
    pub config: Arc<ServerConfig>,
}

pub fn create_axum_router(
    tag_store: Arc<TagStore>,
    host: Arc<dyn HostControl>,
    config: Arc<ServerConfig>,
) -> Router {
    let app_state = Arc::new(AppState {
        tag_store,
        host,
        config,
    });

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(vec![Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers(Any);

    let api = tag_routes::create_tags_router()
        .merge(system_routes::create_public_router())
        .merge(
            system_routes::create_privileged_router().route_layer(
                axum_middleware::from_fn_with_state(app_state.clone(), auth::require_admin_token),
            ),
        );

    Router::new()
        .nest("/api", api)
        .layer(cors)
        .with_state(app_state)
}
