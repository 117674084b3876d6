//! # roamly_api
//!
//! Admin HTTP API for triggering and inspecting catalog sync runs.

pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;

use axum::Router;
use axum::routing::{get, post};
use roamly_core::engine::Engine;
use tokio_util::sync::CancellationToken;
use tower_http::cors::{Any, CorsLayer};

use crate::config::ApiConfig;
use crate::handlers::{catalog, health, sync};

/// Route paths.
pub mod routes {
    pub const GET_API_HEALTH: &str = "/api/health";
    pub const POST_ADMIN_SYNC: &str = "/api/admin/sync";
    pub const POST_ADMIN_SYNC_COUNTRY: &str = "/api/admin/sync/{country}";
    pub const POST_ADMIN_SYNC_CATEGORY: &str = "/api/admin/sync/{country}/{category}";
    pub const GET_ADMIN_COLLECTIONS: &str = "/api/admin/collections";
    pub const GET_ADMIN_SYNC_LOGS: &str = "/api/admin/sync-logs";
}

/// Shared application state passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub engine: Engine,
    pub config: ApiConfig,
    /// Cancelled on server shutdown; runs take a child token.
    pub shutdown: CancellationToken,
}

/// Builds the Axum router with all routes and shared state.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let public = Router::new().route(routes::GET_API_HEALTH, get(health::health));

    let admin = Router::new()
        .route(routes::POST_ADMIN_SYNC, post(sync::sync_all_handler))
        .route(routes::POST_ADMIN_SYNC_COUNTRY, post(sync::sync_country_handler))
        .route(
            routes::POST_ADMIN_SYNC_CATEGORY,
            post(sync::sync_category_handler),
        )
        .route(
            routes::GET_ADMIN_COLLECTIONS,
            get(catalog::list_collections_handler),
        )
        .route(
            routes::GET_ADMIN_SYNC_LOGS,
            get(catalog::list_sync_logs_handler),
        )
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::admin::require_admin,
        ));

    Router::new()
        .merge(public)
        .merge(admin)
        .layer(cors)
        .with_state(state)
}
