//! Read-only views of the collection cache and the sync log.

use axum::Json;
use axum::extract::{Query, State};
use roamly_core::catalog::cache::CollectionCache;
use roamly_core::models::{CollectionCacheEntry, SyncLogEntry};
use roamly_core::sync::audit::{DEFAULT_RECENT_LIMIT, MAX_RECENT_LIMIT, SyncLogStore};
use serde::{Deserialize, Serialize};

use crate::AppState;
use crate::error::AppResult;

#[derive(Debug, Serialize)]
pub struct CollectionListResponse {
    pub collections: Vec<CollectionCacheEntry>,
}

/// `GET /api/admin/collections`: every cached collection.
pub async fn list_collections_handler(
    State(state): State<AppState>,
) -> AppResult<Json<CollectionListResponse>> {
    let collections = state.engine.cache.list().await?;
    Ok(Json(CollectionListResponse { collections }))
}

#[derive(Debug, Deserialize)]
pub struct SyncLogQuery {
    pub limit: Option<u32>,
}

#[derive(Debug, Serialize)]
pub struct SyncLogListResponse {
    pub logs: Vec<SyncLogEntry>,
}

/// `GET /api/admin/sync-logs?limit=N`: newest runs first.
pub async fn list_sync_logs_handler(
    State(state): State<AppState>,
    Query(params): Query<SyncLogQuery>,
) -> AppResult<Json<SyncLogListResponse>> {
    let limit = params
        .limit
        .unwrap_or(DEFAULT_RECENT_LIMIT)
        .clamp(1, MAX_RECENT_LIMIT);
    let logs = state.engine.logs.recent(limit).await?;
    Ok(Json(SyncLogListResponse { logs }))
}
