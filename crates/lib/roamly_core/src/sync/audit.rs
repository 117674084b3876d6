//! Append-only run history in `sync_logs`.

use async_trait::async_trait;
use sqlx::PgPool;

use crate::models::SyncLogEntry;
use crate::store::StoreError;

/// Default page size for [`SyncLogStore::recent`].
pub const DEFAULT_RECENT_LIMIT: u32 = 20;
pub const MAX_RECENT_LIMIT: u32 = 200;

#[async_trait]
pub trait SyncLogStore: Send + Sync {
    async fn append(&self, entry: &SyncLogEntry) -> Result<(), StoreError>;

    /// Newest first, at most `limit` rows.
    async fn recent(&self, limit: u32) -> Result<Vec<SyncLogEntry>, StoreError>;
}

pub struct PgSyncLogStore {
    pool: PgPool,
}

impl PgSyncLogStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SyncLogStore for PgSyncLogStore {
    async fn append(&self, entry: &SyncLogEntry) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO sync_logs
                (id, scope, scope_key, items_added, collections_created,
                 collections_updated, status, error_summary, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(entry.id)
        .bind(entry.scope)
        .bind(&entry.scope_key)
        .bind(entry.items_added)
        .bind(entry.collections_created)
        .bind(entry.collections_updated)
        .bind(entry.status)
        .bind(&entry.error_summary)
        .bind(entry.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn recent(&self, limit: u32) -> Result<Vec<SyncLogEntry>, StoreError> {
        let rows = sqlx::query_as::<_, SyncLogEntry>(
            r#"
            SELECT id, scope, scope_key, items_added, collections_created,
                   collections_updated, status, error_summary, created_at
            FROM sync_logs
            ORDER BY created_at DESC, id DESC
            LIMIT $1
            "#,
        )
        .bind(i64::from(limit.min(MAX_RECENT_LIMIT)))
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}
