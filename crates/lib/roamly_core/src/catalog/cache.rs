//! Persistent memo of grouping key → remote collection.
//!
//! A cache, not a source of truth: entries may point at collections that
//! were deleted remotely. The resolver detects and repairs that.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::models::{CollectionCacheEntry, GroupingKey};
use crate::store::StoreError;

/// Storage seam for cached collections. No remote calls.
#[async_trait]
pub trait CollectionCache: Send + Sync {
    async fn get(&self, key: &GroupingKey) -> Result<Option<CollectionCacheEntry>, StoreError>;

    /// Insert or replace the entry for `entry.key` (last writer wins).
    async fn put(&self, entry: &CollectionCacheEntry) -> Result<(), StoreError>;

    async fn invalidate(&self, key: &GroupingKey) -> Result<(), StoreError>;

    /// Record a successful sync of `key` at `at`.
    async fn touch(&self, key: &GroupingKey, at: DateTime<Utc>) -> Result<(), StoreError>;

    /// Every entry, ordered by country then category.
    async fn list(&self) -> Result<Vec<CollectionCacheEntry>, StoreError>;
}

type EntryRow = (String, String, String, String, String, DateTime<Utc>);

fn from_row(
    (country_code, category, remote_collection_id, display_name, public_url, last_synced_at): EntryRow,
) -> CollectionCacheEntry {
    CollectionCacheEntry {
        key: GroupingKey {
            country_code,
            category,
        },
        remote_collection_id,
        display_name,
        public_url,
        last_synced_at,
    }
}

/// `collection_cache` table keyed by `(country_code, category)`.
pub struct PgCollectionCache {
    pool: PgPool,
}

impl PgCollectionCache {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CollectionCache for PgCollectionCache {
    async fn get(&self, key: &GroupingKey) -> Result<Option<CollectionCacheEntry>, StoreError> {
        let row = sqlx::query_as::<_, EntryRow>(
            "SELECT country_code, category, remote_collection_id, display_name, public_url, \
             last_synced_at \
             FROM collection_cache WHERE country_code = $1 AND category = $2",
        )
        .bind(&key.country_code)
        .bind(&key.category)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(from_row))
    }

    async fn put(&self, entry: &CollectionCacheEntry) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO collection_cache
                (country_code, category, remote_collection_id, display_name, public_url, last_synced_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (country_code, category)
            DO UPDATE SET remote_collection_id = EXCLUDED.remote_collection_id,
                          display_name = EXCLUDED.display_name,
                          public_url = EXCLUDED.public_url,
                          last_synced_at = EXCLUDED.last_synced_at
            "#,
        )
        .bind(&entry.key.country_code)
        .bind(&entry.key.category)
        .bind(&entry.remote_collection_id)
        .bind(&entry.display_name)
        .bind(&entry.public_url)
        .bind(entry.last_synced_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn invalidate(&self, key: &GroupingKey) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM collection_cache WHERE country_code = $1 AND category = $2")
            .bind(&key.country_code)
            .bind(&key.category)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn touch(&self, key: &GroupingKey, at: DateTime<Utc>) -> Result<(), StoreError> {
        sqlx::query(
            "UPDATE collection_cache SET last_synced_at = $3 \
             WHERE country_code = $1 AND category = $2",
        )
        .bind(&key.country_code)
        .bind(&key.category)
        .bind(at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn list(&self) -> Result<Vec<CollectionCacheEntry>, StoreError> {
        let rows = sqlx::query_as::<_, EntryRow>(
            "SELECT country_code, category, remote_collection_id, display_name, public_url, \
             last_synced_at \
             FROM collection_cache ORDER BY country_code, category",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(from_row).collect())
    }
}
