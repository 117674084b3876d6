//! Read-only view of the content datastore: approved, sync-enabled videos.

use async_trait::async_trait;
use sqlx::PgPool;

use crate::models::{GroupingKey, SourceFilter, SourceItem};
use crate::store::StoreError;

#[async_trait]
pub trait SourceCatalog: Send + Sync {
    /// Every eligible item inside `filter`, with normalized grouping keys.
    async fn eligible_items(&self, filter: &SourceFilter) -> Result<Vec<SourceItem>, StoreError>;
}

/// Reads `video_submissions`. Moderation state lives elsewhere; only rows
/// with `status = 'approved'` and `sync_enabled` are considered.
pub struct PgSourceCatalog {
    pool: PgPool,
}

impl PgSourceCatalog {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SourceCatalog for PgSourceCatalog {
    async fn eligible_items(&self, filter: &SourceFilter) -> Result<Vec<SourceItem>, StoreError> {
        let rows = sqlx::query_as::<_, (String, String, String)>(
            r#"
            SELECT country_code, category, youtube_id
            FROM video_submissions
            WHERE status = 'approved'
              AND sync_enabled
              AND ($1::TEXT IS NULL OR upper(trim(country_code)) = $1)
            ORDER BY created_at, id
            "#,
        )
        .bind(filter.country_code.as_deref())
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .filter(|(_, _, youtube_id)| !youtube_id.trim().is_empty())
            .map(|(country_code, category, youtube_id)| SourceItem {
                key: GroupingKey::new(&country_code, &category),
                external_item_id: youtube_id.trim().to_string(),
            })
            // Category normalization happens in Rust, so filter it here.
            .filter(|item| filter.matches(&item.key))
            .collect())
    }
}
