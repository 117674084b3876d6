//! Grouping key → remote collection id.
//!
//! Resolution order: cached id (if still alive) → exact-title search →
//! create. The cache is repaired on any mismatch.

use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use tracing::{debug, info, warn};

use super::cache::CollectionCache;
use super::locks::KeyedLocks;
use super::naming::CollectionNaming;
use super::platform::{AuthorizedPlatform, CallError, MAX_LISTING_PAGES};
use super::{CatalogError, PlatformError};
use crate::models::{CollectionCacheEntry, GroupingKey, NewCollection, Privacy, RemoteCollection};

/// Where a resolved id came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ResolutionOrigin {
    /// Cached id that passed the liveness probe.
    Cached,
    /// Existing remote collection found by title.
    Adopted,
    Created,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub entry: CollectionCacheEntry,
    pub origin: ResolutionOrigin,
}

impl Resolution {
    pub fn collection_id(&self) -> &str {
        &self.entry.remote_collection_id
    }
}

pub struct CollectionResolver {
    cache: Arc<dyn CollectionCache>,
    locks: Arc<KeyedLocks>,
    naming: CollectionNaming,
    privacy: Privacy,
}

impl CollectionResolver {
    pub fn new(
        cache: Arc<dyn CollectionCache>,
        locks: Arc<KeyedLocks>,
        naming: CollectionNaming,
        privacy: Privacy,
    ) -> Self {
        Self {
            cache,
            locks,
            naming,
            privacy,
        }
    }

    /// Return a live remote collection for `key`, creating one if needed.
    ///
    /// Holds the key's lock for the whole sequence so concurrent resolutions
    /// of one key cannot both create.
    pub async fn resolve(
        &self,
        platform: &AuthorizedPlatform,
        key: &GroupingKey,
    ) -> Result<Resolution, CatalogError> {
        let _guard = self.locks.acquire(key).await;

        if let Some(entry) = self.cache.get(key).await? {
            match platform.list_items(&entry.remote_collection_id, None).await {
                Ok(_) => {
                    debug!(%key, collection_id = %entry.remote_collection_id, "cached collection is live");
                    return Ok(Resolution {
                        entry,
                        origin: ResolutionOrigin::Cached,
                    });
                }
                Err(CallError::Platform(PlatformError::NotFound(detail))) => {
                    warn!(
                        %key,
                        collection_id = %entry.remote_collection_id,
                        %detail,
                        "cached collection is gone remotely, invalidating"
                    );
                    self.cache.invalidate(key).await?;
                }
                Err(e) => return Err(wrap(key, e)),
            }
        }

        let title = self.naming.title(key);

        if let Some(found) = self.search(platform, key, &title).await? {
            info!(
                %key,
                collection_id = %found.id,
                item_count = ?found.item_count,
                "adopting existing collection by title"
            );
            let entry = self.remember(platform, key, &found).await?;
            return Ok(Resolution {
                entry,
                origin: ResolutionOrigin::Adopted,
            });
        }

        let new = NewCollection {
            title: title.clone(),
            description: self.naming.description(key),
            privacy: self.privacy,
        };
        let created = platform
            .create_collection(&new)
            .await
            .map_err(|e| wrap(key, e))?;
        info!(%key, collection_id = %created.id, %title, "created collection");

        let entry = self.remember(platform, key, &created).await?;
        Ok(Resolution {
            entry,
            origin: ResolutionOrigin::Created,
        })
    }

    /// Walk every page of the account's collections for an exact title match.
    ///
    /// A match carrying this key's ownership marker wins; otherwise the first
    /// unmarked match is adopted.
    async fn search(
        &self,
        platform: &AuthorizedPlatform,
        key: &GroupingKey,
        title: &str,
    ) -> Result<Option<RemoteCollection>, CatalogError> {
        let mut page_token: Option<String> = None;
        let mut unmarked: Option<RemoteCollection> = None;

        for _ in 0..MAX_LISTING_PAGES {
            let page = platform
                .list_collections(page_token.as_deref())
                .await
                .map_err(|e| wrap(key, e))?;

            for collection in page.items {
                if collection.title != title {
                    continue;
                }
                if self.naming.is_owned(key, &collection.description) {
                    return Ok(Some(collection));
                }
                if unmarked.is_none() {
                    unmarked = Some(collection);
                }
            }

            match page.next_page_token {
                Some(next) => page_token = Some(next),
                None => break,
            }
        }

        if let Some(collection) = &unmarked {
            warn!(
                %key,
                collection_id = %collection.id,
                "title matches a collection without an ownership marker"
            );
        }
        Ok(unmarked)
    }

    async fn remember(
        &self,
        platform: &AuthorizedPlatform,
        key: &GroupingKey,
        collection: &RemoteCollection,
    ) -> Result<CollectionCacheEntry, CatalogError> {
        let entry = CollectionCacheEntry {
            key: key.clone(),
            remote_collection_id: collection.id.clone(),
            display_name: collection.title.clone(),
            public_url: platform.collection_url(&collection.id),
            last_synced_at: Utc::now(),
        };
        self.cache.put(&entry).await?;
        Ok(entry)
    }
}

fn wrap(key: &GroupingKey, err: CallError) -> CatalogError {
    match err {
        CallError::Credential(e) => CatalogError::Credential(e),
        CallError::Platform(source) => CatalogError::Resolve {
            key: key.clone(),
            source,
        },
    }
}
