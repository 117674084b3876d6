//! In-memory implementations of every storage and platform seam.
//!
//! Compiled for this crate's tests and, through the `test-support` feature,
//! for downstream test suites. Nothing is persisted.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::catalog::PlatformError;
use crate::catalog::cache::CollectionCache;
use crate::catalog::platform::{AuthorizedPlatform, VideoPlatform};
use crate::credentials::manager::TokenManager;
use crate::credentials::oauth::{RefreshError, RefreshedToken, TokenRefresher};
use crate::credentials::store::CredentialStore;
use crate::models::{
    AccessCredential, CollectionCacheEntry, GroupingKey, NewCollection, OAuthCredential, Page,
    RemoteCollection, SourceFilter, SourceItem, SyncLogEntry,
};
use crate::store::StoreError;
use crate::sync::audit::SyncLogStore;
use crate::sync::source::SourceCatalog;

/// Account id used by [`linked_tokens`] and [`authorized`].
pub const MEMORY_ACCOUNT: &str = "acct";

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// A credential valid for the next hour.
pub fn fresh_credential(account_id: &str) -> OAuthCredential {
    let now = Utc::now();
    OAuthCredential {
        account_id: account_id.to_string(),
        access_token: "memory-access".into(),
        refresh_token: "memory-refresh".into(),
        expires_at: now + chrono::Duration::hours(1),
        scopes: vec!["https://www.googleapis.com/auth/youtube".into()],
        updated_at: now,
    }
}

/// Token manager with [`MEMORY_ACCOUNT`] linked and fresh.
pub fn linked_tokens() -> Arc<TokenManager> {
    Arc::new(TokenManager::new(
        Arc::new(MemoryCredentialStore::with(fresh_credential(MEMORY_ACCOUNT))),
        MemoryTokenRefresher::new(),
    ))
}

/// `platform` bound to [`MEMORY_ACCOUNT`].
pub async fn authorized(platform: Arc<MemoryPlatform>) -> AuthorizedPlatform {
    AuthorizedPlatform::new(platform, linked_tokens(), MEMORY_ACCOUNT)
}

// Credentials

#[derive(Default)]
pub struct MemoryCredentialStore {
    rows: Mutex<HashMap<String, OAuthCredential>>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(credential: OAuthCredential) -> Self {
        let store = Self::new();
        lock(&store.rows).insert(credential.account_id.clone(), credential);
        store
    }
}

#[async_trait]
impl CredentialStore for MemoryCredentialStore {
    async fn get(&self, account_id: &str) -> Result<Option<OAuthCredential>, StoreError> {
        Ok(lock(&self.rows).get(account_id).cloned())
    }

    async fn update_access_token(
        &self,
        account_id: &str,
        access_token: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let mut rows = lock(&self.rows);
        let row = rows
            .get_mut(account_id)
            .ok_or_else(|| StoreError::NotFound(format!("credential for {account_id}")))?;
        row.access_token = access_token.to_string();
        row.expires_at = expires_at;
        row.updated_at = Utc::now();
        Ok(())
    }

    async fn upsert(&self, credential: &OAuthCredential) -> Result<(), StoreError> {
        lock(&self.rows).insert(credential.account_id.clone(), credential.clone());
        Ok(())
    }
}

/// Refresher that issues numbered tokens, or rejects every exchange.
pub struct MemoryTokenRefresher {
    calls: AtomicU32,
    reject: bool,
}

impl MemoryTokenRefresher {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicU32::new(0),
            reject: false,
        })
    }

    pub fn rejecting() -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicU32::new(0),
            reject: true,
        })
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TokenRefresher for MemoryTokenRefresher {
    async fn refresh(&self, _refresh_token: &str) -> Result<RefreshedToken, RefreshError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if self.reject {
            return Err(RefreshError::Rejected(
                "invalid_grant: Token has been expired or revoked.".into(),
            ));
        }
        Ok(RefreshedToken {
            access_token: format!("memory-access-{n}"),
            expires_in: 3600,
            scope: None,
        })
    }
}

// Collection cache

#[derive(Default)]
pub struct MemoryCollectionCache {
    entries: Mutex<HashMap<GroupingKey, CollectionCacheEntry>>,
}

impl MemoryCollectionCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, entry: CollectionCacheEntry) {
        lock(&self.entries).insert(entry.key.clone(), entry);
    }

    /// Snapshot ordered by key.
    pub fn entries(&self) -> Vec<CollectionCacheEntry> {
        let mut entries: Vec<_> = lock(&self.entries).values().cloned().collect();
        entries.sort_by(|a, b| a.key.cmp(&b.key));
        entries
    }
}

#[async_trait]
impl CollectionCache for MemoryCollectionCache {
    async fn get(&self, key: &GroupingKey) -> Result<Option<CollectionCacheEntry>, StoreError> {
        Ok(lock(&self.entries).get(key).cloned())
    }

    async fn put(&self, entry: &CollectionCacheEntry) -> Result<(), StoreError> {
        self.insert(entry.clone());
        Ok(())
    }

    async fn invalidate(&self, key: &GroupingKey) -> Result<(), StoreError> {
        lock(&self.entries).remove(key);
        Ok(())
    }

    async fn touch(&self, key: &GroupingKey, at: DateTime<Utc>) -> Result<(), StoreError> {
        if let Some(entry) = lock(&self.entries).get_mut(key) {
            entry.last_synced_at = at;
        }
        Ok(())
    }

    async fn list(&self) -> Result<Vec<CollectionCacheEntry>, StoreError> {
        Ok(self.entries())
    }
}

// Source catalog

#[derive(Default)]
pub struct MemorySourceCatalog {
    items: Mutex<Vec<SourceItem>>,
    queries: AtomicU32,
}

impl MemorySourceCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an approved, sync-enabled video.
    pub fn push(&self, country_code: &str, category: &str, item_id: &str) {
        lock(&self.items).push(SourceItem {
            key: GroupingKey::new(country_code, category),
            external_item_id: item_id.to_string(),
        });
    }

    pub fn queries(&self) -> u32 {
        self.queries.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SourceCatalog for MemorySourceCatalog {
    async fn eligible_items(&self, filter: &SourceFilter) -> Result<Vec<SourceItem>, StoreError> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        Ok(lock(&self.items)
            .iter()
            .filter(|item| filter.matches(&item.key))
            .cloned()
            .collect())
    }
}

// Audit log

#[derive(Default)]
pub struct MemorySyncLogStore {
    entries: Mutex<Vec<SyncLogEntry>>,
    failing: bool,
}

impl MemorySyncLogStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store whose appends always fail.
    pub fn failing() -> Self {
        Self {
            failing: true,
            ..Self::default()
        }
    }

    /// Entries in append order.
    pub fn entries(&self) -> Vec<SyncLogEntry> {
        lock(&self.entries).clone()
    }
}

#[async_trait]
impl SyncLogStore for MemorySyncLogStore {
    async fn append(&self, entry: &SyncLogEntry) -> Result<(), StoreError> {
        if self.failing {
            return Err(StoreError::Corrupt("sync log store is unavailable".into()));
        }
        lock(&self.entries).push(entry.clone());
        Ok(())
    }

    async fn recent(&self, limit: u32) -> Result<Vec<SyncLogEntry>, StoreError> {
        Ok(lock(&self.entries)
            .iter()
            .rev()
            .take(limit as usize)
            .cloned()
            .collect())
    }
}

// Platform

#[derive(Default)]
struct PlatformState {
    collections: Vec<RemoteCollection>,
    items: HashMap<String, Vec<String>>,
    next_id: u32,
    create_calls: u32,
    add_calls: u32,
    list_collections_calls: u32,
    fail_all: Option<PlatformError>,
    fail_creates: Option<PlatformError>,
    fail_item_lists: Option<PlatformError>,
    fail_items: HashMap<String, PlatformError>,
    revoked: HashSet<String>,
    add_delay: Option<Duration>,
    vanish_on: Option<String>,
}

impl PlatformState {
    /// Failure every call sees before its own injected failures.
    fn refusal(&self, cred: &AccessCredential) -> Option<PlatformError> {
        if self.revoked.contains(&cred.access_token) {
            return Some(PlatformError::Unauthorized("revoked".into()));
        }
        self.fail_all.clone()
    }
}

/// Recording fake of the video platform with injectable failures.
pub struct MemoryPlatform {
    state: Mutex<PlatformState>,
    page_size: usize,
}

impl Default for MemoryPlatform {
    fn default() -> Self {
        Self::with_page_size(50)
    }
}

impl MemoryPlatform {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page_size(page_size: usize) -> Self {
        Self {
            state: Mutex::new(PlatformState::default()),
            page_size: page_size.max(1),
        }
    }

    /// Create a collection directly, bypassing call counters.
    pub fn seed_collection(&self, title: &str, description: &str) -> String {
        let mut state = lock(&self.state);
        insert_collection(&mut state, title, description)
    }

    pub fn seed_item(&self, collection_id: &str, item_id: &str) {
        lock(&self.state)
            .items
            .entry(collection_id.to_string())
            .or_default()
            .push(item_id.to_string());
    }

    /// Simulate a manual deletion on the platform side.
    pub fn delete_collection(&self, collection_id: &str) {
        let mut state = lock(&self.state);
        state.collections.retain(|c| c.id != collection_id);
        state.items.remove(collection_id);
    }

    pub fn collection(&self, collection_id: &str) -> Option<RemoteCollection> {
        let state = lock(&self.state);
        state
            .collections
            .iter()
            .find(|c| c.id == collection_id)
            .map(|c| RemoteCollection {
                item_count: Some(state.items.get(&c.id).map_or(0, Vec::len) as u32),
                ..c.clone()
            })
    }

    pub fn items(&self, collection_id: &str) -> Vec<String> {
        lock(&self.state)
            .items
            .get(collection_id)
            .cloned()
            .unwrap_or_default()
    }

    pub fn create_calls(&self) -> u32 {
        lock(&self.state).create_calls
    }

    pub fn add_calls(&self) -> u32 {
        lock(&self.state).add_calls
    }

    pub fn list_collections_calls(&self) -> u32 {
        lock(&self.state).list_collections_calls
    }

    /// Every call fails with `err`.
    pub fn fail_all(&self, err: PlatformError) {
        lock(&self.state).fail_all = Some(err);
    }

    pub fn fail_creates(&self, err: PlatformError) {
        lock(&self.state).fail_creates = Some(err);
    }

    /// Membership listings (and so liveness probes) fail with `err`.
    pub fn fail_item_lists(&self, err: PlatformError) {
        lock(&self.state).fail_item_lists = Some(err);
    }

    /// Adding `item_id` to any collection fails with `err`.
    pub fn fail_item(&self, item_id: &str, err: PlatformError) {
        lock(&self.state)
            .fail_items
            .insert(item_id.to_string(), err);
    }

    /// Calls presenting `access_token` fail with `Unauthorized`.
    pub fn revoke_token(&self, access_token: &str) {
        lock(&self.state).revoked.insert(access_token.to_string());
    }

    /// Every addition waits `delay` before touching the collection.
    pub fn slow_adds(&self, delay: Duration) {
        lock(&self.state).add_delay = Some(delay);
    }

    /// The next attempt to add `item_id` finds its collection deleted.
    pub fn delete_collection_when_adding(&self, item_id: &str) {
        lock(&self.state).vanish_on = Some(item_id.to_string());
    }

    fn page<T: Clone>(&self, all: &[T], page_token: Option<&str>) -> Page<T> {
        let start = page_token.and_then(|t| t.parse::<usize>().ok()).unwrap_or(0);
        let end = (start + self.page_size).min(all.len());
        Page {
            items: all.get(start..end).map(<[T]>::to_vec).unwrap_or_default(),
            next_page_token: (end < all.len()).then(|| end.to_string()),
        }
    }
}

fn insert_collection(state: &mut PlatformState, title: &str, description: &str) -> String {
    state.next_id += 1;
    let id = format!("PLmem{:04}", state.next_id);
    state.collections.push(RemoteCollection {
        id: id.clone(),
        title: title.to_string(),
        description: description.to_string(),
        item_count: Some(0),
    });
    state.items.insert(id.clone(), Vec::new());
    id
}

#[async_trait]
impl VideoPlatform for MemoryPlatform {
    async fn list_collections(
        &self,
        cred: &AccessCredential,
        page_token: Option<&str>,
    ) -> Result<Page<RemoteCollection>, PlatformError> {
        let collections = {
            let mut state = lock(&self.state);
            state.list_collections_calls += 1;
            if let Some(err) = state.refusal(cred) {
                return Err(err);
            }
            state.collections.clone()
        };
        Ok(self.page(&collections, page_token))
    }

    async fn list_items(
        &self,
        cred: &AccessCredential,
        collection_id: &str,
        page_token: Option<&str>,
    ) -> Result<Page<String>, PlatformError> {
        let items = {
            let state = lock(&self.state);
            if let Some(err) = state
                .refusal(cred)
                .or_else(|| state.fail_item_lists.clone())
            {
                return Err(err);
            }
            state.items.get(collection_id).cloned().ok_or_else(|| {
                PlatformError::NotFound(format!("playlistNotFound: {collection_id}"))
            })?
        };
        Ok(self.page(&items, page_token))
    }

    async fn create_collection(
        &self,
        cred: &AccessCredential,
        new: &NewCollection,
    ) -> Result<RemoteCollection, PlatformError> {
        let mut state = lock(&self.state);
        state.create_calls += 1;
        if let Some(err) = state.refusal(cred).or_else(|| state.fail_creates.clone()) {
            return Err(err);
        }
        let id = insert_collection(&mut state, &new.title, &new.description);
        Ok(RemoteCollection {
            id,
            title: new.title.clone(),
            description: new.description.clone(),
            item_count: Some(0),
        })
    }

    async fn add_item(
        &self,
        cred: &AccessCredential,
        collection_id: &str,
        item_id: &str,
    ) -> Result<(), PlatformError> {
        let delay = lock(&self.state).add_delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let mut state = lock(&self.state);
        state.add_calls += 1;
        if let Some(err) = state
            .refusal(cred)
            .or_else(|| state.fail_items.get(item_id).cloned())
        {
            return Err(err);
        }
        if state.vanish_on.as_deref() == Some(item_id) {
            state.vanish_on = None;
            state.collections.retain(|c| c.id != collection_id);
            state.items.remove(collection_id);
        }
        let items = state.items.get_mut(collection_id).ok_or_else(|| {
            PlatformError::NotFound(format!("playlistNotFound: {collection_id}"))
        })?;
        items.push(item_id.to_string());
        Ok(())
    }

    fn collection_url(&self, collection_id: &str) -> String {
        format!("memory://collections/{collection_id}")
    }
}
