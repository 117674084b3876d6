//! Domain models shared by the stores, the catalog engine, and the API layer.

pub mod catalog;
pub mod credential;
pub mod sync;

pub use catalog::{
    CollectionCacheEntry, GroupingKey, NewCollection, Page, Privacy, RemoteCollection,
    normalize_category,
};
pub use credential::{AccessCredential, OAuthCredential};
pub use sync::{
    FailureKind, GroupFailure, SourceFilter, SourceItem, SyncLogEntry, SyncResult, SyncScope,
    SyncScopeKind, SyncStatus,
};
