//! The video platform seam and its token-aware wrapper.

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use async_trait::async_trait;
use thiserror::Error;
use tracing::warn;

use super::PlatformError;
use crate::credentials::CredentialError;
use crate::credentials::manager::TokenManager;
use crate::models::{AccessCredential, NewCollection, Page, RemoteCollection};

/// Documented quota units per call.
pub mod quota {
    pub const LIST_COLLECTIONS: u32 = 1;
    pub const LIST_ITEMS: u32 = 1;
    pub const CREATE_COLLECTION: u32 = 50;
    pub const ADD_ITEM: u32 = 50;
}

/// Upper bound on pages walked in one listing.
pub const MAX_LISTING_PAGES: usize = 1000;

/// The four platform operations the engine needs.
#[async_trait]
pub trait VideoPlatform: Send + Sync {
    /// One page of the account's own collections.
    async fn list_collections(
        &self,
        cred: &AccessCredential,
        page_token: Option<&str>,
    ) -> Result<Page<RemoteCollection>, PlatformError>;

    /// One page of item ids in a collection. `NotFound` if it is gone.
    async fn list_items(
        &self,
        cred: &AccessCredential,
        collection_id: &str,
        page_token: Option<&str>,
    ) -> Result<Page<String>, PlatformError>;

    async fn create_collection(
        &self,
        cred: &AccessCredential,
        new: &NewCollection,
    ) -> Result<RemoteCollection, PlatformError>;

    async fn add_item(
        &self,
        cred: &AccessCredential,
        collection_id: &str,
        item_id: &str,
    ) -> Result<(), PlatformError>;

    /// Public URL of a collection.
    fn collection_url(&self, collection_id: &str) -> String;
}

/// Failure of a call made through [`AuthorizedPlatform`].
#[derive(Debug, Error)]
pub enum CallError {
    #[error(transparent)]
    Credential(#[from] CredentialError),

    #[error(transparent)]
    Platform(#[from] PlatformError),
}

/// A platform bound to one account. Every call first asks the token manager
/// for a valid credential, so a run can outlive any single access token.
pub struct AuthorizedPlatform {
    platform: Arc<dyn VideoPlatform>,
    tokens: Arc<TokenManager>,
    account_id: String,
    units_spent: AtomicU32,
}

impl AuthorizedPlatform {
    pub fn new(
        platform: Arc<dyn VideoPlatform>,
        tokens: Arc<TokenManager>,
        account_id: impl Into<String>,
    ) -> Self {
        Self {
            platform,
            tokens,
            account_id: account_id.into(),
            units_spent: AtomicU32::new(0),
        }
    }

    pub fn account_id(&self) -> &str {
        &self.account_id
    }

    /// Quota units charged by calls made through this wrapper.
    pub fn units_spent(&self) -> u32 {
        self.units_spent.load(Ordering::Relaxed)
    }

    async fn credential(&self, cost: u32) -> Result<AccessCredential, CallError> {
        let cred = self.tokens.ensure_valid_credential(&self.account_id).await?;
        self.units_spent.fetch_add(cost, Ordering::Relaxed);
        Ok(cred)
    }

    /// A refused token is dropped from the memo so the next call re-reads
    /// the store and picks up a re-linked account.
    async fn settle<T>(&self, outcome: Result<T, PlatformError>) -> Result<T, CallError> {
        if let Err(PlatformError::Unauthorized(detail)) = &outcome {
            warn!(account_id = %self.account_id, %detail, "access token refused, forgetting it");
            self.tokens.forget(&self.account_id).await;
        }
        Ok(outcome?)
    }

    pub async fn list_collections(
        &self,
        page_token: Option<&str>,
    ) -> Result<Page<RemoteCollection>, CallError> {
        let cred = self.credential(quota::LIST_COLLECTIONS).await?;
        self.settle(self.platform.list_collections(&cred, page_token).await)
            .await
    }

    pub async fn list_items(
        &self,
        collection_id: &str,
        page_token: Option<&str>,
    ) -> Result<Page<String>, CallError> {
        let cred = self.credential(quota::LIST_ITEMS).await?;
        self.settle(
            self.platform
                .list_items(&cred, collection_id, page_token)
                .await,
        )
        .await
    }

    pub async fn create_collection(
        &self,
        new: &NewCollection,
    ) -> Result<RemoteCollection, CallError> {
        let cred = self.credential(quota::CREATE_COLLECTION).await?;
        self.settle(self.platform.create_collection(&cred, new).await)
            .await
    }

    pub async fn add_item(&self, collection_id: &str, item_id: &str) -> Result<(), CallError> {
        let cred = self.credential(quota::ADD_ITEM).await?;
        self.settle(self.platform.add_item(&cred, collection_id, item_id).await)
            .await
    }

    pub fn collection_url(&self, collection_id: &str) -> String {
        self.platform.collection_url(collection_id)
    }
}
