//! External catalog: collection resolution and membership reconciliation
//! against the video platform.

pub mod cache;
pub mod countries;
pub mod locks;
pub mod naming;
pub mod platform;
pub mod reconciler;
pub mod resolver;
pub mod youtube;

use thiserror::Error;

use crate::credentials::CredentialError;
use crate::models::{FailureKind, GroupingKey};
use crate::store::StoreError;

/// Reason the platform reports for a deleted or unknown playlist.
pub const COLLECTION_NOT_FOUND: &str = "playlistNotFound";

/// Classified error from one platform call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlatformError {
    #[error("Remote object not found: {0}")]
    NotFound(String),

    #[error("Platform rejected the access token: {0}")]
    Unauthorized(String),

    #[error(
        "Platform quota exhausted ({reason}); the daily quota resets at midnight Pacific time"
    )]
    QuotaExceeded { reason: String },

    #[error("Platform rate limit reached ({reason}); retry later")]
    RateLimited { reason: String },

    #[error("Platform rejected the request (HTTP {status}, {reason}): {message}")]
    Rejected {
        status: u16,
        reason: String,
        message: String,
    },

    #[error("Platform error HTTP {status}: {message}")]
    Http { status: u16, message: String },

    #[error("Platform unreachable: {0}")]
    Transport(String),
}

impl PlatformError {
    pub fn failure_kind(&self) -> FailureKind {
        match self {
            PlatformError::QuotaExceeded { .. } => FailureKind::Quota,
            PlatformError::RateLimited { .. } => FailureKind::RateLimited,
            PlatformError::Unauthorized(_) => FailureKind::Auth,
            _ => FailureKind::Remote,
        }
    }

    /// The collection the call targeted no longer exists.
    pub fn is_collection_missing(&self) -> bool {
        matches!(self, PlatformError::NotFound(detail) if detail.starts_with(COLLECTION_NOT_FOUND))
    }

    /// Errors that concern one item only; the rest of a batch can proceed.
    pub fn is_item_scoped(&self) -> bool {
        match self {
            PlatformError::NotFound(_) => !self.is_collection_missing(),
            PlatformError::Rejected { .. } => true,
            _ => false,
        }
    }
}

/// Errors from resolving or reconciling one grouping key.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("collection lookup failed: {source}")]
    Resolve {
        key: GroupingKey,
        #[source]
        source: PlatformError,
    },

    #[error("listing items of {collection_id} failed: {source}")]
    Membership {
        collection_id: String,
        #[source]
        source: PlatformError,
    },

    #[error("adding items to {collection_id} stopped after {added} addition(s): {source}")]
    Reconcile {
        collection_id: String,
        added: u32,
        #[source]
        source: PlatformError,
    },

    #[error(transparent)]
    Credential(#[from] CredentialError),

    #[error("Collection cache error: {0}")]
    Store(#[from] StoreError),
}

impl CatalogError {
    pub fn failure_kind(&self) -> FailureKind {
        match self {
            CatalogError::Resolve { source, .. }
            | CatalogError::Membership { source, .. }
            | CatalogError::Reconcile { source, .. } => source.failure_kind(),
            CatalogError::Credential(_) => FailureKind::Auth,
            CatalogError::Store(_) => FailureKind::Store,
        }
    }

    /// Authentication failures abort the whole run.
    pub fn is_fatal(&self) -> bool {
        self.failure_kind() == FailureKind::Auth
    }
}
