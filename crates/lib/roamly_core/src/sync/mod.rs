//! Batch synchronization of the source catalog into remote collections.

pub mod audit;
pub mod orchestrator;
pub mod source;

use thiserror::Error;

use crate::catalog::CatalogError;
use crate::credentials::CredentialError;
use crate::models::FailureKind;
use crate::store::StoreError;

/// Failures that end a run early. Everything else is recorded per group.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("Sync aborted, the account must be re-authorized: {0}")]
    Auth(#[source] CatalogError),

    #[error("Source catalog error: {0}")]
    Store(#[from] StoreError),
}

impl SyncError {
    pub fn failure_kind(&self) -> FailureKind {
        match self {
            SyncError::Auth(_) => FailureKind::Auth,
            SyncError::Store(_) => FailureKind::Store,
        }
    }
}

impl From<CredentialError> for SyncError {
    fn from(e: CredentialError) -> Self {
        SyncError::Auth(CatalogError::Credential(e))
    }
}

pub type Result<T> = std::result::Result<T, SyncError>;
