//! OAuth credential lifecycle for the linked platform account.
//!
//! [`store::CredentialStore`] persists tokens, [`oauth::TokenRefresher`]
//! performs the refresh-token exchange, and [`manager::TokenManager`]
//! combines them so every remote call starts with a usable access token.

pub mod manager;
pub mod oauth;
pub mod secrets;
pub mod store;

use thiserror::Error;

use crate::store::StoreError;

/// Credential errors. All of them are fatal for a sync run.
#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("Account {0} is not linked; link it before syncing")]
    NotLinked(String),

    #[error("Token refresh rejected for account {account}: {reason}; the account must be re-linked")]
    RefreshFailed { account: String, reason: String },

    #[error("Token endpoint unavailable for account {account}: {reason}")]
    RefreshUnavailable { account: String, reason: String },

    #[error("Credential store error: {0}")]
    Store(#[from] StoreError),
}
