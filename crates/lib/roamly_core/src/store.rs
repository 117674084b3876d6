//! Errors shared by the persistent stores.

use thiserror::Error;

/// Errors raised by credential, cache, source, and audit stores.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Db(#[from] sqlx::Error),

    #[error("Encryption error: {0}")]
    Encryption(String),

    #[error("Row not found: {0}")]
    NotFound(String),

    #[error("Unexpected row shape: {0}")]
    Corrupt(String),
}
