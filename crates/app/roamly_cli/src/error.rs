use roamly_core::config::ConfigError;
use roamly_core::store::StoreError;
use roamly_core::sync::SyncError;
use thiserror::Error;

pub type Result<T> = core::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("{}", .0)]
    Custom(String),

    #[error("IO::{:?}: {}", .0, .0)]
    Io(#[from] std::io::Error),

    #[error("Config: {}", .0)]
    Config(#[from] ConfigError),

    #[error("Database: {}", .0)]
    Db(#[from] sqlx::Error),

    #[error("Migration: {}", .0)]
    Migrate(#[from] sqlx::migrate::MigrateError),

    #[error("Store: {}", .0)]
    Store(#[from] StoreError),

    #[error("{}", .0)]
    Sync(#[from] SyncError),

    #[error("Json: {}", .0)]
    Json(#[from] serde_json::Error),

    #[error("Logging: {}", .0)]
    Logging(String),
}
