//! # roamly_core
//!
//! Mirrors approved travel videos into per-(country, category) playlists on
//! the linked YouTube account.
//!
//! - [`credentials`]: OAuth token storage and refresh.
//! - [`catalog`]: collection naming, resolution, and membership.
//! - [`sync`]: batch runs and their audit log.

pub mod catalog;
pub mod config;
pub mod credentials;
pub mod db;
pub mod engine;
#[cfg(any(test, feature = "test-support"))]
pub mod memory;
pub mod models;
pub mod store;
pub mod sync;

/// Returns the crate version.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
