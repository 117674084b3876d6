//! Production wiring: Postgres stores, the YouTube client, and the Google
//! token endpoint behind one [`SyncOrchestrator`].

use std::sync::Arc;
use std::time::Duration;

use sqlx::PgPool;

use crate::catalog::cache::{CollectionCache, PgCollectionCache};
use crate::catalog::naming::CollectionNaming;
use crate::catalog::youtube::YouTubeClient;
use crate::config::{ConfigError, SyncConfig};
use crate::credentials::manager::TokenManager;
use crate::credentials::oauth::GoogleTokenRefresher;
use crate::credentials::store::PgCredentialStore;
use crate::sync::audit::{PgSyncLogStore, SyncLogStore};
use crate::sync::orchestrator::{SyncOrchestrator, SyncParts};
use crate::sync::source::PgSourceCatalog;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Everything a front end needs to trigger and inspect runs.
#[derive(Clone)]
pub struct Engine {
    pub orchestrator: Arc<SyncOrchestrator>,
    pub cache: Arc<dyn CollectionCache>,
    pub logs: Arc<dyn SyncLogStore>,
    /// Account every run is performed as.
    pub account_id: String,
}

impl Engine {
    pub fn from_pool(pool: PgPool, config: &SyncConfig) -> Result<Self, ConfigError> {
        let (client_id, client_secret) = config.platform.oauth_client()?;
        let http = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .map_err(|e| ConfigError::HttpClient(e.to_string()))?;

        let credentials = Arc::new(PgCredentialStore::new(pool.clone(), &config.encryption_key));
        let cache: Arc<dyn CollectionCache> = Arc::new(PgCollectionCache::new(pool.clone()));
        let logs: Arc<dyn SyncLogStore> = Arc::new(PgSyncLogStore::new(pool.clone()));

        let refresher = Arc::new(GoogleTokenRefresher::new(
            http.clone(),
            config.platform.token_url.clone(),
            client_id,
            client_secret,
        ));
        let tokens = Arc::new(TokenManager::with_safety_margin(
            credentials,
            refresher,
            config.token_safety_margin,
        ));

        let orchestrator = SyncOrchestrator::new(
            SyncParts {
                source: Arc::new(PgSourceCatalog::new(pool)),
                cache: cache.clone(),
                logs: logs.clone(),
                platform: Arc::new(YouTubeClient::new(
                    http,
                    config.platform.api_base_url.clone(),
                )),
                tokens,
            },
            CollectionNaming::new(&config.product_name),
            config.privacy,
        );

        Ok(Self {
            orchestrator: Arc::new(orchestrator),
            cache,
            logs,
            account_id: config.account_id.clone(),
        })
    }
}
