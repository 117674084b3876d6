//! Access-token lifecycle: serve a valid token, refresh and persist on expiry.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

use super::CredentialError;
use super::oauth::{RefreshError, TokenRefresher};
use super::store::CredentialStore;
use crate::models::AccessCredential;

/// Tokens closer than this to expiry are refreshed before use.
pub const DEFAULT_SAFETY_MARGIN: Duration = Duration::from_secs(60);

/// Guarantees a non-expired access credential before each remote call.
///
/// The last good credential per account is memoized so a long run does not
/// hit the store on every call. Refreshes are serialized: callers racing on
/// an expired token wait for the first exchange and reuse its result.
pub struct TokenManager {
    store: Arc<dyn CredentialStore>,
    refresher: Arc<dyn TokenRefresher>,
    safety_margin: chrono::Duration,
    memo: RwLock<HashMap<String, AccessCredential>>,
    refresh_lock: Mutex<()>,
}

impl TokenManager {
    pub fn new(store: Arc<dyn CredentialStore>, refresher: Arc<dyn TokenRefresher>) -> Self {
        Self::with_safety_margin(store, refresher, DEFAULT_SAFETY_MARGIN)
    }

    pub fn with_safety_margin(
        store: Arc<dyn CredentialStore>,
        refresher: Arc<dyn TokenRefresher>,
        safety_margin: Duration,
    ) -> Self {
        Self {
            store,
            refresher,
            safety_margin: chrono::Duration::from_std(safety_margin)
                .unwrap_or_else(|_| chrono::Duration::seconds(60)),
            memo: RwLock::new(HashMap::new()),
            refresh_lock: Mutex::new(()),
        }
    }

    /// Return an access token valid for at least the safety margin.
    ///
    /// Fails with [`CredentialError::NotLinked`] when the account has no
    /// stored credential and [`CredentialError::RefreshFailed`] when the
    /// authorization server rejects the refresh token. Refresh is never
    /// retried here.
    pub async fn ensure_valid_credential(
        &self,
        account_id: &str,
    ) -> Result<AccessCredential, CredentialError> {
        if let Some(cred) = self.memoized(account_id).await {
            return Ok(cred);
        }

        let _guard = self.refresh_lock.lock().await;

        // Another caller may have refreshed while we waited.
        if let Some(cred) = self.memoized(account_id).await {
            return Ok(cred);
        }

        let stored = self
            .store
            .get(account_id)
            .await?
            .ok_or_else(|| CredentialError::NotLinked(account_id.to_string()))?;

        if stored.is_fresh_at(Utc::now(), self.safety_margin) {
            debug!(account_id, expires_at = %stored.expires_at, "stored access token still valid");
            let cred = stored.to_access();
            self.remember(cred.clone()).await;
            return Ok(cred);
        }

        info!(account_id, expired_at = %stored.expires_at, "refreshing access token");
        let refreshed = self
            .refresher
            .refresh(&stored.refresh_token)
            .await
            .map_err(|e| {
                warn!(account_id, error = %e, "token refresh failed");
                match e {
                    RefreshError::Rejected(reason) => CredentialError::RefreshFailed {
                        account: account_id.to_string(),
                        reason,
                    },
                    RefreshError::Unavailable(reason) => CredentialError::RefreshUnavailable {
                        account: account_id.to_string(),
                        reason,
                    },
                }
            })?;

        let expires_at = Utc::now() + chrono::Duration::seconds(refreshed.expires_in);
        self.store
            .update_access_token(account_id, &refreshed.access_token, expires_at)
            .await?;

        let cred = AccessCredential {
            account_id: account_id.to_string(),
            access_token: refreshed.access_token,
            expires_at,
        };
        self.remember(cred.clone()).await;
        info!(account_id, expires_at = %expires_at, "access token refreshed");
        Ok(cred)
    }

    /// Drop the memoized credential so the next call re-reads the store.
    pub async fn forget(&self, account_id: &str) {
        self.memo.write().await.remove(account_id);
    }

    async fn memoized(&self, account_id: &str) -> Option<AccessCredential> {
        let memo = self.memo.read().await;
        memo.get(account_id)
            .filter(|c| Utc::now() < c.expires_at - self.safety_margin)
            .cloned()
    }

    async fn remember(&self, cred: AccessCredential) {
        self.memo.write().await.insert(cred.account_id.clone(), cred);
    }
}
