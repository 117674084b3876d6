//! Top-level sync runs: load eligible items, group by key, resolve and
//! reconcile each group in turn, then write one audit entry.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::audit::SyncLogStore;
use super::source::SourceCatalog;
use super::{Result, SyncError};
use crate::catalog::CatalogError;
use crate::catalog::cache::CollectionCache;
use crate::catalog::locks::KeyedLocks;
use crate::catalog::naming::CollectionNaming;
use crate::catalog::platform::{AuthorizedPlatform, VideoPlatform};
use crate::catalog::reconciler::{MembershipReconciler, is_collection_gone};
use crate::catalog::resolver::{CollectionResolver, ResolutionOrigin};
use crate::credentials::manager::TokenManager;
use crate::models::{
    FailureKind, GroupFailure, GroupingKey, Privacy, SourceItem, SyncLogEntry, SyncResult,
    SyncScope, SyncStatus,
};

/// Collaborators injected into [`SyncOrchestrator`].
pub struct SyncParts {
    pub source: Arc<dyn SourceCatalog>,
    pub cache: Arc<dyn CollectionCache>,
    pub logs: Arc<dyn SyncLogStore>,
    pub platform: Arc<dyn VideoPlatform>,
    pub tokens: Arc<TokenManager>,
}

pub struct SyncOrchestrator {
    source: Arc<dyn SourceCatalog>,
    cache: Arc<dyn CollectionCache>,
    logs: Arc<dyn SyncLogStore>,
    platform: Arc<dyn VideoPlatform>,
    tokens: Arc<TokenManager>,
    resolver: CollectionResolver,
    reconciler: MembershipReconciler,
}

/// What happened to one group, including partial progress before an error.
#[derive(Default)]
struct GroupReport {
    origin: Option<ResolutionOrigin>,
    added: u32,
    skipped: u32,
    interrupted: bool,
    error: Option<CatalogError>,
}

impl SyncOrchestrator {
    pub fn new(parts: SyncParts, naming: CollectionNaming, privacy: Privacy) -> Self {
        let resolver = CollectionResolver::new(
            parts.cache.clone(),
            Arc::new(KeyedLocks::new()),
            naming,
            privacy,
        );
        Self {
            source: parts.source,
            cache: parts.cache,
            logs: parts.logs,
            platform: parts.platform,
            tokens: parts.tokens,
            resolver,
            reconciler: MembershipReconciler::new(),
        }
    }

    pub async fn sync_all(
        &self,
        account_id: &str,
        cancel: &CancellationToken,
    ) -> Result<SyncResult> {
        self.run(account_id, SyncScope::All, cancel).await
    }

    pub async fn sync_country(
        &self,
        account_id: &str,
        country_code: &str,
        cancel: &CancellationToken,
    ) -> Result<SyncResult> {
        self.run(account_id, SyncScope::country(country_code), cancel)
            .await
    }

    pub async fn sync_category(
        &self,
        account_id: &str,
        country_code: &str,
        category: &str,
        cancel: &CancellationToken,
    ) -> Result<SyncResult> {
        self.run(
            account_id,
            SyncScope::category(country_code, category),
            cancel,
        )
        .await
    }

    /// Run one scope to completion. The audit entry is written on every
    /// path, including aborts.
    pub async fn run(
        &self,
        account_id: &str,
        scope: SyncScope,
        cancel: &CancellationToken,
    ) -> Result<SyncResult> {
        let started = Instant::now();
        info!(account_id, %scope, "sync run started");

        let platform =
            AuthorizedPlatform::new(self.platform.clone(), self.tokens.clone(), account_id);
        let mut result = SyncResult::empty(scope);
        let mut succeeded = 0u32;

        let outcome = self
            .drive(&platform, &mut result, &mut succeeded, cancel)
            .await;

        result.status = if outcome.is_ok() {
            SyncStatus::from_outcome(succeeded, result.errors.len())
        } else {
            SyncStatus::Failed
        };
        result.quota_units_used = platform.units_spent();

        self.record(&result).await;
        info!(
            status = result.status.as_str(),
            created = result.collections_created,
            updated = result.collections_updated,
            items_added = result.items_added,
            errors = result.errors.len(),
            quota_units = result.quota_units_used,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "sync run finished"
        );

        outcome.map(|()| result)
    }

    async fn drive(
        &self,
        platform: &AuthorizedPlatform,
        result: &mut SyncResult,
        succeeded: &mut u32,
        cancel: &CancellationToken,
    ) -> Result<()> {
        // No point querying the catalog if the account cannot authenticate.
        if let Err(e) = self
            .tokens
            .ensure_valid_credential(platform.account_id())
            .await
        {
            return Err(abort(result, None, e.into()));
        }

        let items = match self.source.eligible_items(&result.scope.filter()).await {
            Ok(items) => items,
            Err(e) => return Err(abort(result, None, e.into())),
        };
        let groups = group_items(items);
        let total = groups.len();
        debug!(groups = total, "eligible items grouped");

        for (index, (key, item_ids)) in groups.into_iter().enumerate() {
            if cancel.is_cancelled() {
                warn!(remaining = total - index, "sync run cancelled");
                result.errors.push(GroupFailure {
                    key: None,
                    kind: FailureKind::Cancelled,
                    message: format!("run cancelled, {} group(s) not processed", total - index),
                });
                break;
            }

            result.groups_processed += 1;
            let report = self.sync_group(platform, &key, &item_ids, cancel).await;

            match report.origin {
                Some(ResolutionOrigin::Created) => result.collections_created += 1,
                Some(_) if report.added > 0 => result.collections_updated += 1,
                _ => {}
            }
            result.items_added += report.added;
            result.items_skipped += report.skipped;

            if let Some(e) = report.error {
                if e.is_fatal() {
                    return Err(abort(result, Some(key), SyncError::Auth(e)));
                }
                warn!(%key, error = %e, "group failed");
                result.errors.push(GroupFailure {
                    key: Some(key),
                    kind: e.failure_kind(),
                    message: e.to_string(),
                });
                continue;
            }

            if report.interrupted {
                result.errors.push(GroupFailure {
                    key: Some(key),
                    kind: FailureKind::Cancelled,
                    message: format!("cancelled after {} addition(s)", report.added),
                });
                continue;
            }

            *succeeded += 1;
            if let Err(e) = self.cache.touch(&key, Utc::now()).await {
                warn!(%key, error = %e, "failed to record last sync time");
            }
        }
        Ok(())
    }

    async fn sync_group(
        &self,
        platform: &AuthorizedPlatform,
        key: &GroupingKey,
        item_ids: &[String],
        cancel: &CancellationToken,
    ) -> GroupReport {
        let mut report = GroupReport::default();
        // One retry covers a collection deleted after it was resolved.
        for attempt in 0..2 {
            let resolution = match self.resolver.resolve(platform, key).await {
                Ok(r) => r,
                Err(e) => {
                    report.error = Some(e);
                    return report;
                }
            };
            if report.origin.is_none() || resolution.origin == ResolutionOrigin::Created {
                report.origin = Some(resolution.origin);
            }

            match self
                .reconciler
                .reconcile(platform, resolution.collection_id(), item_ids, cancel)
                .await
            {
                Ok(outcome) => {
                    info!(
                        %key,
                        collection_id = resolution.collection_id(),
                        origin = ?resolution.origin,
                        added = outcome.added.len(),
                        already_present = outcome.already_present,
                        skipped = outcome.skipped.len(),
                        "group synced"
                    );
                    report.added += outcome.added.len() as u32;
                    report.skipped += outcome.skipped.len() as u32;
                    report.interrupted = outcome.interrupted;
                    return report;
                }
                Err(e) if attempt == 0 && is_collection_gone(&e) => {
                    warn!(%key, "collection vanished during reconciliation, resolving again");
                    if let Err(e) = self.cache.invalidate(key).await {
                        report.error = Some(e.into());
                        return report;
                    }
                }
                Err(e) => {
                    if let CatalogError::Reconcile { added, .. } = &e {
                        report.added += added;
                    }
                    report.error = Some(e);
                    return report;
                }
            }
        }
        report
    }

    async fn record(&self, result: &SyncResult) {
        let entry = SyncLogEntry::from_result(Uuid::now_v7(), result, Utc::now());
        if let Err(e) = self.logs.append(&entry).await {
            error!(error = %e, scope = %result.scope, "failed to write sync log entry");
        }
    }
}

/// Record the failure that ends a run and hand the error back.
fn abort(result: &mut SyncResult, key: Option<GroupingKey>, err: SyncError) -> SyncError {
    error!(key = ?key, error = %err, "sync run aborted");
    let message = match (&key, &err) {
        (Some(_), SyncError::Auth(inner)) => inner.to_string(),
        _ => err.to_string(),
    };
    result.errors.push(GroupFailure {
        key,
        kind: err.failure_kind(),
        message,
    });
    err
}

/// Group items by key in key order, keeping each group's item order.
fn group_items(items: Vec<SourceItem>) -> BTreeMap<GroupingKey, Vec<String>> {
    let mut groups: BTreeMap<GroupingKey, Vec<String>> = BTreeMap::new();
    for item in items {
        groups.entry(item.key).or_default().push(item.external_item_id);
    }
    groups
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use chrono::DateTime;

    use super::*;
    use crate::catalog::PlatformError;
    use crate::credentials::CredentialError;
    use crate::credentials::manager::DEFAULT_SAFETY_MARGIN;
    use crate::credentials::store::CredentialStore;
    use crate::memory::{
        MEMORY_ACCOUNT, MemoryCollectionCache, MemoryCredentialStore, MemoryPlatform,
        MemorySourceCatalog, MemorySyncLogStore, MemoryTokenRefresher, fresh_credential,
        linked_tokens,
    };
    use crate::models::{CollectionCacheEntry, OAuthCredential, SyncScopeKind};

    struct Harness {
        platform: Arc<MemoryPlatform>,
        cache: Arc<MemoryCollectionCache>,
        source: Arc<MemorySourceCatalog>,
        logs: Arc<MemorySyncLogStore>,
        tokens: Arc<TokenManager>,
    }

    impl Harness {
        fn new() -> Self {
            Self {
                platform: Arc::new(MemoryPlatform::new()),
                cache: Arc::new(MemoryCollectionCache::new()),
                source: Arc::new(MemorySourceCatalog::new()),
                logs: Arc::new(MemorySyncLogStore::new()),
                tokens: linked_tokens(),
            }
        }

        fn orchestrator(&self) -> SyncOrchestrator {
            SyncOrchestrator::new(
                SyncParts {
                    source: self.source.clone(),
                    cache: self.cache.clone(),
                    logs: self.logs.clone(),
                    platform: self.platform.clone(),
                    tokens: self.tokens.clone(),
                },
                CollectionNaming::new("Product"),
                Privacy::Public,
            )
        }
    }

    fn ids(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|s| s.to_string()).collect()
    }

    /// A linked account whose token leaves the safety window after `headroom`.
    fn expiring_tokens(
        headroom: chrono::Duration,
        refresher: Arc<MemoryTokenRefresher>,
    ) -> (Arc<MemoryCredentialStore>, Arc<TokenManager>) {
        let margin = chrono::Duration::from_std(DEFAULT_SAFETY_MARGIN).unwrap();
        let store = Arc::new(MemoryCredentialStore::with(OAuthCredential {
            expires_at: Utc::now() + margin + headroom,
            ..fresh_credential(MEMORY_ACCOUNT)
        }));
        let tokens = Arc::new(TokenManager::new(store.clone(), refresher));
        (store, tokens)
    }

    #[tokio::test]
    async fn cold_start_creates_collection_and_adds_items() {
        let h = Harness::new();
        h.source.push("FRA", "music", "v1");
        h.source.push("FRA", "music", "v2");

        let result = h
            .orchestrator()
            .sync_all(MEMORY_ACCOUNT, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(result.collections_created, 1);
        assert_eq!(result.collections_updated, 0);
        assert_eq!(result.items_added, 2);
        assert!(result.errors.is_empty());
        assert_eq!(result.status, SyncStatus::Success);
        assert_eq!(h.platform.create_calls(), 1);

        let cached = h.cache.entries();
        assert_eq!(cached.len(), 1);
        assert_eq!(cached[0].display_name, "France Music 🇫🇷 | Product");
        assert_eq!(
            h.platform.items(&cached[0].remote_collection_id),
            ids(&["v1", "v2"])
        );
    }

    #[tokio::test]
    async fn warm_cache_adds_only_missing_item() {
        let h = Harness::new();
        let key = GroupingKey::new("FRA", "music");
        let naming = CollectionNaming::new("Product");
        let collection = h
            .platform
            .seed_collection(&naming.title(&key), &naming.description(&key));
        h.platform.seed_item(&collection, "v1");
        h.cache.insert(CollectionCacheEntry {
            key: key.clone(),
            remote_collection_id: collection.clone(),
            display_name: naming.title(&key),
            public_url: String::new(),
            last_synced_at: Utc::now() - chrono::Duration::days(1),
        });
        h.source.push("FRA", "music", "v1");
        h.source.push("FRA", "music", "v2");

        let result = h
            .orchestrator()
            .sync_category(MEMORY_ACCOUNT, "FRA", "music", &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(h.platform.create_calls(), 0);
        assert_eq!(result.collections_created, 0);
        assert_eq!(result.collections_updated, 1);
        assert_eq!(result.items_added, 1);
        assert_eq!(h.platform.items(&collection), ids(&["v1", "v2"]));

        let touched = h.cache.entries().remove(0);
        assert!(touched.last_synced_at > Utc::now() - chrono::Duration::minutes(1));
    }

    #[tokio::test]
    async fn second_run_is_a_no_op() {
        let h = Harness::new();
        h.source.push("FRA", "music", "v1");
        h.source.push("JPN", "food", "v2");
        let orchestrator = h.orchestrator();

        orchestrator
            .sync_all(MEMORY_ACCOUNT, &CancellationToken::new())
            .await
            .unwrap();
        let again = orchestrator
            .sync_all(MEMORY_ACCOUNT, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(again.collections_created, 0);
        assert_eq!(again.collections_updated, 0);
        assert_eq!(again.items_added, 0);
        assert_eq!(again.groups_processed, 2);
        assert_eq!(again.status, SyncStatus::Success);
        assert_eq!(h.platform.create_calls(), 2);
    }

    #[tokio::test]
    async fn failing_group_does_not_stop_others() {
        let h = Harness::new();
        h.source.push("FRA", "music", "v1");
        h.source.push("JPN", "food", "bad");
        h.source.push("USA", "nature", "v3");
        h.platform.fail_item(
            "bad",
            PlatformError::QuotaExceeded {
                reason: "quotaExceeded".into(),
            },
        );

        let result = h
            .orchestrator()
            .sync_all(MEMORY_ACCOUNT, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(result.status, SyncStatus::Partial);
        assert_eq!(result.groups_processed, 3);
        assert_eq!(result.items_added, 2);
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].key, Some(GroupingKey::new("JPN", "food")));
        assert_eq!(result.errors[0].kind, FailureKind::Quota);

        let log = h.logs.entries();
        assert_eq!(log.len(), 1);
        assert_eq!(log[0].status, SyncStatus::Partial);
        assert!(log[0].error_summary.as_deref().unwrap().starts_with("JPN/food: "));
    }

    #[tokio::test]
    async fn every_group_failing_is_failed() {
        let h = Harness::new();
        h.source.push("FRA", "music", "v1");
        h.source.push("JPN", "food", "v2");
        h.platform.fail_creates(PlatformError::Http {
            status: 500,
            message: "backend".into(),
        });

        let result = h
            .orchestrator()
            .sync_all(MEMORY_ACCOUNT, &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(result.status, SyncStatus::Failed);
        assert_eq!(result.errors.len(), 2);
        assert!(result.errors.iter().all(|e| e.kind == FailureKind::Remote));
    }

    #[tokio::test]
    async fn skipped_items_do_not_fail_the_group() {
        let h = Harness::new();
        h.source.push("FRA", "music", "v1");
        h.source.push("FRA", "music", "gone");
        h.platform
            .fail_item("gone", PlatformError::NotFound("videoNotFound".into()));

        let result = h
            .orchestrator()
            .sync_all(MEMORY_ACCOUNT, &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(result.status, SyncStatus::Success);
        assert_eq!(result.items_added, 1);
        assert_eq!(result.items_skipped, 1);
    }

    #[tokio::test]
    async fn platform_unauthorized_aborts_and_still_logs() {
        let h = Harness::new();
        h.source.push("FRA", "music", "v1");
        h.source.push("JPN", "food", "v2");
        h.platform
            .fail_all(PlatformError::Unauthorized("Invalid Credentials".into()));

        let err = h
            .orchestrator()
            .sync_all(MEMORY_ACCOUNT, &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, SyncError::Auth(_)));

        let log = h.logs.entries();
        assert_eq!(log.len(), 1);
        assert_eq!(log[0].status, SyncStatus::Failed);
        assert_eq!(log[0].scope, SyncScopeKind::All);
        // Aborted at the first group.
        assert!(!log[0].error_summary.as_deref().unwrap().contains("JPN/food"));
    }

    #[tokio::test]
    async fn unlinked_account_aborts_before_reading_the_catalog() {
        let mut h = Harness::new();
        h.tokens = Arc::new(TokenManager::new(
            Arc::new(MemoryCredentialStore::new()),
            MemoryTokenRefresher::new(),
        ));
        h.source.push("FRA", "music", "v1");

        let err = h
            .orchestrator()
            .sync_all(MEMORY_ACCOUNT, &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, SyncError::Auth(CatalogError::Credential(_))));
        assert_eq!(h.source.queries(), 0);
        assert_eq!(h.logs.entries().len(), 1);
    }

    #[tokio::test]
    async fn empty_scope_is_success() {
        let h = Harness::new();
        h.source.push("FRA", "music", "v1");

        let result = h
            .orchestrator()
            .sync_country(MEMORY_ACCOUNT, "bra", &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(result.groups_processed, 0);
        assert_eq!(result.status, SyncStatus::Success);
        assert_eq!(h.platform.create_calls(), 0);

        let log = h.logs.entries();
        assert_eq!(log[0].scope, SyncScopeKind::Country);
        assert_eq!(log[0].scope_key.as_deref(), Some("BRA"));
    }

    #[tokio::test]
    async fn country_scope_only_touches_that_country() {
        let h = Harness::new();
        h.source.push("FRA", "music", "v1");
        h.source.push("FRA", "street food", "v2");
        h.source.push("JPN", "food", "v3");

        let result = h
            .orchestrator()
            .sync_country(MEMORY_ACCOUNT, "FRA", &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(result.groups_processed, 2);
        assert_eq!(result.collections_created, 2);
        assert!(
            h.cache
                .entries()
                .iter()
                .all(|e| e.key.country_code == "FRA")
        );
    }

    #[tokio::test]
    async fn cancelled_run_reports_remaining_groups() {
        let h = Harness::new();
        h.source.push("FRA", "music", "v1");
        h.source.push("JPN", "food", "v2");
        let cancel = CancellationToken::new();
        cancel.cancel();

        let result = h
            .orchestrator()
            .sync_all(MEMORY_ACCOUNT, &cancel)
            .await
            .unwrap();
        assert_eq!(result.groups_processed, 0);
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].kind, FailureKind::Cancelled);
        assert_eq!(h.platform.create_calls(), 0);
        assert_eq!(h.logs.entries().len(), 1);
    }

    #[tokio::test]
    async fn audit_write_failure_keeps_result() {
        let mut h = Harness::new();
        h.logs = Arc::new(MemorySyncLogStore::failing());
        h.source.push("FRA", "music", "v1");

        let result = h
            .orchestrator()
            .sync_all(MEMORY_ACCOUNT, &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(result.status, SyncStatus::Success);
        assert_eq!(result.items_added, 1);
    }

    #[tokio::test]
    async fn quota_units_are_counted() {
        let h = Harness::new();
        h.source.push("FRA", "music", "v1");

        let result = h
            .orchestrator()
            .sync_all(MEMORY_ACCOUNT, &CancellationToken::new())
            .await
            .unwrap();
        // search page + create + membership page + one addition
        assert_eq!(result.quota_units_used, 1 + 50 + 1 + 50);
    }

    #[tokio::test]
    async fn token_expiring_mid_run_is_refreshed_before_next_call() {
        let mut h = Harness::new();
        let refresher = MemoryTokenRefresher::new();
        let (store, tokens) = expiring_tokens(chrono::Duration::seconds(1), refresher.clone());
        h.tokens = tokens;
        // The first group outlives the token.
        h.platform.slow_adds(Duration::from_millis(1200));
        h.source.push("FRA", "music", "v1");
        h.source.push("JPN", "food", "v2");

        let result = h
            .orchestrator()
            .sync_all(MEMORY_ACCOUNT, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(result.status, SyncStatus::Success);
        assert_eq!(result.items_added, 2);
        assert_eq!(refresher.calls(), 1);
        let stored = store.get(MEMORY_ACCOUNT).await.unwrap().unwrap();
        assert_eq!(stored.access_token, "memory-access-1");
        assert_eq!(stored.refresh_token, "memory-refresh");
    }

    #[tokio::test]
    async fn rejected_refresh_mid_run_aborts_and_logs_failed() {
        let mut h = Harness::new();
        let refresher = MemoryTokenRefresher::rejecting();
        let (_, tokens) = expiring_tokens(chrono::Duration::seconds(1), refresher.clone());
        h.tokens = tokens;
        h.platform.slow_adds(Duration::from_millis(1200));
        h.source.push("FRA", "music", "v1");
        h.source.push("JPN", "food", "v2");

        let err = h
            .orchestrator()
            .sync_all(MEMORY_ACCOUNT, &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            SyncError::Auth(CatalogError::Credential(
                CredentialError::RefreshFailed { .. }
            ))
        ));
        // Not retried.
        assert_eq!(refresher.calls(), 1);

        let log = h.logs.entries();
        assert_eq!(log.len(), 1);
        assert_eq!(log[0].status, SyncStatus::Failed);
        assert_eq!(log[0].collections_created, 1);
        assert_eq!(log[0].items_added, 1);
        assert!(log[0].error_summary.as_deref().unwrap().contains("JPN/food"));
        assert_eq!(h.platform.create_calls(), 1);
    }

    #[tokio::test]
    async fn relinked_account_recovers_after_refused_token() {
        let mut h = Harness::new();
        let store = Arc::new(MemoryCredentialStore::with(fresh_credential(MEMORY_ACCOUNT)));
        let refresher = MemoryTokenRefresher::new();
        h.tokens = Arc::new(TokenManager::new(store.clone(), refresher.clone()));
        h.platform.revoke_token("memory-access");
        h.source.push("FRA", "music", "v1");
        let orchestrator = h.orchestrator();

        let err = orchestrator
            .sync_all(MEMORY_ACCOUNT, &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, SyncError::Auth(_)));

        // Re-link the way `credentials import` does: refresh on first use.
        store
            .upsert(&OAuthCredential {
                access_token: String::new(),
                refresh_token: "relinked".into(),
                expires_at: DateTime::<Utc>::UNIX_EPOCH,
                ..fresh_credential(MEMORY_ACCOUNT)
            })
            .await
            .unwrap();

        let result = orchestrator
            .sync_all(MEMORY_ACCOUNT, &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(result.status, SyncStatus::Success);
        assert_eq!(result.items_added, 1);
        assert_eq!(refresher.calls(), 1);
        assert_eq!(h.logs.entries().len(), 2);
    }

    #[tokio::test]
    async fn collection_deleted_during_additions_is_recreated() {
        let h = Harness::new();
        h.source.push("FRA", "music", "v1");
        h.source.push("FRA", "music", "v2");
        h.platform.delete_collection_when_adding("v2");

        let result = h
            .orchestrator()
            .sync_all(MEMORY_ACCOUNT, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(result.status, SyncStatus::Success);
        assert_eq!(result.collections_created, 1);
        assert_eq!(result.items_skipped, 0);
        assert_eq!(h.platform.create_calls(), 2);

        let cached = h.cache.entries();
        assert_eq!(cached.len(), 1);
        assert_eq!(
            h.platform.items(&cached[0].remote_collection_id),
            ids(&["v1", "v2"])
        );
    }
}
