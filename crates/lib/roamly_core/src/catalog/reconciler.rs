//! Additive membership sync for one remote collection.

use std::collections::HashSet;

use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::platform::{AuthorizedPlatform, CallError, MAX_LISTING_PAGES};
use super::{CatalogError, PlatformError};

/// An item the platform refused; the rest of the batch still ran.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemSkip {
    pub item_id: String,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileOutcome {
    /// Items added this call, in request order.
    pub added: Vec<String>,
    pub skipped: Vec<ItemSkip>,
    /// Desired items that were already members.
    pub already_present: usize,
    /// Stopped early because the run was cancelled.
    pub interrupted: bool,
}

/// Adds desired items that are not yet members. Never removes or reorders.
#[derive(Debug, Clone, Copy, Default)]
pub struct MembershipReconciler;

impl MembershipReconciler {
    pub fn new() -> Self {
        Self
    }

    /// Full current membership, across every page.
    pub async fn current_members(
        &self,
        platform: &AuthorizedPlatform,
        collection_id: &str,
    ) -> Result<HashSet<String>, CatalogError> {
        let mut members = HashSet::new();
        let mut page_token: Option<String> = None;

        for _ in 0..MAX_LISTING_PAGES {
            let page = platform
                .list_items(collection_id, page_token.as_deref())
                .await
                .map_err(|e| match e {
                    CallError::Credential(e) => CatalogError::Credential(e),
                    CallError::Platform(source) => CatalogError::Membership {
                        collection_id: collection_id.to_string(),
                        source,
                    },
                })?;
            members.extend(page.items);

            match page.next_page_token {
                Some(next) => page_token = Some(next),
                None => break,
            }
        }
        Ok(members)
    }

    /// Bring `collection_id` up to a superset of `desired`.
    ///
    /// Item-scoped refusals are recorded in [`ReconcileOutcome::skipped`].
    /// Any other failure stops the batch and reports how many were added.
    pub async fn reconcile(
        &self,
        platform: &AuthorizedPlatform,
        collection_id: &str,
        desired: &[String],
        cancel: &CancellationToken,
    ) -> Result<ReconcileOutcome, CatalogError> {
        let current = self.current_members(platform, collection_id).await?;
        let missing = missing_items(desired, &current);

        let mut outcome = ReconcileOutcome {
            already_present: desired.len() - missing.len() - duplicates(desired),
            ..Default::default()
        };
        debug!(
            collection_id,
            desired = desired.len(),
            missing = missing.len(),
            "reconciling membership"
        );

        for item_id in missing {
            if cancel.is_cancelled() {
                outcome.interrupted = true;
                break;
            }
            match platform.add_item(collection_id, &item_id).await {
                Ok(()) => outcome.added.push(item_id),
                Err(CallError::Platform(e)) if e.is_item_scoped() => {
                    warn!(collection_id, item_id = %item_id, error = %e, "item skipped");
                    outcome.skipped.push(ItemSkip {
                        item_id,
                        reason: e.to_string(),
                    });
                }
                Err(CallError::Credential(e)) => return Err(CatalogError::Credential(e)),
                Err(CallError::Platform(source)) => {
                    return Err(CatalogError::Reconcile {
                        collection_id: collection_id.to_string(),
                        added: outcome.added.len() as u32,
                        source,
                    });
                }
            }
        }
        Ok(outcome)
    }
}

/// `desired \ current`, preserving first-seen order and dropping repeats.
pub fn missing_items(desired: &[String], current: &HashSet<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    desired
        .iter()
        .filter(|id| !current.contains(*id) && seen.insert(id.as_str()))
        .cloned()
        .collect()
}

fn duplicates(ids: &[String]) -> usize {
    let unique: HashSet<&str> = ids.iter().map(String::as_str).collect();
    ids.len() - unique.len()
}

/// True when the error means the collection itself is gone, whether it was
/// noticed while listing members or while adding to it.
pub fn is_collection_gone(err: &CatalogError) -> bool {
    match err {
        CatalogError::Membership {
            source: PlatformError::NotFound(_),
            ..
        } => true,
        CatalogError::Reconcile { source, .. } => source.is_collection_missing(),
        _ => false,
    }
}
