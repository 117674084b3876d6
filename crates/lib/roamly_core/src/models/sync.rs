//! Sync run models: scopes, source items, results, and audit log rows.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::catalog::GroupingKey;

/// Maximum length of `sync_logs.error_summary`.
pub const ERROR_SUMMARY_MAX_CHARS: usize = 2000;

/// Which slice of the catalog a run covers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum SyncScope {
    All,
    Country { country_code: String },
    Category { key: GroupingKey },
}

impl SyncScope {
    pub fn country(country_code: &str) -> Self {
        SyncScope::Country {
            country_code: country_code.trim().to_ascii_uppercase(),
        }
    }

    pub fn category(country_code: &str, category: &str) -> Self {
        SyncScope::Category {
            key: GroupingKey::new(country_code, category),
        }
    }

    pub fn kind(&self) -> SyncScopeKind {
        match self {
            SyncScope::All => SyncScopeKind::All,
            SyncScope::Country { .. } => SyncScopeKind::Country,
            SyncScope::Category { .. } => SyncScopeKind::Category,
        }
    }

    /// `scope_key` column value: `None`, `FRA`, or `FRA/music`.
    pub fn key(&self) -> Option<String> {
        match self {
            SyncScope::All => None,
            SyncScope::Country { country_code } => Some(country_code.clone()),
            SyncScope::Category { key } => Some(key.to_string()),
        }
    }

    /// Datastore filter selecting the items inside this scope.
    pub fn filter(&self) -> SourceFilter {
        match self {
            SyncScope::All => SourceFilter::default(),
            SyncScope::Country { country_code } => SourceFilter {
                country_code: Some(country_code.clone()),
                category: None,
            },
            SyncScope::Category { key } => SourceFilter {
                country_code: Some(key.country_code.clone()),
                category: Some(key.category.clone()),
            },
        }
    }
}

impl fmt::Display for SyncScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.key() {
            Some(key) => write!(f, "{} {key}", self.kind().as_str()),
            None => f.write_str(self.kind().as_str()),
        }
    }
}

/// Scope discriminant, matches the `sync_scope` Postgres enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "sync_scope", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum SyncScopeKind {
    All,
    Country,
    Category,
}

impl SyncScopeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncScopeKind::All => "all",
            SyncScopeKind::Country => "country",
            SyncScopeKind::Category => "category",
        }
    }
}

/// Outcome of a run, matches the `sync_status` Postgres enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "sync_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum SyncStatus {
    Success,
    Partial,
    Failed,
}

impl SyncStatus {
    /// `success` with no failures, `failed` when nothing succeeded,
    /// `partial` otherwise.
    pub fn from_outcome(groups_succeeded: u32, failures: usize) -> Self {
        if failures == 0 {
            SyncStatus::Success
        } else if groups_succeeded == 0 {
            SyncStatus::Failed
        } else {
            SyncStatus::Partial
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SyncStatus::Success => "success",
            SyncStatus::Partial => "partial",
            SyncStatus::Failed => "failed",
        }
    }
}

/// An approved, sync-enabled video from the content datastore.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceItem {
    pub key: GroupingKey,
    /// Video id on the external platform.
    pub external_item_id: String,
}

/// Optional country/category restriction for the eligibility query.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceFilter {
    pub country_code: Option<String>,
    pub category: Option<String>,
}

impl SourceFilter {
    pub fn matches(&self, key: &GroupingKey) -> bool {
        self.country_code
            .as_ref()
            .is_none_or(|c| *c == key.country_code)
            && self.category.as_ref().is_none_or(|c| *c == key.category)
    }
}

/// Classification of a recorded failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Daily quota or creation cap reached.
    Quota,
    RateLimited,
    /// Any other remote error.
    Remote,
    /// Credential refresh rejected or platform returned 401.
    Auth,
    /// Cache write failed.
    Store,
    Cancelled,
}

/// One failed group (or the cancelled remainder of a run).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupFailure {
    pub key: Option<GroupingKey>,
    pub kind: FailureKind,
    pub message: String,
}

impl fmt::Display for GroupFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.key {
            Some(key) => write!(f, "{key}: {}", self.message),
            None => f.write_str(&self.message),
        }
    }
}

/// Aggregated counts of one orchestrator invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncResult {
    pub scope: SyncScope,
    pub collections_created: u32,
    pub collections_updated: u32,
    pub items_added: u32,
    /// Items the platform rejected individually.
    pub items_skipped: u32,
    pub groups_processed: u32,
    /// Documented quota units charged by this run's platform calls.
    pub quota_units_used: u32,
    pub errors: Vec<GroupFailure>,
    pub status: SyncStatus,
}

impl SyncResult {
    pub fn empty(scope: SyncScope) -> Self {
        Self {
            scope,
            collections_created: 0,
            collections_updated: 0,
            items_added: 0,
            items_skipped: 0,
            groups_processed: 0,
            quota_units_used: 0,
            errors: Vec::new(),
            status: SyncStatus::Success,
        }
    }

    /// Failures joined with `; `, capped at [`ERROR_SUMMARY_MAX_CHARS`].
    pub fn error_summary(&self) -> Option<String> {
        if self.errors.is_empty() {
            return None;
        }
        let joined = self
            .errors
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("; ");
        Some(truncate_chars(&joined, ERROR_SUMMARY_MAX_CHARS))
    }
}

fn truncate_chars(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((idx, _)) => s[..idx].to_string(),
        None => s.to_string(),
    }
}

/// Append-only audit row in `sync_logs`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct SyncLogEntry {
    pub id: Uuid,
    pub scope: SyncScopeKind,
    pub scope_key: Option<String>,
    pub items_added: i32,
    pub collections_created: i32,
    pub collections_updated: i32,
    pub status: SyncStatus,
    pub error_summary: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl SyncLogEntry {
    /// Summarize a finished run.
    pub fn from_result(id: Uuid, result: &SyncResult, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            scope: result.scope.kind(),
            scope_key: result.scope.key(),
            items_added: clamp_i32(result.items_added),
            collections_created: clamp_i32(result.collections_created),
            collections_updated: clamp_i32(result.collections_updated),
            status: result.status,
            error_summary: result.error_summary(),
            created_at,
        }
    }
}

fn clamp_i32(n: u32) -> i32 {
    i32::try_from(n).unwrap_or(i32::MAX)
}
