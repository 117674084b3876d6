//! Catalog models: grouping keys, cached collections, and platform payloads.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The (country, category) pair that determines one remote collection.
///
/// Construct through [`GroupingKey::new`] so that `FRA/music`, `fra/Music`
/// and ` FRA / music ` all compare equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupingKey {
    pub country_code: String,
    pub category: String,
}

impl GroupingKey {
    pub fn new(country_code: &str, category: &str) -> Self {
        Self {
            country_code: country_code.trim().to_ascii_uppercase(),
            category: normalize_category(category),
        }
    }

    /// Ownership marker embedded in collection descriptions.
    pub fn marker(&self, product_slug: &str) -> String {
        format!("{product_slug}:{}:{}", self.country_code, self.category)
    }
}

impl fmt::Display for GroupingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.country_code, self.category)
    }
}

/// Lower-case slug: trimmed, inner whitespace collapsed to `-`.
pub fn normalize_category(category: &str) -> String {
    category
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("-")
        .to_lowercase()
}

/// One row of `collection_cache`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionCacheEntry {
    pub key: GroupingKey,
    pub remote_collection_id: String,
    pub display_name: String,
    pub public_url: String,
    pub last_synced_at: DateTime<Utc>,
}

/// Visibility of a created collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Privacy {
    Public,
    Unlisted,
    Private,
}

impl Privacy {
    /// Platform wire value (`status.privacyStatus`).
    pub fn as_str(&self) -> &'static str {
        match self {
            Privacy::Public => "public",
            Privacy::Unlisted => "unlisted",
            Privacy::Private => "private",
        }
    }
}

impl std::str::FromStr for Privacy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "public" => Ok(Privacy::Public),
            "unlisted" => Ok(Privacy::Unlisted),
            "private" => Ok(Privacy::Private),
            other => Err(format!("unknown privacy status: {other}")),
        }
    }
}

/// A collection as reported by the platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteCollection {
    pub id: String,
    pub title: String,
    pub description: String,
    pub item_count: Option<u32>,
}

/// Parameters for creating a collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCollection {
    pub title: String,
    pub description: String,
    pub privacy: Privacy,
}

/// One bounded page of a platform listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub next_page_token: Option<String>,
}

impl<T> Page<T> {
    pub fn last(items: Vec<T>) -> Self {
        Self {
            items,
            next_page_token: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grouping_key_normalizes_case_and_whitespace() {
        let a = GroupingKey::new(" fra ", "Street  Food");
        let b = GroupingKey::new("FRA", "street-food");
        assert_eq!(a, b);
        assert_eq!(a.to_string(), "FRA/street-food");
    }

    #[test]
    fn marker_includes_both_parts() {
        let key = GroupingKey::new("jpn", "music");
        assert_eq!(key.marker("roamly"), "roamly:JPN:music");
    }

    #[test]
    fn privacy_parses_case_insensitively() {
        assert_eq!("Unlisted".parse::<Privacy>(), Ok(Privacy::Unlisted));
        assert!("secret".parse::<Privacy>().is_err());
    }
}
