//! Deterministic collection titles and descriptions.
//!
//! The same grouping key always yields the same title; the resolver relies
//! on this to find collections again after the cache has lost them.

use super::countries::COUNTRIES;
use crate::models::GroupingKey;

/// Builds externally visible names for a product.
#[derive(Debug, Clone)]
pub struct CollectionNaming {
    product_name: String,
    product_slug: String,
}

impl CollectionNaming {
    pub fn new(product_name: &str) -> Self {
        let product_name = product_name.trim().to_string();
        let product_slug = product_name
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect::<String>()
            .to_ascii_lowercase();
        Self {
            product_name,
            product_slug,
        }
    }

    pub fn product_name(&self) -> &str {
        &self.product_name
    }

    /// `"<Country> <Category> <Flag> | <Product>"`, e.g. `France Music 🇫🇷 | Roamly`.
    pub fn title(&self, key: &GroupingKey) -> String {
        let country = country_name(&key.country_code);
        let category = category_name(&key.category);
        match flag(&key.country_code) {
            Some(flag) => format!("{country} {category} {flag} | {}", self.product_name),
            None => format!("{country} {category} | {}", self.product_name),
        }
    }

    /// One-line description ending with the ownership marker.
    pub fn description(&self, key: &GroupingKey) -> String {
        format!(
            "{} videos from {}, shared by the {} community. [{}]",
            category_name(&key.category),
            country_name(&key.country_code),
            self.product_name,
            self.marker(key),
        )
    }

    pub fn marker(&self, key: &GroupingKey) -> String {
        key.marker(&self.product_slug)
    }

    /// Whether a remote description carries this key's ownership marker.
    pub fn is_owned(&self, key: &GroupingKey, description: &str) -> bool {
        description.contains(&format!("[{}]", self.marker(key)))
    }
}

fn lookup(code: &str) -> Option<&'static (&'static str, &'static str, &'static str)> {
    let code = code.trim().to_ascii_uppercase();
    match code.len() {
        3 => COUNTRIES.iter().find(|(a3, _, _)| *a3 == code),
        2 => COUNTRIES.iter().find(|(_, a2, _)| *a2 == code),
        _ => None,
    }
}

/// Display name for an ISO alpha-3 or alpha-2 code; unknown codes echo back.
pub fn country_name(code: &str) -> String {
    lookup(code)
        .map(|(_, _, name)| (*name).to_string())
        .unwrap_or_else(|| code.trim().to_ascii_uppercase())
}

/// Regional-indicator flag glyph, `None` for unknown codes.
pub fn flag(code: &str) -> Option<String> {
    let (_, alpha2, _) = lookup(code)?;
    alpha2
        .chars()
        .map(|c| char::from_u32(0x1F1E6 + (c as u32 - 'A' as u32)))
        .collect()
}

/// `street-food` → `Street Food`.
pub fn category_name(slug: &str) -> String {
    slug.split(['-', '_', ' '])
        .filter(|w| !w.is_empty())
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
