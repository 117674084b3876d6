//! Runtime configuration read from the environment.

use std::time::Duration;

use thiserror::Error;

use crate::catalog::youtube::YOUTUBE_API_BASE_URL;
use crate::credentials::manager::DEFAULT_SAFETY_MARGIN;
use crate::credentials::oauth::GOOGLE_TOKEN_URL;
use crate::models::Privacy;

const DEFAULT_DATABASE_URL: &str = "postgres://localhost:5432/roamly";
const DEFAULT_ENCRYPTION_KEY: &str = "roamly-default-dev-key-change-in-production";
const DEFAULT_ACCOUNT_ID: &str = "primary";
const DEFAULT_PRODUCT_NAME: &str = "Roamly";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{var} has an invalid value {value:?}: {reason}")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },

    #[error("HTTP client could not be built: {0}")]
    HttpClient(String),
}

/// OAuth client and API endpoints for the video platform.
#[derive(Clone, Debug)]
pub struct PlatformConfig {
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub token_url: String,
    pub api_base_url: String,
}

impl PlatformConfig {
    /// Client id and secret, both required for token refresh.
    pub fn oauth_client(&self) -> Result<(&str, &str), ConfigError> {
        let id = self
            .client_id
            .as_deref()
            .ok_or(ConfigError::Missing("YOUTUBE_CLIENT_ID"))?;
        let secret = self
            .client_secret
            .as_deref()
            .ok_or(ConfigError::Missing("YOUTUBE_CLIENT_SECRET"))?;
        Ok((id, secret))
    }
}

/// Settings shared by the CLI and the API server.
#[derive(Clone)]
pub struct SyncConfig {
    pub database_url: String,
    /// Passphrase for sealing stored tokens.
    pub encryption_key: String,
    /// Linked platform account that owns the collections.
    pub account_id: String,
    pub product_name: String,
    pub privacy: Privacy,
    pub token_safety_margin: Duration,
    pub platform: PlatformConfig,
}

impl std::fmt::Debug for SyncConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncConfig")
            .field("database_url", &self.database_url)
            .field("encryption_key", &"<redacted>")
            .field("account_id", &self.account_id)
            .field("product_name", &self.product_name)
            .field("privacy", &self.privacy)
            .field("token_safety_margin", &self.token_safety_margin)
            .field("platform", &self.platform)
            .finish()
    }
}

impl SyncConfig {
    /// Reads configuration from environment variables.
    ///
    /// | Variable                          | Default                           |
    /// |-----------------------------------|-----------------------------------|
    /// | `DATABASE_URL`                    | `postgres://localhost:5432/roamly` |
    /// | `ROAMLY_ENCRYPTION_KEY`           | development key (warns)           |
    /// | `ROAMLY_ACCOUNT_ID`               | `primary`                         |
    /// | `ROAMLY_PRODUCT_NAME`             | `Roamly`                          |
    /// | `ROAMLY_PLAYLIST_PRIVACY`         | `public`                          |
    /// | `ROAMLY_TOKEN_SAFETY_MARGIN_SECS` | `60`                              |
    /// | `YOUTUBE_CLIENT_ID`               | unset                             |
    /// | `YOUTUBE_CLIENT_SECRET`           | unset                             |
    /// | `YOUTUBE_TOKEN_URL`               | Google token endpoint             |
    /// | `YOUTUBE_API_BASE_URL`            | YouTube Data API v3               |
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Same as [`SyncConfig::from_env`] over an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |var: &str| lookup(var).filter(|v| !v.trim().is_empty());

        let encryption_key = match get("ROAMLY_ENCRYPTION_KEY") {
            Some(key) => key,
            None => {
                tracing::warn!("ROAMLY_ENCRYPTION_KEY not set, using the development key");
                DEFAULT_ENCRYPTION_KEY.to_string()
            }
        };

        let privacy = match get("ROAMLY_PLAYLIST_PRIVACY") {
            Some(raw) => raw.parse::<Privacy>().map_err(|reason| ConfigError::Invalid {
                var: "ROAMLY_PLAYLIST_PRIVACY",
                value: raw.clone(),
                reason,
            })?,
            None => Privacy::Public,
        };

        let token_safety_margin = match get("ROAMLY_TOKEN_SAFETY_MARGIN_SECS") {
            Some(raw) => raw
                .trim()
                .parse::<u64>()
                .map(Duration::from_secs)
                .map_err(|e| ConfigError::Invalid {
                    var: "ROAMLY_TOKEN_SAFETY_MARGIN_SECS",
                    value: raw.clone(),
                    reason: e.to_string(),
                })?,
            None => DEFAULT_SAFETY_MARGIN,
        };

        Ok(Self {
            database_url: get("DATABASE_URL").unwrap_or_else(|| DEFAULT_DATABASE_URL.into()),
            encryption_key,
            account_id: get("ROAMLY_ACCOUNT_ID").unwrap_or_else(|| DEFAULT_ACCOUNT_ID.into()),
            product_name: get("ROAMLY_PRODUCT_NAME").unwrap_or_else(|| DEFAULT_PRODUCT_NAME.into()),
            privacy,
            token_safety_margin,
            platform: PlatformConfig {
                client_id: get("YOUTUBE_CLIENT_ID"),
                client_secret: get("YOUTUBE_CLIENT_SECRET"),
                token_url: get("YOUTUBE_TOKEN_URL").unwrap_or_else(|| GOOGLE_TOKEN_URL.into()),
                api_base_url: get("YOUTUBE_API_BASE_URL")
                    .unwrap_or_else(|| YOUTUBE_API_BASE_URL.into()),
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |var| map.get(var).cloned()
    }

    #[test]
    fn defaults_apply_when_unset() {
        let config = SyncConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.product_name, "Roamly");
        assert_eq!(config.privacy, Privacy::Public);
        assert_eq!(config.token_safety_margin, Duration::from_secs(60));
        assert_eq!(config.platform.token_url, GOOGLE_TOKEN_URL);
        assert!(config.platform.oauth_client().is_err());
    }

    #[test]
    fn values_are_read() {
        let config = SyncConfig::from_lookup(lookup(&[
            ("ROAMLY_PRODUCT_NAME", "Wanderlust"),
            ("ROAMLY_PLAYLIST_PRIVACY", "unlisted"),
            ("ROAMLY_TOKEN_SAFETY_MARGIN_SECS", "120"),
            ("YOUTUBE_CLIENT_ID", "id"),
            ("YOUTUBE_CLIENT_SECRET", "secret"),
        ]))
        .unwrap();
        assert_eq!(config.product_name, "Wanderlust");
        assert_eq!(config.privacy, Privacy::Unlisted);
        assert_eq!(config.token_safety_margin, Duration::from_secs(120));
        assert_eq!(config.platform.oauth_client().unwrap(), ("id", "secret"));
    }

    #[test]
    fn bad_privacy_is_rejected() {
        let err = SyncConfig::from_lookup(lookup(&[("ROAMLY_PLAYLIST_PRIVACY", "secret")]))
            .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid {
                var: "ROAMLY_PLAYLIST_PRIVACY",
                ..
            }
        ));
    }

    #[test]
    fn debug_redacts_key() {
        let config =
            SyncConfig::from_lookup(lookup(&[("ROAMLY_ENCRYPTION_KEY", "hunter2")])).unwrap();
        assert!(!format!("{config:?}").contains("hunter2"));
    }
}
