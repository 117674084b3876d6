//! OAuth credential models.
//!
//! Tokens are plaintext here; encryption happens at the store boundary.

use std::fmt;

use chrono::{DateTime, Utc};

/// One linked platform account, as persisted in `oauth_credentials`.
#[derive(Clone)]
pub struct OAuthCredential {
    pub account_id: String,
    pub access_token: String,
    /// Never expires locally; only platform-side revocation invalidates it.
    pub refresh_token: String,
    pub expires_at: DateTime<Utc>,
    pub scopes: Vec<String>,
    pub updated_at: DateTime<Utc>,
}

impl OAuthCredential {
    /// Whether the access token is still usable at `now`, keeping `margin`
    /// in reserve so it cannot expire mid-call.
    pub fn is_fresh_at(&self, now: DateTime<Utc>, margin: chrono::Duration) -> bool {
        now < self.expires_at - margin
    }

    /// The credential handed to callers of the token manager.
    pub fn to_access(&self) -> AccessCredential {
        AccessCredential {
            account_id: self.account_id.clone(),
            access_token: self.access_token.clone(),
            expires_at: self.expires_at,
        }
    }
}

impl fmt::Debug for OAuthCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OAuthCredential")
            .field("account_id", &self.account_id)
            .field("access_token", &"<redacted>")
            .field("refresh_token", &"<redacted>")
            .field("expires_at", &self.expires_at)
            .field("scopes", &self.scopes)
            .field("updated_at", &self.updated_at)
            .finish()
    }
}

/// A bearer token valid for at least the configured safety margin.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessCredential {
    pub account_id: String,
    pub access_token: String,
    pub expires_at: DateTime<Utc>,
}

impl AccessCredential {
    /// Value for the `Authorization` header.
    pub fn bearer(&self) -> String {
        format!("Bearer {}", self.access_token)
    }
}

impl fmt::Debug for AccessCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessCredential")
            .field("account_id", &self.account_id)
            .field("access_token", &"<redacted>")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn credential(expires_in_secs: i64) -> OAuthCredential {
        OAuthCredential {
            account_id: "acct".into(),
            access_token: "ya29.secret".into(),
            refresh_token: "1//refresh".into(),
            expires_at: Utc::now() + chrono::Duration::seconds(expires_in_secs),
            scopes: vec![],
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn fresh_outside_margin() {
        let cred = credential(600);
        assert!(cred.is_fresh_at(Utc::now(), chrono::Duration::seconds(60)));
    }

    #[test]
    fn stale_inside_margin() {
        let cred = credential(30);
        assert!(!cred.is_fresh_at(Utc::now(), chrono::Duration::seconds(60)));
    }

    #[test]
    fn stale_exactly_at_expiry() {
        let cred = credential(0);
        assert!(!cred.is_fresh_at(cred.expires_at, chrono::Duration::zero()));
    }

    #[test]
    fn debug_redacts_tokens() {
        let cred = credential(600);
        let rendered = format!("{cred:?} {:?}", cred.to_access());
        assert!(!rendered.contains("ya29.secret"));
        assert!(!rendered.contains("1//refresh"));
    }
}
