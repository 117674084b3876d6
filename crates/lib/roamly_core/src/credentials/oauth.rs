//! Google OAuth refresh-token exchange.

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

/// Google's token endpoint.
pub const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";

/// A new access token issued by the authorization server.
#[derive(Debug, Clone)]
pub struct RefreshedToken {
    pub access_token: String,
    /// Lifetime in seconds from the moment of issue.
    pub expires_in: i64,
    pub scope: Option<String>,
}

/// Why an exchange produced no token.
#[derive(Debug, Error)]
pub enum RefreshError {
    /// The server answered and refused (revoked grant, bad client).
    #[error("{0}")]
    Rejected(String),

    /// Network failure, 5xx, or an unreadable response.
    #[error("{0}")]
    Unavailable(String),
}

/// Exchanges a refresh token for a new access token.
#[async_trait]
pub trait TokenRefresher: Send + Sync {
    async fn refresh(&self, refresh_token: &str) -> Result<RefreshedToken, RefreshError>;
}

/// Successful body of Google's token endpoint.
#[derive(Debug, Deserialize)]
struct GoogleTokenResponse {
    access_token: String,
    expires_in: i64,
    scope: Option<String>,
}

/// Error body of Google's token endpoint, e.g. `invalid_grant`.
#[derive(Debug, Deserialize)]
struct GoogleTokenError {
    error: String,
    error_description: Option<String>,
}

/// [`TokenRefresher`] for Google accounts (`grant_type=refresh_token`).
pub struct GoogleTokenRefresher {
    client: reqwest::Client,
    token_url: String,
    client_id: String,
    client_secret: String,
}

impl GoogleTokenRefresher {
    pub fn new(
        client: reqwest::Client,
        token_url: impl Into<String>,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
    ) -> Self {
        Self {
            client,
            token_url: token_url.into(),
            client_id: client_id.into(),
            client_secret: client_secret.into(),
        }
    }
}

#[async_trait]
impl TokenRefresher for GoogleTokenRefresher {
    async fn refresh(&self, refresh_token: &str) -> Result<RefreshedToken, RefreshError> {
        let params = [
            ("grant_type", "refresh_token"),
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
            ("refresh_token", refresh_token),
        ];

        let resp = self
            .client
            .post(&self.token_url)
            .form(&params)
            .send()
            .await
            .map_err(|e| RefreshError::Unavailable(format!("token refresh request failed: {e}")))?;

        let status = resp.status();
        debug!(status = %status, "token endpoint responded");

        if status.is_client_error() {
            let body = resp.text().await.unwrap_or_default();
            return Err(RefreshError::Rejected(describe_rejection(status, &body)));
        }
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(RefreshError::Unavailable(format!(
                "token refresh HTTP {status}: {body}"
            )));
        }

        let token = resp
            .json::<GoogleTokenResponse>()
            .await
            .map_err(|e| RefreshError::Unavailable(format!("token response parse error: {e}")))?;

        Ok(RefreshedToken {
            access_token: token.access_token,
            expires_in: token.expires_in,
            scope: token.scope,
        })
    }
}

/// Render a 4xx token response as `invalid_grant: Token has been expired or revoked.`
fn describe_rejection(status: reqwest::StatusCode, body: &str) -> String {
    match serde_json::from_str::<GoogleTokenError>(body) {
        Ok(err) => match err.error_description {
            Some(desc) => format!("{}: {desc}", err.error),
            None => err.error,
        },
        Err(_) => format!("HTTP {status}: {body}"),
    }
}
