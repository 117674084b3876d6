//! Persistence of per-account OAuth tokens.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use super::secrets::TokenCipher;
use crate::models::OAuthCredential;
use crate::store::StoreError;

/// Storage seam for linked accounts. Rows are created by account linking
/// and mutated in place by the token manager on every refresh.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn get(&self, account_id: &str) -> Result<Option<OAuthCredential>, StoreError>;

    /// Replace the access token and its expiry in one write. The refresh
    /// token is left untouched.
    async fn update_access_token(
        &self,
        account_id: &str,
        access_token: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), StoreError>;

    /// Insert or fully replace a credential (account linking/import).
    async fn upsert(&self, credential: &OAuthCredential) -> Result<(), StoreError>;
}

#[derive(Debug, sqlx::FromRow)]
struct CredentialRow {
    account_id: String,
    access_token_encrypted: String,
    refresh_token_encrypted: String,
    expires_at: DateTime<Utc>,
    scopes: Vec<String>,
    updated_at: DateTime<Utc>,
}

/// `oauth_credentials` table with both tokens sealed at rest.
pub struct PgCredentialStore {
    pool: PgPool,
    cipher: TokenCipher,
}

impl PgCredentialStore {
    pub fn new(pool: PgPool, encryption_key: &str) -> Self {
        Self {
            pool,
            cipher: TokenCipher::new(encryption_key),
        }
    }
}

#[async_trait]
impl CredentialStore for PgCredentialStore {
    async fn get(&self, account_id: &str) -> Result<Option<OAuthCredential>, StoreError> {
        let row = sqlx::query_as::<_, CredentialRow>(
            r#"
            SELECT account_id, access_token_encrypted, refresh_token_encrypted,
                   expires_at, scopes, updated_at
            FROM oauth_credentials
            WHERE account_id = $1
            "#,
        )
        .bind(account_id)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        Ok(Some(OAuthCredential {
            access_token: self.cipher.open(&row.access_token_encrypted)?,
            refresh_token: self.cipher.open(&row.refresh_token_encrypted)?,
            account_id: row.account_id,
            expires_at: row.expires_at,
            scopes: row.scopes,
            updated_at: row.updated_at,
        }))
    }

    async fn update_access_token(
        &self,
        account_id: &str,
        access_token: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let sealed = self.cipher.seal(access_token)?;
        let result = sqlx::query(
            r#"
            UPDATE oauth_credentials
            SET access_token_encrypted = $2, expires_at = $3, updated_at = now()
            WHERE account_id = $1
            "#,
        )
        .bind(account_id)
        .bind(&sealed)
        .bind(expires_at)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!(
                "credential for {account_id} was removed during refresh"
            )));
        }
        Ok(())
    }

    async fn upsert(&self, credential: &OAuthCredential) -> Result<(), StoreError> {
        let access = self.cipher.seal(&credential.access_token)?;
        let refresh = self.cipher.seal(&credential.refresh_token)?;
        sqlx::query(
            r#"
            INSERT INTO oauth_credentials
                (account_id, access_token_encrypted, refresh_token_encrypted, expires_at, scopes)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (account_id)
            DO UPDATE SET access_token_encrypted = EXCLUDED.access_token_encrypted,
                          refresh_token_encrypted = EXCLUDED.refresh_token_encrypted,
                          expires_at = EXCLUDED.expires_at,
                          scopes = EXCLUDED.scopes,
                          updated_at = now()
            "#,
        )
        .bind(&credential.account_id)
        .bind(&access)
        .bind(&refresh)
        .bind(credential.expires_at)
        .bind(&credential.scopes)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
