use chrono::{DateTime, Utc};
use roamly_api::AppState;
use roamly_api::config::ApiConfig;
use roamly_core::config::SyncConfig;
use roamly_core::credentials::store::{CredentialStore, PgCredentialStore};
use roamly_core::engine::Engine;
use roamly_core::models::OAuthCredential;
use sqlx::PgPool;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::cli::{CredentialsCommand, SyncCommand};
use crate::{Error, Result};

async fn connect(config: &SyncConfig, max_connections: u32) -> Result<PgPool> {
    info!(max_connections, "connecting to database");
    Ok(roamly_core::db::connect(&config.database_url, max_connections).await?)
}

/// Token cancelled on the first Ctrl-C.
fn cancel_on_ctrl_c() -> CancellationToken {
    let token = CancellationToken::new();
    let trigger = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received, stopping after the current group");
            trigger.cancel();
        }
    });
    token
}

pub async fn migrate(config: &SyncConfig, max_connections: u32) -> Result<()> {
    let pool = connect(config, max_connections).await?;
    info!("running database migrations");
    roamly_core::db::migrate(&pool).await?;
    println!("migrations applied");
    Ok(())
}

pub async fn sync(config: &SyncConfig, max_connections: u32, scope: &SyncCommand) -> Result<()> {
    let pool = connect(config, max_connections).await?;
    let engine = Engine::from_pool(pool, config)?;
    let cancel = cancel_on_ctrl_c();
    let account = &engine.account_id;

    let result = match scope {
        SyncCommand::All => engine.orchestrator.sync_all(account, &cancel).await?,
        SyncCommand::Country { country } => {
            engine
                .orchestrator
                .sync_country(account, country, &cancel)
                .await?
        }
        SyncCommand::Category { country, category } => {
            engine
                .orchestrator
                .sync_category(account, country, category, &cancel)
                .await?
        }
    };

    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}

pub async fn serve(config: &SyncConfig, max_connections: u32, bind: &str) -> Result<()> {
    let pool = connect(config, max_connections).await?;
    info!("running database migrations");
    roamly_core::db::migrate(&pool).await?;

    let mut api_config = ApiConfig::from_env();
    api_config.bind_addr = bind.to_string();
    if api_config.admin_token.is_none() {
        warn!("ROAMLY_ADMIN_TOKEN not set, admin routes will reject every request");
    }

    let shutdown = CancellationToken::new();
    let state = AppState {
        engine: Engine::from_pool(pool, config)?,
        config: api_config.clone(),
        shutdown: shutdown.clone(),
    };
    let app = roamly_api::router(state);

    let listener = tokio::net::TcpListener::bind(&api_config.bind_addr).await?;
    info!(addr = %listener.local_addr()?, "admin API listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = tokio::signal::ctrl_c().await;
            info!("shutting down");
            shutdown.cancel();
        })
        .await?;
    Ok(())
}

pub async fn credentials(
    config: &SyncConfig,
    max_connections: u32,
    action: &CredentialsCommand,
) -> Result<()> {
    match action {
        CredentialsCommand::Import {
            account,
            refresh_token,
            scopes,
        } => {
            let account_id = account.clone().unwrap_or_else(|| config.account_id.clone());
            if refresh_token.trim().is_empty() {
                return Err(Error::Custom("refresh token must not be empty".into()));
            }

            let pool = connect(config, max_connections).await?;
            let store = PgCredentialStore::new(pool, &config.encryption_key);
            let now = Utc::now();
            // No access token yet; the first run refreshes immediately.
            store
                .upsert(&OAuthCredential {
                    account_id: account_id.clone(),
                    access_token: String::new(),
                    refresh_token: refresh_token.trim().to_string(),
                    expires_at: DateTime::<Utc>::UNIX_EPOCH,
                    scopes: scopes.clone(),
                    updated_at: now,
                })
                .await?;
            info!(%account_id, "credential imported");
            println!("credential stored for account {account_id}");
            Ok(())
        }
    }
}
