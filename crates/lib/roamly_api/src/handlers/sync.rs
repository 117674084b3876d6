//! Admin-triggered sync runs.
//!
//! Each run executes on its own task, so a client that disconnects does not
//! cut it short and its audit entry is always written. Server shutdown
//! cancels an in-flight run at the next group boundary.

use axum::Json;
use axum::extract::{Path, State};
use roamly_core::models::{SyncResult, SyncScope, normalize_category};
use tracing::info;

use crate::AppState;
use crate::error::{AppError, AppResult};

/// `POST /api/admin/sync`: sync every eligible group.
pub async fn sync_all_handler(State(state): State<AppState>) -> AppResult<Json<SyncResult>> {
    info!("admin sync requested for all groups");
    run_detached(&state, SyncScope::All).await
}

/// `POST /api/admin/sync/{country}`
pub async fn sync_country_handler(
    State(state): State<AppState>,
    Path(country): Path<String>,
) -> AppResult<Json<SyncResult>> {
    let country = validate_country(&country)?;
    info!(%country, "admin sync requested for country");
    run_detached(&state, SyncScope::country(&country)).await
}

/// `POST /api/admin/sync/{country}/{category}`
pub async fn sync_category_handler(
    State(state): State<AppState>,
    Path((country, category)): Path<(String, String)>,
) -> AppResult<Json<SyncResult>> {
    let country = validate_country(&country)?;
    let category = validate_category(&category)?;
    info!(%country, %category, "admin sync requested for category");
    run_detached(&state, SyncScope::category(&country, &category)).await
}

/// Spawn the run and wait for it. Dropping the returned future leaves the
/// task running to completion.
async fn run_detached(state: &AppState, scope: SyncScope) -> AppResult<Json<SyncResult>> {
    let orchestrator = state.engine.orchestrator.clone();
    let account_id = state.engine.account_id.clone();
    let cancel = state.shutdown.child_token();

    let task = tokio::spawn(async move { orchestrator.run(&account_id, scope, &cancel).await });
    let result = task
        .await
        .map_err(|e| AppError::Internal(format!("sync task failed: {e}")))??;
    Ok(Json(result))
}

/// ISO 3166-1 alpha-3, upper-cased.
pub(crate) fn validate_country(raw: &str) -> AppResult<String> {
    let code = raw.trim();
    if code.len() != 3 || !code.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(AppError::Validation(format!(
            "country must be a three-letter ISO code, got {raw:?}"
        )));
    }
    Ok(code.to_ascii_uppercase())
}

pub(crate) fn validate_category(raw: &str) -> AppResult<String> {
    let slug = normalize_category(raw);
    if slug.is_empty() {
        return Err(AppError::Validation("category must not be empty".into()));
    }
    Ok(slug)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn country_codes() {
        assert_eq!(validate_country("fra").unwrap(), "FRA");
        assert!(validate_country("FR").is_err());
        assert!(validate_country("F1A").is_err());
    }

    #[test]
    fn categories_are_normalized() {
        assert_eq!(validate_category("Street Food").unwrap(), "street-food");
        assert!(validate_category("   ").is_err());
    }
}
