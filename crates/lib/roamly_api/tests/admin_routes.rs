//! Router tests over in-memory stores and a fake platform.

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use roamly_api::{AppState, config::ApiConfig};
use roamly_core::catalog::naming::CollectionNaming;
use roamly_core::credentials::manager::TokenManager;
use roamly_core::engine::Engine;
use roamly_core::memory::{
    MEMORY_ACCOUNT, MemoryCollectionCache, MemoryCredentialStore, MemoryPlatform,
    MemorySourceCatalog, MemorySyncLogStore, MemoryTokenRefresher, fresh_credential,
};
use roamly_core::models::Privacy;
use roamly_core::sync::orchestrator::{SyncOrchestrator, SyncParts};
use tokio_util::sync::CancellationToken;
use tower::ServiceExt;

const ADMIN_TOKEN: &str = "test-admin-token";

struct TestApp {
    router: Router,
    source: Arc<MemorySourceCatalog>,
    platform: Arc<MemoryPlatform>,
    logs: Arc<MemorySyncLogStore>,
}

fn app_with(linked: bool, admin_token: Option<&str>) -> TestApp {
    let credentials = Arc::new(if linked {
        MemoryCredentialStore::with(fresh_credential(MEMORY_ACCOUNT))
    } else {
        MemoryCredentialStore::new()
    });
    let cache = Arc::new(MemoryCollectionCache::new());
    let logs = Arc::new(MemorySyncLogStore::new());
    let source = Arc::new(MemorySourceCatalog::new());
    let platform = Arc::new(MemoryPlatform::new());
    let tokens = Arc::new(TokenManager::new(
        credentials,
        MemoryTokenRefresher::new(),
    ));

    let orchestrator = SyncOrchestrator::new(
        SyncParts {
            source: source.clone(),
            cache: cache.clone(),
            logs: logs.clone(),
            platform: platform.clone(),
            tokens,
        },
        CollectionNaming::new("Product"),
        Privacy::Public,
    );

    let state = AppState {
        engine: Engine {
            orchestrator: Arc::new(orchestrator),
            cache,
            logs: logs.clone(),
            account_id: MEMORY_ACCOUNT.into(),
        },
        config: ApiConfig {
            bind_addr: "127.0.0.1:0".into(),
            admin_token: admin_token.map(str::to_string),
        },
        shutdown: CancellationToken::new(),
    };

    TestApp {
        router: roamly_api::router(state),
        source,
        platform,
        logs,
    }
}

fn app() -> TestApp {
    app_with(true, Some(ADMIN_TOKEN))
}

fn admin_request(method: &str, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("authorization", format!("Bearer {ADMIN_TOKEN}"))
        .body(Body::empty())
        .unwrap()
}

async fn send(router: &Router, req: Request<Body>) -> (StatusCode, serde_json::Value) {
    let resp = router.clone().oneshot(req).await.expect("request");
    let status = resp.status();
    let body = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .expect("read body");
    let json = if body.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&body).expect("parse JSON")
    };
    (status, json)
}

#[tokio::test]
async fn health_is_public() {
    let app = app();
    let req = Request::builder()
        .uri("/api/health")
        .body(Body::empty())
        .unwrap();
    let (status, json) = send(&app.router, req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "ok");
    assert!(json["version"].is_string());
}

#[tokio::test]
async fn admin_routes_require_bearer_token() {
    let app = app();

    let req = Request::builder()
        .method("POST")
        .uri("/api/admin/sync")
        .body(Body::empty())
        .unwrap();
    let (status, json) = send(&app.router, req).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(json["error"], "unauthorized");

    let req = Request::builder()
        .uri("/api/admin/collections")
        .header("authorization", "Bearer wrong")
        .body(Body::empty())
        .unwrap();
    let (status, _) = send(&app.router, req).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(app.platform.create_calls(), 0);
}

#[tokio::test]
async fn admin_routes_are_closed_without_configured_token() {
    let app = app_with(true, None);
    let (status, _) = send(&app.router, admin_request("GET", "/api/admin/collections")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn sync_all_returns_result() {
    let app = app();
    app.source.push("FRA", "music", "v1");
    app.source.push("FRA", "music", "v2");

    let (status, json) = send(&app.router, admin_request("POST", "/api/admin/sync")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["collectionsCreated"], 1);
    assert_eq!(json["itemsAdded"], 2);
    assert_eq!(json["status"], "success");
    assert_eq!(json["errors"].as_array().unwrap().len(), 0);
    assert_eq!(json["scope"]["kind"], "all");
}

#[tokio::test]
async fn sync_category_normalizes_path() {
    let app = app();
    app.source.push("FRA", "street food", "v1");
    app.source.push("FRA", "music", "v2");

    let (status, json) = send(
        &app.router,
        admin_request("POST", "/api/admin/sync/fra/Street%20Food"),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["collectionsCreated"], 1);
    assert_eq!(json["itemsAdded"], 1);
    assert_eq!(json["scope"]["key"]["category"], "street-food");
}

#[tokio::test]
async fn invalid_country_is_bad_request() {
    let app = app();
    let (status, json) = send(&app.router, admin_request("POST", "/api/admin/sync/FR")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "validation_error");
}

#[tokio::test]
async fn unlinked_account_needs_reauthorization() {
    let app = app_with(false, Some(ADMIN_TOKEN));
    app.source.push("FRA", "music", "v1");

    let (status, json) = send(&app.router, admin_request("POST", "/api/admin/sync/FRA")).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json["error"], "reauthorization_required");

    // The aborted run is still in the log.
    let (status, json) = send(&app.router, admin_request("GET", "/api/admin/sync-logs")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["logs"][0]["status"], "failed");
    assert_eq!(json["logs"][0]["scopeKey"], "FRA");
}

#[tokio::test]
async fn collections_and_logs_reflect_runs() {
    let app = app();
    app.source.push("FRA", "music", "v1");
    app.source.push("JPN", "food", "v2");

    send(&app.router, admin_request("POST", "/api/admin/sync")).await;
    send(&app.router, admin_request("POST", "/api/admin/sync/JPN")).await;

    let (status, json) = send(&app.router, admin_request("GET", "/api/admin/collections")).await;
    assert_eq!(status, StatusCode::OK);
    let collections = json["collections"].as_array().unwrap();
    assert_eq!(collections.len(), 2);
    assert_eq!(collections[0]["displayName"], "France Music 🇫🇷 | Product");
    assert_eq!(collections[1]["key"]["countryCode"], "JPN");

    let (_, json) = send(
        &app.router,
        admin_request("GET", "/api/admin/sync-logs?limit=1"),
    )
    .await;
    let logs = json["logs"].as_array().unwrap();
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0]["scope"], "country");
}

#[tokio::test]
async fn abandoned_request_still_completes_the_run() {
    let app = app();
    app.platform.slow_adds(Duration::from_millis(100));
    for id in ["v1", "v2", "v3"] {
        app.source.push("FRA", "music", id);
    }

    // The client gives up long before the run can finish.
    let pending = app
        .router
        .clone()
        .oneshot(admin_request("POST", "/api/admin/sync"));
    assert!(
        tokio::time::timeout(Duration::from_millis(50), pending)
            .await
            .is_err()
    );

    tokio::time::timeout(Duration::from_secs(5), async {
        while app.logs.entries().is_empty() {
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    })
    .await
    .expect("run finishes without the client");

    let logs = app.logs.entries();
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0].items_added, 3);
    assert_eq!(app.platform.add_calls(), 3);
}
