//! End-to-end alerting through the engine
//!
//! These tests run the real engine against wiremock servers: one plays the
//! monitored endpoint, another receives webhook notifications. Probe
//! intervals are shortened to keep the tests fast.

use std::sync::Arc;
use std::time::Duration;

use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::helpers;
use server_monitor::config::{DatabaseConfig, ResolvedConfig, ResolvedEndpoint};
use server_monitor::engine::Engine;
use server_monitor::notify::Dispatcher;
use server_monitor::storage;

async fn sqlite_store(
    dir: &tempfile::TempDir,
) -> Arc<dyn storage::ResultStore> {
    storage::open_store(
        &DatabaseConfig::Sqlite {
            path: dir.path().join("results.db"),
        },
        4,
    )
    .await
    .unwrap()
}

fn single_endpoint_config(endpoint: ResolvedEndpoint) -> ResolvedConfig {
    ResolvedConfig {
        max_concurrent_checks: 4,
        database: DatabaseConfig::default(),
        endpoints: vec![endpoint],
    }
}

#[tokio::test]
async fn threshold_failure_then_recovery_notifies_once_each() {
    let probe_server = MockServer::start().await;
    // First three checks fail, everything after succeeds
    Mock::given(method("GET"))
        .and(path("/health"))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(3)
        .mount(&probe_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/health"))
        .respond_with(ResponseTemplate::new(200).set_body_string("OK"))
        .mount(&probe_server)
        .await;

    let webhook_server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&webhook_server)
        .await;

    let mut endpoint = helpers::http_endpoint("flaky", format!("{}/health", probe_server.uri()));
    endpoint.webhook = Some(helpers::effective_webhook(webhook_server.uri(), 3, true));

    let dir = tempfile::tempdir().unwrap();
    let store = sqlite_store(&dir).await;
    let dispatcher = Arc::new(Dispatcher::new().unwrap());

    let engine = Engine::start(single_endpoint_config(endpoint), store.clone(), dispatcher).unwrap();

    // ~12 probes at 50ms: 3 failures then successes
    tokio::time::sleep(Duration::from_millis(600)).await;

    // History was persisted along the way
    let rows = store.recent("flaky", 100).await.unwrap();
    assert!(rows.len() >= 4, "expected at least 4 rows, got {}", rows.len());
    assert!(rows.iter().any(|r| !r.success));
    assert!(rows.iter().any(|r| r.success));

    engine.shutdown().await;

    let requests = webhook_server.received_requests().await.unwrap();
    let payloads: Vec<serde_json::Value> = requests
        .iter()
        .map(|r| r.body_json().unwrap())
        .collect();

    let downs = payloads.iter().filter(|p| p["status"] == "down").count();
    let ups = payloads.iter().filter(|p| p["status"] == "up").count();

    assert_eq!(downs, 1, "exactly one down notification: {payloads:?}");
    assert_eq!(ups, 1, "exactly one recovery notification: {payloads:?}");
    assert_eq!(payloads[0]["status"], "down");
    assert_eq!(payloads[0]["endpoint"], "flaky");
    assert_eq!(payloads[0]["success"], false);
}

#[tokio::test]
async fn below_threshold_failures_stay_silent() {
    let probe_server = MockServer::start().await;
    // Two failures, then healthy: threshold 3 is never reached
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(2)
        .mount(&probe_server)
        .await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&probe_server)
        .await;

    let webhook_server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&webhook_server)
        .await;

    let mut endpoint = helpers::http_endpoint("blip", probe_server.uri());
    endpoint.webhook = Some(helpers::effective_webhook(webhook_server.uri(), 3, true));

    let dir = tempfile::tempdir().unwrap();
    let store = sqlite_store(&dir).await;
    let dispatcher = Arc::new(Dispatcher::new().unwrap());

    let engine = Engine::start(single_endpoint_config(endpoint), store, dispatcher).unwrap();
    tokio::time::sleep(Duration::from_millis(400)).await;
    engine.shutdown().await;

    // wiremock verifies expect(0) on drop; double-check explicitly
    assert!(webhook_server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn disabled_channel_never_notifies() {
    let probe_server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&probe_server)
        .await;

    let webhook_server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&webhook_server)
        .await;

    let mut endpoint = helpers::http_endpoint("muted", probe_server.uri());
    let mut webhook = helpers::effective_webhook(webhook_server.uri(), 1, true);
    webhook.enabled = false;
    endpoint.webhook = Some(webhook);

    let dir = tempfile::tempdir().unwrap();
    let store = sqlite_store(&dir).await;
    let dispatcher = Arc::new(Dispatcher::new().unwrap());

    let engine = Engine::start(single_endpoint_config(endpoint), store, dispatcher).unwrap();
    tokio::time::sleep(Duration::from_millis(300)).await;
    engine.shutdown().await;

    assert!(webhook_server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn shutdown_drains_quickly_with_slow_probe_in_flight() {
    let probe_server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(30)))
        .mount(&probe_server)
        .await;

    let mut endpoint = helpers::http_endpoint("sluggish", probe_server.uri());
    endpoint.timeout = Duration::from_secs(60);

    let dir = tempfile::tempdir().unwrap();
    let store = sqlite_store(&dir).await;
    let dispatcher = Arc::new(Dispatcher::new().unwrap());

    let engine = Engine::start(single_endpoint_config(endpoint), store, dispatcher).unwrap();

    // Let the first probe get stuck in flight
    tokio::time::sleep(Duration::from_millis(100)).await;

    // Cancellation must cut the probe short well before its timeout
    tokio::time::timeout(Duration::from_secs(5), engine.shutdown())
        .await
        .expect("shutdown did not complete within drain deadline");
}
