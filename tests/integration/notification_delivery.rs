//! Webhook delivery through the dispatcher

use std::sync::Arc;
use std::time::Duration;

use wiremock::matchers::{header, method};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::helpers;
use server_monitor::config::HttpMethod;
use server_monitor::notify::{Dispatcher, WebhookNotifier};
use server_monitor::{ProbeResult, ProbeStatus};

#[tokio::test]
async fn dispatcher_sends_configured_method_and_headers() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(header("x-token", "abc"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let mut cfg = helpers::effective_webhook(server.uri(), 1, true);
    cfg.method = HttpMethod::Put;
    cfg.headers.insert("x-token".to_string(), "abc".to_string());

    let dispatcher = Arc::new(Dispatcher::new().unwrap());
    let result = ProbeResult::down("api", None, "connection refused");

    dispatcher
        .send_webhook(&cfg, "api", ProbeStatus::Down, &result)
        .await;

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);

    let payload: serde_json::Value = requests[0].body_json().unwrap();
    assert_eq!(payload["endpoint"], "api");
    assert_eq!(payload["status"], "down");
    assert_eq!(payload["detail"], "connection refused");
    assert!(payload["latency_ms"].is_null());
}

#[tokio::test]
async fn notifier_rejects_error_status() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let cfg = helpers::effective_webhook(server.uri(), 1, true);
    let notifier = WebhookNotifier::new().unwrap();
    let result = ProbeResult::up("api", Duration::from_millis(5), "200");

    let outcome = notifier.send(&cfg, "api", ProbeStatus::Up, &result).await;

    assert!(outcome.is_err());
    assert!(outcome.unwrap_err().to_string().contains("500"));
}

#[tokio::test]
async fn dispatcher_skips_disabled_channel() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let mut cfg = helpers::effective_webhook(server.uri(), 1, true);
    cfg.enabled = false;

    let dispatcher = Dispatcher::new().unwrap();
    let result = ProbeResult::down("api", None, "timeout");

    dispatcher
        .send_webhook(&cfg, "api", ProbeStatus::Down, &result)
        .await;

    assert!(server.received_requests().await.unwrap().is_empty());
}
