//! Probe executor behavior against live sockets
//!
//! HTTP probes run against wiremock; the TCP probe runs against a real
//! listener and a port that is known to be unbound.

use std::time::Duration;

use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::helpers;
use server_monitor::config::{ProbeSpec, StatusCodes, TcpProbeConfig};
use server_monitor::probes::Prober;

async fn run_http_probe(config: server_monitor::config::HttpProbeConfig) -> server_monitor::ProbeResult {
    let prober = Prober::new("probe-test", &ProbeSpec::Http(config), Duration::from_secs(2)).unwrap();
    prober.probe().await
}

#[tokio::test]
async fn http_success_with_content_match() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200).set_body_string("OK body"))
        .mount(&server)
        .await;

    let mut config = helpers::http_probe(server.uri());
    config.content_match = Some("OK".to_string());

    let result = run_http_probe(config).await;

    assert!(result.success);
    assert_eq!(result.detail, "200");
    assert!(result.latency.unwrap() > Duration::ZERO);
}

#[tokio::test]
async fn http_status_mismatch_reports_actual_code() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let result = run_http_probe(helpers::http_probe(server.uri())).await;

    assert!(!result.success);
    assert!(result.detail.contains("500"));
    assert!(result.latency.is_some());
}

#[tokio::test]
async fn http_body_mismatch_is_failure() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("unexpected"))
        .mount(&server)
        .await;

    let mut config = helpers::http_probe(server.uri());
    config.content_match = Some("OK".to_string());

    let result = run_http_probe(config).await;

    assert!(!result.success);
    assert!(result.detail.contains("body mismatch"));
}

#[tokio::test]
async fn http_timeout_is_reported() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200).set_delay(Duration::from_secs(5)),
        )
        .mount(&server)
        .await;

    let prober = Prober::new(
        "slow",
        &ProbeSpec::Http(helpers::http_probe(server.uri())),
        Duration::from_millis(200),
    )
    .unwrap();

    let result = prober.probe().await;

    assert!(!result.success);
    assert!(result.detail.contains("timeout"));
}

#[tokio::test]
async fn http_unset_expected_status_accepts_2xx() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;

    let mut config = helpers::http_probe(server.uri());
    config.expected_status = None;

    let result = run_http_probe(config).await;

    assert!(result.success);
    assert_eq!(result.detail, "204");
}

#[tokio::test]
async fn http_expected_status_list() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(301))
        .mount(&server)
        .await;

    let mut config = helpers::http_probe(server.uri());
    config.expected_status = Some(StatusCodes::Many(vec![200, 301]));
    config.follow_redirects = false;

    let result = run_http_probe(config).await;

    assert!(result.success);
    assert_eq!(result.detail, "301");
}

#[tokio::test]
async fn http_custom_headers_are_sent() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(header("x-api-key", "secret"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;
    // Without the header the server answers 404, which fails the probe

    let mut config = helpers::http_probe(server.uri());
    config
        .headers
        .insert("x-api-key".to_string(), "secret".to_string());

    let result = run_http_probe(config).await;

    assert!(result.success);
}

#[tokio::test]
async fn tcp_connect_to_unbound_port_is_refused() {
    let prober = Prober::new(
        "closed",
        &ProbeSpec::Tcp(TcpProbeConfig {
            host: "127.0.0.1".to_string(),
            port: 1,
        }),
        Duration::from_secs(2),
    )
    .unwrap();

    let result = prober.probe().await;

    assert!(!result.success);
    let detail = result.detail.to_lowercase();
    assert!(detail.contains("refused") || detail.contains("connect"));
}
