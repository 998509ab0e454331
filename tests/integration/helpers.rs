//! Helper functions for integration tests

use std::collections::HashMap;
use std::time::Duration;

use server_monitor::config::{
    EffectiveWebhookConfig, HttpMethod, HttpProbeConfig, NotifyEvents, ProbeSpec, ResolvedEndpoint,
    StatusCodes,
};

pub fn http_probe(url: impl Into<String>) -> HttpProbeConfig {
    HttpProbeConfig {
        url: url.into(),
        method: HttpMethod::Get,
        headers: HashMap::new(),
        body: None,
        expected_status: Some(StatusCodes::One(200)),
        content_match: None,
        content_regex: false,
        follow_redirects: true,
        verify_ssl: true,
    }
}

pub fn effective_webhook(
    url: impl Into<String>,
    failure_threshold: u32,
    suppress_repeated: bool,
) -> EffectiveWebhookConfig {
    EffectiveWebhookConfig {
        enabled: true,
        events: NotifyEvents {
            failure: true,
            recovery: true,
        },
        failure_threshold,
        suppress_repeated,
        url: url.into(),
        method: HttpMethod::Post,
        headers: HashMap::new(),
        timeout: Duration::from_secs(5),
    }
}

/// HTTP endpoint probing every 50ms, without notification channels
pub fn http_endpoint(name: &str, url: impl Into<String>) -> ResolvedEndpoint {
    ResolvedEndpoint {
        name: name.to_string(),
        probe: ProbeSpec::Http(http_probe(url)),
        interval: Duration::from_millis(50),
        timeout: Duration::from_secs(2),
        email: None,
        webhook: None,
    }
}
