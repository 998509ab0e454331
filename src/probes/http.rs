//! HTTP(S) probe executor
//!
//! Performs a single request against the configured URL and classifies the
//! response: the status code must be in the expected set (any 2xx when none
//! is configured) and, if a content match is configured, the body must
//! contain the literal substring or match the compiled regex.
//!
//! The reqwest client is built once per endpoint: redirect policy, TLS
//! verification and the request timeout are fixed for the lifetime of the
//! run.

use std::time::{Duration, Instant};

use regex::Regex;
use tracing::{instrument, trace, warn};

use crate::ProbeResult;
use crate::config::{HttpMethod, HttpProbeConfig};

#[derive(Debug)]
pub struct HttpProber {
    endpoint_name: String,
    config: HttpProbeConfig,
    client: reqwest::Client,

    /// Compiled from `content_match` when `content_regex` is set; the
    /// pattern was already validated at startup
    content_regex: Option<Regex>,
}

impl HttpProber {
    pub fn new(
        endpoint_name: String,
        config: HttpProbeConfig,
        timeout: Duration,
    ) -> anyhow::Result<Self> {
        let redirect = if config.follow_redirects {
            reqwest::redirect::Policy::limited(10)
        } else {
            reqwest::redirect::Policy::none()
        };

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .redirect(redirect)
            .danger_accept_invalid_certs(!config.verify_ssl)
            .build()
            .map_err(|e| anyhow::anyhow!("failed to build HTTP client: {e}"))?;

        let content_regex = match (&config.content_match, config.content_regex) {
            (Some(pattern), true) => Some(Regex::new(pattern)?),
            _ => None,
        };

        Ok(Self {
            endpoint_name,
            config,
            client,
            content_regex,
        })
    }

    #[instrument(skip(self), fields(endpoint = %self.endpoint_name))]
    pub async fn probe(&self) -> ProbeResult {
        trace!("probing {}", self.config.url);

        let start = Instant::now();

        let mut request = self
            .client
            .request(self.config.method.as_reqwest(), &self.config.url);

        for (name, value) in &self.config.headers {
            request = request.header(name, value);
        }

        if let Some(body) = &self.config.body {
            request = request.body(body.clone());
        }

        let response = match request.send().await {
            Ok(response) => response,
            Err(e) => {
                warn!("request failed: {e:#}");
                return ProbeResult::down(&self.endpoint_name, None, describe_error(&e));
            }
        };

        let status_code = response.status().as_u16();

        let status_ok = match &self.config.expected_status {
            Some(expected) => expected.contains(status_code),
            None => (200..300).contains(&status_code),
        };

        if !status_ok {
            return ProbeResult::down(
                &self.endpoint_name,
                Some(start.elapsed()),
                format!("unexpected status: {status_code}"),
            );
        }

        // Body check only when configured (and skipped for HEAD, which has none)
        if self.config.content_match.is_some() && self.config.method != HttpMethod::Head {
            let body = match response.text().await {
                Ok(body) => body,
                Err(e) => {
                    return ProbeResult::down(
                        &self.endpoint_name,
                        Some(start.elapsed()),
                        format!("failed to read body: {e}"),
                    );
                }
            };

            if !self.body_matches(&body) {
                return ProbeResult::down(
                    &self.endpoint_name,
                    Some(start.elapsed()),
                    format!("body mismatch (status {status_code})"),
                );
            }
        }

        ProbeResult::up(&self.endpoint_name, start.elapsed(), status_code.to_string())
    }

    fn body_matches(&self, body: &str) -> bool {
        match (&self.content_regex, &self.config.content_match) {
            (Some(re), _) => re.is_match(body),
            (None, Some(needle)) => body.contains(needle.as_str()),
            (None, None) => true,
        }
    }
}

/// Map a reqwest error to a short failure reason, distinguishing timeout,
/// redirect-limit, DNS, TLS and plain connection failures.
fn describe_error(e: &reqwest::Error) -> String {
    if e.is_timeout() {
        return "timeout".to_string();
    }
    if e.is_redirect() {
        return "too many redirects".to_string();
    }

    let chain = error_chain(e);
    let lowered = chain.to_lowercase();
    if lowered.contains("dns") {
        return format!("dns error: {chain}");
    }
    if lowered.contains("certificate") || lowered.contains("tls") || lowered.contains("handshake") {
        return format!("tls handshake failed: {chain}");
    }
    if e.is_connect() {
        return format!("connection failed: {chain}");
    }

    format!("request failed: {chain}")
}

/// Innermost source message of a reqwest error (the outer layers only say
/// "error sending request").
fn error_chain(e: &reqwest::Error) -> String {
    let mut source: &dyn std::error::Error = e;
    while let Some(inner) = source.source() {
        source = inner;
    }
    source.to_string()
}
