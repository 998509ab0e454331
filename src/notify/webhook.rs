//! Webhook notification transport
//!
//! Posts a JSON payload describing the alert to the configured URL. Method
//! and headers come from the effective channel config; the per-channel
//! timeout bounds each request.

use reqwest::Client;
use serde::Serialize;
use tracing::trace;

use crate::config::EffectiveWebhookConfig;
use crate::{ProbeResult, ProbeStatus};

/// JSON body sent to the webhook
#[derive(Debug, Clone, Serialize)]
pub struct WebhookPayload {
    pub endpoint: String,
    pub status: ProbeStatus,
    pub timestamp: String,
    pub latency_ms: Option<i64>,
    pub detail: String,
    pub success: bool,
}

impl WebhookPayload {
    pub fn new(endpoint_name: &str, status: ProbeStatus, result: &ProbeResult) -> Self {
        Self {
            endpoint: endpoint_name.to_string(),
            status,
            timestamp: result.timestamp.to_rfc3339(),
            latency_ms: result.latency_ms(),
            detail: result.detail.clone(),
            success: result.success,
        }
    }
}

pub struct WebhookNotifier {
    client: Client,
}

impl WebhookNotifier {
    pub fn new() -> anyhow::Result<Self> {
        // Per-request timeouts come from the channel config
        let client = Client::builder()
            .build()
            .map_err(|e| anyhow::anyhow!("failed to build webhook client: {e}"))?;
        Ok(Self { client })
    }

    /// Deliver one webhook notification.
    pub async fn send(
        &self,
        cfg: &EffectiveWebhookConfig,
        endpoint_name: &str,
        status: ProbeStatus,
        result: &ProbeResult,
    ) -> anyhow::Result<()> {
        let payload = WebhookPayload::new(endpoint_name, status, result);

        trace!("sending webhook to {}", cfg.url);

        let mut request = self
            .client
            .request(cfg.method.as_reqwest(), &cfg.url)
            .timeout(cfg.timeout)
            .json(&payload);

        for (name, value) in &cfg.headers {
            request = request.header(name, value);
        }

        let response = request.send().await?;

        if !response.status().is_success() {
            anyhow::bail!("webhook returned status {}", response.status());
        }

        Ok(())
    }
}
