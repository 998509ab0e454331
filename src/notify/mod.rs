//! Notification dispatcher
//!
//! Wraps the email and webhook transports with the shared delivery policy:
//! a disabled effective channel never sends, each attempt is bounded by the
//! channel's timeout, and transport failures are retried up to three times
//! with exponential backoff (1s, 2s, 4s). Exhausted deliveries are logged
//! and counted; they never propagate to the scheduler and never rewind an
//! alert state transition.

pub mod email;
pub mod webhook;

use std::time::Duration;

use tracing::{debug, error, instrument, warn};

use crate::config::{EffectiveEmailConfig, EffectiveWebhookConfig};
use crate::{ProbeResult, ProbeStatus, metrics};

pub use email::EmailNotifier;
pub use webhook::WebhookNotifier;

/// Initial attempt plus three retries
const MAX_ATTEMPTS: u32 = 4;

fn backoff(attempt: u32) -> Duration {
    // 1s, 2s, 4s after the 1st, 2nd and 3rd failed attempt
    Duration::from_secs(1 << (attempt - 1))
}

/// Best-effort notification fan-out shared by all schedulers
pub struct Dispatcher {
    email: EmailNotifier,
    webhook: WebhookNotifier,
}

impl Dispatcher {
    pub fn new() -> anyhow::Result<Self> {
        Ok(Self {
            email: EmailNotifier::new(),
            webhook: WebhookNotifier::new()?,
        })
    }

    /// Deliver an email notification, retrying on transport failure.
    #[instrument(skip(self, cfg, result), fields(endpoint = %endpoint_name))]
    pub async fn send_email(
        &self,
        cfg: &EffectiveEmailConfig,
        endpoint_name: &str,
        status: ProbeStatus,
        result: &ProbeResult,
    ) {
        if !cfg.enabled {
            return;
        }

        for attempt in 1..=MAX_ATTEMPTS {
            match self.email.send(cfg, endpoint_name, status, result).await {
                Ok(()) => {
                    debug!("email notification sent (attempt {attempt})");
                    return;
                }
                Err(e) => {
                    warn!("email delivery attempt {attempt}/{MAX_ATTEMPTS} failed: {e:#}");
                    if attempt < MAX_ATTEMPTS {
                        tokio::time::sleep(backoff(attempt)).await;
                    }
                }
            }
        }

        error!("email notification for {endpoint_name} dropped after {MAX_ATTEMPTS} attempts");
        metrics::record_notification_failure("email");
    }

    /// Deliver a webhook notification, retrying on transport failure.
    #[instrument(skip(self, cfg, result), fields(endpoint = %endpoint_name))]
    pub async fn send_webhook(
        &self,
        cfg: &EffectiveWebhookConfig,
        endpoint_name: &str,
        status: ProbeStatus,
        result: &ProbeResult,
    ) {
        if !cfg.enabled {
            return;
        }

        for attempt in 1..=MAX_ATTEMPTS {
            match self.webhook.send(cfg, endpoint_name, status, result).await {
                Ok(()) => {
                    debug!("webhook notification sent (attempt {attempt})");
                    return;
                }
                Err(e) => {
                    warn!("webhook delivery attempt {attempt}/{MAX_ATTEMPTS} failed: {e:#}");
                    if attempt < MAX_ATTEMPTS {
                        tokio::time::sleep(backoff(attempt)).await;
                    }
                }
            }
        }

        error!("webhook notification for {endpoint_name} dropped after {MAX_ATTEMPTS} attempts");
        metrics::record_notification_failure("webhook");
    }
}
