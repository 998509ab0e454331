pub mod alerts;
pub mod config;
pub mod engine;
pub mod metrics;
pub mod notify;
pub mod probes;
pub mod storage;

use std::collections::HashMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Up/down classification of a single probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProbeStatus {
    Up,
    Down,
}

impl ProbeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProbeStatus::Up => "up",
            ProbeStatus::Down => "down",
        }
    }
}

impl std::fmt::Display for ProbeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of a single probe against one endpoint.
///
/// Produced by a probe executor, then moved by value to the store, the
/// metrics registry and the alert state machines. Executors never fail:
/// every error condition becomes a `ProbeResult` with `success = false`
/// and a human-readable `detail`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProbeResult {
    /// Name of the endpoint this result belongs to
    pub endpoint_name: String,

    /// When the probe started (always UTC)
    pub timestamp: DateTime<Utc>,

    /// Whether the probe is classified as success
    pub success: bool,

    /// Up/down status derived from `success`
    pub status: ProbeStatus,

    /// Wall-clock duration of the probe (None on hard failure)
    pub latency: Option<Duration>,

    /// Short diagnostic: status code, error reason, days-to-expiry, ...
    pub detail: String,

    /// Extra labels for metrics/logging (e.g. TLS days remaining)
    pub metric_tags: HashMap<String, String>,
}

impl ProbeResult {
    /// Successful probe with the given latency and detail.
    pub fn up(
        endpoint_name: impl Into<String>,
        latency: Duration,
        detail: impl Into<String>,
    ) -> Self {
        Self {
            endpoint_name: endpoint_name.into(),
            timestamp: Utc::now(),
            success: true,
            status: ProbeStatus::Up,
            latency: Some(latency),
            detail: detail.into(),
            metric_tags: HashMap::new(),
        }
    }

    /// Failed probe. Latency is optional: hard failures (DNS, refused
    /// connection before any round-trip) may not have a meaningful one.
    pub fn down(
        endpoint_name: impl Into<String>,
        latency: Option<Duration>,
        detail: impl Into<String>,
    ) -> Self {
        Self {
            endpoint_name: endpoint_name.into(),
            timestamp: Utc::now(),
            success: false,
            status: ProbeStatus::Down,
            latency,
            detail: detail.into(),
            metric_tags: HashMap::new(),
        }
    }

    /// Synthetic result for a probe interrupted by shutdown.
    ///
    /// Cancelled results are logged but never stored, never counted and
    /// never fed to the alert state machines.
    pub fn cancelled(endpoint_name: impl Into<String>) -> Self {
        Self::down(endpoint_name, None, "cancelled")
    }

    pub fn is_cancelled(&self) -> bool {
        self.detail == "cancelled"
    }

    /// Latency in whole milliseconds, if present.
    pub fn latency_ms(&self) -> Option<i64> {
        self.latency.map(|l| l.as_millis() as i64)
    }

    pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metric_tags.insert(key.into(), value.into());
        self
    }
}

/// Per-endpoint probe bookkeeping, owned exclusively by that endpoint's
/// scheduler task and never shared.
///
/// Invariants: `currently_down` implies `consecutive_failures >= 1`, and
/// `consecutive_failures == 0` implies `!currently_down`.
#[derive(Debug, Default)]
pub struct EndpointState {
    /// Failures since the last success (reset to 0 on success)
    pub consecutive_failures: u32,

    /// Whether the last probe failed
    pub currently_down: bool,

    /// Set once a down notification has been dispatched for the current outage
    pub last_notified_down: bool,

    /// Most recent probe result
    pub last_result: Option<ProbeResult>,
}

impl EndpointState {
    /// Record a probe result, updating the failure streak.
    pub fn observe(&mut self, result: &ProbeResult) {
        if result.success {
            self.consecutive_failures = 0;
            self.currently_down = false;
            self.last_notified_down = false;
        } else {
            self.consecutive_failures += 1;
            self.currently_down = true;
        }
        self.last_result = Some(result.clone());
    }
}
