//! In-process metrics registry
//!
//! Metrics follow Prometheus naming conventions with a `server_monitor_`
//! prefix: `_total` counters, `_seconds` histograms/gauges. Labels are
//! bounded by the configured endpoint set, so cardinality is fixed for the
//! lifetime of a run.
//!
//! The recorder is installed once at startup; the returned
//! [`PrometheusHandle`] is a read-only snapshot whose `render()` produces
//! the text exposition format for the external scrape handler.
//!
//! Success rate and average response time are derived gauges, recomputed
//! by each scheduler from a sliding window of its endpoint's last results
//! ([`ResultWindow`]).

use std::collections::VecDeque;
use std::time::Duration;

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};

/// Results kept per endpoint for the derived gauges
pub const DEFAULT_WINDOW_SIZE: usize = 100;

/// Install the Prometheus metrics recorder and return the handle for
/// rendering scrape snapshots.
///
/// Must be called before any metrics are recorded; fails if a recorder is
/// already installed.
pub fn init_recorder() -> Result<PrometheusHandle, String> {
    PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Full("server_monitor_response_time_seconds".to_string()),
            &[
                0.005, 0.010, 0.025, 0.050, 0.100, 0.250, 0.500, 1.000, 2.500, 5.000, 10.000,
            ],
        )
        .map_err(|e| format!("failed to set response time buckets: {e}"))?
        .install_recorder()
        .map_err(|e| format!("failed to install Prometheus metrics recorder: {e}"))
}

/// Count one completed probe.
///
/// Metric: `server_monitor_checks_total`, labels: `endpoint`, `status`.
/// Cancelled probes are never counted.
pub fn record_check(endpoint: &str, status: &str) {
    counter!(
        "server_monitor_checks_total",
        "endpoint" => endpoint.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
}

/// Record probe latency.
///
/// Metric: `server_monitor_response_time_seconds`, labels: `endpoint`.
pub fn record_response_time(endpoint: &str, latency: Duration) {
    histogram!(
        "server_monitor_response_time_seconds",
        "endpoint" => endpoint.to_string()
    )
    .record(latency.as_secs_f64());
}

/// Set the up/down gauge (1/0) for an endpoint.
///
/// Metric: `server_monitor_endpoint_up`, labels: `endpoint`.
pub fn set_endpoint_up(endpoint: &str, up: bool) {
    gauge!(
        "server_monitor_endpoint_up",
        "endpoint" => endpoint.to_string()
    )
    .set(if up { 1.0 } else { 0.0 });
}

/// Set process uptime.
///
/// Metric: `server_monitor_uptime_seconds`.
pub fn set_uptime_seconds(seconds: f64) {
    gauge!("server_monitor_uptime_seconds").set(seconds);
}

/// Set the sliding-window success rate (0.0..=1.0) for an endpoint.
///
/// Metric: `server_monitor_endpoint_success_rate`, labels: `endpoint`.
pub fn set_success_rate(endpoint: &str, rate: f64) {
    gauge!(
        "server_monitor_endpoint_success_rate",
        "endpoint" => endpoint.to_string()
    )
    .set(rate);
}

/// Set the sliding-window mean latency for an endpoint.
///
/// Metric: `server_monitor_endpoint_avg_response_time_seconds`,
/// labels: `endpoint`.
pub fn set_avg_response_time(endpoint: &str, seconds: f64) {
    gauge!(
        "server_monitor_endpoint_avg_response_time_seconds",
        "endpoint" => endpoint.to_string()
    )
    .set(seconds);
}

/// Count a dropped store write.
///
/// Metric: `server_monitor_store_write_errors_total`.
pub fn record_store_write_error() {
    counter!("server_monitor_store_write_errors_total").increment(1);
}

/// Count an exhausted notification delivery.
///
/// Metric: `server_monitor_notification_failures_total`, labels: `channel`.
pub fn record_notification_failure(channel: &str) {
    counter!(
        "server_monitor_notification_failures_total",
        "channel" => channel.to_string()
    )
    .increment(1);
}

/// Count a tick that found the concurrency semaphore exhausted.
///
/// Metric: `server_monitor_scheduler_backpressure_total`.
pub fn record_backpressure() {
    counter!("server_monitor_scheduler_backpressure_total").increment(1);
}

/// Sliding window over the last N probe results of one endpoint
///
/// Owned by the endpoint's scheduler; no locking involved.
#[derive(Debug)]
pub struct ResultWindow {
    results: VecDeque<(bool, Option<Duration>)>,
    capacity: usize,
}

impl Default for ResultWindow {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW_SIZE)
    }
}

impl ResultWindow {
    pub fn new(capacity: usize) -> Self {
        Self {
            results: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, success: bool, latency: Option<Duration>) {
        if self.results.len() == self.capacity {
            self.results.pop_front();
        }
        self.results.push_back((success, latency));
    }

    /// Fraction of successful results in the window; None while empty.
    pub fn success_rate(&self) -> Option<f64> {
        if self.results.is_empty() {
            return None;
        }
        let successes = self.results.iter().filter(|(ok, _)| *ok).count();
        Some(successes as f64 / self.results.len() as f64)
    }

    /// Mean latency (seconds) over results that have one; None when no
    /// result in the window carries a latency.
    pub fn avg_response_time(&self) -> Option<f64> {
        let latencies: Vec<f64> = self
            .results
            .iter()
            .filter_map(|(_, l)| l.map(|d| d.as_secs_f64()))
            .collect();

        if latencies.is_empty() {
            return None;
        }
        Some(latencies.iter().sum::<f64>() / latencies.len() as f64)
    }
}
