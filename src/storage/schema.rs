//! Persisted probe result rows
//!
//! Both backends share one logical schema:
//! `probe_results(endpoint, ts, success, latency_ms, detail)` with an
//! index on `(endpoint, ts DESC)` for newest-first history queries.
//! Timestamps are stored with millisecond precision.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ProbeResult;

/// One row of probe history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProbeRow {
    /// Endpoint name
    pub endpoint: String,

    /// When the probe ran (UTC, millisecond precision)
    pub ts: DateTime<Utc>,

    pub success: bool,

    /// Probe latency in milliseconds; NULL on hard failure
    pub latency_ms: Option<i64>,

    pub detail: String,
}

impl ProbeRow {
    pub fn from_result(result: &ProbeResult) -> Self {
        Self {
            endpoint: result.endpoint_name.clone(),
            ts: result.timestamp,
            success: result.success,
            latency_ms: result.latency_ms(),
            detail: result.detail.clone(),
        }
    }
}
