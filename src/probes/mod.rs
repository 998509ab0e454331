//! Probe executors for the supported endpoint kinds
//!
//! Each executor turns one probe attempt into a [`ProbeResult`]. Executors
//! never return errors to the scheduler: timeouts, refused connections,
//! handshake failures and response mismatches all become results with
//! `success = false` and a diagnostic `detail`.
//!
//! Executors are built once per endpoint at startup (HTTP clients and
//! compiled regexes are reused across probes) and dispatched exhaustively
//! on the endpoint's probe kind.

pub mod http;
pub mod tcp;
pub mod tls;

use std::time::Duration;

use crate::ProbeResult;
use crate::config::ProbeSpec;

/// Probe executor for a single endpoint
#[derive(Debug)]
pub enum Prober {
    Http(http::HttpProber),
    Tcp(tcp::TcpProber),
    Tls(tls::TlsProber),
}

impl Prober {
    /// Build the executor matching the endpoint's probe spec.
    ///
    /// Fails only on configuration-level problems (unbuildable HTTP client,
    /// invalid header names); those are fatal at startup.
    pub fn new(endpoint_name: &str, spec: &ProbeSpec, timeout: Duration) -> anyhow::Result<Self> {
        Ok(match spec {
            ProbeSpec::Http(config) => Self::Http(http::HttpProber::new(
                endpoint_name.to_string(),
                config.clone(),
                timeout,
            )?),
            ProbeSpec::Tcp(config) => Self::Tcp(tcp::TcpProber::new(
                endpoint_name.to_string(),
                config.clone(),
                timeout,
            )),
            ProbeSpec::Tls(config) => Self::Tls(tls::TlsProber::new(
                endpoint_name.to_string(),
                config.clone(),
                timeout,
            )),
        })
    }

    /// Execute one probe.
    pub async fn probe(&self) -> ProbeResult {
        match self {
            Prober::Http(p) => p.probe().await,
            Prober::Tcp(p) => p.probe().await,
            Prober::Tls(p) => p.probe().await,
        }
    }
}
