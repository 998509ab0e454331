//! TCP connect probe executor
//!
//! Success means the three-way handshake completed before the timeout.
//! No payload is sent; the stream is dropped immediately.

use std::time::{Duration, Instant};

use tokio::net::TcpStream;
use tracing::{instrument, trace};

use crate::ProbeResult;
use crate::config::TcpProbeConfig;

#[derive(Debug)]
pub struct TcpProber {
    endpoint_name: String,
    config: TcpProbeConfig,
    timeout: Duration,
}

impl TcpProber {
    pub fn new(endpoint_name: String, config: TcpProbeConfig, timeout: Duration) -> Self {
        Self {
            endpoint_name,
            config,
            timeout,
        }
    }

    #[instrument(skip(self), fields(endpoint = %self.endpoint_name))]
    pub async fn probe(&self) -> ProbeResult {
        let addr = format!("{}:{}", self.config.host, self.config.port);
        trace!("connecting to {addr}");

        let start = Instant::now();

        match tokio::time::timeout(self.timeout, TcpStream::connect(&addr)).await {
            Ok(Ok(_stream)) => ProbeResult::up(&self.endpoint_name, start.elapsed(), "connected"),
            Ok(Err(e)) => {
                let detail = if e.kind() == std::io::ErrorKind::ConnectionRefused {
                    "connection refused".to_string()
                } else {
                    format!("connect failed: {e}")
                };
                ProbeResult::down(&self.endpoint_name, None, detail)
            }
            Err(_) => ProbeResult::down(
                &self.endpoint_name,
                None,
                format!("timeout after {}s", self.timeout.as_secs()),
            ),
        }
    }
}
