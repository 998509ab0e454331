//! TLS certificate probe executor
//!
//! Opens a TLS connection with SNI set to the configured host, completes
//! the handshake and inspects the peer's leaf certificate. The probe
//! succeeds while the certificate is still valid; certificates inside the
//! warning window stay successful but carry an "expires in N days" detail
//! and a warning log. Expiry itself (and any handshake failure) is a
//! probe failure.

use std::time::{Duration, Instant};

use native_tls::TlsConnector;
use tokio::net::TcpStream;
use tracing::{instrument, trace, warn};

use crate::ProbeResult;
use crate::config::TlsProbeConfig;

#[derive(Debug)]
pub struct TlsProber {
    endpoint_name: String,
    config: TlsProbeConfig,
    timeout: Duration,
}

impl TlsProber {
    pub fn new(endpoint_name: String, config: TlsProbeConfig, timeout: Duration) -> Self {
        Self {
            endpoint_name,
            config,
            timeout,
        }
    }

    #[instrument(skip(self), fields(endpoint = %self.endpoint_name))]
    pub async fn probe(&self) -> ProbeResult {
        let start = Instant::now();

        match tokio::time::timeout(self.timeout, self.handshake_and_inspect()).await {
            Ok(Ok(days_remaining)) => self.classify(days_remaining, start.elapsed()),
            Ok(Err(detail)) => ProbeResult::down(&self.endpoint_name, None, detail),
            Err(_) => ProbeResult::down(
                &self.endpoint_name,
                None,
                format!("timeout after {}s", self.timeout.as_secs()),
            ),
        }
    }

    /// Connect, handshake and return the leaf certificate's remaining
    /// validity in whole days (floor; negative when already expired).
    async fn handshake_and_inspect(&self) -> Result<i64, String> {
        let addr = format!("{}:{}", self.config.host, self.config.port);
        trace!("opening TLS connection to {addr}");

        let tcp_stream = TcpStream::connect(&addr)
            .await
            .map_err(|e| format!("connect failed: {e}"))?;

        let connector = TlsConnector::new()
            .map_err(|e| format!("failed to create TLS connector: {e}"))?;
        let connector = tokio_native_tls::TlsConnector::from(connector);

        // SNI = configured host
        let tls_stream = connector
            .connect(&self.config.host, tcp_stream)
            .await
            .map_err(|e| format!("tls handshake failed: {e}"))?;

        let cert = match tls_stream.get_ref().peer_certificate() {
            Ok(Some(cert)) => cert,
            Ok(None) => return Err("no peer certificate presented".to_string()),
            Err(e) => return Err(format!("failed to get peer certificate: {e}")),
        };

        let der = cert
            .to_der()
            .map_err(|e| format!("failed to encode certificate: {e}"))?;
        let (_, parsed) = x509_parser::parse_x509_certificate(&der)
            .map_err(|e| format!("failed to parse certificate: {e}"))?;

        let not_after = parsed.validity().not_after.timestamp();
        let now = chrono::Utc::now().timestamp();

        Ok(days_remaining(not_after, now))
    }

    fn classify(&self, days: i64, latency: Duration) -> ProbeResult {
        if days <= 0 {
            return ProbeResult::down(
                &self.endpoint_name,
                Some(latency),
                format!("certificate expired {} days ago", -days),
            );
        }

        let result = if days <= self.config.cert_expiry_warning_days {
            warn!(
                "certificate for {} expires in {days} days (warning threshold: {})",
                self.config.host, self.config.cert_expiry_warning_days
            );
            ProbeResult::up(
                &self.endpoint_name,
                latency,
                format!("expires in {days} days"),
            )
        } else {
            ProbeResult::up(&self.endpoint_name, latency, format!("valid for {days} days"))
        };

        result.with_tag("days_remaining", days.to_string())
    }
}

/// Whole days between two Unix timestamps, rounded toward negative infinity.
fn days_remaining(not_after: i64, now: i64) -> i64 {
    (not_after - now).div_euclid(86_400)
}
