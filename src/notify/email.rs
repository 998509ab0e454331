//! Email notification transport (SMTP via lettre)
//!
//! The transport is rebuilt per delivery, so credential changes via the
//! `SMTP_USERNAME`/`SMTP_PASSWORD` environment variables take effect
//! without reconnect bookkeeping. Connection security follows the
//! configured method: STARTTLS upgrade, implicit TLS, or no TLS at all
//! (the latter is warned about at startup during config validation).

use std::time::Duration;

use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use tracing::trace;

use crate::config::{ConnectionMethod, EffectiveEmailConfig, SmtpConfig};
use crate::{ProbeResult, ProbeStatus};

/// Environment variables that override configured SMTP credentials
pub const SMTP_USERNAME_VAR: &str = "SMTP_USERNAME";
pub const SMTP_PASSWORD_VAR: &str = "SMTP_PASSWORD";

/// Resolve the SMTP credentials to authenticate with.
///
/// `SMTP_USERNAME` and `SMTP_PASSWORD` take precedence over the configured
/// values, field by field. Returns None when no complete credential pair
/// is available (the server is then used unauthenticated).
pub fn resolve_credentials(smtp: &SmtpConfig) -> Option<(String, String)> {
    let username = std::env::var(SMTP_USERNAME_VAR)
        .ok()
        .or_else(|| smtp.username.clone());
    let password = std::env::var(SMTP_PASSWORD_VAR)
        .ok()
        .or_else(|| smtp.password.clone());

    match (username, password) {
        (Some(username), Some(password)) => Some((username, password)),
        _ => None,
    }
}

/// Fill the `{endpoint_name}` and `{status}` placeholders of a subject
/// template.
pub fn render_subject(template: &str, endpoint_name: &str, status: ProbeStatus) -> String {
    template
        .replace("{endpoint_name}", endpoint_name)
        .replace("{status}", status.as_str())
}

pub struct EmailNotifier;

impl EmailNotifier {
    pub fn new() -> Self {
        Self
    }

    /// Send one alert email to every configured recipient.
    pub async fn send(
        &self,
        cfg: &EffectiveEmailConfig,
        endpoint_name: &str,
        status: ProbeStatus,
        result: &ProbeResult,
    ) -> anyhow::Result<()> {
        let subject = render_subject(&cfg.subject_template, endpoint_name, status);
        let body = render_body(endpoint_name, status, result);

        let mut builder = Message::builder()
            .from(cfg.from.parse()?)
            .subject(subject)
            .header(ContentType::TEXT_PLAIN);

        for recipient in &cfg.recipients {
            builder = builder.to(recipient.parse()?);
        }

        let message = builder.body(body)?;

        trace!(
            "sending email via {} ({:?})",
            cfg.smtp.host, cfg.smtp.connection_method
        );

        let transport = build_transport(&cfg.smtp)?;
        transport.send(message).await?;

        Ok(())
    }
}

impl Default for EmailNotifier {
    fn default() -> Self {
        Self::new()
    }
}

fn render_body(endpoint_name: &str, status: ProbeStatus, result: &ProbeResult) -> String {
    let latency = match result.latency_ms() {
        Some(ms) => format!("{ms}ms"),
        None => "n/a".to_string(),
    };

    format!(
        "Endpoint: {endpoint_name}\n\
         Status: {status}\n\
         Timestamp: {}\n\
         Latency: {latency}\n\
         Detail: {}\n",
        result.timestamp.to_rfc3339(),
        result.detail,
    )
}

fn build_transport(smtp: &SmtpConfig) -> anyhow::Result<AsyncSmtpTransport<Tokio1Executor>> {
    let mut builder = match smtp.connection_method {
        ConnectionMethod::Starttls => {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&smtp.host)?
        }
        ConnectionMethod::Ssl => AsyncSmtpTransport::<Tokio1Executor>::relay(&smtp.host)?,
        ConnectionMethod::Plain => {
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&smtp.host)
        }
    };

    builder = builder
        .port(smtp.port)
        .timeout(Some(Duration::from_secs(smtp.timeout_seconds)));

    if let Some((username, password)) = resolve_credentials(smtp) {
        builder = builder.credentials(Credentials::new(username, password));
    }

    Ok(builder.build())
}
