//! Outbound email transports

pub mod log_transport;
pub mod memory;
pub mod relay;
pub mod templates;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{error, info, warn};

use crate::application::ports::{EmailError, EmailMessage, EmailTransport};
use crate::config::EmailConfig;

pub use log_transport::LogTransport;
pub use memory::RecordingTransport;
pub use relay::HttpRelayTransport;

/// Sends every message to a fixed address, keeping the intended
/// recipient in the subject line.
pub struct RedirectingTransport {
    inner: Arc<dyn EmailTransport>,
    recipient: String,
}

impl RedirectingTransport {
    pub fn new(inner: Arc<dyn EmailTransport>, recipient: impl Into<String>) -> Self {
        Self {
            inner,
            recipient: recipient.into(),
        }
    }
}

#[async_trait]
impl EmailTransport for RedirectingTransport {
    async fn send(&self, message: &EmailMessage) -> Result<(), EmailError> {
        let redirected = EmailMessage {
            to: self.recipient.clone(),
            subject: format!("[to: {}] {}", message.to, message.subject),
            html_body: message.html_body.clone(),
            text_body: message.text_body.clone(),
        };
        self.inner.send(&redirected).await
    }
}

/// Stand-in used outside development when no relay is configured. Every
/// send fails, so callers report the delivery failure.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnconfiguredTransport;

#[async_trait]
impl EmailTransport for UnconfiguredTransport {
    async fn send(&self, message: &EmailMessage) -> Result<(), EmailError> {
        error!(to = %message.to, "Email not sent: no mail relay configured");
        Err(EmailError::Transport("no mail relay configured".into()))
    }
}

/// Pick the transport described by the email config.
///
/// Without a relay, messages are logged in development and refused
/// everywhere else.
pub fn build_transport(
    config: &EmailConfig,
    development: bool,
) -> Result<Arc<dyn EmailTransport>, EmailError> {
    let base: Arc<dyn EmailTransport> = match config.relay_url.as_deref() {
        Some(url) if !url.trim().is_empty() => {
            info!(relay = %url, "📧 Using HTTP mail relay");
            Arc::new(HttpRelayTransport::new(
                url,
                config.api_key.clone(),
                config.from_name.clone(),
                config.from_address.clone(),
                Duration::from_secs(config.timeout_secs),
            )?)
        }
        _ if development => {
            warn!("No mail relay configured; emails will be logged only");
            Arc::new(LogTransport)
        }
        _ => {
            error!("No mail relay configured; outgoing email is disabled");
            Arc::new(UnconfiguredTransport)
        }
    };

    match config.test_recipient.as_deref() {
        Some(to) if !to.trim().is_empty() => {
            info!(recipient = %to, "All outgoing email redirected to test recipient");
            Ok(Arc::new(RedirectingTransport::new(base, to.trim())))
        }
        _ => Ok(base),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn redirecting_transport_rewrites_recipient() {
        let recorder = Arc::new(RecordingTransport::new());
        let transport = RedirectingTransport::new(recorder.clone(), "qa@example.com");

        let msg = EmailMessage {
            to: "alice@example.com".into(),
            subject: "Your OTP".into(),
            html_body: String::new(),
            text_body: "123456".into(),
        };
        transport.send(&msg).await.unwrap();

        let sent = recorder.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].to, "qa@example.com");
        assert!(sent[0].subject.contains("alice@example.com"));
    }

    fn otp_message() -> EmailMessage {
        EmailMessage {
            to: "bob@example.com".into(),
            subject: "Your login code".into(),
            html_body: String::new(),
            text_body: "Your code is 123456".into(),
        }
    }

    #[tokio::test]
    async fn development_without_relay_logs_messages() {
        let transport = build_transport(&EmailConfig::default(), true).unwrap();
        assert!(transport.send(&otp_message()).await.is_ok());
    }

    #[tokio::test]
    async fn production_without_relay_refuses_to_send() {
        let transport = build_transport(&EmailConfig::default(), false).unwrap();
        let err = transport.send(&otp_message()).await.unwrap_err();
        assert!(matches!(err, EmailError::Transport(_)));

        let config = EmailConfig {
            test_recipient: Some("qa@example.com".into()),
            ..EmailConfig::default()
        };
        let redirected = build_transport(&config, false).unwrap();
        assert!(redirected.send(&otp_message()).await.is_err());
    }

    #[tokio::test]
    async fn blank_relay_url_counts_as_missing() {
        let config = EmailConfig {
            relay_url: Some("   ".into()),
            ..EmailConfig::default()
        };
        let transport = build_transport(&config, false).unwrap();
        assert!(transport.send(&otp_message()).await.is_err());
    }
}
