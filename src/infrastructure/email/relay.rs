//! HTTP mail relay transport
//!
//! Posts each message as JSON to a relay endpoint (transactional mail API or
//! an internal SMTP gateway) authenticated with a bearer API key.

use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use tracing::{debug, warn};

use crate::application::ports::{EmailError, EmailMessage, EmailTransport};

#[derive(Debug, Serialize)]
struct Sender<'a> {
    name: &'a str,
    address: &'a str,
}

#[derive(Debug, Serialize)]
struct RelayPayload<'a> {
    from: Sender<'a>,
    to: &'a str,
    subject: &'a str,
    html: &'a str,
    text: &'a str,
}

#[derive(Clone)]
pub struct HttpRelayTransport {
    client: reqwest::Client,
    url: String,
    api_key: String,
    from_name: String,
    from_address: String,
}

impl HttpRelayTransport {
    pub fn new(
        url: impl Into<String>,
        api_key: impl Into<String>,
        from_name: impl Into<String>,
        from_address: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, EmailError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| EmailError::Transport(e.to_string()))?;

        Ok(Self {
            client,
            url: url.into(),
            api_key: api_key.into(),
            from_name: from_name.into(),
            from_address: from_address.into(),
        })
    }
}

#[async_trait]
impl EmailTransport for HttpRelayTransport {
    async fn send(&self, message: &EmailMessage) -> Result<(), EmailError> {
        let payload = RelayPayload {
            from: Sender {
                name: &self.from_name,
                address: &self.from_address,
            },
            to: &message.to,
            subject: &message.subject,
            html: &message.html_body,
            text: &message.text_body,
        };

        let response = self
            .client
            .post(&self.url)
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .await
            .map_err(|e| EmailError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            warn!(to = %message.to, status = status.as_u16(), "Mail relay rejected message");
            return Err(EmailError::Rejected {
                status: status.as_u16(),
            });
        }

        debug!(to = %message.to, "Mail relay accepted message");
        Ok(())
    }
}
