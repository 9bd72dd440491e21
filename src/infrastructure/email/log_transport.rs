//! Development transport: logs the message instead of sending it

use async_trait::async_trait;
use tracing::info;

use crate::application::ports::{EmailError, EmailMessage, EmailTransport};

#[derive(Debug, Default, Clone, Copy)]
pub struct LogTransport;

#[async_trait]
impl EmailTransport for LogTransport {
    async fn send(&self, message: &EmailMessage) -> Result<(), EmailError> {
        info!(
            to = %message.to,
            subject = %message.subject,
            body = %message.text_body,
            "Email relay not configured; message logged instead of sent"
        );
        Ok(())
    }
}
