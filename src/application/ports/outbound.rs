//! Outbound ports: interfaces for talking to the outside world
//!
//! [`EmailTransport`] is the contract used to deliver OTP and welcome
//! messages. Implementations live in `infrastructure::email`.

use async_trait::async_trait;
use thiserror::Error;

/// A fully rendered message ready for delivery
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailMessage {
    pub to: String,
    pub subject: String,
    pub html_body: String,
    pub text_body: String,
}

#[derive(Debug, Error)]
pub enum EmailError {
    #[error("Email transport error: {0}")]
    Transport(String),

    #[error("Email relay rejected message with HTTP {status}")]
    Rejected { status: u16 },
}

#[async_trait]
pub trait EmailTransport: Send + Sync {
    async fn send(&self, message: &EmailMessage) -> Result<(), EmailError>;
}
