use std::future::Future;
use std::time::Duration;

use thiserror::Error;
use tracing::info;

use crate::mail::Mail;

#[derive(Debug, Error)]
pub enum MailError {
    #[error("relay request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("relay rejected mail ({status}): {body}")]
    Rejected { status: u16, body: String },

    #[error("mail has no recipient")]
    NoRecipient,
}

/// Something that can deliver a [`Mail`].
pub trait MailTransport: Send + Sync + 'static {
    fn send(&self, mail: &Mail) -> impl Future<Output = Result<(), MailError>> + Send;
}

/// Hands mail to an HTTP relay as JSON. Any non-2xx answer is a failure.
#[derive(Clone)]
pub struct RelayTransport {
    client: reqwest::Client,
    url: String,
}

impl RelayTransport {
    pub fn new(url: impl Into<String>) -> Result<Self, MailError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }
}

impl MailTransport for RelayTransport {
    async fn send(&self, mail: &Mail) -> Result<(), MailError> {
        if mail.recipient.is_empty() {
            return Err(MailError::NoRecipient);
        }

        let resp = self.client.post(&self.url).json(mail).send().await?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(MailError::Rejected { status, body });
        }

        Ok(())
    }
}

/// Writes mail to the log instead of delivering it.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogTransport;

impl MailTransport for LogTransport {
    async fn send(&self, mail: &Mail) -> Result<(), MailError> {
        if mail.recipient.is_empty() {
            return Err(MailError::NoRecipient);
        }

        info!(
            to = %mail.recipient,
            subject = %mail.subject,
            "Mail (log transport):\n{}",
            mail.message
        );
        Ok(())
    }
}
