use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tracing::info;

use crate::error::AppError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingMail {
    pub to: String,
    pub subject: String,
    pub body: String,
}

/// Outbound mail delivery.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, mail: OutgoingMail) -> Result<(), AppError>;
}

/// Writes mail to the log instead of delivering it.
#[derive(Clone, Default)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, mail: OutgoingMail) -> Result<(), AppError> {
        info!(to = %mail.to, subject = %mail.subject, body = %mail.body, "mail not delivered, no transport configured");
        Ok(())
    }
}

/// Keeps sent mail in memory so it can be inspected later.
#[derive(Clone, Default)]
pub struct MemoryMailer {
    sent: Arc<Mutex<Vec<OutgoingMail>>>,
}

impl MemoryMailer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<OutgoingMail> {
        self.sent
            .lock()
            .map(|sent| sent.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl Mailer for MemoryMailer {
    async fn send(&self, mail: OutgoingMail) -> Result<(), AppError> {
        self.sent
            .lock()
            .map_err(|_| AppError::Other(anyhow::anyhow!("mail outbox poisoned")))?
            .push(mail);
        Ok(())
    }
}
