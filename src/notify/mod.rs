//! Outbound notifications to the operator.

pub mod telegram;

use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

pub use self::telegram::TelegramClient;

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("Bot API rejected the request: {0}")]
    Api(String),
}

/// A messaging transport that can deliver an HTML message to one chat.
#[async_trait]
pub trait Messenger: Send + Sync {
    async fn send_message(&self, chat_id: &str, html: &str) -> Result<(), NotifyError>;
}

/// Pushes messages to the single authorized recipient.
///
/// A notifier without a transport (no bot token) or without a recipient logs
/// and drops every message; monitoring keeps running either way. Delivery
/// failures are logged and never retried.
#[derive(Clone)]
pub struct Notifier {
    messenger: Option<Arc<dyn Messenger>>,
    recipient: Option<String>,
}

impl Notifier {
    pub fn new(messenger: Arc<dyn Messenger>, recipient: impl Into<String>) -> Self {
        Self {
            messenger: Some(messenger),
            recipient: Some(recipient.into()),
        }
    }

    pub fn disabled() -> Self {
        Self {
            messenger: None,
            recipient: None,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.messenger.is_some() && self.recipient.is_some()
    }

    /// Send `html` to the recipient. Returns whether it was delivered.
    pub async fn push(&self, html: &str) -> bool {
        let (Some(messenger), Some(recipient)) = (&self.messenger, &self.recipient) else {
            tracing::info!("Telegram is not configured, skipping notification");
            return false;
        };

        match messenger.send_message(recipient, html).await {
            Ok(()) => {
                tracing::info!("Notification sent");
                true
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to send notification");
                false
            }
        }
    }
}
