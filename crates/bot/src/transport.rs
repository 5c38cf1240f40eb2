//! Seams to the outside world.
//!
//! - `ChatTransport`: how replies reach the user
//! - `NotificationSink`: where operational alerts go
//! - `InboundEvent`: what the user did, already stripped of transport detail

use async_trait::async_trait;
use thiserror::Error;
use tracing::{error, info, warn};

use crate::reply::{ChatId, MessageId, Reply};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum TransportError {
    /// The message cannot be edited anymore (deleted, too old, unchanged)
    #[error("message {0} can no longer be edited")]
    StaleMessage(MessageId),

    #[error("chat transport failed: {0}")]
    Failed(String),
}

/// Outbound side of the chat
#[async_trait]
pub trait ChatTransport: Send + Sync {
    /// Send a new message
    async fn send(&self, chat: ChatId, reply: &Reply) -> Result<MessageId, TransportError>;

    /// Replace the text and inline keyboard of an earlier message
    async fn edit(&self, chat: ChatId, message: MessageId, reply: &Reply) -> Result<(), TransportError>;

    /// Drop the inline keyboard of an earlier message, keeping its text
    async fn clear_keyboard(&self, chat: ChatId, message: MessageId) -> Result<(), TransportError>;
}

/// Operational alerts.
///
/// Alerts are fire-and-forget: implementations report their own delivery
/// problems and never fail the caller.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn info(&self, message: &str);
    async fn warning(&self, message: &str);
    async fn error(&self, message: &str);
}

/// Sink used when no alert channel is configured
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

#[async_trait]
impl NotificationSink for LogSink {
    async fn info(&self, message: &str) {
        info!(alert = true, "{}", message);
    }

    async fn warning(&self, message: &str) {
        warn!(alert = true, "{}", message);
    }

    async fn error(&self, message: &str) {
        error!(alert = true, "{}", message);
    }
}

/// One thing a user did in a chat
#[derive(Debug, Clone, PartialEq)]
pub struct InboundEvent {
    pub chat: ChatId,
    pub kind: EventKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum EventKind {
    /// Slash command, name without the slash or `@botname` suffix
    Command(String),
    /// Free text
    Text(String),
    /// Inline button press on `message` with the button's raw payload
    Button { message: MessageId, data: String },
}

impl InboundEvent {
    pub fn command(chat: ChatId, name: impl Into<String>) -> Self {
        Self {
            chat,
            kind: EventKind::Command(name.into()),
        }
    }

    pub fn text(chat: ChatId, text: impl Into<String>) -> Self {
        Self {
            chat,
            kind: EventKind::Text(text.into()),
        }
    }

    pub fn button(chat: ChatId, message: MessageId, data: impl Into<String>) -> Self {
        Self {
            chat,
            kind: EventKind::Button {
                message,
                data: data.into(),
            },
        }
    }
}
