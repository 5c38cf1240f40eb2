//! Minimal Telegram Bot API client.
//!
//! This crate provides a Rust client for the handful of Bot API methods the
//! bot needs. It handles:
//! - Long polling for updates
//! - Sending and editing messages, with inline or reply keyboards
//! - Answering button presses
//! - Operational alerts to a separate channel (`AlertBot`)
//!
//! Every call is a JSON `POST` to `https://api.telegram.org/bot<token>/<method>`;
//! the API wraps results in `{"ok": true, "result": ...}`.

use thiserror::Error;

pub mod alert;
pub mod client;
pub mod types;

pub use alert::AlertBot;
pub use client::TelegramClient;
pub use types::*;

/// Errors that can occur when talking to the Bot API
#[derive(Error, Debug)]
pub enum TelegramError {
    #[error("Bot API request {method} failed: {reason}")]
    Transport { method: String, reason: String },

    #[error("Bot API error {code}: {description}")]
    Api { code: i32, description: String },

    #[error("Unexpected Bot API response for {method}: {reason}")]
    Decode { method: String, reason: String },
}

impl TelegramError {
    /// The token was rejected; retrying cannot help
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, TelegramError::Api { code: 401, .. })
    }

    /// The message to edit is gone or was not changed by the edit
    pub fn is_stale_edit(&self) -> bool {
        match self {
            TelegramError::Api { code: 400, description } => {
                description.contains("message to edit not found")
                    || description.contains("message is not modified")
                    || description.contains("message can't be edited")
            }
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, TelegramError>;
