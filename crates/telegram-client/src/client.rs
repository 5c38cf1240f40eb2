//! Bot API client over reqwest.

use std::time::Duration;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::json;
use tracing::{debug, info};

use crate::types::{ApiResponse, ChatTarget, InlineKeyboardMarkup, Message, ReplyMarkup, Update};
use crate::{Result, TelegramError};

const API_ROOT: &str = "https://api.telegram.org";

/// Head room on top of the long-poll timeout before a request is abandoned
const POLL_GRACE: Duration = Duration::from_secs(10);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Client for one bot token.
///
/// Cheap to clone; clones share the connection pool.
#[derive(Clone)]
pub struct TelegramClient {
    http: reqwest::Client,
    token: String,
}

impl std::fmt::Debug for TelegramClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramClient")
            .field("token", &"<secret>")
            .finish()
    }
}

impl TelegramClient {
    /// Create a client for a bot token.
    ///
    /// # Errors
    /// `TelegramError::Transport` when the HTTP client cannot be built.
    pub fn new(token: impl Into<String>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| TelegramError::Transport {
                method: "client".to_string(),
                reason: e.to_string(),
            })?;

        Ok(Self {
            http,
            token: token.into(),
        })
    }

    /// Long-poll for updates after `offset`.
    ///
    /// # Arguments
    /// * `offset` - One more than the highest `update_id` already handled
    /// * `timeout` - How long the server may hold the request open
    pub async fn get_updates(&self, offset: i64, timeout: Duration) -> Result<Vec<Update>> {
        let body = json!({
            "offset": offset,
            "timeout": timeout.as_secs(),
            "allowed_updates": ["message", "callback_query"],
        });
        self.call_with_timeout("getUpdates", &body, timeout + POLL_GRACE)
            .await
    }

    pub async fn send_message(
        &self,
        chat_id: &ChatTarget,
        text: &str,
        reply_markup: Option<&ReplyMarkup>,
    ) -> Result<Message> {
        let body = SendMessage {
            chat_id,
            text,
            reply_markup,
            disable_web_page_preview: true,
        };
        self.call("sendMessage", &body).await
    }

    /// Replace the text (and inline keyboard) of a message sent earlier
    pub async fn edit_message_text(
        &self,
        chat_id: i64,
        message_id: i64,
        text: &str,
        reply_markup: Option<&InlineKeyboardMarkup>,
    ) -> Result<()> {
        let body = json!({
            "chat_id": chat_id,
            "message_id": message_id,
            "text": text,
            "reply_markup": reply_markup.cloned().unwrap_or_else(InlineKeyboardMarkup::empty),
            "disable_web_page_preview": true,
        });
        // Returns the edited Message, which we have no use for
        self.call::<serde_json::Value, _>("editMessageText", &body)
            .await
            .map(|_| ())
    }

    /// Replace or (with `None`) drop the inline keyboard of a message
    pub async fn edit_message_reply_markup(
        &self,
        chat_id: i64,
        message_id: i64,
        reply_markup: Option<&InlineKeyboardMarkup>,
    ) -> Result<()> {
        let body = json!({
            "chat_id": chat_id,
            "message_id": message_id,
            "reply_markup": reply_markup.cloned().unwrap_or_else(InlineKeyboardMarkup::empty),
        });
        self.call::<serde_json::Value, _>("editMessageReplyMarkup", &body)
            .await
            .map(|_| ())
    }

    /// Stop the client's loading indicator for a button press
    pub async fn answer_callback_query(&self, callback_query_id: &str) -> Result<()> {
        let body = json!({ "callback_query_id": callback_query_id });
        self.call::<bool, _>("answerCallbackQuery", &body)
            .await
            .map(|_| ())
    }

    /// Check the token; returns the bot's username
    pub async fn get_me(&self) -> Result<String> {
        let me: serde_json::Value = self.call("getMe", &json!({})).await?;
        let username = me["username"].as_str().unwrap_or_default().to_string();
        info!("Authorized as @{}", username);
        Ok(username)
    }

    async fn call<T, B>(&self, method: &str, body: &B) -> Result<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.call_with_timeout(method, body, REQUEST_TIMEOUT).await
    }

    async fn call_with_timeout<T, B>(&self, method: &str, body: &B, timeout: Duration) -> Result<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let url = format!("{}/bot{}/{}", API_ROOT, self.token, method);
        debug!("Calling {}", method);

        let response = self
            .http
            .post(&url)
            .timeout(timeout)
            .json(body)
            .send()
            .await
            .map_err(|e| TelegramError::Transport {
                method: method.to_string(),
                // reqwest errors include the URL, which contains the token
                reason: e.without_url().to_string(),
            })?;

        let body = response.text().await.map_err(|e| TelegramError::Transport {
            method: method.to_string(),
            reason: e.without_url().to_string(),
        })?;

        decode_response(method, &body)
    }
}

#[derive(Serialize)]
struct SendMessage<'a> {
    chat_id: &'a ChatTarget,
    text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    reply_markup: Option<&'a ReplyMarkup>,
    disable_web_page_preview: bool,
}

/// Unwrap the `{"ok": ..., "result": ...}` envelope
fn decode_response<T: DeserializeOwned>(method: &str, body: &str) -> Result<T> {
    let response: ApiResponse<T> =
        serde_json::from_str(body).map_err(|e| TelegramError::Decode {
            method: method.to_string(),
            reason: e.to_string(),
        })?;

    if !response.ok {
        return Err(TelegramError::Api {
            code: response.error_code.unwrap_or_default(),
            description: response.description.unwrap_or_default(),
        });
    }

    response.result.ok_or_else(|| TelegramError::Decode {
        method: method.to_string(),
        reason: "ok response without result".to_string(),
    })
}
