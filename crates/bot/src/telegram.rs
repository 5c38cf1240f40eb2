//! Telegram adapters for the engine's seams.
//!
//! - `TelegramTransport` implements `ChatTransport` on top of the Bot API
//! - `TelegramAlertSink` implements `NotificationSink` with an `AlertBot`
//! - `inbound_from_update` turns raw updates into `InboundEvent`s

use async_trait::async_trait;
use tracing::{error, info, warn};

use telegram_client::{
    AlertBot, ChatTarget, InlineKeyboardButton, InlineKeyboardMarkup, KeyboardButton, ReplyKeyboardMarkup,
    ReplyKeyboardRemove, ReplyMarkup, TelegramClient, TelegramError, Update,
};

use crate::reply::{Button, ChatId, Keyboard, MessageId, Reply};
use crate::transport::{ChatTransport, InboundEvent, NotificationSink, TransportError};

pub struct TelegramTransport {
    client: TelegramClient,
}

impl TelegramTransport {
    pub fn new(client: TelegramClient) -> Self {
        Self { client }
    }
}

fn inline_markup(rows: &[Vec<Button>]) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup {
        inline_keyboard: rows
            .iter()
            .map(|row| {
                row.iter()
                    .map(|button| InlineKeyboardButton {
                        text: button.label.clone(),
                        callback_data: button.intent.encode(),
                    })
                    .collect()
            })
            .collect(),
    }
}

fn reply_markup(keyboard: &Keyboard) -> ReplyMarkup {
    match keyboard {
        Keyboard::Inline(rows) => ReplyMarkup::Inline(inline_markup(rows)),
        Keyboard::Suggestions { rows, placeholder } => ReplyMarkup::Keyboard(ReplyKeyboardMarkup {
            keyboard: rows
                .iter()
                .map(|row| row.iter().map(|text| KeyboardButton { text: text.clone() }).collect())
                .collect(),
            one_time_keyboard: true,
            resize_keyboard: true,
            input_field_placeholder: placeholder.clone(),
        }),
        Keyboard::Remove => ReplyMarkup::Remove(ReplyKeyboardRemove {
            remove_keyboard: true,
        }),
    }
}

fn transport_error(message: Option<MessageId>, err: TelegramError) -> TransportError {
    match message {
        Some(message) if err.is_stale_edit() => TransportError::StaleMessage(message),
        _ => TransportError::Failed(err.to_string()),
    }
}

#[async_trait]
impl ChatTransport for TelegramTransport {
    async fn send(&self, chat: ChatId, reply: &Reply) -> Result<MessageId, TransportError> {
        let markup = reply.keyboard.as_ref().map(reply_markup);
        let message = self
            .client
            .send_message(&ChatTarget::Id(chat.0), &reply.text, markup.as_ref())
            .await
            .map_err(|e| transport_error(None, e))?;
        Ok(MessageId(message.message_id))
    }

    async fn edit(&self, chat: ChatId, message: MessageId, reply: &Reply) -> Result<(), TransportError> {
        // Only inline keyboards can be attached by an edit
        let markup = match &reply.keyboard {
            Some(Keyboard::Inline(rows)) => Some(inline_markup(rows)),
            _ => None,
        };
        self.client
            .edit_message_text(chat.0, message.0, &reply.text, markup.as_ref())
            .await
            .map_err(|e| transport_error(Some(message), e))
    }

    async fn clear_keyboard(&self, chat: ChatId, message: MessageId) -> Result<(), TransportError> {
        self.client
            .edit_message_reply_markup(chat.0, message.0, None)
            .await
            .map_err(|e| transport_error(Some(message), e))
    }
}

/// Alerts to a Telegram channel; delivery failures end up in the log
pub struct TelegramAlertSink {
    bot: AlertBot,
}

impl TelegramAlertSink {
    pub fn new(bot: AlertBot) -> Self {
        Self { bot }
    }
}

#[async_trait]
impl NotificationSink for TelegramAlertSink {
    async fn info(&self, message: &str) {
        info!(alert = true, "{}", message);
        if let Err(err) = self.bot.info(message).await {
            warn!(error = %err, "Could not deliver alert");
        }
    }

    async fn warning(&self, message: &str) {
        warn!(alert = true, "{}", message);
        if let Err(err) = self.bot.warning(message).await {
            warn!(error = %err, "Could not deliver alert");
        }
    }

    async fn error(&self, message: &str) {
        error!(alert = true, "{}", message);
        if let Err(err) = self.bot.error(message).await {
            warn!(error = %err, "Could not deliver alert");
        }
    }
}

/// An update, as far as the engine is concerned
#[derive(Debug, Clone, PartialEq)]
pub struct Inbound {
    pub event: Option<InboundEvent>,
    /// Button presses must be answered, even when there is nothing to dispatch
    pub callback_id: Option<String>,
}

/// Map a Bot API update; `None` for updates the bot has no use for
pub fn inbound_from_update(update: Update) -> Option<Inbound> {
    if let Some(query) = update.callback_query {
        let event = match (query.message, query.data) {
            (Some(message), Some(data)) => Some(InboundEvent::button(
                ChatId(message.chat.id),
                MessageId(message.message_id),
                data,
            )),
            _ => None,
        };
        return Some(Inbound {
            event,
            callback_id: Some(query.id),
        });
    }

    let message = update.message?;
    let text = message.text?;
    let chat = ChatId(message.chat.id);
    let event = match command_name(&text) {
        Some(name) => InboundEvent::command(chat, name),
        None => InboundEvent::text(chat, text),
    };
    Some(Inbound {
        event: Some(event),
        callback_id: None,
    })
}

/// `"/zoek@FilmBot extra"` -> `"zoek"`
fn command_name(text: &str) -> Option<String> {
    let first = text.trim_start().split_whitespace().next()?;
    let name = first.strip_prefix('/')?;
    let name = name.split('@').next().unwrap_or(name);
    (!name.is_empty()).then(|| name.to_lowercase())
}
