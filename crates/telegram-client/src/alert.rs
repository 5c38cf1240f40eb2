//! Operational alerts to a Telegram channel.
//!
//! Every alert reads `"<program> (<instance>) | <icon> <message>"` and is
//! split into consecutive messages when it exceeds Telegram's 4096
//! character limit.

use tracing::info;

use crate::client::TelegramClient;
use crate::types::ChatTarget;
use crate::Result;

/// Telegram's maximum message length, in characters
pub const MAX_MESSAGE_CHARS: usize = 4096;

const INFO_ICON: char = '\u{2139}';
const WARNING_ICON: char = '\u{26A0}';
const ERROR_ICON: char = '\u{2757}';

pub struct AlertBot {
    client: TelegramClient,
    chat_id: ChatTarget,
    program_name: String,
    instance_name: String,
}

impl std::fmt::Debug for AlertBot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AlertBot")
            .field("chat_id", &self.chat_id)
            .field("program_name", &self.program_name)
            .field("instance_name", &self.instance_name)
            .finish_non_exhaustive()
    }
}

impl AlertBot {
    pub fn new(
        client: TelegramClient,
        chat_id: ChatTarget,
        program_name: impl Into<String>,
        instance_name: impl Into<String>,
    ) -> Self {
        let bot = Self {
            client,
            chat_id,
            program_name: program_name.into(),
            instance_name: instance_name.into(),
        };
        info!("AlertBot initialized: {:?}", bot);
        bot
    }

    pub async fn info(&self, message: &str) -> Result<()> {
        self.send(INFO_ICON, message).await
    }

    pub async fn warning(&self, message: &str) -> Result<()> {
        self.send(WARNING_ICON, message).await
    }

    pub async fn error(&self, message: &str) -> Result<()> {
        self.send(ERROR_ICON, message).await
    }

    async fn send(&self, icon: char, message: &str) -> Result<()> {
        let text = format_alert(&self.program_name, &self.instance_name, icon, message);
        for chunk in split_chunks(&text, MAX_MESSAGE_CHARS) {
            self.client.send_message(&self.chat_id, chunk, None).await?;
        }
        Ok(())
    }
}

fn format_alert(program: &str, instance: &str, icon: char, message: &str) -> String {
    format!("{} ({}) | {} {}", program, instance, icon, message)
}

/// Split `text` into pieces of at most `max_chars` characters.
///
/// Splits on character boundaries, never inside a UTF-8 sequence.
pub fn split_chunks(text: &str, max_chars: usize) -> Vec<&str> {
    let mut chunks = Vec::new();
    let mut rest = text;
    while !rest.is_empty() {
        let end = rest
            .char_indices()
            .nth(max_chars)
            .map(|(idx, _)| idx)
            .unwrap_or(rest.len());
        let (chunk, tail) = rest.split_at(end);
        chunks.push(chunk);
        rest = tail;
    }
    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alert_format() {
        assert_eq!(
            format_alert("fv-bot", "prod", INFO_ICON, "Program started."),
            "fv-bot (prod) | \u{2139} Program started."
        );
    }

    #[test]
    fn test_short_message_is_one_chunk() {
        assert_eq!(split_chunks("hello", MAX_MESSAGE_CHARS), vec!["hello"]);
        assert!(split_chunks("", MAX_MESSAGE_CHARS).is_empty());
    }

    #[test]
    fn test_long_message_split_at_limit() {
        let text = "x".repeat(MAX_MESSAGE_CHARS * 2 + 10);
        let chunks = split_chunks(&text, MAX_MESSAGE_CHARS);
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].len(), MAX_MESSAGE_CHARS);
        assert_eq!(chunks[2].len(), 10);
        assert_eq!(chunks.concat(), text);
    }

    #[test]
    fn test_split_counts_characters_not_bytes() {
        let text = "\u{2757}".repeat(5);
        let chunks = split_chunks(&text, 2);
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].chars().count(), 2);
        assert_eq!(chunks[2].chars().count(), 1);
    }
}
