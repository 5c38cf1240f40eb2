//! What the engine says back: text plus an optional keyboard.

use std::fmt;

use crate::intent::Intent;

/// Chat (private conversation or group) a session belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChatId(pub i64);

/// Message previously sent by the bot, for later edits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MessageId(pub i64);

impl fmt::Display for ChatId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Inline choice attached to a message
#[derive(Debug, Clone, PartialEq)]
pub struct Button {
    pub label: String,
    pub intent: Intent,
}

impl Button {
    pub fn new(label: impl Into<String>, intent: Intent) -> Self {
        Self {
            label: label.into(),
            intent,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Keyboard {
    /// Buttons under the message, one inner Vec per row
    Inline(Vec<Vec<Button>>),
    /// One-shot suggestions replacing the user's keyboard
    Suggestions {
        rows: Vec<Vec<String>>,
        placeholder: Option<String>,
    },
    /// Take away a suggestion keyboard shown earlier
    Remove,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Reply {
    pub text: String,
    pub keyboard: Option<Keyboard>,
}

impl Reply {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            keyboard: None,
        }
    }

    pub fn with_buttons(text: impl Into<String>, rows: Vec<Vec<Button>>) -> Self {
        Self {
            text: text.into(),
            keyboard: Some(Keyboard::Inline(rows)),
        }
    }

    pub fn with_keyboard(mut self, keyboard: Keyboard) -> Self {
        self.keyboard = Some(keyboard);
        self
    }

    /// Intents offered by this reply's inline buttons
    pub fn intents(&self) -> Vec<&Intent> {
        match &self.keyboard {
            Some(Keyboard::Inline(rows)) => rows.iter().flatten().map(|b| &b.intent).collect(),
            _ => Vec::new(),
        }
    }
}
