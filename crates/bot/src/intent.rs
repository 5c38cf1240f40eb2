//! User intents and commands.
//!
//! Buttons carry an `Intent` encoded as a short payload string:
//!
//! | intent               | payload         |
//! |----------------------|-----------------|
//! | `SelectGenre(tag)`   | `genre:<tag>`   |
//! | `Continue`           | `continue`      |
//! | `SelectScore(n)`     | `score:<n|any>` |
//! | `SelectYear(y)`      | `year:<y|any>`  |
//! | `ShowMore(batch)`    | `more:<batch>`  |
//! | `Cancel`             | `cancel`        |
//!
//! Telegram limits payloads to 64 bytes, well above what these need.

use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
    SelectGenre(String),
    /// Done picking genres
    Continue,
    /// `None` is "no preference"
    SelectScore(Option<u8>),
    /// `None` is "no preference"
    SelectYear(Option<u16>),
    /// Next batch; carries the ordinal of the batch the button was shown under
    ShowMore(u32),
    Cancel,
}

impl Intent {
    pub fn encode(&self) -> String {
        match self {
            Intent::SelectGenre(tag) => format!("genre:{}", tag),
            Intent::Continue => "continue".to_string(),
            Intent::SelectScore(score) => format!("score:{}", or_any(*score)),
            Intent::SelectYear(year) => format!("year:{}", or_any(*year)),
            Intent::ShowMore(batch) => format!("more:{}", batch),
            Intent::Cancel => "cancel".to_string(),
        }
    }

    /// Parse a button payload; anything we did not produce gives `None`
    pub fn decode(payload: &str) -> Option<Intent> {
        match payload.split_once(':') {
            None => match payload {
                "continue" => Some(Intent::Continue),
                "cancel" => Some(Intent::Cancel),
                _ => None,
            },
            Some(("genre", tag)) if !tag.is_empty() => Some(Intent::SelectGenre(tag.to_string())),
            Some(("score", value)) => parse_or_any(value).map(Intent::SelectScore),
            Some(("year", value)) => parse_or_any(value).map(Intent::SelectYear),
            Some(("more", batch)) => batch.parse().ok().map(Intent::ShowMore),
            _ => None,
        }
    }
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}

fn or_any<T: ToString>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_else(|| "any".to_string())
}

/// `Some(None)` for "any", `Some(Some(n))` for a number, `None` otherwise
fn parse_or_any<T: std::str::FromStr>(value: &str) -> Option<Option<T>> {
    if value == "any" {
        return Some(None);
    }
    value.parse().ok().map(Some)
}

/// Slash commands the bot answers to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// `/zoek`: start a filtered search
    Search,
    /// `/new`, `/nieuw`: recent additions per service
    NewReleases,
    Cancel,
    /// `/start`, `/help`
    Help,
}

impl Command {
    /// Map a command name (without the slash) to a command
    pub fn from_name(name: &str) -> Option<Command> {
        match name.to_lowercase().as_str() {
            "zoek" => Some(Command::Search),
            "new" | "nieuw" => Some(Command::NewReleases),
            "cancel" => Some(Command::Cancel),
            "start" | "help" => Some(Command::Help),
            _ => None,
        }
    }
}
