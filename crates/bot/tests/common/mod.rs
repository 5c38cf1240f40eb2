//! Shared fixtures for the engine tests: a transport that records what the
//! bot said, and an engine wired to an in-memory catalog.

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::NaiveDate;

use bot::engine::Result;
use bot::{
    ChatId, ChatTransport, ConversationEngine, EngineSettings, InboundEvent, Intent, Keyboard,
    MessageId, Outcome, Reply, TransportError,
};
use catalog::CatalogConfig;
use sources::InMemoryCatalog;
use sources::memory::item_html;

pub const CHAT: ChatId = ChatId(7);

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Send { message: MessageId, reply: Reply },
    Edit { message: MessageId, reply: Reply },
    Clear { message: MessageId },
}

#[derive(Default)]
pub struct RecordingTransport {
    calls: Mutex<Vec<Call>>,
    next_id: AtomicI64,
    stale_edits: AtomicBool,
}

impl RecordingTransport {
    /// Make every edit fail as if the message was deleted
    pub fn fail_edits(&self) {
        self.stale_edits.store(true, Ordering::SeqCst);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    /// Texts of all sent messages, in order
    pub fn sent_texts(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Send { reply, .. } => Some(reply.text),
                _ => None,
            })
            .collect()
    }

    pub fn last_sent(&self) -> Reply {
        self.calls()
            .into_iter()
            .rev()
            .find_map(|call| match call {
                Call::Send { reply, .. } => Some(reply),
                _ => None,
            })
            .expect("nothing was sent")
    }

    pub fn count_sent(&self, text: &str) -> usize {
        self.sent_texts().iter().filter(|t| t.as_str() == text).count()
    }

    pub fn cleared(&self) -> Vec<MessageId> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Clear { message } => Some(message),
                _ => None,
            })
            .collect()
    }

    /// Most recent message (sent or edited) that shows a button for `intent`
    pub fn message_offering(&self, intent: &Intent) -> Option<MessageId> {
        self.calls().into_iter().rev().find_map(|call| match call {
            Call::Send { message, reply } | Call::Edit { message, reply }
                if reply.intents().contains(&intent) =>
            {
                Some(message)
            }
            _ => None,
        })
    }

    /// Number of sent messages that list search results
    pub fn result_batches(&self) -> Vec<usize> {
        self.sent_texts()
            .iter()
            .map(|text| text.lines().filter(|l| l.contains(" imdb ")).count())
            .filter(|n| *n > 0)
            .collect()
    }
}

#[async_trait]
impl ChatTransport for RecordingTransport {
    async fn send(&self, _chat: ChatId, reply: &Reply) -> std::result::Result<MessageId, TransportError> {
        let message = MessageId(self.next_id.fetch_add(1, Ordering::SeqCst) + 100);
        self.calls.lock().unwrap().push(Call::Send {
            message,
            reply: reply.clone(),
        });
        Ok(message)
    }

    async fn edit(
        &self,
        _chat: ChatId,
        message: MessageId,
        reply: &Reply,
    ) -> std::result::Result<(), TransportError> {
        if self.stale_edits.load(Ordering::SeqCst) {
            return Err(TransportError::StaleMessage(message));
        }
        self.calls.lock().unwrap().push(Call::Edit {
            message,
            reply: reply.clone(),
        });
        Ok(())
    }

    async fn clear_keyboard(&self, _chat: ChatId, message: MessageId) -> std::result::Result<(), TransportError> {
        self.calls.lock().unwrap().push(Call::Clear { message });
        Ok(())
    }
}

pub fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 3, 15).unwrap()
}

pub struct Harness {
    pub engine: ConversationEngine,
    pub transport: Arc<RecordingTransport>,
    pub catalog: Arc<InMemoryCatalog>,
}

impl Harness {
    pub fn new(catalog: InMemoryCatalog) -> Self {
        Self::with_config(catalog, CatalogConfig::default())
    }

    pub fn with_config(catalog: InMemoryCatalog, config: CatalogConfig) -> Self {
        let transport = Arc::new(RecordingTransport::default());
        let catalog = Arc::new(catalog);
        let settings = EngineSettings {
            clock: Arc::new(today),
            ..EngineSettings::default()
        };
        let engine = ConversationEngine::new(config, catalog.clone(), transport.clone(), settings);
        Self {
            engine,
            transport,
            catalog,
        }
    }

    pub async fn command(&self, name: &str) -> Result<Outcome> {
        self.engine.handle(InboundEvent::command(CHAT, name)).await
    }

    pub async fn text(&self, text: &str) -> Result<Outcome> {
        self.engine.handle(InboundEvent::text(CHAT, text)).await
    }

    /// Press the button for `intent` on the latest message that shows it
    pub async fn press(&self, intent: Intent) -> Result<Outcome> {
        let message = self
            .transport
            .message_offering(&intent)
            .unwrap_or_else(|| panic!("no message offers {}", intent));
        self.press_on(message, intent).await
    }

    pub async fn press_on(&self, message: MessageId, intent: Intent) -> Result<Outcome> {
        self.engine
            .handle(InboundEvent::button(CHAT, message, intent.encode()))
            .await
    }

    /// Walk the search dialogue up to the first batch
    pub async fn search(&self, genres: &[&str], score: Option<u8>, year: Option<u16>) -> Result<Outcome> {
        self.command("zoek").await?;
        for genre in genres {
            self.press(Intent::SelectGenre(genre.to_string())).await?;
        }
        self.press(Intent::Continue).await?;
        self.press(Intent::SelectScore(score)).await?;
        self.press(Intent::SelectYear(year)).await
    }
}

pub fn has_inline_keyboard(reply: &Reply) -> bool {
    matches!(reply.keyboard, Some(Keyboard::Inline(_)))
}

/// `total` qualifying records spread over pages of `per_page`, best rated first
pub fn result_pages(total: usize, per_page: usize) -> Vec<String> {
    let titles: Vec<String> = (0..total).map(|i| format!("Movie {:03}", i)).collect();
    titles
        .chunks(per_page)
        .enumerate()
        .map(|(page, chunk)| {
            chunk
                .iter()
                .enumerate()
                .map(|(i, title)| {
                    let rank = page * per_page + i;
                    item_html(title, 9.5 - rank as f32 * 0.02, 5000, 2020)
                })
                .collect()
        })
        .collect()
}
