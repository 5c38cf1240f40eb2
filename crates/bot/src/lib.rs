//! # Bot Crate
//!
//! The chat side of the movie finder.
//!
//! ## Main Components
//!
//! - **engine**: Conversation state machines for `/zoek` and `/nieuw`
//! - **session**: Per-chat sessions and the store that holds them
//! - **intent**: Button payloads and slash commands
//! - **render**: Dutch texts and menus
//! - **transport**: `ChatTransport` / `NotificationSink` seams and inbound events
//! - **telegram**: Telegram implementations of the seams
//! - **dispatcher**: Long-poll loop with one worker per chat
//!
//! ## Example Usage
//!
//! ```ignore
//! let engine = ConversationEngine::new(config, catalog, transport, EngineSettings::default());
//! Dispatcher::new(client, engine, Duration::from_secs(2))
//!     .run(shutdown)
//!     .await?;
//! ```

pub mod dispatcher;
pub mod engine;
pub mod intent;
pub mod render;
pub mod reply;
pub mod session;
pub mod telegram;
pub mod transport;

pub use dispatcher::Dispatcher;
pub use engine::{Clock, ConversationEngine, EngineError, EngineSettings, Outcome};
pub use intent::{Command, Intent};
pub use reply::{Button, ChatId, Keyboard, MessageId, Reply};
pub use session::{ConversationState, SessionStore};
pub use telegram::{TelegramAlertSink, TelegramTransport};
pub use transport::{ChatTransport, EventKind, InboundEvent, LogSink, NotificationSink, TransportError};
