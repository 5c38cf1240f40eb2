//! # Conversation Engine
//!
//! Drives both dialogues, one chat at a time:
//!
//! ```text
//! /zoek   AwaitingGenres -> AwaitingMinScore -> AwaitingMinYear -> DeliveringResults -> Done
//! /nieuw  AwaitingServices -> Done
//!         any non-terminal state --cancel--> Cancelled
//!         any non-terminal state --idle----> TimedOut
//! ```
//!
//! ## Turn structure
//! Every input goes through the same steps:
//! 1. Look up the chat's session (buttons without one are `SessionNotFound`)
//! 2. Lock it for the whole turn
//! 3. Stop the idle timer, apply the input, render the result
//! 4. Terminal state: drop the session from the store. Otherwise: re-arm the timer
//!
//! Repeating an input the session is already past ("continue" twice, an old
//! "more" button) changes nothing and fetches nothing.
//!
//! ## Learning Goals
//! - Per-key locking with `Arc<tokio::sync::Mutex<_>>` inside a `DashMap`
//! - Cancellable timers with `tokio::select!` and `CancellationToken`
//! - `Weak` references so pending timers do not keep the engine alive

use std::fmt;
use std::sync::{Arc, Weak};
use std::time::Duration;

use chrono::{Datelike, Local, NaiveDate};
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

use catalog::types::{CATALOG_MAX_SCORE, CATALOG_MIN_YEAR};
use catalog::{CatalogConfig, CatalogError};
use sources::{BatchEnd, CatalogClient, NewReleasesSource, SearchSource, next_batch};

use crate::intent::{Command, Intent};
use crate::render;
use crate::reply::{ChatId, Keyboard, MessageId, Reply};
use crate::session::{ConversationState, Session, SessionHandle, SessionStore};
use crate::transport::{ChatTransport, EventKind, InboundEvent, TransportError};

/// Source of "today", in the catalog's time zone
pub type Clock = Arc<dyn Fn() -> NaiveDate + Send + Sync>;

/// Default number of records per batch
pub const DEFAULT_BATCH_SIZE: usize = 20;

/// Default idle window before a session is timed out
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Clone)]
pub struct EngineSettings {
    pub batch_size: usize,
    pub idle_timeout: Duration,
    pub clock: Clock,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            idle_timeout: DEFAULT_IDLE_TIMEOUT,
            clock: Arc::new(|| Local::now().date_naive()),
        }
    }
}

impl fmt::Debug for EngineSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EngineSettings")
            .field("batch_size", &self.batch_size)
            .field("idle_timeout", &self.idle_timeout)
            .finish_non_exhaustive()
    }
}

#[derive(Error, Debug)]
pub enum EngineError {
    /// Input for a chat without an active conversation (expired, cancelled, finished)
    #[error("no active session for chat {0}")]
    SessionNotFound(ChatId),

    #[error("{intent} is not expected while {state}")]
    IllegalIntent {
        intent: Intent,
        state: ConversationState,
    },

    #[error("invalid search: {0}")]
    Filter(#[from] CatalogError),

    #[error(transparent)]
    Transport(#[from] TransportError),
}

pub type Result<T> = std::result::Result<T, EngineError>;

/// What handling one input did
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// The session is now in this state (possibly the same one, re-rendered)
    Entered(ConversationState),
    /// Nothing changed: a repeated or outdated input
    Unchanged(ConversationState),
    /// Free-text services were not understood; still awaiting services
    Reprompted { unrecognized: Vec<String> },
    /// Answered without touching any session
    Replied,
    /// Not meant for us
    Ignored,
}

/// Position of an intent in the search dialogue
fn intent_step(intent: &Intent) -> u8 {
    match intent {
        Intent::SelectGenre(_) | Intent::Continue | Intent::Cancel => 0,
        Intent::SelectScore(_) => 1,
        Intent::SelectYear(_) => 2,
        Intent::ShowMore(_) => 3,
    }
}

fn state_step(state: ConversationState) -> u8 {
    match state {
        ConversationState::AwaitingMinScore => 1,
        ConversationState::AwaitingMinYear => 2,
        ConversationState::DeliveringResults => 3,
        _ => 0,
    }
}

struct Inner {
    config: CatalogConfig,
    search: SearchSource,
    new_releases: NewReleasesSource,
    transport: Arc<dyn ChatTransport>,
    sessions: SessionStore,
    settings: EngineSettings,
}

/// Cheap to clone; clones share sessions
#[derive(Clone)]
pub struct ConversationEngine {
    inner: Arc<Inner>,
}

impl ConversationEngine {
    /// Create an engine
    ///
    /// # Arguments
    /// * `config` - Services, genres and thresholds, already validated
    /// * `catalog` - Where search pages and listings come from
    /// * `transport` - Where replies go
    /// * `settings` - Batch size, idle timeout and clock
    pub fn new(
        config: CatalogConfig,
        catalog: Arc<dyn CatalogClient>,
        transport: Arc<dyn ChatTransport>,
        mut settings: EngineSettings,
    ) -> Self {
        settings.batch_size = settings.batch_size.max(1);
        let search = SearchSource::new(Arc::clone(&catalog), &config);
        let new_releases = NewReleasesSource::new(catalog, &config);

        Self {
            inner: Arc::new(Inner {
                config,
                search,
                new_releases,
                transport,
                sessions: SessionStore::new(),
                settings,
            }),
        }
    }

    pub fn config(&self) -> &CatalogConfig {
        &self.inner.config
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.inner.sessions
    }

    /// State of the chat's active session, if any
    pub async fn session_state(&self, chat: ChatId) -> Option<ConversationState> {
        let handle = self.inner.sessions.get(chat)?;
        let session = handle.lock().await;
        Some(session.state)
    }

    /// Handle one input. Must not be called concurrently for the same chat.
    #[instrument(skip(self, event), fields(chat = %event.chat))]
    pub async fn handle(&self, event: InboundEvent) -> Result<Outcome> {
        let chat = event.chat;
        match event.kind {
            EventKind::Command(name) => match Command::from_name(&name) {
                Some(Command::Search) => self.start_search(chat).await,
                Some(Command::NewReleases) => self.start_new_releases(chat).await,
                Some(Command::Cancel) => self.cancel(chat).await,
                Some(Command::Help) => {
                    self.inner.transport.send(chat, &render::help()).await?;
                    Ok(Outcome::Replied)
                }
                None => {
                    debug!("Unknown command /{}", name);
                    Ok(Outcome::Ignored)
                }
            },
            EventKind::Text(text) => self.handle_text(chat, &text).await,
            EventKind::Button { message, data } => match Intent::decode(&data) {
                Some(intent) => self.handle_intent(chat, message, intent).await,
                None => {
                    debug!("Ignoring unknown button payload '{}'", data);
                    Ok(Outcome::Ignored)
                }
            },
        }
    }

    // ========================================================================
    // Entry points
    // ========================================================================

    /// Start the search dialogue, replacing any active session
    pub async fn start_search(&self, chat: ChatId) -> Result<Outcome> {
        let prompt = render::genre_prompt(&self.inner.config, &Default::default());
        self.start_session(chat, ConversationState::AwaitingGenres, prompt)
            .await
    }

    /// Start the new-releases dialogue, replacing any active session
    pub async fn start_new_releases(&self, chat: ChatId) -> Result<Outcome> {
        let prompt = render::services_prompt(&self.inner.config);
        self.start_session(chat, ConversationState::AwaitingServices, prompt)
            .await
    }

    /// Cancel the chat's active session
    pub async fn cancel(&self, chat: ChatId) -> Result<Outcome> {
        let handle = self
            .inner
            .sessions
            .get(chat)
            .ok_or(EngineError::SessionNotFound(chat))?;
        let mut session = handle.lock().await;
        if session.state.is_terminal() {
            return Err(EngineError::SessionNotFound(chat));
        }

        session.cancel_timer();
        let result = self.cancel_session(&mut session).await;
        self.end_turn(&handle, &mut session);
        result
    }

    async fn start_session(
        &self,
        chat: ChatId,
        state: ConversationState,
        prompt: Reply,
    ) -> Result<Outcome> {
        let (handle, previous) = self.inner.sessions.insert(Session::new(chat, state));
        let mut session = handle.lock().await;

        if let Some(previous) = previous {
            self.retire(previous).await;
        }

        match self.inner.transport.send(chat, &prompt).await {
            Ok(message) => {
                if matches!(prompt.keyboard, Some(Keyboard::Inline(_))) {
                    session.prompt = Some(message);
                }
            }
            Err(err) => {
                session.finish(ConversationState::Cancelled);
                self.end_turn(&handle, &mut session);
                return Err(err.into());
            }
        }

        info!(chat = %chat, state = %state, "Session started");
        self.end_turn(&handle, &mut session);
        Ok(Outcome::Entered(state))
    }

    /// Silently end a session that a new command replaced
    async fn retire(&self, previous: SessionHandle) {
        let mut session = previous.lock().await;
        if session.state.is_terminal() {
            return;
        }

        debug!(chat = %session.chat, state = %session.state, "Replacing active session");
        let prompt = session.prompt.take();
        session.finish(ConversationState::Cancelled);
        if let Some(message) = prompt {
            self.clear_keyboard(session.chat, message).await;
        }
    }

    // ========================================================================
    // Turns
    // ========================================================================

    async fn handle_intent(&self, chat: ChatId, message: MessageId, intent: Intent) -> Result<Outcome> {
        let handle = self
            .inner
            .sessions
            .get(chat)
            .ok_or(EngineError::SessionNotFound(chat))?;
        let mut session = handle.lock().await;
        if session.state.is_terminal() {
            return Err(EngineError::SessionNotFound(chat));
        }
        if session.prompt != Some(message) {
            debug!("Button on message {} is no longer live", message);
            return Ok(Outcome::Unchanged(session.state));
        }

        session.cancel_timer();
        let from = session.state;
        let result = self.apply_intent(&mut session, intent).await;
        if session.state != from {
            info!(chat = %chat, from = %from, to = %session.state, "Transition");
        }
        self.end_turn(&handle, &mut session);
        result
    }

    async fn apply_intent(&self, session: &mut Session, intent: Intent) -> Result<Outcome> {
        use ConversationState::*;

        let state = session.state;
        match (state, intent) {
            (_, Intent::Cancel) => self.cancel_session(session).await,

            (AwaitingGenres, Intent::SelectGenre(tag)) => {
                if !self.inner.config.is_known_genre(&tag) || !session.filter.add_genre(tag) {
                    return Ok(Outcome::Unchanged(state));
                }
                let menu = render::genre_prompt(&self.inner.config, &session.filter);
                self.redraw_prompt(session, &menu).await?;
                Ok(Outcome::Entered(AwaitingGenres))
            }

            (AwaitingGenres, Intent::Continue) => {
                session.state = AwaitingMinScore;
                self.redraw_prompt(session, &render::score_menu(&session.filter))
                    .await?;
                Ok(Outcome::Entered(AwaitingMinScore))
            }

            (AwaitingMinScore, Intent::SelectScore(score)) => {
                if score.is_some_and(|n| f32::from(n) > CATALOG_MAX_SCORE) {
                    return Err(EngineError::IllegalIntent {
                        intent: Intent::SelectScore(score),
                        state,
                    });
                }
                session.filter.set_min_imdb_score(score.map(f32::from));
                session.state = AwaitingMinYear;
                let menu = render::year_menu(&session.filter, self.current_year());
                self.redraw_prompt(session, &menu).await?;
                Ok(Outcome::Entered(AwaitingMinYear))
            }

            (AwaitingMinYear, Intent::SelectYear(year)) => self.begin_delivery(session, year).await,

            (DeliveringResults, Intent::ShowMore(batch)) => {
                if batch != session.batches_sent {
                    debug!("Batch {} was already followed up", batch);
                    return Ok(Outcome::Unchanged(state));
                }
                self.deliver_batch(session).await
            }

            (state, intent) if intent_step(&intent) < state_step(state) => {
                Ok(Outcome::Unchanged(state))
            }

            (state, intent) => Err(EngineError::IllegalIntent { intent, state }),
        }
    }

    async fn handle_text(&self, chat: ChatId, text: &str) -> Result<Outcome> {
        let Some(handle) = self.inner.sessions.get(chat) else {
            return Ok(Outcome::Ignored);
        };
        let mut session = handle.lock().await;
        if session.state != ConversationState::AwaitingServices {
            return Ok(Outcome::Ignored);
        }

        session.cancel_timer();
        let result = self.choose_services(&mut session, text).await;
        self.end_turn(&handle, &mut session);
        result
    }

    /// Close out a turn: drop a finished session, or give a live one a fresh timer
    fn end_turn(&self, handle: &SessionHandle, session: &mut Session) {
        if session.state.is_terminal() {
            session.cancel_timer();
            if self.inner.sessions.remove_if_current(session.chat, handle) {
                info!(chat = %session.chat, state = %session.state, "Session ended");
            }
        } else {
            self.arm_timer(handle, session);
        }
    }

    // ========================================================================
    // Search dialogue
    // ========================================================================

    /// Finish the filter, open the result stream and send the first batch
    async fn begin_delivery(&self, session: &mut Session, year: Option<u16>) -> Result<Outcome> {
        session.filter.set_min_release_year(year);
        let spec = session
            .filter
            .clone()
            .build(&self.inner.config, self.current_year())?;
        let browser_url = self.inner.search.browser_url(&spec)?;

        let summary = render::search_summary(&session.filter, &browser_url);
        self.redraw_prompt(session, &summary).await?;
        session.prompt = None;

        info!(
            chat = %session.chat,
            genres = ?spec.genres(),
            min_score = ?spec.min_imdb_score(),
            min_year = ?spec.min_release_year(),
            "Search filter complete"
        );
        session.results = Some(self.inner.search.open(spec));
        session.state = ConversationState::DeliveringResults;
        self.deliver_batch(session).await
    }

    /// Pull the next batch and send it.
    ///
    /// A full batch keeps the session delivering; a short one (or a failed
    /// pull) ends it.
    async fn deliver_batch(&self, session: &mut Session) -> Result<Outcome> {
        let chat = session.chat;
        let Some(results) = session.results.as_mut() else {
            warn!(chat = %chat, "Delivering without an open result stream");
            session.finish(ConversationState::Done);
            return Ok(Outcome::Entered(ConversationState::Done));
        };
        let batch = next_batch(results, self.inner.settings.batch_size).await;

        // The previous batch loses its "more" button
        if let (Some(message), Some(text)) = (session.prompt.take(), session.last_batch.take()) {
            if let Err(err) = self.inner.transport.edit(chat, message, &Reply::text(text)).await {
                warn!(chat = %chat, error = %err, "Could not strip previous batch");
            }
        }

        let text = render::batch_text(&batch.records);
        match batch.end {
            BatchEnd::Full => {
                let ordinal = session.batches_sent + 1;
                let message = self
                    .inner
                    .transport
                    .send(chat, &render::batch_with_more(&text, ordinal))
                    .await?;
                debug!(chat = %chat, batch = ordinal, "Sent full batch");
                session.batches_sent = ordinal;
                session.prompt = Some(message);
                session.last_batch = Some(text);
                Ok(Outcome::Entered(ConversationState::DeliveringResults))
            }
            BatchEnd::Exhausted => {
                debug!(chat = %chat, records = batch.records.len(), "Results exhausted");
                session.finish(ConversationState::Done);
                self.inner
                    .transport
                    .send(chat, &render::final_batch(&text))
                    .await?;
                Ok(Outcome::Entered(ConversationState::Done))
            }
            BatchEnd::Failed(err) => {
                error!(chat = %chat, error = %err, "Retrieving results failed");
                session.finish(ConversationState::Done);
                if !batch.records.is_empty() {
                    self.inner.transport.send(chat, &Reply::text(text)).await?;
                }
                self.inner
                    .transport
                    .send(chat, &Reply::text(render::RETRIEVAL_FAILED))
                    .await?;
                Ok(Outcome::Entered(ConversationState::Done))
            }
        }
    }

    // ========================================================================
    // New releases dialogue
    // ========================================================================

    async fn choose_services(&self, session: &mut Session, text: &str) -> Result<Outcome> {
        let chat = session.chat;
        let selection = self.inner.config.parse_services(text);

        if !selection.is_valid() {
            let unrecognized = if selection.unrecognized.is_empty() {
                vec![text.trim().to_string()]
            } else {
                selection.unrecognized
            };
            info!(chat = %chat, ?unrecognized, "Unrecognized services");
            let reply = render::services_rejected(&self.inner.config, &unrecognized);
            self.inner.transport.send(chat, &reply).await?;
            return Ok(Outcome::Reprompted { unrecognized });
        }

        let services = selection.recognized;
        self.inner
            .transport
            .send(chat, &render::fetching_new_releases(&services))
            .await?;

        let today = (self.inner.settings.clock)();
        let result = self.inner.new_releases.fetch(&services, today).await;
        session.finish(ConversationState::Done);

        match result {
            Ok(records) => {
                let days = self.inner.new_releases.days();
                let header =
                    render::new_releases_header(days, self.inner.config.new_releases_min_rating);
                self.inner.transport.send(chat, &header).await?;
                for reply in render::new_releases_list(&records, days) {
                    self.inner.transport.send(chat, &reply).await?;
                }
            }
            Err(err) => {
                error!(chat = %chat, error = %err, "Retrieving new releases failed");
                self.inner
                    .transport
                    .send(chat, &Reply::text(render::RETRIEVAL_FAILED))
                    .await?;
            }
        }
        Ok(Outcome::Entered(ConversationState::Done))
    }

    // ========================================================================
    // Endings and timers
    // ========================================================================

    async fn cancel_session(&self, session: &mut Session) -> Result<Outcome> {
        let awaiting_services = session.state == ConversationState::AwaitingServices;
        let prompt = session.prompt.take();
        session.finish(ConversationState::Cancelled);

        if let Some(message) = prompt {
            self.clear_keyboard(session.chat, message).await;
        }
        let mut reply = Reply::text(render::CANCELLED);
        if awaiting_services {
            reply = reply.with_keyboard(Keyboard::Remove);
        }
        self.inner.transport.send(session.chat, &reply).await?;
        Ok(Outcome::Entered(ConversationState::Cancelled))
    }

    /// Start the idle timer for the session's current turn.
    ///
    /// The timer only holds weak references: a session that left the store,
    /// or an engine that was dropped, cannot be timed out.
    fn arm_timer(&self, handle: &SessionHandle, session: &mut Session) {
        let token = CancellationToken::new();
        session.set_timer(token.clone());

        let engine: Weak<Inner> = Arc::downgrade(&self.inner);
        let handle = Arc::downgrade(handle);
        let timeout = self.inner.settings.idle_timeout;

        tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => return,
                _ = tokio::time::sleep(timeout) => {}
            }

            let (Some(inner), Some(handle)) = (engine.upgrade(), handle.upgrade()) else {
                return;
            };
            ConversationEngine { inner }.expire(handle, token).await;
        });
    }

    async fn expire(&self, handle: SessionHandle, token: CancellationToken) {
        let mut session = handle.lock().await;
        // A turn that got the lock first has ended the session or re-armed it
        if token.is_cancelled() || session.state.is_terminal() {
            return;
        }

        let chat = session.chat;
        let was = session.state;
        let prompt = session.prompt.take();
        session.finish(ConversationState::TimedOut);
        self.inner.sessions.remove_if_current(chat, &handle);
        info!(chat = %chat, state = %was, "Session timed out");

        if let Some(message) = prompt {
            self.clear_keyboard(chat, message).await;
        }
        let mut reply = Reply::text(render::TIMED_OUT);
        if was == ConversationState::AwaitingServices {
            reply = reply.with_keyboard(Keyboard::Remove);
        }
        if let Err(err) = self.inner.transport.send(chat, &reply).await {
            warn!(chat = %chat, error = %err, "Could not send timeout notice");
        }
    }

    // ========================================================================
    // Helpers
    // ========================================================================

    /// Show `reply` in place of the current prompt, or as a new message when
    /// the prompt cannot be edited anymore. The message shown becomes the prompt.
    async fn redraw_prompt(&self, session: &mut Session, reply: &Reply) -> Result<()> {
        let chat = session.chat;
        if let Some(message) = session.prompt {
            match self.inner.transport.edit(chat, message, reply).await {
                Ok(()) => return Ok(()),
                Err(TransportError::StaleMessage(_)) => {
                    warn!(chat = %chat, "Prompt {} is gone, sending a new one", message);
                }
                Err(err) => return Err(err.into()),
            }
        }
        session.prompt = Some(self.inner.transport.send(chat, reply).await?);
        Ok(())
    }

    async fn clear_keyboard(&self, chat: ChatId, message: MessageId) {
        if let Err(err) = self.inner.transport.clear_keyboard(chat, message).await {
            warn!(chat = %chat, error = %err, "Could not clear keyboard");
        }
    }

    fn current_year(&self) -> u16 {
        let today = (self.inner.settings.clock)();
        u16::try_from(today.year()).unwrap_or(CATALOG_MIN_YEAR)
    }
}
