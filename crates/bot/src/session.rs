//! Session Store
//!
//! One `Session` per chat, holding everything a conversation accumulates:
//! the filter being built, the open result stream, and which message
//! carries the currently active buttons.
//!
//! ## Locking
//! The store is a `DashMap` from chat to `Arc<Mutex<Session>>`. A turn
//! clones the `Arc` out of the map, drops the map guard, then locks the
//! session for the whole transition (network I/O included). So:
//! - turns of one chat never overlap
//! - different chats never wait on each other
//! - no DashMap guard is ever held across an `.await`
//!
//! Rust concept: `Arc::ptr_eq` lets removal check that the entry in the map
//! is still the session we worked on, not a newer one that replaced it.

use std::fmt;
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

use catalog::FilterSpecBuilder;
use sources::MovieStream;

use crate::reply::{ChatId, MessageId};

/// Where a conversation is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConversationState {
    // Search flow
    AwaitingGenres,
    AwaitingMinScore,
    AwaitingMinYear,
    DeliveringResults,

    // New releases flow
    AwaitingServices,

    // Terminal
    Done,
    Cancelled,
    TimedOut,
}

impl ConversationState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            ConversationState::Done | ConversationState::Cancelled | ConversationState::TimedOut
        )
    }
}

impl fmt::Display for ConversationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

pub struct Session {
    pub chat: ChatId,
    pub state: ConversationState,
    pub filter: FilterSpecBuilder,
    /// Open result stream, only while delivering results
    pub results: Option<MovieStream>,
    /// Batches delivered so far
    pub batches_sent: u32,
    /// Message carrying the buttons that are currently live
    pub prompt: Option<MessageId>,
    /// Text of the last delivered batch, to redraw it without its button
    pub last_batch: Option<String>,
    /// Idle timer of the current turn
    timer: Option<CancellationToken>,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("chat", &self.chat)
            .field("state", &self.state)
            .field("filter", &self.filter)
            .field("results_open", &self.results.is_some())
            .field("batches_sent", &self.batches_sent)
            .field("prompt", &self.prompt)
            .finish_non_exhaustive()
    }
}

impl Session {
    pub fn new(chat: ChatId, state: ConversationState) -> Self {
        Self {
            chat,
            state,
            filter: FilterSpecBuilder::new(),
            results: None,
            batches_sent: 0,
            prompt: None,
            last_batch: None,
            timer: None,
        }
    }

    /// Install a new idle timer token, cancelling the previous one
    pub fn set_timer(&mut self, token: CancellationToken) {
        if let Some(previous) = self.timer.replace(token) {
            previous.cancel();
        }
    }

    pub fn cancel_timer(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.cancel();
        }
    }

    /// Move to a terminal state and let go of the filter and result stream
    pub fn finish(&mut self, state: ConversationState) {
        debug_assert!(state.is_terminal());
        self.state = state;
        self.cancel_timer();
        self.results = None;
        self.filter = FilterSpecBuilder::new();
        self.last_batch = None;
    }
}

pub type SessionHandle = Arc<Mutex<Session>>;

/// Process-wide map of active sessions, at most one per chat
#[derive(Default)]
pub struct SessionStore {
    sessions: DashMap<ChatId, SessionHandle>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, chat: ChatId) -> Option<SessionHandle> {
        // Clone the Arc so the map guard is released right here
        self.sessions.get(&chat).map(|entry| Arc::clone(entry.value()))
    }

    /// Put `session` in place for its chat. Returns the session it replaced.
    pub fn insert(&self, session: Session) -> (SessionHandle, Option<SessionHandle>) {
        let chat = session.chat;
        let handle = Arc::new(Mutex::new(session));
        let previous = self.sessions.insert(chat, Arc::clone(&handle));
        (handle, previous)
    }

    /// Remove the chat's session if it is still `handle`.
    pub fn remove_if_current(&self, chat: ChatId, handle: &SessionHandle) -> bool {
        self.sessions
            .remove_if(&chat, |_, current| Arc::ptr_eq(current, handle))
            .is_some()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_states() {
        assert!(ConversationState::Done.is_terminal());
        assert!(ConversationState::Cancelled.is_terminal());
        assert!(ConversationState::TimedOut.is_terminal());
        assert!(!ConversationState::AwaitingServices.is_terminal());
        assert!(!ConversationState::DeliveringResults.is_terminal());
    }

    #[test]
    fn test_replacement_keeps_one_session_per_chat() {
        let store = SessionStore::new();
        let chat = ChatId(1);

        let (first, previous) = store.insert(Session::new(chat, ConversationState::AwaitingGenres));
        assert!(previous.is_none());

        let (second, previous) = store.insert(Session::new(chat, ConversationState::AwaitingServices));
        assert!(Arc::ptr_eq(&previous.unwrap(), &first));
        assert_eq!(store.len(), 1);

        // The replaced session may not remove its successor
        assert!(!store.remove_if_current(chat, &first));
        assert_eq!(store.len(), 1);

        assert!(store.remove_if_current(chat, &second));
        assert!(store.is_empty());
        assert!(store.get(chat).is_none());
    }

    #[test]
    fn test_new_timer_cancels_previous() {
        let mut session = Session::new(ChatId(1), ConversationState::AwaitingGenres);
        let first = CancellationToken::new();
        let second = CancellationToken::new();

        session.set_timer(first.clone());
        session.set_timer(second.clone());
        assert!(first.is_cancelled());
        assert!(!second.is_cancelled());

        session.finish(ConversationState::Cancelled);
        assert!(second.is_cancelled());
        assert_eq!(session.state, ConversationState::Cancelled);
    }
}
