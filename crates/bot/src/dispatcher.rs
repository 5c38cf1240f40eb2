//! # Update Dispatcher
//!
//! Long-polls Telegram and hands every event to the engine.
//!
//! ## Worker model
//! Each chat with recent activity has its own worker task, fed through an
//! ordered channel:
//! - events of one chat are handled one after another, in arrival order
//! - a slow chat (fetching a batch) never holds up another chat
//! - a worker with nothing to do for `worker_idle` retires
//!
//! A retiring worker closes its channel and finishes what is already
//! queued. A successor for the same chat waits for it before starting, so
//! ordering survives the hand-over.

use std::collections::HashMap;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use telegram_client::{TelegramClient, TelegramError};

use crate::engine::{ConversationEngine, EngineError};
use crate::reply::ChatId;
use crate::telegram::inbound_from_update;
use crate::transport::InboundEvent;

const WORKER_QUEUE: usize = 32;
const MAX_BACKOFF: Duration = Duration::from_secs(60);

struct Worker {
    sender: mpsc::Sender<InboundEvent>,
    task: JoinHandle<()>,
}

pub struct Dispatcher {
    client: TelegramClient,
    engine: ConversationEngine,
    poll_timeout: Duration,
    worker_idle: Duration,
    workers: HashMap<ChatId, Worker>,
}

impl Dispatcher {
    /// Create a dispatcher
    ///
    /// # Arguments
    /// * `client` - Bot API client used for polling and callback answers
    /// * `engine` - Where events go
    /// * `poll_timeout` - Long-poll duration per `getUpdates` call
    pub fn new(client: TelegramClient, engine: ConversationEngine, poll_timeout: Duration) -> Self {
        Self {
            client,
            engine,
            poll_timeout,
            worker_idle: Duration::from_secs(300),
            workers: HashMap::new(),
        }
    }

    pub fn worker_idle(mut self, idle: Duration) -> Self {
        self.worker_idle = idle;
        self
    }

    /// Poll until `shutdown` is cancelled.
    ///
    /// Transport hiccups are retried with exponential backoff.
    ///
    /// # Errors
    /// Only errors retrying cannot fix, i.e. a rejected bot token.
    pub async fn run(mut self, shutdown: CancellationToken) -> Result<(), TelegramError> {
        let mut offset: i64 = 0;
        let mut backoff = Duration::from_secs(1);
        info!("Polling for updates every {:?}", self.poll_timeout);

        loop {
            let polled = tokio::select! {
                _ = shutdown.cancelled() => break,
                polled = self.client.get_updates(offset, self.poll_timeout) => polled,
            };

            match polled {
                Ok(updates) => {
                    backoff = Duration::from_secs(1);
                    for update in updates {
                        offset = offset.max(update.update_id + 1);
                        let Some(inbound) = inbound_from_update(update) else {
                            continue;
                        };
                        if let Some(callback_id) = inbound.callback_id {
                            self.answer_callback(callback_id);
                        }
                        if let Some(event) = inbound.event {
                            self.dispatch(event);
                        }
                    }
                    self.workers.retain(|_, worker| !worker.task.is_finished());
                }
                Err(err) if err.is_unauthorized() => return Err(err),
                Err(err) => {
                    warn!(error = %err, "Polling failed, retrying in {:?}", backoff);
                    tokio::select! {
                        _ = shutdown.cancelled() => break,
                        _ = tokio::time::sleep(backoff) => {}
                    }
                    backoff = (backoff * 2).min(MAX_BACKOFF);
                }
            }
        }

        info!("Dispatcher stopped");
        Ok(())
    }

    /// Acknowledge a button press without waiting for Telegram
    fn answer_callback(&self, callback_id: String) {
        let client = self.client.clone();
        tokio::spawn(async move {
            if let Err(err) = client.answer_callback_query(&callback_id).await {
                debug!(error = %err, "Could not answer callback query");
            }
        });
    }

    /// Queue `event` on its chat's worker. Never waits: a chat whose worker
    /// is stuck must not hold up polling for everyone else.
    fn dispatch(&mut self, event: InboundEvent) {
        let chat = event.chat;
        let mut previous = None;

        let event = match self.workers.remove(&chat) {
            Some(worker) => match worker.sender.try_send(event) {
                Ok(()) => {
                    self.workers.insert(chat, worker);
                    return;
                }
                // Input is idempotent or goes stale anyway; the user can repeat it
                Err(mpsc::error::TrySendError::Full(event)) => {
                    warn!(chat = %chat, kind = ?event.kind, "Worker queue full, dropping event");
                    self.workers.insert(chat, worker);
                    return;
                }
                // The worker retired in the meantime; its successor waits for it
                Err(mpsc::error::TrySendError::Closed(event)) => {
                    previous = Some(worker.task);
                    event
                }
            },
            None => event,
        };

        let worker = spawn_worker(self.engine.clone(), chat, self.worker_idle, previous);
        if worker.sender.try_send(event).is_err() {
            warn!(chat = %chat, "New worker refused an event");
        }
        self.workers.insert(chat, worker);
    }
}

fn spawn_worker(
    engine: ConversationEngine,
    chat: ChatId,
    idle: Duration,
    previous: Option<JoinHandle<()>>,
) -> Worker {
    let (sender, mut receiver) = mpsc::channel(WORKER_QUEUE);

    let task = tokio::spawn(async move {
        if let Some(previous) = previous {
            let _ = previous.await;
        }
        debug!(chat = %chat, "Worker started");

        loop {
            tokio::select! {
                event = receiver.recv() => match event {
                    Some(event) => handle_event(&engine, event).await,
                    None => break,
                },
                _ = tokio::time::sleep(idle) => {
                    // Refuse new events, then finish what is queued
                    receiver.close();
                    while let Some(event) = receiver.recv().await {
                        handle_event(&engine, event).await;
                    }
                    break;
                }
            }
        }
        debug!(chat = %chat, "Worker retired");
    });

    Worker { sender, task }
}

/// Run one event through the engine; nothing here is fatal to the worker
pub async fn handle_event(engine: &ConversationEngine, event: InboundEvent) {
    let chat = event.chat;
    match engine.handle(event).await {
        Ok(outcome) => debug!(chat = %chat, ?outcome, "Handled event"),
        Err(EngineError::SessionNotFound(_)) => {
            debug!(chat = %chat, "Input for a session that no longer exists")
        }
        Err(err) => warn!(chat = %chat, error = %err, "Could not handle event"),
    }
}
