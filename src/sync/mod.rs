//! Background synchronization of student documents with the remote store
//!
//! All remote writes go through one worker task. Each write is journaled in the
//! outbox before it is attempted; retryable failures stay journaled and are
//! retried on a fixed interval, permanent failures are dropped. Callers await
//! the outcome of their own write, and every outcome is also broadcast as a
//! [`SyncEvent`].

pub mod outbox;

use std::{sync::Arc, time::Duration};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::{
    sync::{broadcast, mpsc, oneshot},
    time::MissedTickBehavior,
};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::StudentDocument,
    store::{StoreError, StudentStore},
};

pub use outbox::{Outbox, OutboxEntry};

/// Durability of one student write
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SyncOutcome {
    /// Acknowledged by the store
    Synced,
    /// Kept in the outbox, will be retried
    Pending { reason: String },
    /// Refused by the store, will not be retried
    Rejected { reason: String },
}

/// Published after every write attempt
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SyncEvent {
    pub email: String,
    pub outcome: SyncOutcome,
    pub at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PendingWrite {
    pub email: String,
    pub queued_at: DateTime<Utc>,
    pub attempts: u32,
    pub last_error: Option<String>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SyncStatus {
    pub pending: usize,
    pub writes: Vec<PendingWrite>,
}

enum Command {
    Persist {
        document: StudentDocument,
        reply: oneshot::Sender<SyncOutcome>,
    },
    Retry {
        reply: oneshot::Sender<SyncStatus>,
    },
    Status {
        reply: oneshot::Sender<SyncStatus>,
    },
}

/// Answer to one submitted write
pub struct SyncTicket {
    reply: Option<oneshot::Receiver<SyncOutcome>>,
}

impl SyncTicket {
    pub async fn outcome(self) -> SyncOutcome {
        match self.reply {
            Some(reply) => reply.await.unwrap_or_else(|_| SyncOutcome::Rejected {
                reason: "sync worker stopped before answering".to_string(),
            }),
            None => SyncOutcome::Rejected {
                reason: "sync worker is not running".to_string(),
            },
        }
    }
}

/// Result of persisting one student, as reported to clients
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct StudentWrite {
    pub email: String,
    pub outcome: SyncOutcome,
}

/// Cheap handle on the sync worker
#[derive(Clone)]
pub struct SyncHandle {
    commands: mpsc::UnboundedSender<Command>,
    events: broadcast::Sender<SyncEvent>,
}

impl SyncHandle {
    /// Start the worker on the current runtime. Entries already in `outbox` are
    /// retried right away.
    pub fn spawn(store: Arc<dyn StudentStore>, outbox: Outbox, retry_interval: Duration) -> Self {
        let (commands, receiver) = mpsc::unbounded_channel();
        let (events, _) = broadcast::channel(64);

        let worker = SyncWorker {
            store,
            outbox,
            commands: receiver,
            events: events.clone(),
            retry_interval: retry_interval.max(Duration::from_secs(1)),
        };
        tokio::spawn(worker.run());

        Self { commands, events }
    }

    /// Queue a student document for writing. Writes are applied in
    /// submission order, so submitting while the library lock is held keeps
    /// the store in step with the registry.
    pub fn submit(&self, document: StudentDocument) -> SyncTicket {
        let (reply, receiver) = oneshot::channel();
        let reply = self
            .commands
            .send(Command::Persist { document, reply })
            .ok()
            .map(|_| receiver);
        SyncTicket { reply }
    }

    /// Journal and write a student document, waiting for the outcome
    pub async fn persist(&self, document: StudentDocument) -> SyncOutcome {
        self.submit(document).outcome().await
    }

    /// Retry every pending write now
    pub async fn retry_pending(&self) -> AppResult<SyncStatus> {
        self.request(|reply| Command::Retry { reply }).await
    }

    pub async fn status(&self) -> AppResult<SyncStatus> {
        self.request(|reply| Command::Status { reply }).await
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SyncEvent> {
        self.events.subscribe()
    }

    async fn request(
        &self,
        command: impl FnOnce(oneshot::Sender<SyncStatus>) -> Command,
    ) -> AppResult<SyncStatus> {
        let (reply, status) = oneshot::channel();
        self.commands
            .send(command(reply))
            .map_err(|_| AppError::Internal("sync worker is not running".to_string()))?;
        status
            .await
            .map_err(|_| AppError::Internal("sync worker stopped before answering".to_string()))
    }
}

struct SyncWorker {
    store: Arc<dyn StudentStore>,
    outbox: Outbox,
    commands: mpsc::UnboundedReceiver<Command>,
    events: broadcast::Sender<SyncEvent>,
    retry_interval: Duration,
}

impl SyncWorker {
    async fn run(mut self) {
        let mut ticker = tokio::time::interval(self.retry_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                command = self.commands.recv() => match command {
                    Some(Command::Persist { document, reply }) => {
                        let outcome = self.persist(document).await;
                        let _ = reply.send(outcome);
                    }
                    Some(Command::Retry { reply }) => {
                        self.retry_pending().await;
                        let _ = reply.send(self.status());
                    }
                    Some(Command::Status { reply }) => {
                        let _ = reply.send(self.status());
                    }
                    None => break,
                },
                _ = ticker.tick() => {
                    if !self.outbox.is_empty() {
                        self.retry_pending().await;
                    }
                }
            }
        }

        tracing::info!(
            "Sync worker stopped with {} pending student writes",
            self.outbox.len()
        );
    }

    async fn persist(&mut self, document: StudentDocument) -> SyncOutcome {
        let key = document.key();
        let id = self.outbox.push(document.clone()).await;
        self.attempt(&key, id, &document).await
    }

    /// Retry pending writes oldest first, stopping at the first one the store
    /// still cannot take
    async fn retry_pending(&mut self) {
        for entry in self.outbox.pending() {
            let key = entry.document.key();
            let outcome = self.attempt(&key, entry.id, &entry.document).await;
            if matches!(outcome, SyncOutcome::Pending { .. }) {
                break;
            }
        }
    }

    async fn attempt(&mut self, key: &str, id: Uuid, document: &StudentDocument) -> SyncOutcome {
        let outcome = match self.store.upsert(document).await {
            Ok(()) => {
                self.outbox.complete(key, id).await;
                tracing::info!("Student saved to store: {}", key);
                SyncOutcome::Synced
            }
            Err(StoreError::Retryable(reason)) => {
                self.outbox.record_failure(key, id, &reason).await;
                tracing::warn!("Student write for {} deferred: {}", key, reason);
                SyncOutcome::Pending { reason }
            }
            Err(StoreError::Permanent(reason)) => {
                self.outbox.complete(key, id).await;
                tracing::error!("Student write for {} rejected: {}", key, reason);
                SyncOutcome::Rejected { reason }
            }
        };

        // no subscribers is fine
        let _ = self.events.send(SyncEvent {
            email: key.to_string(),
            outcome: outcome.clone(),
            at: Utc::now(),
        });

        outcome
    }

    fn status(&self) -> SyncStatus {
        let writes: Vec<PendingWrite> = self
            .outbox
            .pending()
            .into_iter()
            .map(|entry| PendingWrite {
                email: entry.document.key(),
                queued_at: entry.queued_at,
                attempts: entry.attempts,
                last_error: entry.last_error,
            })
            .collect();

        SyncStatus {
            pending: writes.len(),
            writes,
        }
    }
}
