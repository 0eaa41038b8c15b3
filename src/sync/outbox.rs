//! Journal of student writes the remote store has not acknowledged yet
//!
//! The journal keeps at most one entry per student: documents are written
//! whole, so a newer document for the same email replaces the pending one and
//! moves to the back of the queue. The file is rewritten after every change.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::StudentDocument;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutboxEntry {
    pub id: Uuid,
    pub document: StudentDocument,
    pub queued_at: DateTime<Utc>,
    pub attempts: u32,
    pub last_error: Option<String>,
}

#[derive(Debug, Default)]
pub struct Outbox {
    path: Option<PathBuf>,
    entries: IndexMap<String, OutboxEntry>,
}

impl Outbox {
    /// Open the journal at `path`, picking up entries left by a previous run
    pub async fn open(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();

        let entries: Vec<OutboxEntry> = match tokio::fs::read(&path).await {
            Ok(bytes) => serde_json::from_slice(&bytes).unwrap_or_else(|e| {
                tracing::error!("Unreadable outbox {}, starting empty: {}", path.display(), e);
                Vec::new()
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(e) => {
                tracing::error!("Failed to read outbox {}: {}", path.display(), e);
                Vec::new()
            }
        };

        if !entries.is_empty() {
            tracing::info!("Outbox holds {} unsynced student writes", entries.len());
        }

        Self {
            path: Some(path),
            entries: entries
                .into_iter()
                .map(|entry| (entry.document.key(), entry))
                .collect(),
        }
    }

    /// Journal that is never written to disk
    pub fn in_memory() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Pending entries, oldest first
    pub fn pending(&self) -> Vec<OutboxEntry> {
        self.entries.values().cloned().collect()
    }

    /// Pending documents, which are newer than what the store holds
    pub fn documents(&self) -> Vec<StudentDocument> {
        self.entries.values().map(|entry| entry.document.clone()).collect()
    }

    /// Queue a document, replacing any pending one for the same student
    pub async fn push(&mut self, document: StudentDocument) -> Uuid {
        let key = document.key();
        let entry = OutboxEntry {
            id: Uuid::new_v4(),
            document,
            queued_at: Utc::now(),
            attempts: 0,
            last_error: None,
        };
        let id = entry.id;

        self.entries.shift_remove(&key);
        self.entries.insert(key, entry);
        self.save().await;
        id
    }

    /// Drop the entry `id` once the store has settled it
    pub async fn complete(&mut self, key: &str, id: Uuid) {
        if self.entries.get(key).is_some_and(|entry| entry.id == id) {
            self.entries.shift_remove(key);
            self.save().await;
        }
    }

    pub async fn record_failure(&mut self, key: &str, id: Uuid, error: &str) {
        if let Some(entry) = self.entries.get_mut(key).filter(|entry| entry.id == id) {
            entry.attempts = entry.attempts.saturating_add(1);
            entry.last_error = Some(error.to_string());
            self.save().await;
        }
    }

    async fn save(&self) {
        let Some(path) = &self.path else {
            return;
        };

        let entries: Vec<&OutboxEntry> = self.entries.values().collect();
        let bytes = match serde_json::to_vec_pretty(&entries) {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::error!("Failed to serialize outbox: {}", e);
                return;
            }
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            if let Err(e) = tokio::fs::create_dir_all(parent).await {
                tracing::error!("Failed to create outbox directory {}: {}", parent.display(), e);
                return;
            }
        }

        let tmp = path.with_extension("tmp");
        let written = async {
            tokio::fs::write(&tmp, &bytes).await?;
            tokio::fs::rename(&tmp, path).await
        };
        if let Err(e) = written.await {
            tracing::error!("Failed to write outbox {}: {}", path.display(), e);
        }
    }
}
