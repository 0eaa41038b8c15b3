//! In-process student store, for offline runs and tests

use std::sync::Arc;

use async_trait::async_trait;
use indexmap::IndexMap;
use tokio::sync::RwLock;

use super::{StoreResult, StudentStore};
use crate::models::StudentDocument;

#[derive(Clone, Default)]
pub struct MemoryStore {
    documents: Arc<RwLock<IndexMap<String, StudentDocument>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_documents(documents: Vec<StudentDocument>) -> Self {
        let documents = documents
            .into_iter()
            .map(|document| (document.key(), document))
            .collect();
        Self {
            documents: Arc::new(RwLock::new(documents)),
        }
    }

    /// Document stored under `email`, if any
    pub async fn get(&self, email: &str) -> Option<StudentDocument> {
        self.documents
            .read()
            .await
            .get(&crate::models::student::normalize_email(email))
            .cloned()
    }

    pub async fn len(&self) -> usize {
        self.documents.read().await.len()
    }
}

#[async_trait]
impl StudentStore for MemoryStore {
    async fn fetch_all(&self) -> StoreResult<Vec<StudentDocument>> {
        Ok(self.documents.read().await.values().cloned().collect())
    }

    async fn upsert(&self, document: &StudentDocument) -> StoreResult<()> {
        self.documents
            .write()
            .await
            .insert(document.key(), document.clone());
        Ok(())
    }
}
