//! Remote student store
//!
//! Students live in a document collection, one document per student keyed by
//! lower-cased email. The collection is read in full at startup and written one
//! whole document at a time.

pub mod firestore;
pub mod memory;

use async_trait::async_trait;
use thiserror::Error;

use crate::models::StudentDocument;

pub use firestore::FirestoreStore;
pub use memory::MemoryStore;

/// Failure of a store operation
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Transient: timeouts, unreachable host, throttling, server errors
    #[error("store temporarily unavailable: {0}")]
    Retryable(String),

    /// Will fail again if repeated: rejected request or malformed data
    #[error("store rejected the operation: {0}")]
    Permanent(String),
}

impl StoreError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, StoreError::Retryable(_))
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait StudentStore: Send + Sync {
    /// Every student document in the collection
    async fn fetch_all(&self) -> StoreResult<Vec<StudentDocument>>;

    /// Create or fully replace the document of `document.email`
    async fn upsert(&self, document: &StudentDocument) -> StoreResult<()>;
}
