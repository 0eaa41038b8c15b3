//! Business logic services

pub mod catalog;
pub mod loans;
pub mod students;

use std::{sync::Arc, time::Duration};

use chrono::Local;
use indexmap::IndexMap;
use tokio::sync::RwLock;

use crate::{
    config::AppConfig,
    models::StudentDocument,
    registry::{BookRegistry, Library},
    store::StudentStore,
    sync::{Outbox, SyncHandle, SyncOutcome},
};

/// Container for all services
#[derive(Clone)]
pub struct Services {
    pub catalog: catalog::CatalogService,
    pub students: students::StudentsService,
    pub loans: loans::LoansService,
    pub sync: SyncHandle,
}

impl Services {
    /// Create all services around an already built library
    pub fn new(library: Library, sync: SyncHandle) -> Self {
        let library = Arc::new(RwLock::new(library));
        Self {
            catalog: catalog::CatalogService::new(library.clone()),
            students: students::StudentsService::new(library.clone(), sync.clone()),
            loans: loans::LoansService::new(library, sync.clone()),
            sync,
        }
    }

    /// Load the catalog and the students, start the sync worker and write
    /// back the students whose loans had to be adjusted to the catalog.
    pub async fn start(config: &AppConfig, store: Arc<dyn StudentStore>, outbox: Outbox) -> Self {
        let mut books = BookRegistry::new();
        crate::catalog::load_seed(&config.catalog.seed_path, &mut books).await;

        let fetched = match store.fetch_all().await {
            Ok(documents) => documents,
            Err(e) if e.is_retryable() => {
                tracing::warn!("Store unreachable, starting without its students: {}", e);
                Vec::new()
            }
            Err(e) => {
                tracing::error!("Store refused the student listing, starting without it: {}", e);
                Vec::new()
            }
        };
        let documents = overlay(fetched, outbox.documents());

        let today = Local::now().date_naive();
        let (library, changed) = Library::restore(books, documents, today);
        tracing::info!("{} students loaded", library.students().len());

        let changed: Vec<StudentDocument> = changed
            .iter()
            .filter_map(|email| library.students().document(email))
            .collect();

        let sync = SyncHandle::spawn(
            store,
            outbox,
            Duration::from_secs(config.sync.retry_interval_secs),
        );
        for document in changed {
            let email = document.key();
            match sync.persist(document).await {
                SyncOutcome::Synced => tracing::debug!("Adjusted student {} written back", email),
                outcome => tracing::warn!("Adjusted student {} not written back: {:?}", email, outcome),
            }
        }

        Self::new(library, sync)
    }
}

/// Documents still waiting in the outbox are newer than the store's copies
fn overlay(fetched: Vec<StudentDocument>, pending: Vec<StudentDocument>) -> Vec<StudentDocument> {
    let mut documents: IndexMap<String, StudentDocument> = IndexMap::new();
    for document in fetched {
        documents.entry(document.key()).or_insert(document);
    }
    for document in pending {
        documents.insert(document.key(), document);
    }
    documents.into_values().collect()
}
