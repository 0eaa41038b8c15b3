//! Borrow and return service

use std::sync::Arc;

use chrono::{Local, NaiveDate};
use tokio::sync::RwLock;

use crate::{
    error::{AppError, AppResult},
    models::{CopyTarget, Loan},
    registry::{Library, ReturnOutcome},
    sync::{StudentWrite, SyncHandle, SyncTicket},
};

#[derive(Clone)]
pub struct LoansService {
    library: Arc<RwLock<Library>>,
    sync: SyncHandle,
}

impl LoansService {
    pub fn new(library: Arc<RwLock<Library>>, sync: SyncHandle) -> Self {
        Self { library, sync }
    }

    /// Lend a copy to a student, due 14 days from today
    pub async fn borrow(&self, email: &str, target: CopyTarget) -> AppResult<(Loan, StudentWrite)> {
        self.borrow_on(email, target, Local::now().date_naive()).await
    }

    pub async fn borrow_on(
        &self,
        email: &str,
        target: CopyTarget,
        today: NaiveDate,
    ) -> AppResult<(Loan, StudentWrite)> {
        let (loan, pending) = {
            let mut library = self.library.write().await;
            let copy_id = library.resolve_borrow(&target)?;
            let loan = library.borrow(copy_id, email, today)?;
            let pending = self.submit(&library, email)?;
            (loan, pending)
        };

        tracing::info!(
            "Copy {} lent to {}, due {}",
            loan.copy_id,
            pending.0,
            loan.due_date
        );

        Ok((loan, settle(pending).await))
    }

    /// Put a copy back on the shelf
    pub async fn give_back(
        &self,
        email: &str,
        target: CopyTarget,
    ) -> AppResult<(ReturnOutcome, Vec<StudentWrite>)> {
        let (outcome, pending) = {
            let mut library = self.library.write().await;
            let copy_id = library.resolve_return(email, &target)?;
            let outcome = library.give_back(copy_id, email)?;
            let pending = outcome
                .affected
                .iter()
                .map(|affected| self.submit(&library, affected))
                .collect::<AppResult<Vec<_>>>()?;
            (outcome, pending)
        };

        tracing::info!("Copy {} returned by {}", outcome.copy_id, email.trim());

        let mut writes = Vec::with_capacity(pending.len());
        for write in pending {
            writes.push(settle(write).await);
        }
        Ok((outcome, writes))
    }

    /// Queue the current document of `email`; must run under the library lock
    /// so writes reach the store in registry order
    fn submit(&self, library: &Library, email: &str) -> AppResult<(String, SyncTicket)> {
        let document = library
            .students()
            .document(email)
            .ok_or_else(|| AppError::NotFound(format!("Student {} not found", email)))?;
        Ok((document.key(), self.sync.submit(document)))
    }
}

async fn settle((email, ticket): (String, SyncTicket)) -> StudentWrite {
    StudentWrite {
        email,
        outcome: ticket.outcome().await,
    }
}
