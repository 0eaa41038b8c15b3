//! Student registration and lookup service

use std::sync::Arc;

use chrono::Local;
use tokio::sync::RwLock;
use validator::Validate;

use crate::{
    error::{AppError, AppResult},
    models::{
        student::{CreateStudent, StudentSort},
        LoanDetails, StudentShort,
    },
    registry::Library,
    sync::{StudentWrite, SyncHandle},
};

#[derive(Clone)]
pub struct StudentsService {
    library: Arc<RwLock<Library>>,
    sync: SyncHandle,
}

impl StudentsService {
    pub fn new(library: Arc<RwLock<Library>>, sync: SyncHandle) -> Self {
        Self { library, sync }
    }

    /// Register a new student and write their document to the store
    pub async fn register(&self, request: CreateStudent) -> AppResult<(StudentShort, StudentWrite)> {
        request.validate()?;

        let (student, ticket) = {
            let mut library = self.library.write().await;
            let document = library.register(&request)?;
            let student = library
                .students()
                .by_email(&document.email)
                .map(StudentShort::from)
                .ok_or_else(|| AppError::Internal("Registered student vanished".to_string()))?;
            (student, self.sync.submit(document))
        };

        tracing::info!("Student registered: {} (id {})", student.email, student.id);

        let write = StudentWrite {
            email: student.email.to_lowercase(),
            outcome: ticket.outcome().await,
        };
        Ok((student, write))
    }

    /// Check a student's credentials
    pub async fn login(&self, email: &str, password: &str) -> AppResult<StudentShort> {
        self.library
            .read()
            .await
            .students()
            .authenticate(email, password)
            .map(StudentShort::from)
            .ok_or_else(|| AppError::Authentication("Invalid email or password".to_string()))
    }

    pub async fn get(&self, email: &str) -> AppResult<StudentShort> {
        self.library
            .read()
            .await
            .students()
            .by_email(email)
            .map(StudentShort::from)
            .ok_or_else(|| AppError::NotFound(format!("Student {} not found", email)))
    }

    pub async fn list(&self, sort: StudentSort) -> Vec<StudentShort> {
        let library = self.library.read().await;
        let students = library.students();
        let sorted = match sort {
            StudentSort::Name => students.sorted_by_name(),
            StudentSort::Email => students.sorted_by_email(),
            StudentSort::Id => students.sorted_by_id(),
            StudentSort::Loans => students.sorted_by_books_borrowed(),
        };
        sorted.into_iter().map(StudentShort::from).collect()
    }

    /// Copies a student currently holds
    pub async fn loans(&self, email: &str) -> AppResult<Vec<LoanDetails>> {
        let today = Local::now().date_naive();
        self.library.read().await.student_loans(email, today)
    }
}
