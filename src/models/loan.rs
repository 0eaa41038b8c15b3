//! Loan (borrow) model and related types

use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DisplayFromStr};
use utoipa::ToSchema;

use super::book::{BookCopy, CopyId};
use super::student::StudentId;
use crate::error::{AppError, AppResult};

/// Fixed loan period, counted in calendar days from the borrow date
pub const LOAN_PERIOD_DAYS: u64 = 14;

/// An active loan: one held copy and the student holding it
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Loan {
    pub copy_id: CopyId,
    /// Denormalized from the copy for display and for the persisted held-ISBN list
    pub isbn: String,
    #[serde_as(as = "DisplayFromStr")]
    #[schema(value_type = String)]
    pub student_id: StudentId,
    pub borrowed_on: NaiveDate,
    pub due_date: NaiveDate,
}

impl Loan {
    /// Start a loan on `today`, due `LOAN_PERIOD_DAYS` later
    pub fn starting(copy: &BookCopy, student_id: StudentId, today: NaiveDate) -> AppResult<Self> {
        let due_date = today
            .checked_add_days(Days::new(LOAN_PERIOD_DAYS))
            .ok_or_else(|| AppError::Internal(format!("Due date out of range for {}", today)))?;

        Ok(Self {
            copy_id: copy.id,
            isbn: copy.isbn.clone(),
            student_id,
            borrowed_on: today,
            due_date,
        })
    }

    pub fn is_overdue(&self, today: NaiveDate) -> bool {
        today > self.due_date
    }
}

/// Loan with copy details for display
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LoanDetails {
    pub copy_id: CopyId,
    pub isbn: String,
    pub title: String,
    pub author: String,
    pub borrowed_on: NaiveDate,
    pub due_date: NaiveDate,
    pub is_overdue: bool,
}

impl LoanDetails {
    pub fn new(loan: &Loan, copy: &BookCopy, today: NaiveDate) -> Self {
        Self {
            copy_id: loan.copy_id,
            isbn: loan.isbn.clone(),
            title: copy.title.clone(),
            author: copy.author.clone(),
            borrowed_on: loan.borrowed_on,
            due_date: loan.due_date,
            is_overdue: loan.is_overdue(today),
        }
    }
}

/// How a borrow or return request designates its copy
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CopyTarget {
    Id(CopyId),
    Isbn(String),
}

impl CopyTarget {
    /// Build a target from optional request fields. The copy id wins when both are given.
    pub fn from_parts(copy_id: Option<CopyId>, isbn: Option<&str>) -> AppResult<Self> {
        match (copy_id, isbn.map(str::trim)) {
            (Some(id), _) => Ok(CopyTarget::Id(id)),
            (None, Some(isbn)) if !isbn.is_empty() => Ok(CopyTarget::Isbn(isbn.to_string())),
            _ => Err(AppError::BadRequest(
                "copy_id or isbn required".to_string(),
            )),
        }
    }
}
