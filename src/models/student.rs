//! Student model and related types

use std::collections::BTreeSet;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DisplayFromStr};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use super::book::CopyId;
use super::loan::Loan;

pub type StudentId = u64;

/// Lower-cased email, the registry key and the persisted document id
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Student held in the registry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Student {
    pub id: StudentId,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub(crate) password: String,
    pub(crate) loans: Vec<Loan>,
}

impl Student {
    pub fn new(id: StudentId, request: &CreateStudent) -> Self {
        Self {
            id,
            first_name: request.first_name.trim().to_string(),
            last_name: request.last_name.trim().to_string(),
            email: request.email.trim().to_string(),
            password: request.password.clone(),
            loans: Vec::new(),
        }
    }

    pub fn key(&self) -> String {
        normalize_email(&self.email)
    }

    pub fn loans(&self) -> &[Loan] {
        &self.loans
    }

    /// ISBNs of every copy currently held
    pub fn held_isbns(&self) -> BTreeSet<String> {
        self.loans.iter().map(|loan| loan.isbn.clone()).collect()
    }

    /// Plain equality check against the stored password
    pub fn is_password(&self, candidate: &str) -> bool {
        self.password == candidate
    }

    pub fn to_document(&self) -> StudentDocument {
        let mut current_books = Vec::new();
        for loan in &self.loans {
            if !current_books.contains(&loan.isbn) {
                current_books.push(loan.isbn.clone());
            }
        }

        StudentDocument {
            id: self.id,
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            email: self.email.clone(),
            password: self.password.clone(),
            current_books,
            loans: self
                .loans
                .iter()
                .map(|loan| LoanRecord {
                    copy_id: loan.copy_id,
                    isbn: loan.isbn.clone(),
                    borrowed_on: loan.borrowed_on,
                    due_date: loan.due_date,
                })
                .collect(),
        }
    }
}

/// Persisted loan entry inside a student document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoanRecord {
    pub copy_id: CopyId,
    pub isbn: String,
    pub borrowed_on: NaiveDate,
    pub due_date: NaiveDate,
}

/// Student as stored in the remote document collection.
///
/// `current_books` is the held-ISBN list older documents carry on their own;
/// when `loans` is present it is the authoritative record of what is held.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentDocument {
    #[serde(alias = "ID")]
    pub id: StudentId,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub current_books: Vec<String>,
    #[serde(default)]
    pub loans: Vec<LoanRecord>,
}

impl StudentDocument {
    pub fn key(&self) -> String {
        normalize_email(&self.email)
    }
}

/// Student summary, as listed to clients (never carries the password).
/// Ids go out as strings since they do not fit a JSON number.
#[serde_as]
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct StudentShort {
    #[serde_as(as = "DisplayFromStr")]
    #[schema(value_type = String, example = "7186334312001234567")]
    pub id: StudentId,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub current_books: Vec<String>,
    pub nb_loans: usize,
}

impl From<&Student> for StudentShort {
    fn from(student: &Student) -> Self {
        Self {
            id: student.id,
            first_name: student.first_name.clone(),
            last_name: student.last_name.clone(),
            email: student.email.clone(),
            current_books: student.held_isbns().into_iter().collect(),
            nb_loans: student.loans.len(),
        }
    }
}

/// Registration request
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateStudent {
    #[validate(length(min = 1, message = "First name is required"))]
    pub first_name: String,
    #[validate(length(min = 1, message = "Last name is required"))]
    pub last_name: String,
    #[validate(email(message = "Invalid email format"))]
    pub email: String,
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

/// Sort order for student listings
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum StudentSort {
    #[default]
    Name,
    Email,
    Id,
    Loans,
}

/// Student listing parameters
#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
pub struct StudentQuery {
    #[serde(default)]
    pub sort: StudentSort,
}
