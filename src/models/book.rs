//! Book copy model and related types

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DisplayFromStr};
use utoipa::{IntoParams, ToSchema};

use super::loan::Loan;
use super::student::StudentId;

pub type CopyId = u32;

/// One individually tracked copy of a title.
///
/// A copy is Held exactly when it carries a loan; availability, holder and
/// due date are all read from that loan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookCopy {
    pub id: CopyId,
    pub isbn: String,
    pub title: String,
    pub author: String,
    pub(crate) loan: Option<Loan>,
}

impl BookCopy {
    /// Create an available copy
    pub fn new(id: CopyId, isbn: &str, title: &str, author: &str) -> Self {
        Self {
            id,
            isbn: isbn.to_string(),
            title: title.to_string(),
            author: author.to_string(),
            loan: None,
        }
    }

    pub fn is_available(&self) -> bool {
        self.loan.is_none()
    }

    pub fn holder(&self) -> Option<StudentId> {
        self.loan.as_ref().map(|loan| loan.student_id)
    }

    pub fn due_date(&self) -> Option<NaiveDate> {
        self.loan.as_ref().map(|loan| loan.due_date)
    }

    pub fn loan(&self) -> Option<&Loan> {
        self.loan.as_ref()
    }
}

/// Copy with its lending status, as listed to clients
#[serde_as]
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct BookCopyShort {
    pub id: CopyId,
    pub isbn: String,
    pub title: String,
    pub author: String,
    pub available: bool,
    #[serde_as(as = "Option<DisplayFromStr>")]
    #[schema(value_type = Option<String>)]
    pub holder_id: Option<StudentId>,
    pub due_date: Option<NaiveDate>,
}

impl From<&BookCopy> for BookCopyShort {
    fn from(copy: &BookCopy) -> Self {
        Self {
            id: copy.id,
            isbn: copy.isbn.clone(),
            title: copy.title.clone(),
            author: copy.author.clone(),
            available: copy.is_available(),
            holder_id: copy.holder(),
            due_date: copy.due_date(),
        }
    }
}

/// Sort order for copy listings
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum BookSort {
    #[default]
    Id,
    Title,
    Author,
}

/// Field a search runs against
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum SearchField {
    #[default]
    Title,
    Author,
    Id,
}

/// Search query parameters
#[derive(Debug, Deserialize, IntoParams, ToSchema)]
pub struct BookQuery {
    /// Field to search (title, author or id)
    #[serde(default)]
    pub by: SearchField,
    /// Search text; substring for title/author, exact number for id
    #[serde(default)]
    pub q: String,
}

/// Listing parameters
#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
pub struct BookListQuery {
    #[serde(default)]
    pub sort: BookSort,
}
