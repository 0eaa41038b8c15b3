//! In-memory book registry

use std::collections::BTreeMap;

use chrono::NaiveDate;

use crate::models::{BookCopy, CopyId, Loan};

/// Case-insensitive substring match; an empty needle matches everything
fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

fn eq_ignore_case(a: &str, b: &str) -> bool {
    a.to_lowercase() == b.to_lowercase()
}

/// All copies of the catalog keyed by identifier.
///
/// Iteration is in ascending identifier order, so "first match" lookups are
/// deterministic.
#[derive(Debug, Clone)]
pub struct BookRegistry {
    copies: BTreeMap<CopyId, BookCopy>,
    next_id: CopyId,
}

impl Default for BookRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl BookRegistry {
    pub fn new() -> Self {
        Self {
            copies: BTreeMap::new(),
            next_id: 1,
        }
    }

    /// Insert a copy under its own identifier. An existing copy with the same
    /// identifier is replaced.
    pub fn add_copy(&mut self, copy: BookCopy) {
        if copy.id >= self.next_id {
            self.next_id = copy.id.saturating_add(1);
        }
        self.copies.insert(copy.id, copy);
    }

    /// Insert an available copy under the next free identifier
    pub fn insert_new(&mut self, isbn: &str, title: &str, author: &str) -> CopyId {
        let id = self.next_id;
        self.add_copy(BookCopy::new(id, isbn, title, author));
        id
    }

    pub fn by_id(&self, id: CopyId) -> Option<&BookCopy> {
        self.copies.get(&id)
    }

    /// First copy carrying `isbn`, ignoring case
    pub fn by_isbn(&self, isbn: &str) -> Option<&BookCopy> {
        self.copies.values().find(|copy| eq_ignore_case(&copy.isbn, isbn))
    }

    /// First copy carrying `isbn` that is not on loan
    pub fn first_available_by_isbn(&self, isbn: &str) -> Option<&BookCopy> {
        self.copies
            .values()
            .find(|copy| copy.is_available() && eq_ignore_case(&copy.isbn, isbn))
    }

    /// Copies whose title contains `text`, on loan or not
    pub fn search_by_title(&self, text: &str) -> Vec<&BookCopy> {
        self.copies
            .values()
            .filter(|copy| contains_ignore_case(&copy.title, text))
            .collect()
    }

    /// Copies whose author contains `text`, on loan or not
    pub fn search_by_author(&self, text: &str) -> Vec<&BookCopy> {
        self.copies
            .values()
            .filter(|copy| contains_ignore_case(&copy.author, text))
            .collect()
    }

    pub fn all_copies(&self) -> Vec<&BookCopy> {
        self.copies.values().collect()
    }

    pub fn sorted_by_id(&self) -> Vec<&BookCopy> {
        self.all_copies()
    }

    pub fn sorted_by_title(&self) -> Vec<&BookCopy> {
        let mut copies = self.all_copies();
        copies.sort_by(|a, b| a.title.cmp(&b.title));
        copies
    }

    pub fn sorted_by_author(&self) -> Vec<&BookCopy> {
        let mut copies = self.all_copies();
        copies.sort_by(|a, b| a.author.cmp(&b.author));
        copies
    }

    pub fn due_date(&self, id: CopyId) -> Option<NaiveDate> {
        self.copies.get(&id).and_then(BookCopy::due_date)
    }

    pub fn len(&self) -> usize {
        self.copies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.copies.is_empty()
    }

    /// Attach a loan; the caller has checked the copy is available
    pub(crate) fn lend(&mut self, loan: Loan) {
        if let Some(copy) = self.copies.get_mut(&loan.copy_id) {
            copy.loan = Some(loan);
        }
    }

    /// Detach and return the copy's loan, if any
    pub(crate) fn release(&mut self, id: CopyId) -> Option<Loan> {
        self.copies.get_mut(&id).and_then(|copy| copy.loan.take())
    }
}
