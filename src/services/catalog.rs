//! Catalog browsing service

use std::sync::Arc;

use tokio::sync::RwLock;

use crate::{
    error::{AppError, AppResult},
    models::{
        book::{BookQuery, BookSort, SearchField},
        BookCopy, BookCopyShort, CopyId,
    },
    registry::Library,
};

#[derive(Clone)]
pub struct CatalogService {
    library: Arc<RwLock<Library>>,
}

impl CatalogService {
    pub fn new(library: Arc<RwLock<Library>>) -> Self {
        Self { library }
    }

    /// Every copy, in the requested order
    pub async fn list(&self, sort: BookSort) -> Vec<BookCopyShort> {
        let library = self.library.read().await;
        let books = library.books();
        let copies = match sort {
            BookSort::Id => books.sorted_by_id(),
            BookSort::Title => books.sorted_by_title(),
            BookSort::Author => books.sorted_by_author(),
        };
        shorten(copies)
    }

    /// Search copies by title or author substring, or by exact copy id.
    /// A non-numeric id matches nothing.
    pub async fn search(&self, query: &BookQuery) -> Vec<BookCopyShort> {
        let text = query.q.trim();
        let library = self.library.read().await;
        let books = library.books();

        let copies = match query.by {
            SearchField::Title => books.search_by_title(text),
            SearchField::Author => books.search_by_author(text),
            SearchField::Id => text
                .parse::<CopyId>()
                .ok()
                .and_then(|id| books.by_id(id))
                .into_iter()
                .collect(),
        };

        tracing::debug!("Search {:?} '{}' matched {} copies", query.by, text, copies.len());
        shorten(copies)
    }

    pub async fn get(&self, id: CopyId) -> AppResult<BookCopyShort> {
        self.library
            .read()
            .await
            .books()
            .by_id(id)
            .map(BookCopyShort::from)
            .ok_or_else(|| AppError::NotFound(format!("Copy {} not found", id)))
    }
}

fn shorten(copies: Vec<&BookCopy>) -> Vec<BookCopyShort> {
    copies.into_iter().map(BookCopyShort::from).collect()
}
