//! Seed catalog loading
//!
//! The book registry is populated once at startup from a static seed file.
//! Loading is best-effort: unreadable files and malformed rows are logged and
//! skipped, so a partial catalog is possible.

pub mod parser;

use std::path::Path;

pub use parser::{parse_row, parse_seed, ParsedSeed, SeedRow};

use crate::registry::books::BookRegistry;

/// Outcome of a seed load
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadReport {
    pub loaded: usize,
    pub skipped: usize,
}

/// Add every parsed row of `text` to the registry as an available copy
pub fn load_seed_text(text: &str, books: &mut BookRegistry) -> LoadReport {
    let parsed = parse_seed(text);

    for line in &parsed.rejected {
        tracing::warn!("Skipping invalid catalog row: {}", line);
    }

    for row in &parsed.rows {
        books.insert_new(&row.isbn, &row.title, &row.author);
    }

    LoadReport {
        loaded: parsed.rows.len(),
        skipped: parsed.rejected.len(),
    }
}

/// Read the seed file at `path` into the registry
pub async fn load_seed(path: impl AsRef<Path>, books: &mut BookRegistry) -> LoadReport {
    let path = path.as_ref();

    let text = match tokio::fs::read_to_string(path).await {
        Ok(text) => text,
        Err(e) => {
            tracing::warn!("Error loading books from {}: {}", path.display(), e);
            return LoadReport::default();
        }
    };

    let report = load_seed_text(&text, books);
    tracing::info!(
        "Loaded {} book copies from {} ({} rows skipped)",
        report.loaded,
        path.display(),
        report.skipped
    );
    report
}
