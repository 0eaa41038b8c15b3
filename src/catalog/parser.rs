//! Seed catalog parser
//!
//! Parses the startup catalog: a header line followed by `ISBN,Title,Author`
//! rows. Splitting stops after the second comma, so only the author field may
//! itself contain commas.

/// One parsed catalog row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeedRow {
    pub isbn: String,
    pub title: String,
    pub author: String,
}

/// Result of parsing a whole seed file
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedSeed {
    pub rows: Vec<SeedRow>,
    /// Rows that did not yield three fields, kept verbatim for diagnostics
    pub rejected: Vec<String>,
}

/// Parse a single data row. Returns `None` when fewer than three fields are present.
pub fn parse_row(line: &str) -> Option<SeedRow> {
    let mut parts = line.splitn(3, ',').map(str::trim);

    let isbn = parts.next()?;
    let title = parts.next()?;
    let author = parts.next()?;

    Some(SeedRow {
        isbn: isbn.to_string(),
        title: title.to_string(),
        author: author.to_string(),
    })
}

/// Parse the full seed text, skipping the header and blank lines
pub fn parse_seed(text: &str) -> ParsedSeed {
    let mut parsed = ParsedSeed::default();

    for line in text.lines().skip(1) {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        match parse_row(line) {
            Some(row) => parsed.rows.push(row),
            None => parsed.rejected.push(line.to_string()),
        }
    }

    parsed
}
