//! Persistence abstraction over two interchangeable backends: the embedded
//! SQLite database and a single-document JSON fallback. Callers code only
//! against the [`Store`] trait; which backend is active is decided exactly
//! once, at startup.

mod file;
mod sqlite;

use std::path::Path;

pub use file::FileStore;
pub use sqlite::SqliteStore;

use crate::config;
use crate::error::{Result, ThighpadsError};
use crate::models::{Entry, EntryDraft, MatchedField, SearchResult, Table};

/// Characters of context kept on either side of a search match.
const SNIPPET_CONTEXT: usize = 10;
/// Fields at or below this length are shown whole instead of windowed.
const SNIPPET_PREVIEW: usize = 50;

/// Backend-agnostic CRUD and search contract. Both implementations honor the
/// same invariants: ids are unique across the whole store, timestamps are
/// assigned here and nowhere else, and deleting a table takes its entries
/// with it as one atomic unit.
pub trait Store: Send {
    fn create_table(&self, name: &str, author: &str) -> Result<Table>;
    fn get_table(&self, id: i64) -> Result<Table>;
    /// All tables ordered by name, entries hydrated.
    fn list_tables(&self) -> Result<Vec<Table>>;
    fn delete_table(&self, id: i64) -> Result<()>;
    fn create_entry(&self, table_id: i64, draft: &EntryDraft) -> Result<Entry>;
    fn get_entry(&self, id: i64) -> Result<Entry>;
    /// Replaces title/tags/content; preserves `created_at`, refreshes
    /// `updated_at`.
    fn update_entry(&self, id: i64, draft: &EntryDraft) -> Result<Entry>;
    fn delete_entry(&self, id: i64) -> Result<()>;
    /// Case-insensitive match against title, content and tags, ordered by
    /// (table name, entry title).
    fn search_entries(&self, query: &str) -> Result<Vec<SearchResult>>;
}

/// Open the persistence store for the given data directory. The SQLite
/// backend is tried first; if it cannot be opened for any reason the store
/// falls back once to the file-backed document for the rest of the process
/// lifetime. A fallback that cannot be opened either is fatal.
pub fn open_store(data_dir: &Path) -> Result<Box<dyn Store>> {
    match SqliteStore::open(data_dir.join(config::DB_FILE_NAME)) {
        Ok(store) => Ok(Box::new(store)),
        Err(err) => {
            log::warn!("primary database unavailable ({err}); using file-backed store");
            let store = FileStore::open(data_dir.join(config::FILE_DB_NAME))?;
            Ok(Box::new(store))
        }
    }
}

/// Table names are restricted so they stay usable as export file names.
pub(crate) fn validate_table_name(name: &str) -> Result<()> {
    if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(ThighpadsError::InvalidName(name.to_string()));
    }
    Ok(())
}

pub(crate) fn validate_title(title: &str) -> Result<()> {
    if title.trim().is_empty() {
        return Err(ThighpadsError::EmptyTitle);
    }
    Ok(())
}

/// Test an entry against a query, checking title first, then content, then
/// tags. Shared by both backends so the projection is identical regardless
/// of which one is active.
pub(crate) fn match_entry(entry: &Entry, table_name: &str, query: &str) -> Option<SearchResult> {
    let needle: Vec<char> = query.to_lowercase().chars().collect();
    if needle.is_empty() {
        return None;
    }

    let hit = if let Some(at) = find_ci(&entry.title, &needle) {
        Some((MatchedField::Title, snippet(&entry.title, at, needle.len())))
    } else if let Some(at) = find_ci(&entry.content, &needle) {
        Some((MatchedField::Content, snippet(&entry.content, at, needle.len())))
    } else {
        entry.tags.iter().find_map(|tag| {
            find_ci(tag, &needle).map(|at| (MatchedField::Tags, snippet(tag, at, needle.len())))
        })
    };

    hit.map(|(matching_field, context)| SearchResult {
        entry_id: entry.id,
        table_name: table_name.to_string(),
        title: entry.title.clone(),
        matching_field,
        context,
    })
}

/// Case-insensitive substring search returning the char index of the first
/// match. Works on chars rather than bytes so windowing never slices inside
/// a UTF-8 sequence.
fn find_ci(haystack: &str, needle_lower: &[char]) -> Option<usize> {
    let hay: Vec<char> = haystack
        .chars()
        .map(|c| c.to_lowercase().next().unwrap_or(c))
        .collect();
    if needle_lower.len() > hay.len() {
        return None;
    }
    (0..=hay.len() - needle_lower.len())
        .find(|&i| hay[i..i + needle_lower.len()] == *needle_lower)
}

/// Bounded context window around a match, with ellipses marking truncation.
fn snippet(text: &str, match_at: usize, needle_len: usize) -> String {
    let chars: Vec<char> = text.chars().collect();
    if chars.len() <= SNIPPET_PREVIEW {
        return text.to_string();
    }

    let start = match_at.saturating_sub(SNIPPET_CONTEXT);
    let end = (match_at + needle_len + SNIPPET_CONTEXT).min(chars.len());

    let mut out = String::new();
    if start > 0 {
        out.push_str("...");
    }
    out.extend(&chars[start..end]);
    if end < chars.len() {
        out.push_str("...");
    }
    out
}
