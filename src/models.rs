//! Domain models shared by both store backends and the TUI. These types stay
//! light-weight data holders so other layers can focus on presentation and
//! persistence logic; all mutation happens inside the store so that id
//! assignment and timestamps stay centralized.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One snippet record owned by exactly one table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entry {
    /// Store-wide unique id, assigned by the store at creation time.
    pub id: i64,
    /// Id of the owning table. Deleting that table cascades to this entry.
    pub table_id: i64,
    /// Non-empty display title.
    pub title: String,
    /// Free-form tags, order preserved.
    #[serde(default)]
    pub tags: Vec<String>,
    /// Arbitrary text body.
    #[serde(default)]
    pub content: String,
    /// Set once when the entry is created.
    pub created_at: DateTime<Utc>,
    /// Refreshed by the store on every mutation.
    pub updated_at: DateTime<Utc>,
}

impl Entry {
    /// Comma-joined tag list for list rows and the entry viewer.
    pub fn tag_line(&self) -> String {
        self.tags.join(", ")
    }
}

/// A named collection of entries, unique by name across the whole store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Table {
    pub id: i64,
    /// Unique name restricted to letters, digits and underscores.
    pub name: String,
    pub author: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Entries keyed by entry id. Hydrated by the store on reads; empty in
    /// persisted documents where entries are stored separately.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub entries: BTreeMap<i64, Entry>,
}

impl Table {
    pub fn entry_count(&self) -> usize {
        self.entries.len()
    }

    /// Entries ordered case-insensitively by title, ties broken by id. The
    /// single source of truth for how entry lists are ordered in the UI.
    pub fn entries_by_title(&self) -> Vec<Entry> {
        let mut entries: Vec<Entry> = self.entries.values().cloned().collect();
        entries.sort_by(|a, b| {
            a.title
                .to_lowercase()
                .cmp(&b.title.to_lowercase())
                .then(a.id.cmp(&b.id))
        });
        entries
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// The client-supplied portion of an entry, used for create and update calls.
/// Ids and timestamps are never part of it; the store owns those.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntryDraft {
    pub title: String,
    pub tags: Vec<String>,
    pub content: String,
}

/// Which entry field a search query matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchedField {
    Title,
    Content,
    Tags,
}

impl MatchedField {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchedField::Title => "title",
            MatchedField::Content => "content",
            MatchedField::Tags => "tags",
        }
    }
}

impl fmt::Display for MatchedField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Read-only projection produced by a search query, never persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchResult {
    pub entry_id: i64,
    pub table_name: String,
    pub title: String,
    pub matching_field: MatchedField,
    /// Bounded window of text around the first match, with ellipses when the
    /// source field was truncated.
    pub context: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_entry(id: i64, title: &str) -> Entry {
        let now = Utc::now();
        Entry {
            id,
            table_id: 1,
            title: title.to_string(),
            tags: vec!["a".to_string(), "b".to_string()],
            content: String::new(),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn tag_line_joins_with_commas() {
        let entry = sample_entry(2, "Hello");
        assert_eq!(entry.tag_line(), "a, b");
    }

    #[test]
    fn entries_by_title_sorts_case_insensitively() {
        let now = Utc::now();
        let mut table = Table {
            id: 1,
            name: "Notes".to_string(),
            author: "me".to_string(),
            created_at: now,
            updated_at: now,
            entries: BTreeMap::new(),
        };
        table.entries.insert(2, sample_entry(2, "banana"));
        table.entries.insert(3, sample_entry(3, "Apple"));
        table.entries.insert(4, sample_entry(4, "cherry"));

        let titles: Vec<String> = table
            .entries_by_title()
            .into_iter()
            .map(|e| e.title)
            .collect();
        assert_eq!(titles, vec!["Apple", "banana", "cherry"]);
    }

    #[test]
    fn table_serializes_without_empty_entries() {
        let now = Utc::now();
        let table = Table {
            id: 1,
            name: "Notes".to_string(),
            author: "me".to_string(),
            created_at: now,
            updated_at: now,
            entries: BTreeMap::new(),
        };
        let json = serde_json::to_string(&table).unwrap();
        assert!(!json.contains("entries"));

        let back: Table = serde_json::from_str(&json).unwrap();
        assert_eq!(back.entries.len(), 0);
    }
}
