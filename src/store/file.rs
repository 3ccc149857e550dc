//! File-backed fallback store: one JSON document holding every table and
//! entry. Each mutating call rewrites the whole document synchronously, which
//! bounds the dataset to "fits comfortably in memory" — an explicit scale
//! assumption of this backend. A readers-writer lock serializes access so
//! background work can read while the event loop is idle.

use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;
use std::sync::{PoisonError, RwLock};

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::error::{Result, ThighpadsError};
use crate::models::{Entry, EntryDraft, SearchResult, Table};

use super::{match_entry, validate_table_name, validate_title, Store};

/// The persisted document. The id counter is intentionally absent: it is
/// reconstructed from the maximum id seen on load, so hand-edited documents
/// cannot desynchronize it.
#[derive(Debug, Default, Serialize, Deserialize)]
struct FileDocument {
    #[serde(default)]
    tables: Vec<Table>,
    #[serde(default)]
    entries: Vec<Entry>,
}

#[derive(Debug, Default)]
struct FileState {
    doc: FileDocument,
    next_id: i64,
}

pub struct FileStore {
    state: RwLock<FileState>,
    path: PathBuf,
}

impl FileStore {
    /// Load the document if one exists, otherwise start empty. A document
    /// that does not parse is an open error, not a silent reset.
    pub fn open(path: PathBuf) -> Result<Self> {
        let doc = if path.exists() {
            let raw = fs::read_to_string(&path)?;
            serde_json::from_str(&raw)?
        } else {
            FileDocument::default()
        };

        let max_id = doc
            .tables
            .iter()
            .map(|t| t.id)
            .chain(doc.entries.iter().map(|e| e.id))
            .max()
            .unwrap_or(0);

        Ok(Self {
            state: RwLock::new(FileState {
                doc,
                next_id: max_id + 1,
            }),
            path,
        })
    }

    fn save(&self, state: &FileState) -> Result<()> {
        let raw = serde_json::to_string_pretty(&state.doc)?;
        fs::write(&self.path, raw)?;
        Ok(())
    }

    fn read_state(&self) -> std::sync::RwLockReadGuard<'_, FileState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_state(&self) -> std::sync::RwLockWriteGuard<'_, FileState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }
}

fn mint_id(state: &mut FileState) -> i64 {
    let id = state.next_id;
    state.next_id += 1;
    id
}

fn hydrate(table: &Table, entries: &[Entry]) -> Table {
    let mut hydrated = table.clone();
    hydrated.entries = entries
        .iter()
        .filter(|e| e.table_id == table.id)
        .map(|e| (e.id, e.clone()))
        .collect::<BTreeMap<i64, Entry>>();
    hydrated
}

impl Store for FileStore {
    fn create_table(&self, name: &str, author: &str) -> Result<Table> {
        validate_table_name(name)?;

        let mut state = self.write_state();
        if state.doc.tables.iter().any(|t| t.name == name) {
            return Err(ThighpadsError::DuplicateName(name.to_string()));
        }

        let now = Utc::now();
        let table = Table {
            id: mint_id(&mut state),
            name: name.to_string(),
            author: author.to_string(),
            created_at: now,
            updated_at: now,
            entries: BTreeMap::new(),
        };
        state.doc.tables.push(table.clone());
        self.save(&state)?;
        Ok(table)
    }

    fn get_table(&self, id: i64) -> Result<Table> {
        let state = self.read_state();
        let table = state
            .doc
            .tables
            .iter()
            .find(|t| t.id == id)
            .ok_or(ThighpadsError::TableNotFound(id))?;
        Ok(hydrate(table, &state.doc.entries))
    }

    fn list_tables(&self) -> Result<Vec<Table>> {
        let state = self.read_state();
        let mut tables: Vec<Table> = state
            .doc
            .tables
            .iter()
            .map(|t| hydrate(t, &state.doc.entries))
            .collect();
        tables.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(tables)
    }

    fn delete_table(&self, id: i64) -> Result<()> {
        let mut state = self.write_state();
        let before = state.doc.tables.len();
        state.doc.tables.retain(|t| t.id != id);
        if state.doc.tables.len() == before {
            return Err(ThighpadsError::TableNotFound(id));
        }
        // Table and entries leave in the same rewrite, so a partial cascade
        // is never observable on disk.
        state.doc.entries.retain(|e| e.table_id != id);
        self.save(&state)
    }

    fn create_entry(&self, table_id: i64, draft: &EntryDraft) -> Result<Entry> {
        validate_title(&draft.title)?;

        let mut state = self.write_state();
        if !state.doc.tables.iter().any(|t| t.id == table_id) {
            return Err(ThighpadsError::TableNotFound(table_id));
        }

        let now = Utc::now();
        let entry = Entry {
            id: mint_id(&mut state),
            table_id,
            title: draft.title.clone(),
            tags: draft.tags.clone(),
            content: draft.content.clone(),
            created_at: now,
            updated_at: now,
        };
        state.doc.entries.push(entry.clone());
        if let Some(table) = state.doc.tables.iter_mut().find(|t| t.id == table_id) {
            table.updated_at = now;
        }
        self.save(&state)?;
        Ok(entry)
    }

    fn get_entry(&self, id: i64) -> Result<Entry> {
        let state = self.read_state();
        state
            .doc
            .entries
            .iter()
            .find(|e| e.id == id)
            .cloned()
            .ok_or(ThighpadsError::EntryNotFound(id))
    }

    fn update_entry(&self, id: i64, draft: &EntryDraft) -> Result<Entry> {
        validate_title(&draft.title)?;

        let mut state = self.write_state();
        let now = Utc::now();
        let entry = {
            let entry = state
                .doc
                .entries
                .iter_mut()
                .find(|e| e.id == id)
                .ok_or(ThighpadsError::EntryNotFound(id))?;
            entry.title = draft.title.clone();
            entry.tags = draft.tags.clone();
            entry.content = draft.content.clone();
            entry.updated_at = now;
            entry.clone()
        };
        if let Some(table) = state.doc.tables.iter_mut().find(|t| t.id == entry.table_id) {
            table.updated_at = now;
        }
        self.save(&state)?;
        Ok(entry)
    }

    fn delete_entry(&self, id: i64) -> Result<()> {
        let mut state = self.write_state();
        let table_id = state
            .doc
            .entries
            .iter()
            .find(|e| e.id == id)
            .map(|e| e.table_id)
            .ok_or(ThighpadsError::EntryNotFound(id))?;
        state.doc.entries.retain(|e| e.id != id);
        let now = Utc::now();
        if let Some(table) = state.doc.tables.iter_mut().find(|t| t.id == table_id) {
            table.updated_at = now;
        }
        self.save(&state)
    }

    fn search_entries(&self, query: &str) -> Result<Vec<SearchResult>> {
        let state = self.read_state();

        let mut tables: Vec<&Table> = state.doc.tables.iter().collect();
        tables.sort_by(|a, b| a.name.cmp(&b.name));

        let mut results = Vec::new();
        for table in tables {
            let mut entries: Vec<&Entry> = state
                .doc
                .entries
                .iter()
                .filter(|e| e.table_id == table.id)
                .collect();
            entries.sort_by(|a, b| {
                a.title
                    .to_lowercase()
                    .cmp(&b.title.to_lowercase())
                    .then(a.id.cmp(&b.id))
            });
            for entry in entries {
                if let Some(result) = match_entry(entry, &table.name, query) {
                    results.push(result);
                }
            }
        }
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store_in(dir: &TempDir) -> FileStore {
        FileStore::open(dir.path().join("thighpads.json")).unwrap()
    }

    fn draft(title: &str) -> EntryDraft {
        EntryDraft {
            title: title.to_string(),
            tags: vec!["demo".to_string()],
            content: "world".to_string(),
        }
    }

    #[test]
    fn next_id_is_reconstructed_from_the_document() {
        let dir = TempDir::new().unwrap();
        {
            let store = store_in(&dir);
            let table = store.create_table("Notes", "ada").unwrap();
            store.create_entry(table.id, &draft("Hello")).unwrap();
        }

        let store = store_in(&dir);
        let table = store.create_table("More", "ada").unwrap();
        let tables = store.list_tables().unwrap();
        let max_seen = tables
            .iter()
            .flat_map(|t| t.entries.keys().copied().chain([t.id]))
            .max()
            .unwrap();
        assert_eq!(table.id, max_seen);
    }

    #[test]
    fn corrupt_document_fails_to_open() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("thighpads.json");
        fs::write(&path, "not a database").unwrap();
        assert!(matches!(
            FileStore::open(path),
            Err(ThighpadsError::Json(_))
        ));
    }

    #[test]
    fn delete_table_cascades_in_one_rewrite() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        let table = store.create_table("Notes", "ada").unwrap();
        let entry = store.create_entry(table.id, &draft("Hello")).unwrap();

        store.delete_table(table.id).unwrap();
        assert!(store.list_tables().unwrap().is_empty());
        assert!(matches!(
            store.get_entry(entry.id),
            Err(ThighpadsError::EntryNotFound(_))
        ));

        // The document on disk must agree with the in-memory view.
        let reopened = store_in(&dir);
        assert!(reopened.list_tables().unwrap().is_empty());
    }

    #[test]
    fn duplicate_names_are_rejected_without_writing() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        store.create_table("Notes", "ada").unwrap();
        assert!(matches!(
            store.create_table("Notes", "bob"),
            Err(ThighpadsError::DuplicateName(_))
        ));
        assert_eq!(store.list_tables().unwrap().len(), 1);
    }

    #[test]
    fn search_orders_by_table_then_title() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        let beta = store.create_table("Beta", "ada").unwrap();
        let alpha = store.create_table("Alpha", "ada").unwrap();
        store.create_entry(beta.id, &draft("match one")).unwrap();
        store.create_entry(alpha.id, &draft("match two")).unwrap();

        let results = store.search_entries("match").unwrap();
        let tables: Vec<&str> = results.iter().map(|r| r.table_name.as_str()).collect();
        assert_eq!(tables, vec!["Alpha", "Beta"]);
    }
}
