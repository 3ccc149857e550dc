//! One assertion body, two backends: the store contract must hold regardless
//! of which backend was selected at startup, and the fallback selection must
//! be transparent to callers.

use std::fs;

use tempfile::TempDir;
use thighpads::models::{EntryDraft, MatchedField};
use thighpads::store::{open_store, FileStore, SqliteStore, Store};
use thighpads::ThighpadsError;

fn sqlite_store(dir: &TempDir) -> Box<dyn Store> {
    Box::new(SqliteStore::open(dir.path().join("thighpads.db")).unwrap())
}

fn file_store(dir: &TempDir) -> Box<dyn Store> {
    Box::new(FileStore::open(dir.path().join("thighpads.json")).unwrap())
}

fn draft(title: &str, tags: &[&str], content: &str) -> EntryDraft {
    EntryDraft {
        title: title.to_string(),
        tags: tags.iter().map(|t| t.to_string()).collect(),
        content: content.to_string(),
    }
}

/// The full CRUD/search contract from the point of view of a caller that
/// only knows the trait.
fn exercise_contract(store: &dyn Store) {
    // Create, list, and the basic scenario: one table, one entry.
    let notes = store.create_table("Notes", "ada").unwrap();
    let entry = store
        .create_entry(notes.id, &draft("Hello", &["demo"], "world"))
        .unwrap();
    assert_ne!(notes.id, entry.id, "ids are unique across the whole store");

    let listed = store.list_tables().unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].name, "Notes");
    assert_eq!(listed[0].entry_count(), 1);

    // Names are unique and validated.
    assert!(matches!(
        store.create_table("Notes", "bob"),
        Err(ThighpadsError::DuplicateName(_))
    ));
    assert!(matches!(
        store.create_table("bad name", "bob"),
        Err(ThighpadsError::InvalidName(_))
    ));
    assert!(matches!(
        store.create_entry(notes.id, &draft("", &[], "")),
        Err(ThighpadsError::EmptyTitle)
    ));
    assert!(matches!(
        store.create_entry(9999, &draft("Orphan", &[], "")),
        Err(ThighpadsError::TableNotFound(_))
    ));

    // Update preserves creation time and identity.
    let updated = store
        .update_entry(entry.id, &draft("Hello again", &["demo", "two"], "changed"))
        .unwrap();
    assert_eq!(updated.id, entry.id);
    assert_eq!(updated.created_at, entry.created_at);
    assert_eq!(updated.tags.len(), 2);

    // Search hits title, content and tags case-insensitively.
    let by_title = store.search_entries("hello AGAIN").unwrap();
    assert_eq!(by_title.len(), 1);
    assert_eq!(by_title[0].matching_field, MatchedField::Title);
    assert_eq!(by_title[0].entry_id, entry.id);
    assert_eq!(by_title[0].table_name, "Notes");

    assert_eq!(store.search_entries("CHANGED").unwrap().len(), 1);
    assert_eq!(store.search_entries("two").unwrap().len(), 1);
    assert!(store.search_entries("nowhere").unwrap().is_empty());

    // Delete the entry; the table stays, empty.
    store.delete_entry(entry.id).unwrap();
    assert!(matches!(
        store.delete_entry(entry.id),
        Err(ThighpadsError::EntryNotFound(_))
    ));
    assert_eq!(store.list_tables().unwrap()[0].entry_count(), 0);

    // Cascade: deleting a table removes every entry under it atomically.
    let scratch = store.create_table("Scratch", "ada").unwrap();
    let one = store
        .create_entry(scratch.id, &draft("One", &[], ""))
        .unwrap();
    let two = store
        .create_entry(scratch.id, &draft("Two", &[], ""))
        .unwrap();
    store.delete_table(scratch.id).unwrap();
    assert!(matches!(
        store.get_table(scratch.id),
        Err(ThighpadsError::TableNotFound(_))
    ));
    assert!(matches!(
        store.get_entry(one.id),
        Err(ThighpadsError::EntryNotFound(_))
    ));
    assert!(matches!(
        store.get_entry(two.id),
        Err(ThighpadsError::EntryNotFound(_))
    ));
    let names: Vec<String> = store
        .list_tables()
        .unwrap()
        .into_iter()
        .map(|t| t.name)
        .collect();
    assert_eq!(names, vec!["Notes".to_string()]);
}

#[test]
fn sqlite_backend_honors_the_contract() {
    let dir = TempDir::new().unwrap();
    let store = sqlite_store(&dir);
    exercise_contract(store.as_ref());
}

#[test]
fn file_backend_honors_the_contract() {
    let dir = TempDir::new().unwrap();
    let store = file_store(&dir);
    exercise_contract(store.as_ref());
}

#[test]
fn ids_stay_unique_across_many_tables() {
    for store in [
        sqlite_store(&TempDir::new().unwrap()),
        file_store(&TempDir::new().unwrap()),
    ] {
        let mut seen = std::collections::HashSet::new();
        for name in ["A", "B", "C"] {
            let table = store.create_table(name, "ada").unwrap();
            assert!(seen.insert(table.id));
            for i in 0..3 {
                let entry = store
                    .create_entry(table.id, &draft(&format!("e{i}"), &[], ""))
                    .unwrap();
                assert!(seen.insert(entry.id));
            }
        }
    }
}

#[test]
fn open_store_falls_back_when_the_primary_cannot_open() {
    let dir = TempDir::new().unwrap();
    // Squat on the database path with a directory so the SQLite open fails.
    fs::create_dir(dir.path().join("thighpads.db")).unwrap();

    let store = open_store(dir.path()).unwrap();
    exercise_contract(store.as_ref());

    // The fallback document is the one that actually grew.
    assert!(dir.path().join("thighpads.json").exists());
}

#[test]
fn open_store_prefers_the_primary() {
    let dir = TempDir::new().unwrap();
    let store = open_store(dir.path()).unwrap();
    store.create_table("Primary", "ada").unwrap();
    assert!(dir.path().join("thighpads.db").exists());
    assert!(!dir.path().join("thighpads.json").exists());
}

#[test]
fn file_backend_state_survives_a_reopen() {
    let dir = TempDir::new().unwrap();
    {
        let store = file_store(&dir);
        let table = store.create_table("Durable", "ada").unwrap();
        store
            .create_entry(table.id, &draft("kept", &["tag"], "body"))
            .unwrap();
    }

    let store = file_store(&dir);
    let tables = store.list_tables().unwrap();
    assert_eq!(tables.len(), 1);
    assert_eq!(tables[0].entry_count(), 1);
    let entries = tables[0].entries_by_title();
    assert_eq!(entries[0].title, "kept");
    assert_eq!(entries[0].tags, vec!["tag".to_string()]);
}
