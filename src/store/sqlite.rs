//! SQLite backend. Every method encapsulates one query or transaction so the
//! rest of the codebase can stay focused on UI state management. Ids for
//! tables and entries are minted from a shared sequence so they are unique
//! across the whole store, not just within one table.

use std::collections::BTreeMap;
use std::path::Path;

use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, Error as SqlError, ErrorCode, OptionalExtension, Row};

use crate::error::{Result, ThighpadsError};
use crate::models::{Entry, EntryDraft, SearchResult, Table};

use super::{match_entry, validate_table_name, validate_title, Store};

pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Open (or create) the database file and run lazy migrations. Foreign
    /// keys are toggled on so the cascade from tables to entries behaves the
    /// same during tests and production runs.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path)?;
        Self::with_connection(conn)
    }

    /// In-memory database, used by the tests.
    #[cfg(test)]
    pub fn open_in_memory() -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        conn.execute("PRAGMA foreign_keys = ON", [])?;

        // Shared id sequence for tables and entries.
        conn.execute(
            "CREATE TABLE IF NOT EXISTS ids (
                id INTEGER PRIMARY KEY AUTOINCREMENT
            )",
            [],
        )?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS tables (
                id INTEGER PRIMARY KEY,
                name TEXT NOT NULL UNIQUE,
                author TEXT NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )",
            [],
        )?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS entries (
                id INTEGER PRIMARY KEY,
                table_id INTEGER NOT NULL,
                title TEXT NOT NULL,
                tags TEXT NOT NULL,
                content TEXT NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                FOREIGN KEY (table_id) REFERENCES tables(id) ON DELETE CASCADE
            )",
            [],
        )?;

        Ok(Self { conn })
    }

    /// Load the entries belonging to one table, ordered the way the UI lists
    /// them.
    fn entries_for_table(&self, table_id: i64) -> Result<Vec<Entry>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, table_id, title, tags, content, created_at, updated_at
             FROM entries
             WHERE table_id = ?1
             ORDER BY title COLLATE NOCASE, id",
        )?;

        let entries = stmt
            .query_map([table_id], row_entry)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(entries)
    }

    fn hydrate(&self, mut table: Table) -> Result<Table> {
        let mut entries = BTreeMap::new();
        for entry in self.entries_for_table(table.id)? {
            entries.insert(entry.id, entry);
        }
        table.entries = entries;
        Ok(table)
    }
}

impl Store for SqliteStore {
    fn create_table(&self, name: &str, author: &str) -> Result<Table> {
        validate_table_name(name)?;
        let now = Utc::now();

        let tx = self.conn.unchecked_transaction()?;
        tx.execute("INSERT INTO ids DEFAULT VALUES", [])?;
        let id = tx.last_insert_rowid();
        tx.execute(
            "INSERT INTO tables (id, name, author, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![id, name, author, now.to_rfc3339(), now.to_rfc3339()],
        )
        .map_err(|err| map_unique_constraint(err, name))?;
        tx.commit()?;

        Ok(Table {
            id,
            name: name.to_string(),
            author: author.to_string(),
            created_at: now,
            updated_at: now,
            entries: BTreeMap::new(),
        })
    }

    fn get_table(&self, id: i64) -> Result<Table> {
        let table = self
            .conn
            .query_row(
                "SELECT id, name, author, created_at, updated_at
                 FROM tables WHERE id = ?1",
                [id],
                row_table,
            )
            .optional()?
            .ok_or(ThighpadsError::TableNotFound(id))?;
        self.hydrate(table)
    }

    fn list_tables(&self) -> Result<Vec<Table>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, name, author, created_at, updated_at
             FROM tables
             ORDER BY name",
        )?;
        let tables = stmt
            .query_map([], row_table)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        tables
            .into_iter()
            .map(|table| self.hydrate(table))
            .collect()
    }

    fn delete_table(&self, id: i64) -> Result<()> {
        let tx = self.conn.unchecked_transaction()?;
        let deleted = tx.execute("DELETE FROM tables WHERE id = ?1", [id])?;
        if deleted == 0 {
            return Err(ThighpadsError::TableNotFound(id));
        }
        // The schema cascades to entries inside the same transaction.
        tx.commit()?;
        Ok(())
    }

    fn create_entry(&self, table_id: i64, draft: &EntryDraft) -> Result<Entry> {
        validate_title(&draft.title)?;
        let now = Utc::now();
        let tags = serde_json::to_string(&draft.tags)?;

        let tx = self.conn.unchecked_transaction()?;
        let exists: Option<i64> = tx
            .query_row("SELECT id FROM tables WHERE id = ?1", [table_id], |row| {
                row.get(0)
            })
            .optional()?;
        if exists.is_none() {
            return Err(ThighpadsError::TableNotFound(table_id));
        }

        tx.execute("INSERT INTO ids DEFAULT VALUES", [])?;
        let id = tx.last_insert_rowid();
        tx.execute(
            "INSERT INTO entries (id, table_id, title, tags, content, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                id,
                table_id,
                draft.title,
                tags,
                draft.content,
                now.to_rfc3339(),
                now.to_rfc3339()
            ],
        )?;
        touch_table(&tx, table_id, now)?;
        tx.commit()?;

        Ok(Entry {
            id,
            table_id,
            title: draft.title.clone(),
            tags: draft.tags.clone(),
            content: draft.content.clone(),
            created_at: now,
            updated_at: now,
        })
    }

    fn get_entry(&self, id: i64) -> Result<Entry> {
        self.conn
            .query_row(
                "SELECT id, table_id, title, tags, content, created_at, updated_at
                 FROM entries WHERE id = ?1",
                [id],
                row_entry,
            )
            .optional()?
            .ok_or(ThighpadsError::EntryNotFound(id))
    }

    fn update_entry(&self, id: i64, draft: &EntryDraft) -> Result<Entry> {
        validate_title(&draft.title)?;
        let existing = self.get_entry(id)?;
        let now = Utc::now();
        let tags = serde_json::to_string(&draft.tags)?;

        let tx = self.conn.unchecked_transaction()?;
        tx.execute(
            "UPDATE entries SET title = ?1, tags = ?2, content = ?3, updated_at = ?4
             WHERE id = ?5",
            params![draft.title, tags, draft.content, now.to_rfc3339(), id],
        )?;
        touch_table(&tx, existing.table_id, now)?;
        tx.commit()?;

        Ok(Entry {
            id,
            table_id: existing.table_id,
            title: draft.title.clone(),
            tags: draft.tags.clone(),
            content: draft.content.clone(),
            created_at: existing.created_at,
            updated_at: now,
        })
    }

    fn delete_entry(&self, id: i64) -> Result<()> {
        let existing = self.get_entry(id)?;
        let now = Utc::now();

        let tx = self.conn.unchecked_transaction()?;
        let deleted = tx.execute("DELETE FROM entries WHERE id = ?1", [id])?;
        if deleted == 0 {
            return Err(ThighpadsError::EntryNotFound(id));
        }
        touch_table(&tx, existing.table_id, now)?;
        tx.commit()?;
        Ok(())
    }

    fn search_entries(&self, query: &str) -> Result<Vec<SearchResult>> {
        let mut stmt = self.conn.prepare(
            "SELECT e.id, e.table_id, e.title, e.tags, e.content, e.created_at, e.updated_at,
                    t.name
             FROM entries e
             JOIN tables t ON t.id = e.table_id
             ORDER BY t.name, e.title COLLATE NOCASE, e.id",
        )?;

        let rows = stmt
            .query_map([], |row| Ok((row_entry(row)?, row.get::<_, String>(7)?)))?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(rows
            .iter()
            .filter_map(|(entry, table_name)| match_entry(entry, table_name, query))
            .collect())
    }
}

/// Refresh the owning table's update timestamp inside the current
/// transaction; entry mutations count as table mutations.
fn touch_table(conn: &Connection, table_id: i64, now: DateTime<Utc>) -> rusqlite::Result<usize> {
    conn.execute(
        "UPDATE tables SET updated_at = ?1 WHERE id = ?2",
        params![now.to_rfc3339(), table_id],
    )
}

fn row_table(row: &Row) -> rusqlite::Result<Table> {
    Ok(Table {
        id: row.get(0)?,
        name: row.get(1)?,
        author: row.get(2)?,
        created_at: read_timestamp(row, 3)?,
        updated_at: read_timestamp(row, 4)?,
        entries: BTreeMap::new(),
    })
}

fn row_entry(row: &Row) -> rusqlite::Result<Entry> {
    let tags_raw: String = row.get(3)?;
    let tags: Vec<String> = serde_json::from_str(&tags_raw)
        .map_err(|err| SqlError::FromSqlConversionFailure(3, Type::Text, Box::new(err)))?;
    Ok(Entry {
        id: row.get(0)?,
        table_id: row.get(1)?,
        title: row.get(2)?,
        tags,
        content: row.get(4)?,
        created_at: read_timestamp(row, 5)?,
        updated_at: read_timestamp(row, 6)?,
    })
}

fn read_timestamp(row: &Row, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|err| SqlError::FromSqlConversionFailure(idx, Type::Text, Box::new(err)))
}

/// Coerce the UNIQUE violation on table names into the typed duplicate error
/// so the UI can show a friendly message.
fn map_unique_constraint(err: SqlError, name: &str) -> ThighpadsError {
    if matches!(err.sqlite_error_code(), Some(ErrorCode::ConstraintViolation)) {
        ThighpadsError::DuplicateName(name.to_string())
    } else {
        err.into()
    }
}
