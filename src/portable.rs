//! The `.thighpad` portable file: a versioned, human-inspectable JSON
//! envelope holding one table and all of its entries, used for manual backup
//! and sharing between installations. Import replays entries through the
//! normal store calls so ids and timestamps are minted exactly as if the
//! entries had been typed in.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Result, ThighpadsError};
use crate::models::{Entry, EntryDraft, Table};
use crate::store::Store;

/// Extension carried by every portable file.
pub const FILE_EXTENSION: &str = ".thighpad";
/// Current envelope format version. Import requires an exact match.
pub const FORMAT_VERSION: &str = "1.0";
/// Upper bound on collision probing before the export is reported failed.
const MAX_NAME_ATTEMPTS: u32 = 1000;
/// Stem used when sanitizing leaves nothing usable of the requested name.
const FALLBACK_FILE_STEM: &str = "ThighPads_Export";

/// Wire representation of the envelope. Kept separate from the domain types
/// so the on-disk format can stay stable independent of model changes, and
/// so foreign files missing optional fields still parse.
#[derive(Debug, Serialize, Deserialize)]
pub struct PortableFile {
    pub table: PortableTable,
    #[serde(default)]
    pub entries: Vec<PortableEntry>,
    pub meta: PortableMeta,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PortableTable {
    #[serde(default)]
    pub id: i64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PortableEntry {
    #[serde(default)]
    pub id: i64,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PortableMeta {
    pub exported_at: DateTime<Utc>,
    pub exported_by: String,
    /// Absent in the envelope means unsupported: there is no best-effort
    /// migration across versions.
    #[serde(default)]
    pub version: String,
}

impl From<&Table> for PortableTable {
    fn from(table: &Table) -> Self {
        Self {
            id: table.id,
            name: table.name.clone(),
            author: table.author.clone(),
            created_at: Some(table.created_at),
            updated_at: Some(table.updated_at),
        }
    }
}

impl From<&Entry> for PortableEntry {
    fn from(entry: &Entry) -> Self {
        Self {
            id: entry.id,
            title: entry.title.clone(),
            tags: entry.tags.clone(),
            content: entry.content.clone(),
            created_at: Some(entry.created_at),
            updated_at: Some(entry.updated_at),
        }
    }
}

/// Result of a multi-destination export. The call as a whole only fails when
/// `written` would be empty.
#[derive(Debug)]
pub struct ExportOutcome {
    pub written: Vec<PathBuf>,
    pub failed: Vec<(PathBuf, String)>,
}

impl ExportOutcome {
    /// The last successfully written path, shown in the status line.
    pub fn primary_path(&self) -> Option<&Path> {
        self.written.last().map(PathBuf::as_path)
    }
}

/// Serialize one table (plus entries) and write it to each destination
/// directory. Destinations are attempted independently: a failure is logged
/// and recorded but does not abort the others.
pub fn export_table(
    store: &dyn Store,
    table_id: i64,
    exported_by: &str,
    file_name: Option<&str>,
    destinations: &[PathBuf],
) -> Result<ExportOutcome> {
    let table = store.get_table(table_id)?;

    let envelope = PortableFile {
        table: PortableTable::from(&table),
        entries: table.entries.values().map(PortableEntry::from).collect(),
        meta: PortableMeta {
            exported_at: Utc::now(),
            exported_by: exported_by.to_string(),
            version: FORMAT_VERSION.to_string(),
        },
    };
    let data = serde_json::to_vec_pretty(&envelope)?;

    let requested = match file_name {
        Some(name) if !name.trim().is_empty() => name.trim(),
        _ => table.name.as_str(),
    };
    let file_name = with_extension(&sanitize_file_stem(requested));

    let mut outcome = ExportOutcome {
        written: Vec::new(),
        failed: Vec::new(),
    };

    for destination in destinations {
        let attempt = (|| -> Result<PathBuf> {
            fs::create_dir_all(destination)?;
            let path = unique_path(destination, &file_name)?;
            fs::write(&path, &data)?;
            Ok(path)
        })();

        match attempt {
            Ok(path) => outcome.written.push(path),
            Err(err) => {
                log::warn!("could not export to {}: {err}", destination.display());
                outcome.failed.push((destination.clone(), err.user_message()));
            }
        }
    }

    if outcome.written.is_empty() {
        return Err(ThighpadsError::ExportFailed);
    }
    Ok(outcome)
}

/// Per-entry outcome of an import.
#[derive(Debug)]
pub struct ImportReport {
    pub table: Table,
    pub imported: usize,
    /// Entries that failed to replay: (title, reason).
    pub skipped: Vec<(String, String)>,
}

/// Read a portable file and recreate its table under a new author. The table
/// is created through the store so a name collision surfaces as the usual
/// duplicate error, and every entry goes through `create_entry` so store
/// invariants hold exactly as for interactive creation.
pub fn import_file(store: &dyn Store, path: &Path, new_author: &str) -> Result<ImportReport> {
    let display_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());

    if !display_name.to_lowercase().ends_with(FILE_EXTENSION) {
        return Err(ThighpadsError::FormatMismatch(format!(
            "file must have the {FILE_EXTENSION} extension"
        )));
    }

    let data = fs::read(path)?;
    let envelope: PortableFile = serde_json::from_slice(&data)
        .map_err(|err| ThighpadsError::FormatMismatch(format!("malformed envelope: {err}")))?;

    if envelope.meta.version != FORMAT_VERSION {
        return Err(ThighpadsError::FormatMismatch(format!(
            "unsupported version {:?} (expected {FORMAT_VERSION:?})",
            envelope.meta.version
        )));
    }
    if envelope.table.name.is_empty() {
        return Err(ThighpadsError::FormatMismatch(
            "missing table name".to_string(),
        ));
    }

    let table = store.create_table(&envelope.table.name, new_author)?;

    let mut imported = 0;
    let mut skipped = Vec::new();
    for entry in &envelope.entries {
        let draft = EntryDraft {
            title: entry.title.clone(),
            tags: entry.tags.clone(),
            content: entry.content.clone(),
        };
        match store.create_entry(table.id, &draft) {
            Ok(_) => imported += 1,
            Err(err) => {
                log::warn!("skipping entry {:?}: {err}", entry.title);
                skipped.push((entry.title.clone(), err.user_message()));
            }
        }
    }

    if imported == 0 && !envelope.entries.is_empty() {
        return Err(ThighpadsError::NoEntriesImported);
    }

    let table = store.get_table(table.id)?;
    Ok(ImportReport {
        table,
        imported,
        skipped,
    })
}

/// Strip characters that are illegal in file names, collapsing to a fixed
/// fallback when nothing usable remains.
fn sanitize_file_stem(name: &str) -> String {
    const INVALID: &[char] = &['<', '>', ':', '"', '/', '\\', '|', '?', '*'];

    let cleaned: String = name
        .chars()
        .map(|c| if INVALID.contains(&c) || c.is_control() { '_' } else { c })
        .collect();
    let cleaned = cleaned.trim().to_string();

    if cleaned.is_empty() || cleaned == "." || cleaned == ".." {
        FALLBACK_FILE_STEM.to_string()
    } else {
        cleaned
    }
}

fn with_extension(stem: &str) -> String {
    if stem.to_lowercase().ends_with(FILE_EXTENSION) {
        stem.to_string()
    } else {
        format!("{stem}{FILE_EXTENSION}")
    }
}

/// Probe `name.thighpad`, `name_1.thighpad`, … until an unused path is found.
/// The attempt count is bounded; running out is an error, not a loop.
fn unique_path(dir: &Path, file_name: &str) -> Result<PathBuf> {
    let candidate = dir.join(file_name);
    if !candidate.exists() {
        return Ok(candidate);
    }

    let stem = &file_name[..file_name.len() - FILE_EXTENSION.len()];
    for counter in 1..=MAX_NAME_ATTEMPTS {
        let candidate = dir.join(format!("{stem}_{counter}{FILE_EXTENSION}"));
        if !candidate.exists() {
            return Ok(candidate);
        }
    }
    Err(ThighpadsError::ExportFailed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::SqliteStore;
    use tempfile::TempDir;

    fn seeded_store() -> (SqliteStore, i64) {
        let store = SqliteStore::open_in_memory().unwrap();
        let table = store.create_table("Notes", "ada").unwrap();
        store
            .create_entry(
                table.id,
                &EntryDraft {
                    title: "Hello".to_string(),
                    tags: vec!["demo".to_string()],
                    content: "world".to_string(),
                },
            )
            .unwrap();
        (store, table.id)
    }

    #[test]
    fn export_then_import_round_trips_entries() {
        let (store, table_id) = seeded_store();
        let dir = TempDir::new().unwrap();

        let outcome =
            export_table(&store, table_id, "ada", None, &[dir.path().to_path_buf()]).unwrap();
        let path = outcome.primary_path().unwrap().to_path_buf();
        assert_eq!(path.file_name().unwrap(), "Notes.thighpad");

        // Same name, so make room before replaying.
        store.delete_table(table_id).unwrap();
        let report = import_file(&store, &path, "bob").unwrap();
        assert_eq!(report.imported, 1);
        assert!(report.skipped.is_empty());
        assert_eq!(report.table.name, "Notes");
        assert_eq!(report.table.author, "bob");

        let entries = report.table.entries_by_title();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].title, "Hello");
        assert_eq!(entries[0].tags, vec!["demo".to_string()]);
        assert_eq!(entries[0].content, "world");
    }

    #[test]
    fn colliding_names_probe_numbered_suffixes() {
        let (store, table_id) = seeded_store();
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("Notes.thighpad"), "taken").unwrap();

        let outcome =
            export_table(&store, table_id, "ada", None, &[dir.path().to_path_buf()]).unwrap();
        assert_eq!(
            outcome.primary_path().unwrap().file_name().unwrap(),
            "Notes_1.thighpad"
        );
    }

    #[test]
    fn one_failed_destination_does_not_abort_the_rest() {
        let (store, table_id) = seeded_store();
        let dir = TempDir::new().unwrap();
        let blocked = dir.path().join("blocked");
        // A destination whose directory cannot be created: a plain file is
        // already squatting on the path.
        fs::write(&blocked, "file, not a directory").unwrap();
        let good = dir.path().join("good");

        let outcome = export_table(
            &store,
            table_id,
            "ada",
            None,
            &[blocked.clone(), good.clone()],
        )
        .unwrap();
        assert_eq!(outcome.written.len(), 1);
        assert_eq!(outcome.failed.len(), 1);
        assert!(outcome.written[0].starts_with(&good));
    }

    #[test]
    fn version_mismatch_is_rejected_regardless_of_payload() {
        let (store, _) = seeded_store();
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("old.thighpad");
        fs::write(
            &path,
            r#"{"table":{"name":"Old"},"entries":[],"meta":{"exported_at":"2024-01-01T00:00:00Z","exported_by":"x","version":"0.9"}}"#,
        )
        .unwrap();

        let err = import_file(&store, &path, "ada").unwrap_err();
        assert!(matches!(err, ThighpadsError::FormatMismatch(_)));
    }

    #[test]
    fn missing_version_is_a_format_mismatch() {
        let (store, _) = seeded_store();
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("unversioned.thighpad");
        fs::write(
            &path,
            r#"{"table":{"name":"Old"},"entries":[],"meta":{"exported_at":"2024-01-01T00:00:00Z","exported_by":"x"}}"#,
        )
        .unwrap();

        assert!(matches!(
            import_file(&store, &path, "ada"),
            Err(ThighpadsError::FormatMismatch(_))
        ));
    }

    #[test]
    fn wrong_extension_is_rejected_before_reading() {
        let (store, _) = seeded_store();
        let err = import_file(&store, Path::new("somewhere/notes.json"), "ada").unwrap_err();
        assert!(matches!(err, ThighpadsError::FormatMismatch(_)));
    }

    #[test]
    fn importing_a_duplicate_table_name_surfaces_the_collision() {
        let (store, table_id) = seeded_store();
        let dir = TempDir::new().unwrap();
        let outcome =
            export_table(&store, table_id, "ada", None, &[dir.path().to_path_buf()]).unwrap();

        let err = import_file(&store, outcome.primary_path().unwrap(), "ada").unwrap_err();
        assert!(matches!(err, ThighpadsError::DuplicateName(name) if name == "Notes"));
    }

    #[test]
    fn sanitizing_strips_path_separators() {
        assert_eq!(sanitize_file_stem("a/b\\c:d"), "a_b_c_d");
        assert_eq!(sanitize_file_stem(".."), "ThighPads_Export");
        assert_eq!(sanitize_file_stem("  "), "ThighPads_Export");
        assert_eq!(sanitize_file_stem("Notes"), "Notes");
    }

    #[test]
    fn custom_file_names_are_honored() {
        let (store, table_id) = seeded_store();
        let dir = TempDir::new().unwrap();
        let outcome = export_table(
            &store,
            table_id,
            "ada",
            Some("backup"),
            &[dir.path().to_path_buf()],
        )
        .unwrap();
        assert_eq!(
            outcome.primary_path().unwrap().file_name().unwrap(),
            "backup.thighpad"
        );
    }
}
