//! Error types for the ThighPads core library.

use thiserror::Error;

/// All errors that can surface from the persistence store and the portable
/// file codec.
#[derive(Debug, Error)]
pub enum ThighpadsError {
    /// A table id was requested that does not exist in the store.
    #[error("table not found: {0}")]
    TableNotFound(i64),

    /// An entry id was requested that does not exist in the store.
    #[error("entry not found: {0}")]
    EntryNotFound(i64),

    /// A table with the same name already exists.
    #[error("table already exists: {0}")]
    DuplicateName(String),

    /// A table name was empty or contained characters outside
    /// letters/digits/underscore.
    #[error("invalid table name: {0:?}")]
    InvalidName(String),

    /// An entry was submitted without a title.
    #[error("entry title must not be empty")]
    EmptyTitle,

    /// A portable file could not be understood: wrong extension, malformed
    /// envelope, or a format version other than the current one.
    #[error("invalid portable file: {0}")]
    FormatMismatch(String),

    /// An import created the table but none of the source entries replayed.
    #[error("failed to import any entries")]
    NoEntriesImported,

    /// An export could not be written to any of the requested destinations.
    #[error("failed to export to any destination")]
    ExportFailed,

    /// An I/O operation on the filesystem failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A SQLite operation failed.
    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Stored data could not be serialized or deserialized as JSON.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Convenience alias that pins the error type to [`ThighpadsError`].
pub type Result<T> = std::result::Result<T, ThighpadsError>;

impl ThighpadsError {
    /// Returns a short, human-readable message suitable for the status line.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::TableNotFound(_) => "Table no longer exists.".to_string(),
            Self::EntryNotFound(_) => "Entry no longer exists.".to_string(),
            Self::DuplicateName(name) => format!("A table named '{name}' already exists."),
            Self::InvalidName(_) => {
                "Table names may only use letters, digits and underscores.".to_string()
            }
            Self::EmptyTitle => "Entry title is required.".to_string(),
            Self::FormatMismatch(msg) => format!("Cannot read file: {msg}"),
            Self::NoEntriesImported => "No entries could be imported.".to_string(),
            Self::ExportFailed => "Export failed: no destination could be written.".to_string(),
            Self::Io(err) => format!("File error: {err}"),
            Self::Sqlite(err) => format!("Failed to save: {err}"),
            Self::Json(err) => format!("Data format error: {err}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_name_mentions_the_table() {
        let err = ThighpadsError::DuplicateName("Notes".to_string());
        assert!(err.user_message().contains("Notes"));
    }

    #[test]
    fn io_errors_convert() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "nope");
        let err = ThighpadsError::from(io);
        assert!(matches!(err, ThighpadsError::Io(_)));
    }
}
