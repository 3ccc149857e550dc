//! Core library surface for the ThighPads TUI application.
//!
//! The public modules exposed here provide an intentionally small API so the
//! `bin` target as well as external tooling (and the test suites) can reuse
//! the same pieces: the dual-backend store, the portable file codec, the
//! screen controller, and the update/install collaborator boundary.
pub mod config;
pub mod error;
pub mod models;
pub mod portable;
pub mod store;
pub mod ui;
pub mod update;

/// Typed failures shared by the store and the codec.
pub use error::{Result, ThighpadsError};

/// The domain types other layers manipulate.
pub use models::{Entry, EntryDraft, SearchResult, Table};

/// The persistence contract and its one-shot backend selection.
pub use store::{open_store, Store};

/// The interactive application entry point and state container.
pub use ui::{run_app, App};
