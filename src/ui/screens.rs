//! Per-screen list state. Each struct carries exactly what its screen needs
//! to render and navigate, so transitions can be tested without a rendering
//! surface.

use crate::models::{Entry, SearchResult, Table};

/// Table list shown on the home screen.
#[derive(Default)]
pub(crate) struct HomeScreen {
    pub(crate) tables: Vec<Table>,
    pub(crate) selected: usize,
}

impl HomeScreen {
    pub(crate) fn new(tables: Vec<Table>) -> Self {
        Self {
            tables,
            selected: 0,
        }
    }

    pub(crate) fn current_table(&self) -> Option<&Table> {
        self.tables.get(self.selected)
    }

    pub(crate) fn move_selection(&mut self, offset: isize) {
        self.selected = clamp_selection(self.selected, offset, self.tables.len());
    }
}

/// One table opened for browsing, entries pre-sorted for display.
pub(crate) struct TableScreen {
    pub(crate) table: Table,
    pub(crate) entries: Vec<Entry>,
    pub(crate) selected: usize,
}

impl TableScreen {
    pub(crate) fn new(table: Table) -> Self {
        let entries = table.entries_by_title();
        Self {
            table,
            entries,
            selected: 0,
        }
    }

    pub(crate) fn current_entry(&self) -> Option<&Entry> {
        self.entries.get(self.selected)
    }

    pub(crate) fn move_selection(&mut self, offset: isize) {
        self.selected = clamp_selection(self.selected, offset, self.entries.len());
    }
}

/// One entry opened in the viewer. The owning table's identity travels along
/// so back-navigation and edits know their context.
pub(crate) struct EntryScreen {
    pub(crate) table_id: i64,
    pub(crate) table_name: String,
    pub(crate) entry: Entry,
}

/// Hits of the most recent search.
pub(crate) struct ResultsScreen {
    pub(crate) query: String,
    pub(crate) results: Vec<SearchResult>,
    pub(crate) selected: usize,
}

impl ResultsScreen {
    pub(crate) fn new(query: String, results: Vec<SearchResult>) -> Self {
        Self {
            query,
            results,
            selected: 0,
        }
    }

    pub(crate) fn current_result(&self) -> Option<&SearchResult> {
        self.results.get(self.selected)
    }

    pub(crate) fn move_selection(&mut self, offset: isize) {
        self.selected = clamp_selection(self.selected, offset, self.results.len());
    }
}

fn clamp_selection(selected: usize, offset: isize, len: usize) -> usize {
    if len == 0 {
        return 0;
    }
    let max = len as isize - 1;
    (selected as isize + offset).clamp(0, max) as usize
}
