//! Form buffers for the multi-field screens. Buffers collect keystrokes;
//! nothing is validated or persisted until `parse_inputs` runs at submit
//! time, so a submission always reads every field's current value in one go.

use anyhow::{anyhow, Result};
use ratatui::style::{Color, Style};
use ratatui::text::{Line, Span};

use crate::models::{Entry, EntryDraft, Table};

/// Single-line text buffer used by the setup, import and export prompts.
#[derive(Default, Clone)]
pub(crate) struct TextPrompt {
    pub(crate) value: String,
}

impl TextPrompt {
    pub(crate) fn with_value<S: Into<String>>(value: S) -> Self {
        Self {
            value: value.into(),
        }
    }

    pub(crate) fn push_char(&mut self, ch: char) -> bool {
        if ch.is_control() {
            return false;
        }
        self.value.push(ch);
        true
    }

    pub(crate) fn backspace(&mut self) {
        self.value.pop();
    }

    pub(crate) fn trimmed(&self) -> &str {
        self.value.trim()
    }
}

/// The create-table form: a single name field restricted at the keystroke
/// level to the characters the store accepts.
#[derive(Default, Clone)]
pub(crate) struct TableForm {
    pub(crate) name: String,
}

impl TableForm {
    pub(crate) fn push_char(&mut self, ch: char) -> bool {
        if ch.is_ascii_alphanumeric() || ch == '_' {
            self.name.push(ch);
            true
        } else {
            false
        }
    }

    pub(crate) fn backspace(&mut self) {
        self.name.pop();
    }

    pub(crate) fn parse_inputs(&self) -> Result<String> {
        if self.name.is_empty() {
            return Err(anyhow!("Table name is required."));
        }
        Ok(self.name.clone())
    }
}

/// Fields within the entry form, in focus order.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub(crate) enum EntryField {
    Title,
    Tags,
    Content,
}

impl Default for EntryField {
    fn default() -> Self {
        EntryField::Title
    }
}

/// Form state shared by entry creation and editing.
#[derive(Default, Clone)]
pub(crate) struct EntryForm {
    pub(crate) title: String,
    pub(crate) tags: String,
    pub(crate) content: String,
    pub(crate) active: EntryField,
}

impl EntryForm {
    /// Populate the form from an existing entry when entering edit mode.
    pub(crate) fn from_entry(entry: &Entry) -> Self {
        Self {
            title: entry.title.clone(),
            tags: entry.tag_line(),
            content: entry.content.clone(),
            active: EntryField::Title,
        }
    }

    /// Advance focus cyclically: title, tags, content, back to title.
    pub(crate) fn cycle_field(&mut self) {
        self.active = match self.active {
            EntryField::Title => EntryField::Tags,
            EntryField::Tags => EntryField::Content,
            EntryField::Content => EntryField::Title,
        };
    }

    pub(crate) fn push_char(&mut self, ch: char) -> bool {
        if ch.is_control() {
            return false;
        }
        match self.active {
            EntryField::Title => self.title.push(ch),
            EntryField::Tags => self.tags.push(ch),
            EntryField::Content => self.content.push(ch),
        }
        true
    }

    /// Enter inserts a line break only while the content field has focus.
    pub(crate) fn insert_newline(&mut self) -> bool {
        if self.active == EntryField::Content {
            self.content.push('\n');
            true
        } else {
            false
        }
    }

    pub(crate) fn backspace(&mut self) {
        match self.active {
            EntryField::Title => {
                self.title.pop();
            }
            EntryField::Tags => {
                self.tags.pop();
            }
            EntryField::Content => {
                self.content.pop();
            }
        }
    }

    /// Validate and normalize the buffers into a draft ready for the store.
    /// Tags are comma-separated; blanks between commas are dropped.
    pub(crate) fn parse_inputs(&self) -> Result<EntryDraft> {
        let title = self.title.trim();
        if title.is_empty() {
            return Err(anyhow!("Entry title is required."));
        }
        let tags = self
            .tags
            .split(',')
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .collect();
        Ok(EntryDraft {
            title: title.to_string(),
            tags,
            content: self.content.clone(),
        })
    }

    /// Render a styled single-line field row for the form.
    pub(crate) fn build_line(&self, field_name: &str, field: EntryField) -> Line<'static> {
        let (value, is_active) = match field {
            EntryField::Title => (&self.title, self.active == EntryField::Title),
            EntryField::Tags => (&self.tags, self.active == EntryField::Tags),
            EntryField::Content => (&self.content, self.active == EntryField::Content),
        };

        let placeholder = match field {
            EntryField::Title => "<required>",
            EntryField::Tags => "<comma-separated>",
            EntryField::Content => "",
        };

        let display = if value.is_empty() {
            placeholder.to_string()
        } else {
            value.clone()
        };

        let style = if is_active {
            Style::default().fg(Color::Yellow)
        } else if value.is_empty() {
            Style::default().fg(Color::DarkGray)
        } else {
            Style::default()
        };

        Line::from(vec![
            Span::raw(format!("{field_name}: ")),
            Span::styled(display, style),
        ])
    }

    /// Character count of the requested field, for cursor placement.
    pub(crate) fn value_len(&self, field: EntryField) -> usize {
        match field {
            EntryField::Title => self.title.chars().count(),
            EntryField::Tags => self.tags.chars().count(),
            EntryField::Content => self.content.chars().count(),
        }
    }
}

/// The destructive action a confirmation screen is guarding. Only the
/// confirmation transition consults this; any other keystroke drops it.
pub(crate) enum ConfirmAction {
    DeleteTable(Table),
    DeleteEntry {
        table_id: i64,
        table_name: String,
        entry: Entry,
    },
}

impl ConfirmAction {
    pub(crate) fn title(&self) -> &'static str {
        match self {
            ConfirmAction::DeleteTable(_) => "Delete Table",
            ConfirmAction::DeleteEntry { .. } => "Delete Entry",
        }
    }

    pub(crate) fn message(&self) -> String {
        match self {
            ConfirmAction::DeleteTable(table) => format!(
                "Delete table \"{}\" and its {} entries? This cannot be undone.",
                table.name,
                table.entry_count()
            ),
            ConfirmAction::DeleteEntry {
                entry, table_name, ..
            } => format!(
                "Delete entry \"{}\" from \"{}\"? This cannot be undone.",
                entry.title, table_name
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_form_filters_illegal_characters() {
        let mut form = TableForm::default();
        assert!(form.push_char('N'));
        assert!(!form.push_char(' '));
        assert!(!form.push_char('/'));
        assert!(form.push_char('_'));
        assert!(form.push_char('1'));
        assert_eq!(form.name, "N_1");
    }

    #[test]
    fn entry_form_focus_wraps_around() {
        let mut form = EntryForm::default();
        assert_eq!(form.active, EntryField::Title);
        form.cycle_field();
        assert_eq!(form.active, EntryField::Tags);
        form.cycle_field();
        assert_eq!(form.active, EntryField::Content);
        form.cycle_field();
        assert_eq!(form.active, EntryField::Title);
    }

    #[test]
    fn newline_only_lands_in_content() {
        let mut form = EntryForm::default();
        assert!(!form.insert_newline());
        form.active = EntryField::Content;
        assert!(form.insert_newline());
        assert_eq!(form.content, "\n");
    }

    #[test]
    fn parse_splits_and_trims_tags() {
        let form = EntryForm {
            title: "  Hello  ".to_string(),
            tags: "demo, , work ,".to_string(),
            content: "body".to_string(),
            active: EntryField::Title,
        };
        let draft = form.parse_inputs().unwrap();
        assert_eq!(draft.title, "Hello");
        assert_eq!(draft.tags, vec!["demo".to_string(), "work".to_string()]);
        assert_eq!(draft.content, "body");
    }

    #[test]
    fn parse_rejects_blank_titles() {
        let form = EntryForm {
            title: "   ".to_string(),
            ..EntryForm::default()
        };
        assert!(form.parse_inputs().is_err());
    }
}
