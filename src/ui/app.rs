//! Screen controller for the ThighPads TUI: one `Screen` variant per state,
//! a key handler that maps `(screen, key)` to the next screen, and rendering
//! for each state. Store and codec failures never escape a handler; they
//! become a transient status message and the user stays where they were.

use std::mem;
use std::path::{Path, PathBuf};

use anyhow::Result;
use crossterm::event::KeyCode;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Wrap};
use ratatui::Frame;

use crate::config::{self, Config};
use crate::error::ThighpadsError;
use crate::portable;
use crate::store::Store;
use crate::update::AppMessage;

use super::forms::{ConfirmAction, EntryField, EntryForm, TableForm, TextPrompt};
use super::helpers::{centered_rect, short_date, surface_error};
use super::screens::{EntryScreen, HomeScreen, ResultsScreen, TableScreen};

/// Footer space reserved for status messages and instructions.
const FOOTER_HEIGHT: u16 = 3;

/// Every state of the controller. Each variant carries exactly the state its
/// screen needs; there is no shared mutable screen data outside of it.
enum Screen {
    Setup {
        form: TextPrompt,
    },
    Home(HomeScreen),
    TableDetail(TableScreen),
    EntryDetail(EntryScreen),
    CreateTable {
        form: TableForm,
    },
    CreateEntry {
        table_id: i64,
        table_name: String,
        form: EntryForm,
    },
    EditEntry {
        table_id: i64,
        table_name: String,
        entry_id: i64,
        form: EntryForm,
    },
    Import {
        form: TextPrompt,
    },
    Export {
        table_id: i64,
        table_name: String,
        entry_count: usize,
        form: TextPrompt,
    },
    Search {
        form: TextPrompt,
        origin: Box<Screen>,
    },
    SearchResults {
        results: ResultsScreen,
        origin: Box<Screen>,
    },
    Confirm {
        action: ConfirmAction,
        origin: Box<Screen>,
    },
    Settings {
        draft: Config,
    },
}

/// Holds the footer message text plus its severity.
struct StatusMessage {
    text: String,
    kind: StatusKind,
}

/// Severity levels shown in the footer.
#[derive(Clone, Copy, PartialEq, Eq)]
enum StatusKind {
    Info,
    Warning,
    Error,
}

impl StatusKind {
    fn style(&self) -> Style {
        match self {
            StatusKind::Info => Style::default().fg(Color::Green),
            StatusKind::Warning => Style::default().fg(Color::Yellow),
            StatusKind::Error => Style::default().fg(Color::Red),
        }
    }
}

/// Central application state shared across the TUI.
pub struct App {
    store: Box<dyn Store>,
    config: Config,
    data_dir: PathBuf,
    screen: Screen,
    status: Option<StatusMessage>,
}

impl App {
    /// Hydrate the initial screen: setup on first run, otherwise the table
    /// list.
    pub fn new(
        store: Box<dyn Store>,
        config: Config,
        data_dir: PathBuf,
        first_run: bool,
    ) -> crate::error::Result<Self> {
        let screen = if first_run {
            Screen::Setup {
                form: TextPrompt::default(),
            }
        } else {
            Screen::Home(HomeScreen::new(store.list_tables()?))
        };
        Ok(Self {
            store,
            config,
            data_dir,
            screen,
            status: None,
        })
    }

    /// Handle one key press; returns `true` when the user quit. The status
    /// message is cleared up front so every message survives exactly until
    /// the next input, never less than one full render cycle.
    pub(crate) fn handle_key(&mut self, code: KeyCode) -> Result<bool> {
        self.status = None;
        let mut exit = false;

        let screen = mem::replace(&mut self.screen, Screen::Home(HomeScreen::default()));
        self.screen = match screen {
            Screen::Setup { form } => self.handle_setup(code, form)?,
            Screen::Home(home) => self.handle_home(code, home, &mut exit)?,
            Screen::TableDetail(detail) => self.handle_table_detail(code, detail, &mut exit)?,
            Screen::EntryDetail(viewer) => self.handle_entry_detail(code, viewer, &mut exit)?,
            Screen::CreateTable { form } => self.handle_create_table(code, form)?,
            Screen::CreateEntry {
                table_id,
                table_name,
                form,
            } => self.handle_entry_form(code, table_id, table_name, None, form)?,
            Screen::EditEntry {
                table_id,
                table_name,
                entry_id,
                form,
            } => self.handle_entry_form(code, table_id, table_name, Some(entry_id), form)?,
            Screen::Import { form } => self.handle_import(code, form)?,
            Screen::Export {
                table_id,
                table_name,
                entry_count,
                form,
            } => self.handle_export(code, table_id, table_name, entry_count, form)?,
            Screen::Search { form, origin } => self.handle_search(code, form, origin)?,
            Screen::SearchResults { results, origin } => {
                self.handle_search_results(code, results, origin, &mut exit)?
            }
            Screen::Confirm { action, origin } => self.handle_confirm(code, action, origin)?,
            Screen::Settings { draft } => self.handle_settings(code, draft)?,
        };

        Ok(exit)
    }

    /// Ctrl+S submits whichever form is active; every other screen ignores it.
    pub(crate) fn handle_ctrl_s(&mut self) -> Result<()> {
        self.status = None;
        let screen = mem::replace(&mut self.screen, Screen::Home(HomeScreen::default()));
        self.screen = match screen {
            Screen::CreateEntry {
                table_id,
                table_name,
                form,
            } => self.submit_entry_form(table_id, table_name, None, form),
            Screen::EditEntry {
                table_id,
                table_name,
                entry_id,
                form,
            } => self.submit_entry_form(table_id, table_name, Some(entry_id), form),
            other => other,
        };
        Ok(())
    }

    /// Background results enter through here, on the same turn-taking
    /// schedule as key handling.
    pub(crate) fn handle_message(&mut self, message: AppMessage) {
        match message {
            AppMessage::UpdateAvailable { version } => {
                self.set_status(
                    format!("Update v{version} is available for download."),
                    StatusKind::Info,
                );
            }
        }
    }

    // --- key handlers, one per screen ---

    fn handle_setup(&mut self, code: KeyCode, mut form: TextPrompt) -> Result<Screen> {
        match code {
            KeyCode::Enter => {
                let username = form.trimmed().to_string();
                if username.is_empty() {
                    self.set_status("Please enter a username.", StatusKind::Error);
                    return Ok(Screen::Setup { form });
                }
                self.config.username = username;
                if let Err(err) = config::save_config(&self.data_dir, &self.config) {
                    self.set_status(surface_error(&err), StatusKind::Error);
                    return Ok(Screen::Setup { form });
                }
                self.set_status("Setup complete! Welcome to ThighPads.", StatusKind::Info);
                Ok(self.load_home())
            }
            KeyCode::Backspace => {
                form.backspace();
                Ok(Screen::Setup { form })
            }
            KeyCode::Char(ch) => {
                form.push_char(ch);
                Ok(Screen::Setup { form })
            }
            _ => Ok(Screen::Setup { form }),
        }
    }

    fn handle_home(
        &mut self,
        code: KeyCode,
        mut home: HomeScreen,
        exit: &mut bool,
    ) -> Result<Screen> {
        match code {
            KeyCode::Char('q') => {
                *exit = true;
            }
            KeyCode::Up => home.move_selection(-1),
            KeyCode::Down => home.move_selection(1),
            KeyCode::PageUp => home.move_selection(-5),
            KeyCode::PageDown => home.move_selection(5),
            KeyCode::Enter => {
                if let Some(table) = home.current_table() {
                    let id = table.id;
                    match self.store.get_table(id) {
                        Ok(table) => return Ok(Screen::TableDetail(TableScreen::new(table))),
                        Err(err) => self.report_store_error(&err),
                    }
                } else {
                    self.set_status("No table selected.", StatusKind::Error);
                }
            }
            KeyCode::Char('n') => {
                return Ok(Screen::CreateTable {
                    form: TableForm::default(),
                });
            }
            KeyCode::Char('i') => {
                return Ok(Screen::Import {
                    form: TextPrompt::default(),
                });
            }
            KeyCode::Char('f') => {
                return Ok(Screen::Search {
                    form: TextPrompt::default(),
                    origin: Box::new(Screen::Home(home)),
                });
            }
            KeyCode::Char('s') => {
                return Ok(Screen::Settings {
                    draft: self.config.clone(),
                });
            }
            KeyCode::Char('d') => {
                if let Some(table) = home.current_table().cloned() {
                    return Ok(Screen::Confirm {
                        action: ConfirmAction::DeleteTable(table),
                        origin: Box::new(Screen::Home(home)),
                    });
                }
                self.set_status("No table selected to delete.", StatusKind::Error);
            }
            _ => {}
        }
        Ok(Screen::Home(home))
    }

    fn handle_table_detail(
        &mut self,
        code: KeyCode,
        mut detail: TableScreen,
        exit: &mut bool,
    ) -> Result<Screen> {
        match code {
            KeyCode::Char('q') => {
                *exit = true;
            }
            KeyCode::Esc | KeyCode::Char('b') => return Ok(self.load_home()),
            KeyCode::Up => detail.move_selection(-1),
            KeyCode::Down => detail.move_selection(1),
            KeyCode::PageUp => detail.move_selection(-5),
            KeyCode::PageDown => detail.move_selection(5),
            KeyCode::Enter => {
                if let Some(entry) = detail.current_entry().cloned() {
                    return Ok(Screen::EntryDetail(EntryScreen {
                        table_id: detail.table.id,
                        table_name: detail.table.name.clone(),
                        entry,
                    }));
                }
                self.set_status("No entry selected.", StatusKind::Error);
            }
            KeyCode::Char('n') => {
                return Ok(Screen::CreateEntry {
                    table_id: detail.table.id,
                    table_name: detail.table.name.clone(),
                    form: EntryForm::default(),
                });
            }
            KeyCode::Char('e') => {
                return Ok(Screen::Export {
                    table_id: detail.table.id,
                    table_name: detail.table.name.clone(),
                    entry_count: detail.entries.len(),
                    form: TextPrompt::with_value(detail.table.name.clone()),
                });
            }
            KeyCode::Char('f') => {
                return Ok(Screen::Search {
                    form: TextPrompt::default(),
                    origin: Box::new(Screen::TableDetail(detail)),
                });
            }
            KeyCode::Char('d') => {
                if let Some(entry) = detail.current_entry().cloned() {
                    let table_id = detail.table.id;
                    let table_name = detail.table.name.clone();
                    return Ok(Screen::Confirm {
                        action: ConfirmAction::DeleteEntry {
                            table_id,
                            table_name,
                            entry,
                        },
                        origin: Box::new(Screen::TableDetail(detail)),
                    });
                }
                self.set_status("No entry selected to delete.", StatusKind::Error);
            }
            _ => {}
        }
        Ok(Screen::TableDetail(detail))
    }

    fn handle_entry_detail(
        &mut self,
        code: KeyCode,
        viewer: EntryScreen,
        exit: &mut bool,
    ) -> Result<Screen> {
        match code {
            KeyCode::Char('q') => {
                *exit = true;
                Ok(Screen::EntryDetail(viewer))
            }
            KeyCode::Esc | KeyCode::Char('b') => Ok(self.load_table_detail(viewer.table_id)),
            KeyCode::Char('e') => Ok(Screen::EditEntry {
                table_id: viewer.table_id,
                table_name: viewer.table_name.clone(),
                entry_id: viewer.entry.id,
                form: EntryForm::from_entry(&viewer.entry),
            }),
            KeyCode::Char('d') => {
                let table_id = viewer.table_id;
                let table_name = viewer.table_name.clone();
                let entry = viewer.entry.clone();
                Ok(Screen::Confirm {
                    action: ConfirmAction::DeleteEntry {
                        table_id,
                        table_name,
                        entry,
                    },
                    origin: Box::new(Screen::EntryDetail(viewer)),
                })
            }
            _ => Ok(Screen::EntryDetail(viewer)),
        }
    }

    fn handle_create_table(&mut self, code: KeyCode, mut form: TableForm) -> Result<Screen> {
        match code {
            KeyCode::Enter => {
                let name = match form.parse_inputs() {
                    Ok(name) => name,
                    Err(err) => {
                        self.set_status(surface_error(&err), StatusKind::Error);
                        return Ok(Screen::CreateTable { form });
                    }
                };
                match self.store.create_table(&name, &self.config.username) {
                    Ok(table) => {
                        self.set_status(
                            format!("Created table '{}'.", table.name),
                            StatusKind::Info,
                        );
                        Ok(self.load_home())
                    }
                    Err(err) => {
                        self.report_store_error(&err);
                        Ok(Screen::CreateTable { form })
                    }
                }
            }
            KeyCode::Esc => Ok(self.load_home()),
            KeyCode::Backspace => {
                form.backspace();
                Ok(Screen::CreateTable { form })
            }
            KeyCode::Char(ch) => {
                form.push_char(ch);
                Ok(Screen::CreateTable { form })
            }
            _ => Ok(Screen::CreateTable { form }),
        }
    }

    /// Shared handler for the create-entry and edit-entry forms; `entry_id`
    /// distinguishes the two. Submission happens through Ctrl+S.
    fn handle_entry_form(
        &mut self,
        code: KeyCode,
        table_id: i64,
        table_name: String,
        entry_id: Option<i64>,
        mut form: EntryForm,
    ) -> Result<Screen> {
        match code {
            KeyCode::Esc => return Ok(self.load_table_detail(table_id)),
            KeyCode::Tab => form.cycle_field(),
            KeyCode::Enter => {
                // Enter is a newline in the content body and focus-advance
                // everywhere else.
                if !form.insert_newline() {
                    form.cycle_field();
                }
            }
            KeyCode::Backspace => form.backspace(),
            KeyCode::Char(ch) => {
                form.push_char(ch);
            }
            _ => {}
        }
        Ok(rebuild_entry_form(table_id, table_name, entry_id, form))
    }

    /// Read every buffer atomically and run the store call; on failure the
    /// form is handed back untouched so the user can correct it.
    fn submit_entry_form(
        &mut self,
        table_id: i64,
        table_name: String,
        entry_id: Option<i64>,
        form: EntryForm,
    ) -> Screen {
        let draft = match form.parse_inputs() {
            Ok(draft) => draft,
            Err(err) => {
                self.set_status(surface_error(&err), StatusKind::Error);
                return rebuild_entry_form(table_id, table_name, entry_id, form);
            }
        };

        let result = match entry_id {
            None => self.store.create_entry(table_id, &draft).map(|_| "created"),
            Some(id) => self.store.update_entry(id, &draft).map(|_| "updated"),
        };

        match result {
            Ok(verb) => {
                self.set_status(format!("Entry {verb} successfully."), StatusKind::Info);
                self.load_table_detail(table_id)
            }
            Err(err) => {
                self.report_store_error(&err);
                rebuild_entry_form(table_id, table_name, entry_id, form)
            }
        }
    }

    fn handle_import(&mut self, code: KeyCode, mut form: TextPrompt) -> Result<Screen> {
        match code {
            KeyCode::Enter => {
                let path = form.trimmed().to_string();
                if path.is_empty() {
                    self.set_status("Enter the path to a .thighpad file.", StatusKind::Error);
                    return Ok(Screen::Import { form });
                }
                match portable::import_file(
                    self.store.as_ref(),
                    Path::new(&path),
                    &self.config.username,
                ) {
                    Ok(report) => {
                        if report.skipped.is_empty() {
                            self.set_status(
                                format!(
                                    "Imported table '{}' with {} entries.",
                                    report.table.name, report.imported
                                ),
                                StatusKind::Info,
                            );
                        } else {
                            self.set_status(
                                format!(
                                    "Imported '{}': {} entries, {} skipped.",
                                    report.table.name,
                                    report.imported,
                                    report.skipped.len()
                                ),
                                StatusKind::Warning,
                            );
                        }
                        Ok(self.load_home())
                    }
                    Err(err) => {
                        self.report_store_error(&err);
                        Ok(Screen::Import { form })
                    }
                }
            }
            KeyCode::Esc => Ok(self.load_home()),
            KeyCode::Backspace => {
                form.backspace();
                Ok(Screen::Import { form })
            }
            KeyCode::Char(ch) => {
                form.push_char(ch);
                Ok(Screen::Import { form })
            }
            _ => Ok(Screen::Import { form }),
        }
    }

    fn handle_export(
        &mut self,
        code: KeyCode,
        table_id: i64,
        table_name: String,
        entry_count: usize,
        mut form: TextPrompt,
    ) -> Result<Screen> {
        match code {
            KeyCode::Enter => {
                let destinations =
                    config::export_destinations(&self.data_dir, self.config.default_export);
                let file_name = form.trimmed().to_string();
                let file_name = if file_name.is_empty() {
                    None
                } else {
                    Some(file_name.as_str())
                };
                match portable::export_table(
                    self.store.as_ref(),
                    table_id,
                    &self.config.username,
                    file_name,
                    &destinations,
                ) {
                    Ok(outcome) => {
                        if outcome.failed.is_empty() {
                            let path = outcome
                                .primary_path()
                                .map(|p| p.display().to_string())
                                .unwrap_or_default();
                            self.set_status(format!("Exported to {path}."), StatusKind::Info);
                        } else {
                            self.set_status(
                                format!(
                                    "Exported to {} of {} destinations.",
                                    outcome.written.len(),
                                    outcome.written.len() + outcome.failed.len()
                                ),
                                StatusKind::Warning,
                            );
                        }
                        Ok(self.load_table_detail(table_id))
                    }
                    Err(err) => {
                        self.report_store_error(&err);
                        Ok(Screen::Export {
                            table_id,
                            table_name,
                            entry_count,
                            form,
                        })
                    }
                }
            }
            KeyCode::Esc => Ok(self.load_table_detail(table_id)),
            KeyCode::Backspace => {
                form.backspace();
                Ok(Screen::Export {
                    table_id,
                    table_name,
                    entry_count,
                    form,
                })
            }
            KeyCode::Char(ch) => {
                form.push_char(ch);
                Ok(Screen::Export {
                    table_id,
                    table_name,
                    entry_count,
                    form,
                })
            }
            _ => Ok(Screen::Export {
                table_id,
                table_name,
                entry_count,
                form,
            }),
        }
    }

    fn handle_search(
        &mut self,
        code: KeyCode,
        mut form: TextPrompt,
        origin: Box<Screen>,
    ) -> Result<Screen> {
        match code {
            KeyCode::Esc => Ok(*origin),
            KeyCode::Enter => {
                let query = form.trimmed().to_string();
                if query.is_empty() {
                    self.set_status("Enter a search term.", StatusKind::Error);
                    return Ok(Screen::Search { form, origin });
                }
                match self.store.search_entries(&query) {
                    Ok(results) => Ok(Screen::SearchResults {
                        results: ResultsScreen::new(query, results),
                        origin,
                    }),
                    Err(err) => {
                        self.report_store_error(&err);
                        Ok(Screen::Search { form, origin })
                    }
                }
            }
            KeyCode::Backspace => {
                form.backspace();
                Ok(Screen::Search { form, origin })
            }
            KeyCode::Char(ch) => {
                form.push_char(ch);
                Ok(Screen::Search { form, origin })
            }
            _ => Ok(Screen::Search { form, origin }),
        }
    }

    fn handle_search_results(
        &mut self,
        code: KeyCode,
        mut results: ResultsScreen,
        origin: Box<Screen>,
        exit: &mut bool,
    ) -> Result<Screen> {
        match code {
            KeyCode::Char('q') => {
                *exit = true;
            }
            KeyCode::Esc => return Ok(*origin),
            KeyCode::Up => results.move_selection(-1),
            KeyCode::Down => results.move_selection(1),
            KeyCode::PageUp => results.move_selection(-5),
            KeyCode::PageDown => results.move_selection(5),
            KeyCode::Enter => {
                if let Some(hit) = results.current_result() {
                    // Resolve through the store: the hit's table becomes the
                    // active context even if a different one was open before
                    // the search.
                    let entry_id = hit.entry_id;
                    let resolved = self
                        .store
                        .get_entry(entry_id)
                        .and_then(|entry| Ok((self.store.get_table(entry.table_id)?, entry)));
                    match resolved {
                        Ok((table, entry)) => {
                            return Ok(Screen::EntryDetail(EntryScreen {
                                table_id: table.id,
                                table_name: table.name,
                                entry,
                            }));
                        }
                        Err(err) => self.report_store_error(&err),
                    }
                }
            }
            _ => {}
        }
        Ok(Screen::SearchResults { results, origin })
    }

    fn handle_confirm(
        &mut self,
        code: KeyCode,
        action: ConfirmAction,
        origin: Box<Screen>,
    ) -> Result<Screen> {
        match code {
            // A repeat of the delete shortcut counts as confirmation, so two
            // quick presses perform the delete.
            KeyCode::Char('y') | KeyCode::Char('Y') | KeyCode::Char('d') => match action {
                ConfirmAction::DeleteTable(table) => match self.store.delete_table(table.id) {
                    Ok(()) => {
                        self.set_status(
                            format!("Deleted table '{}'.", table.name),
                            StatusKind::Info,
                        );
                        Ok(self.load_home())
                    }
                    Err(err) => {
                        self.report_store_error(&err);
                        Ok(*origin)
                    }
                },
                ConfirmAction::DeleteEntry {
                    table_id, entry, ..
                } => match self.store.delete_entry(entry.id) {
                    Ok(()) => {
                        self.set_status(
                            format!("Deleted entry '{}'.", entry.title),
                            StatusKind::Info,
                        );
                        Ok(self.load_table_detail(table_id))
                    }
                    Err(err) => {
                        self.report_store_error(&err);
                        Ok(*origin)
                    }
                },
            },
            // Anything else clears the pending confirmation.
            _ => Ok(*origin),
        }
    }

    fn handle_settings(&mut self, code: KeyCode, mut draft: Config) -> Result<Screen> {
        match code {
            KeyCode::Char('1') => {
                draft.auto_check_update = !draft.auto_check_update;
            }
            KeyCode::Char('2') => {
                draft.default_export = draft.default_export.next();
            }
            KeyCode::Char('s') => {
                if let Err(err) = config::save_config(&self.data_dir, &draft) {
                    self.set_status(surface_error(&err), StatusKind::Error);
                    return Ok(Screen::Settings { draft });
                }
                self.config = draft;
                self.set_status("Settings saved.", StatusKind::Info);
                return Ok(self.load_home());
            }
            KeyCode::Esc => return Ok(self.load_home()),
            _ => {}
        }
        Ok(Screen::Settings { draft })
    }

    // --- screen loading ---

    fn load_home(&mut self) -> Screen {
        match self.store.list_tables() {
            Ok(tables) => Screen::Home(HomeScreen::new(tables)),
            Err(err) => {
                self.report_store_error(&err);
                Screen::Home(HomeScreen::default())
            }
        }
    }

    fn load_table_detail(&mut self, table_id: i64) -> Screen {
        match self.store.get_table(table_id) {
            Ok(table) => Screen::TableDetail(TableScreen::new(table)),
            Err(err) => {
                self.report_store_error(&err);
                self.load_home()
            }
        }
    }

    fn report_store_error(&mut self, err: &ThighpadsError) {
        self.set_status(err.user_message(), StatusKind::Error);
    }

    fn set_status<S: Into<String>>(&mut self, text: S, kind: StatusKind) {
        self.status = Some(StatusMessage {
            text: text.into(),
            kind,
        });
    }

    // --- rendering ---

    pub(crate) fn draw(&self, frame: &mut Frame) {
        let area = frame.area();
        let footer_height = FOOTER_HEIGHT.min(area.height);

        let (content_area, footer_area) = if area.height > footer_height {
            let chunks = Layout::default()
                .direction(Direction::Vertical)
                .constraints([Constraint::Min(0), Constraint::Length(footer_height)])
                .split(area);
            (chunks[0], chunks[1])
        } else {
            (area, area)
        };

        self.draw_screen(frame, content_area, &self.screen);

        if area.height >= footer_height {
            self.draw_footer(frame, footer_area);
        }
    }

    /// Render one screen. Modal screens draw their origin behind themselves
    /// so the user keeps their bearings.
    fn draw_screen(&self, frame: &mut Frame, area: Rect, screen: &Screen) {
        match screen {
            Screen::Setup { form } => self.draw_setup(frame, area, form),
            Screen::Home(home) => self.draw_home(frame, area, home),
            Screen::TableDetail(detail) => self.draw_table_detail(frame, area, detail),
            Screen::EntryDetail(viewer) => self.draw_entry_detail(frame, area, viewer),
            Screen::CreateTable { form } => self.draw_create_table(frame, area, form),
            Screen::CreateEntry {
                table_name, form, ..
            } => self.draw_entry_form(frame, area, "New Entry", table_name, form),
            Screen::EditEntry {
                table_name, form, ..
            } => self.draw_entry_form(frame, area, "Edit Entry", table_name, form),
            Screen::Import { form } => self.draw_prompt(
                frame,
                area,
                "Import Table",
                "Enter the path to a .thighpad file:",
                &form.value,
            ),
            Screen::Export {
                table_name,
                entry_count,
                form,
                ..
            } => self.draw_export(frame, area, table_name, *entry_count, form),
            Screen::Search { form, origin } => {
                self.draw_screen(frame, area, origin);
                self.draw_prompt(frame, area, "Search", "Search entries:", &form.value);
            }
            Screen::SearchResults { results, .. } => self.draw_search_results(frame, area, results),
            Screen::Confirm { action, origin } => {
                self.draw_screen(frame, area, origin);
                self.draw_confirm(frame, area, action);
            }
            Screen::Settings { draft } => self.draw_settings(frame, area, draft),
        }
    }

    fn draw_setup(&self, frame: &mut Frame, area: Rect, form: &TextPrompt) {
        let block = Block::default()
            .title("Welcome to ThighPads")
            .borders(Borders::ALL);
        let inner = block.inner(area);
        frame.render_widget(block, area);

        let lines = vec![
            Line::from(Span::styled(
                "First-time setup",
                Style::default().add_modifier(Modifier::BOLD),
            )),
            Line::from(""),
            Line::from("Please enter your username:"),
            Line::from(Span::styled(
                form.value.clone(),
                Style::default().fg(Color::Yellow),
            )),
        ];
        frame.render_widget(Paragraph::new(lines).wrap(Wrap { trim: false }), inner);

        let cursor_x = inner.x + form.value.chars().count() as u16;
        frame.set_cursor_position((cursor_x.min(inner.right().saturating_sub(1)), inner.y + 3));
    }

    fn draw_home(&self, frame: &mut Frame, area: Rect, home: &HomeScreen) {
        let title = format!("ThighPads — Welcome, {}", self.config.username);
        let block = Block::default().title(title).borders(Borders::ALL);
        let inner = block.inner(area);
        frame.render_widget(block, area);

        if home.tables.is_empty() {
            let message =
                Paragraph::new("You don't have any tables yet. Press 'n' to create your first one.")
                    .alignment(Alignment::Center)
                    .wrap(Wrap { trim: true });
            frame.render_widget(message, inner);
            return;
        }

        let items: Vec<ListItem> = home
            .tables
            .iter()
            .map(|table| {
                ListItem::new(vec![
                    Line::from(Span::styled(
                        table.name.clone(),
                        Style::default().add_modifier(Modifier::BOLD),
                    )),
                    Line::from(Span::styled(
                        format!(
                            "  by {} on {} · {} entries",
                            table.author,
                            short_date(&table.created_at),
                            table.entry_count()
                        ),
                        Style::default().fg(Color::DarkGray),
                    )),
                ])
            })
            .collect();

        let list = List::new(items)
            .highlight_style(Style::default().fg(Color::Yellow))
            .highlight_symbol("▶ ");
        let mut list_state = ListState::default();
        list_state.select(Some(home.selected));
        frame.render_stateful_widget(list, inner, &mut list_state);
    }

    fn draw_table_detail(&self, frame: &mut Frame, area: Rect, detail: &TableScreen) {
        let title = format!(
            "{} — by {} on {}",
            detail.table.name,
            detail.table.author,
            short_date(&detail.table.created_at)
        );
        let block = Block::default().title(title).borders(Borders::ALL);
        let inner = block.inner(area);
        frame.render_widget(block, area);

        if detail.entries.is_empty() {
            let message =
                Paragraph::new("This table is empty. Press 'n' to create your first entry.")
                    .alignment(Alignment::Center)
                    .wrap(Wrap { trim: true });
            frame.render_widget(message, inner);
            return;
        }

        let items: Vec<ListItem> = detail
            .entries
            .iter()
            .map(|entry| {
                let tags = if entry.tags.is_empty() {
                    "no tags".to_string()
                } else {
                    entry.tag_line()
                };
                ListItem::new(vec![
                    Line::from(entry.title.clone()),
                    Line::from(Span::styled(
                        format!("  {tags}"),
                        Style::default().fg(Color::DarkGray),
                    )),
                ])
            })
            .collect();

        let list = List::new(items)
            .highlight_style(Style::default().fg(Color::Yellow))
            .highlight_symbol("▶ ");
        let mut list_state = ListState::default();
        list_state.select(Some(detail.selected));
        frame.render_stateful_widget(list, inner, &mut list_state);
    }

    fn draw_entry_detail(&self, frame: &mut Frame, area: Rect, viewer: &EntryScreen) {
        let block = Block::default()
            .title(viewer.entry.title.clone())
            .borders(Borders::ALL);
        let inner = block.inner(area);
        frame.render_widget(block, area);

        let mut lines = vec![
            Line::from(Span::styled(
                format!("Tags: {}", viewer.entry.tag_line()),
                Style::default().fg(Color::Cyan),
            )),
            Line::from(Span::styled(
                format!(
                    "Created {} · updated {}",
                    short_date(&viewer.entry.created_at),
                    short_date(&viewer.entry.updated_at)
                ),
                Style::default().fg(Color::DarkGray),
            )),
            Line::from(""),
        ];
        lines.extend(viewer.entry.content.lines().map(|l| Line::from(l.to_string())));

        frame.render_widget(Paragraph::new(lines).wrap(Wrap { trim: false }), inner);
    }

    fn draw_create_table(&self, frame: &mut Frame, area: Rect, form: &TableForm) {
        self.draw_prompt(
            frame,
            area,
            "Create New Table",
            "Enter a name (letters, digits, underscores):",
            &form.name,
        );
    }

    fn draw_export(
        &self,
        frame: &mut Frame,
        area: Rect,
        table_name: &str,
        entry_count: usize,
        form: &TextPrompt,
    ) {
        let popup_area = centered_rect(60, 40, area);
        frame.render_widget(Clear, popup_area);

        let block = Block::default().title("Export Table").borders(Borders::ALL);
        frame.render_widget(block.clone(), popup_area);
        let inner = block.inner(popup_area);

        let lines = vec![
            Line::from(format!(
                "Exporting '{table_name}' with {entry_count} entries"
            )),
            Line::from(Span::styled(
                format!("Destination: {}", self.config.default_export.label()),
                Style::default().fg(Color::DarkGray),
            )),
            Line::from(""),
            Line::from("File name:"),
            Line::from(Span::styled(
                form.value.clone(),
                Style::default().fg(Color::Yellow),
            )),
            Line::from(""),
            Line::from(Span::styled(
                "Enter to export • Esc to cancel",
                Style::default().fg(Color::Gray),
            )),
        ];
        frame.render_widget(Paragraph::new(lines).wrap(Wrap { trim: true }), inner);

        let cursor_x = inner.x + form.value.chars().count() as u16;
        frame.set_cursor_position((cursor_x.min(inner.right().saturating_sub(1)), inner.y + 4));
    }

    /// Generic single-field popup used by create-table, import and search.
    fn draw_prompt(&self, frame: &mut Frame, area: Rect, title: &str, label: &str, value: &str) {
        let popup_area = centered_rect(60, 30, area);
        frame.render_widget(Clear, popup_area);

        let block = Block::default().title(title).borders(Borders::ALL);
        frame.render_widget(block.clone(), popup_area);
        let inner = block.inner(popup_area);

        let lines = vec![
            Line::from(label.to_string()),
            Line::from(Span::styled(
                value.to_string(),
                Style::default().fg(Color::Yellow),
            )),
            Line::from(""),
            Line::from(Span::styled(
                "Enter to confirm • Esc to cancel",
                Style::default().fg(Color::Gray),
            )),
        ];
        frame.render_widget(Paragraph::new(lines).wrap(Wrap { trim: true }), inner);

        let cursor_x = inner.x + value.chars().count() as u16;
        frame.set_cursor_position((cursor_x.min(inner.right().saturating_sub(1)), inner.y + 1));
    }

    fn draw_entry_form(
        &self,
        frame: &mut Frame,
        area: Rect,
        title: &str,
        table_name: &str,
        form: &EntryForm,
    ) {
        let block = Block::default()
            .title(format!("{title} — {table_name}"))
            .borders(Borders::ALL);
        let inner = block.inner(area);
        frame.render_widget(block, area);

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(1),
                Constraint::Length(1),
                Constraint::Length(1),
                Constraint::Min(1),
            ])
            .split(inner);

        frame.render_widget(
            Paragraph::new(form.build_line("Title", EntryField::Title)),
            chunks[0],
        );
        frame.render_widget(
            Paragraph::new(form.build_line("Tags", EntryField::Tags)),
            chunks[1],
        );

        let content_label = if form.active == EntryField::Content {
            Span::styled("Content:", Style::default().fg(Color::Yellow))
        } else {
            Span::raw("Content:")
        };
        frame.render_widget(Paragraph::new(Line::from(content_label)), chunks[2]);

        let content_lines: Vec<Line> = form
            .content
            .lines()
            .map(|l| Line::from(l.to_string()))
            .collect();
        frame.render_widget(
            Paragraph::new(content_lines).wrap(Wrap { trim: false }),
            chunks[3],
        );

        match form.active {
            EntryField::Title => {
                let x = chunks[0].x + "Title: ".len() as u16
                    + form.value_len(EntryField::Title) as u16;
                frame.set_cursor_position((x, chunks[0].y));
            }
            EntryField::Tags => {
                let x =
                    chunks[1].x + "Tags: ".len() as u16 + form.value_len(EntryField::Tags) as u16;
                frame.set_cursor_position((x, chunks[1].y));
            }
            EntryField::Content => {
                let last_line = form.content.lines().last().unwrap_or("");
                let row = form.content.lines().count().saturating_sub(1) as u16;
                let x = chunks[3].x + last_line.chars().count() as u16;
                frame.set_cursor_position((
                    x.min(chunks[3].right().saturating_sub(1)),
                    (chunks[3].y + row).min(chunks[3].bottom().saturating_sub(1)),
                ));
            }
        }
    }

    fn draw_search_results(&self, frame: &mut Frame, area: Rect, results: &ResultsScreen) {
        let block = Block::default()
            .title(format!("Search results for \"{}\"", results.query))
            .borders(Borders::ALL);
        let inner = block.inner(area);
        frame.render_widget(block, area);

        if results.results.is_empty() {
            let message = Paragraph::new("No entries matched your search.")
                .alignment(Alignment::Center)
                .wrap(Wrap { trim: true });
            frame.render_widget(message, inner);
            return;
        }

        let items: Vec<ListItem> = results
            .results
            .iter()
            .map(|hit| {
                ListItem::new(vec![
                    Line::from(vec![
                        Span::styled(
                            hit.title.clone(),
                            Style::default().add_modifier(Modifier::BOLD),
                        ),
                        Span::styled(
                            format!("  ({})", hit.table_name),
                            Style::default().fg(Color::Cyan),
                        ),
                    ]),
                    Line::from(Span::styled(
                        format!("  {}: {}", hit.matching_field, hit.context),
                        Style::default().fg(Color::DarkGray),
                    )),
                ])
            })
            .collect();

        let list = List::new(items)
            .highlight_style(Style::default().fg(Color::Yellow))
            .highlight_symbol("▶ ");
        let mut list_state = ListState::default();
        list_state.select(Some(results.selected));
        frame.render_stateful_widget(list, inner, &mut list_state);
    }

    fn draw_confirm(&self, frame: &mut Frame, area: Rect, action: &ConfirmAction) {
        let popup_area = centered_rect(60, 30, area);
        frame.render_widget(Clear, popup_area);

        let block = Block::default()
            .title(action.title())
            .borders(Borders::ALL);
        frame.render_widget(block.clone(), popup_area);
        let inner = block.inner(popup_area);

        let lines = vec![
            Line::from(action.message()),
            Line::from(""),
            Line::from(Span::styled(
                "Press Y (or D again) to confirm; any other key cancels.",
                Style::default().fg(Color::Gray),
            )),
        ];
        frame.render_widget(
            Paragraph::new(lines)
                .alignment(Alignment::Left)
                .wrap(Wrap { trim: true }),
            inner,
        );
    }

    fn draw_settings(&self, frame: &mut Frame, area: Rect, draft: &Config) {
        let block = Block::default().title("Settings").borders(Borders::ALL);
        let inner = block.inner(area);
        frame.render_widget(block, area);

        let auto_update = if draft.auto_check_update { "On" } else { "Off" };
        let lines = vec![
            Line::from(vec![
                Span::styled("1. ", Style::default().fg(Color::Cyan)),
                Span::raw(format!("Auto-check for updates: {auto_update}")),
            ]),
            Line::from(vec![
                Span::styled("2. ", Style::default().fg(Color::Cyan)),
                Span::raw(format!(
                    "Default export location: {}",
                    draft.default_export.label()
                )),
            ]),
            Line::from(""),
            Line::from(Span::styled(
                "Press a number to change • 's' to save • Esc to discard",
                Style::default().fg(Color::Gray),
            )),
        ];
        frame.render_widget(Paragraph::new(lines).wrap(Wrap { trim: true }), inner);
    }

    fn draw_footer(&self, frame: &mut Frame, area: Rect) {
        let block = Block::default().borders(Borders::ALL);
        let inner = block.inner(area);
        frame.render_widget(block, area);

        let line = match &self.status {
            Some(status) => Line::from(Span::styled(status.text.clone(), status.kind.style())),
            None => self.footer_instructions(),
        };
        frame.render_widget(Paragraph::new(line), inner);
    }

    fn footer_instructions(&self) -> Line<'static> {
        let key_style = Style::default()
            .fg(Color::Cyan)
            .add_modifier(Modifier::BOLD);
        let pairs: &[(&str, &str)] = match &self.screen {
            Screen::Setup { .. } => &[("[Enter]", " Save username  "), ("[Ctrl+C]", " Quit")],
            Screen::Home(_) => &[
                ("[↑↓]", " Navigate  "),
                ("[Enter]", " Open  "),
                ("[n]", " New  "),
                ("[d]", " Delete  "),
                ("[i]", " Import  "),
                ("[f]", " Search  "),
                ("[s]", " Settings  "),
                ("[q]", " Quit"),
            ],
            Screen::TableDetail(_) => &[
                ("[↑↓]", " Navigate  "),
                ("[Enter]", " View  "),
                ("[n]", " New entry  "),
                ("[d]", " Delete  "),
                ("[e]", " Export  "),
                ("[f]", " Search  "),
                ("[Esc]", " Back  "),
                ("[q]", " Quit"),
            ],
            Screen::EntryDetail(_) => &[
                ("[e]", " Edit  "),
                ("[d]", " Delete  "),
                ("[Esc]", " Back  "),
                ("[q]", " Quit"),
            ],
            Screen::CreateTable { .. } | Screen::Import { .. } | Screen::Export { .. } => &[
                ("[Enter]", " Confirm  "),
                ("[Esc]", " Cancel  "),
                ("[Ctrl+C]", " Quit"),
            ],
            Screen::CreateEntry { .. } | Screen::EditEntry { .. } => &[
                ("[Tab]", " Next field  "),
                ("[Ctrl+S]", " Save  "),
                ("[Esc]", " Cancel"),
            ],
            Screen::Search { .. } => &[("[Enter]", " Search  "), ("[Esc]", " Cancel")],
            Screen::SearchResults { .. } => &[
                ("[↑↓]", " Navigate  "),
                ("[Enter]", " Open  "),
                ("[Esc]", " Back  "),
                ("[q]", " Quit"),
            ],
            Screen::Confirm { .. } => &[("[y/d]", " Confirm  "), ("[n/Esc]", " Cancel")],
            Screen::Settings { .. } => &[
                ("[1-2]", " Change  "),
                ("[s]", " Save  "),
                ("[Esc]", " Discard"),
            ],
        };

        let mut spans = Vec::with_capacity(pairs.len() * 2);
        for (key, label) in pairs {
            spans.push(Span::styled(*key, key_style));
            spans.push(Span::raw(*label));
        }
        Line::from(spans)
    }
}

fn rebuild_entry_form(
    table_id: i64,
    table_name: String,
    entry_id: Option<i64>,
    form: EntryForm,
) -> Screen {
    match entry_id {
        None => Screen::CreateEntry {
            table_id,
            table_name,
            form,
        },
        Some(entry_id) => Screen::EditEntry {
            table_id,
            table_name,
            entry_id,
            form,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::EntryDraft;
    use crate::store::SqliteStore;
    use tempfile::TempDir;

    fn app_with_store() -> (App, TempDir) {
        let dir = TempDir::new().unwrap();
        let store = Box::new(SqliteStore::open_in_memory().unwrap());
        let config = Config {
            username: "ada".to_string(),
            ..Config::default()
        };
        let app = App::new(store, config, dir.path().to_path_buf(), false).unwrap();
        (app, dir)
    }

    fn seeded_app() -> (App, TempDir, i64, i64) {
        let (mut app, dir) = app_with_store();
        let table = app.store.create_table("Notes", "ada").unwrap();
        let entry = app
            .store
            .create_entry(
                table.id,
                &EntryDraft {
                    title: "Hello".to_string(),
                    tags: vec!["demo".to_string()],
                    content: "world".to_string(),
                },
            )
            .unwrap();
        // Reload so the home list knows about the seed data.
        app.screen = app.load_home();
        (app, dir, table.id, entry.id)
    }

    fn open_entry_detail(app: &mut App) {
        app.handle_key(KeyCode::Enter).unwrap(); // home -> table detail
        app.handle_key(KeyCode::Enter).unwrap(); // table detail -> entry detail
        assert!(matches!(app.screen, Screen::EntryDetail(_)));
    }

    #[test]
    fn first_run_starts_on_setup() {
        let dir = TempDir::new().unwrap();
        let store = Box::new(SqliteStore::open_in_memory().unwrap());
        let app = App::new(store, Config::default(), dir.path().to_path_buf(), true).unwrap();
        assert!(matches!(app.screen, Screen::Setup { .. }));
    }

    #[test]
    fn setup_saves_the_username_and_lands_on_home() {
        let dir = TempDir::new().unwrap();
        let store = Box::new(SqliteStore::open_in_memory().unwrap());
        let mut app = App::new(store, Config::default(), dir.path().to_path_buf(), true).unwrap();

        for ch in "ada".chars() {
            app.handle_key(KeyCode::Char(ch)).unwrap();
        }
        app.handle_key(KeyCode::Enter).unwrap();

        assert!(matches!(app.screen, Screen::Home(_)));
        assert_eq!(app.config.username, "ada");
        assert!(!config::is_first_run(dir.path()));
    }

    #[test]
    fn double_delete_removes_the_entry() {
        let (mut app, _dir, _table_id, entry_id) = seeded_app();
        open_entry_detail(&mut app);

        app.handle_key(KeyCode::Char('d')).unwrap();
        assert!(matches!(app.screen, Screen::Confirm { .. }));
        app.handle_key(KeyCode::Char('d')).unwrap();

        assert!(matches!(app.screen, Screen::TableDetail(_)));
        assert!(matches!(
            app.store.get_entry(entry_id),
            Err(ThighpadsError::EntryNotFound(_))
        ));
    }

    #[test]
    fn delete_then_navigate_away_leaves_the_entry_intact() {
        let (mut app, _dir, _table_id, entry_id) = seeded_app();
        open_entry_detail(&mut app);

        app.handle_key(KeyCode::Char('d')).unwrap();
        assert!(matches!(app.screen, Screen::Confirm { .. }));
        // Any non-confirming key clears the pending confirmation.
        app.handle_key(KeyCode::Esc).unwrap();

        assert!(matches!(app.screen, Screen::EntryDetail(_)));
        assert!(app.store.get_entry(entry_id).is_ok());
    }

    #[test]
    fn table_delete_lands_on_home() {
        let (mut app, _dir, table_id, _entry_id) = seeded_app();

        app.handle_key(KeyCode::Char('d')).unwrap();
        assert!(matches!(app.screen, Screen::Confirm { .. }));
        app.handle_key(KeyCode::Char('y')).unwrap();

        assert!(matches!(app.screen, Screen::Home(_)));
        assert!(matches!(
            app.store.get_table(table_id),
            Err(ThighpadsError::TableNotFound(_))
        ));
    }

    #[test]
    fn search_returns_to_its_origin_on_cancel() {
        let (mut app, _dir, _table_id, _entry_id) = seeded_app();

        app.handle_key(KeyCode::Enter).unwrap(); // into table detail
        app.handle_key(KeyCode::Char('f')).unwrap();
        assert!(matches!(app.screen, Screen::Search { .. }));
        app.handle_key(KeyCode::Esc).unwrap();
        assert!(matches!(app.screen, Screen::TableDetail(_)));
    }

    #[test]
    fn search_result_opens_the_owning_table() {
        let (mut app, _dir, table_id, entry_id) = seeded_app();

        app.handle_key(KeyCode::Char('f')).unwrap();
        for ch in "hello".chars() {
            app.handle_key(KeyCode::Char(ch)).unwrap();
        }
        app.handle_key(KeyCode::Enter).unwrap();
        assert!(matches!(app.screen, Screen::SearchResults { .. }));

        app.handle_key(KeyCode::Enter).unwrap();
        match &app.screen {
            Screen::EntryDetail(viewer) => {
                assert_eq!(viewer.table_id, table_id);
                assert_eq!(viewer.entry.id, entry_id);
            }
            _ => panic!("expected the entry viewer"),
        }
    }

    #[test]
    fn create_table_with_duplicate_name_stays_on_the_form() {
        let (mut app, _dir, _table_id, _entry_id) = seeded_app();

        app.handle_key(KeyCode::Char('n')).unwrap();
        for ch in "Notes".chars() {
            app.handle_key(KeyCode::Char(ch)).unwrap();
        }
        app.handle_key(KeyCode::Enter).unwrap();

        assert!(matches!(app.screen, Screen::CreateTable { .. }));
        assert!(matches!(
            app.status,
            Some(StatusMessage {
                kind: StatusKind::Error,
                ..
            })
        ));
    }

    #[test]
    fn entry_form_submits_atomically_via_ctrl_s() {
        let (mut app, _dir, table_id, _entry_id) = seeded_app();

        app.handle_key(KeyCode::Enter).unwrap(); // table detail
        app.handle_key(KeyCode::Char('n')).unwrap(); // create entry
        for ch in "Second".chars() {
            app.handle_key(KeyCode::Char(ch)).unwrap();
        }
        app.handle_key(KeyCode::Tab).unwrap();
        for ch in "t1, t2".chars() {
            app.handle_key(KeyCode::Char(ch)).unwrap();
        }
        app.handle_key(KeyCode::Tab).unwrap();
        for ch in "body".chars() {
            app.handle_key(KeyCode::Char(ch)).unwrap();
        }
        app.handle_ctrl_s().unwrap();

        assert!(matches!(app.screen, Screen::TableDetail(_)));
        let table = app.store.get_table(table_id).unwrap();
        let titles: Vec<String> = table
            .entries_by_title()
            .into_iter()
            .map(|e| e.title)
            .collect();
        assert!(titles.contains(&"Second".to_string()));
    }

    #[test]
    fn status_clears_on_the_next_input() {
        let (mut app, _dir, _table_id, _entry_id) = seeded_app();
        app.handle_message(AppMessage::UpdateAvailable {
            version: "2.0.0".to_string(),
        });
        assert!(app.status.is_some());

        app.handle_key(KeyCode::Down).unwrap();
        assert!(app.status.is_none());
    }

    #[test]
    fn settings_escape_discards_the_draft() {
        let (mut app, _dir, _table_id, _entry_id) = seeded_app();
        let before = app.config.auto_check_update;

        app.handle_key(KeyCode::Char('s')).unwrap();
        assert!(matches!(app.screen, Screen::Settings { .. }));
        app.handle_key(KeyCode::Char('1')).unwrap();
        app.handle_key(KeyCode::Esc).unwrap();

        assert!(matches!(app.screen, Screen::Home(_)));
        assert_eq!(app.config.auto_check_update, before);
    }

    #[test]
    fn settings_save_persists_the_draft() {
        let (mut app, dir, _table_id, _entry_id) = seeded_app();

        app.handle_key(KeyCode::Char('s')).unwrap();
        app.handle_key(KeyCode::Char('1')).unwrap();
        app.handle_key(KeyCode::Char('2')).unwrap();
        app.handle_key(KeyCode::Char('s')).unwrap();

        assert!(matches!(app.screen, Screen::Home(_)));
        assert!(!app.config.auto_check_update);
        let persisted = config::load_config(dir.path()).unwrap();
        assert!(!persisted.auto_check_update);
    }
}
