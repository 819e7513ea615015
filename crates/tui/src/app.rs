use std::{
    cmp,
    collections::HashMap,
    io,
    path::PathBuf,
    thread,
    time::{Duration, Instant},
};

use anyhow::{Context, Result};
use chrono::Local;
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use drive_core::{
    editor::{EditSession, FormField},
    fields::{format_hp_con, format_number, HpCon},
    import::{parse_bulk, BulkImport, BulkOptions},
    library::{Library, Upsert},
    models::{Card, Extra, Precon},
    storage::{DataStore, Dataset, LoadOrigin, Loaded, WatchEvent},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Wrap},
    Frame, Terminal,
};
use tokio::{spawn, sync::mpsc};
use tracing::{debug, error, info, warn};

const TICK_RATE: Duration = Duration::from_millis(250);
const MAX_INPUT_LEN: usize = 512;
/// Watcher events this soon after our own save are ignored.
const SELF_WRITE_GRACE: Duration = Duration::from_secs(2);

#[derive(Debug, Clone)]
struct Theme {
    primary_fg: Color,
    accent: Color,
    muted: Color,
    selection_bg: Color,
    success: Color,
    warning: Color,
    danger: Color,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            primary_fg: Color::White,
            accent: Color::Cyan,
            muted: Color::DarkGray,
            selection_bg: Color::DarkGray,
            success: Color::Green,
            warning: Color::Yellow,
            danger: Color::Red,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Browse,
    Filter,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Screen {
    Cards,
    Editor,
    Precons,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EditorFocus {
    Fields,
    Prints,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PromptPurpose {
    EditField(FormField),
    ImportPath,
}

/// Single-line text input shown as a modal.
#[derive(Debug, Clone)]
struct TextPrompt {
    title: String,
    instruction: String,
    input: String,
    /// Cursor position in characters.
    cursor: usize,
    purpose: PromptPurpose,
}

impl TextPrompt {
    fn new(
        title: impl Into<String>,
        instruction: impl Into<String>,
        initial: &str,
        purpose: PromptPurpose,
    ) -> Self {
        Self {
            title: title.into(),
            instruction: instruction.into(),
            input: initial.to_string(),
            cursor: initial.chars().count(),
            purpose,
        }
    }

    fn len(&self) -> usize {
        self.input.chars().count()
    }

    fn byte_index(&self) -> usize {
        self.input
            .char_indices()
            .nth(self.cursor)
            .map(|(index, _)| index)
            .unwrap_or(self.input.len())
    }

    fn move_cursor(&mut self, delta: isize) {
        let len = self.len() as isize;
        self.cursor = (self.cursor as isize + delta).clamp(0, len) as usize;
    }

    fn move_home(&mut self) {
        self.cursor = 0;
    }

    fn move_end(&mut self) {
        self.cursor = self.len();
    }

    fn insert(&mut self, ch: char) {
        if self.len() >= MAX_INPUT_LEN || ch.is_control() {
            return;
        }
        let index = self.byte_index();
        self.input.insert(index, ch);
        self.cursor += 1;
    }

    fn backspace(&mut self) {
        if self.cursor > 0 {
            self.cursor -= 1;
            let index = self.byte_index();
            self.input.remove(index);
        }
    }

    fn delete(&mut self) {
        if self.cursor < self.len() {
            let index = self.byte_index();
            self.input.remove(index);
        }
    }

    fn clear(&mut self) {
        self.input.clear();
        self.cursor = 0;
    }
}

/// Actions that wait for a y/n answer.
#[derive(Debug, Clone, PartialEq, Eq)]
enum ConfirmAction {
    Delete { id: String, name: String },
    Reload,
    Quit,
}

impl ConfirmAction {
    fn question(&self) -> String {
        match self {
            ConfirmAction::Delete { name, .. } => format!("Delete \"{name}\" from the library?"),
            ConfirmAction::Reload => "Reload both datasets and drop unsaved changes?".to_string(),
            ConfirmAction::Quit => "Quit with unsaved card changes?".to_string(),
        }
    }
}

/// Card editor state: the edit session plus cursor positions.
struct EditorState {
    session: EditSession,
    focus: EditorFocus,
    field_cursor: usize,
    print_cursor: usize,
}

impl EditorState {
    fn new(session: EditSession) -> Self {
        Self {
            session,
            focus: EditorFocus::Fields,
            field_cursor: 0,
            print_cursor: 0,
        }
    }

    fn visible_fields(&self) -> Vec<FormField> {
        FormField::visible(&self.session.form.card_type)
    }

    fn current_field(&self) -> Option<FormField> {
        self.visible_fields().get(self.field_cursor).copied()
    }

    fn move_field(&mut self, delta: isize) {
        let len = self.visible_fields().len();
        self.field_cursor = step(self.field_cursor, delta, len);
    }

    fn move_print(&mut self, delta: isize) {
        self.print_cursor = step(self.print_cursor, delta, self.session.prints.len());
    }

    fn clamp(&mut self) {
        self.field_cursor = step(self.field_cursor, 0, self.visible_fields().len());
        self.print_cursor = step(self.print_cursor, 0, self.session.prints.len());
    }

    fn title(&self) -> String {
        match self.session.id() {
            Some(id) => format!("Edit card {id}"),
            None => "New card".to_string(),
        }
    }
}

fn step(current: usize, delta: isize, len: usize) -> usize {
    if len == 0 {
        return 0;
    }
    (current as isize + delta).clamp(0, len as isize - 1) as usize
}

enum AppEvent {
    Input(Event),
    Tick,
    CardsLoaded(Loaded<Library>),
    PreconsLoaded(Loaded<Vec<Precon>>),
    Saved(Dataset, Result<PathBuf>),
    Imported(PathBuf, Result<BulkImport>),
}

/// Terminal card editor.
pub struct DriveAdminApp {
    store: DataStore,
    library: Library,
    precons: Vec<Precon>,
    state: UiState,
    screen: Screen,
    editor: Option<EditorState>,
    prompt: Option<TextPrompt>,
    confirm: Option<ConfirmAction>,
    event_tx: Option<mpsc::Sender<AppEvent>>,
    watch_rx: Option<mpsc::Receiver<WatchEvent>>,
    theme: Theme,
    pending_loads: usize,
    recent_saves: HashMap<Dataset, Instant>,
    origins: HashMap<Dataset, LoadOrigin>,
    dirty: bool,
}

impl DriveAdminApp {
    pub fn new(store: DataStore) -> Self {
        Self {
            store,
            library: Library::new(),
            precons: Vec::new(),
            state: UiState::default(),
            screen: Screen::Cards,
            editor: None,
            prompt: None,
            confirm: None,
            event_tx: None,
            watch_rx: None,
            theme: Theme::default(),
            pending_loads: 0,
            recent_saves: HashMap::new(),
            origins: HashMap::new(),
            dirty: false,
        }
    }

    pub fn attach_watcher(&mut self, receiver: mpsc::Receiver<WatchEvent>) {
        self.watch_rx = Some(receiver);
    }

    pub async fn run(&mut self) -> Result<()> {
        let mut stdout = io::stdout();
        enable_raw_mode().context("failed to enter raw mode")?;
        execute!(stdout, EnterAlternateScreen).context("failed to enter alternate screen")?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend).context("failed to create terminal")?;
        terminal.hide_cursor()?;
        terminal.clear()?;

        let (event_tx, mut event_rx) = mpsc::channel::<AppEvent>(128);
        spawn_input_thread(event_tx.clone());
        self.event_tx = Some(event_tx);
        self.start_reload();

        let mut watch_rx = self.watch_rx.take();

        loop {
            terminal.draw(|frame| self.draw(frame))?;
            if self.state.should_quit {
                break;
            }

            if let Some(rx) = watch_rx.as_mut() {
                let mut watch_closed = false;
                tokio::select! {
                    maybe_event = event_rx.recv() => {
                        if !self.process_app_event(maybe_event) {
                            break;
                        }
                    }
                    maybe_watch = rx.recv() => {
                        match maybe_watch {
                            Some(event) => self.handle_watch_event(event),
                            None => watch_closed = true,
                        }
                    }
                }
                if watch_closed {
                    watch_rx = None;
                }
            } else {
                let maybe_event = event_rx.recv().await;
                if !self.process_app_event(maybe_event) {
                    break;
                }
            }

            if self.state.should_quit {
                break;
            }
        }

        restore_terminal(&mut terminal)?;
        self.event_tx = None;
        Ok(())
    }

    fn process_app_event(&mut self, maybe_event: Option<AppEvent>) -> bool {
        match maybe_event {
            Some(AppEvent::Input(event)) => {
                if let Event::Key(key) = &event {
                    if key.kind != KeyEventKind::Press {
                        return true;
                    }
                }
                let result = match event {
                    Event::Key(key) if self.prompt.is_some() => self.handle_prompt_key(key),
                    Event::Key(key) if self.confirm.is_some() => self.handle_confirm_key(key),
                    event => self.handle_input(event),
                };
                if let Err(err) = result {
                    error!(?err, "input handling failed");
                    self.state.set_status(format!("Error: {err}"));
                }
                true
            }
            Some(AppEvent::Tick) => {
                self.handle_tick();
                true
            }
            Some(AppEvent::CardsLoaded(loaded)) => {
                self.finish_load();
                let message = describe_load(Dataset::Cards, &loaded, loaded.data.len());
                self.origins.insert(Dataset::Cards, loaded.origin);
                self.library = loaded.data;
                self.dirty = false;
                self.state.refresh_list(&self.library);
                info!(cards = self.library.len(), origin = ?loaded.origin, "cards ready");
                self.state.set_status(message);
                true
            }
            Some(AppEvent::PreconsLoaded(loaded)) => {
                self.finish_load();
                let message = describe_load(Dataset::Precons, &loaded, loaded.data.len());
                self.origins.insert(Dataset::Precons, loaded.origin);
                self.precons = loaded.data;
                self.state.precon_cursor = step(self.state.precon_cursor, 0, self.precons.len());
                info!(precons = self.precons.len(), origin = ?loaded.origin, "precons ready");
                self.state.set_status(message);
                true
            }
            Some(AppEvent::Saved(dataset, result)) => {
                match result {
                    Ok(path) => {
                        if dataset == Dataset::Cards {
                            self.dirty = false;
                        }
                        self.state
                            .set_status(format!("Saved {dataset} to {}", path.display()));
                    }
                    Err(err) => {
                        self.recent_saves.remove(&dataset);
                        error!(?err, %dataset, "save failed");
                        self.state
                            .set_status(format!("Saving {dataset} failed: {err:#}"));
                    }
                }
                true
            }
            Some(AppEvent::Imported(path, result)) => {
                match result {
                    Ok(import) => self.apply_import(path, import),
                    Err(err) => {
                        error!(?err, path = %path.display(), "bulk import failed");
                        self.state.set_status(format!("Import failed: {err:#}"));
                    }
                }
                true
            }
            None => false,
        }
    }

    fn handle_tick(&mut self) {
        if self.state.mode == Mode::Filter && self.screen == Screen::Cards {
            self.state
                .set_status(format!("Filter: {}", self.state.filter));
        }
    }

    fn handle_watch_event(&mut self, event: WatchEvent) {
        match event {
            WatchEvent::Changed(dataset) => {
                let own_write = self
                    .recent_saves
                    .get(&dataset)
                    .map(|saved| saved.elapsed() < SELF_WRITE_GRACE)
                    .unwrap_or(false);
                if own_write {
                    debug!(%dataset, "ignoring change from our own save");
                    return;
                }
                info!(%dataset, "dataset changed on disk");
                self.state.set_status(format!(
                    "{} changed on disk; Ctrl-R reloads",
                    dataset.file_name()
                ));
            }
            WatchEvent::Error(err) => {
                warn!(?err, "file watcher error");
                self.state.set_status(format!("Watcher error: {err}"));
            }
        }
    }

    fn finish_load(&mut self) {
        self.pending_loads = self.pending_loads.saturating_sub(1);
    }

    fn start_reload(&mut self) {
        if self.pending_loads > 0 {
            self.state
                .set_status("Datasets are already loading".to_string());
            return;
        }
        let Some(sender) = self.event_tx.clone() else {
            self.state
                .set_status("Internal error: event channel unavailable".to_string());
            error!("event_channel_missing");
            return;
        };
        self.pending_loads = 2;
        self.state
            .set_status("Loading cards and precons…".to_string());
        let store = self.store.clone();
        spawn(async move {
            let cards = store.load_cards().await;
            if sender.send(AppEvent::CardsLoaded(cards)).await.is_err() {
                return;
            }
            let precons = store.load_precons().await;
            let _ = sender.send(AppEvent::PreconsLoaded(precons)).await;
        });
    }

    fn start_save(&mut self, dataset: Dataset) {
        let Some(sender) = self.event_tx.clone() else {
            self.state
                .set_status("Internal error: event channel unavailable".to_string());
            error!("event_channel_missing");
            return;
        };
        self.recent_saves.insert(dataset, Instant::now());
        self.state.set_status(format!("Saving {dataset}…"));
        let store = self.store.clone();
        match dataset {
            Dataset::Cards => {
                let library = self.library.clone();
                spawn(async move {
                    let result = store.save_cards(&library).await;
                    let _ = sender.send(AppEvent::Saved(Dataset::Cards, result)).await;
                });
            }
            Dataset::Precons => {
                let precons = self.precons.clone();
                spawn(async move {
                    let result = store.save_precons(&precons).await;
                    let _ = sender.send(AppEvent::Saved(Dataset::Precons, result)).await;
                });
            }
        }
    }

    fn start_import(&mut self, raw_path: &str) {
        let trimmed = raw_path.trim();
        if trimmed.is_empty() {
            self.state.set_status("Import cancelled".to_string());
            return;
        }
        let Some(sender) = self.event_tx.clone() else {
            self.state
                .set_status("Internal error: event channel unavailable".to_string());
            error!("event_channel_missing");
            return;
        };
        let path = PathBuf::from(trimmed);
        info!(path = %path.display(), "importing bulk text");
        self.state
            .set_status(format!("Importing {}…", path.display()));
        spawn(async move {
            let result = tokio::fs::read_to_string(&path)
                .await
                .with_context(|| format!("failed to read {}", path.display()))
                .map(|text| parse_bulk(&text, &BulkOptions::default()));
            let _ = sender.send(AppEvent::Imported(path, result)).await;
        });
    }

    fn apply_import(&mut self, path: PathBuf, import: BulkImport) {
        let skipped = import.skipped;
        let delimiter = import.delimiter;
        let summary = self.library.merge(import.cards);
        if summary.added + summary.updated > 0 {
            self.dirty = true;
        }
        self.state.refresh_list(&self.library);
        info!(
            path = %path.display(),
            added = summary.added,
            updated = summary.updated,
            skipped,
            "bulk import applied"
        );
        self.state.set_status(format!(
            "Imported {}: {} added, {} updated, {} skipped ({delimiter} separated)",
            path.display(),
            summary.added,
            summary.updated,
            skipped
        ));
    }

    fn handle_input(&mut self, event: Event) -> Result<()> {
        let Event::Key(key) = event else {
            return Ok(());
        };
        if self.handle_global_shortcut(&key) {
            return Ok(());
        }
        match self.screen {
            Screen::Cards => match self.state.mode {
                Mode::Filter => self.handle_filter_key(key),
                Mode::Browse => self.handle_browse_key(key),
            },
            Screen::Editor => self.handle_editor_key(key),
            Screen::Precons => self.handle_precons_key(key),
        }
        Ok(())
    }

    fn handle_global_shortcut(&mut self, key: &KeyEvent) -> bool {
        if key.modifiers != KeyModifiers::CONTROL {
            return false;
        }
        match key.code {
            KeyCode::Char('r') => {
                if self.dirty {
                    self.confirm = Some(ConfirmAction::Reload);
                } else {
                    self.start_reload();
                }
                true
            }
            KeyCode::Char('c') => {
                self.request_quit();
                true
            }
            _ => false,
        }
    }

    fn request_quit(&mut self) {
        if self.dirty {
            self.confirm = Some(ConfirmAction::Quit);
        } else {
            self.state.should_quit = true;
        }
    }

    fn handle_filter_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Esc => {
                self.state.mode = Mode::Browse;
                self.state.filter.clear();
                self.state.apply_filter(&self.library);
                self.state.set_status("Filter cleared".to_string());
            }
            KeyCode::Enter => {
                self.state.mode = Mode::Browse;
                self.state.set_status(format!(
                    "Filter applied: {} ({} cards)",
                    self.state.filter,
                    self.state.filtered.len()
                ));
            }
            KeyCode::Backspace => {
                self.state.filter.pop();
                self.state.apply_filter(&self.library);
                self.state
                    .set_status(format!("Filter: {}", self.state.filter));
            }
            KeyCode::Char(c) => {
                if key.modifiers.is_empty() || key.modifiers == KeyModifiers::SHIFT {
                    self.state.filter.push(c);
                    self.state.apply_filter(&self.library);
                    self.state
                        .set_status(format!("Filter: {}", self.state.filter));
                }
            }
            _ => {}
        }
    }

    fn handle_browse_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('q') => self.request_quit(),
            KeyCode::Char('j') | KeyCode::Down => self.state.move_cursor(1),
            KeyCode::Char('k') | KeyCode::Up => self.state.move_cursor(-1),
            KeyCode::Char('g') | KeyCode::Home => self.state.move_to(0),
            KeyCode::Char('G') | KeyCode::End => self.state.move_to_end(),
            KeyCode::PageDown => self.state.page_down(),
            KeyCode::PageUp => self.state.page_up(),
            KeyCode::Char('/') => {
                self.state.mode = Mode::Filter;
                self.state.set_status("Enter filter text".to_string());
            }
            KeyCode::Char('n') => self.open_editor(EditSession::new()),
            KeyCode::Enter | KeyCode::Char('e') => {
                match self.current_card().map(EditSession::from_card) {
                    Some(session) => self.open_editor(session),
                    None => self.state.set_status("No card selected".to_string()),
                }
            }
            KeyCode::Char('d') | KeyCode::Delete => match self.current_card() {
                Some(card) => {
                    self.confirm = Some(ConfirmAction::Delete {
                        id: card.id.clone(),
                        name: card.display_name().to_string(),
                    });
                }
                None => self.state.set_status("No card selected".to_string()),
            },
            KeyCode::Char('i') => {
                self.prompt = Some(TextPrompt::new(
                    "Bulk import",
                    "Path to a delimited text file",
                    "",
                    PromptPurpose::ImportPath,
                ));
            }
            KeyCode::Char('s') => self.start_save(Dataset::Cards),
            KeyCode::Char('S') => self.start_save(Dataset::Precons),
            KeyCode::Char('p') => {
                self.screen = Screen::Precons;
                self.state
                    .set_status(format!("{} precons", self.precons.len()));
            }
            _ => {}
        }
    }

    fn open_editor(&mut self, session: EditSession) {
        let editor = EditorState::new(session);
        let message = format!("{}: Enter edits a field, Ctrl-S stores the card", editor.title());
        self.editor = Some(editor);
        self.screen = Screen::Editor;
        self.state.set_status(message);
    }

    fn close_editor(&mut self, message: &str) {
        self.editor = None;
        self.screen = Screen::Cards;
        self.state.set_status(message.to_string());
    }

    fn handle_editor_key(&mut self, key: KeyEvent) {
        let Some(editor) = self.editor.as_mut() else {
            self.screen = Screen::Cards;
            return;
        };
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        match key.code {
            KeyCode::Esc => {
                self.close_editor("Edit discarded");
                return;
            }
            KeyCode::Char('s') if ctrl => {
                self.commit_editor();
                return;
            }
            KeyCode::Tab | KeyCode::BackTab => {
                editor.focus = match editor.focus {
                    EditorFocus::Fields => EditorFocus::Prints,
                    EditorFocus::Prints => EditorFocus::Fields,
                };
            }
            KeyCode::Char('j') | KeyCode::Down => match editor.focus {
                EditorFocus::Fields => editor.move_field(1),
                EditorFocus::Prints => editor.move_print(1),
            },
            KeyCode::Char('k') | KeyCode::Up => match editor.focus {
                EditorFocus::Fields => editor.move_field(-1),
                EditorFocus::Prints => editor.move_print(-1),
            },
            KeyCode::Enter | KeyCode::Char('e') if editor.focus == EditorFocus::Fields => {
                if let Some(field) = editor.current_field() {
                    let current = editor.session.form.get(field).to_string();
                    self.prompt = Some(TextPrompt::new(
                        editor.title(),
                        field.label(),
                        &current,
                        PromptPurpose::EditField(field),
                    ));
                }
            }
            KeyCode::Char('a') => match editor.session.add_print_from_fields() {
                Ok(print) => {
                    editor.print_cursor = editor.session.prints.len().saturating_sub(1);
                    let message = format!("Added print {}", print.label());
                    self.state.set_status(message);
                }
                Err(err) => self.state.set_status(format!("Cannot add print: {err}")),
            },
            KeyCode::Char('x') | KeyCode::Delete if editor.focus == EditorFocus::Prints => {
                match editor.session.prints.remove(editor.print_cursor) {
                    Ok(print) => {
                        editor.clamp();
                        let message = format!("Removed print {}", print.label());
                        self.state.set_status(message);
                    }
                    Err(err) => self.state.set_status(format!("Cannot remove print: {err}")),
                }
            }
            KeyCode::Char('P') | KeyCode::Char(' ') if editor.focus == EditorFocus::Prints => {
                match editor.session.prints.set_primary(editor.print_cursor) {
                    Ok(()) => self.state.set_status("Primary print changed".to_string()),
                    Err(err) => self.state.set_status(format!("Cannot set primary: {err}")),
                }
            }
            KeyCode::Char('C') => {
                editor.session.prints.clear();
                editor.clamp();
                self.state.set_status("Prints cleared".to_string());
            }
            _ => {}
        }
    }

    fn commit_editor(&mut self) {
        let Some(editor) = self.editor.as_ref() else {
            return;
        };
        let card = editor.session.finish();
        if card.name.is_empty() {
            self.state
                .set_status("A card needs a name before it can be stored".to_string());
            return;
        }
        let id = card.id.clone();
        let name = card.name.clone();
        let outcome = self.library.upsert_by_id(card);
        self.dirty = true;
        self.editor = None;
        self.screen = Screen::Cards;
        self.state.refresh_list(&self.library);
        self.state.select_card(&id, &self.library);
        info!(%id, %name, ?outcome, "card stored");
        let message = match outcome {
            Upsert::Inserted => format!("Added {name}"),
            Upsert::Replaced(_) => format!("Updated {name}"),
        };
        self.state.set_status(message);
    }

    fn handle_precons_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Esc | KeyCode::Char('p') | KeyCode::Char('q') => {
                self.screen = Screen::Cards;
                self.state.set_status("Back to cards".to_string());
            }
            KeyCode::Char('j') | KeyCode::Down => {
                self.state.precon_cursor = step(self.state.precon_cursor, 1, self.precons.len());
            }
            KeyCode::Char('k') | KeyCode::Up => {
                self.state.precon_cursor = step(self.state.precon_cursor, -1, self.precons.len());
            }
            KeyCode::Char('S') | KeyCode::Char('s') => self.start_save(Dataset::Precons),
            _ => {}
        }
    }

    fn handle_prompt_key(&mut self, key: KeyEvent) -> Result<()> {
        let mut submit: Option<(PromptPurpose, String)> = None;
        let mut cancel = false;
        if let Some(prompt) = self.prompt.as_mut() {
            match key.code {
                KeyCode::Esc => cancel = true,
                KeyCode::Enter => submit = Some((prompt.purpose, prompt.input.clone())),
                KeyCode::Left => prompt.move_cursor(-1),
                KeyCode::Right => prompt.move_cursor(1),
                KeyCode::Home => prompt.move_home(),
                KeyCode::End => prompt.move_end(),
                KeyCode::Backspace => prompt.backspace(),
                KeyCode::Delete => prompt.delete(),
                KeyCode::Char('u') if key.modifiers == KeyModifiers::CONTROL => prompt.clear(),
                KeyCode::Char(ch) => {
                    if key.modifiers.is_empty() || key.modifiers == KeyModifiers::SHIFT {
                        prompt.insert(ch);
                    }
                }
                _ => {}
            }
        }

        if cancel {
            self.prompt = None;
            self.state.set_status("Cancelled".to_string());
            return Ok(());
        }

        if let Some((purpose, value)) = submit {
            self.prompt = None;
            match purpose {
                PromptPurpose::EditField(field) => {
                    let Some(editor) = self.editor.as_mut() else {
                        return Ok(());
                    };
                    editor.session.form.set(field, value);
                    editor.clamp();
                    self.state.set_status(format!("{} updated", field.label()));
                }
                PromptPurpose::ImportPath => self.start_import(&value),
            }
        }
        Ok(())
    }

    fn handle_confirm_key(&mut self, key: KeyEvent) -> Result<()> {
        let accepted = match key.code {
            KeyCode::Char('y') | KeyCode::Char('Y') | KeyCode::Enter => true,
            KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => false,
            _ => return Ok(()),
        };
        let Some(action) = self.confirm.take() else {
            return Ok(());
        };
        if !accepted {
            self.state.set_status("Cancelled".to_string());
            return Ok(());
        }
        match action {
            ConfirmAction::Delete { id, name } => {
                if self.library.remove(&id).is_some() {
                    self.dirty = true;
                    info!(%id, "card deleted");
                }
                self.state.refresh_list(&self.library);
                self.state.set_status(format!("Deleted {name}"));
            }
            ConfirmAction::Reload => self.start_reload(),
            ConfirmAction::Quit => self.state.should_quit = true,
        }
        Ok(())
    }

    fn current_card(&self) -> Option<&Card> {
        self.state
            .current_id()
            .and_then(|id| self.library.find_by_id(id))
    }

    fn draw(&mut self, frame: &mut Frame) {
        match self.screen {
            Screen::Cards => self.draw_cards(frame),
            Screen::Editor => self.draw_editor(frame),
            Screen::Precons => self.draw_precons(frame),
        }
        if let Some(action) = &self.confirm {
            self.render_confirm(frame, action);
        }
        if let Some(prompt) = &self.prompt {
            self.render_prompt(frame, prompt);
        }
    }

    fn split_body(area: Rect) -> (Rect, Rect) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(8), Constraint::Length(5)])
            .split(area);
        (chunks[0], chunks[1])
    }

    fn draw_cards(&mut self, frame: &mut Frame) {
        let (body, status) = Self::split_body(frame.size());
        let columns = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(40), Constraint::Percentage(60)])
            .split(body);

        self.render_card_list(frame, columns[0]);
        self.render_card_preview(frame, columns[1]);
        self.render_status(
            frame,
            status,
            "/ filter  n new  e edit  d delete  i import  s save cards  S save precons  p precons  q quit",
        );
    }

    fn render_card_list(&mut self, frame: &mut Frame, area: Rect) {
        self.state.list_height = area.height.saturating_sub(2) as usize;
        self.state.clamp_cursor();
        self.state.ensure_cursor_visible();

        let mut list_state = ListState::default();
        let height = self.state.list_height;
        let ids = self.state.visible_ids(height);
        if !ids.is_empty() {
            let selected = self
                .state
                .cursor
                .saturating_sub(self.state.offset)
                .min(ids.len().saturating_sub(1));
            list_state.select(Some(selected));
        }
        let items: Vec<ListItem> = ids
            .iter()
            .enumerate()
            .filter_map(|(idx, id)| {
                let card = self.library.find_by_id(id)?;
                let is_selected = self.state.cursor == self.state.offset + idx;
                let marker = if is_selected {
                    Span::styled(
                        "▶ ",
                        Style::default()
                            .fg(self.theme.accent)
                            .add_modifier(Modifier::BOLD),
                    )
                } else {
                    Span::raw("  ")
                };
                let name = Span::styled(
                    card.display_name().to_string(),
                    Style::default()
                        .fg(self.theme.primary_fg)
                        .add_modifier(Modifier::BOLD),
                );
                let mut line = vec![marker, name];
                if !card.card_type.is_empty() {
                    line.push(Span::styled(
                        format!(" · {}", card.card_type),
                        Style::default().fg(self.theme.muted),
                    ));
                }
                if let Some(print) = card.primary_print() {
                    line.push(Span::styled(
                        format!(" · {}", print.label()),
                        Style::default().fg(self.theme.muted),
                    ));
                }
                Some(ListItem::new(Line::from(line)))
            })
            .collect();

        let title = if self.state.filter.is_empty() {
            format!("Cards ({})", self.library.len())
        } else {
            format!(
                "Cards ({}/{}) /{}",
                self.state.filtered.len(),
                self.library.len(),
                self.state.filter
            )
        };
        let list = List::new(items)
            .block(Block::default().borders(Borders::ALL).title(title))
            .highlight_style(Style::default().bg(self.theme.selection_bg));
        frame.render_stateful_widget(list, area, &mut list_state);
    }

    fn render_card_preview(&self, frame: &mut Frame, area: Rect) {
        let block = Block::default().borders(Borders::ALL).title("Card");
        let Some(card) = self.current_card() else {
            let message = if self.pending_loads > 0 {
                "Loading…"
            } else {
                "No cards. Press n to create one or i to import."
            };
            frame.render_widget(Paragraph::new(message).block(block), area);
            return;
        };
        let paragraph = Paragraph::new(card_lines(card, &self.theme))
            .block(block)
            .wrap(Wrap { trim: false });
        frame.render_widget(paragraph, area);
    }

    fn draw_editor(&mut self, frame: &mut Frame) {
        let (body, status) = Self::split_body(frame.size());
        let columns = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(55), Constraint::Percentage(45)])
            .split(body);
        let right = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(5), Constraint::Length(9)])
            .split(columns[1]);

        if let Some(editor) = &self.editor {
            self.render_editor_fields(frame, columns[0], editor);
            self.render_editor_prints(frame, right[0], editor);
            self.render_editor_preview(frame, right[1], editor);
        }
        self.render_status(
            frame,
            status,
            "Tab focus  Enter edit  a add print  x remove  P primary  C clear  Ctrl-S store  Esc discard",
        );
    }

    fn render_editor_fields(&self, frame: &mut Frame, area: Rect, editor: &EditorState) {
        let focused = editor.focus == EditorFocus::Fields;
        let label_width = FormField::ALL
            .iter()
            .map(|field| field.label().len())
            .max()
            .unwrap_or(0);
        let items: Vec<ListItem> = editor
            .visible_fields()
            .into_iter()
            .map(|field| {
                let value = editor.session.form.get(field);
                let value_span = if value.is_empty() {
                    Span::styled("—", Style::default().fg(self.theme.muted))
                } else {
                    Span::raw(value.to_string())
                };
                ListItem::new(Line::from(vec![
                    Span::styled(
                        format!("{:<label_width$}  ", field.label()),
                        Style::default().fg(self.theme.accent),
                    ),
                    value_span,
                ]))
            })
            .collect();

        let mut list_state = ListState::default();
        if focused {
            list_state.select(Some(editor.field_cursor));
        }
        let list = List::new(items)
            .block(focus_block(editor.title(), focused, &self.theme))
            .highlight_style(Style::default().bg(self.theme.selection_bg));
        frame.render_stateful_widget(list, area, &mut list_state);
    }

    fn render_editor_prints(&self, frame: &mut Frame, area: Rect, editor: &EditorState) {
        let focused = editor.focus == EditorFocus::Prints;
        let items: Vec<ListItem> = editor
            .session
            .prints
            .as_slice()
            .iter()
            .map(|print| {
                let marker = if print.is_primary {
                    Span::styled("★ ", Style::default().fg(self.theme.warning))
                } else {
                    Span::raw("  ")
                };
                ListItem::new(Line::from(vec![marker, Span::raw(print.label())]))
            })
            .collect();
        let title = format!("Prints ({})", editor.session.prints.len());
        let mut list_state = ListState::default();
        if focused && !items.is_empty() {
            list_state.select(Some(editor.print_cursor));
        }
        let list = List::new(items)
            .block(focus_block(title, focused, &self.theme))
            .highlight_style(Style::default().bg(self.theme.selection_bg));
        frame.render_stateful_widget(list, area, &mut list_state);
    }

    fn render_editor_preview(&self, frame: &mut Frame, area: Rect, editor: &EditorState) {
        let form = &editor.session.form;
        let primary = editor
            .session
            .prints
            .primary()
            .map(|print| print.label())
            .unwrap_or_else(|| "no prints".to_string());
        let lines = vec![
            Line::from(Span::styled(
                if form.name.trim().is_empty() {
                    "(unnamed)".to_string()
                } else {
                    form.name.trim().to_string()
                },
                Style::default().add_modifier(Modifier::BOLD),
            )),
            Line::from(format!("Type: {}", form.card_type.trim())),
            Line::from(format!("Primary: {primary}")),
            Line::from(Span::styled(
                format!("Next print: {} #{}", form.set_name.trim(), form.card_number.trim()),
                Style::default().fg(self.theme.muted),
            )),
        ];
        let paragraph = Paragraph::new(lines)
            .block(Block::default().borders(Borders::ALL).title("Summary"))
            .wrap(Wrap { trim: true });
        frame.render_widget(paragraph, area);
    }

    fn draw_precons(&mut self, frame: &mut Frame) {
        let (body, status) = Self::split_body(frame.size());
        let columns = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(35), Constraint::Percentage(65)])
            .split(body);

        let items: Vec<ListItem> = self
            .precons
            .iter()
            .map(|precon| {
                ListItem::new(Line::from(vec![
                    Span::styled(
                        precon.name.clone(),
                        Style::default().add_modifier(Modifier::BOLD),
                    ),
                    Span::styled(
                        format!(" · {} cards", precon.total_cards()),
                        Style::default().fg(self.theme.muted),
                    ),
                ]))
            })
            .collect();
        let mut list_state = ListState::default();
        if !items.is_empty() {
            list_state.select(Some(self.state.precon_cursor));
        }
        let list = List::new(items)
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .title(format!("Precons ({})", self.precons.len())),
            )
            .highlight_style(Style::default().bg(self.theme.selection_bg));
        frame.render_stateful_widget(list, columns[0], &mut list_state);

        let block = Block::default().borders(Borders::ALL).title("Deck");
        match self.precons.get(self.state.precon_cursor) {
            Some(precon) => {
                let paragraph = Paragraph::new(self.precon_lines(precon))
                    .block(block)
                    .wrap(Wrap { trim: false });
                frame.render_widget(paragraph, columns[1]);
            }
            None => frame.render_widget(Paragraph::new("No precons loaded").block(block), columns[1]),
        }

        self.render_status(frame, status, "j/k select  S save precons  Esc back");
    }

    fn precon_lines(&self, precon: &Precon) -> Vec<Line<'static>> {
        let mut lines = vec![Line::from(Span::styled(
            precon.name.clone(),
            Style::default().add_modifier(Modifier::BOLD),
        ))];
        if !precon.description.is_empty() {
            lines.push(Line::from(Span::styled(
                precon.description.clone(),
                Style::default().fg(self.theme.muted),
            )));
        }
        lines.push(Line::from(""));
        for entry in self.library.resolve_precon(precon) {
            let line = match entry.card {
                Some(card) => Line::from(vec![
                    Span::styled(
                        format!("{:>2}× ", entry.count),
                        Style::default().fg(self.theme.accent),
                    ),
                    Span::raw(card.display_name().to_string()),
                    Span::styled(
                        format!(" · {}", card.card_type),
                        Style::default().fg(self.theme.muted),
                    ),
                ]),
                None => Line::from(vec![
                    Span::styled(
                        format!("{:>2}× ", entry.count),
                        Style::default().fg(self.theme.accent),
                    ),
                    Span::styled(
                        format!("missing card {}", entry.card_id),
                        Style::default().fg(self.theme.danger),
                    ),
                ]),
            };
            lines.push(line);
        }
        lines
    }

    fn render_prompt(&self, frame: &mut Frame, prompt: &TextPrompt) {
        let frame_area = frame.size();
        let width = cmp::max(cmp::min(70_u16, frame_area.width.saturating_sub(4)), 24_u16);
        let area = centered_rect(width, 6, frame_area);
        frame.render_widget(Clear, area);

        let input_line = Line::from(vec![
            Span::styled("> ", Style::default().fg(self.theme.accent)),
            Span::raw(prompt.input.clone()),
        ]);
        let helper = Line::from(vec![
            Span::styled("Enter", Style::default().add_modifier(Modifier::BOLD)),
            Span::raw(" accept  "),
            Span::styled("Esc", Style::default().add_modifier(Modifier::BOLD)),
            Span::raw(" cancel  "),
            Span::styled("Ctrl-U", Style::default().add_modifier(Modifier::BOLD)),
            Span::raw(" clear"),
        ]);
        let paragraph = Paragraph::new(vec![
            Line::from(prompt.instruction.clone()),
            input_line,
            Line::from(""),
            helper,
        ])
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(prompt.title.clone()),
        );
        frame.render_widget(paragraph, area);

        let cursor_x =
            (area.x + 3 + prompt.cursor as u16).min(area.x + area.width.saturating_sub(2));
        frame.set_cursor(cursor_x, area.y + 2);
    }

    fn render_confirm(&self, frame: &mut Frame, action: &ConfirmAction) {
        let frame_area = frame.size();
        let width = cmp::max(cmp::min(60_u16, frame_area.width.saturating_sub(4)), 24_u16);
        let area = centered_rect(width, 5, frame_area);
        frame.render_widget(Clear, area);
        let paragraph = Paragraph::new(vec![
            Line::from(action.question()),
            Line::from(""),
            Line::from(vec![
                Span::styled(
                    "y",
                    Style::default()
                        .fg(self.theme.danger)
                        .add_modifier(Modifier::BOLD),
                ),
                Span::raw(" confirm  "),
                Span::styled("n", Style::default().add_modifier(Modifier::BOLD)),
                Span::raw(" cancel"),
            ]),
        ])
        .block(Block::default().borders(Borders::ALL).title("Confirm"))
        .wrap(Wrap { trim: true });
        frame.render_widget(paragraph, area);
    }

    fn render_status(&self, frame: &mut Frame, area: Rect, keys: &str) {
        let block = Block::default().borders(Borders::ALL).title("Status");
        let primary = if self.state.mode == Mode::Filter && self.screen == Screen::Cards {
            format!("Filter: {}", self.state.filter)
        } else {
            self.state.status.clone()
        };
        let mut summary = vec![Span::raw(format!(
            "Cards: {}  Precons: {}",
            self.library.len(),
            self.precons.len()
        ))];
        if let Some(origin) = self.origins.get(&Dataset::Cards) {
            let (label, color) = match origin {
                LoadOrigin::Source => ("source", self.theme.success),
                LoadOrigin::Cache => ("cache", self.theme.warning),
                LoadOrigin::Empty => ("empty", self.theme.danger),
            };
            summary.push(Span::raw("  from "));
            summary.push(Span::styled(label, Style::default().fg(color)));
        }
        if self.dirty {
            summary.push(Span::styled(
                "  unsaved changes",
                Style::default()
                    .fg(self.theme.warning)
                    .add_modifier(Modifier::BOLD),
            ));
        }
        if self.pending_loads > 0 {
            summary.push(Span::styled(
                "  loading…",
                Style::default().fg(self.theme.muted),
            ));
        }
        let paragraph = Paragraph::new(vec![
            Line::from(primary),
            Line::from(summary),
            Line::from(Span::styled(
                keys.to_string(),
                Style::default().fg(self.theme.muted),
            )),
        ])
        .block(block)
        .wrap(Wrap { trim: true });
        frame.render_widget(paragraph, area);
    }
}

fn focus_block(title: String, focused: bool, theme: &Theme) -> Block<'static> {
    let style = if focused {
        Style::default().fg(theme.accent)
    } else {
        Style::default()
    };
    Block::default()
        .borders(Borders::ALL)
        .border_style(style)
        .title(title)
}

fn card_lines(card: &Card, theme: &Theme) -> Vec<Line<'static>> {
    let muted = Style::default().fg(theme.muted);
    let field = |label: &str, value: String| {
        Line::from(vec![
            Span::styled(format!("{label}: "), muted),
            Span::raw(value),
        ])
    };
    let mut lines = vec![Line::from(Span::styled(
        card.display_name().to_string(),
        Style::default().add_modifier(Modifier::BOLD),
    ))];
    lines.push(field("Type", card.card_type.clone()));
    lines.push(field("Rarity", card.rarity.clone()));
    lines.push(field(
        "Set",
        format!("{} #{}", card.set_name, card.card_number),
    ));
    if !card.vehicle_types.is_empty() {
        lines.push(field("Vehicle types", card.vehicle_types.join(", ")));
    }
    if !card.tags.is_empty() {
        lines.push(field("Tags", card.tags.join(", ")));
    }
    match &card.extra {
        Extra::Vehicle(extra) => {
            lines.push(field(
                "HP/CON",
                format_hp_con(&HpCon {
                    hp: extra.hp,
                    con: extra.con,
                }),
            ));
            lines.push(field(
                "Pit cost",
                extra
                    .pit_cost
                    .map(format_number)
                    .unwrap_or_else(|| "-".to_string()),
            ));
        }
        Extra::Mod(extra) => {
            lines.push(field("Base part", extra.base_part.clone()));
            lines.push(field("Levels", extra.levels().join(" / ")));
        }
        Extra::None => {}
    }
    if !card.prints.is_empty() {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled("Prints", muted)));
        for print in &card.prints {
            let marker = if print.is_primary { "★ " } else { "  " };
            lines.push(Line::from(format!("{marker}{}", print.label())));
        }
    }
    if !card.image_url.is_empty() {
        lines.push(field("Image", card.image_url.clone()));
    }
    if !card.notes.is_empty() {
        lines.push(Line::from(""));
        lines.push(Line::from(card.notes.clone()));
    }
    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(card.id.clone(), muted)));
    lines
}

fn describe_load<T>(dataset: Dataset, loaded: &Loaded<T>, count: usize) -> String {
    match loaded.origin {
        LoadOrigin::Source => format!("Loaded {count} {dataset}"),
        LoadOrigin::Cache => {
            let saved = loaded
                .cached_at
                .map(|at| at.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string())
                .unwrap_or_else(|| "unknown time".to_string());
            format!("Source unavailable; loaded {count} {dataset} cached at {saved}")
        }
        LoadOrigin::Empty => format!("No {dataset} found; starting empty"),
    }
}

fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<io::Stdout>>) -> Result<()> {
    disable_raw_mode().context("failed to disable raw mode")?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)
        .context("failed to leave alternate screen")?;
    terminal.show_cursor()?;
    Ok(())
}

fn spawn_input_thread(sender: mpsc::Sender<AppEvent>) {
    thread::spawn(move || loop {
        match event::poll(TICK_RATE) {
            Ok(true) => match event::read() {
                Ok(evt) => {
                    if sender.blocking_send(AppEvent::Input(evt)).is_err() {
                        break;
                    }
                }
                Err(_) => break,
            },
            Ok(false) => {
                if sender.blocking_send(AppEvent::Tick).is_err() {
                    break;
                }
            }
            Err(_) => break,
        }
    });
}

struct UiState {
    /// Ids of the cards matching the filter, in library order.
    filtered: Vec<String>,
    cursor: usize,
    offset: usize,
    list_height: usize,
    filter: String,
    status: String,
    mode: Mode,
    should_quit: bool,
    precon_cursor: usize,
}

impl Default for UiState {
    fn default() -> Self {
        Self {
            filtered: Vec::new(),
            cursor: 0,
            offset: 0,
            list_height: 1,
            filter: String::new(),
            status: "Ready".to_string(),
            mode: Mode::Browse,
            should_quit: false,
            precon_cursor: 0,
        }
    }
}

impl UiState {
    fn matching_ids(&self, library: &Library) -> Vec<String> {
        library
            .matching(&self.filter)
            .into_iter()
            .map(|card| card.id.clone())
            .collect()
    }

    /// Re-run the filter and jump to the top.
    fn apply_filter(&mut self, library: &Library) {
        self.filtered = self.matching_ids(library);
        self.cursor = 0;
        self.offset = 0;
    }

    /// Re-run the filter after the library changed, keeping the cursor.
    fn refresh_list(&mut self, library: &Library) {
        self.filtered = self.matching_ids(library);
        self.clamp_cursor();
        self.ensure_cursor_visible();
    }

    fn move_cursor(&mut self, delta: isize) {
        if self.filtered.is_empty() {
            return;
        }
        self.cursor = step(self.cursor, delta, self.filtered.len());
        self.ensure_cursor_visible();
    }

    fn move_to(&mut self, index: usize) {
        if self.filtered.is_empty() {
            return;
        }
        self.cursor = index.min(self.filtered.len() - 1);
        self.ensure_cursor_visible();
    }

    fn move_to_end(&mut self) {
        if self.filtered.is_empty() {
            return;
        }
        self.cursor = self.filtered.len() - 1;
        self.ensure_cursor_visible();
    }

    fn page_down(&mut self) {
        if self.filtered.is_empty() || self.list_height == 0 {
            return;
        }
        let delta = self.list_height.min(self.filtered.len());
        self.move_cursor(delta as isize);
    }

    fn page_up(&mut self) {
        if self.filtered.is_empty() || self.list_height == 0 {
            return;
        }
        let delta = self.list_height.min(self.filtered.len());
        self.move_cursor(-(delta as isize));
    }

    fn visible_ids(&self, height: usize) -> &[String] {
        if self.filtered.is_empty() {
            return &[];
        }
        let end = (self.offset + height).min(self.filtered.len());
        &self.filtered[self.offset..end]
    }

    fn current_id(&self) -> Option<&str> {
        self.filtered.get(self.cursor).map(String::as_str)
    }

    /// Move the cursor to `id`, clearing the filter if it hides the card.
    fn select_card(&mut self, id: &str, library: &Library) -> bool {
        if !self.filtered.iter().any(|candidate| candidate == id) {
            self.filter.clear();
            self.apply_filter(library);
        }
        match self.filtered.iter().position(|candidate| candidate == id) {
            Some(pos) => {
                self.cursor = pos;
                self.ensure_cursor_visible();
                true
            }
            None => false,
        }
    }

    fn set_status(&mut self, message: String) {
        self.status = message;
    }

    fn clamp_cursor(&mut self) {
        if self.filtered.is_empty() {
            self.cursor = 0;
            self.offset = 0;
        } else if self.cursor >= self.filtered.len() {
            self.cursor = self.filtered.len() - 1;
        }
    }

    fn ensure_cursor_visible(&mut self) {
        if self.filtered.is_empty() || self.list_height == 0 {
            self.offset = 0;
            return;
        }
        let height = self.list_height;
        let max_offset = self.filtered.len().saturating_sub(height);

        if self.cursor < self.offset {
            self.offset = self.cursor;
        } else if self.cursor >= self.offset + height {
            self.offset = self.cursor + 1 - height;
        }

        if self.offset > max_offset {
            self.offset = max_offset;
        }
    }
}

fn centered_rect(width: u16, height: u16, area: Rect) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    let x = area.x + (area.width.saturating_sub(width)) / 2;
    let y = area.y + (area.height.saturating_sub(height)) / 2;
    Rect::new(x, y, width, height)
}

#[cfg(test)]
mod tests {
    use super::*;
    use drive_core::{normalize, AppConfig};
    use serde_json::json;

    fn app() -> DriveAdminApp {
        let root = std::env::temp_dir().join("drive-admin-app-tests");
        DriveAdminApp::new(DataStore::new(AppConfig {
            data_dir: root.join("data"),
            cache_dir: root.join("cache"),
            cards_source: None,
            precons_source: None,
        }))
    }

    fn ctrl(ch: char) -> Event {
        Event::Key(KeyEvent::new(KeyCode::Char(ch), KeyModifiers::CONTROL))
    }

    #[test]
    fn ctrl_c_asks_before_dropping_unsaved_changes() {
        let mut app = app();
        app.dirty = true;
        app.handle_input(ctrl('c')).unwrap();
        assert_eq!(app.confirm, Some(ConfirmAction::Quit));
        assert!(!app.state.should_quit);

        app.handle_confirm_key(KeyEvent::new(KeyCode::Char('y'), KeyModifiers::NONE))
            .unwrap();
        assert!(app.state.should_quit);
    }

    #[test]
    fn ctrl_c_quits_right_away_when_clean() {
        let mut app = app();
        app.handle_input(ctrl('c')).unwrap();
        assert!(app.confirm.is_none());
        assert!(app.state.should_quit);
    }

    #[test]
    fn prompt_edits_multibyte_text() {
        let mut prompt = TextPrompt::new("t", "i", "Café", PromptPurpose::ImportPath);
        assert_eq!(prompt.cursor, 4);
        prompt.backspace();
        assert_eq!(prompt.input, "Caf");
        prompt.insert('é');
        prompt.move_home();
        prompt.delete();
        assert_eq!(prompt.input, "afé");
        prompt.move_cursor(10);
        assert_eq!(prompt.cursor, 3);
    }

    #[test]
    fn list_follows_library_changes() {
        let mut library = Library::from_cards([
            normalize(&json!({"id": "a", "name": "Taxi", "type": "Vehicle"})),
            normalize(&json!({"id": "b", "name": "Driver", "type": "Crew"})),
        ]);
        let mut state = UiState::default();
        state.list_height = 10;
        state.filter = "crew".to_string();
        state.apply_filter(&library);
        assert_eq!(state.current_id(), Some("b"));

        assert!(state.select_card("a", &library));
        assert!(state.filter.is_empty());
        assert_eq!(state.current_id(), Some("a"));

        library.remove("a");
        state.refresh_list(&library);
        assert_eq!(state.current_id(), Some("b"));
    }

    #[test]
    fn editor_cursor_tracks_visible_fields() {
        let mut editor = EditorState::new(EditSession::new());
        editor.session.form.set(FormField::Type, "Mod");
        editor.move_field(100);
        assert_eq!(editor.current_field(), Some(FormField::Notes));

        editor.session.form.set(FormField::Type, "Crew");
        editor.clamp();
        assert_eq!(editor.current_field(), Some(FormField::Notes));
        assert_eq!(step(0, -1, 0), 0);
    }
}
