// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

//! One entity page: a list table, an optional detail view for a single
//! record, and the dialogs layered over both.
//!
//! Entity-specific wiring (columns, detail descriptors, backend calls)
//! lives behind [`PageSpec`]; [`EntityPage`] owns everything else.

use anyhow::{Context, Result, anyhow, bail};
use crm_app::{
    AttachmentUpload, CurrentUser, EntityType, FieldKey, PageKind, Record, RecordId, User,
    ViewMode,
};
use crm_view::keys::{TextInput, apply_text_key, detail_command_for_key, table_command_for_key};
use crm_view::render::{
    assign_dialog_text, column_dialog_text, filter_builder_text, render_detail, render_overlay,
    render_table, row_menu_text,
};
use crm_view::terminal::spawn_users_fetch;
use crm_view::{
    AssignUserDialog, ColumnDialog, ConsoleEvent, DetailEvent, DetailStatus, DetailView,
    FilterBuilder, RowAction, RowActions, RowMenu, Selection, ServiceResult, TableCommand,
    TableEvent, TableInput, TableStatus, TableView, UserDirectory,
};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::layout::Rect;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, Sender};
use tracing::{debug, info, warn};

pub const LIST_HINTS: &str =
    "enter open  m actions  / search  f filter  x clear filter  v columns  s sort  r reload  tab page  q quit";
pub const DETAIL_HINTS: &str =
    "e edit  ctrl-s save  esc back  tab related  o claim  O assign  n note  u attach  d delete  r refresh";

/// Entity-specific half of a page.
pub trait PageSpec: 'static {
    type Record: Record + Send + 'static;

    fn kind(&self) -> PageKind;
    fn entity_type(&self) -> EntityType;
    fn load(&self) -> Result<Vec<Self::Record>>;

    /// Columns and formatters. The page adds the row actions.
    fn table(&self) -> TableView<Self::Record>;

    /// Row actions that call the backend directly.
    fn row_actions(&self, user: &CurrentUser) -> RowActions<Self::Record>;

    fn detail(&self, item: Self::Record, user: &CurrentUser) -> Result<DetailView<Self::Record>>;
    fn detail_title(&self, item: &Self::Record) -> String;
    fn users(&self) -> Arc<dyn UserDirectory>;

    /// Rows to show when the backend filters the list; `None` shows all.
    fn prefilter(&self, _data: &[Self::Record], _show_inactive: bool) -> Option<Vec<Self::Record>> {
        None
    }

    fn has_inactive_toggle(&self) -> bool {
        false
    }

    fn supports_notes(&self) -> bool {
        false
    }

    fn supports_attachments(&self) -> bool {
        false
    }

    fn add_note(&self, _item: &Self::Record, _body: &str, _user: &CurrentUser) -> Result<()> {
        bail!("{} records do not take notes", self.entity_type().as_str())
    }

    fn add_attachment(
        &self,
        _item: &Self::Record,
        _upload: &AttachmentUpload,
        _user: &CurrentUser,
    ) -> Result<()> {
        bail!("{} records do not take attachments", self.entity_type().as_str())
    }
}

/// What a key or event did, for the console to fold into its state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageOutcome {
    pub handled: bool,
    pub status: Option<String>,
    pub mode: Option<ViewMode>,
}

impl PageOutcome {
    pub fn ignored() -> Self {
        Self::default()
    }

    pub fn handled() -> Self {
        Self {
            handled: true,
            ..Self::default()
        }
    }

    pub fn status(message: impl Into<String>) -> Self {
        Self {
            handled: true,
            status: Some(message.into()),
            mode: None,
        }
    }

    fn with_mode(mut self, mode: ViewMode) -> Self {
        self.mode = Some(mode);
        self
    }

    fn or_status(mut self, message: Option<String>) -> Self {
        if message.is_some() {
            self.status = message;
        }
        self
    }
}

/// Object-safe face of a page, so the console can hold all five.
pub trait PageController {
    fn kind(&self) -> PageKind;
    fn is_detail_open(&self) -> bool;
    fn reload(&mut self) -> Result<usize>;
    fn handle_key(&mut self, key: KeyEvent, tx: &Sender<ConsoleEvent>) -> PageOutcome;
    fn handle_detail(&mut self, event: DetailEvent, tx: &Sender<ConsoleEvent>) -> PageOutcome;
    fn handle_users(&mut self, generation: u64, result: Result<ServiceResult<Vec<User>>>) -> PageOutcome;
    fn close_detail(&mut self);
    fn draw(&self, frame: &mut ratatui::Frame<'_>, area: Rect);
    fn hints(&self) -> &'static str;
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct PageIntent {
    action: RowAction,
    id: RecordId,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Target {
    Row(RecordId),
    Detail,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AssignTarget {
    Row,
    Detail,
}

enum Overlay<F> {
    Search(String),
    Filter(FilterBuilder<F>),
    Columns(ColumnDialog),
    RowMenu(RowMenu),
    Note { target: Target, buffer: String },
    Attachment { target: Target, buffer: String },
    FieldEdit { index: usize, buffer: String },
}

type FieldOf<S> = <<S as PageSpec>::Record as Record>::Field;

pub struct EntityPage<S: PageSpec> {
    spec: S,
    user: CurrentUser,
    data: Vec<S::Record>,
    prefiltered: Option<Vec<S::Record>>,
    show_inactive: bool,
    selection: Selection,
    table: TableView<S::Record>,
    intents: Receiver<PageIntent>,
    detail: Option<DetailView<S::Record>>,
    overlay: Option<Overlay<FieldOf<S>>>,
    assign: AssignUserDialog,
    assign_target: AssignTarget,
}

fn table_input<'a, R>(
    data: &'a [R],
    prefiltered: Option<&'a [R]>,
    selection: &'a Selection,
) -> TableInput<'a, R> {
    let input = TableInput::new(data, selection);
    match prefiltered {
        Some(rows) => input.with_prefiltered(rows),
        None => input,
    }
}

/// Row action that only tells the page which record was picked.
fn intent<R: Record + 'static>(
    tx: Sender<PageIntent>,
    id_field: R::Field,
    action: RowAction,
) -> impl FnMut(&R) -> Result<()> + 'static {
    move |row: &R| {
        let id = row
            .record_id(&id_field)
            .ok_or_else(|| anyhow!("row has no {}", id_field.name()))?;
        tx.send(PageIntent { action, id })
            .map_err(|_| anyhow!("page closed before {} ran", action.label().to_lowercase()))
    }
}

impl<S: PageSpec> EntityPage<S> {
    pub fn new(spec: S, user: CurrentUser) -> Result<Self> {
        let (tx, intents) = mpsc::channel();
        let table = spec.table();
        let id_field = table.id_field().clone();
        let mut actions = spec
            .row_actions(&user)
            .on(RowAction::View, intent(tx.clone(), id_field.clone(), RowAction::View))
            .on(RowAction::Edit, intent(tx.clone(), id_field.clone(), RowAction::Edit));
        if spec.supports_notes() {
            actions = actions.on(
                RowAction::AddNote,
                intent(tx.clone(), id_field.clone(), RowAction::AddNote),
            );
        }
        if spec.supports_attachments() {
            actions = actions.on(
                RowAction::AddAttachment,
                intent(tx, id_field, RowAction::AddAttachment),
            );
        }

        let mut page = Self {
            table: table.with_actions(actions),
            spec,
            user,
            data: Vec::new(),
            prefiltered: None,
            show_inactive: false,
            selection: Selection::new(),
            intents,
            detail: None,
            overlay: None,
            assign: AssignUserDialog::new(),
            assign_target: AssignTarget::Row,
        };
        page.load_rows()
            .with_context(|| format!("load {} page", page.spec.kind().as_str()))?;
        Ok(page)
    }

    #[cfg(test)]
    pub fn table(&self) -> &TableView<S::Record> {
        &self.table
    }

    #[cfg(test)]
    pub fn detail(&self) -> Option<&DetailView<S::Record>> {
        self.detail.as_ref()
    }

    #[cfg(test)]
    pub fn rows(&self) -> &[S::Record] {
        &self.data
    }

    fn load_rows(&mut self) -> Result<usize> {
        self.data = self.spec.load()?;
        self.prefiltered = self.spec.prefilter(&self.data, self.show_inactive);
        let id_field = self.table.id_field().clone();
        let ids: Vec<RecordId> = self
            .data
            .iter()
            .filter_map(|row| row.record_id(&id_field))
            .collect();
        self.selection.retain_existing(&ids);
        let input = table_input(&self.data, self.prefiltered.as_deref(), &self.selection);
        self.table.clamp(input);
        debug!(page = self.spec.kind().as_str(), rows = self.data.len(), "page rows loaded");
        Ok(self.data.len())
    }

    fn refresh_list(&mut self) -> Option<String> {
        self.load_rows().err().map(|error| {
            warn!(page = self.spec.kind().as_str(), error = %error, "reload failed");
            format!("reload failed: {error:#}")
        })
    }

    fn record(&self, id: &RecordId) -> Option<&S::Record> {
        let id_field = self.table.id_field();
        self.data
            .iter()
            .find(|row| row.record_id(id_field).as_ref() == Some(id))
    }

    fn open_detail(&mut self, id: RecordId, edit: bool, tx: &Sender<ConsoleEvent>) -> PageOutcome {
        let Some(item) = self.record(&id).cloned() else {
            return PageOutcome::status(format!(
                "{} {id} no longer exists; press r to reload",
                self.spec.entity_type().as_str()
            ));
        };
        let mut detail = match self.spec.detail(item, &self.user) {
            Ok(detail) => detail,
            Err(error) => {
                warn!(page = self.spec.kind().as_str(), error = %error, "detail failed to open");
                return PageOutcome::status(format!("cannot open detail: {error:#}"));
            }
        };
        let message = edit.then(|| detail.begin_edit().message());
        info!(page = self.spec.kind().as_str(), %id, instance = detail.instance(), "detail opened");
        self.detail = Some(detail);
        self.overlay = None;
        let failure = self.flush_requests(tx);
        PageOutcome::handled()
            .with_mode(ViewMode::Detail)
            .or_status(message)
            .or_status(failure)
    }

    fn close_detail_outcome(&mut self) -> PageOutcome {
        self.close_detail_view();
        PageOutcome::handled().with_mode(ViewMode::List)
    }

    fn close_detail_view(&mut self) {
        if let Some(detail) = self.detail.take() {
            debug!(instance = detail.instance(), "detail closed");
        }
        self.overlay = None;
        self.assign.close();
    }

    /// Starts a worker for every request the detail view queued.
    fn flush_requests(&mut self, tx: &Sender<ConsoleEvent>) -> Option<String> {
        let detail = self.detail.as_mut()?;
        for request in detail.take_requests() {
            if let Err(error) = detail.spawn_request(request, tx.clone()) {
                warn!(error = %error, "detail request not started");
                return Some(format!("fetch failed to start: {error:#}"));
            }
        }
        None
    }

    fn apply_table(
        &mut self,
        command: TableCommand<FieldOf<S>>,
        tx: &Sender<ConsoleEvent>,
    ) -> PageOutcome {
        let input = table_input(&self.data, self.prefiltered.as_deref(), &self.selection);
        let event = self.table.apply(input, command);
        match event {
            TableEvent::CursorUpdated => PageOutcome::handled(),
            TableEvent::Status(status) => PageOutcome::status(status.message()),
            TableEvent::Selection(change) => {
                self.selection.apply(change);
                PageOutcome::handled()
            }
            TableEvent::CellActivated { id, .. } => self.open_detail(id, false, tx),
        }
    }

    fn run_row_action(&mut self, action: RowAction, tx: &Sender<ConsoleEvent>) -> PageOutcome {
        if action == RowAction::Assign {
            return self.open_assign(AssignTarget::Row, tx);
        }
        let input = table_input(&self.data, self.prefiltered.as_deref(), &self.selection);
        let status = self.table.run_row_action(input, action);
        if let Some(outcome) = self.drain_intents(tx) {
            return outcome;
        }
        let failure = match status {
            TableStatus::ActionDone(_) => self.refresh_list(),
            _ => None,
        };
        PageOutcome::status(status.message()).or_status(failure)
    }

    fn drain_intents(&mut self, tx: &Sender<ConsoleEvent>) -> Option<PageOutcome> {
        let mut outcome = None;
        while let Ok(intent) = self.intents.try_recv() {
            outcome = Some(match intent.action {
                RowAction::View => self.open_detail(intent.id, false, tx),
                RowAction::Edit => self.open_detail(intent.id, true, tx),
                RowAction::AddNote => {
                    self.overlay = Some(Overlay::Note {
                        target: Target::Row(intent.id),
                        buffer: String::new(),
                    });
                    PageOutcome::handled()
                }
                RowAction::AddAttachment => {
                    self.overlay = Some(Overlay::Attachment {
                        target: Target::Row(intent.id),
                        buffer: String::new(),
                    });
                    PageOutcome::handled()
                }
                other => PageOutcome::status(format!("{} unavailable", other.label().to_lowercase())),
            });
        }
        outcome
    }

    fn open_assign(&mut self, target: AssignTarget, tx: &Sender<ConsoleEvent>) -> PageOutcome {
        let request = self.assign.open();
        self.assign_target = target;
        match spawn_users_fetch(self.spec.users(), request.generation, tx) {
            Ok(()) => PageOutcome::status("loading users"),
            Err(error) => {
                self.assign.close();
                PageOutcome::status(format!("cannot load users: {error:#}"))
            }
        }
    }

    fn assign_to(&mut self, user: &User, tx: &Sender<ConsoleEvent>) -> PageOutcome {
        match self.assign_target {
            AssignTarget::Row => {
                let input = table_input(&self.data, self.prefiltered.as_deref(), &self.selection);
                let status = self.table.run_assign(input, user);
                let failure = match status {
                    TableStatus::ActionDone(_) => self.refresh_list(),
                    _ => None,
                };
                PageOutcome::status(status.message()).or_status(failure)
            }
            AssignTarget::Detail => {
                let Some(detail) = self.detail.as_mut() else {
                    return PageOutcome::status("detail closed before the owner was picked");
                };
                let status = detail.assign(user);
                self.after_detail(status, tx)
            }
        }
    }

    /// Folds a detail status into list state: deletes close the detail,
    /// ownership and save changes refresh the list behind it.
    fn after_detail(&mut self, status: DetailStatus, tx: &Sender<ConsoleEvent>) -> PageOutcome {
        let message = status.message();
        let outcome = match status {
            DetailStatus::Deleted => {
                self.close_detail_view();
                let failure = self.refresh_list();
                PageOutcome::status(message)
                    .with_mode(ViewMode::List)
                    .or_status(failure)
            }
            DetailStatus::Saved | DetailStatus::Claimed | DetailStatus::Assigned(_) => {
                let failure = self.refresh_list();
                PageOutcome::status(message).or_status(failure)
            }
            DetailStatus::Idle | DetailStatus::StaleDiscarded => PageOutcome::handled(),
            _ => PageOutcome::status(message),
        };
        let failure = self.flush_requests(tx);
        outcome.or_status(failure)
    }

    fn submit_note(&mut self, target: Target, body: &str, tx: &Sender<ConsoleEvent>) -> PageOutcome {
        match target {
            Target::Detail => {
                let Some(detail) = self.detail.as_mut() else {
                    return PageOutcome::status("detail closed; note discarded");
                };
                let status = detail.add_note(body);
                self.after_detail(status, tx)
            }
            Target::Row(id) => {
                let Some(item) = self.record(&id).cloned() else {
                    return PageOutcome::status("record no longer exists; note discarded");
                };
                match self.spec.add_note(&item, body, &self.user) {
                    Ok(()) => PageOutcome::status("note added"),
                    Err(error) => PageOutcome::status(format!("add note failed: {error:#}")),
                }
            }
        }
    }

    fn submit_attachment(
        &mut self,
        target: Target,
        path: &str,
        tx: &Sender<ConsoleEvent>,
    ) -> PageOutcome {
        let upload = match read_upload(Path::new(path.trim())) {
            Ok(upload) => upload,
            Err(error) => return PageOutcome::status(format!("add attachment failed: {error:#}")),
        };
        match target {
            Target::Detail => {
                let Some(detail) = self.detail.as_mut() else {
                    return PageOutcome::status("detail closed; attachment discarded");
                };
                let status = detail.add_attachment(&upload);
                self.after_detail(status, tx)
            }
            Target::Row(id) => {
                let Some(item) = self.record(&id).cloned() else {
                    return PageOutcome::status("record no longer exists; attachment discarded");
                };
                match self.spec.add_attachment(&item, &upload, &self.user) {
                    Ok(()) => PageOutcome::status(format!("attached {}", upload.file_name)),
                    Err(error) => PageOutcome::status(format!("add attachment failed: {error:#}")),
                }
            }
        }
    }

    fn keep(&mut self, overlay: Overlay<FieldOf<S>>) -> PageOutcome {
        self.overlay = Some(overlay);
        PageOutcome::handled()
    }

    fn overlay_key(
        &mut self,
        overlay: Overlay<FieldOf<S>>,
        key: KeyEvent,
        tx: &Sender<ConsoleEvent>,
    ) -> PageOutcome {
        match overlay {
            Overlay::Search(mut buffer) => match apply_text_key(&mut buffer, key) {
                TextInput::Edited => {
                    let outcome = self.apply_table(TableCommand::SetSearch(buffer.clone()), tx);
                    self.overlay = Some(Overlay::Search(buffer));
                    outcome
                }
                TextInput::Submit => PageOutcome::handled(),
                TextInput::Cancel => self.apply_table(TableCommand::ClearSearch, tx),
                TextInput::Ignored => self.keep(Overlay::Search(buffer)),
            },
            Overlay::Filter(mut builder) => match key.code {
                KeyCode::Esc => PageOutcome::status("filter discarded"),
                KeyCode::Enter => self.apply_table(builder.into_command(), tx),
                KeyCode::Tab => {
                    builder.cycle_operator();
                    self.keep(Overlay::Filter(builder))
                }
                KeyCode::Up | KeyCode::Down => {
                    builder.switch_input();
                    self.keep(Overlay::Filter(builder))
                }
                KeyCode::Backspace => {
                    builder.backspace();
                    self.keep(Overlay::Filter(builder))
                }
                KeyCode::Char(ch) if !key.modifiers.contains(KeyModifiers::CONTROL) => {
                    builder.push_char(ch);
                    self.keep(Overlay::Filter(builder))
                }
                _ => self.keep(Overlay::Filter(builder)),
            },
            Overlay::Columns(mut dialog) => {
                let len = self.table.columns().len();
                match key.code {
                    KeyCode::Esc | KeyCode::Enter | KeyCode::Char('v') => PageOutcome::handled(),
                    KeyCode::Char('j') | KeyCode::Down => {
                        dialog.move_cursor(1, len);
                        self.keep(Overlay::Columns(dialog))
                    }
                    KeyCode::Char('k') | KeyCode::Up => {
                        dialog.move_cursor(-1, len);
                        self.keep(Overlay::Columns(dialog))
                    }
                    KeyCode::Char(' ') => {
                        let outcome = match dialog.toggle_command(&self.table) {
                            Some(command) => self.apply_table(command, tx),
                            None => PageOutcome::handled(),
                        };
                        self.overlay = Some(Overlay::Columns(dialog));
                        outcome
                    }
                    _ => self.keep(Overlay::Columns(dialog)),
                }
            }
            Overlay::RowMenu(mut menu) => match key.code {
                KeyCode::Esc | KeyCode::Char('m') => PageOutcome::handled(),
                KeyCode::Char('j') | KeyCode::Down => {
                    menu.move_cursor(1);
                    self.keep(Overlay::RowMenu(menu))
                }
                KeyCode::Char('k') | KeyCode::Up => {
                    menu.move_cursor(-1);
                    self.keep(Overlay::RowMenu(menu))
                }
                KeyCode::Enter => match menu.selected() {
                    Some(action) => self.run_row_action(action, tx),
                    None => PageOutcome::handled(),
                },
                _ => self.keep(Overlay::RowMenu(menu)),
            },
            Overlay::Note { target, mut buffer } => match apply_text_key(&mut buffer, key) {
                TextInput::Submit => self.submit_note(target, &buffer, tx),
                TextInput::Cancel => PageOutcome::status("note discarded"),
                TextInput::Edited | TextInput::Ignored => self.keep(Overlay::Note { target, buffer }),
            },
            Overlay::Attachment { target, mut buffer } => match apply_text_key(&mut buffer, key) {
                TextInput::Submit => self.submit_attachment(target, &buffer, tx),
                TextInput::Cancel => PageOutcome::status("attachment discarded"),
                TextInput::Edited | TextInput::Ignored => {
                    self.keep(Overlay::Attachment { target, buffer })
                }
            },
            Overlay::FieldEdit { index, mut buffer } => match apply_text_key(&mut buffer, key) {
                TextInput::Submit => match self.detail.as_mut() {
                    Some(detail) => PageOutcome::status(detail.edit_field(index, &buffer).message()),
                    None => PageOutcome::handled(),
                },
                TextInput::Cancel => PageOutcome::handled(),
                TextInput::Edited | TextInput::Ignored => {
                    self.keep(Overlay::FieldEdit { index, buffer })
                }
            },
        }
    }

    fn assign_key(&mut self, key: KeyEvent, tx: &Sender<ConsoleEvent>) -> PageOutcome {
        match key.code {
            KeyCode::Esc => {
                self.assign.close();
                PageOutcome::status("assign cancelled")
            }
            KeyCode::Char('j') | KeyCode::Down => {
                self.assign.move_cursor(1);
                PageOutcome::handled()
            }
            KeyCode::Char('k') | KeyCode::Up => {
                self.assign.move_cursor(-1);
                PageOutcome::handled()
            }
            KeyCode::Enter => {
                let Some(user) = self.assign.selected().cloned() else {
                    return PageOutcome::handled();
                };
                self.assign.close();
                self.assign_to(&user, tx)
            }
            _ => PageOutcome::handled(),
        }
    }

    fn detail_key(&mut self, key: KeyEvent, tx: &Sender<ConsoleEvent>) -> PageOutcome {
        let Some(detail) = self.detail.as_mut() else {
            return PageOutcome::ignored();
        };
        let editing = detail.is_editing();
        match key.code {
            KeyCode::Esc if editing => return PageOutcome::status(detail.cancel_edit().message()),
            KeyCode::Esc => return self.close_detail_outcome(),
            KeyCode::Enter if editing => {
                let index = detail.field_cursor();
                let buffer = detail.input_text(index);
                self.overlay = Some(Overlay::FieldEdit { index, buffer });
                return PageOutcome::handled();
            }
            KeyCode::Char('n') if !editing => {
                self.overlay = Some(Overlay::Note {
                    target: Target::Detail,
                    buffer: String::new(),
                });
                return PageOutcome::handled();
            }
            KeyCode::Char('u') if !editing => {
                self.overlay = Some(Overlay::Attachment {
                    target: Target::Detail,
                    buffer: String::new(),
                });
                return PageOutcome::handled();
            }
            KeyCode::Char('O') if !editing => {
                if !detail.can_assign() {
                    return PageOutcome::status("assign unavailable");
                }
                return self.open_assign(AssignTarget::Detail, tx);
            }
            _ => {}
        }
        let Some(command) = detail_command_for_key(key) else {
            return PageOutcome::ignored();
        };
        let status = detail.apply_command(command);
        self.after_detail(status, tx)
    }

    fn list_key(&mut self, key: KeyEvent, tx: &Sender<ConsoleEvent>) -> PageOutcome {
        match (key.code, key.modifiers) {
            (KeyCode::Char('/'), _) => {
                let buffer = self.table.search().to_owned();
                return self.keep(Overlay::Search(buffer));
            }
            (KeyCode::Char('f'), KeyModifiers::NONE) => {
                return match FilterBuilder::for_cursor(&self.table) {
                    Some(builder) => self.keep(Overlay::Filter(builder)),
                    None => PageOutcome::status("no column under the cursor"),
                };
            }
            (KeyCode::Char('x'), KeyModifiers::NONE) => {
                let Some(column) = self.table.columns().get(self.table.cursor_col()) else {
                    return PageOutcome::status("no column under the cursor");
                };
                let field = column.field.clone();
                return self.apply_table(TableCommand::ClearFilter(field), tx);
            }
            (KeyCode::Char('v'), KeyModifiers::NONE) => {
                return self.keep(Overlay::Columns(ColumnDialog::default()));
            }
            (KeyCode::Char('m'), KeyModifiers::NONE) => {
                let actions = self.table.row_actions();
                if actions.is_empty() {
                    return PageOutcome::status("no row actions");
                }
                return self.keep(Overlay::RowMenu(RowMenu::new(actions)));
            }
            (KeyCode::Char('I'), _) if self.spec.has_inactive_toggle() => {
                self.show_inactive = !self.show_inactive;
                let failure = self.refresh_list();
                let message = if self.show_inactive {
                    "showing inactive"
                } else {
                    "hiding inactive"
                };
                return PageOutcome::status(message).or_status(failure);
            }
            (KeyCode::Char('r'), KeyModifiers::NONE) => {
                return match self.load_rows() {
                    Ok(count) => PageOutcome::status(format!("{count} rows loaded")),
                    Err(error) => PageOutcome::status(format!("reload failed: {error:#}")),
                };
            }
            (KeyCode::Esc, _) if !self.table.search().is_empty() => {
                return self.apply_table(TableCommand::ClearSearch, tx);
            }
            _ => {}
        }
        match table_command_for_key(key) {
            Some(command) => self.apply_table(command, tx),
            None => PageOutcome::ignored(),
        }
    }
}

impl<S: PageSpec> PageController for EntityPage<S> {
    fn kind(&self) -> PageKind {
        self.spec.kind()
    }

    fn is_detail_open(&self) -> bool {
        self.detail.is_some()
    }

    fn reload(&mut self) -> Result<usize> {
        self.load_rows()
    }

    fn handle_key(&mut self, key: KeyEvent, tx: &Sender<ConsoleEvent>) -> PageOutcome {
        if self.assign.is_open() {
            return self.assign_key(key, tx);
        }
        if let Some(overlay) = self.overlay.take() {
            return self.overlay_key(overlay, key, tx);
        }
        if self.detail.is_some() {
            self.detail_key(key, tx)
        } else {
            self.list_key(key, tx)
        }
    }

    fn handle_detail(&mut self, event: DetailEvent, tx: &Sender<ConsoleEvent>) -> PageOutcome {
        let Some(detail) = self.detail.as_mut() else {
            debug!(page = self.spec.kind().as_str(), "detail closed; dropping fetch result");
            return PageOutcome::ignored();
        };
        let status = detail.apply(event);
        self.after_detail(status, tx)
    }

    fn handle_users(&mut self, generation: u64, result: Result<ServiceResult<Vec<User>>>) -> PageOutcome {
        if !self.assign.apply(generation, result) {
            return PageOutcome::ignored();
        }
        match self.assign.error() {
            Some(error) => PageOutcome::status(format!("users failed to load: {error}")),
            None => PageOutcome::status(format!("{} users available", self.assign.users().len())),
        }
    }

    fn close_detail(&mut self) {
        self.close_detail_view();
    }

    fn draw(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        match &self.detail {
            Some(detail) => {
                let edit_buffer = match &self.overlay {
                    Some(Overlay::FieldEdit { buffer, .. }) => Some(buffer.as_str()),
                    _ => None,
                };
                let title = self.spec.detail_title(detail.item());
                render_detail(frame, area, &title, detail, edit_buffer);
            }
            None => {
                let input = table_input(&self.data, self.prefiltered.as_deref(), &self.selection);
                render_table(frame, area, &self.table, input, true);
            }
        }

        match &self.overlay {
            Some(Overlay::Search(buffer)) => render_overlay(
                frame,
                "search",
                format!("/{buffer}_\n\nenter keep  esc clear"),
                50,
                20,
            ),
            Some(Overlay::Filter(builder)) => {
                render_overlay(frame, "filter", filter_builder_text(builder), 60, 40);
            }
            Some(Overlay::Columns(dialog)) => {
                render_overlay(frame, "columns", column_dialog_text(dialog, &self.table), 40, 50);
            }
            Some(Overlay::RowMenu(menu)) => {
                render_overlay(frame, "row actions", row_menu_text(menu), 36, 40);
            }
            Some(Overlay::Note { buffer, .. }) => render_overlay(
                frame,
                "add note",
                format!("{buffer}_\n\nenter save  esc discard"),
                60,
                25,
            ),
            Some(Overlay::Attachment { buffer, .. }) => render_overlay(
                frame,
                "attach file",
                format!("path: {buffer}_\n\nenter upload  esc discard"),
                60,
                25,
            ),
            Some(Overlay::FieldEdit { .. }) | None => {}
        }

        if self.assign.is_open() {
            render_overlay(frame, "assign owner", assign_dialog_text(&self.assign), 50, 50);
        }
    }

    fn hints(&self) -> &'static str {
        if self.detail.is_some() {
            DETAIL_HINTS
        } else {
            LIST_HINTS
        }
    }
}

/// Reads a file picked for upload.
pub fn read_upload(path: &Path) -> Result<AttachmentUpload> {
    if path.as_os_str().is_empty() {
        bail!("enter a file path to attach");
    }
    let data = fs::read(path).with_context(|| format!("read {}", path.display()))?;
    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| anyhow!("{} has no usable file name", path.display()))?
        .to_owned();
    Ok(AttachmentUpload {
        mime_type: mime_for(&file_name).to_owned(),
        file_name,
        data,
    })
}

pub fn mime_for(file_name: &str) -> &'static str {
    let extension = file_name
        .rsplit_once('.')
        .map(|(_, extension)| extension.to_ascii_lowercase())
        .unwrap_or_default();
    match extension.as_str() {
        "pdf" => "application/pdf",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "txt" | "log" => "text/plain",
        "csv" => "text/csv",
        "md" => "text/markdown",
        "json" => "application/json",
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        "xlsx" => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        _ => "application/octet-stream",
    }
}
