// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

//! Generic detail view: one record, its main fields, and any number of
//! independently loading related tabs.
//!
//! The view never talks to a backend on its own. Everything that needs a
//! collaborator is queued as a [`DetailRequest`]; the caller drains the
//! queue with [`DetailView::take_requests`], runs each request (inline via
//! [`DetailView::execute`] or on a worker via [`DetailView::spawn_request`])
//! and feeds the outcome back through [`DetailView::apply`]. Requests carry
//! the view instance and a generation, so a response that lost a race with
//! a refresh, or that outlived the view, is dropped.

use anyhow::{Context, Result, bail};
use crm_app::{
    AttachmentUpload, CellFormat, ColumnKind, CurrentUser, EntityType, FieldKey, Record, Rendered,
    Role, Row, User, Value, format_number, format_value, parse_date_text, parse_datetime_text,
};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::Sender;
use std::thread;
use tracing::{debug, info, warn};

use crate::selection::Selection;
use crate::service::{DataService, LookupService, ServiceResult};
use crate::table::{Column, TableCommand, TableEvent, TableInput, TableStatus, TableView};

pub const TAB_LOAD_FALLBACK_ERROR: &str = "Failed to load data";

static NEXT_INSTANCE: AtomicU64 = AtomicU64::new(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    TextArea,
    Number,
    Currency,
    Date,
    DateTime,
    Boolean,
    Dropdown,
    Select,
}

impl FieldKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::TextArea => "textarea",
            Self::Number => "number",
            Self::Currency => "currency",
            Self::Date => "date",
            Self::DateTime => "datetime",
            Self::Boolean => "boolean",
            Self::Dropdown => "dropdown",
            Self::Select => "select",
        }
    }

    pub const fn column_kind(self) -> ColumnKind {
        match self {
            Self::Currency => ColumnKind::Currency,
            Self::Date => ColumnKind::Date,
            Self::DateTime => ColumnKind::DateTime,
            Self::Boolean => ColumnKind::Boolean,
            _ => ColumnKind::Text,
        }
    }

    /// Parses what the user typed into the value stored on the draft.
    /// Blank input clears the field.
    pub fn parse_input(self, raw: &str, options: &[SelectOption]) -> Result<Value> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Ok(Value::Null);
        }
        match self {
            Self::Text | Self::TextArea => Ok(Value::text(raw)),
            Self::Number => trimmed
                .parse::<f64>()
                .ok()
                .filter(|number| number.is_finite())
                .map(Value::Number)
                .with_context(|| format!("expected a number, got {trimmed:?}")),
            Self::Currency => {
                let cleaned: String = trimmed.chars().filter(|ch| *ch != '$' && *ch != ',').collect();
                cleaned
                    .parse::<f64>()
                    .ok()
                    .filter(|amount| amount.is_finite())
                    .map(Value::Number)
                    .with_context(|| {
                        format!("expected an amount like 1,250.00, got {trimmed:?}")
                    })
            }
            Self::Date => parse_date_text(trimmed)
                .map(Value::Date)
                .with_context(|| format!("expected a date like 2024-03-15, got {trimmed:?}")),
            Self::DateTime => parse_datetime_text(trimmed)
                .map(Value::DateTime)
                .with_context(|| {
                    format!("expected a date-time like 2024-03-15T09:30:00Z, got {trimmed:?}")
                }),
            Self::Boolean => Value::text(trimmed)
                .as_bool()
                .map(Value::Bool)
                .with_context(|| format!("expected yes or no, got {trimmed:?}")),
            Self::Dropdown => Ok(trimmed
                .parse::<i64>()
                .map_or_else(|_| Value::text(trimmed), Value::from)),
            Self::Select => {
                let Some(option) = options.iter().find(|option| {
                    option.value.eq_ignore_ascii_case(trimmed)
                        || option.label.eq_ignore_ascii_case(trimmed)
                }) else {
                    let allowed: Vec<&str> =
                        options.iter().map(|option| option.value.as_str()).collect();
                    bail!("{trimmed:?} is not an option; use one of: {}", allowed.join(", "));
                };
                Ok(Value::text(option.value.clone()))
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectOption {
    pub value: String,
    pub label: String,
}

impl SelectOption {
    pub fn new(value: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            label: label.into(),
        }
    }
}

/// Resolver for a dropdown: the service maps the stored id to a row and
/// `display_field` names the row attribute holding the label.
#[derive(Clone)]
pub struct Lookup {
    pub service: Arc<dyn LookupService>,
    pub display_field: String,
}

#[derive(Clone)]
pub struct FieldDescriptor<R: Record> {
    pub key: R::Field,
    pub label: String,
    pub kind: FieldKind,
    pub required: bool,
    pub read_only: bool,
    /// Attribute on the record already holding the dropdown label.
    pub display_field: Option<R::Field>,
    pub lookup: Option<Lookup>,
    pub options: Vec<SelectOption>,
    pub rows: u16,
}

impl<R: Record> FieldDescriptor<R> {
    pub fn new(key: R::Field, label: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            key,
            label: label.into(),
            kind,
            required: false,
            read_only: false,
            display_field: None,
            lookup: None,
            options: Vec::new(),
            rows: if kind == FieldKind::TextArea { 3 } else { 1 },
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn read_only(mut self) -> Self {
        self.read_only = true;
        self
    }

    pub fn display_field(mut self, field: R::Field) -> Self {
        self.display_field = Some(field);
        self
    }

    pub fn lookup(mut self, service: Arc<dyn LookupService>, display_field: impl Into<String>) -> Self {
        self.lookup = Some(Lookup {
            service,
            display_field: display_field.into(),
        });
        self
    }

    pub fn options(mut self, options: Vec<SelectOption>) -> Self {
        self.options = options;
        self
    }

    pub fn rows(mut self, rows: u16) -> Self {
        self.rows = rows.max(1);
        self
    }

    /// Label with a trailing `*` on required fields.
    pub fn display_label(&self) -> String {
        if self.required {
            format!("{} *", self.label)
        } else {
            self.label.clone()
        }
    }
}

pub type ProcessRows = Arc<dyn Fn(Vec<Row>) -> Vec<Row> + Send + Sync>;

pub struct RelatedTab<R> {
    pub key: String,
    pub label: String,
    pub entity_type: EntityType,
    table: Option<TableView<Row>>,
    service: Arc<dyn DataService<R>>,
    process: Option<ProcessRows>,
}

impl<R> RelatedTab<R> {
    pub fn new(
        key: impl Into<String>,
        label: impl Into<String>,
        entity_type: EntityType,
        service: Arc<dyn DataService<R>>,
    ) -> Self {
        Self {
            key: key.into(),
            label: label.into(),
            entity_type,
            table: None,
            service,
            process: None,
        }
    }

    pub fn table(mut self, table: TableView<Row>) -> Self {
        self.table = Some(table);
        self
    }

    pub fn process(mut self, process: impl Fn(Vec<Row>) -> Vec<Row> + Send + Sync + 'static) -> Self {
        self.process = Some(Arc::new(process));
        self
    }
}

/// Load state of one related tab. Tabs never share state.
pub struct TabState {
    pub loading: bool,
    pub error: Option<String>,
    pub data: Option<Vec<Row>>,
    pub selection: Selection,
    pub table: TableView<Row>,
    generation: u64,
}

impl TabState {
    fn new(table: TableView<Row>) -> Self {
        Self {
            loading: false,
            error: None,
            data: None,
            selection: Selection::new(),
            table,
            generation: 0,
        }
    }

    pub fn rows(&self) -> &[Row] {
        self.data.as_deref().unwrap_or(&[])
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum LookupState {
    Pending { generation: u64 },
    Resolved(String),
    Failed,
}

/// What a main field shows while viewing.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldDisplay {
    Rendered(Rendered),
    Label(String),
    /// Dropdown lookup still in flight; carries the raw id.
    Loading(String),
}

impl FieldDisplay {
    pub fn text(&self) -> String {
        match self {
            Self::Rendered(rendered) => rendered.display_text(),
            Self::Label(label) => label.clone(),
            Self::Loading(raw) => format!("{raw} (loading…)"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TabRequest {
    pub instance: u64,
    pub key: String,
    pub generation: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LookupRequest {
    pub instance: u64,
    pub field: usize,
    pub value: Value,
    pub generation: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DetailRequest {
    Tab(TabRequest),
    Lookup(LookupRequest),
}

#[derive(Debug)]
pub enum DetailEvent {
    TabLoaded {
        request: TabRequest,
        result: Result<ServiceResult<Vec<Row>>>,
    },
    LookupResolved {
        request: LookupRequest,
        result: Result<ServiceResult<Row>>,
    },
}

pub enum DetailMode<R> {
    Viewing,
    Editing { draft: R },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetailAction {
    Edit,
    Save,
    Cancel,
    Delete,
    AddNote,
    AddAttachment,
    Claim,
    Assign,
    RefreshTab,
}

impl DetailAction {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Edit => "Edit",
            Self::Save => "Save",
            Self::Cancel => "Cancel",
            Self::Delete => "Delete",
            Self::AddNote => "Add note",
            Self::AddAttachment => "Add attachment",
            Self::Claim => "Claim",
            Self::Assign => "Assign",
            Self::RefreshTab => "Refresh tab",
        }
    }
}

type SaveFn<R> = Box<dyn FnMut(&R) -> Result<()>>;
type NoteFn<R> = Box<dyn FnMut(&R, &str) -> Result<()>>;
type AttachmentFn<R> = Box<dyn FnMut(&R, &AttachmentUpload) -> Result<()>>;
type ClaimFn<R> = Box<dyn FnMut(&R, &CurrentUser) -> Result<()>>;
type AssignFn<R> = Box<dyn FnMut(&R, &User) -> Result<()>>;

/// Container callbacks; every one is optional and hides its action when
/// absent.
pub struct DetailActions<R> {
    save: Option<SaveFn<R>>,
    delete: Option<SaveFn<R>>,
    add_note: Option<NoteFn<R>>,
    add_attachment: Option<AttachmentFn<R>>,
    claim: Option<ClaimFn<R>>,
    assign: Option<AssignFn<R>>,
}

impl<R> Default for DetailActions<R> {
    fn default() -> Self {
        Self {
            save: None,
            delete: None,
            add_note: None,
            add_attachment: None,
            claim: None,
            assign: None,
        }
    }
}

impl<R> DetailActions<R> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_save(mut self, callback: impl FnMut(&R) -> Result<()> + 'static) -> Self {
        self.save = Some(Box::new(callback));
        self
    }

    pub fn on_delete(mut self, callback: impl FnMut(&R) -> Result<()> + 'static) -> Self {
        self.delete = Some(Box::new(callback));
        self
    }

    pub fn on_add_note(mut self, callback: impl FnMut(&R, &str) -> Result<()> + 'static) -> Self {
        self.add_note = Some(Box::new(callback));
        self
    }

    pub fn on_add_attachment(
        mut self,
        callback: impl FnMut(&R, &AttachmentUpload) -> Result<()> + 'static,
    ) -> Self {
        self.add_attachment = Some(Box::new(callback));
        self
    }

    pub fn on_claim(mut self, callback: impl FnMut(&R, &CurrentUser) -> Result<()> + 'static) -> Self {
        self.claim = Some(Box::new(callback));
        self
    }

    pub fn on_assign(mut self, callback: impl FnMut(&R, &User) -> Result<()> + 'static) -> Self {
        self.assign = Some(Box::new(callback));
        self
    }
}

/// Which attributes hold the owner, and which roles may claim or assign.
#[derive(Clone)]
pub struct OwnershipConfig<R: Record> {
    pub owner_field: R::Field,
    pub owner_name_field: R::Field,
    pub claim_roles: BTreeSet<Role>,
    pub assign_roles: BTreeSet<Role>,
}

impl<R: Record> OwnershipConfig<R> {
    pub fn new(owner_field: R::Field, owner_name_field: R::Field) -> Self {
        Self {
            owner_field,
            owner_name_field,
            claim_roles: BTreeSet::new(),
            assign_roles: BTreeSet::new(),
        }
    }

    pub fn claim_roles(mut self, roles: &[Role]) -> Self {
        self.claim_roles = roles.iter().copied().collect();
        self
    }

    pub fn assign_roles(mut self, roles: &[Role]) -> Self {
        self.assign_roles = roles.iter().copied().collect();
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OwnershipChange {
    Claim,
    Assign,
}

struct PendingOwnership {
    change: OwnershipChange,
    previous_owner: Value,
    previous_name: Value,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DetailCommand {
    NextField,
    PrevField,
    NextTab,
    PrevTab,
    BeginEdit,
    CancelEdit,
    Save,
    Delete,
    Claim,
    RefreshTab,
    DismissError,
    EditField { index: usize, raw: String },
    Tab(TableCommand<String>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DetailStatus {
    Idle,
    Editing,
    EditCancelled,
    Saved,
    SaveFailed(String),
    Deleted,
    DeleteFailed(String),
    FieldUpdated(String),
    FieldRejected { label: String, reason: String },
    FieldReadOnly(String),
    ReadOnlyRecord,
    TabLoading(String),
    TabLoaded { label: String, rows: usize },
    TabFailed { label: String, error: String },
    StaleDiscarded,
    LookupResolved(String),
    Claimed,
    Assigned(String),
    OwnershipFailed(String),
    NoteAdded,
    AttachmentAdded,
    ActionFailed { action: DetailAction, error: String },
    Unavailable(DetailAction),
    ErrorDismissed,
    Table(TableStatus),
}

impl DetailStatus {
    pub fn message(&self) -> String {
        match self {
            Self::Idle => String::new(),
            Self::Editing => "editing".to_owned(),
            Self::EditCancelled => "edit cancelled".to_owned(),
            Self::Saved => "saved".to_owned(),
            Self::SaveFailed(error) => format!("save failed: {error}"),
            Self::Deleted => "deleted".to_owned(),
            Self::DeleteFailed(error) => format!("delete failed: {error}"),
            Self::FieldUpdated(label) => format!("{label} updated"),
            Self::FieldRejected { label, reason } => format!("{label}: {reason}"),
            Self::FieldReadOnly(label) => format!("{label} is read-only"),
            Self::ReadOnlyRecord => "record is read-only".to_owned(),
            Self::TabLoading(label) => format!("loading {label}"),
            Self::TabLoaded { label, rows } => format!("{label}: {rows} rows"),
            Self::TabFailed { label, error } => format!("{label}: {error}"),
            Self::StaleDiscarded => "stale response discarded".to_owned(),
            Self::LookupResolved(label) => format!("resolved {label}"),
            Self::Claimed => "claimed".to_owned(),
            Self::Assigned(name) => format!("assigned to {name}"),
            Self::OwnershipFailed(error) => format!("ownership change failed: {error}"),
            Self::NoteAdded => "note added".to_owned(),
            Self::AttachmentAdded => "attachment added".to_owned(),
            Self::ActionFailed { action, error } => {
                format!("{} failed: {error}", action.label().to_lowercase())
            }
            Self::Unavailable(action) => format!("{} unavailable", action.label().to_lowercase()),
            Self::ErrorDismissed => "error dismissed".to_owned(),
            Self::Table(status) => status.message(),
        }
    }
}

type LookupKey<F> = (F, String);

pub struct DetailView<R: Record> {
    instance: u64,
    item: R,
    mode: DetailMode<R>,
    read_only: bool,
    fields: Vec<FieldDescriptor<R>>,
    tabs: Vec<RelatedTab<R>>,
    tab_states: Vec<TabState>,
    active_tab: Option<usize>,
    lookups: BTreeMap<LookupKey<R::Field>, LookupState>,
    lookup_generation: u64,
    pending: Vec<DetailRequest>,
    user: CurrentUser,
    actions: DetailActions<R>,
    ownership: Option<OwnershipConfig<R>>,
    ownership_pending: Option<PendingOwnership>,
    error: Option<String>,
    field_cursor: usize,
}

impl<R: Record> DetailView<R> {
    pub fn new(
        item: R,
        fields: Vec<FieldDescriptor<R>>,
        mut tabs: Vec<RelatedTab<R>>,
        user: CurrentUser,
    ) -> Result<Self> {
        for field in &fields {
            match field.kind {
                FieldKind::Dropdown => {
                    let carries_label = field
                        .display_field
                        .as_ref()
                        .is_some_and(|display| !item.get(display).is_blank());
                    if !carries_label && field.lookup.is_none() {
                        bail!(
                            "dropdown field {:?} needs a display field on the record or a lookup service",
                            field.label
                        );
                    }
                }
                FieldKind::Select if field.options.is_empty() => {
                    bail!("select field {:?} has no options", field.label);
                }
                _ => {}
            }
        }

        let mut seen = BTreeSet::new();
        for tab in &tabs {
            if !seen.insert(tab.key.clone()) {
                bail!("related tab key {:?} is used twice", tab.key);
            }
        }

        let tab_states = tabs
            .iter_mut()
            .map(|tab| {
                let table = tab
                    .table
                    .take()
                    .unwrap_or_else(|| TableView::new(tab.label.clone(), "id".to_owned(), Vec::new()));
                TabState::new(table)
            })
            .collect();

        let mut view = Self {
            instance: NEXT_INSTANCE.fetch_add(1, Ordering::Relaxed),
            item,
            mode: DetailMode::Viewing,
            read_only: false,
            fields,
            tabs,
            tab_states,
            active_tab: None,
            lookups: BTreeMap::new(),
            lookup_generation: 0,
            pending: Vec::new(),
            user,
            actions: DetailActions::new(),
            ownership: None,
            ownership_pending: None,
            error: None,
            field_cursor: 0,
        };
        view.schedule_lookups();
        if !view.tabs.is_empty() {
            view.activate_tab(0);
        }
        Ok(view)
    }

    pub fn with_actions(mut self, actions: DetailActions<R>) -> Self {
        self.actions = actions;
        self
    }

    pub fn with_ownership(mut self, ownership: OwnershipConfig<R>) -> Self {
        self.ownership = Some(ownership);
        self
    }

    pub fn read_only(mut self) -> Self {
        self.read_only = true;
        self
    }

    pub fn instance(&self) -> u64 {
        self.instance
    }

    pub fn item(&self) -> &R {
        &self.item
    }

    /// The draft while editing, otherwise the item.
    pub fn shown(&self) -> &R {
        match &self.mode {
            DetailMode::Viewing => &self.item,
            DetailMode::Editing { draft } => draft,
        }
    }

    pub fn is_editing(&self) -> bool {
        matches!(self.mode, DetailMode::Editing { .. })
    }

    pub fn fields(&self) -> &[FieldDescriptor<R>] {
        &self.fields
    }

    pub fn field_cursor(&self) -> usize {
        self.field_cursor
    }

    pub fn tabs(&self) -> impl Iterator<Item = (&RelatedTab<R>, &TabState)> {
        self.tabs.iter().zip(self.tab_states.iter())
    }

    pub fn tab_state(&self, key: &str) -> Option<&TabState> {
        self.tab_index(key).map(|index| &self.tab_states[index])
    }

    pub fn active_tab(&self) -> Option<usize> {
        self.active_tab
    }

    pub fn user(&self) -> &CurrentUser {
        &self.user
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn dismiss_error(&mut self) -> DetailStatus {
        if self.error.take().is_some() {
            DetailStatus::ErrorDismissed
        } else {
            DetailStatus::Idle
        }
    }

    /// Replaces the item with a fresh copy from the caller. Ignored while
    /// editing so the draft is not clobbered.
    pub fn set_item(&mut self, item: R) {
        self.item = item;
        self.ownership_pending = None;
        if !self.is_editing() {
            self.schedule_lookups();
        }
    }

    pub fn take_requests(&mut self) -> Vec<DetailRequest> {
        std::mem::take(&mut self.pending)
    }

    pub fn has_pending_requests(&self) -> bool {
        !self.pending.is_empty()
    }

    fn tab_index(&self, key: &str) -> Option<usize> {
        self.tabs.iter().position(|tab| tab.key == key)
    }

    pub fn display_value(&self, index: usize) -> FieldDisplay {
        let Some(field) = self.fields.get(index) else {
            return FieldDisplay::Rendered(Rendered::Placeholder);
        };
        let record = self.shown();
        let value = record.get(&field.key);
        match field.kind {
            FieldKind::Dropdown => {
                if value.is_blank() {
                    return FieldDisplay::Rendered(Rendered::Placeholder);
                }
                if let Some(display) = &field.display_field {
                    let label = record.get(display);
                    if !label.is_blank() {
                        return FieldDisplay::Label(label.search_text());
                    }
                }
                let raw = value.search_text();
                match self.lookups.get(&(field.key.clone(), raw.clone())) {
                    Some(LookupState::Resolved(label)) => FieldDisplay::Label(label.clone()),
                    Some(LookupState::Pending { .. }) => FieldDisplay::Loading(raw),
                    Some(LookupState::Failed) | None => FieldDisplay::Label(raw),
                }
            }
            FieldKind::Select => {
                if value.is_blank() {
                    return FieldDisplay::Rendered(Rendered::Placeholder);
                }
                let raw = value.search_text();
                let label = field
                    .options
                    .iter()
                    .find(|option| option.value.eq_ignore_ascii_case(&raw))
                    .map_or(raw, |option| option.label.clone());
                FieldDisplay::Label(label)
            }
            kind => FieldDisplay::Rendered(format_value(&CellFormat::plain(kind.column_kind()), &value)),
        }
    }

    /// Editable text for a field on the shown record.
    pub fn input_text(&self, index: usize) -> String {
        let Some(field) = self.fields.get(index) else {
            return String::new();
        };
        match self.shown().get(&field.key) {
            Value::Null => String::new(),
            Value::Number(number) => format_number(number),
            Value::Bool(flag) => (if flag { "yes" } else { "no" }).to_owned(),
            other => other.search_text(),
        }
    }

    pub fn visible_actions(&self) -> Vec<DetailAction> {
        let mut actions = Vec::new();
        if self.is_editing() {
            actions.push(DetailAction::Save);
            actions.push(DetailAction::Cancel);
            return actions;
        }
        if self.can_edit() {
            actions.push(DetailAction::Edit);
        }
        if self.actions.delete.is_some() && !self.read_only {
            actions.push(DetailAction::Delete);
        }
        if self.actions.add_note.is_some() {
            actions.push(DetailAction::AddNote);
        }
        if self.actions.add_attachment.is_some() {
            actions.push(DetailAction::AddAttachment);
        }
        if self.can_claim() {
            actions.push(DetailAction::Claim);
        }
        if self.can_assign() {
            actions.push(DetailAction::Assign);
        }
        if self.active_tab.is_some() {
            actions.push(DetailAction::RefreshTab);
        }
        actions
    }

    fn can_edit(&self) -> bool {
        !self.read_only && self.actions.save.is_some()
    }

    /// Advisory gating: unowned record and a claiming role.
    pub fn can_claim(&self) -> bool {
        let Some(ownership) = &self.ownership else {
            return false;
        };
        self.actions.claim.is_some()
            && self.ownership_pending.is_none()
            && self.item.get(&ownership.owner_field).is_blank()
            && self.user.has_any_role(&ownership.claim_roles)
    }

    pub fn can_assign(&self) -> bool {
        let Some(ownership) = &self.ownership else {
            return false;
        };
        self.actions.assign.is_some()
            && self.ownership_pending.is_none()
            && self.user.has_any_role(&ownership.assign_roles)
    }

    pub fn begin_edit(&mut self) -> DetailStatus {
        if !self.can_edit() {
            return DetailStatus::ReadOnlyRecord;
        }
        if !self.is_editing() {
            self.mode = DetailMode::Editing {
                draft: self.item.clone(),
            };
        }
        DetailStatus::Editing
    }

    pub fn cancel_edit(&mut self) -> DetailStatus {
        if !self.is_editing() {
            return DetailStatus::Idle;
        }
        self.mode = DetailMode::Viewing;
        DetailStatus::EditCancelled
    }

    pub fn edit_field(&mut self, index: usize, raw: &str) -> DetailStatus {
        let Some(field) = self.fields.get(index) else {
            return DetailStatus::Idle;
        };
        if field.read_only {
            return DetailStatus::FieldReadOnly(field.label.clone());
        }
        let DetailMode::Editing { draft } = &mut self.mode else {
            return DetailStatus::Unavailable(DetailAction::Edit);
        };
        let parsed = field
            .kind
            .parse_input(raw, &field.options)
            .and_then(|value| draft.set(&field.key, value));
        match parsed {
            Ok(()) => DetailStatus::FieldUpdated(field.label.clone()),
            Err(error) => DetailStatus::FieldRejected {
                label: field.label.clone(),
                reason: error.to_string(),
            },
        }
    }

    /// Hands the draft to the save callback and returns to viewing. The
    /// draft becomes the item only when the callback succeeds.
    pub fn save(&mut self) -> DetailStatus {
        if !self.is_editing() {
            return DetailStatus::Unavailable(DetailAction::Save);
        }
        let Some(save) = self.actions.save.as_mut() else {
            return DetailStatus::Unavailable(DetailAction::Save);
        };
        let DetailMode::Editing { draft } = std::mem::replace(&mut self.mode, DetailMode::Viewing) else {
            return DetailStatus::Unavailable(DetailAction::Save);
        };
        match save(&draft) {
            Ok(()) => {
                info!(instance = self.instance, "detail saved");
                self.item = draft;
                self.error = None;
                self.schedule_lookups();
                DetailStatus::Saved
            }
            Err(error) => {
                warn!(instance = self.instance, error = %error, "save failed");
                let message = error.to_string();
                self.error = Some(format!("save failed: {message}"));
                DetailStatus::SaveFailed(message)
            }
        }
    }

    pub fn delete(&mut self) -> DetailStatus {
        if self.read_only {
            return DetailStatus::ReadOnlyRecord;
        }
        let Some(delete) = self.actions.delete.as_mut() else {
            return DetailStatus::Unavailable(DetailAction::Delete);
        };
        match delete(&self.item) {
            Ok(()) => DetailStatus::Deleted,
            Err(error) => {
                warn!(instance = self.instance, error = %error, "delete failed");
                let message = error.to_string();
                self.error = Some(format!("delete failed: {message}"));
                DetailStatus::DeleteFailed(message)
            }
        }
    }

    pub fn add_note(&mut self, body: &str) -> DetailStatus {
        let Some(add_note) = self.actions.add_note.as_mut() else {
            return DetailStatus::Unavailable(DetailAction::AddNote);
        };
        match add_note(&self.item, body) {
            Ok(()) => {
                self.invalidate_entity_tabs(EntityType::Note);
                DetailStatus::NoteAdded
            }
            Err(error) => self.action_failed(DetailAction::AddNote, error),
        }
    }

    pub fn add_attachment(&mut self, upload: &AttachmentUpload) -> DetailStatus {
        let Some(add_attachment) = self.actions.add_attachment.as_mut() else {
            return DetailStatus::Unavailable(DetailAction::AddAttachment);
        };
        match add_attachment(&self.item, upload) {
            Ok(()) => {
                self.invalidate_entity_tabs(EntityType::Attachment);
                DetailStatus::AttachmentAdded
            }
            Err(error) => self.action_failed(DetailAction::AddAttachment, error),
        }
    }

    fn action_failed(&mut self, action: DetailAction, error: anyhow::Error) -> DetailStatus {
        warn!(action = action.label(), error = %error, "detail action failed");
        let message = error.to_string();
        self.error = Some(format!("{} failed: {message}", action.label().to_lowercase()));
        DetailStatus::ActionFailed {
            action,
            error: message,
        }
    }

    fn invalidate_entity_tabs(&mut self, entity_type: EntityType) {
        let indices: Vec<usize> = self
            .tabs
            .iter()
            .enumerate()
            .filter(|(_, tab)| tab.entity_type == entity_type)
            .map(|(index, _)| index)
            .collect();
        for index in indices {
            self.refresh_tab(index);
        }
    }

    /// Flips the owner to the current user before the backend confirms.
    pub fn begin_claim(&mut self) -> Result<()> {
        if !self.can_claim() {
            bail!("claim is not available for this record");
        }
        let user_id = Value::from(self.user.id);
        let user_name = Value::text(self.user.display_name.clone());
        self.flip_owner(OwnershipChange::Claim, user_id, user_name)
    }

    pub fn begin_assign(&mut self, user: &User) -> Result<()> {
        if !self.can_assign() {
            bail!("assign is not available for this record");
        }
        self.flip_owner(
            OwnershipChange::Assign,
            Value::from(user.id),
            Value::text(user.display_name.clone()),
        )
    }

    fn flip_owner(&mut self, change: OwnershipChange, owner: Value, name: Value) -> Result<()> {
        let Some(ownership) = &self.ownership else {
            bail!("record has no owner fields");
        };
        let owner_field = ownership.owner_field.clone();
        let name_field = ownership.owner_name_field.clone();
        let previous_owner = self.item.get(&owner_field);
        let previous_name = self.item.get(&name_field);
        self.item.set(&owner_field, owner)?;
        if let Err(error) = self.item.set(&name_field, name) {
            self.item.set(&owner_field, previous_owner)?;
            return Err(error);
        }
        self.ownership_pending = Some(PendingOwnership {
            change,
            previous_owner,
            previous_name,
        });
        Ok(())
    }

    /// Confirms or rolls back the pending ownership flip.
    pub fn finish_ownership(&mut self, result: Result<()>) -> DetailStatus {
        let Some(pending) = self.ownership_pending.take() else {
            return DetailStatus::Idle;
        };
        match result {
            Ok(()) => match pending.change {
                OwnershipChange::Claim => DetailStatus::Claimed,
                OwnershipChange::Assign => {
                    let name = self
                        .ownership
                        .as_ref()
                        .map(|ownership| self.item.get(&ownership.owner_name_field).search_text())
                        .unwrap_or_default();
                    DetailStatus::Assigned(name)
                }
            },
            Err(error) => {
                warn!(instance = self.instance, error = %error, "ownership change rolled back");
                if let Some(ownership) = &self.ownership {
                    let owner_field = ownership.owner_field.clone();
                    let name_field = ownership.owner_name_field.clone();
                    let restored = self
                        .item
                        .set(&owner_field, pending.previous_owner)
                        .and_then(|()| self.item.set(&name_field, pending.previous_name));
                    if let Err(restore_error) = restored {
                        warn!(error = %restore_error, "could not restore previous owner");
                    }
                }
                let message = error.to_string();
                self.error = Some(format!("ownership change failed: {message}"));
                DetailStatus::OwnershipFailed(message)
            }
        }
    }

    pub fn claim(&mut self) -> DetailStatus {
        if let Err(error) = self.begin_claim() {
            return DetailStatus::OwnershipFailed(error.to_string());
        }
        let result = match self.actions.claim.as_mut() {
            Some(claim) => claim(&self.item, &self.user),
            None => Err(anyhow::anyhow!("claim has no handler")),
        };
        self.finish_ownership(result)
    }

    pub fn assign(&mut self, user: &User) -> DetailStatus {
        if let Err(error) = self.begin_assign(user) {
            return DetailStatus::OwnershipFailed(error.to_string());
        }
        let result = match self.actions.assign.as_mut() {
            Some(assign) => assign(&self.item, user),
            None => Err(anyhow::anyhow!("assign has no handler")),
        };
        self.finish_ownership(result)
    }

    /// Selects a tab and queues its first fetch; loaded tabs stay cached.
    pub fn activate_tab(&mut self, index: usize) -> DetailStatus {
        let Some(tab) = self.tabs.get(index) else {
            return DetailStatus::Idle;
        };
        self.active_tab = Some(index);
        let label = tab.label.clone();
        let state = &self.tab_states[index];
        if state.data.is_some() || state.loading {
            return DetailStatus::Idle;
        }
        self.issue_tab_request(index);
        DetailStatus::TabLoading(label)
    }

    /// Drops the cached rows for a tab and fetches again.
    pub fn refresh_tab(&mut self, index: usize) -> DetailStatus {
        let Some(tab) = self.tabs.get(index) else {
            return DetailStatus::Idle;
        };
        let label = tab.label.clone();
        let state = &mut self.tab_states[index];
        state.data = None;
        state.error = None;
        self.issue_tab_request(index);
        DetailStatus::TabLoading(label)
    }

    fn issue_tab_request(&mut self, index: usize) {
        let key = self.tabs[index].key.clone();
        let state = &mut self.tab_states[index];
        state.generation += 1;
        state.loading = true;
        debug!(instance = self.instance, tab = %key, generation = state.generation, "tab fetch issued");
        self.pending.push(DetailRequest::Tab(TabRequest {
            instance: self.instance,
            key,
            generation: state.generation,
        }));
    }

    fn schedule_lookups(&mut self) {
        let mut requests = Vec::new();
        for (index, field) in self.fields.iter().enumerate() {
            if field.kind != FieldKind::Dropdown || field.lookup.is_none() {
                continue;
            }
            let value = self.item.get(&field.key);
            if value.is_blank() {
                continue;
            }
            let carries_label = field
                .display_field
                .as_ref()
                .is_some_and(|display| !self.item.get(display).is_blank());
            if carries_label {
                continue;
            }
            let key = (field.key.clone(), value.search_text());
            if self.lookups.contains_key(&key) {
                continue;
            }
            requests.push((index, key, value));
        }
        for (field, key, value) in requests {
            self.lookup_generation += 1;
            let generation = self.lookup_generation;
            self.lookups.insert(key, LookupState::Pending { generation });
            self.pending.push(DetailRequest::Lookup(LookupRequest {
                instance: self.instance,
                field,
                value,
                generation,
            }));
        }
    }

    pub fn apply(&mut self, event: DetailEvent) -> DetailStatus {
        match event {
            DetailEvent::TabLoaded { request, result } => self.apply_tab(request, result),
            DetailEvent::LookupResolved { request, result } => self.apply_lookup(request, result),
        }
    }

    fn apply_tab(&mut self, request: TabRequest, result: Result<ServiceResult<Vec<Row>>>) -> DetailStatus {
        let Some(index) = self.tab_index(&request.key) else {
            return DetailStatus::StaleDiscarded;
        };
        if request.instance != self.instance || request.generation != self.tab_states[index].generation {
            debug!(
                tab = %request.key,
                generation = request.generation,
                current = self.tab_states[index].generation,
                "stale tab response discarded"
            );
            return DetailStatus::StaleDiscarded;
        }
        let tab = &self.tabs[index];
        let label = tab.label.clone();
        let state = &mut self.tab_states[index];
        state.loading = false;
        match result {
            Ok(result) => {
                let mut rows = result.into_data();
                if let Some(process) = &tab.process {
                    rows = process(rows);
                }
                if state.table.columns().is_empty() {
                    state.table = default_tab_table(&label, &rows);
                }
                let ids: Vec<_> = rows
                    .iter()
                    .filter_map(|row| row.record_id(state.table.id_field()))
                    .collect();
                state.selection.retain_existing(ids.iter());
                state.error = None;
                let count = rows.len();
                state.data = Some(rows);
                let data = state.data.as_deref().unwrap_or(&[]);
                state.table.clamp(TableInput::new(data, &state.selection));
                DetailStatus::TabLoaded { label, rows: count }
            }
            Err(error) => {
                let message = error.to_string();
                let message = if message.trim().is_empty() {
                    TAB_LOAD_FALLBACK_ERROR.to_owned()
                } else {
                    message
                };
                warn!(tab = %request.key, error = %message, "tab fetch failed");
                state.error = Some(message.clone());
                state.data = Some(Vec::new());
                DetailStatus::TabFailed {
                    label,
                    error: message,
                }
            }
        }
    }

    fn apply_lookup(&mut self, request: LookupRequest, result: Result<ServiceResult<Row>>) -> DetailStatus {
        let Some(field) = self.fields.get(request.field) else {
            return DetailStatus::StaleDiscarded;
        };
        let key = (field.key.clone(), request.value.search_text());
        let current = self.lookups.get(&key);
        if request.instance != self.instance
            || current != Some(&LookupState::Pending { generation: request.generation })
        {
            debug!(field = field.key.name(), "stale lookup response discarded");
            return DetailStatus::StaleDiscarded;
        }
        let display_field = field
            .lookup
            .as_ref()
            .map(|lookup| lookup.display_field.clone())
            .unwrap_or_default();
        let label = match result {
            Ok(result) => {
                let label = result.into_data().value(&display_field);
                if label.is_blank() {
                    None
                } else {
                    Some(label.search_text())
                }
            }
            Err(error) => {
                debug!(field = field.key.name(), error = %error, "lookup failed; showing raw value");
                None
            }
        };
        match label {
            Some(label) => {
                self.lookups.insert(key, LookupState::Resolved(label.clone()));
                DetailStatus::LookupResolved(label)
            }
            None => {
                self.lookups.insert(key, LookupState::Failed);
                DetailStatus::Idle
            }
        }
    }

    /// Applies a table command to the active tab's table. Selection
    /// changes land in that tab's own selection.
    pub fn apply_tab_command(&mut self, command: TableCommand<String>) -> DetailStatus {
        let Some(index) = self.active_tab else {
            return DetailStatus::Idle;
        };
        let state = &mut self.tab_states[index];
        let data = state.data.as_deref().unwrap_or(&[]);
        let event = state
            .table
            .apply(TableInput::new(data, &state.selection), command);
        match event {
            TableEvent::Selection(change) => {
                state.selection.apply(change);
                DetailStatus::Idle
            }
            TableEvent::Status(status) => DetailStatus::Table(status),
            TableEvent::CursorUpdated | TableEvent::CellActivated { .. } => DetailStatus::Idle,
        }
    }

    pub fn apply_command(&mut self, command: DetailCommand) -> DetailStatus {
        match command {
            DetailCommand::NextField => {
                if !self.fields.is_empty() {
                    self.field_cursor = (self.field_cursor + 1).min(self.fields.len() - 1);
                }
                DetailStatus::Idle
            }
            DetailCommand::PrevField => {
                self.field_cursor = self.field_cursor.saturating_sub(1);
                DetailStatus::Idle
            }
            DetailCommand::NextTab => match self.active_tab {
                Some(index) if index + 1 < self.tabs.len() => self.activate_tab(index + 1),
                None if !self.tabs.is_empty() => self.activate_tab(0),
                _ => DetailStatus::Idle,
            },
            DetailCommand::PrevTab => match self.active_tab {
                Some(index) if index > 0 => self.activate_tab(index - 1),
                _ => DetailStatus::Idle,
            },
            DetailCommand::BeginEdit => self.begin_edit(),
            DetailCommand::CancelEdit => self.cancel_edit(),
            DetailCommand::Save => self.save(),
            DetailCommand::Delete => self.delete(),
            DetailCommand::Claim => self.claim(),
            DetailCommand::RefreshTab => match self.active_tab {
                Some(index) => self.refresh_tab(index),
                None => DetailStatus::Unavailable(DetailAction::RefreshTab),
            },
            DetailCommand::DismissError => self.dismiss_error(),
            DetailCommand::EditField { index, raw } => self.edit_field(index, &raw),
            DetailCommand::Tab(command) => self.apply_tab_command(command),
        }
    }
}

type Job = Box<dyn FnOnce() -> DetailEvent + Send>;

impl<R: Record + Send + 'static> DetailView<R> {
    fn job(&self, request: DetailRequest) -> Result<Job> {
        match request {
            DetailRequest::Tab(request) => {
                let Some(index) = self.tab_index(&request.key) else {
                    bail!("no related tab with key {:?}", request.key);
                };
                let service = Arc::clone(&self.tabs[index].service);
                let parent = self.item.clone();
                Ok(Box::new(move || {
                    let result = service.fetch(&parent);
                    DetailEvent::TabLoaded { request, result }
                }))
            }
            DetailRequest::Lookup(request) => {
                let Some(lookup) = self
                    .fields
                    .get(request.field)
                    .and_then(|field| field.lookup.clone())
                else {
                    bail!("field {} has no lookup service", request.field);
                };
                Ok(Box::new(move || {
                    let result = lookup.service.resolve(&request.value);
                    DetailEvent::LookupResolved { request, result }
                }))
            }
        }
    }

    /// Runs a request on the calling thread.
    pub fn execute(&self, request: DetailRequest) -> Result<DetailEvent> {
        let job = self.job(request)?;
        Ok(job())
    }

    /// Runs a request on a worker thread and sends the outcome to `tx`.
    pub fn spawn_request<E>(&self, request: DetailRequest, tx: Sender<E>) -> Result<()>
    where
        E: From<DetailEvent> + Send + 'static,
    {
        let job = self.job(request)?;
        thread::Builder::new()
            .name("crm-detail-fetch".to_owned())
            .spawn(move || {
                let _ = tx.send(E::from(job()));
            })
            .context("spawn detail fetch worker")?;
        Ok(())
    }

    /// Drains and runs every queued request inline.
    pub fn run_pending(&mut self) -> Result<Vec<DetailStatus>> {
        let mut statuses = Vec::new();
        while self.has_pending_requests() {
            for request in self.take_requests() {
                let event = self.execute(request)?;
                statuses.push(self.apply(event));
            }
        }
        Ok(statuses)
    }
}

/// Table for a tab configured without columns: one text column per
/// attribute of the first row.
fn default_tab_table(label: &str, rows: &[Row]) -> TableView<Row> {
    let columns = rows
        .first()
        .map(|row| {
            row.keys()
                .map(|key| Column::new(key.to_owned(), key.replace('_', " ")))
                .collect()
        })
        .unwrap_or_default();
    TableView::new(label, "id".to_owned(), columns)
}

#[cfg(test)]
mod tests {
    use super::{
        DetailAction, DetailActions, DetailCommand, DetailStatus, DetailView, FieldDescriptor,
        FieldDisplay, FieldKind, OwnershipConfig, RelatedTab, SelectOption,
    };
    use crate::service::ServiceResult;
    use crm_app::{
        AttachmentUpload, CurrentUser, EntityType, Rendered, Role, Row, User, UserId, Value,
    };
    use std::cell::RefCell;
    use std::rc::Rc;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn rep() -> CurrentUser {
        CurrentUser::new(UserId::new(7), "Riley Rep", &[Role::SalesRep])
    }

    fn account() -> Row {
        Row::new()
            .with("id", 1)
            .with("name", "Acme")
            .with("annual_revenue", 1_250_000.0)
            .with("owner_id", Value::Null)
            .with("owner_name", "")
            .with("status", "prospect")
    }

    fn fields() -> Vec<FieldDescriptor<Row>> {
        vec![
            FieldDescriptor::new("name".to_owned(), "Name", FieldKind::Text).required(),
            FieldDescriptor::new("annual_revenue".to_owned(), "Revenue", FieldKind::Currency),
            FieldDescriptor::new("id".to_owned(), "ID", FieldKind::Number).read_only(),
            FieldDescriptor::new("status".to_owned(), "Status", FieldKind::Select).options(vec![
                SelectOption::new("prospect", "Prospect"),
                SelectOption::new("customer", "Customer"),
            ]),
        ]
    }

    fn ownership() -> OwnershipConfig<Row> {
        OwnershipConfig::new("owner_id".to_owned(), "owner_name".to_owned())
            .claim_roles(&[Role::SalesRep])
            .assign_roles(&[Role::Manager, Role::Admin])
    }

    fn saving_view(outcome: Rc<RefCell<Result<(), String>>>) -> DetailView<Row> {
        DetailView::new(account(), fields(), Vec::new(), rep())
            .expect("valid descriptors")
            .with_actions(DetailActions::new().on_save(move |_: &Row| {
                outcome.borrow().clone().map_err(anyhow::Error::msg)
            }))
    }

    #[test]
    fn save_success_adopts_draft() {
        let mut view = saving_view(Rc::new(RefCell::new(Ok(()))));
        assert_eq!(view.begin_edit(), DetailStatus::Editing);
        assert_eq!(
            view.edit_field(0, "Acme Corp"),
            DetailStatus::FieldUpdated("Name".to_owned())
        );
        assert_eq!(view.save(), DetailStatus::Saved);
        assert!(!view.is_editing());
        assert_eq!(view.item().value("name"), Value::text("Acme Corp"));
    }

    #[test]
    fn save_failure_returns_to_viewing_with_item_unchanged() {
        let mut view = saving_view(Rc::new(RefCell::new(Err("backend down".to_owned()))));
        view.begin_edit();
        view.edit_field(0, "Acme Corp");
        assert_eq!(view.save(), DetailStatus::SaveFailed("backend down".to_owned()));
        assert!(!view.is_editing());
        assert_eq!(view.item().value("name"), Value::text("Acme"));
        assert_eq!(view.error(), Some("save failed: backend down"));
        assert_eq!(view.dismiss_error(), DetailStatus::ErrorDismissed);
        assert_eq!(view.error(), None);
    }

    #[test]
    fn cancel_discards_draft() {
        let mut view = saving_view(Rc::new(RefCell::new(Ok(()))));
        view.apply_command(DetailCommand::BeginEdit);
        view.apply_command(DetailCommand::EditField {
            index: 1,
            raw: "$2,000".to_owned(),
        });
        assert_eq!(view.shown().value("annual_revenue"), Value::Number(2_000.0));
        assert_eq!(view.apply_command(DetailCommand::CancelEdit), DetailStatus::EditCancelled);
        assert_eq!(view.shown().value("annual_revenue"), Value::Number(1_250_000.0));
    }

    #[test]
    fn read_only_fields_refuse_edits() {
        let mut view = saving_view(Rc::new(RefCell::new(Ok(()))));
        view.begin_edit();
        assert_eq!(view.edit_field(2, "99"), DetailStatus::FieldReadOnly("ID".to_owned()));
        let DetailStatus::FieldRejected { reason, .. } = view.edit_field(3, "vendor") else {
            panic!("unknown select option should be rejected");
        };
        assert!(reason.contains("prospect, customer"));
    }

    #[test]
    fn read_only_view_hides_edit() {
        let view = saving_view(Rc::new(RefCell::new(Ok(())))).read_only();
        assert!(!view.visible_actions().contains(&DetailAction::Edit));
    }

    #[test]
    fn viewing_renders_by_field_kind() {
        let view = saving_view(Rc::new(RefCell::new(Ok(()))));
        assert_eq!(
            view.display_value(1),
            FieldDisplay::Rendered(Rendered::Text("$1,250,000".to_owned()))
        );
        assert_eq!(view.display_value(3), FieldDisplay::Label("Prospect".to_owned()));
        assert_eq!(view.fields()[0].display_label(), "Name *");
        assert_eq!(view.input_text(1), "1250000");
    }

    #[test]
    fn dropdown_without_label_or_lookup_is_rejected() {
        let fields = vec![FieldDescriptor::<Row>::new(
            "type_id".to_owned(),
            "Type",
            FieldKind::Dropdown,
        )];
        let error = DetailView::new(Row::new().with("type_id", 3), fields, Vec::new(), rep())
            .err()
            .expect("missing resolver should fail");
        assert!(error.to_string().contains("lookup service"));
    }

    #[test]
    fn duplicate_tab_keys_are_rejected() {
        let service = Arc::new(|_: &Row| -> anyhow::Result<ServiceResult<Vec<Row>>> {
            Ok(ServiceResult::new(Vec::new()))
        });
        let tabs = vec![
            RelatedTab::new("notes", "Notes", EntityType::Note, service.clone()),
            RelatedTab::new("notes", "More notes", EntityType::Note, service),
        ];
        assert!(DetailView::new(account(), fields(), tabs, rep()).is_err());
    }

    #[test]
    fn claim_flips_owner_and_keeps_it_on_success() {
        let mut view = DetailView::new(account(), fields(), Vec::new(), rep())
            .expect("valid descriptors")
            .with_ownership(ownership())
            .with_actions(DetailActions::new().on_claim(|_: &Row, _: &CurrentUser| Ok(())));
        assert!(view.visible_actions().contains(&DetailAction::Claim));
        assert!(!view.visible_actions().contains(&DetailAction::Assign));

        assert_eq!(view.claim(), DetailStatus::Claimed);
        assert_eq!(view.item().value("owner_id"), Value::Number(7.0));
        assert_eq!(view.item().value("owner_name"), Value::text("Riley Rep"));
        assert!(!view.can_claim());
    }

    #[test]
    fn claim_failure_rolls_back_owner() {
        let observed = Rc::new(RefCell::new(Value::Null));
        let sink = Rc::clone(&observed);
        let mut view = DetailView::new(account(), fields(), Vec::new(), rep())
            .expect("valid descriptors")
            .with_ownership(ownership())
            .with_actions(DetailActions::new().on_claim(move |row: &Row, _: &CurrentUser| {
                *sink.borrow_mut() = row.value("owner_id");
                anyhow::bail!("already claimed by someone else")
            }));

        let status = view.claim();
        assert_eq!(
            status,
            DetailStatus::OwnershipFailed("already claimed by someone else".to_owned())
        );
        assert_eq!(*observed.borrow(), Value::Number(7.0));
        assert_eq!(view.item().value("owner_id"), Value::Null);
        assert_eq!(view.item().value("owner_name"), Value::text(""));
        assert!(view.can_claim());
    }

    #[test]
    fn assign_requires_assign_role() {
        let manager = CurrentUser::new(UserId::new(2), "Morgan", &[Role::Manager]);
        let target = User {
            id: UserId::new(9),
            display_name: "Sam".to_owned(),
            email: "sam@example.com".to_owned(),
            roles: [Role::SalesRep].into_iter().collect(),
            is_active: true,
        };
        let mut view = DetailView::new(account(), fields(), Vec::new(), manager)
            .expect("valid descriptors")
            .with_ownership(ownership())
            .with_actions(DetailActions::new().on_assign(|_: &Row, _: &User| Ok(())));
        assert!(view.can_assign());
        assert_eq!(view.assign(&target), DetailStatus::Assigned("Sam".to_owned()));
        assert_eq!(view.item().value("owner_id"), Value::Number(9.0));
    }

    #[test]
    fn adding_a_note_refreshes_note_tabs_only() -> anyhow::Result<()> {
        let note_fetches = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&note_fetches);
        let notes = Arc::new(move |_: &Row| -> anyhow::Result<ServiceResult<Vec<Row>>> {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(ServiceResult::new(vec![Row::new().with("id", 1).with("body", "hi")]))
        });
        let deals = Arc::new(|_: &Row| -> anyhow::Result<ServiceResult<Vec<Row>>> {
            Ok(ServiceResult::new(Vec::new()))
        });
        let tabs = vec![
            RelatedTab::new("deals", "Deals", EntityType::Deal, deals),
            RelatedTab::new("notes", "Notes", EntityType::Note, notes),
        ];
        let mut view = DetailView::new(account(), fields(), tabs, rep())?
            .with_actions(DetailActions::new().on_add_note(|_: &Row, _: &str| Ok(())));
        view.run_pending()?;
        assert_eq!(note_fetches.load(Ordering::SeqCst), 0);

        view.apply_command(DetailCommand::NextTab);
        view.run_pending()?;
        assert_eq!(note_fetches.load(Ordering::SeqCst), 1);

        view.apply_command(DetailCommand::PrevTab);
        view.apply_command(DetailCommand::NextTab);
        assert!(!view.has_pending_requests());

        assert_eq!(view.add_note("follow up"), DetailStatus::NoteAdded);
        assert_eq!(view.take_requests().len(), 1);
        Ok(())
    }

    #[test]
    fn attachment_failure_sets_inline_error() {
        let mut view = DetailView::new(account(), fields(), Vec::new(), rep())
            .expect("valid descriptors")
            .with_actions(DetailActions::new().on_add_attachment(
                |_: &Row, _: &AttachmentUpload| anyhow::bail!("file too large"),
            ));
        let upload = AttachmentUpload {
            file_name: "big.bin".to_owned(),
            mime_type: "application/octet-stream".to_owned(),
            data: vec![0; 4],
        };
        assert!(matches!(
            view.add_attachment(&upload),
            DetailStatus::ActionFailed { .. }
        ));
        assert_eq!(view.error(), Some("add attachment failed: file too large"));
    }

    #[test]
    fn field_kinds_parse_input() {
        assert_eq!(
            FieldKind::Number.parse_input("42.5", &[]).expect("number"),
            Value::Number(42.5)
        );
        assert_eq!(FieldKind::Text.parse_input("  ", &[]).expect("blank"), Value::Null);
        assert_eq!(
            FieldKind::Boolean.parse_input("Yes", &[]).expect("bool"),
            Value::Bool(true)
        );
        assert_eq!(
            FieldKind::Dropdown.parse_input("12", &[]).expect("id"),
            Value::Number(12.0)
        );
        assert!(FieldKind::Date.parse_input("not a date", &[]).is_err());
        assert!(FieldKind::Number.parse_input("12abc", &[]).is_err());
    }
}
