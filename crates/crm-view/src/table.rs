// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

//! Generic table view over any [`Record`] type.
//!
//! The view owns presentation state only (search term, filters, sort,
//! column visibility and widths, page, cursor). Data and selection are
//! handed in on every call through [`TableInput`]; the projection is
//! recomputed from scratch each time, in a fixed order: base rows (the
//! caller's prefiltered slice when given), free-text search, field
//! filters, sort, page slice.

use anyhow::{Result, bail};
use crm_app::{
    CellFormat, ChipPalette, ColumnKind, DEFAULT_TRUNCATE_CHARS, FieldKey, FilterCategory,
    FilterConfig, FilterSet, FormatterRegistry, Record, RecordId, Rendered, User, Value,
    matches_search, truncate_label,
};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use time::OffsetDateTime;
use tracing::{debug, warn};

use crate::selection::{HeaderCheck, Selection, SelectionChange};

pub const PAGE_SIZE: usize = 10;
pub const MIN_COLUMN_WIDTH: u16 = 80;
pub const DEFAULT_COLUMN_WIDTH: u16 = 150;
pub const RESIZE_STEP: i32 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }

    pub const fn flipped(self) -> Self {
        match self {
            Self::Asc => Self::Desc,
            Self::Desc => Self::Asc,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortSpec<F> {
    pub field: F,
    pub direction: SortDirection,
}

#[derive(Debug, Clone)]
pub struct Column<F> {
    pub field: F,
    pub header: String,
    pub kind: ColumnKind,
    pub default_visible: bool,
    pub chips: Option<ChipPalette>,
    pub max_width: Option<u16>,
    pub clickable: bool,
    pub truncate_chars: usize,
}

impl<F: FieldKey> Column<F> {
    pub fn new(field: F, header: impl Into<String>) -> Self {
        Self {
            field,
            header: header.into(),
            kind: ColumnKind::Text,
            default_visible: true,
            chips: None,
            max_width: None,
            clickable: false,
            truncate_chars: DEFAULT_TRUNCATE_CHARS,
        }
    }

    pub fn kind(mut self, kind: ColumnKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn hidden(mut self) -> Self {
        self.default_visible = false;
        self
    }

    pub fn chips(mut self, palette: ChipPalette) -> Self {
        self.kind = ColumnKind::Chip;
        self.chips = Some(palette);
        self
    }

    pub fn max_width(mut self, width: u16) -> Self {
        self.max_width = Some(width);
        self
    }

    pub fn clickable(mut self) -> Self {
        self.clickable = true;
        self
    }

    pub fn truncate(mut self, chars: usize) -> Self {
        self.kind = ColumnKind::Truncated;
        self.truncate_chars = chars;
        self
    }

    pub fn cell_format(&self) -> CellFormat<'_> {
        CellFormat {
            kind: self.kind,
            chips: self.chips.as_ref(),
            truncate_chars: self.truncate_chars,
        }
    }

    pub fn filter_category(&self) -> FilterCategory {
        FilterCategory::for_column(self.field.name(), self.kind)
    }

    pub fn is_activatable(&self) -> bool {
        self.clickable || matches!(self.kind, ColumnKind::Link | ColumnKind::Clickable)
    }

    fn initial_width(&self) -> u16 {
        self.max_width
            .map_or(DEFAULT_COLUMN_WIDTH, |max| max.min(DEFAULT_COLUMN_WIDTH))
            .max(MIN_COLUMN_WIDTH)
    }
}

/// Everything the caller owns that a projection needs.
pub struct TableInput<'a, R> {
    pub data: &'a [R],
    pub prefiltered: Option<&'a [R]>,
    pub selection: &'a Selection,
}

impl<R> Clone for TableInput<'_, R> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<R> Copy for TableInput<'_, R> {}

impl<'a, R> TableInput<'a, R> {
    pub fn new(data: &'a [R], selection: &'a Selection) -> Self {
        Self {
            data,
            prefiltered: None,
            selection,
        }
    }

    /// Rows the caller already filtered server-side; `data` still counts
    /// as the total.
    pub fn with_prefiltered(mut self, rows: &'a [R]) -> Self {
        self.prefiltered = Some(rows);
        self
    }

    fn base(&self) -> &'a [R] {
        self.prefiltered.unwrap_or(self.data)
    }
}

#[derive(Debug)]
pub struct TableProjection<'a, R> {
    pub rows: Vec<&'a R>,
    pub filtered_ids: Vec<RecordId>,
    pub filtered_len: usize,
    pub total_len: usize,
    pub page: usize,
    pub page_count: usize,
    pub header: HeaderCheck,
}

impl<R> TableProjection<'_, R> {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TableCommand<F> {
    MoveRow(isize),
    MoveColumn(isize),
    JumpFirstRow,
    JumpLastRow,
    NextPage,
    PrevPage,
    FirstPage,
    LastPage,
    CycleSort,
    SortBy(F),
    ClearSort,
    SetSearch(String),
    ClearSearch,
    SetFilter { field: F, config: FilterConfig },
    ClearFilter(F),
    ClearFilters,
    ToggleColumn(F),
    HideCurrentColumn,
    ShowAllColumns,
    ResizeCurrentColumn(i32),
    ToggleRowSelection,
    ToggleSelectAll,
    ClearSelection,
    ActivateCell,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TableStatus {
    SortAsc(String),
    SortDesc(String),
    SortCleared,
    SortUnavailable,
    SearchSet(String),
    SearchCleared,
    FilterSet { column: String, display: String },
    FilterRejected(String),
    FilterCleared(String),
    FiltersCleared,
    ColumnHidden(String),
    ColumnShown(String),
    ColumnsShown,
    KeepOneColumnVisible,
    ColumnUnknown,
    ColumnResized { column: String, width: u16 },
    Page { page: usize, pages: usize },
    NoRows,
    NotClickable(String),
    ActionDone(RowAction),
    ActionFailed { action: RowAction, error: String },
    ActionUnavailable(RowAction),
}

impl TableStatus {
    pub fn message(&self) -> String {
        match self {
            Self::SortAsc(column) => format!("sort {column} asc"),
            Self::SortDesc(column) => format!("sort {column} desc"),
            Self::SortCleared => "sort cleared".to_owned(),
            Self::SortUnavailable => "sort unavailable".to_owned(),
            Self::SearchSet(term) => format!("search: {term}"),
            Self::SearchCleared => "search cleared".to_owned(),
            Self::FilterSet { column, display } => format!("filter {column}: {display}"),
            Self::FilterRejected(reason) => format!("filter rejected: {reason}"),
            Self::FilterCleared(column) => format!("filter cleared: {column}"),
            Self::FiltersCleared => "all filters cleared".to_owned(),
            Self::ColumnHidden(column) => format!("column hidden: {column}"),
            Self::ColumnShown(column) => format!("column shown: {column}"),
            Self::ColumnsShown => "all columns shown".to_owned(),
            Self::KeepOneColumnVisible => "keep one column visible".to_owned(),
            Self::ColumnUnknown => "no such column".to_owned(),
            Self::ColumnResized { column, width } => format!("{column} width {width}px"),
            Self::Page { page, pages } => format!("page {page}/{pages}"),
            Self::NoRows => "no rows".to_owned(),
            Self::NotClickable(column) => format!("{column} has no action"),
            Self::ActionDone(action) => format!("{} done", action.label().to_lowercase()),
            Self::ActionFailed { action, error } => {
                format!("{} failed: {error}", action.label().to_lowercase())
            }
            Self::ActionUnavailable(action) => {
                format!("{} unavailable", action.label().to_lowercase())
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TableEvent<F> {
    CursorUpdated,
    Status(TableStatus),
    Selection(SelectionChange),
    CellActivated { id: RecordId, field: F },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RowAction {
    View,
    Edit,
    Delete,
    AddNote,
    AddAttachment,
    Claim,
    Assign,
    Reactivate,
    PermanentDelete,
}

impl RowAction {
    pub const ALL: [Self; 9] = [
        Self::View,
        Self::Edit,
        Self::Delete,
        Self::AddNote,
        Self::AddAttachment,
        Self::Claim,
        Self::Assign,
        Self::Reactivate,
        Self::PermanentDelete,
    ];

    pub const fn label(self) -> &'static str {
        match self {
            Self::View => "View",
            Self::Edit => "Edit",
            Self::Delete => "Delete",
            Self::AddNote => "Add note",
            Self::AddAttachment => "Add attachment",
            Self::Claim => "Claim",
            Self::Assign => "Assign",
            Self::Reactivate => "Reactivate",
            Self::PermanentDelete => "Delete permanently",
        }
    }
}

pub type RowCallback<R> = Box<dyn FnMut(&R) -> Result<()>>;
pub type AssignCallback<R> = Box<dyn FnMut(&R, &User) -> Result<()>>;

/// Optional per-row callbacks; a missing callback hides its menu entry.
pub struct RowActions<R> {
    callbacks: BTreeMap<RowAction, RowCallback<R>>,
    assign: Option<AssignCallback<R>>,
}

impl<R> Default for RowActions<R> {
    fn default() -> Self {
        Self {
            callbacks: BTreeMap::new(),
            assign: None,
        }
    }
}

impl<R> RowActions<R> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a plain row callback. Assign takes a user and goes through
    /// [`RowActions::on_assign`] instead.
    pub fn on(mut self, action: RowAction, callback: impl FnMut(&R) -> Result<()> + 'static) -> Self {
        if action != RowAction::Assign {
            self.callbacks.insert(action, Box::new(callback));
        }
        self
    }

    pub fn on_assign(mut self, callback: impl FnMut(&R, &User) -> Result<()> + 'static) -> Self {
        self.assign = Some(Box::new(callback));
        self
    }

    pub fn available(&self) -> Vec<RowAction> {
        RowAction::ALL
            .into_iter()
            .filter(|action| self.has(*action))
            .collect()
    }

    pub fn has(&self, action: RowAction) -> bool {
        match action {
            RowAction::Assign => self.assign.is_some(),
            other => self.callbacks.contains_key(&other),
        }
    }

    pub fn run(&mut self, action: RowAction, row: &R) -> Result<()> {
        let Some(callback) = self.callbacks.get_mut(&action) else {
            bail!("{} has no handler on this table", action.label());
        };
        callback(row)
    }

    pub fn run_assign(&mut self, row: &R, user: &User) -> Result<()> {
        let Some(callback) = self.assign.as_mut() else {
            bail!("assign has no handler on this table");
        };
        callback(row, user)
    }
}

pub struct TableView<R: Record> {
    title: String,
    columns: Vec<Column<R::Field>>,
    id_field: R::Field,
    formatters: FormatterRegistry<R>,
    actions: RowActions<R>,
    search: String,
    filters: FilterSet<R::Field>,
    sort: Option<SortSpec<R::Field>>,
    visible: Vec<bool>,
    widths: Vec<u16>,
    page: usize,
    cursor_row: usize,
    cursor_col: usize,
}

impl<R: Record> TableView<R> {
    pub fn new(
        title: impl Into<String>,
        id_field: R::Field,
        columns: Vec<Column<R::Field>>,
    ) -> Self {
        let visible = columns.iter().map(|column| column.default_visible).collect();
        let widths = columns.iter().map(Column::initial_width).collect();
        let mut view = Self {
            title: title.into(),
            columns,
            id_field,
            formatters: FormatterRegistry::new(),
            actions: RowActions::new(),
            search: String::new(),
            filters: FilterSet::new(),
            sort: None,
            visible,
            widths,
            page: 0,
            cursor_row: 0,
            cursor_col: 0,
        };
        view.cursor_col = view.coerce_visible_column(0).unwrap_or(0);
        view
    }

    pub fn with_formatters(mut self, formatters: FormatterRegistry<R>) -> Self {
        self.formatters = formatters;
        self
    }

    pub fn with_actions(mut self, actions: RowActions<R>) -> Self {
        self.actions = actions;
        self
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn columns(&self) -> &[Column<R::Field>] {
        &self.columns
    }

    pub fn id_field(&self) -> &R::Field {
        &self.id_field
    }

    pub fn search(&self) -> &str {
        &self.search
    }

    pub fn filters(&self) -> &FilterSet<R::Field> {
        &self.filters
    }

    pub fn sort(&self) -> Option<&SortSpec<R::Field>> {
        self.sort.as_ref()
    }

    pub fn page(&self) -> usize {
        self.page
    }

    pub fn cursor_row(&self) -> usize {
        self.cursor_row
    }

    pub fn cursor_col(&self) -> usize {
        self.cursor_col
    }

    pub fn is_visible(&self, index: usize) -> bool {
        self.visible.get(index).copied().unwrap_or(false)
    }

    pub fn width(&self, index: usize) -> u16 {
        self.widths.get(index).copied().unwrap_or(MIN_COLUMN_WIDTH)
    }

    pub fn visible_columns(&self) -> Vec<usize> {
        (0..self.columns.len())
            .filter(|index| self.is_visible(*index))
            .collect()
    }

    pub fn row_actions(&self) -> Vec<RowAction> {
        self.actions.available()
    }

    pub fn column_index(&self, field: &R::Field) -> Option<usize> {
        self.columns.iter().position(|column| &column.field == field)
    }

    pub fn project<'a>(&self, input: TableInput<'a, R>) -> TableProjection<'a, R> {
        let fields: Vec<R::Field> = self
            .columns
            .iter()
            .map(|column| column.field.clone())
            .collect();
        let base = input.base();
        let mut rows: Vec<&'a R> = base
            .iter()
            .filter(|row| matches_search(*row, fields.iter(), &self.search))
            .filter(|row| self.filters.matches(*row))
            .collect();

        if let Some(sort) = &self.sort {
            rows.sort_by(|left, right| {
                compare_for_sort(&left.get(&sort.field), &right.get(&sort.field), sort.direction)
            });
        }

        let filtered_ids: Vec<RecordId> = rows
            .iter()
            .filter_map(|row| row.record_id(&self.id_field))
            .collect();
        let filtered_len = rows.len();
        let page_count = page_count(filtered_len);
        let page = self.page.min(page_count - 1);
        let selected = input.selection.count_within(filtered_ids.iter());

        TableProjection {
            rows: rows
                .into_iter()
                .skip(page * PAGE_SIZE)
                .take(PAGE_SIZE)
                .collect(),
            header: HeaderCheck::for_counts(selected, filtered_len),
            filtered_ids,
            filtered_len,
            total_len: input.data.len(),
            page,
            page_count,
        }
    }

    pub fn render_cell(&self, row: &R, index: usize) -> Rendered {
        let Some(column) = self.columns.get(index) else {
            return Rendered::Placeholder;
        };
        self.formatters.format(
            column.field.name(),
            &column.cell_format(),
            &row.get(&column.field),
            row,
        )
    }

    pub fn header_label(&self, index: usize) -> String {
        let Some(column) = self.columns.get(index) else {
            return String::new();
        };
        let mut label = column.header.clone();
        if self.filters.get(&column.field).is_some() {
            label.push_str(" ▼");
        }
        if let Some(sort) = &self.sort
            && sort.field == column.field
        {
            label.push_str(match sort.direction {
                SortDirection::Asc => " ↑",
                SortDirection::Desc => " ↓",
            });
        }
        label
    }

    pub fn title_text(&self, projection: &TableProjection<'_, R>, selection: &Selection) -> String {
        let mut parts = vec![format!(
            "{} r:{}/{} p:{}/{}",
            self.title,
            projection.filtered_len,
            projection.total_len,
            projection.page + 1,
            projection.page_count,
        )];
        if let Some(sort) = &self.sort {
            parts.push(format!(
                "sort {}:{}",
                self.header_for(&sort.field),
                sort.direction.as_str()
            ));
        }
        if !self.search.is_empty() {
            parts.push(format!("search \"{}\"", truncate_label(&self.search, 16)));
        }
        if !self.filters.is_empty() {
            parts.push(format!("filters {}", self.filters.len()));
        }
        let hidden = self.columns.len() - self.visible_columns().len();
        if hidden > 0 {
            parts.push(format!("hidden {hidden}"));
        }
        if !selection.is_empty() {
            parts.push(format!("sel {}", selection.len()));
        }
        parts.join(" | ")
    }

    /// `Header: display` for each active filter, in field order.
    pub fn active_filter_labels(&self) -> Vec<String> {
        self.filters
            .iter()
            .map(|(field, config)| format!("{}: {}", self.header_for(field), config.display_value))
            .collect()
    }

    /// Re-anchors page and cursor after the data underneath changed.
    pub fn clamp(&mut self, input: TableInput<'_, R>) {
        let projection = self.project(input);
        self.page = projection.page;
        self.cursor_row = self
            .cursor_row
            .min(projection.rows.len().saturating_sub(1));
        if self.visible_columns().is_empty() {
            self.visible = vec![true; self.columns.len()];
        }
        self.cursor_col = self.coerce_visible_column(self.cursor_col).unwrap_or(0);
    }

    pub fn apply(&mut self, input: TableInput<'_, R>, command: TableCommand<R::Field>) -> TableEvent<R::Field> {
        let event = match command {
            TableCommand::MoveRow(delta) => {
                self.move_row(input, delta);
                TableEvent::CursorUpdated
            }
            TableCommand::MoveColumn(delta) => {
                self.move_col(delta);
                TableEvent::CursorUpdated
            }
            TableCommand::JumpFirstRow => {
                self.page = 0;
                self.cursor_row = 0;
                TableEvent::CursorUpdated
            }
            TableCommand::JumpLastRow => {
                let filtered = self.project(input).filtered_len;
                self.seek_absolute(filtered.saturating_sub(1));
                TableEvent::CursorUpdated
            }
            TableCommand::NextPage => self.turn_page(input, |page, last| (page + 1).min(last)),
            TableCommand::PrevPage => self.turn_page(input, |page, _| page.saturating_sub(1)),
            TableCommand::FirstPage => self.turn_page(input, |_, _| 0),
            TableCommand::LastPage => self.turn_page(input, |_, last| last),
            TableCommand::CycleSort => match self.columns.get(self.cursor_col) {
                Some(column) => {
                    let field = column.field.clone();
                    TableEvent::Status(self.sort_by(field))
                }
                None => TableEvent::Status(TableStatus::SortUnavailable),
            },
            TableCommand::SortBy(field) => TableEvent::Status(self.sort_by(field)),
            TableCommand::ClearSort => {
                self.sort = None;
                TableEvent::Status(TableStatus::SortCleared)
            }
            TableCommand::SetSearch(term) => {
                if term.is_empty() {
                    self.search.clear();
                    self.reset_page();
                    TableEvent::Status(TableStatus::SearchCleared)
                } else {
                    self.search = term.clone();
                    self.reset_page();
                    TableEvent::Status(TableStatus::SearchSet(term))
                }
            }
            TableCommand::ClearSearch => {
                self.search.clear();
                self.reset_page();
                TableEvent::Status(TableStatus::SearchCleared)
            }
            TableCommand::SetFilter { field, config } => {
                TableEvent::Status(self.set_filter(field, config))
            }
            TableCommand::ClearFilter(field) => {
                let header = self.header_for(&field);
                self.filters.clear(&field);
                self.reset_page();
                TableEvent::Status(TableStatus::FilterCleared(header))
            }
            TableCommand::ClearFilters => {
                self.filters.clear_all();
                self.reset_page();
                TableEvent::Status(TableStatus::FiltersCleared)
            }
            TableCommand::ToggleColumn(field) => match self.column_index(&field) {
                Some(index) => TableEvent::Status(self.toggle_column(index)),
                None => TableEvent::Status(TableStatus::ColumnUnknown),
            },
            TableCommand::HideCurrentColumn => {
                if self.is_visible(self.cursor_col) {
                    TableEvent::Status(self.toggle_column(self.cursor_col))
                } else {
                    TableEvent::Status(TableStatus::ColumnUnknown)
                }
            }
            TableCommand::ShowAllColumns => {
                self.visible = vec![true; self.columns.len()];
                TableEvent::Status(TableStatus::ColumnsShown)
            }
            TableCommand::ResizeCurrentColumn(delta) => {
                TableEvent::Status(self.resize_column(self.cursor_col, delta))
            }
            TableCommand::ToggleRowSelection => {
                let projection = self.project(input);
                match projection
                    .rows
                    .get(self.cursor_row)
                    .and_then(|row| row.record_id(&self.id_field))
                {
                    Some(id) => TableEvent::Selection(SelectionChange::Toggle(id)),
                    None => TableEvent::Status(TableStatus::NoRows),
                }
            }
            TableCommand::ToggleSelectAll => {
                let projection = self.project(input);
                if projection.header == HeaderCheck::Checked {
                    TableEvent::Selection(SelectionChange::Clear)
                } else {
                    TableEvent::Selection(SelectionChange::SelectAll(projection.filtered_ids))
                }
            }
            TableCommand::ClearSelection => TableEvent::Selection(SelectionChange::Clear),
            TableCommand::ActivateCell => self.activate_cell(input),
        };
        self.clamp(input);
        event
    }

    pub fn run_row_action(&mut self, input: TableInput<'_, R>, action: RowAction) -> TableStatus {
        if !self.actions.has(action) || action == RowAction::Assign {
            return TableStatus::ActionUnavailable(action);
        }
        let projection = self.project(input);
        let Some(row) = projection.rows.get(self.cursor_row).copied() else {
            return TableStatus::NoRows;
        };
        match self.actions.run(action, row) {
            Ok(()) => TableStatus::ActionDone(action),
            Err(error) => {
                warn!(action = action.label(), error = %error, "row action failed");
                TableStatus::ActionFailed {
                    action,
                    error: error.to_string(),
                }
            }
        }
    }

    pub fn run_assign(&mut self, input: TableInput<'_, R>, user: &User) -> TableStatus {
        if !self.actions.has(RowAction::Assign) {
            return TableStatus::ActionUnavailable(RowAction::Assign);
        }
        let projection = self.project(input);
        let Some(row) = projection.rows.get(self.cursor_row).copied() else {
            return TableStatus::NoRows;
        };
        match self.actions.run_assign(row, user) {
            Ok(()) => TableStatus::ActionDone(RowAction::Assign),
            Err(error) => {
                warn!(user = %user.display_name, error = %error, "assign failed");
                TableStatus::ActionFailed {
                    action: RowAction::Assign,
                    error: error.to_string(),
                }
            }
        }
    }

    pub fn cursor_record<'a>(&self, input: TableInput<'a, R>) -> Option<&'a R> {
        self.project(input).rows.get(self.cursor_row).copied()
    }

    fn header_for(&self, field: &R::Field) -> String {
        self.column_index(field)
            .and_then(|index| self.columns.get(index))
            .map_or_else(|| field.name().to_owned(), |column| column.header.clone())
    }

    fn reset_page(&mut self) {
        self.page = 0;
        self.cursor_row = 0;
    }

    fn sort_by(&mut self, field: R::Field) -> TableStatus {
        let direction = match &self.sort {
            Some(current) if current.field == field => current.direction.flipped(),
            _ => SortDirection::Asc,
        };
        let header = self.header_for(&field);
        debug!(column = %header, direction = direction.as_str(), "sort changed");
        self.sort = Some(SortSpec { field, direction });
        match direction {
            SortDirection::Asc => TableStatus::SortAsc(header),
            SortDirection::Desc => TableStatus::SortDesc(header),
        }
    }

    fn set_filter(&mut self, field: R::Field, config: FilterConfig) -> TableStatus {
        let Some(index) = self.column_index(&field) else {
            return TableStatus::ColumnUnknown;
        };
        let category = self.columns[index].filter_category();
        let header = self.columns[index].header.clone();
        let display = config.display_value.clone();
        match self.filters.set(field, category, config) {
            Ok(()) => {
                self.reset_page();
                TableStatus::FilterSet {
                    column: header,
                    display,
                }
            }
            Err(error) => TableStatus::FilterRejected(error.to_string()),
        }
    }

    fn toggle_column(&mut self, index: usize) -> TableStatus {
        let Some(column) = self.columns.get(index) else {
            return TableStatus::ColumnUnknown;
        };
        let header = column.header.clone();
        if self.is_visible(index) {
            if self.visible_columns().len() <= 1 {
                return TableStatus::KeepOneColumnVisible;
            }
            self.visible[index] = false;
            TableStatus::ColumnHidden(header)
        } else {
            self.visible[index] = true;
            TableStatus::ColumnShown(header)
        }
    }

    fn resize_column(&mut self, index: usize, delta: i32) -> TableStatus {
        let Some(column) = self.columns.get(index) else {
            return TableStatus::ColumnUnknown;
        };
        let header = column.header.clone();
        let next = (i32::from(self.width(index)) + delta)
            .clamp(i32::from(MIN_COLUMN_WIDTH), i32::from(u16::MAX));
        let width = u16::try_from(next).unwrap_or(MIN_COLUMN_WIDTH);
        self.widths[index] = width;
        TableStatus::ColumnResized {
            column: header,
            width,
        }
    }

    fn activate_cell(&self, input: TableInput<'_, R>) -> TableEvent<R::Field> {
        let Some(column) = self.columns.get(self.cursor_col) else {
            return TableEvent::Status(TableStatus::ColumnUnknown);
        };
        if !column.is_activatable() {
            return TableEvent::Status(TableStatus::NotClickable(column.header.clone()));
        }
        let projection = self.project(input);
        match projection
            .rows
            .get(self.cursor_row)
            .and_then(|row| row.record_id(&self.id_field))
        {
            Some(id) => TableEvent::CellActivated {
                id,
                field: column.field.clone(),
            },
            None => TableEvent::Status(TableStatus::NoRows),
        }
    }

    fn turn_page(
        &mut self,
        input: TableInput<'_, R>,
        next: impl Fn(usize, usize) -> usize,
    ) -> TableEvent<R::Field> {
        let projection = self.project(input);
        let last = projection.page_count - 1;
        let page = next(projection.page, last);
        if page != projection.page {
            self.cursor_row = 0;
        }
        self.page = page;
        TableEvent::Status(TableStatus::Page {
            page: page + 1,
            pages: projection.page_count,
        })
    }

    fn move_row(&mut self, input: TableInput<'_, R>, delta: isize) {
        let projection = self.project(input);
        if projection.filtered_len == 0 {
            self.reset_page();
            return;
        }
        let current = projection.page * PAGE_SIZE + self.cursor_row;
        let next = if delta.is_negative() {
            current.saturating_sub(delta.unsigned_abs())
        } else {
            current.saturating_add(delta as usize)
        };
        self.seek_absolute(next.min(projection.filtered_len - 1));
    }

    fn seek_absolute(&mut self, index: usize) {
        self.page = index / PAGE_SIZE;
        self.cursor_row = index % PAGE_SIZE;
    }

    fn move_col(&mut self, delta: isize) {
        let visible = self.visible_columns();
        if visible.is_empty() {
            self.cursor_col = 0;
            return;
        }
        let current = self.coerce_visible_column(self.cursor_col).unwrap_or(visible[0]);
        let position = visible
            .iter()
            .position(|index| *index == current)
            .unwrap_or(0);
        let next = if delta.is_negative() {
            position.saturating_sub(delta.unsigned_abs())
        } else {
            position.saturating_add(delta as usize)
        };
        self.cursor_col = visible[next.min(visible.len() - 1)];
    }

    fn coerce_visible_column(&self, index: usize) -> Option<usize> {
        let visible = self.visible_columns();
        if visible.contains(&index) {
            return Some(index);
        }
        visible
            .iter()
            .copied()
            .find(|candidate| *candidate > index)
            .or_else(|| visible.last().copied())
    }
}

pub fn page_count(filtered_len: usize) -> usize {
    filtered_len.div_ceil(PAGE_SIZE).max(1)
}

/// Null values sort after everything else in either direction.
pub fn compare_for_sort(left: &Value, right: &Value, direction: SortDirection) -> Ordering {
    match (left.is_null(), right.is_null()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => {
            let order = compare_values(left, right);
            match direction {
                SortDirection::Asc => order,
                SortDirection::Desc => order.reverse(),
            }
        }
    }
}

fn compare_values(left: &Value, right: &Value) -> Ordering {
    match (left, right) {
        (Value::Number(left), Value::Number(right)) => left.total_cmp(right),
        (Value::Bool(left), Value::Bool(right)) => left.cmp(right),
        (Value::Text(left), Value::Text(right)) => compare_text(left, right),
        _ => match (temporal(left), temporal(right)) {
            (Some(left), Some(right)) => left.cmp(&right),
            _ => compare_text(&left.search_text(), &right.search_text()),
        },
    }
}

fn temporal(value: &Value) -> Option<OffsetDateTime> {
    match value {
        Value::Date(_) | Value::DateTime(_) => value.as_datetime(),
        _ => None,
    }
}

fn compare_text(left: &str, right: &str) -> Ordering {
    left.to_lowercase().cmp(&right.to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::{
        Column, PAGE_SIZE, RowAction, RowActions, SortDirection, TableCommand, TableEvent,
        TableInput, TableStatus, TableView, page_count,
    };
    use crate::selection::{HeaderCheck, Selection, SelectionChange};
    use crm_app::{
        ChipColor, ChipPalette, ColumnKind, FilterConfig, FilterRule, RecordId, Rendered, Row,
    };
    use std::cell::RefCell;
    use std::rc::Rc;

    fn field(name: &str) -> String {
        name.to_owned()
    }

    fn deals_table() -> TableView<Row> {
        TableView::new(
            "deals",
            field("id"),
            vec![
                Column::new(field("id"), "ID"),
                Column::new(field("name"), "Name"),
                Column::new(field("amount"), "Amount").kind(ColumnKind::Currency),
                Column::new(field("stage"), "Stage").chips(
                    ChipPalette::new().entry("won", "Won", ChipColor::Success),
                ),
                Column::new(field("notes"), "Notes").hidden(),
            ],
        )
    }

    fn deal(id: i64, name: &str, amount: Option<f64>, notes: &str) -> Row {
        Row::new()
            .with("id", id)
            .with("name", name)
            .with("amount", amount)
            .with("stage", "open")
            .with("notes", notes)
    }

    fn many_deals(count: i64) -> Vec<Row> {
        (1..=count)
            .map(|id| deal(id, &format!("Deal {id:02}"), Some(id as f64 * 100.0), ""))
            .collect()
    }

    fn ids(rows: &[&Row]) -> Vec<i64> {
        rows.iter()
            .filter_map(|row| row.value("id").as_i64())
            .collect()
    }

    #[test]
    fn nulls_sort_last_in_both_directions() {
        let data = vec![
            deal(1, "High", Some(900.0), ""),
            deal(2, "Missing", None, ""),
            deal(3, "Low", Some(100.0), ""),
        ];
        let selection = Selection::new();
        let input = TableInput::new(&data, &selection);
        let mut view = deals_table();

        view.apply(input, TableCommand::SortBy(field("amount")));
        assert_eq!(ids(&view.project(input).rows), vec![3, 1, 2]);

        let event = view.apply(input, TableCommand::SortBy(field("amount")));
        assert_eq!(
            event,
            TableEvent::Status(TableStatus::SortDesc("Amount".to_owned()))
        );
        assert_eq!(ids(&view.project(input).rows), vec![1, 3, 2]);
    }

    #[test]
    fn new_sort_column_resets_to_ascending() {
        let data = many_deals(3);
        let selection = Selection::new();
        let input = TableInput::new(&data, &selection);
        let mut view = deals_table();
        view.apply(input, TableCommand::SortBy(field("amount")));
        view.apply(input, TableCommand::SortBy(field("amount")));
        let event = view.apply(input, TableCommand::SortBy(field("name")));
        assert_eq!(
            event,
            TableEvent::Status(TableStatus::SortAsc("Name".to_owned()))
        );
    }

    #[test]
    fn text_sort_ignores_case() {
        let data = vec![
            deal(1, "charlie", None, ""),
            deal(2, "Alice", None, ""),
            deal(3, "bob", None, ""),
        ];
        let selection = Selection::new();
        let input = TableInput::new(&data, &selection);
        let mut view = deals_table();
        view.apply(input, TableCommand::SortBy(field("name")));
        assert_eq!(ids(&view.project(input).rows), vec![2, 3, 1]);
    }

    #[test]
    fn hidden_columns_stay_searchable() {
        let data = vec![deal(1, "Acme", None, "renewal pending"), deal(2, "Globex", None, "")];
        let selection = Selection::new();
        let input = TableInput::new(&data, &selection);
        let mut view = deals_table();
        assert!(!view.is_visible(4));

        view.apply(input, TableCommand::SetSearch("RENEWAL".to_owned()));
        assert_eq!(ids(&view.project(input).rows), vec![1]);
    }

    #[test]
    fn search_runs_before_filters_on_prefiltered_rows() -> anyhow::Result<()> {
        let data = many_deals(12);
        let prefiltered: Vec<Row> = data.iter().skip(5).cloned().collect();
        let selection = Selection::new();
        let input = TableInput::new(&data, &selection).with_prefiltered(&prefiltered);
        let mut view = deals_table();

        view.apply(input, TableCommand::SetSearch("deal 0".to_owned()));
        view.apply(
            input,
            TableCommand::SetFilter {
                field: field("amount"),
                config: FilterConfig::new(FilterRule::Min {
                    value: "800".to_owned(),
                }),
            },
        );
        let projection = view.project(input);
        assert_eq!(ids(&projection.rows), vec![8, 9]);
        assert_eq!(projection.total_len, 12);
        assert_eq!(projection.filtered_len, 2);
        Ok(())
    }

    #[test]
    fn pagination_slices_ten_rows_and_resets_on_search() {
        let data = many_deals(25);
        let selection = Selection::new();
        let input = TableInput::new(&data, &selection);
        let mut view = deals_table();

        let projection = view.project(input);
        assert_eq!(projection.rows.len(), PAGE_SIZE);
        assert_eq!(projection.page_count, 3);

        view.apply(input, TableCommand::LastPage);
        let last = view.project(input);
        assert_eq!(ids(&last.rows), vec![21, 22, 23, 24, 25]);

        view.apply(input, TableCommand::SetSearch("Deal 2".to_owned()));
        assert_eq!(view.page(), 0);
        assert_eq!(view.project(input).filtered_len, 6);
    }

    #[test]
    fn page_is_clamped_when_data_shrinks() {
        let data = many_deals(25);
        let selection = Selection::new();
        let mut view = deals_table();
        view.apply(TableInput::new(&data, &selection), TableCommand::LastPage);
        assert_eq!(view.page(), 2);

        let shrunk = many_deals(4);
        let input = TableInput::new(&shrunk, &selection);
        assert_eq!(view.project(input).page, 0);
        view.clamp(input);
        assert_eq!(view.page(), 0);
        assert_eq!(ids(&view.project(input).rows), vec![1, 2, 3, 4]);
    }

    #[test]
    fn row_moves_cross_page_boundaries() {
        let data = many_deals(15);
        let selection = Selection::new();
        let input = TableInput::new(&data, &selection);
        let mut view = deals_table();
        view.apply(input, TableCommand::MoveRow(11));
        assert_eq!((view.page(), view.cursor_row()), (1, 1));
        view.apply(input, TableCommand::MoveRow(100));
        assert_eq!((view.page(), view.cursor_row()), (1, 4));
        view.apply(input, TableCommand::JumpFirstRow);
        assert_eq!((view.page(), view.cursor_row()), (0, 0));
    }

    #[test]
    fn select_all_targets_filtered_rows() {
        let data = many_deals(10);
        let mut selection = Selection::new();
        let mut view = deals_table();
        view.apply(
            TableInput::new(&data, &selection),
            TableCommand::SetFilter {
                field: field("amount"),
                config: FilterConfig::new(FilterRule::Min {
                    value: "800".to_owned(),
                }),
            },
        );

        let TableEvent::Selection(change) = view.apply(
            TableInput::new(&data, &selection),
            TableCommand::ToggleSelectAll,
        ) else {
            panic!("select all should produce a selection change");
        };
        selection.apply(change);
        assert_eq!(selection.len(), 3);
        assert_eq!(
            view.project(TableInput::new(&data, &selection)).header,
            HeaderCheck::Checked
        );

        selection.apply(SelectionChange::Toggle(RecordId::Int(9)));
        assert_eq!(selection.len(), 2);
        assert_eq!(
            view.project(TableInput::new(&data, &selection)).header,
            HeaderCheck::Indeterminate
        );

        selection.apply(SelectionChange::Clear);
        assert!(selection.is_empty());
    }

    #[test]
    fn toggling_header_checkbox_when_checked_clears() {
        let data = many_deals(2);
        let selection: Selection = [RecordId::Int(1), RecordId::Int(2)].into_iter().collect();
        let mut view = deals_table();
        let event = view.apply(
            TableInput::new(&data, &selection),
            TableCommand::ToggleSelectAll,
        );
        assert_eq!(event, TableEvent::Selection(SelectionChange::Clear));
    }

    #[test]
    fn visibility_round_trip_restores_position() {
        let data = many_deals(1);
        let selection = Selection::new();
        let input = TableInput::new(&data, &selection);
        let mut view = deals_table();
        let before = view.visible_columns();

        view.apply(input, TableCommand::ToggleColumn(field("name")));
        assert_eq!(view.visible_columns(), vec![0, 2, 3]);
        view.apply(input, TableCommand::ToggleColumn(field("name")));
        assert_eq!(view.visible_columns(), before);
    }

    #[test]
    fn last_visible_column_cannot_be_hidden() {
        let data = many_deals(1);
        let selection = Selection::new();
        let input = TableInput::new(&data, &selection);
        let mut view = TableView::new("one", field("id"), vec![Column::new(field("id"), "ID")]);
        let event = view.apply(input, TableCommand::HideCurrentColumn);
        assert_eq!(event, TableEvent::Status(TableStatus::KeepOneColumnVisible));
    }

    #[test]
    fn column_width_has_a_floor() {
        let data = many_deals(1);
        let selection = Selection::new();
        let input = TableInput::new(&data, &selection);
        let mut view = deals_table();
        view.apply(input, TableCommand::ResizeCurrentColumn(-500));
        assert_eq!(view.width(0), 80);
        view.apply(input, TableCommand::ResizeCurrentColumn(25));
        assert_eq!(view.width(0), 105);
    }

    #[test]
    fn filter_with_wrong_operator_is_rejected() {
        let data = many_deals(3);
        let selection = Selection::new();
        let input = TableInput::new(&data, &selection);
        let mut view = deals_table();
        let event = view.apply(
            input,
            TableCommand::SetFilter {
                field: field("name"),
                config: FilterConfig::new(FilterRule::Min {
                    value: "3".to_owned(),
                }),
            },
        );
        assert!(matches!(
            event,
            TableEvent::Status(TableStatus::FilterRejected(_))
        ));
        assert!(view.filters().is_empty());
    }

    #[test]
    fn title_summarizes_state() {
        let data = many_deals(12);
        let mut selection = Selection::new();
        selection.toggle(RecordId::Int(1));
        let input = TableInput::new(&data, &selection);
        let mut view = deals_table();
        view.apply(input, TableCommand::SortBy(field("amount")));
        view.apply(
            input,
            TableCommand::SetFilter {
                field: field("amount"),
                config: FilterConfig::new(FilterRule::Max {
                    value: "1100".to_owned(),
                }),
            },
        );

        let projection = view.project(input);
        let title = view.title_text(&projection, &selection);
        assert!(title.starts_with("deals r:11/12 p:1/2"));
        assert!(title.contains("sort Amount:asc"));
        assert!(title.contains("filters 1"));
        assert!(title.contains("hidden 1"));
        assert!(title.contains("sel 1"));
        assert_eq!(view.active_filter_labels(), vec!["Amount: ≤ 1100".to_owned()]);
        assert_eq!(view.header_label(2), "Amount ▼ ↑");
    }

    #[test]
    fn cells_render_through_column_kind() {
        let data = vec![deal(1, "Acme", Some(1234.5), "")];
        let view = deals_table();
        assert_eq!(
            view.render_cell(&data[0], 2),
            Rendered::Text("$1,234.5".to_owned())
        );
        let Rendered::Chip(style) = view.render_cell(&data[0], 3) else {
            panic!("stage renders as a chip");
        };
        assert_eq!(style.label, "open");
        assert_eq!(style.color, ChipColor::Neutral);
    }

    #[test]
    fn missing_callbacks_hide_menu_entries() {
        let deleted = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&deleted);
        let actions = RowActions::new()
            .on(RowAction::View, |_: &Row| Ok(()))
            .on(RowAction::Delete, move |row: &Row| {
                sink.borrow_mut().push(row.value("id"));
                Ok(())
            });
        let data = many_deals(2);
        let selection = Selection::new();
        let input = TableInput::new(&data, &selection);
        let mut view = deals_table().with_actions(actions);

        assert_eq!(view.row_actions(), vec![RowAction::View, RowAction::Delete]);
        assert_eq!(
            view.run_row_action(input, RowAction::Edit),
            TableStatus::ActionUnavailable(RowAction::Edit)
        );

        view.apply(input, TableCommand::MoveRow(1));
        assert_eq!(
            view.run_row_action(input, RowAction::Delete),
            TableStatus::ActionDone(RowAction::Delete)
        );
        assert_eq!(deleted.borrow().len(), 1);
        assert_eq!(deleted.borrow()[0].as_i64(), Some(2));
    }

    #[test]
    fn failing_callback_reports_error() {
        let actions =
            RowActions::new().on(RowAction::Reactivate, |_: &Row| anyhow::bail!("backend said no"));
        let data = many_deals(1);
        let selection = Selection::new();
        let mut view = deals_table().with_actions(actions);
        let status = view.run_row_action(TableInput::new(&data, &selection), RowAction::Reactivate);
        assert_eq!(status.message(), "reactivate failed: backend said no");
    }

    #[test]
    fn activation_requires_clickable_column() {
        let data = many_deals(1);
        let selection = Selection::new();
        let input = TableInput::new(&data, &selection);
        let mut view = TableView::new(
            "deals",
            field("id"),
            vec![
                Column::new(field("name"), "Name").clickable(),
                Column::new(field("amount"), "Amount"),
            ],
        );
        assert_eq!(
            view.apply(input, TableCommand::ActivateCell),
            TableEvent::CellActivated {
                id: RecordId::Int(1),
                field: field("name"),
            }
        );
        view.apply(input, TableCommand::MoveColumn(1));
        assert_eq!(
            view.apply(input, TableCommand::ActivateCell),
            TableEvent::Status(TableStatus::NotClickable("Amount".to_owned()))
        );
    }

    #[test]
    fn page_count_never_drops_below_one() {
        assert_eq!(page_count(0), 1);
        assert_eq!(page_count(10), 1);
        assert_eq!(page_count(11), 2);
        assert_eq!(SortDirection::Asc.flipped(), SortDirection::Desc);
    }
}
