// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

//! Modal dialogs layered over a table or detail view.

use anyhow::Result;
use crm_app::{
    FieldKey, FilterCategory, FilterConfig, FilterOperator, FilterRule, Record, User,
};
use tracing::debug;

use crate::service::{ServiceResult, UserDirectory};
use crate::table::{RowAction, TableCommand, TableView};

/// Checklist of every column with its visibility.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ColumnDialog {
    pub cursor: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnEntry {
    pub header: String,
    pub visible: bool,
}

impl ColumnDialog {
    pub fn entries<R: Record>(&self, table: &TableView<R>) -> Vec<ColumnEntry> {
        table
            .columns()
            .iter()
            .enumerate()
            .map(|(index, column)| ColumnEntry {
                header: column.header.clone(),
                visible: table.is_visible(index),
            })
            .collect()
    }

    pub fn move_cursor(&mut self, delta: isize, len: usize) {
        if len == 0 {
            self.cursor = 0;
            return;
        }
        let next = self.cursor.saturating_add_signed(delta);
        self.cursor = next.min(len - 1);
    }

    /// Command that flips the column under the cursor.
    pub fn toggle_command<R: Record>(&self, table: &TableView<R>) -> Option<TableCommand<R::Field>> {
        table
            .columns()
            .get(self.cursor)
            .map(|column| TableCommand::ToggleColumn(column.field.clone()))
    }
}

/// Overflow menu listing the row actions the table has callbacks for.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RowMenu {
    pub actions: Vec<RowAction>,
    pub cursor: usize,
}

impl RowMenu {
    pub fn new(actions: Vec<RowAction>) -> Self {
        Self { actions, cursor: 0 }
    }

    pub fn move_cursor(&mut self, delta: isize) {
        if self.actions.is_empty() {
            self.cursor = 0;
            return;
        }
        self.cursor = self
            .cursor
            .saturating_add_signed(delta)
            .min(self.actions.len() - 1);
    }

    pub fn selected(&self) -> Option<RowAction> {
        self.actions.get(self.cursor).copied()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterInput {
    First,
    Second,
}

/// Operator picker plus one or two value inputs for a single column.
#[derive(Debug, Clone)]
pub struct FilterBuilder<F> {
    pub field: F,
    pub header: String,
    pub category: FilterCategory,
    operator_index: usize,
    pub first: String,
    pub second: String,
    pub focus: FilterInput,
}

impl<F: FieldKey> FilterBuilder<F> {
    /// Opens for the column under the table cursor, seeded from its active
    /// filter when there is one.
    pub fn for_cursor<R: Record<Field = F>>(table: &TableView<R>) -> Option<Self> {
        let column = table.columns().get(table.cursor_col())?;
        let category = column.filter_category();
        let mut builder = Self {
            field: column.field.clone(),
            header: column.header.clone(),
            category,
            operator_index: 0,
            first: String::new(),
            second: String::new(),
            focus: FilterInput::First,
        };
        if let Some(active) = table.filters().get(&column.field) {
            builder.seed(&active.rule);
        }
        Some(builder)
    }

    fn seed(&mut self, rule: &FilterRule) {
        let operator = rule.operator();
        if let Some(index) = self.category.operators().iter().position(|op| *op == operator) {
            self.operator_index = index;
        }
        match rule {
            FilterRule::Range { min, max } => {
                self.first = min.clone();
                self.second = max.clone();
            }
            FilterRule::DateRange { start, end } => {
                self.first = start.clone();
                self.second = end.clone();
            }
            FilterRule::Contains { value }
            | FilterRule::Equals { value }
            | FilterRule::Min { value }
            | FilterRule::Max { value }
            | FilterRule::After { value }
            | FilterRule::Before { value }
            | FilterRule::On { value } => self.first = value.clone(),
        }
    }

    pub fn operator(&self) -> FilterOperator {
        self.category
            .operators()
            .get(self.operator_index)
            .copied()
            .unwrap_or_else(|| self.category.default_operator())
    }

    pub fn cycle_operator(&mut self) {
        let count = self.category.operators().len().max(1);
        self.operator_index = (self.operator_index + 1) % count;
        if !self.operator().is_ranged() {
            self.focus = FilterInput::First;
            self.second.clear();
        }
    }

    pub fn switch_input(&mut self) {
        if self.operator().is_ranged() {
            self.focus = match self.focus {
                FilterInput::First => FilterInput::Second,
                FilterInput::Second => FilterInput::First,
            };
        }
    }

    pub fn push_char(&mut self, ch: char) {
        self.focused_mut().push(ch);
    }

    pub fn backspace(&mut self) {
        self.focused_mut().pop();
    }

    fn focused_mut(&mut self) -> &mut String {
        match self.focus {
            FilterInput::First => &mut self.first,
            FilterInput::Second => &mut self.second,
        }
    }

    pub fn build(&self) -> FilterConfig {
        let rule = match self.operator() {
            FilterOperator::Range => FilterRule::Range {
                min: self.first.trim().to_owned(),
                max: self.second.trim().to_owned(),
            },
            FilterOperator::DateRange => FilterRule::DateRange {
                start: self.first.trim().to_owned(),
                end: self.second.trim().to_owned(),
            },
            operator => FilterRule::single(operator, self.first.trim()),
        };
        FilterConfig::new(rule)
    }

    pub fn into_command(self) -> TableCommand<F> {
        let config = self.build();
        TableCommand::SetFilter {
            field: self.field,
            config,
        }
    }
}

/// Token for one user-list fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UsersRequest {
    pub generation: u64,
}

/// Picks an owner from the active users in the directory.
///
/// Results arrive through [`AssignUserDialog::apply`]; anything tagged with
/// an older generation, or arriving after the dialog closed, is dropped.
#[derive(Debug, Default)]
pub struct AssignUserDialog {
    generation: u64,
    mounted: bool,
    loading: bool,
    users: Vec<User>,
    error: Option<String>,
    cursor: usize,
}

impl AssignUserDialog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn open(&mut self) -> UsersRequest {
        self.generation += 1;
        self.mounted = true;
        self.loading = true;
        self.users.clear();
        self.error = None;
        self.cursor = 0;
        UsersRequest {
            generation: self.generation,
        }
    }

    pub fn close(&mut self) {
        self.mounted = false;
        self.loading = false;
    }

    pub fn is_open(&self) -> bool {
        self.mounted
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn users(&self) -> &[User] {
        &self.users
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn fetch(directory: &dyn UserDirectory) -> Result<ServiceResult<Vec<User>>> {
        directory.list_users()
    }

    /// Returns whether the result was accepted.
    pub fn apply(&mut self, generation: u64, result: Result<ServiceResult<Vec<User>>>) -> bool {
        if !self.mounted || generation != self.generation {
            debug!(generation, current = self.generation, "dropping stale user list");
            return false;
        }
        self.loading = false;
        match result {
            Ok(result) => {
                self.users = result
                    .into_data()
                    .into_iter()
                    .filter(|user| user.is_active)
                    .collect();
                self.error = None;
            }
            Err(error) => {
                self.users.clear();
                self.error = Some(error.to_string());
            }
        }
        self.cursor = 0;
        true
    }

    pub fn move_cursor(&mut self, delta: isize) {
        if self.users.is_empty() {
            self.cursor = 0;
            return;
        }
        self.cursor = self
            .cursor
            .saturating_add_signed(delta)
            .min(self.users.len() - 1);
    }

    pub fn selected(&self) -> Option<&User> {
        self.users.get(self.cursor)
    }
}
