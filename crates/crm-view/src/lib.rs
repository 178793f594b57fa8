// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

pub mod detail;
pub mod dialogs;
pub mod keys;
pub mod render;
pub mod selection;
pub mod service;
pub mod table;
pub mod terminal;

pub use detail::{
    DetailAction, DetailActions, DetailCommand, DetailEvent, DetailRequest, DetailStatus,
    DetailView, FieldDescriptor, FieldDisplay, FieldKind, LookupRequest, OwnershipConfig,
    RelatedTab, SelectOption, TabRequest, TabState,
};
pub use dialogs::{AssignUserDialog, ColumnDialog, FilterBuilder, RowMenu, UsersRequest};
pub use selection::{HeaderCheck, Selection, SelectionChange};
pub use service::{DataService, LookupService, ServiceResult, UserDirectory};
pub use table::{
    Column, PAGE_SIZE, RowAction, RowActions, SortDirection, TableCommand, TableEvent,
    TableInput, TableProjection, TableStatus, TableView,
};
pub use terminal::{Console, ConsoleEvent, ConsoleFlow, run_console};
