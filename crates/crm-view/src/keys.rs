// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use crate::detail::DetailCommand;
use crate::table::{RESIZE_STEP, TableCommand};

pub fn table_command_for_key<F>(key: KeyEvent) -> Option<TableCommand<F>> {
    match (key.code, key.modifiers) {
        (KeyCode::Char('j'), _) | (KeyCode::Down, _) => Some(TableCommand::MoveRow(1)),
        (KeyCode::Char('k'), _) | (KeyCode::Up, _) => Some(TableCommand::MoveRow(-1)),
        (KeyCode::Char('h'), _) | (KeyCode::Left, _) => Some(TableCommand::MoveColumn(-1)),
        (KeyCode::Char('l'), _) | (KeyCode::Right, _) => Some(TableCommand::MoveColumn(1)),
        (KeyCode::Char('g'), _) => Some(TableCommand::JumpFirstRow),
        (KeyCode::Char('G'), _) => Some(TableCommand::JumpLastRow),
        (KeyCode::PageDown, _) | (KeyCode::Char(']'), _) => Some(TableCommand::NextPage),
        (KeyCode::PageUp, _) | (KeyCode::Char('['), _) => Some(TableCommand::PrevPage),
        (KeyCode::Home, _) => Some(TableCommand::FirstPage),
        (KeyCode::End, _) => Some(TableCommand::LastPage),
        (KeyCode::Char('s'), KeyModifiers::NONE) => Some(TableCommand::CycleSort),
        (KeyCode::Char('S'), _) => Some(TableCommand::ClearSort),
        (KeyCode::Char('c'), KeyModifiers::NONE) => Some(TableCommand::HideCurrentColumn),
        (KeyCode::Char('C'), _) => Some(TableCommand::ShowAllColumns),
        (KeyCode::Char('<'), _) => Some(TableCommand::ResizeCurrentColumn(-RESIZE_STEP)),
        (KeyCode::Char('>'), _) => Some(TableCommand::ResizeCurrentColumn(RESIZE_STEP)),
        (KeyCode::Char(' '), _) => Some(TableCommand::ToggleRowSelection),
        (KeyCode::Char('a'), KeyModifiers::NONE) => Some(TableCommand::ToggleSelectAll),
        (KeyCode::Char('A'), _) => Some(TableCommand::ClearSelection),
        (KeyCode::Char('F'), _) => Some(TableCommand::ClearFilters),
        (KeyCode::Enter, _) => Some(TableCommand::ActivateCell),
        _ => None,
    }
}

/// Keys of a detail page while viewing. Arrow keys and paging drive the
/// active related tab's table.
pub fn detail_command_for_key(key: KeyEvent) -> Option<DetailCommand> {
    match (key.code, key.modifiers) {
        (KeyCode::Char('s'), modifiers) if modifiers.contains(KeyModifiers::CONTROL) => {
            Some(DetailCommand::Save)
        }
        (KeyCode::Tab, _) => Some(DetailCommand::NextTab),
        (KeyCode::BackTab, _) => Some(DetailCommand::PrevTab),
        (KeyCode::Char('j'), KeyModifiers::NONE) => Some(DetailCommand::NextField),
        (KeyCode::Char('k'), KeyModifiers::NONE) => Some(DetailCommand::PrevField),
        (KeyCode::Char('e'), KeyModifiers::NONE) => Some(DetailCommand::BeginEdit),
        (KeyCode::Char('d'), KeyModifiers::NONE) => Some(DetailCommand::Delete),
        (KeyCode::Char('o'), KeyModifiers::NONE) => Some(DetailCommand::Claim),
        (KeyCode::Char('r'), KeyModifiers::NONE) => Some(DetailCommand::RefreshTab),
        (KeyCode::Char('x'), KeyModifiers::NONE) => Some(DetailCommand::DismissError),
        (KeyCode::Down, _) => Some(DetailCommand::Tab(TableCommand::MoveRow(1))),
        (KeyCode::Up, _) => Some(DetailCommand::Tab(TableCommand::MoveRow(-1))),
        (KeyCode::Left, _) => Some(DetailCommand::Tab(TableCommand::MoveColumn(-1))),
        (KeyCode::Right, _) => Some(DetailCommand::Tab(TableCommand::MoveColumn(1))),
        (KeyCode::Char(']'), _) | (KeyCode::PageDown, _) => {
            Some(DetailCommand::Tab(TableCommand::NextPage))
        }
        (KeyCode::Char('['), _) | (KeyCode::PageUp, _) => {
            Some(DetailCommand::Tab(TableCommand::PrevPage))
        }
        (KeyCode::Char(' '), _) => Some(DetailCommand::Tab(TableCommand::ToggleRowSelection)),
        (KeyCode::Char('a'), KeyModifiers::NONE) => {
            Some(DetailCommand::Tab(TableCommand::ToggleSelectAll))
        }
        _ => None,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextInput {
    Edited,
    Submit,
    Cancel,
    Ignored,
}

/// Single-line text entry shared by the search prompt, field editor and
/// filter builder.
pub fn apply_text_key(buffer: &mut String, key: KeyEvent) -> TextInput {
    match key.code {
        KeyCode::Enter => TextInput::Submit,
        KeyCode::Esc => TextInput::Cancel,
        KeyCode::Backspace => {
            buffer.pop();
            TextInput::Edited
        }
        KeyCode::Char('u') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            buffer.clear();
            TextInput::Edited
        }
        KeyCode::Char(ch) if !key.modifiers.contains(KeyModifiers::CONTROL) => {
            buffer.push(ch);
            TextInput::Edited
        }
        _ => TextInput::Ignored,
    }
}
