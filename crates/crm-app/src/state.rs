// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PageKind {
    Accounts,
    Contacts,
    Deals,
    Activities,
    ActivityTypes,
}

impl PageKind {
    pub const ALL: [Self; 5] = [
        Self::Accounts,
        Self::Contacts,
        Self::Deals,
        Self::Activities,
        Self::ActivityTypes,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Accounts => "accounts",
            Self::Contacts => "contacts",
            Self::Deals => "deals",
            Self::Activities => "activities",
            Self::ActivityTypes => "activity_types",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim() {
            "accounts" => Some(Self::Accounts),
            "contacts" => Some(Self::Contacts),
            "deals" => Some(Self::Deals),
            "activities" => Some(Self::Activities),
            "activity_types" => Some(Self::ActivityTypes),
            _ => None,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Accounts => "Accounts",
            Self::Contacts => "Contacts",
            Self::Deals => "Deals",
            Self::Activities => "Activities",
            Self::ActivityTypes => "Activity Types",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewMode {
    List,
    Detail,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppState {
    pub mode: ViewMode,
    pub active_page: PageKind,
    pub status_line: Option<String>,
}

impl Default for AppState {
    fn default() -> Self {
        Self::starting_at(PageKind::Accounts)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppCommand {
    NextPage,
    PrevPage,
    GoTo(PageKind),
    OpenDetail,
    CloseDetail,
    ClearStatus,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppEvent {
    ModeChanged(ViewMode),
    PageChanged(PageKind),
    StatusUpdated(String),
    StatusCleared,
}

impl AppState {
    pub fn starting_at(page: PageKind) -> Self {
        Self {
            mode: ViewMode::List,
            active_page: page,
            status_line: None,
        }
    }

    pub fn dispatch(&mut self, command: AppCommand) -> Vec<AppEvent> {
        match command {
            AppCommand::NextPage => self.rotate_page(1),
            AppCommand::PrevPage => self.rotate_page(-1),
            AppCommand::GoTo(page) => {
                if page == self.active_page && self.mode == ViewMode::List {
                    return Vec::new();
                }
                self.switch_to(page)
            }
            AppCommand::OpenDetail => {
                if self.mode == ViewMode::Detail {
                    return Vec::new();
                }
                self.mode = ViewMode::Detail;
                vec![AppEvent::ModeChanged(self.mode)]
            }
            AppCommand::CloseDetail => {
                if self.mode == ViewMode::List {
                    return Vec::new();
                }
                self.mode = ViewMode::List;
                vec![AppEvent::ModeChanged(self.mode)]
            }
            AppCommand::ClearStatus => {
                self.status_line = None;
                vec![AppEvent::StatusCleared]
            }
        }
    }

    pub fn set_status(&mut self, message: impl Into<String>) -> AppEvent {
        let message = message.into();
        self.status_line = Some(message.clone());
        AppEvent::StatusUpdated(message)
    }

    fn rotate_page(&mut self, delta: isize) -> Vec<AppEvent> {
        let pages = PageKind::ALL;
        let current = pages
            .iter()
            .position(|page| *page == self.active_page)
            .unwrap_or(0) as isize;
        let len = pages.len() as isize;
        let next = (current + delta).rem_euclid(len) as usize;
        self.switch_to(pages[next])
    }

    // Leaving a page always drops back to its list.
    fn switch_to(&mut self, page: PageKind) -> Vec<AppEvent> {
        let mut events = Vec::with_capacity(2);
        if self.mode != ViewMode::List {
            self.mode = ViewMode::List;
            events.push(AppEvent::ModeChanged(self.mode));
        }
        self.active_page = page;
        events.push(AppEvent::PageChanged(page));
        events
    }
}

#[cfg(test)]
mod tests {
    use super::{AppCommand, AppEvent, AppState, PageKind, ViewMode};

    #[test]
    fn page_rotation_wraps() {
        let mut state = AppState::starting_at(PageKind::ActivityTypes);

        let events = state.dispatch(AppCommand::NextPage);
        assert_eq!(state.active_page, PageKind::Accounts);
        assert_eq!(events, vec![AppEvent::PageChanged(PageKind::Accounts)]);

        state.dispatch(AppCommand::PrevPage);
        assert_eq!(state.active_page, PageKind::ActivityTypes);
    }

    #[test]
    fn switching_pages_closes_detail() {
        let mut state = AppState::default();
        state.dispatch(AppCommand::OpenDetail);
        assert_eq!(state.mode, ViewMode::Detail);

        let events = state.dispatch(AppCommand::GoTo(PageKind::Deals));
        assert_eq!(
            events,
            vec![
                AppEvent::ModeChanged(ViewMode::List),
                AppEvent::PageChanged(PageKind::Deals),
            ],
        );
    }

    #[test]
    fn redundant_commands_emit_nothing() {
        let mut state = AppState::default();
        assert!(state.dispatch(AppCommand::GoTo(PageKind::Accounts)).is_empty());
        assert!(state.dispatch(AppCommand::CloseDetail).is_empty());
    }

    #[test]
    fn status_set_and_clear() {
        let mut state = AppState::default();
        let event = state.set_status("saved");
        assert_eq!(event, AppEvent::StatusUpdated("saved".to_owned()));
        assert_eq!(state.status_line.as_deref(), Some("saved"));

        state.dispatch(AppCommand::ClearStatus);
        assert_eq!(state.status_line, None);
    }

    #[test]
    fn page_names_parse() {
        for page in PageKind::ALL {
            assert_eq!(PageKind::parse(page.as_str()), Some(page));
        }
        assert_eq!(PageKind::parse("dashboard"), None);
    }
}
