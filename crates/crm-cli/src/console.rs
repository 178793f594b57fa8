// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::Result;
use crm_app::{AppCommand, AppEvent, AppState, PageKind, ViewMode};
use crm_view::render::{render_overlay, render_status};
use crm_view::terminal::schedule_status_clear;
use crm_view::{Console, ConsoleEvent, ConsoleFlow};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::layout::{Constraint, Direction, Layout};
use ratatui::style::{Color, Modifier, Style};
use ratatui::widgets::{Block, Borders, Paragraph, Tabs};
use std::sync::mpsc::Sender;
use tracing::{debug, info};

use crate::config::APP_NAME;
use crate::page::{PageController, PageOutcome};

const HELP_TEXT: &str = "\
pages      tab / shift-tab   1-5 jump   q quit

list       j/k rows   h/l columns   [ ] pages   g/G first/last
           enter open   m row actions   / search   f filter
           x clear column filter   F clear all   s sort   S unsort
           v columns   c hide column   C show all   < > width
           space select   a select page   A clear selection
           r reload   I show inactive (activity types)

detail     e edit   enter change field   ctrl-s save   esc back
           tab/shift-tab related tabs   r refresh tab   x dismiss error
           o claim   O assign   n note   u attach   d delete

press any key to close";

/// Shell around the entity pages: the tab bar, status line and global
/// keys. Everything page-specific goes through [`PageController`].
pub struct CrmConsole {
    state: AppState,
    pages: Vec<Box<dyn PageController>>,
    status_token: u64,
    show_help: bool,
}

impl CrmConsole {
    pub fn new(pages: Vec<Box<dyn PageController>>, start: PageKind) -> Self {
        Self {
            state: AppState::starting_at(start),
            pages,
            status_token: 0,
            show_help: false,
        }
    }

    #[cfg(test)]
    pub fn state(&self) -> &AppState {
        &self.state
    }

    fn page_index(&self, kind: PageKind) -> Option<usize> {
        self.pages.iter().position(|page| page.kind() == kind)
    }

    fn active_page(&mut self) -> Option<&mut Box<dyn PageController>> {
        let index = self.page_index(self.state.active_page)?;
        self.pages.get_mut(index)
    }

    /// Leaving a page closes its detail; arriving reloads the list so edits
    /// made on other pages show up.
    fn navigate(&mut self, command: AppCommand, tx: &Sender<ConsoleEvent>) {
        let previous = self.state.active_page;
        let events = self.state.dispatch(command);
        let leaves_detail = events.iter().any(|event| {
            matches!(
                event,
                AppEvent::PageChanged(_) | AppEvent::ModeChanged(ViewMode::List)
            )
        });
        if leaves_detail
            && let Some(index) = self.page_index(previous)
            && let Some(page) = self.pages.get_mut(index)
        {
            page.close_detail();
        }
        let arrived = events.iter().find_map(|event| match event {
            AppEvent::PageChanged(page) => Some(*page),
            _ => None,
        });
        let Some(arrived) = arrived else {
            return;
        };
        info!(from = previous.as_str(), to = arrived.as_str(), "page changed");
        let reloaded = self.active_page().map(|page| page.reload());
        if let Some(Err(error)) = reloaded {
            self.set_status(format!("{} failed to load: {error:#}", arrived.label()), tx);
        }
    }

    fn set_status(&mut self, message: String, tx: &Sender<ConsoleEvent>) {
        if message.is_empty() {
            return;
        }
        debug!(status = %message, "status");
        self.state.set_status(message);
        self.status_token += 1;
        schedule_status_clear(tx, self.status_token);
    }

    fn apply_outcome(&mut self, outcome: PageOutcome, tx: &Sender<ConsoleEvent>) {
        match outcome.mode {
            Some(ViewMode::Detail) => {
                self.state.dispatch(AppCommand::OpenDetail);
            }
            Some(ViewMode::List) => {
                self.state.dispatch(AppCommand::CloseDetail);
            }
            None => {}
        }
        if let Some(status) = outcome.status {
            self.set_status(status, tx);
        }
    }

    fn global_key(&mut self, key: KeyEvent, tx: &Sender<ConsoleEvent>) -> ConsoleFlow {
        match key.code {
            KeyCode::Char('q') => return ConsoleFlow::Quit,
            KeyCode::Tab => self.navigate(AppCommand::NextPage, tx),
            KeyCode::BackTab => self.navigate(AppCommand::PrevPage, tx),
            KeyCode::Char('?') => self.show_help = true,
            KeyCode::Char(digit @ '1'..='9') => {
                let index = digit as usize - '1' as usize;
                if let Some(page) = PageKind::ALL.get(index) {
                    self.navigate(AppCommand::GoTo(*page), tx);
                }
            }
            _ => {}
        }
        ConsoleFlow::Continue
    }

    fn breadcrumb(&self) -> String {
        format!("{} > detail  (esc back)", self.state.active_page.label())
    }
}

impl Console for CrmConsole {
    fn start(&mut self, tx: &Sender<ConsoleEvent>) -> Result<()> {
        info!(page = self.state.active_page.as_str(), pages = self.pages.len(), "console started");
        self.set_status("press ? for help".to_owned(), tx);
        Ok(())
    }

    fn draw(&mut self, frame: &mut ratatui::Frame<'_>) {
        let layout = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3),
                Constraint::Min(1),
                Constraint::Length(3),
            ])
            .split(frame.area());

        if self.state.mode == ViewMode::Detail {
            let breadcrumb = Paragraph::new(self.breadcrumb())
                .block(Block::default().title(APP_NAME).borders(Borders::ALL));
            frame.render_widget(breadcrumb, layout[0]);
        } else {
            let titles: Vec<String> = PageKind::ALL
                .iter()
                .enumerate()
                .map(|(index, page)| format!("{} {}", index + 1, page.label()))
                .collect();
            let selected = PageKind::ALL
                .iter()
                .position(|page| *page == self.state.active_page)
                .unwrap_or(0);
            let tabs = Tabs::new(titles)
                .block(Block::default().title(APP_NAME).borders(Borders::ALL))
                .style(Style::default().fg(Color::White))
                .highlight_style(
                    Style::default()
                        .fg(Color::Cyan)
                        .add_modifier(Modifier::BOLD),
                )
                .select(selected);
            frame.render_widget(tabs, layout[0]);
        }

        let hints = match self.page_index(self.state.active_page) {
            Some(index) => {
                let page = &self.pages[index];
                page.draw(frame, layout[1]);
                page.hints()
            }
            None => {
                let missing = Paragraph::new("page unavailable")
                    .block(Block::default().borders(Borders::ALL));
                frame.render_widget(missing, layout[1]);
                ""
            }
        };

        let status = self.state.status_line.as_deref().unwrap_or(hints);
        render_status(frame, layout[2], status);

        if self.show_help {
            render_overlay(frame, "help", HELP_TEXT.to_owned(), 70, 70);
        }
    }

    fn handle_key(&mut self, key: KeyEvent, tx: &Sender<ConsoleEvent>) -> Result<ConsoleFlow> {
        if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
            return Ok(ConsoleFlow::Quit);
        }
        if self.show_help {
            self.show_help = false;
            return Ok(ConsoleFlow::Continue);
        }
        let outcome = match self.active_page() {
            Some(page) => page.handle_key(key, tx),
            None => PageOutcome::ignored(),
        };
        if outcome.handled {
            self.apply_outcome(outcome, tx);
            return Ok(ConsoleFlow::Continue);
        }
        Ok(self.global_key(key, tx))
    }

    fn handle_event(&mut self, event: ConsoleEvent, tx: &Sender<ConsoleEvent>) {
        match event {
            ConsoleEvent::ClearStatus { token } => {
                if token == self.status_token {
                    self.state.dispatch(AppCommand::ClearStatus);
                }
            }
            ConsoleEvent::Detail(event) => {
                let outcome = match self.active_page() {
                    Some(page) => page.handle_detail(event, tx),
                    None => PageOutcome::ignored(),
                };
                self.apply_outcome(outcome, tx);
            }
            ConsoleEvent::Users { generation, result } => {
                let outcome = match self.active_page() {
                    Some(page) => page.handle_users(generation, result),
                    None => PageOutcome::ignored(),
                };
                self.apply_outcome(outcome, tx);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::CrmConsole;
    use crate::pages::build_pages;
    use crate::store::DemoStore;
    use anyhow::Result;
    use crm_app::{CurrentUser, PageKind, Role, UserId, ViewMode};
    use crm_testkit::DemoData;
    use crm_view::{Console, ConsoleEvent, ConsoleFlow};
    use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
    use ratatui::Terminal;
    use ratatui::backend::TestBackend;
    use std::sync::mpsc;
    use std::time::Duration;

    fn console() -> Result<CrmConsole> {
        let store = DemoStore::new(DemoData::generate(11, 5), Duration::ZERO);
        let user = CurrentUser::new(UserId::new(2), "Jordan Hill", &[Role::Manager]);
        Ok(CrmConsole::new(build_pages(&store, &user)?, PageKind::Accounts))
    }

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn tab_and_digits_switch_pages() -> Result<()> {
        let mut console = console()?;
        let (tx, _rx) = mpsc::channel();

        console.handle_key(key(KeyCode::Tab), &tx)?;
        assert_eq!(console.state().active_page, PageKind::Contacts);
        console.handle_key(key(KeyCode::Char('5')), &tx)?;
        assert_eq!(console.state().active_page, PageKind::ActivityTypes);
        console.handle_key(key(KeyCode::BackTab), &tx)?;
        assert_eq!(console.state().active_page, PageKind::Activities);
        Ok(())
    }

    #[test]
    fn q_quits_from_the_list() -> Result<()> {
        let mut console = console()?;
        let (tx, _rx) = mpsc::channel();
        assert_eq!(console.handle_key(key(KeyCode::Char('q')), &tx)?, ConsoleFlow::Quit);
        Ok(())
    }

    #[test]
    fn switching_pages_closes_the_open_detail() -> Result<()> {
        let mut console = console()?;
        let (tx, _rx) = mpsc::channel();

        console.handle_key(key(KeyCode::Enter), &tx)?;
        assert_eq!(console.state().mode, ViewMode::Detail);

        console.handle_key(key(KeyCode::Char('2')), &tx)?;
        assert_eq!(console.state().mode, ViewMode::List);
        assert_eq!(console.state().active_page, PageKind::Contacts);

        console.handle_key(key(KeyCode::Char('1')), &tx)?;
        assert_eq!(console.state().mode, ViewMode::List);
        Ok(())
    }

    #[test]
    fn only_the_latest_status_token_clears() -> Result<()> {
        let mut console = console()?;
        let (tx, _rx) = mpsc::channel();

        console.handle_key(key(KeyCode::Char('s')), &tx)?;
        let first = console.status_token;
        console.handle_key(key(KeyCode::Char('s')), &tx)?;
        assert!(console.state().status_line.is_some());

        console.handle_event(ConsoleEvent::ClearStatus { token: first }, &tx);
        assert!(console.state().status_line.is_some());

        let latest = console.status_token;
        console.handle_event(ConsoleEvent::ClearStatus { token: latest }, &tx);
        assert!(console.state().status_line.is_none());
        Ok(())
    }

    #[test]
    fn frame_shows_tabs_and_rows() -> Result<()> {
        let mut console = console()?;
        let mut terminal = Terminal::new(TestBackend::new(140, 30))?;
        terminal.draw(|frame| console.draw(frame))?;
        let text: String = terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|cell| cell.symbol())
            .collect();
        assert!(text.contains("1 Accounts"));
        assert!(text.contains("5 Activity Types"));
        assert!(text.contains("enter open"));
        Ok(())
    }
}
