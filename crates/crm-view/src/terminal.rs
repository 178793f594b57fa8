// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result};
use crm_app::User;
use crossterm::event::{self, Event, KeyEvent, KeyEventKind};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode};
use crossterm::{execute, terminal};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use std::io;
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;
use std::time::Duration;
use tracing::debug;

use crate::detail::DetailEvent;
use crate::service::{ServiceResult, UserDirectory};

pub const STATUS_CLEAR_AFTER: Duration = Duration::from_secs(4);
const POLL_INTERVAL: Duration = Duration::from_millis(120);

/// Completions delivered to the UI thread by workers and timers.
#[derive(Debug)]
pub enum ConsoleEvent {
    ClearStatus {
        token: u64,
    },
    Detail(DetailEvent),
    Users {
        generation: u64,
        result: Result<ServiceResult<Vec<User>>>,
    },
}

impl From<DetailEvent> for ConsoleEvent {
    fn from(event: DetailEvent) -> Self {
        Self::Detail(event)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsoleFlow {
    Continue,
    Quit,
}

pub trait Console {
    fn draw(&mut self, frame: &mut ratatui::Frame<'_>);
    fn handle_key(&mut self, key: KeyEvent, tx: &Sender<ConsoleEvent>) -> Result<ConsoleFlow>;
    fn handle_event(&mut self, event: ConsoleEvent, tx: &Sender<ConsoleEvent>);
    /// Runs once before the first frame.
    fn start(&mut self, _tx: &Sender<ConsoleEvent>) -> Result<()> {
        Ok(())
    }
}

pub fn run_console<C: Console>(console: &mut C) -> Result<()> {
    enable_raw_mode().context("enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, terminal::EnterAlternateScreen).context("enter alternate screen")?;

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("create terminal")?;
    let (tx, rx) = mpsc::channel();

    let mut result = console.start(&tx);
    if result.is_ok() {
        result = event_loop(console, &mut terminal, &tx, &rx);
    }

    disable_raw_mode().context("disable raw mode")?;
    execute!(io::stdout(), terminal::LeaveAlternateScreen).context("leave alternate screen")?;
    result
}

fn event_loop<C: Console>(
    console: &mut C,
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    tx: &Sender<ConsoleEvent>,
    rx: &Receiver<ConsoleEvent>,
) -> Result<()> {
    loop {
        drain_events(console, tx, rx);

        terminal
            .draw(|frame| console.draw(frame))
            .context("draw frame")?;

        if !event::poll(POLL_INTERVAL).context("poll event")? {
            continue;
        }
        match event::read().context("read event")? {
            Event::Key(key) if key.kind != KeyEventKind::Release => {
                if console.handle_key(key, tx)? == ConsoleFlow::Quit {
                    return Ok(());
                }
            }
            _ => {}
        }
    }
}

pub fn drain_events<C: Console>(console: &mut C, tx: &Sender<ConsoleEvent>, rx: &Receiver<ConsoleEvent>) {
    while let Ok(event) = rx.try_recv() {
        console.handle_event(event, tx);
    }
}

pub fn schedule_status_clear(tx: &Sender<ConsoleEvent>, token: u64) {
    let sender = tx.clone();
    thread::spawn(move || {
        thread::sleep(STATUS_CLEAR_AFTER);
        let _ = sender.send(ConsoleEvent::ClearStatus { token });
    });
}

pub fn spawn_users_fetch(
    directory: Arc<dyn UserDirectory>,
    generation: u64,
    tx: &Sender<ConsoleEvent>,
) -> Result<()> {
    let sender = tx.clone();
    thread::Builder::new()
        .name("crm-users-fetch".to_owned())
        .spawn(move || {
            let result = directory.list_users();
            debug!(generation, ok = result.is_ok(), "user list fetched");
            let _ = sender.send(ConsoleEvent::Users { generation, result });
        })
        .context("spawn user list worker")?;
    Ok(())
}
