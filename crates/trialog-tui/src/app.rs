//! Main application loop for the viewer.

use crate::input::{Action, map_key};
use crate::poller::Poller;
use crate::scroll::ScrollManager;
use crate::state::ViewerState;
use crate::widgets::{footer, header, help, sidebar, transcript};
use anyhow::Result;
use crossterm::{
    cursor::Show,
    event::{self, Event, KeyEvent, KeyEventKind},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{
    Frame, Terminal,
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout},
};
use scopeguard::defer;
use std::io;
use tokio::time::{Duration, MissedTickBehavior, interval};
use tracing::{debug, info};

/// Width of the conversation list.
const SIDEBAR_WIDTH: u16 = 38;

/// Main viewer application.
pub struct App {
    state: ViewerState,
    poller: Poller,
    scroll: ScrollManager,
    refresh_interval: Duration,
}

impl App {
    pub fn new(poller: Poller, refresh_interval: Duration) -> Self {
        Self {
            state: ViewerState::new(),
            poller,
            scroll: ScrollManager::new(),
            refresh_interval,
        }
    }

    /// Runs the viewer until the operator quits.
    ///
    /// Read cycles run inline on the refresh interval, so a slow cycle delays
    /// the next one instead of overlapping it.
    pub async fn run(mut self) -> Result<()> {
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen)?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;

        // Restore the terminal on every exit path, including panics.
        defer! {
            let _ = disable_raw_mode();
            let _ = execute!(io::stdout(), LeaveAlternateScreen, Show);
        }

        let mut refresh = interval(self.refresh_interval);
        refresh.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut tick = interval(Duration::from_millis(100));

        info!(refresh_ms = self.refresh_interval.as_millis() as u64, "Viewer started");

        loop {
            tokio::select! {
                _ = refresh.tick() => {
                    self.poller.poll_once(&mut self.state).await;
                }
                _ = tick.tick() => {
                    if self.state.poll_requested {
                        self.poller.poll_once(&mut self.state).await;
                        refresh.reset();
                    }

                    terminal.draw(|f| draw(f, &self.state, &mut self.scroll))?;

                    if event::poll(Duration::from_millis(0))?
                        && let Event::Key(key) = event::read()?
                        && key.kind == KeyEventKind::Press
                        && self.handle_key(key)
                    {
                        break;
                    }
                }
                _ = tokio::signal::ctrl_c() => {
                    debug!("Interrupted");
                    break;
                }
            }
        }

        info!("Viewer stopped");
        Ok(())
    }

    /// Applies a key press. Returns true when the viewer should exit.
    fn handle_key(&mut self, key: KeyEvent) -> bool {
        if self.state.show_help {
            self.state.show_help = false;
            return false;
        }

        match map_key(key, self.state.focus) {
            Action::Quit => return true,
            Action::ToggleHelp => self.state.show_help = true,
            Action::Refresh => self.state.poll_requested = true,
            Action::Select => {
                if self.state.select_highlighted() {
                    self.scroll.reset();
                }
            }
            Action::CursorUp => self.state.conversations.cursor_up(),
            Action::CursorDown => self.state.conversations.cursor_down(),
            Action::SwitchFocus => self.state.focus = self.state.focus.toggle(),
            Action::Scroll(key) => self.scroll.handle_key(key),
            Action::None => {}
        }
        false
    }
}

/// Draws one frame.
pub fn draw(frame: &mut Frame, state: &ViewerState, scroll: &mut ScrollManager) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(0),
            Constraint::Length(3),
        ])
        .split(frame.area());
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(SIDEBAR_WIDTH), Constraint::Min(0)])
        .split(rows[1]);

    frame.render_widget(header::render(state), rows[0]);
    sidebar::render(frame, columns[0], state);
    transcript::render(frame, columns[1], state.feed.as_ref(), scroll, state.focus);
    frame.render_widget(footer::render(state, scroll), rows[2]);

    if state.show_help {
        help::render(frame, frame.area());
    }
}
