//! Key bindings for the viewer.

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

/// Which pane receives navigation keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Focus {
    #[default]
    Sidebar,
    Transcript,
}

/// What a key press asks the viewer to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Quit,
    ToggleHelp,
    /// Poll the store now instead of waiting for the next interval.
    Refresh,
    /// Select the highlighted conversation.
    Select,
    CursorUp,
    CursorDown,
    /// Switch focus between the sidebar and the transcript.
    SwitchFocus,
    /// Navigation key for the transcript pane.
    Scroll(KeyEvent),
    None,
}

/// Maps a key press to an action given the focused pane.
pub fn map_key(key: KeyEvent, focus: Focus) -> Action {
    if key.modifiers.contains(KeyModifiers::CONTROL) {
        return match key.code {
            KeyCode::Char('c') => Action::Quit,
            _ => Action::None,
        };
    }

    match key.code {
        KeyCode::Char('q') => Action::Quit,
        KeyCode::Char('?') => Action::ToggleHelp,
        KeyCode::Char('r') => Action::Refresh,
        KeyCode::Tab | KeyCode::BackTab => Action::SwitchFocus,
        KeyCode::Enter => Action::Select,
        _ => match focus {
            Focus::Sidebar => match key.code {
                KeyCode::Char('k') | KeyCode::Up => Action::CursorUp,
                KeyCode::Char('j') | KeyCode::Down => Action::CursorDown,
                KeyCode::PageUp
                | KeyCode::PageDown
                | KeyCode::Char('g' | 'G')
                | KeyCode::Home
                | KeyCode::End => Action::Scroll(key),
                _ => Action::None,
            },
            Focus::Transcript => match key.code {
                KeyCode::Char('k' | 'j' | 'g' | 'G')
                | KeyCode::Up
                | KeyCode::Down
                | KeyCode::PageUp
                | KeyCode::PageDown
                | KeyCode::Home
                | KeyCode::End => Action::Scroll(key),
                _ => Action::None,
            },
        },
    }
}

impl Focus {
    pub fn toggle(self) -> Self {
        match self {
            Focus::Sidebar => Focus::Transcript,
            Focus::Transcript => Focus::Sidebar,
        }
    }
}
