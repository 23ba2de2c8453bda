//! Scroll management for the transcript pane.
//!
//! Offset is counted in lines from the bottom: 0 follows the live tail.

use crossterm::event::{KeyCode, KeyEvent};

/// Manages scroll state for the transcript pane.
#[derive(Debug, Clone)]
pub struct ScrollManager {
    /// Current scroll offset (0 = bottom/live tail).
    offset: usize,
    /// Total rendered lines.
    total_lines: usize,
    /// Viewport height (visible lines).
    viewport_height: usize,
}

impl ScrollManager {
    pub fn new() -> Self {
        Self {
            offset: 0,
            total_lines: 0,
            viewport_height: 24,
        }
    }

    /// Updates total lines and viewport height.
    ///
    /// When the operator has scrolled away from the tail, growth of the
    /// transcript moves the offset by the same amount so the lines they are
    /// reading stay put.
    pub fn update_dimensions(&mut self, total_lines: usize, viewport_height: usize) {
        if self.offset > 0 && total_lines > self.total_lines {
            self.offset += total_lines - self.total_lines;
        }
        self.total_lines = total_lines;
        self.viewport_height = viewport_height;
        self.clamp_offset();
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Whether the view follows new records as they arrive.
    pub fn is_following(&self) -> bool {
        self.offset == 0
    }

    /// Index of the first visible line.
    pub fn first_visible(&self) -> usize {
        self.total_lines
            .saturating_sub(self.viewport_height)
            .saturating_sub(self.offset)
    }

    /// Handles a navigation key.
    pub fn handle_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('j') | KeyCode::Down => self.scroll_down(1),
            KeyCode::Char('k') | KeyCode::Up => self.scroll_up(1),
            KeyCode::PageDown => self.scroll_down(self.viewport_height),
            KeyCode::PageUp => self.scroll_up(self.viewport_height),
            KeyCode::Char('g') | KeyCode::Home => self.jump_to_top(),
            KeyCode::Char('G') | KeyCode::End => self.jump_to_bottom(),
            _ => {}
        }
    }

    /// Scrolls down by n lines (toward the live tail).
    pub fn scroll_down(&mut self, n: usize) {
        self.offset = self.offset.saturating_sub(n);
    }

    /// Scrolls up by n lines (into history).
    pub fn scroll_up(&mut self, n: usize) {
        self.offset = (self.offset + n).min(self.max_offset());
    }

    fn jump_to_top(&mut self) {
        self.offset = self.max_offset();
    }

    fn jump_to_bottom(&mut self) {
        self.offset = 0;
    }

    fn max_offset(&self) -> usize {
        self.total_lines.saturating_sub(self.viewport_height)
    }

    fn clamp_offset(&mut self) {
        self.offset = self.offset.min(self.max_offset());
    }

    /// Returns to the live tail and forgets the line count, for a new
    /// conversation.
    pub fn reset(&mut self) {
        self.offset = 0;
        self.total_lines = 0;
    }
}

impl Default for ScrollManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::KeyModifiers;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn new_scroll_manager_follows_tail() {
        let sm = ScrollManager::new();
        assert_eq!(sm.offset(), 0);
        assert!(sm.is_following());
    }

    #[test]
    fn scroll_up_is_clamped_to_history() {
        let mut sm = ScrollManager::new();
        sm.update_dimensions(30, 20);
        sm.scroll_up(50);
        assert_eq!(sm.offset(), 10);
        assert_eq!(sm.first_visible(), 0);
    }

    #[test]
    fn keys_navigate() {
        let mut sm = ScrollManager::new();
        sm.update_dimensions(100, 20);

        sm.handle_key(key(KeyCode::Char('k')));
        assert_eq!(sm.offset(), 1);
        sm.handle_key(key(KeyCode::PageUp));
        assert_eq!(sm.offset(), 21);
        sm.handle_key(key(KeyCode::Char('j')));
        assert_eq!(sm.offset(), 20);
        sm.handle_key(key(KeyCode::Char('g')));
        assert_eq!(sm.offset(), 80);
        sm.handle_key(key(KeyCode::Char('G')));
        assert_eq!(sm.offset(), 0);
    }

    #[test]
    fn growth_keeps_reading_position() {
        let mut sm = ScrollManager::new();
        sm.update_dimensions(100, 20);
        sm.scroll_up(10);
        let first = sm.first_visible();

        sm.update_dimensions(130, 20);
        assert_eq!(sm.offset(), 40);
        assert_eq!(sm.first_visible(), first);
    }

    #[test]
    fn growth_while_following_stays_at_tail() {
        let mut sm = ScrollManager::new();
        sm.update_dimensions(100, 20);
        sm.update_dimensions(130, 20);
        assert!(sm.is_following());
        assert_eq!(sm.first_visible(), 110);
    }

    #[test]
    fn reset_returns_to_tail() {
        let mut sm = ScrollManager::new();
        sm.update_dimensions(100, 20);
        sm.scroll_up(5);
        sm.reset();
        assert!(sm.is_following());
        sm.update_dimensions(10, 20);
        assert_eq!(sm.offset(), 0);
    }
}
