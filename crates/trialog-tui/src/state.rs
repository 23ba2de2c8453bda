//! State management for the viewer.

use crate::input::Focus;
use chrono::{DateTime, Local};
use tracing::{debug, info};
use trialog_core::{ConversationEntry, Correlator, DisplayItem, TranscriptWindow, WindowEntry};
use trialog_proto::{ConversationId, SummaryRecord};

/// Which conversation the operator is looking at.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Selection {
    #[default]
    NoSelection,
    Selected(ConversationId),
}

impl Selection {
    pub fn conversation(&self) -> Option<&ConversationId> {
        match self {
            Selection::NoSelection => None,
            Selection::Selected(conv) => Some(conv),
        }
    }
}

/// Periodically refreshed list of known conversations.
///
/// Entries keep the order in which they were first seen, so the cursor does
/// not jump around as new trials start.
#[derive(Debug, Clone, Default)]
pub struct ConversationList {
    entries: Vec<ConversationEntry>,
    cursor: usize,
}

impl ConversationList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merges the latest listing: updates known entries in place, appends
    /// new ones, and drops entries that are no longer in the store.
    pub fn refresh(&mut self, latest: Vec<ConversationEntry>) {
        let highlighted = self.highlighted().map(|e| e.conversation.clone());

        let mut merged: Vec<ConversationEntry> = Vec::with_capacity(latest.len());
        for known in &self.entries {
            if let Some(current) = latest.iter().find(|e| e.conversation == known.conversation) {
                merged.push(current.clone());
            }
        }
        for entry in latest {
            if !merged.iter().any(|e| e.conversation == entry.conversation) {
                debug!(conversation = %entry.conversation, "New conversation");
                merged.push(entry);
            }
        }
        self.entries = merged;

        self.cursor = highlighted
            .and_then(|conv| self.position(&conv))
            .unwrap_or(self.cursor)
            .min(self.entries.len().saturating_sub(1));
    }

    pub fn entries(&self) -> &[ConversationEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn highlighted(&self) -> Option<&ConversationEntry> {
        self.entries.get(self.cursor)
    }

    pub fn position(&self, conv: &ConversationId) -> Option<usize> {
        self.entries.iter().position(|e| &e.conversation == conv)
    }

    pub fn cursor_up(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    pub fn cursor_down(&mut self) {
        if self.cursor + 1 < self.entries.len() {
            self.cursor += 1;
        }
    }
}

/// What the next poll should read for the selected conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedRead {
    /// Nothing loaded yet: read the most recent window.
    Initial,
    /// Read everything from this absolute index on.
    Since(u64),
}

/// Result of applying a window to a feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedUpdate {
    /// `n` new display items were appended (possibly zero).
    Appended(usize),
    /// The log is shorter than what was already shown; the store was reset
    /// underneath the viewer and the feed starts over.
    Restarted,
}

/// Accumulated, append-only display of one conversation.
#[derive(Debug, Clone)]
pub struct TranscriptFeed {
    conversation: ConversationId,
    items: Vec<DisplayItem>,
    correlator: Correlator,
    next_index: Option<u64>,
    /// Index of the oldest record shown; records before it were outside the
    /// initial window.
    first_index: u64,
    records_seen: u64,
    malformed: usize,
    pub summary: Option<SummaryRecord>,
}

impl TranscriptFeed {
    pub fn new(conversation: ConversationId) -> Self {
        Self {
            conversation,
            items: Vec::new(),
            correlator: Correlator::new(),
            next_index: None,
            first_index: 0,
            records_seen: 0,
            malformed: 0,
            summary: None,
        }
    }

    pub fn conversation(&self) -> &ConversationId {
        &self.conversation
    }

    pub fn items(&self) -> &[DisplayItem] {
        &self.items
    }

    pub fn next_read(&self) -> FeedRead {
        match self.next_index {
            None => FeedRead::Initial,
            Some(index) => FeedRead::Since(index),
        }
    }

    /// Records shown so far.
    pub fn records_seen(&self) -> u64 {
        self.records_seen
    }

    /// Records older than the initial window that were never loaded.
    pub fn records_skipped(&self) -> u64 {
        self.first_index
    }

    pub fn malformed(&self) -> usize {
        self.malformed
    }

    /// Whether the trial has reported its reward.
    pub fn is_complete(&self) -> bool {
        self.summary.is_some()
    }

    /// Appends the records of `window` that have not been shown yet.
    pub fn apply(&mut self, window: &TranscriptWindow) -> FeedUpdate {
        if let Some(next) = self.next_index {
            if window.total < next {
                info!(
                    conversation = %self.conversation,
                    shown = next,
                    total = window.total,
                    "Message log shrank; store was reset, reloading transcript"
                );
                *self = Self::new(self.conversation.clone());
                return FeedUpdate::Restarted;
            }
        } else {
            self.first_index = window.start;
        }

        let already = self.next_index.unwrap_or(window.start);
        let before = self.items.len();
        for (index, entry) in (window.start..).zip(window.entries()) {
            if index < already {
                continue;
            }
            match entry {
                WindowEntry::Turn(turn) => self.correlator.push_turn(turn, &mut self.items),
                WindowEntry::Malformed(record) => {
                    self.malformed += 1;
                    self.items.push(DisplayItem::Unreadable {
                        index: record.index,
                        error: record.error.clone(),
                    });
                }
            }
            self.records_seen += 1;
        }
        self.next_index = Some(window.end().max(already));
        FeedUpdate::Appended(self.items.len() - before)
    }
}

/// Outcome of the most recent poll.
#[derive(Debug, Clone)]
pub enum PollStatus {
    Waiting,
    Ok { at: DateTime<Local> },
    Failed { at: DateTime<Local>, error: String },
}

/// Everything the viewer renders.
#[derive(Debug, Clone)]
pub struct ViewerState {
    pub selection: Selection,
    pub conversations: ConversationList,
    pub feed: Option<TranscriptFeed>,
    pub status: PollStatus,
    pub focus: Focus,
    pub show_help: bool,
    /// Set when the operator changes selection, so the app polls at once.
    pub poll_requested: bool,
}

impl ViewerState {
    pub fn new() -> Self {
        Self {
            selection: Selection::NoSelection,
            conversations: ConversationList::new(),
            feed: None,
            status: PollStatus::Waiting,
            focus: Focus::Sidebar,
            show_help: false,
            poll_requested: true,
        }
    }

    /// Selects the highlighted conversation. Returns true if the selection
    /// changed.
    pub fn select_highlighted(&mut self) -> bool {
        let Some(entry) = self.conversations.highlighted() else {
            return false;
        };
        let conv = entry.conversation.clone();
        self.select(conv)
    }

    /// Moves to `conv`. Selecting the current conversation again is a no-op.
    pub fn select(&mut self, conv: ConversationId) -> bool {
        if self.selection.conversation() == Some(&conv) {
            return false;
        }
        info!(conversation = %conv, "Selected conversation");
        self.feed = Some(TranscriptFeed::new(conv.clone()));
        self.selection = Selection::Selected(conv);
        self.poll_requested = true;
        true
    }
}

impl Default for ViewerState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use trialog_core::MalformedRecord;
    use trialog_proto::{RunSessionId, Turn};

    fn conv(session: &str, task: u64) -> ConversationId {
        ConversationId::new(RunSessionId::parse(session).unwrap(), task)
    }

    fn entry(session: &str, task: u64, reward: Option<f64>) -> ConversationEntry {
        ConversationEntry {
            conversation: conv(session, task),
            summary: reward.map(SummaryRecord::new),
        }
    }

    fn window(start: u64, total: u64, turns: Vec<Turn>) -> TranscriptWindow {
        TranscriptWindow {
            start,
            total,
            turns,
            malformed: Vec::new(),
        }
    }

    #[test]
    fn list_keeps_first_seen_order() {
        let mut list = ConversationList::new();
        list.refresh(vec![entry("b", 1, None), entry("c", 2, None)]);
        list.refresh(vec![entry("a", 1, None), entry("b", 1, Some(1.0)), entry("c", 2, None)]);

        let ids: Vec<_> = list.entries().iter().map(|e| e.conversation.to_string()).collect();
        assert_eq!(ids, vec!["b:1", "c:2", "a:1"]);
        assert_eq!(list.entries()[0].summary, Some(SummaryRecord::new(1.0)));
    }

    #[test]
    fn cursor_follows_highlighted_entry() {
        let mut list = ConversationList::new();
        list.refresh(vec![entry("a", 1, None), entry("b", 1, None)]);
        list.cursor_down();
        assert_eq!(list.highlighted().unwrap().conversation, conv("b", 1));

        // "a" disappears; cursor stays on "b".
        list.refresh(vec![entry("b", 1, None)]);
        assert_eq!(list.cursor(), 0);
        assert_eq!(list.highlighted().unwrap().conversation, conv("b", 1));

        list.refresh(Vec::new());
        assert!(list.highlighted().is_none());
    }

    #[test]
    fn cursor_is_clamped() {
        let mut list = ConversationList::new();
        list.cursor_up();
        list.cursor_down();
        assert_eq!(list.cursor(), 0);
        list.refresh(vec![entry("a", 1, None)]);
        list.cursor_down();
        assert_eq!(list.cursor(), 0);
    }

    #[test]
    fn selection_persists_across_refresh() {
        let mut state = ViewerState::new();
        state.conversations.refresh(vec![entry("a", 1, None), entry("b", 2, None)]);
        state.conversations.cursor_down();
        assert!(state.select_highlighted());
        assert_eq!(state.selection, Selection::Selected(conv("b", 2)));

        state.conversations.refresh(vec![entry("c", 3, None)]);
        assert_eq!(state.selection, Selection::Selected(conv("b", 2)));
        assert!(!state.select(conv("b", 2)));
    }

    #[test]
    fn select_without_entries_is_noop() {
        let mut state = ViewerState::new();
        assert!(!state.select_highlighted());
        assert_eq!(state.selection, Selection::NoSelection);
    }

    #[test]
    fn feed_appends_without_retracting() {
        let mut feed = TranscriptFeed::new(conv("a", 1));
        assert_eq!(feed.next_read(), FeedRead::Initial);

        let update = feed.apply(&window(0, 2, vec![Turn::user("one"), Turn::assistant("two")]));
        assert_eq!(update, FeedUpdate::Appended(2));
        assert_eq!(feed.next_read(), FeedRead::Since(2));
        let shown = feed.items().to_vec();

        assert_eq!(feed.apply(&window(2, 2, Vec::new())), FeedUpdate::Appended(0));
        assert_eq!(feed.apply(&window(2, 3, vec![Turn::user("three")])), FeedUpdate::Appended(1));
        assert_eq!(&feed.items()[..2], shown.as_slice());
        assert_eq!(feed.records_seen(), 3);
    }

    #[test]
    fn feed_ignores_records_already_shown() {
        let mut feed = TranscriptFeed::new(conv("a", 1));
        feed.apply(&window(0, 2, vec![Turn::user("one"), Turn::assistant("two")]));
        // An overlapping window only contributes the unseen tail.
        let update = feed.apply(&window(
            1,
            3,
            vec![Turn::assistant("two"), Turn::user("three")],
        ));
        assert_eq!(update, FeedUpdate::Appended(1));
        assert_eq!(feed.items().len(), 3);
    }

    #[test]
    fn feed_initial_window_records_skipped_prefix() {
        let mut feed = TranscriptFeed::new(conv("a", 1));
        feed.apply(&window(498, 500, vec![Turn::user("x"), Turn::user("y")]));
        assert_eq!(feed.records_skipped(), 498);
        assert_eq!(feed.next_read(), FeedRead::Since(500));
    }

    #[test]
    fn feed_restarts_when_log_shrinks() {
        let mut feed = TranscriptFeed::new(conv("a", 1));
        feed.apply(&window(0, 2, vec![Turn::user("one"), Turn::assistant("two")]));
        assert_eq!(feed.apply(&window(2, 0, Vec::new())), FeedUpdate::Restarted);
        assert!(feed.items().is_empty());
        assert_eq!(feed.next_read(), FeedRead::Initial);
    }

    #[test]
    fn feed_shows_unreadable_records_in_place() {
        let mut feed = TranscriptFeed::new(conv("a", 1));
        let w = TranscriptWindow {
            start: 0,
            total: 3,
            turns: vec![Turn::user("one"), Turn::user("three")],
            malformed: vec![MalformedRecord::new(1, "{bad", "EOF".to_string())],
        };
        feed.apply(&w);
        assert_eq!(feed.malformed(), 1);
        assert!(matches!(feed.items()[1], DisplayItem::Unreadable { index: 1, .. }));
        assert_eq!(feed.next_read(), FeedRead::Since(3));
    }
}
