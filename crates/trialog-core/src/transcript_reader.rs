//! Transcript reader for polling a conversation's message log.

use serde::Serialize;
use std::sync::Arc;
use tracing::warn;
use trialog_proto::{ConversationId, KeySchema, ListSlice, Store, StoreResult, Turn};

/// A window of decoded turns read from one snapshot of the log.
///
/// Contains both successfully decoded turns and the records that failed to
/// decode, so a single bad record never hides the rest of the transcript.
#[derive(Debug, Clone, Default)]
pub struct TranscriptWindow {
    /// Absolute index of the first record in the window.
    pub start: u64,
    /// Length of the whole log when the window was read.
    pub total: u64,
    /// Decoded turns, oldest first.
    pub turns: Vec<Turn>,
    /// Records that failed to decode.
    pub malformed: Vec<MalformedRecord>,
}

impl TranscriptWindow {
    /// Absolute index just past the last record in this window.
    pub fn end(&self) -> u64 {
        self.start + (self.turns.len() + self.malformed.len()) as u64
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty() && self.malformed.is_empty()
    }

    /// Walks decoded and malformed records together in log order.
    pub fn entries(&self) -> impl Iterator<Item = WindowEntry<'_>> {
        let mut turns = self.turns.iter();
        let mut malformed = self.malformed.iter().peekable();
        (self.start..self.end()).filter_map(move |index| {
            if malformed.peek().is_some_and(|m| m.index == index) {
                malformed.next().map(WindowEntry::Malformed)
            } else {
                turns.next().map(WindowEntry::Turn)
            }
        })
    }
}

/// One record of a window, in log order.
#[derive(Debug, Clone, Copy)]
pub enum WindowEntry<'a> {
    Turn(&'a Turn),
    Malformed(&'a MalformedRecord),
}

/// Information about a stored record that could not be decoded.
#[derive(Debug, Clone, Serialize)]
pub struct MalformedRecord {
    /// Absolute index in the message log.
    pub index: u64,
    /// The raw content that failed to parse (truncated if very long).
    pub content: String,
    /// The parse error message.
    pub error: String,
}

impl MalformedRecord {
    /// Maximum content length before truncation.
    const MAX_CONTENT_LEN: usize = 100;

    /// Creates a new MalformedRecord, truncating content if needed.
    pub fn new(index: u64, content: &str, error: String) -> Self {
        let content = if content.len() > Self::MAX_CONTENT_LEN {
            let mut cut = Self::MAX_CONTENT_LEN;
            while !content.is_char_boundary(cut) {
                cut -= 1;
            }
            format!("{}...", &content[..cut])
        } else {
            content.to_string()
        };
        Self {
            index,
            content,
            error,
        }
    }
}

/// Reads turns back from the message log.
#[derive(Clone)]
pub struct TranscriptReader {
    store: Arc<dyn Store>,
    keys: KeySchema,
}

impl TranscriptReader {
    pub fn new(store: Arc<dyn Store>, keys: KeySchema) -> Self {
        Self { store, keys }
    }

    /// Returns the last `max_records` records in append order.
    ///
    /// A conversation that has not written anything yet reads as an empty
    /// window.
    ///
    /// # Errors
    ///
    /// Returns an error only if the store cannot be reached.
    pub async fn read_transcript(
        &self,
        conv: &ConversationId,
        max_records: usize,
    ) -> StoreResult<TranscriptWindow> {
        let key = self.keys.messages_key(conv);
        let slice = self.store.list_tail(&key, max_records).await?;
        Ok(decode_slice(conv, slice))
    }

    /// Returns every record at absolute index `offset` or later.
    pub async fn read_since(
        &self,
        conv: &ConversationId,
        offset: u64,
    ) -> StoreResult<TranscriptWindow> {
        let key = self.keys.messages_key(conv);
        let slice = self.store.list_from(&key, offset).await?;
        Ok(decode_slice(conv, slice))
    }
}

fn decode_slice(conv: &ConversationId, slice: ListSlice) -> TranscriptWindow {
    let mut window = TranscriptWindow {
        start: slice.start,
        total: slice.total,
        ..TranscriptWindow::default()
    };

    for (offset, record) in slice.items.iter().enumerate() {
        let index = slice.start + offset as u64;
        match Turn::from_record(record) {
            Ok(turn) => window.turns.push(turn),
            Err(e) => {
                warn!(conversation = %conv, index, error = %e, "Malformed transcript record");
                window
                    .malformed
                    .push(MalformedRecord::new(index, record, e.to_string()));
            }
        }
    }

    window
}
