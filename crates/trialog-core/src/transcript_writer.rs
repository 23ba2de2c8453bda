//! Transcript writer: appends turns to a conversation's message log.
//!
//! Writing a transcript is diagnostic, never part of a trial's correctness
//! path, so failures are logged and handed back as `WriteOutcome::Degraded`.

use std::sync::Arc;
use tracing::{debug, warn};
use trialog_proto::{ConversationId, KeySchema, Store, Turn, WriteOutcome};

/// Appends turn records to the message log of a conversation.
///
/// Each call is one atomic push, so a batch lands contiguously and concurrent
/// writers on other keys never interleave with it.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use trialog_core::{MemoryStore, TranscriptWriter};
/// use trialog_proto::{ConversationId, KeySchema, RunSessionId, Turn};
///
/// # tokio::runtime::Runtime::new().unwrap().block_on(async {
/// let store = Arc::new(MemoryStore::new());
/// let writer = TranscriptWriter::new(store, KeySchema::default());
///
/// let conv = ConversationId::new(RunSessionId::parse("abc").unwrap(), 7);
/// let outcome = writer.append_turn(&conv, &Turn::user("hello")).await;
/// assert!(outcome.is_ok());
/// # });
/// ```
#[derive(Clone)]
pub struct TranscriptWriter {
    store: Arc<dyn Store>,
    keys: KeySchema,
}

impl TranscriptWriter {
    pub fn new(store: Arc<dyn Store>, keys: KeySchema) -> Self {
        Self { store, keys }
    }

    /// Appends a single turn.
    pub async fn append_turn(&self, conv: &ConversationId, turn: &Turn) -> WriteOutcome {
        self.append_turns(conv, std::slice::from_ref(turn)).await
    }

    /// Appends a batch of turns in order. An empty batch never touches the store.
    pub async fn append_turns(&self, conv: &ConversationId, turns: &[Turn]) -> WriteOutcome {
        if turns.is_empty() {
            return WriteOutcome::Ok;
        }

        let mut records = Vec::with_capacity(turns.len());
        for turn in turns {
            match turn.to_record() {
                Ok(record) => records.push(record),
                Err(e) => {
                    warn!(conversation = %conv, error = %e, "Dropping transcript write: turn failed to encode");
                    return WriteOutcome::degraded(format!("encode failed: {e}"));
                }
            }
        }

        let key = self.keys.messages_key(conv);
        match self.store.append(&key, &records).await {
            Ok(len) => {
                debug!(key = %key, appended = records.len(), len, "Appended turns");
                WriteOutcome::Ok
            }
            Err(e) => {
                warn!(key = %key, turns = records.len(), error = %e, "Dropping transcript write: store unavailable");
                WriteOutcome::degraded(e.to_string())
            }
        }
    }
}
