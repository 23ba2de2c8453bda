//! Per-trial recorder handed to a trial executor.
//!
//! `TrialRecorder` binds the transcript and summary writers to one
//! conversation so the executor only supplies turns and, at the end, the
//! reward. It never fails: every write is best effort and the recorder keeps
//! count of how many were dropped.

use crate::{SummaryWriter, TranscriptWriter};
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use tracing::{info, warn};
use trialog_proto::{ConversationId, KeySchema, RunSessionId, Store, TaskId, Turn, WriteOutcome};

/// Records one trial's transcript and final reward.
pub struct TrialRecorder {
    conversation: ConversationId,
    transcript: TranscriptWriter,
    summary: SummaryWriter,
    turns_written: AtomicU32,
    writes_dropped: AtomicU32,
}

impl TrialRecorder {
    /// Creates a recorder for `task` under a freshly generated run session id.
    pub fn start(store: Arc<dyn Store>, keys: KeySchema, task: impl Into<TaskId>) -> Self {
        Self::for_conversation(
            store,
            keys,
            ConversationId::new(RunSessionId::generate(), task),
        )
    }

    /// Creates a recorder for an existing conversation id.
    pub fn for_conversation(store: Arc<dyn Store>, keys: KeySchema, conversation: ConversationId) -> Self {
        Self {
            transcript: TranscriptWriter::new(Arc::clone(&store), keys.clone()),
            summary: SummaryWriter::new(store, keys),
            conversation,
            turns_written: AtomicU32::new(0),
            writes_dropped: AtomicU32::new(0),
        }
    }

    pub fn conversation(&self) -> &ConversationId {
        &self.conversation
    }

    /// Records a single turn.
    pub async fn record_turn(&self, turn: &Turn) -> WriteOutcome {
        self.record_turns(std::slice::from_ref(turn)).await
    }

    /// Records a batch of turns produced by one step.
    pub async fn record_turns(&self, turns: &[Turn]) -> WriteOutcome {
        let outcome = self.transcript.append_turns(&self.conversation, turns).await;
        self.track(&outcome, turns.len() as u32);
        outcome
    }

    /// Records the final reward. Call once, when the trial completes.
    pub async fn finish(&self, reward: f64) -> WriteOutcome {
        let outcome = self
            .summary
            .set_summary(&self.conversation.session, reward)
            .await;
        self.track(&outcome, 0);

        let dropped = self.writes_dropped();
        if dropped > 0 {
            warn!(
                conversation = %self.conversation,
                dropped,
                "Trial finished with dropped transcript writes; its transcript is incomplete"
            );
        } else {
            info!(
                conversation = %self.conversation,
                reward,
                turns = self.turns_written(),
                "Trial recorded"
            );
        }
        outcome
    }

    /// Turns successfully written so far.
    pub fn turns_written(&self) -> u32 {
        self.turns_written.load(Ordering::Relaxed)
    }

    /// Writes dropped so far because the store was unavailable.
    pub fn writes_dropped(&self) -> u32 {
        self.writes_dropped.load(Ordering::Relaxed)
    }

    fn track(&self, outcome: &WriteOutcome, turns: u32) {
        match outcome {
            WriteOutcome::Ok => {
                self.turns_written.fetch_add(turns, Ordering::Relaxed);
            }
            WriteOutcome::Degraded { .. } => {
                self.writes_dropped.fetch_add(1, Ordering::Relaxed);
            }
        }
    }
}
