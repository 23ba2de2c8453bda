//! One read cycle against the store.

use crate::state::{FeedRead, FeedUpdate, PollStatus, TranscriptFeed, ViewerState};
use chrono::Local;
use std::sync::Arc;
use tracing::{debug, warn};
use trialog_core::{ConversationIndex, SummaryReader, TranscriptReader, ViewerConfig};
use trialog_proto::{KeySchema, Store, StoreResult};

/// Reads the conversation list and the selected transcript.
#[derive(Clone)]
pub struct Poller {
    index: ConversationIndex,
    transcripts: TranscriptReader,
    summaries: SummaryReader,
    max_records: usize,
}

impl Poller {
    pub fn new(store: Arc<dyn Store>, keys: KeySchema, config: &ViewerConfig) -> Self {
        Self {
            index: ConversationIndex::new(Arc::clone(&store), keys.clone()),
            transcripts: TranscriptReader::new(Arc::clone(&store), keys.clone()),
            summaries: SummaryReader::new(store, keys),
            max_records: config.max_records,
        }
    }

    /// Runs one cycle and records its outcome in `state.status`.
    ///
    /// A failed cycle leaves everything already displayed untouched; the next
    /// cycle simply tries again.
    pub async fn poll_once(&self, state: &mut ViewerState) {
        state.poll_requested = false;
        match self.cycle(state).await {
            Ok(()) => state.status = PollStatus::Ok { at: Local::now() },
            Err(e) => {
                warn!(error = %e, "Store read failed; keeping current view");
                state.status = PollStatus::Failed {
                    at: Local::now(),
                    error: e.to_string(),
                };
            }
        }
    }

    async fn cycle(&self, state: &mut ViewerState) -> StoreResult<()> {
        let listing = self.index.list_conversations().await?;
        state.conversations.refresh(listing);

        let Some(feed) = state.feed.as_mut() else {
            return Ok(());
        };
        let conv = feed.conversation().clone();

        let mut update = self.read_into(feed).await?;
        if update == FeedUpdate::Restarted {
            update = self.read_into(feed).await?;
        }
        if let FeedUpdate::Appended(n) = update
            && n > 0
        {
            debug!(conversation = %conv, items = n, "Transcript grew");
        }

        if feed.summary.is_none() {
            feed.summary = self.summaries.read_summary(&conv.session).await?;
        }
        Ok(())
    }

    async fn read_into(&self, feed: &mut TranscriptFeed) -> StoreResult<FeedUpdate> {
        let conv = feed.conversation().clone();
        let window = match feed.next_read() {
            FeedRead::Initial => self.transcripts.read_transcript(&conv, self.max_records).await?,
            FeedRead::Since(offset) => self.transcripts.read_since(&conv, offset).await?,
        };
        Ok(feed.apply(&window))
    }
}
