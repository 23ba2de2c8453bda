//! Enumerates known conversations from the message-log keys.

use crate::SummaryReader;
use serde::Serialize;
use std::sync::Arc;
use tracing::debug;
use trialog_proto::{ConversationId, KeySchema, Store, StoreResult, SummaryRecord};

/// A conversation found in the store, with its reward once the trial is done.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConversationEntry {
    pub conversation: ConversationId,
    pub summary: Option<SummaryRecord>,
}

impl ConversationEntry {
    /// Listing label, e.g. `Task ID 7, 3f9a2c, reward: 1`.
    pub fn label(&self) -> String {
        let base = format!(
            "Task ID {}, {}",
            self.conversation.task,
            self.conversation.session.short()
        );
        match self.summary {
            Some(summary) => format!("{base}, reward: {}", summary.reward),
            None => base,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.summary.is_some()
    }
}

/// Lists conversations by scanning message-log keys.
#[derive(Clone)]
pub struct ConversationIndex {
    store: Arc<dyn Store>,
    keys: KeySchema,
    summaries: SummaryReader,
}

impl ConversationIndex {
    pub fn new(store: Arc<dyn Store>, keys: KeySchema) -> Self {
        let summaries = SummaryReader::new(Arc::clone(&store), keys.clone());
        Self {
            store,
            keys,
            summaries,
        }
    }

    /// Returns every conversation with at least one record, sorted by task
    /// id then run session id.
    pub async fn list_conversations(&self) -> StoreResult<Vec<ConversationEntry>> {
        let raw_keys = self
            .store
            .keys_with_prefix(self.keys.messages_prefix())
            .await?;

        let mut conversations: Vec<ConversationId> = raw_keys
            .iter()
            .filter_map(|key| {
                let parsed = self.keys.parse_messages_key(key);
                if parsed.is_none() {
                    debug!(key = %key, "Skipping unparseable message-log key");
                }
                parsed
            })
            .collect();
        conversations.sort_by(|a, b| a.task.cmp(&b.task).then_with(|| a.session.cmp(&b.session)));
        conversations.dedup();

        let sessions: Vec<_> = conversations.iter().map(|c| c.session.clone()).collect();
        let summaries = self.summaries.read_summaries(&sessions).await?;

        Ok(conversations
            .into_iter()
            .zip(summaries)
            .map(|(conversation, summary)| ConversationEntry {
                conversation,
                summary,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{MemoryStore, SummaryWriter, TranscriptWriter};
    use trialog_proto::{RunSessionId, Turn};

    fn conv(session: &str, task: u64) -> ConversationId {
        ConversationId::new(RunSessionId::parse(session).unwrap(), task)
    }

    #[tokio::test]
    async fn lists_sorted_with_rewards() {
        let store = Arc::new(MemoryStore::new());
        let keys = KeySchema::default();
        let writer = TranscriptWriter::new(store.clone(), keys.clone());
        let summaries = SummaryWriter::new(store.clone(), keys.clone());

        for c in [conv("zzz", 2), conv("bbb", 7), conv("aaa", 7)] {
            assert!(writer.append_turn(&c, &Turn::user("hi")).await.is_ok());
        }
        assert!(summaries.set_summary(&conv("bbb", 7).session, 1.0).await.is_ok());
        // Unrelated and foreign keys are ignored.
        store.set("other", "x").await.unwrap();
        store
            .append("tau_bench:messages:broken", &["{}".to_string()])
            .await
            .unwrap();

        let index = ConversationIndex::new(store, keys);
        let entries = index.list_conversations().await.unwrap();
        let ids: Vec<_> = entries.iter().map(|e| e.conversation.to_string()).collect();
        assert_eq!(ids, vec!["zzz:2", "aaa:7", "bbb:7"]);
        assert!(!entries[1].is_complete());
        assert_eq!(entries[2].summary, Some(SummaryRecord::new(1.0)));
    }

    #[tokio::test]
    async fn empty_store_lists_nothing() {
        let index = ConversationIndex::new(Arc::new(MemoryStore::new()), KeySchema::default());
        assert!(index.list_conversations().await.unwrap().is_empty());
    }

    #[test]
    fn label_shows_short_id_and_reward() {
        let mut entry = ConversationEntry {
            conversation: conv("0123456789abcdef", 7),
            summary: None,
        };
        assert_eq!(entry.label(), "Task ID 7, abcdef");

        entry.summary = Some(SummaryRecord::new(1.0));
        assert_eq!(entry.label(), "Task ID 7, abcdef, reward: 1");
    }
}
