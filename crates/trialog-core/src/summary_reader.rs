//! Summary reader: polls for a trial's final reward.

use std::sync::Arc;
use tracing::warn;
use trialog_proto::{KeySchema, RunSessionId, Store, StoreResult, SummaryRecord};

/// Reads summary records. Absence means the trial has not completed.
#[derive(Clone)]
pub struct SummaryReader {
    store: Arc<dyn Store>,
    keys: KeySchema,
}

impl SummaryReader {
    pub fn new(store: Arc<dyn Store>, keys: KeySchema) -> Self {
        Self { store, keys }
    }

    /// Returns the summary if the trial has completed.
    ///
    /// A value that does not decode is logged and treated as absent.
    pub async fn read_summary(&self, session: &RunSessionId) -> StoreResult<Option<SummaryRecord>> {
        let key = self.keys.summary_key(session);
        let value = self.store.get(&key).await?;
        Ok(value.and_then(|raw| decode(&key, &raw)))
    }

    /// Reads several summaries in one round trip, one slot per session.
    pub async fn read_summaries(
        &self,
        sessions: &[RunSessionId],
    ) -> StoreResult<Vec<Option<SummaryRecord>>> {
        let keys: Vec<String> = sessions.iter().map(|s| self.keys.summary_key(s)).collect();
        let values = self.store.get_many(&keys).await?;
        Ok(keys
            .iter()
            .zip(values)
            .map(|(key, value)| value.and_then(|raw| decode(key, &raw)))
            .collect())
    }
}

fn decode(key: &str, raw: &str) -> Option<SummaryRecord> {
    match SummaryRecord::from_record(raw) {
        Ok(summary) => Some(summary),
        Err(e) => {
            warn!(key = %key, error = %e, "Malformed summary record");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{MemoryStore, SummaryWriter};

    fn session(id: &str) -> RunSessionId {
        RunSessionId::parse(id).unwrap()
    }

    #[tokio::test]
    async fn absent_before_write() {
        let store = Arc::new(MemoryStore::new());
        let reader = SummaryReader::new(store, KeySchema::default());
        assert_eq!(reader.read_summary(&session("abc")).await.unwrap(), None);
    }

    #[tokio::test]
    async fn zero_reward_is_distinct_from_absent() {
        let store = Arc::new(MemoryStore::new());
        let writer = SummaryWriter::new(store.clone(), KeySchema::default());
        let reader = SummaryReader::new(store, KeySchema::default());

        assert!(writer.set_summary(&session("abc"), 0.0).await.is_ok());
        assert_eq!(
            reader.read_summary(&session("abc")).await.unwrap(),
            Some(SummaryRecord::new(0.0))
        );
    }

    #[tokio::test]
    async fn returns_last_written_reward() {
        let store = Arc::new(MemoryStore::new());
        let writer = SummaryWriter::new(store.clone(), KeySchema::default());
        let reader = SummaryReader::new(store, KeySchema::default());

        assert!(writer.set_summary(&session("abc"), 0.0).await.is_ok());
        assert!(writer.set_summary(&session("abc"), 1.0).await.is_ok());
        assert_eq!(
            reader.read_summary(&session("abc")).await.unwrap().map(|s| s.reward),
            Some(1.0)
        );
    }

    #[tokio::test]
    async fn malformed_summary_reads_as_absent() {
        let store = Arc::new(MemoryStore::new());
        store.set("summary:abc", "reward=1").await.unwrap();
        let reader = SummaryReader::new(store, KeySchema::bare());
        assert_eq!(reader.read_summary(&session("abc")).await.unwrap(), None);
    }

    #[tokio::test]
    async fn batch_read_keeps_slots() {
        let store = Arc::new(MemoryStore::new());
        let writer = SummaryWriter::new(store.clone(), KeySchema::default());
        let reader = SummaryReader::new(store, KeySchema::default());
        assert!(writer.set_summary(&session("b"), 1.0).await.is_ok());

        let summaries = reader
            .read_summaries(&[session("a"), session("b")])
            .await
            .unwrap();
        assert_eq!(summaries, vec![None, Some(SummaryRecord::new(1.0))]);
        assert!(reader.read_summaries(&[]).await.unwrap().is_empty());
    }
}
