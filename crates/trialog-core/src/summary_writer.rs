//! Summary writer: records a trial's final reward.

use std::sync::Arc;
use tracing::{debug, warn};
use trialog_proto::{KeySchema, RunSessionId, Store, SummaryRecord, WriteOutcome};

/// Writes the overwritable summary record of a run session.
#[derive(Clone)]
pub struct SummaryWriter {
    store: Arc<dyn Store>,
    keys: KeySchema,
}

impl SummaryWriter {
    pub fn new(store: Arc<dyn Store>, keys: KeySchema) -> Self {
        Self { store, keys }
    }

    /// Overwrites the summary for `session` with `reward`. Idempotent.
    pub async fn set_summary(&self, session: &RunSessionId, reward: f64) -> WriteOutcome {
        // JSON would encode NaN and infinities as null, which no reader can
        // tell apart from a corrupt record.
        if !reward.is_finite() {
            warn!(session = %session, reward, "Dropping summary write: reward is not finite");
            return WriteOutcome::degraded(format!("reward {reward} is not finite"));
        }
        let record = match SummaryRecord::new(reward).to_record() {
            Ok(record) => record,
            Err(e) => {
                warn!(session = %session, reward, error = %e, "Dropping summary write: reward failed to encode");
                return WriteOutcome::degraded(format!("encode failed: {e}"));
            }
        };

        let key = self.keys.summary_key(session);
        match self.store.set(&key, &record).await {
            Ok(()) => {
                debug!(key = %key, reward, "Wrote summary");
                WriteOutcome::Ok
            }
            Err(e) => {
                warn!(key = %key, reward, error = %e, "Dropping summary write: store unavailable");
                WriteOutcome::degraded(e.to_string())
            }
        }
    }
}
