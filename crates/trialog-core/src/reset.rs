//! Store reset, run once at the start of a benchmark session.

use std::fmt;
use tracing::{error, info};
use trialog_proto::Store;

/// Result of wiping the store.
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use]
pub enum ResetOutcome {
    Cleared,
    /// The store could not be cleared. Data from the previous session may
    /// still be visible to viewers.
    Failed { reason: String },
}

impl ResetOutcome {
    pub fn is_cleared(&self) -> bool {
        matches!(self, Self::Cleared)
    }
}

impl fmt::Display for ResetOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cleared => f.write_str("store cleared"),
            Self::Failed { reason } => write!(
                f,
                "store reset failed ({reason}); transcripts from a previous session may still be shown"
            ),
        }
    }
}

/// Removes every key in the store's database, not just the namespace.
///
/// Only safe because the database is dedicated to benchmark transcripts.
/// Must run before any writer starts.
pub async fn reset_store(store: &dyn Store) -> ResetOutcome {
    match store.flush().await {
        Ok(()) => {
            info!("Store reset: all keys removed");
            ResetOutcome::Cleared
        }
        Err(e) => {
            error!(error = %e, "Store reset failed; stale transcripts may remain visible");
            ResetOutcome::Failed {
                reason: e.to_string(),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MemoryStore;

    #[tokio::test]
    async fn reset_removes_all_keys() {
        let store = MemoryStore::new();
        store.set("unrelated", "x").await.unwrap();
        store
            .append("tau_bench:messages:abc:7", &["{}".to_string()])
            .await
            .unwrap();

        assert!(reset_store(&store).await.is_cleared());
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn reset_failure_is_reported_not_raised() {
        let store = MemoryStore::new();
        store.set("k", "v").await.unwrap();
        store.set_unreachable(true);

        let outcome = reset_store(&store).await;
        assert!(!outcome.is_cleared());
        assert!(outcome.to_string().contains("previous session"));

        store.set_unreachable(false);
        assert_eq!(store.len(), 1);
    }
}
