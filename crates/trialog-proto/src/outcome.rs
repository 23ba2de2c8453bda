//! Outcome of a best-effort write.

use std::fmt;

/// Result of a logging-path write.
///
/// Transcript and summary writes run alongside a trial whose correctness does
/// not depend on them, so failures are carried as a value rather than an error.
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use]
pub enum WriteOutcome {
    /// The write reached the store.
    Ok,
    /// The write was dropped.
    Degraded { reason: String },
}

impl WriteOutcome {
    pub fn degraded(reason: impl Into<String>) -> Self {
        Self::Degraded {
            reason: reason.into(),
        }
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, Self::Ok)
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self, Self::Degraded { .. })
    }
}

impl fmt::Display for WriteOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ok => f.write_str("ok"),
            Self::Degraded { reason } => write!(f, "degraded: {reason}"),
        }
    }
}
