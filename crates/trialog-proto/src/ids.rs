//! Identifiers for trials and their transcripts.

use crate::keys::KEY_SEPARATOR;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Opaque identifier for one execution of a trial.
///
/// Disambiguates concurrent or repeated runs of the same task. The key
/// separator never appears inside a valid id, which keeps store keys
/// parseable back into their components.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RunSessionId(String);

impl RunSessionId {
    /// Validates and wraps an externally supplied id.
    pub fn parse(id: impl Into<String>) -> Result<Self> {
        let id = id.into();
        if id.is_empty() {
            return Err(Error::InvalidRunSessionId {
                id,
                reason: "must not be empty",
            });
        }
        if id.contains(KEY_SEPARATOR) {
            return Err(Error::InvalidRunSessionId {
                id,
                reason: "must not contain the key separator ':'",
            });
        }
        if id.chars().any(char::is_whitespace) {
            return Err(Error::InvalidRunSessionId {
                id,
                reason: "must not contain whitespace",
            });
        }
        Ok(Self(id))
    }

    /// Generates a fresh id (UUID v4, 32 lowercase hex characters).
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().simple().to_string())
    }

    /// Returns the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the last six characters, used to tell runs apart in listings.
    pub fn short(&self) -> &str {
        let start = self
            .0
            .char_indices()
            .rev()
            .nth(5)
            .map_or(0, |(idx, _)| idx);
        &self.0[start..]
    }
}

impl fmt::Display for RunSessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for RunSessionId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl TryFrom<String> for RunSessionId {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(value)
    }
}

impl From<RunSessionId> for String {
    fn from(id: RunSessionId) -> Self {
        id.0
    }
}

/// Identifier of a fixed benchmark task definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(pub u64);

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for TaskId {
    type Err = Error;

    /// Accepts only the canonical decimal form, so every accepted string maps
    /// back to itself through `Display` and keys stay one-to-one.
    fn from_str(s: &str) -> Result<Self> {
        let canonical = !s.is_empty()
            && s.bytes().all(|b| b.is_ascii_digit())
            && (s == "0" || !s.starts_with('0'));
        if !canonical {
            return Err(Error::InvalidTaskId(s.to_string()));
        }
        s.parse::<u64>()
            .map(TaskId)
            .map_err(|_| Error::InvalidTaskId(s.to_string()))
    }
}

impl From<u64> for TaskId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

/// One transcript: a task attempted under a specific run session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ConversationId {
    pub session: RunSessionId,
    pub task: TaskId,
}

impl ConversationId {
    pub fn new(session: RunSessionId, task: impl Into<TaskId>) -> Self {
        Self {
            session,
            task: task.into(),
        }
    }
}

impl fmt::Display for ConversationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.session, KEY_SEPARATOR, self.task)
    }
}
