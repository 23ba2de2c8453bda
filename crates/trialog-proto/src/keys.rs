//! Key schema mapping conversations onto store keys.
//!
//! Message logs live at `<ns>:messages:<run_session_id>:<task_id>` and summaries
//! at `<ns>:summary:<run_session_id>`. With no namespace tag the keys start
//! directly at `messages:` / `summary:`.

use crate::{ConversationId, Error, Result, RunSessionId, TaskId};

/// Separator between key components.
pub const KEY_SEPARATOR: char = ':';

/// Namespace tag used when none is configured.
pub const DEFAULT_NAMESPACE: &str = "tau_bench";

const MESSAGES: &str = "messages";
const SUMMARY: &str = "summary";

/// Pure mapping between identifiers and store keys.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeySchema {
    messages_prefix: String,
    summary_prefix: String,
}

impl KeySchema {
    /// Creates a schema under the given namespace tag.
    ///
    /// The tag may contain the separator (it is matched as a whole prefix) but
    /// must not contain glob metacharacters, since key listings are prefix
    /// scans.
    pub fn new(namespace: Option<&str>) -> Result<Self> {
        let root = match namespace {
            None => String::new(),
            Some(tag) => {
                if tag.is_empty() {
                    return Err(Error::InvalidNamespace {
                        tag: tag.to_string(),
                        reason: "must not be empty",
                    });
                }
                if tag.contains(['*', '?', '[', ']', '\\']) {
                    return Err(Error::InvalidNamespace {
                        tag: tag.to_string(),
                        reason: "must not contain glob metacharacters",
                    });
                }
                format!("{tag}{KEY_SEPARATOR}")
            }
        };
        Ok(Self {
            messages_prefix: format!("{root}{MESSAGES}{KEY_SEPARATOR}"),
            summary_prefix: format!("{root}{SUMMARY}{KEY_SEPARATOR}"),
        })
    }

    /// Schema with no namespace tag.
    pub fn bare() -> Self {
        Self {
            messages_prefix: format!("{MESSAGES}{KEY_SEPARATOR}"),
            summary_prefix: format!("{SUMMARY}{KEY_SEPARATOR}"),
        }
    }

    /// Key of the append-only message log for one conversation.
    pub fn messages_key(&self, conv: &ConversationId) -> String {
        format!(
            "{}{}{KEY_SEPARATOR}{}",
            self.messages_prefix, conv.session, conv.task
        )
    }

    /// Key of the summary record for one run session.
    pub fn summary_key(&self, session: &RunSessionId) -> String {
        format!("{}{}", self.summary_prefix, session)
    }

    /// Prefix shared by every message-log key.
    pub fn messages_prefix(&self) -> &str {
        &self.messages_prefix
    }

    /// Prefix shared by every summary key.
    pub fn summary_prefix(&self) -> &str {
        &self.summary_prefix
    }

    /// Recovers the conversation from a message-log key.
    ///
    /// Returns `None` for keys outside this schema's namespace or whose
    /// components do not parse.
    pub fn parse_messages_key(&self, key: &str) -> Option<ConversationId> {
        let rest = key.strip_prefix(&self.messages_prefix)?;
        let (session, task) = rest.split_once(KEY_SEPARATOR)?;
        let session = RunSessionId::parse(session).ok()?;
        let task = task.parse::<TaskId>().ok()?;
        Some(ConversationId { session, task })
    }

    /// Recovers the run session from a summary key.
    pub fn parse_summary_key(&self, key: &str) -> Option<RunSessionId> {
        let rest = key.strip_prefix(&self.summary_prefix)?;
        RunSessionId::parse(rest).ok()
    }
}

impl Default for KeySchema {
    fn default() -> Self {
        Self {
            messages_prefix: format!("{DEFAULT_NAMESPACE}{KEY_SEPARATOR}{MESSAGES}{KEY_SEPARATOR}"),
            summary_prefix: format!("{DEFAULT_NAMESPACE}{KEY_SEPARATOR}{SUMMARY}{KEY_SEPARATOR}"),
        }
    }
}
