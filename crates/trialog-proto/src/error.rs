//! Error types shared across Trialog crates.

/// Errors raised when constructing or decoding protocol values.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid run session id {id:?}: {reason}")]
    InvalidRunSessionId { id: String, reason: &'static str },

    #[error("invalid task id {0:?}")]
    InvalidTaskId(String),

    #[error("invalid namespace tag {tag:?}: {reason}")]
    InvalidNamespace { tag: String, reason: &'static str },

    #[error("record codec error: {0}")]
    Codec(#[from] serde_json::Error),
}

/// Result alias using the protocol error.
pub type Result<T> = std::result::Result<T, Error>;
