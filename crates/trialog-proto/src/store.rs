//! Store trait shared by every writer and reader.

use async_trait::async_trait;

/// Errors surfaced by a store backend.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// Connection refused, dropped, or never established.
    #[error("store unreachable: {0}")]
    Unreachable(String),

    /// The operation did not complete within its deadline.
    #[error("store operation `{op}` timed out after {timeout_ms} ms")]
    Timeout { op: &'static str, timeout_ms: u64 },

    /// The store answered with an error.
    #[error("store error: {0}")]
    Backend(String),
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// A contiguous run of list elements read in one snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListSlice {
    /// Absolute index of `items[0]` in the list.
    pub start: u64,
    /// Length of the whole list at read time.
    pub total: u64,
    pub items: Vec<String>,
}

/// Logical operations required from the key-value service.
///
/// Lists are append-only from the caller's point of view. Every method is a
/// single round trip: a slice read observes one consistent snapshot of the
/// list and never a partially appended element.
#[async_trait]
pub trait Store: Send + Sync {
    /// Checks that the store answers.
    async fn ping(&self) -> StoreResult<()>;

    /// Appends `values` to the end of the list at `key` in one atomic push.
    ///
    /// Returns the list length after the push.
    async fn append(&self, key: &str, values: &[String]) -> StoreResult<u64>;

    /// Returns the last `max` elements of the list together with its length.
    ///
    /// A missing key reads as an empty list.
    async fn list_tail(&self, key: &str, max: usize) -> StoreResult<ListSlice>;

    /// Returns every element at absolute index `>= start`.
    ///
    /// If `start` is past the end the slice is empty and `total` tells the
    /// caller where the list actually ends.
    async fn list_from(&self, key: &str, start: u64) -> StoreResult<ListSlice>;

    /// Overwrites the scalar value at `key`.
    async fn set(&self, key: &str, value: &str) -> StoreResult<()>;

    /// Reads the scalar value at `key`.
    async fn get(&self, key: &str) -> StoreResult<Option<String>>;

    /// Reads several scalar values, one slot per key.
    async fn get_many(&self, keys: &[String]) -> StoreResult<Vec<Option<String>>>;

    /// Lists every key starting with `prefix`.
    async fn keys_with_prefix(&self, prefix: &str) -> StoreResult<Vec<String>>;

    /// Removes every key in the database.
    async fn flush(&self) -> StoreResult<()>;
}
