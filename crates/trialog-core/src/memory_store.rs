//! In-process store with the same contract as the Redis backend.
//!
//! Used by tests and `--memory` dry runs. Every operation takes the single
//! lock once, so slice reads are consistent snapshots just like a pipelined
//! Redis read.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use trialog_proto::{ListSlice, Store, StoreError, StoreResult};

#[derive(Debug, Clone)]
enum Entry {
    List(Vec<String>),
    Scalar(String),
}

/// Thread-safe in-memory key-value store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, Entry>>,
    unreachable: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent operation fail as if the store were down.
    pub fn set_unreachable(&self, unreachable: bool) {
        self.unreachable.store(unreachable, Ordering::SeqCst);
    }

    /// Number of keys currently held.
    pub fn len(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Stores a raw list element, bypassing encoding. Lets tests plant
    /// records that a reader cannot decode.
    pub fn push_raw(&self, key: &str, value: &str) -> StoreResult<()> {
        let mut entries = self.lock()?;
        match entries
            .entry(key.to_string())
            .or_insert_with(|| Entry::List(Vec::new()))
        {
            Entry::List(items) => {
                items.push(value.to_string());
                Ok(())
            }
            Entry::Scalar(_) => Err(wrong_type(key)),
        }
    }

    fn lock(&self) -> StoreResult<std::sync::MutexGuard<'_, HashMap<String, Entry>>> {
        if self.unreachable.load(Ordering::SeqCst) {
            return Err(StoreError::Unreachable(
                "connection refused (memory store marked unreachable)".to_string(),
            ));
        }
        self.entries
            .lock()
            .map_err(|_| StoreError::Backend("memory store lock poisoned".to_string()))
    }
}

fn wrong_type(key: &str) -> StoreError {
    StoreError::Backend(format!(
        "WRONGTYPE operation against key '{key}' holding the wrong kind of value"
    ))
}

fn slice_from(items: &[String], start: usize) -> ListSlice {
    let begin = start.min(items.len());
    ListSlice {
        start: start as u64,
        total: items.len() as u64,
        items: items[begin..].to_vec(),
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn ping(&self) -> StoreResult<()> {
        self.lock().map(|_| ())
    }

    async fn append(&self, key: &str, values: &[String]) -> StoreResult<u64> {
        let mut entries = self.lock()?;
        match entries
            .entry(key.to_string())
            .or_insert_with(|| Entry::List(Vec::new()))
        {
            Entry::List(items) => {
                items.extend(values.iter().cloned());
                Ok(items.len() as u64)
            }
            Entry::Scalar(_) => Err(wrong_type(key)),
        }
    }

    async fn list_tail(&self, key: &str, max: usize) -> StoreResult<ListSlice> {
        let entries = self.lock()?;
        match entries.get(key) {
            None => Ok(ListSlice::default()),
            Some(Entry::List(items)) => {
                if max == 0 {
                    return Ok(ListSlice {
                        start: items.len() as u64,
                        total: items.len() as u64,
                        items: Vec::new(),
                    });
                }
                Ok(slice_from(items, items.len().saturating_sub(max)))
            }
            Some(Entry::Scalar(_)) => Err(wrong_type(key)),
        }
    }

    async fn list_from(&self, key: &str, start: u64) -> StoreResult<ListSlice> {
        let entries = self.lock()?;
        match entries.get(key) {
            None => Ok(ListSlice {
                start,
                total: 0,
                items: Vec::new(),
            }),
            Some(Entry::List(items)) => Ok(slice_from(items, start as usize)),
            Some(Entry::Scalar(_)) => Err(wrong_type(key)),
        }
    }

    async fn set(&self, key: &str, value: &str) -> StoreResult<()> {
        self.lock()?
            .insert(key.to_string(), Entry::Scalar(value.to_string()));
        Ok(())
    }

    async fn get(&self, key: &str) -> StoreResult<Option<String>> {
        let entries = self.lock()?;
        match entries.get(key) {
            None => Ok(None),
            Some(Entry::Scalar(value)) => Ok(Some(value.clone())),
            Some(Entry::List(_)) => Err(wrong_type(key)),
        }
    }

    async fn get_many(&self, keys: &[String]) -> StoreResult<Vec<Option<String>>> {
        let entries = self.lock()?;
        // MGET semantics: non-string values read as missing.
        Ok(keys
            .iter()
            .map(|key| match entries.get(key) {
                Some(Entry::Scalar(value)) => Some(value.clone()),
                _ => None,
            })
            .collect())
    }

    async fn keys_with_prefix(&self, prefix: &str) -> StoreResult<Vec<String>> {
        let entries = self.lock()?;
        Ok(entries
            .keys()
            .filter(|key| key.starts_with(prefix))
            .cloned()
            .collect())
    }

    async fn flush(&self) -> StoreResult<()> {
        self.lock()?.clear();
        Ok(())
    }
}
