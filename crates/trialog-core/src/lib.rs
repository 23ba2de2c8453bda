//! # trialog-core
//!
//! Core store functionality for the Trialog transcript store.
//!
//! This crate provides:
//! - Store backends: Redis for real sessions, in-memory for tests and dry runs
//! - Configuration loading and management
//! - Transcript and summary writers with best-effort failure handling
//! - Store reset at the start of a benchmark session
//! - Transcript and summary readers that tolerate writes in flight
//! - Conversation listing and transcript reconstruction for viewers

mod config;
mod conversation_index;
mod memory_store;
mod reconstruct;
mod redis_store;
mod reset;
mod summary_reader;
mod summary_writer;
mod transcript_reader;
mod transcript_writer;
mod trial_recorder;

pub use config::{ConfigError, ConfigWarning, StoreConfig, TrialogConfig, ViewerConfig};
pub use conversation_index::{ConversationEntry, ConversationIndex};
pub use memory_store::MemoryStore;
pub use reconstruct::{Correlator, DisplayItem, reconstruct};
pub use redis_store::RedisStore;
pub use reset::{ResetOutcome, reset_store};
pub use summary_reader::SummaryReader;
pub use summary_writer::SummaryWriter;
pub use transcript_reader::{MalformedRecord, TranscriptReader, TranscriptWindow, WindowEntry};
pub use transcript_writer::TranscriptWriter;
pub use trial_recorder::TrialRecorder;
