//! # trialog-proto
//!
//! Shared types, error definitions, and traits for the Trialog transcript store.
//!
//! This crate provides the foundational abstractions used across all Trialog crates,
//! including:
//! - Run session, task, and conversation identifiers
//! - Turn records and the trial summary record
//! - The key schema that maps conversations onto store keys
//! - The `Store` trait every component takes as an injected collaborator
//! - Write outcomes for best-effort logging

mod error;
mod ids;
mod keys;
mod outcome;
mod store;
mod turn;

pub use error::{Error, Result};
pub use ids::{ConversationId, RunSessionId, TaskId};
pub use keys::{DEFAULT_NAMESPACE, KEY_SEPARATOR, KeySchema};
pub use outcome::WriteOutcome;
pub use store::{ListSlice, Store, StoreError, StoreResult};
pub use turn::{Role, SummaryRecord, ToolCall, Turn};
