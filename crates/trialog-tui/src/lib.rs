//! # trialog-tui
//!
//! Live terminal viewer for Trialog transcripts.
//!
//! Built with `ratatui` and `crossterm`, this crate provides:
//! - A periodically refreshed list of conversations with their rewards
//! - An append-only, role-grouped view of the selected transcript
//! - Keyboard navigation that survives refreshes

mod app;
pub mod input;
pub mod poller;
pub mod scroll;
pub mod state;
pub mod widgets;

use anyhow::Result;
use app::App;
use std::sync::Arc;
use trialog_core::ViewerConfig;
use trialog_proto::{KeySchema, Store};

pub use app::draw;
pub use poller::Poller;
pub use scroll::ScrollManager;
pub use state::{ConversationList, FeedRead, FeedUpdate, PollStatus, Selection, TranscriptFeed, ViewerState};

/// Handle for running the viewer against a store.
pub struct Viewer {
    poller: Poller,
    config: ViewerConfig,
}

impl Viewer {
    pub fn new(store: Arc<dyn Store>, keys: KeySchema, config: ViewerConfig) -> Self {
        Self {
            poller: Poller::new(store, keys, &config),
            config,
        }
    }

    /// Runs the viewer until the operator quits.
    ///
    /// # Errors
    ///
    /// Returns an error if the terminal cannot be initialized or drawn to.
    /// Store failures never end the viewer; they are shown in the footer.
    pub async fn run(self) -> Result<()> {
        App::new(self.poller, self.config.refresh_interval()).run().await
    }
}
