//! Frontier module for tracking crawl progress
//!
//! The frontier is the single source of truth for what remains to be crawled
//! and what is already done:
//! - `pending`: FIFO queue of URLs, with retries pushed back at the head
//! - `completed`: set of URLs that were processed successfully
//!
//! Both collections are persisted as newline-delimited lists in a progress
//! directory (`queue.txt` and `history.txt`) by [`ProgressStore`].

mod queue;
mod store;

pub use queue::{Frontier, RequeueOutcome};
pub use store::{ProgressStore, HISTORY_FILE, QUEUE_FILE};

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur during frontier operations
#[derive(Debug, Error)]
pub enum FrontierError {
    /// No claimable URL is left. Workers treat this as a benign race.
    #[error("Frontier is empty")]
    Empty,

    #[error("Failed to access {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Corrupt progress file {} at line {line}: {reason}", .path.display())]
    Corrupt {
        path: PathBuf,
        line: usize,
        reason: String,
    },
}

/// Result type for frontier operations
pub type FrontierResult<T> = Result<T, FrontierError>;

/// Which end of the pending queue a URL is pushed to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    /// Tail of the queue (normal discovery)
    Back,
    /// Head of the queue (retry priority)
    Front,
}

/// Point-in-time copy of the frontier, as written to and read from disk
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FrontierSnapshot {
    /// Pending URLs in dequeue order
    pub pending: Vec<String>,

    /// Completed URLs (sorted when produced by [`Frontier::snapshot`])
    pub completed: Vec<String>,
}

impl FrontierSnapshot {
    /// Returns true if there is nothing pending and nothing completed
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty() && self.completed.is_empty()
    }
}

/// Returns true if the entry can be stored as a single line of a progress file
pub(crate) fn is_storable(entry: &str) -> bool {
    !entry.is_empty() && !entry.chars().any(|c| c.is_whitespace() || c.is_control())
}
