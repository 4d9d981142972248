//! Sink trait and error types
//!
//! A sink consumes the records extracted from each page. Several workers call
//! the same sink concurrently, so implementations must be thread-safe.

use thiserror::Error;

/// Errors that can occur while consuming records
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("Failed to write output: {0}")]
    Write(String),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),
}

/// Result type for sink operations
pub type SinkResult<T> = Result<T, SinkError>;

/// Consumer of extracted records
///
/// `consume` is called once per successfully processed page, possibly with an
/// empty batch, from any worker thread. A failed `consume` makes the engine
/// retry the whole page, so a sink should either write a batch completely or
/// not at all.
pub trait Sink<R>: Send + Sync {
    /// Consumes one page's worth of records
    ///
    /// # Arguments
    ///
    /// * `records` - The records extracted from a single page
    fn consume(&self, records: &[R]) -> SinkResult<()>;
}
