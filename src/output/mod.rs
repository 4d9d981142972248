//! Output module: where extracted records go
//!
//! This module handles:
//! - The [`Sink`] trait the crawl engine writes through
//! - Composing sinks into a [`Pipeline`]
//! - Persisting page records to SQLite
//! - Summarizing progress for `--stats`

mod pipeline;
mod schema;
mod sqlite;
pub mod stats;
mod traits;

pub use pipeline::{MemorySink, Pipeline};
pub use sqlite::SqliteSink;
pub use stats::{load_statistics, print_statistics, CrawlStatistics};
pub use traits::{Sink, SinkError, SinkResult};
