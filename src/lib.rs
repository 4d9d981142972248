//! Sumi-Sweep: a resumable, multi-worker page harvester
//!
//! This crate crawls pages from a set of seed URLs, hands each page to a
//! [`PageSource`](source::PageSource) that extracts records, and feeds those
//! records to a [`Sink`](output::Sink). Progress lives in a small on-disk
//! frontier (`queue.txt` + `history.txt`) so an interrupted crawl picks up
//! where it left off.

pub mod config;
pub mod crawler;
pub mod frontier;
pub mod output;
pub mod source;
pub mod url;

use thiserror::Error;

/// Main error type for Sumi-Sweep operations
#[derive(Debug, Error)]
pub enum SweepError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Frontier error: {0}")]
    Frontier(#[from] frontier::FrontierError),

    #[error("Sink error: {0}")]
    Sink(#[from] output::SinkError),

    #[error("Fetch error: {0}")]
    Fetch(#[from] source::FetchError),

    #[error("URL error: {0}")]
    UrlError(#[from] UrlError),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("Worker {name} failed: {message}")]
    Worker { name: String, message: String },
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Missing domain in URL")]
    MissingDomain,

    #[error("Malformed URL: {0}")]
    Malformed(String),
}

/// Result type alias for Sumi-Sweep operations
pub type Result<T> = std::result::Result<T, SweepError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{Orchestrator, RunReport, TerminationSignal};
pub use frontier::{Frontier, ProgressStore, Side};
pub use output::Sink;
pub use source::{Page, PageSource};
