//! Page sources: the per-worker collaborator that turns a URL into records
//!
//! The crawl engine only knows the [`PageSource`] trait. Site-specific
//! extraction lives in implementations of it; this crate ships
//! [`HttpPageSource`], a generic HTML harvester built on `reqwest` and
//! `scraper`.

mod fetcher;
mod http;
mod parser;

pub use fetcher::{build_http_client, fetch_page, FetchError, FetchedPage};
pub use http::{HttpPageSource, PageRecord};
pub use parser::{parse_html, ParsedPage};

/// Result of processing one URL
#[derive(Debug, Clone, PartialEq)]
pub struct Page<R> {
    /// Records extracted from the page, passed verbatim to the sink
    pub records: Vec<R>,

    /// URLs found on the page that should be crawled later
    pub discovered: Vec<String>,
}

impl<R> Page<R> {
    /// Creates a page result
    pub fn new(records: Vec<R>, discovered: Vec<String>) -> Self {
        Self {
            records,
            discovered,
        }
    }

    /// A page that yielded nothing
    pub fn empty() -> Self {
        Self::new(Vec::new(), Vec::new())
    }
}

impl<R> Default for Page<R> {
    fn default() -> Self {
        Self::empty()
    }
}

/// Fetches and parses pages for one worker
///
/// Each worker owns its own source, so implementations may keep per-session
/// state (a browser, a login cookie, a connection) without locking. Lifecycle:
/// `on_start` once, then any number of `fetch_and_parse` calls, each failure
/// followed by `on_parse_error`, and finally `on_exit`.
pub trait PageSource: Send {
    /// Structured value extracted from a page
    type Record: Send + 'static;

    /// Any failure while loading or extracting a page
    type Error: std::error::Error + Send + Sync + 'static;

    /// Runs once before the worker starts claiming URLs
    ///
    /// An error here stops this worker only; it never claims a URL.
    fn on_start(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }

    /// Loads `url` and extracts its records and outgoing links
    fn fetch_and_parse(&mut self, url: &str) -> Result<Page<Self::Record>, Self::Error>;

    /// Best-effort cleanup after a failed attempt (close stray tabs, reset
    /// session state). Cannot fail.
    fn on_parse_error(&mut self) {}

    /// Runs once when the worker stops, whatever the reason
    fn on_exit(&mut self) {}
}
