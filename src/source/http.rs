//! Generic HTML page source
//!
//! Fetches each URL with `reqwest`, extracts a [`PageRecord`] (title,
//! description, images) and returns the page's outgoing links as discovered
//! URLs. Workers are plain OS threads, so the async client is driven through a
//! tokio runtime handle.

use crate::source::fetcher::{fetch_page, FetchError};
use crate::source::parser::parse_html;
use crate::source::{Page, PageSource};
use crate::url::{normalize_url, same_site};
use chrono::{DateTime, Utc};
use reqwest::Client;
use std::collections::HashSet;
use tokio::runtime::Handle;

/// Record extracted from one HTML page
#[derive(Debug, Clone, PartialEq)]
pub struct PageRecord {
    /// URL that was claimed from the frontier
    pub url: String,

    /// URL after redirects
    pub final_url: String,

    /// HTTP status code
    pub status_code: u16,

    /// Page title (if available)
    pub title: Option<String>,

    /// Meta description (if available)
    pub description: Option<String>,

    /// Embedded image URLs
    pub images: Vec<String>,

    /// When the page was fetched
    pub fetched_at: DateTime<Utc>,
}

/// HTTP-backed [`PageSource`], one per worker
#[derive(Debug)]
pub struct HttpPageSource {
    name: String,
    client: Client,
    runtime: Handle,
    same_site_only: bool,
    pages_fetched: u64,
}

impl HttpPageSource {
    /// Creates a source for the named worker
    ///
    /// # Arguments
    ///
    /// * `name` - Worker name, used in log lines
    /// * `client` - Shared HTTP client (cheap to clone)
    /// * `runtime` - Handle of the runtime that drives the client
    /// * `same_site_only` - Drop links that leave the page's host
    pub fn new(name: impl Into<String>, client: Client, runtime: Handle, same_site_only: bool) -> Self {
        Self {
            name: name.into(),
            client,
            runtime,
            same_site_only,
            pages_fetched: 0,
        }
    }

    /// Returns the number of pages fetched successfully so far
    pub fn pages_fetched(&self) -> u64 {
        self.pages_fetched
    }
}

impl PageSource for HttpPageSource {
    type Record = PageRecord;
    type Error = FetchError;

    fn on_start(&mut self) -> Result<(), FetchError> {
        tracing::debug!("{}: HTTP source ready", self.name);
        Ok(())
    }

    fn fetch_and_parse(&mut self, url: &str) -> Result<Page<PageRecord>, FetchError> {
        let fetched = self.runtime.block_on(fetch_page(&self.client, url))?;
        let parsed = parse_html(&fetched.body, &fetched.final_url);

        let mut seen = HashSet::new();
        let mut discovered = Vec::new();
        for link in &parsed.links {
            let normalized = match normalize_url(link) {
                Ok(n) => n,
                Err(e) => {
                    tracing::debug!("Failed to normalize URL {}: {}", link, e);
                    continue;
                }
            };

            if self.same_site_only && !same_site(&normalized, &fetched.final_url) {
                continue;
            }

            let normalized = normalized.to_string();
            if normalized == url || !seen.insert(normalized.clone()) {
                continue;
            }
            discovered.push(normalized);
        }

        self.pages_fetched += 1;
        tracing::debug!(
            "{}: fetched {} ({} links kept of {})",
            self.name,
            url,
            discovered.len(),
            parsed.links.len()
        );

        let record = PageRecord {
            url: url.to_string(),
            final_url: fetched.final_url.to_string(),
            status_code: fetched.status_code,
            title: parsed.title,
            description: parsed.description,
            images: parsed.images,
            fetched_at: Utc::now(),
        };

        Ok(Page::new(vec![record], discovered))
    }

    fn on_parse_error(&mut self) {
        tracing::trace!("{}: discarding state of failed request", self.name);
    }

    fn on_exit(&mut self) {
        tracing::debug!(
            "{}: HTTP source closed after {} pages",
            self.name,
            self.pages_fetched
        );
    }
}
