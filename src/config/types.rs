use serde::Deserialize;
use std::path::PathBuf;

/// Main configuration structure for Sumi-Sweep
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub engine: EngineConfig,
    #[serde(default)]
    pub pacing: PacingConfig,
    #[serde(rename = "user-agent")]
    pub user_agent: UserAgentConfig,
    #[serde(default)]
    pub fetch: FetchConfig,
    pub output: OutputConfig,
}

/// Worker pool and frontier configuration
#[derive(Debug, Clone, Deserialize)]
pub struct EngineConfig {
    /// Number of concurrent workers
    pub workers: u32,

    /// Directory holding `queue.txt` and `history.txt`
    #[serde(rename = "progress-dir")]
    pub progress_dir: PathBuf,

    /// Worker naming scheme; `{}` is replaced by the 1-based worker index
    #[serde(rename = "name-format", default = "default_name_format")]
    pub name_format: String,

    /// URLs to start from
    pub seeds: Vec<String>,

    /// Consecutive failures after which a single worker gives up
    #[serde(rename = "max-consecutive-failures", default)]
    pub max_consecutive_failures: Option<u32>,

    /// Failures after which a URL is retried at the back of the queue
    /// instead of the front
    #[serde(rename = "max-priority-retries", default)]
    pub max_priority_retries: Option<u32>,
}

fn default_name_format() -> String {
    "Crawler-{}".to_string()
}

/// Randomized delay between requests, in seconds
#[derive(Debug, Clone, Deserialize)]
pub struct PacingConfig {
    #[serde(rename = "mean-seconds")]
    pub mean_seconds: f64,

    #[serde(rename = "std-seconds")]
    pub std_seconds: f64,
}

impl Default for PacingConfig {
    fn default() -> Self {
        Self {
            mean_seconds: 10.0,
            std_seconds: 1.0,
        }
    }
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
pub struct UserAgentConfig {
    /// Name of the crawler
    #[serde(rename = "crawler-name")]
    pub crawler_name: String,

    /// Version of the crawler
    #[serde(rename = "crawler-version")]
    pub crawler_version: String,

    /// URL with information about the crawler
    #[serde(rename = "contact-url")]
    pub contact_url: String,

    /// Email address for crawler-related contact
    #[serde(rename = "contact-email")]
    pub contact_email: String,
}

/// Page fetching behavior
#[derive(Debug, Clone, Deserialize)]
pub struct FetchConfig {
    /// Per-request timeout (seconds)
    #[serde(rename = "request-timeout-secs")]
    pub request_timeout_secs: u64,

    /// Only follow links that stay on the host of the page they were found on
    #[serde(rename = "same-site-only")]
    pub same_site_only: bool,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            request_timeout_secs: 90,
            same_site_only: true,
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Path to the SQLite database receiving extracted records
    #[serde(rename = "database-path")]
    pub database_path: String,
}
