//! URL handling module for Sumi-Sweep
//!
//! This module provides URL normalization and host comparison for links
//! discovered on crawled pages.

mod domain;
mod normalize;

// Re-export main functions
pub use domain::{extract_domain, same_site};
pub use normalize::normalize_url;
