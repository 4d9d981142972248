//! HTML parser for extracting links and metadata
//!
//! This module handles parsing HTML content to extract:
//! - Links to follow (from <a> tags and canonical links)
//! - Page title
//! - Meta description and embedded image URLs

use scraper::{Html, Selector};
use std::collections::HashSet;
use url::Url;

/// Extracted information from an HTML page
#[derive(Debug, Clone, Default)]
pub struct ParsedPage {
    /// The page title (from <title> tag)
    pub title: Option<String>,

    /// The meta description, or the OpenGraph description as a fallback
    pub description: Option<String>,

    /// Absolute URLs of images embedded in the page
    pub images: Vec<String>,

    /// All links found on the page (absolute URLs)
    pub links: Vec<String>,
}

/// Parses HTML content and extracts links and metadata
///
/// # Link Extraction Rules
///
/// **Include:**
/// - `<a href="...">` tags in body, nav, header, footer
/// - `<link rel="canonical" href="...">`
///
/// **Exclude:**
/// - `<link rel="stylesheet" ...>`
/// - `<script src="...">`
/// - `<a href="..." download>`
/// - `javascript:`, `mailto:`, `tel:` links
/// - Data URIs and any other non-HTTP(S) target
/// - Fragment-only references (`#section`)
///
/// Links and images are deduplicated, keeping the first occurrence. Image
/// sources (`<img src>`) are collected separately and are never followed as
/// links.
///
/// # Arguments
///
/// * `html` - The HTML content to parse
/// * `base_url` - The base URL for resolving relative links
///
/// # Example
///
/// ```
/// use sumi_sweep::source::parse_html;
/// use url::Url;
///
/// let html = r#"<html><head><title>Test</title></head><body><a href="/page">Link</a></body></html>"#;
/// let base_url = Url::parse("https://example.com/").unwrap();
/// let parsed = parse_html(html, &base_url);
/// assert_eq!(parsed.title, Some("Test".to_string()));
/// assert_eq!(parsed.links, vec!["https://example.com/page".to_string()]);
/// ```
pub fn parse_html(html: &str, base_url: &Url) -> ParsedPage {
    let document = Html::parse_document(html);

    ParsedPage {
        title: extract_title(&document),
        description: extract_description(&document),
        images: extract_images(&document, base_url),
        links: extract_links(&document, base_url),
    }
}

/// Extracts the page title from the HTML document
fn extract_title(document: &Html) -> Option<String> {
    let title_selector = Selector::parse("title").ok()?;

    document
        .select(&title_selector)
        .next()
        .map(|element| element.text().collect::<String>().trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Extracts the page description from meta tags
fn extract_description(document: &Html) -> Option<String> {
    ["meta[name='description']", "meta[property='og:description']"]
        .iter()
        .filter_map(|selector| Selector::parse(selector).ok())
        .find_map(|selector| {
            document
                .select(&selector)
                .filter_map(|element| element.value().attr("content"))
                .map(|content| content.trim().to_string())
                .find(|content| !content.is_empty())
        })
}

/// Extracts absolute image URLs, without duplicates
fn extract_images(document: &Html, base_url: &Url) -> Vec<String> {
    collect_urls(document, "img[src]", "src", base_url)
}

/// Extracts followable links (anchors and the canonical link), without duplicates
fn extract_links(document: &Html, base_url: &Url) -> Vec<String> {
    collect_urls(
        document,
        "a[href]:not([download]), link[rel='canonical'][href]",
        "href",
        base_url,
    )
}

/// Resolves `attr` of every element matching `selector`, in document order
fn collect_urls(document: &Html, selector: &str, attr: &str, base_url: &Url) -> Vec<String> {
    let Ok(selector) = Selector::parse(selector) else {
        return Vec::new();
    };

    let mut seen = HashSet::new();
    document
        .select(&selector)
        .filter_map(|element| element.value().attr(attr))
        .filter_map(|value| resolve_link(value, base_url))
        .map(String::from)
        .filter(|url| seen.insert(url.clone()))
        .collect()
}

/// Resolves an attribute value against the page URL
///
/// Fragment-only references point back at the page itself. Anything that does
/// not resolve to HTTP(S), such as `javascript:`, `mailto:`, `tel:` or `data:`,
/// is dropped.
fn resolve_link(href: &str, base_url: &Url) -> Option<Url> {
    let href = href.trim();
    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    base_url
        .join(href)
        .ok()
        .filter(|url| matches!(url.scheme(), "http" | "https"))
}
