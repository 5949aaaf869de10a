//! Image link extraction from search result markup.
//!
//! The results page embeds one JSON-like metadata blob per thumbnail; the
//! original image address sits under the `ou` key. Extraction is a plain
//! pattern match, so anything shaped like that annotation is accepted.

use std::collections::HashSet;

use lazy_static::lazy_static;
use regex::Regex;
use tracing::{debug, info};

/// Pattern matching the `"ou":"<url>"` annotation of the results page.
pub const DEFAULT_LINK_PATTERN: &str = r#""ou":"(.*?)""#;

lazy_static! {
    static ref DEFAULT_LINK_REGEX: Regex = Regex::new(DEFAULT_LINK_PATTERN).unwrap();
}

/// Deduplicated image URLs found on one results page.
pub type ImageLinkSet = HashSet<String>;

/// Strategy turning page text into candidate image URLs.
pub trait LinkExtractor: Send + Sync {
    /// Short name used in log output.
    fn name(&self) -> &str;

    fn extract(&self, page: &str) -> ImageLinkSet;
}

/// Collects the first capture group of every non-overlapping match.
#[derive(Debug, Clone)]
pub struct PatternExtractor {
    pattern: Regex,
}

impl PatternExtractor {
    pub fn new(pattern: &str) -> Result<Self, regex::Error> {
        Ok(Self {
            pattern: Regex::new(pattern)?,
        })
    }
}

impl Default for PatternExtractor {
    fn default() -> Self {
        Self {
            pattern: DEFAULT_LINK_REGEX.clone(),
        }
    }
}

impl LinkExtractor for PatternExtractor {
    fn name(&self) -> &str {
        self.pattern.as_str()
    }

    fn extract(&self, page: &str) -> ImageLinkSet {
        let mut matches = 0usize;
        let links: ImageLinkSet = self
            .pattern
            .captures_iter(page)
            .filter_map(|caps| caps.get(1))
            .inspect(|_| matches += 1)
            .map(|m| m.as_str().to_string())
            .collect();

        if links.is_empty() {
            info!("get 0 links from page");
        } else {
            debug!("get {} links ({} distinct) from page", matches, links.len());
        }
        links
    }
}
