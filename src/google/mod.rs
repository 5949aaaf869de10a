//! Search-provider facing pieces: query construction, HTTP transport, page
//! fetching and link extraction.

pub mod client;
pub mod extractor;
pub mod fetcher;
pub mod query;
pub mod user_agent;

pub use client::{FetchError, FetchResult, HttpClient, HttpClientConfig};
pub use extractor::{DEFAULT_LINK_PATTERN, ImageLinkSet, LinkExtractor, PatternExtractor};
pub use fetcher::PageFetcher;
pub use query::{KeywordPair, SearchUrlBuilder};
pub use user_agent::UserAgentGenerator;
