use std::sync::Arc;

use tracing::{debug, error};

use crate::google::{FetchResult, HttpClient};

/// Fetches search result pages.
#[derive(Debug, Clone)]
pub struct PageFetcher {
    client: Arc<HttpClient>,
    referer: String,
}

impl PageFetcher {
    pub fn new(client: Arc<HttpClient>, referer: impl Into<String>) -> Self {
        Self {
            client,
            referer: referer.into(),
        }
    }

    /// Downloads the raw text of the page at `url`.
    ///
    /// Failures are logged and reported as `None`; callers treat that as a page
    /// without links.
    pub async fn fetch(&self, url: &str) -> Option<String> {
        match self.try_fetch(url).await {
            Ok(page) => {
                debug!("Fetched {} bytes from {}", page.len(), url);
                Some(page)
            }
            Err(e) => {
                error!(url = %url, error = %e, "error while downloading page {}", url);
                None
            }
        }
    }

    async fn try_fetch(&self, url: &str) -> FetchResult<String> {
        let response = self.client.get(url, Some(&self.referer)).await?;
        Ok(response.text().await?)
    }
}
