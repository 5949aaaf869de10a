use std::time::Duration;

use reqwest::header::{REFERER, USER_AGENT};
use reqwest::{Client, Response, StatusCode};
use thiserror::Error;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::google::UserAgentGenerator;

/// Upper bound for a single backoff sleep.
const MAX_BACKOFF_MS: u64 = 60_000;

/// Error types for outbound HTTP requests
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("Request error: {0}")]
    Request(#[from] reqwest::Error),

    #[error("HTTP error {status} for {url}")]
    Status { url: String, status: StatusCode },

    #[error("Client error: {0}")]
    Client(String),
}

/// Result type for fetch operations
pub type FetchResult<T> = Result<T, FetchError>;

/// Transport settings shared by the page fetcher and the image downloader.
#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    /// Verify TLS certificates. Disabling affects only clients built from this config.
    pub verify_tls: bool,
    /// Whole-request timeout
    pub timeout: Duration,
    /// Total attempts per request, including the first one
    pub retry_attempts: usize,
    /// Delay before the first retry; doubled for every further retry
    pub retry_backoff: Duration,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            verify_tls: true,
            timeout: Duration::from_secs(30),
            retry_attempts: 1,
            retry_backoff: Duration::from_millis(1000),
        }
    }
}

/// HTTP client that sends every request with a fresh randomized `User-Agent`.
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
    config: HttpClientConfig,
    user_agents: UserAgentGenerator,
}

impl HttpClient {
    pub fn new(config: HttpClientConfig) -> FetchResult<Self> {
        if config.retry_attempts == 0 {
            return Err(FetchError::Client("retry_attempts must be at least 1".to_string()));
        }

        let client = Client::builder()
            .timeout(config.timeout)
            .danger_accept_invalid_certs(!config.verify_tls)
            .gzip(true)
            .build()?;

        if !config.verify_tls {
            warn!("TLS certificate verification is disabled for this client");
        }
        debug!(
            "Initialized HTTP client: timeout {:?}, {} attempt(s) per request",
            config.timeout, config.retry_attempts
        );

        Ok(Self {
            client,
            config,
            user_agents: UserAgentGenerator::new(),
        })
    }

    /// GET `url`, retrying failed attempts with exponential backoff.
    ///
    /// Only a response with a success status is returned; anything else is an error.
    pub async fn get(&self, url: &str, referer: Option<&str>) -> FetchResult<Response> {
        let max_attempts = self.config.retry_attempts;
        let mut attempts = 0;

        loop {
            attempts += 1;
            if attempts > 1 {
                info!("Retry attempt {}/{} for {}", attempts, max_attempts, url);
            }

            let error = match self.send_once(url, referer).await {
                Ok(response) => return Ok(response),
                Err(e) => e,
            };

            if attempts >= max_attempts {
                return Err(error);
            }

            let backoff = Self::calculate_backoff(attempts, self.config.retry_backoff.as_millis() as u64);
            warn!("{}; backing off for {}ms before retry", error, backoff);
            sleep(Duration::from_millis(backoff)).await;
        }
    }

    async fn send_once(&self, url: &str, referer: Option<&str>) -> FetchResult<Response> {
        let mut request = self
            .client
            .get(url)
            .header(USER_AGENT, self.user_agents.generate());
        if let Some(referer) = referer {
            request = request.header(REFERER, referer);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status,
            });
        }
        Ok(response)
    }

    /// Calculate the backoff duration using exponential backoff
    fn calculate_backoff(attempt: usize, base_delay_ms: u64) -> u64 {
        let exponent = (attempt.saturating_sub(1)).min(16) as u32;
        let delay = (1u64 << exponent).saturating_mul(base_delay_ms);
        std::cmp::min(delay, MAX_BACKOFF_MS)
    }
}
