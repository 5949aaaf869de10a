//! Image download engine
//!
//! Downloads the links of one job one after another:
//! 1. Each link gets its own GET with a fresh `User-Agent`
//! 2. Bodies are streamed to a temp file next to the target and renamed on success
//! 3. Files are numbered `1.jpg`, `2.jpg`, ... and a number is only used up by a success
//! 4. A failed link is logged once and skipped

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use reqwest::Response;
use thiserror::Error;
use tokio::fs::{self, File};
use tokio::io::AsyncWriteExt;
use tracing::{error, info};

use crate::google::{FetchError, HttpClient, ImageLinkSet};

/// Extension given to every downloaded file, regardless of the actual content.
const IMAGE_EXTENSION: &str = "jpg";

/// Error types for a single image download
#[derive(Error, Debug)]
pub enum DownloadError {
    #[error("{0}")]
    Fetch(#[from] FetchError),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

impl From<reqwest::Error> for DownloadError {
    fn from(err: reqwest::Error) -> Self {
        DownloadError::Fetch(FetchError::Request(err))
    }
}

/// Result type for download operations
pub type DownloadResult<T> = Result<T, DownloadError>;

/// A link that could not be downloaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadFailure {
    pub link: String,
    pub reason: String,
}

/// What happened to the links of one job.
#[derive(Debug, Default, Clone)]
pub struct DownloadReport {
    pub total_links: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub bytes_written: u64,
    pub files: Vec<PathBuf>,
    pub failures: Vec<DownloadFailure>,
}

/// Downloads image links into numbered files.
#[derive(Debug, Clone)]
pub struct ImageDownloader {
    client: Arc<HttpClient>,
}

impl ImageDownloader {
    pub fn new(client: Arc<HttpClient>) -> Self {
        Self { client }
    }

    /// Downloads every link into `output_dir`, sequentially.
    ///
    /// The directory must already exist. Per-link failures never abort the run.
    pub async fn download_all(&self, links: &ImageLinkSet, output_dir: &Path) -> DownloadReport {
        let mut report = DownloadReport {
            total_links: links.len(),
            ..DownloadReport::default()
        };
        let mut count: usize = 1;

        for link in links {
            let file_path = output_dir.join(format!("{}.{}", count, IMAGE_EXTENSION));
            match self.download_file(link, &file_path).await {
                Ok(bytes) => {
                    info!("finish image {}", file_path.display());
                    report.succeeded += 1;
                    report.bytes_written += bytes;
                    report.files.push(file_path);
                    count += 1;
                }
                Err(e) => {
                    error!(link = %link, error = %e, "error while downloading image {}", link);
                    report.failed += 1;
                    report.failures.push(DownloadFailure {
                        link: link.clone(),
                        reason: e.to_string(),
                    });
                }
            }
        }

        report
    }

    /// Fetches one link and writes its body to `file_path`, returning the byte count.
    async fn download_file(&self, link: &str, file_path: &Path) -> DownloadResult<u64> {
        let response = self.client.get(link, None).await?;
        let temp_path = Self::temp_path(file_path);

        match Self::stream_to_file(response, &temp_path).await {
            Ok(bytes) => {
                if let Err(e) = fs::rename(&temp_path, file_path).await {
                    let _ = fs::remove_file(&temp_path).await;
                    return Err(DownloadError::Io(e));
                }
                Ok(bytes)
            }
            Err(e) => {
                let _ = fs::remove_file(&temp_path).await;
                Err(e)
            }
        }
    }

    /// `<dir>/.<name>.part`
    fn temp_path(file_path: &Path) -> PathBuf {
        let name = file_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        file_path.with_file_name(format!(".{}.part", name))
    }

    /// Stream a response to a file
    async fn stream_to_file(mut response: Response, file_path: &Path) -> DownloadResult<u64> {
        let mut file = File::create(file_path).await?;
        let mut bytes_written = 0u64;

        while let Some(chunk) = response.chunk().await? {
            file.write_all(&chunk).await?;
            bytes_written += chunk.len() as u64;
        }

        file.flush().await?;
        Ok(bytes_written)
    }
}
