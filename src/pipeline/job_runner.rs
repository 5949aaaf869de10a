use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info};

use crate::google::{ImageLinkSet, KeywordPair, LinkExtractor, PageFetcher, SearchUrlBuilder};
use crate::pipeline::{DownloadReport, ImageDownloader};

/// Environment failures that abort a single job.
#[derive(Error, Debug)]
pub enum JobError {
    #[error("Failed to create directory {}: {source}", .path.display())]
    CreateDirectory {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

pub type JobResult<T> = Result<T, JobError>;

/// Runs one keyword pair end to end: search page, links, downloads.
pub struct KeywordJobRunner {
    download_dir: PathBuf,
    urls: SearchUrlBuilder,
    fetcher: PageFetcher,
    extractor: Arc<dyn LinkExtractor>,
    downloader: ImageDownloader,
}

impl KeywordJobRunner {
    pub fn new(
        download_dir: impl Into<PathBuf>,
        urls: SearchUrlBuilder,
        fetcher: PageFetcher,
        extractor: Arc<dyn LinkExtractor>,
        downloader: ImageDownloader,
    ) -> Self {
        Self {
            download_dir: download_dir.into(),
            urls,
            fetcher,
            extractor,
            downloader,
        }
    }

    /// Processes one pair. Only directory creation can fail the job; every
    /// network or markup problem is absorbed and shows up in the report.
    pub async fn run(&self, pair: &KeywordPair) -> JobResult<DownloadReport> {
        info!("Main keyword: {}", pair.main);

        let output_dir = pair.output_dir(&self.download_dir);
        tokio::fs::create_dir_all(&output_dir)
            .await
            .map_err(|source| JobError::CreateDirectory {
                path: output_dir.clone(),
                source,
            })?;

        info!("supplemented keyword: {}", pair.supplemented);
        let url = self.urls.search_url(pair);
        let links = self.collect_links(&url).await;
        info!("get {} links for {}", links.len(), pair.supplemented);

        info!("Start downloading...");
        let report = self.downloader.download_all(&links, &output_dir).await;
        info!(
            "Finish downloading {}, {}/{} images saved ({} bytes), total {} errors",
            pair, report.succeeded, report.total_links, report.bytes_written, report.failed
        );

        Ok(report)
    }

    async fn collect_links(&self, url: &str) -> ImageLinkSet {
        match self.fetcher.fetch(url).await {
            Some(page) => {
                debug!("Extracting links with {}", self.extractor.name());
                self.extractor.extract(&page)
            }
            None => ImageLinkSet::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::google::{HttpClient, HttpClientConfig, PatternExtractor};
    use crate::pipeline::log_capture::CapturedLogs;
    use std::path::Path;
    use std::time::Duration;
    use tempfile::tempdir;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn runner(server: &MockServer, download_dir: &Path) -> KeywordJobRunner {
        let client = Arc::new(
            HttpClient::new(HttpClientConfig {
                timeout: Duration::from_secs(5),
                ..HttpClientConfig::default()
            })
            .unwrap(),
        );
        KeywordJobRunner::new(
            download_dir,
            SearchUrlBuilder::new(format!("{}/search", server.uri())),
            PageFetcher::new(client.clone(), "https://www.google.com"),
            Arc::new(PatternExtractor::default()),
            ImageDownloader::new(client),
        )
    }

    /// Results page listing `a.jpg`, `b.jpg` and `a.jpg` again.
    async fn mount_results_page(server: &MockServer) {
        let page = format!(
            r#"<div>{{"ou":"{uri}/a.jpg","ow":800}}</div><div>{{"ou":"{uri}/b.jpg"}}</div><div>{{"ou":"{uri}/a.jpg"}}</div>"#,
            uri = server.uri()
        );
        Mock::given(method("GET"))
            .and(path("/search"))
            .and(query_param("q", "swimmer butterfly"))
            .and(query_param("source", "lnms"))
            .and(query_param("tbm", "isch"))
            .respond_with(ResponseTemplate::new(200).set_body_string(page))
            .expect(1)
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn test_end_to_end_all_images_succeed() {
        let server = MockServer::start().await;
        mount_results_page(&server).await;
        Mock::given(method("GET"))
            .and(path("/a.jpg"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"image-a".to_vec()))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/b.jpg"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"image-b".to_vec()))
            .expect(1)
            .mount(&server)
            .await;

        let temp_dir = tempdir().unwrap();
        let download_dir = temp_dir.path().join("google_image");
        let pair = KeywordPair::new("swimmer", "butterfly");

        let report = runner(&server, &download_dir).run(&pair).await.unwrap();

        let output_dir = download_dir.join("swimmer").join("butterfly");
        assert_eq!(report.total_links, 2);
        assert_eq!(report.succeeded, 2);
        assert_eq!(report.failed, 0);

        let mut contents = vec![
            std::fs::read(output_dir.join("1.jpg")).unwrap(),
            std::fs::read(output_dir.join("2.jpg")).unwrap(),
        ];
        contents.sort();
        assert_eq!(contents, vec![b"image-a".to_vec(), b"image-b".to_vec()]);
        assert!(!output_dir.join("3.jpg").exists());
    }

    #[tokio::test]
    async fn test_end_to_end_one_image_fails() {
        let logs = CapturedLogs::default();
        let _guard = tracing::subscriber::set_default(logs.subscriber());
        let server = MockServer::start().await;
        mount_results_page(&server).await;
        Mock::given(method("GET"))
            .and(path("/a.jpg"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"image-a".to_vec()))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/b.jpg"))
            .respond_with(ResponseTemplate::new(502))
            .expect(1)
            .mount(&server)
            .await;

        let temp_dir = tempdir().unwrap();
        let pair = KeywordPair::new("swimmer", "butterfly");

        let report = runner(&server, temp_dir.path()).run(&pair).await.unwrap();

        let output_dir = temp_dir.path().join("swimmer").join("butterfly");
        assert_eq!(std::fs::read(output_dir.join("1.jpg")).unwrap(), b"image-a".to_vec());
        assert!(!output_dir.join("2.jpg").exists());
        assert_eq!(report.succeeded, 1);
        assert_eq!(report.failures.len(), 1);
        assert!(report.failures[0].link.ends_with("/b.jpg"));

        assert_eq!(logs.count("ERROR", "b.jpg"), 1);
        assert_eq!(logs.count("ERROR", ""), 1);
        assert_eq!(logs.count("INFO", "get 2 links for butterfly"), 1);
    }

    #[tokio::test]
    async fn test_failed_page_fetch_means_no_links() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/search"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let temp_dir = tempdir().unwrap();
        let pair = KeywordPair::new("swimmer", "freestyle");

        let report = runner(&server, temp_dir.path()).run(&pair).await.unwrap();

        assert_eq!(report.total_links, 0);
        assert!(temp_dir.path().join("swimmer").join("freestyle").is_dir());
    }

    #[tokio::test]
    async fn test_existing_directory_is_reused() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/search"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>no results</html>"))
            .mount(&server)
            .await;

        let temp_dir = tempdir().unwrap();
        let pair = KeywordPair::new("swimmer", "backstroke");
        std::fs::create_dir_all(pair.output_dir(temp_dir.path())).unwrap();

        let runner = runner(&server, temp_dir.path());
        assert!(runner.run(&pair).await.is_ok());
        assert!(runner.run(&pair).await.is_ok());

        let dirs: Vec<_> = std::fs::read_dir(temp_dir.path().join("swimmer"))
            .unwrap()
            .map(|entry| entry.unwrap().file_name())
            .collect();
        assert_eq!(dirs, vec![std::ffi::OsString::from("backstroke")]);
    }

    #[tokio::test]
    async fn test_directory_creation_failure_fails_the_job() {
        let server = MockServer::start().await;
        let temp_dir = tempdir().unwrap();
        // A regular file where the download root should be.
        let blocked = temp_dir.path().join("blocked");
        std::fs::write(&blocked, b"not a directory").unwrap();

        let result = runner(&server, &blocked)
            .run(&KeywordPair::new("swimmer", "kickstroke"))
            .await;

        assert!(matches!(result, Err(JobError::CreateDirectory { .. })));
    }
}
