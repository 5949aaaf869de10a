use std::env::current_dir;
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Error};
use console::{Term, style};
use tracing::{info, trace};

use crate::google::{HttpClient, HttpClientConfig, PageFetcher, PatternExtractor, SearchUrlBuilder};
use crate::pipeline::{
    AppConfig, ConfigManager, DispatchReport, Dispatcher, ImageDownloader, JobStatus,
    KeywordJobRunner, Logger,
};

/// The name of the cargo package.
const NAME: &str = env!("CARGO_PKG_NAME");

/// The version of the cargo package.
const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Command line values that take precedence over `config.toml` for one run.
#[derive(Debug, Clone, Default)]
pub(crate) struct Overrides {
    pub(crate) worker_count: Option<usize>,
    pub(crate) download_directory: Option<String>,
}

impl Overrides {
    fn apply(&self, config: &mut AppConfig) {
        if let Some(worker_count) = self.worker_count {
            config.pools.worker_count = Some(worker_count);
        }
        if let Some(download_directory) = &self.download_directory {
            config.paths.download_directory = download_directory.clone();
        }
    }
}

/// Handles the flow of one downloader run, from configuration to the final summary.
pub(crate) struct Program {
    config_dir: PathBuf,
    overrides: Overrides,
}

impl Program {
    pub(crate) fn new(config_dir: impl Into<PathBuf>, overrides: Overrides) -> Self {
        Self {
            config_dir: config_dir.into(),
            overrides,
        }
    }

    /// Runs the downloader program.
    pub(crate) async fn run(&self) -> Result<(), Error> {
        let config_manager = ConfigManager::new(&self.config_dir).with_context(|| {
            format!("Failed to load configuration from {}", self.config_dir.display())
        })?;
        let config = self.effective_config(config_manager.get_app_config())?;

        // Everything logged before this point goes nowhere.
        let logger = Logger::new(&config.logging, &config.paths.log_directory)
            .context("Failed to initialize logging")?;

        trace!("Program Name: {}", NAME);
        trace!("Program Version: {}", VERSION);
        if let Ok(dir) = current_dir() {
            trace!("Program Working Directory: {}", dir.display());
        }
        trace!("Config Directory: {}", config_manager.config_dir().display());

        let mut dispatcher = Self::build_dispatcher(&config)?;
        info!(
            "Downloading into {} with {} worker(s)",
            config.paths.download_directory,
            dispatcher.worker_count()
        );

        let report = dispatcher
            .run_keywords(&config.keywords.main, &config.keywords.supplemented)
            .await;
        trace!("Dispatcher state: {:?}", dispatcher.state());
        info!("Failures are recorded in {}", logger.log_path().display());
        Self::write_summary(&mut Term::stdout(), &report).context("Failed to print summary")?;

        Ok(())
    }

    /// The loaded config with command line overrides applied, validated again.
    fn effective_config(&self, loaded: &AppConfig) -> Result<AppConfig, Error> {
        let mut config = loaded.clone();
        self.overrides.apply(&mut config);
        config.validate().context("Invalid command line override")?;
        Ok(config)
    }

    fn build_dispatcher(config: &AppConfig) -> Result<Dispatcher, Error> {
        let client = HttpClient::new(HttpClientConfig {
            verify_tls: config.http.verify_tls,
            timeout: Duration::from_secs(config.http.timeout_secs),
            retry_attempts: config.http.retry_attempts,
            retry_backoff: Duration::from_millis(config.http.retry_backoff_ms),
        })
        .context("Failed to build HTTP client")?;
        let client = Arc::new(client);

        let extractor = PatternExtractor::new(&config.extraction.pattern)
            .context("Invalid extraction pattern")?;

        let runner = KeywordJobRunner::new(
            &config.paths.download_directory,
            SearchUrlBuilder::new(&config.http.search_endpoint),
            PageFetcher::new(client.clone(), &config.http.referer),
            Arc::new(extractor),
            ImageDownloader::new(client),
        );

        Ok(Dispatcher::new(
            Arc::new(runner),
            config.pools.resolved_worker_count(),
        ))
    }

    fn write_summary(out: &mut impl Write, report: &DispatchReport) -> io::Result<()> {
        writeln!(
            out,
            "{} {} job(s), {} image(s) saved, {} image error(s), {} failed job(s)",
            style("All finished:").green().bold(),
            report.outcomes.len(),
            report.images_downloaded(),
            report.image_errors(),
            report.failed_jobs(),
        )?;
        for outcome in &report.outcomes {
            if let JobStatus::Failed(reason) = &outcome.status {
                writeln!(out, "  {} {}: {}", style("failed").red(), outcome.pair, reason)?;
            }
        }
        out.flush()
    }
}
