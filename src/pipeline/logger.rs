//! Structured logging
//!
//! Builds the process-wide log sink once at startup:
//! 1. `download.log`, opened in append mode, receives everything from `DEBUG` up
//! 2. The terminal shows progress lines from `INFO` up
//! 3. `RUST_LOG` overrides the configured level

use std::path::{Path, PathBuf};

use console::Term;
use thiserror::Error;
use tracing::{Subscriber, info};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    EnvFilter, Layer,
    filter::LevelFilter,
    fmt::{self, MakeWriter, time::ChronoLocal},
    prelude::*,
    registry::LookupSpan,
};

use crate::pipeline::config_loader::Logging;

/// Name of the shared log file.
pub const LOG_FILE_NAME: &str = "download.log";

/// Timestamp layout of log lines, e.g. `2017-09-29 20:59:13.042`.
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f";

/// Error types for logging
#[derive(Error, Debug)]
pub enum LoggerError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Logging error: {0}")]
    Logging(String),
}

/// Result type for logging operations
pub type LoggerResult<T> = Result<T, LoggerError>;

/// Owns the log sink. Buffered lines are flushed when this is dropped, so it
/// must live until the program finishes.
pub struct Logger {
    log_path: PathBuf,
    _guard: WorkerGuard,
}

impl Logger {
    pub fn new(config: &Logging, log_dir: impl AsRef<Path>) -> LoggerResult<Self> {
        let log_dir = log_dir.as_ref();
        if !log_dir.exists() {
            std::fs::create_dir_all(log_dir)?;
        }

        let file_appender = tracing_appender::rolling::never(log_dir, LOG_FILE_NAME);
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

        let filter = EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new(&config.log_level))
            .map_err(|e| LoggerError::Logging(e.to_string()))?;

        let file_layer = match config.log_format.as_str() {
            "json" => fmt::layer()
                .json()
                .with_writer(non_blocking)
                .with_timer(ChronoLocal::new(TIMESTAMP_FORMAT.to_string()))
                .boxed(),
            _ => fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false)
                .with_timer(ChronoLocal::new(TIMESTAMP_FORMAT.to_string()))
                .boxed(),
        };

        let terminal_layer = config
            .log_to_terminal
            .then(|| console_layer(std::io::stdout, Term::stdout().is_term()));

        tracing_subscriber::registry()
            .with(filter)
            .with(file_layer)
            .with(terminal_layer)
            .try_init()
            .map_err(|e| LoggerError::Logging(e.to_string()))?;

        let log_path = log_dir.join(LOG_FILE_NAME);
        info!(
            log_format = %config.log_format,
            log_level = %config.log_level,
            "Logger initialized, writing to {}",
            log_path.display()
        );

        Ok(Self {
            log_path,
            _guard: guard,
        })
    }

    pub fn log_path(&self) -> &Path {
        &self.log_path
    }
}

/// Progress lines from `INFO` up. Colours are only wanted on a real terminal.
fn console_layer<S, W>(writer: W, ansi: bool) -> impl Layer<S>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    fmt::layer()
        .with_writer(writer)
        .with_target(false)
        .with_ansi(ansi)
        .with_filter(LevelFilter::INFO)
}
