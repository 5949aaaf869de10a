//! Download pipeline: configuration, logging, per-keyword jobs and the worker
//! pool that runs them.

pub mod config_loader;
pub mod download_engine;
pub mod job_runner;
#[cfg(test)]
pub(crate) mod log_capture;
pub mod logger;
pub mod orchestration;

pub use config_loader::{AppConfig, ConfigManager};
pub use download_engine::{DownloadReport, ImageDownloader};
pub use job_runner::KeywordJobRunner;
pub use logger::Logger;
pub use orchestration::{DispatchReport, Dispatcher, JobStatus};
