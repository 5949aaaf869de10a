use std::path::PathBuf;

use anyhow::Error;
use clap::Parser;

use crate::program::{Overrides, Program};

mod google;
mod pipeline;
mod program;

/// Directory holding `config.toml` when none is given on the command line.
const DEFAULT_CONFIG_DIR: &str = ".";

/// Bulk-downloads image search results for every configured keyword pair.
#[derive(Parser, Debug)]
#[command(name = "google_image_downloader", version)]
struct Args {
    /// Directory holding `config.toml`; a default file is written when missing
    #[arg(default_value = DEFAULT_CONFIG_DIR)]
    config_dir: PathBuf,

    /// Number of concurrent jobs, overriding `pools.worker_count`
    #[arg(short, long)]
    workers: Option<usize>,

    /// Root directory for downloaded images, overriding `paths.download_directory`
    #[arg(short, long)]
    download_dir: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    let args = Args::parse();
    let overrides = Overrides {
        worker_count: args.workers,
        download_directory: args.download_dir,
    };

    Program::new(args.config_dir, overrides).run().await
}
