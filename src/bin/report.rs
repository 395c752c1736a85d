//! Pipeline entry point: load the datastore, label tokens, write both PDFs
//!
//! Usage: `report [parameters-file]` (default: data/parameters.txt).
//! Exits 0 on success, 1 on any failure with the failing stage in the log.

use dexflow::config::{Config, DEFAULT_CONFIG_PATH};
use dexflow::error::PipelineError;
use dexflow::pipeline;
use std::path::{Path, PathBuf};

fn main() {
    dotenv::dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config_path: PathBuf = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH));

    if let Err(e) = run(&config_path) {
        log::error!("pipeline failed: {}", e);
        std::process::exit(1);
    }
}

fn run(config_path: &Path) -> Result<(), PipelineError> {
    let config = Config::load(config_path)?;
    let output = pipeline::run(&config)?;
    pipeline::generate_reports(&output, &config)?;
    log::info!("done");
    Ok(())
}
