//! Offline training entry point
//!
//! Runs the same load/label pipeline, engineers early-lifetime features,
//! fits a random forest, and writes the feature-importance ranking as JSON.
//! Usage: `train [parameters-file]`.

use dexflow::config::{Config, DEFAULT_CONFIG_PATH};
use dexflow::error::PipelineError;
use dexflow::model::{self, ForestParams, TrainReport, TrainedForest};
use dexflow::pipeline;
use std::path::{Path, PathBuf};

const IMPORTANCE_REPEATS: usize = 5;

fn main() {
    dotenv::dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config_path: PathBuf = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH));

    if let Err(e) = run(&config_path) {
        log::error!("training failed: {}", e);
        std::process::exit(1);
    }
}

fn run(config_path: &Path) -> Result<(), PipelineError> {
    let config = Config::load(config_path)?;
    let output = pipeline::run(&config)?;

    let train_cfg = &config.train;
    let dataset = model::build_dataset(
        &output.summaries,
        &output.observations,
        train_cfg.early_window_secs,
    );
    if dataset.is_empty() {
        return Err(PipelineError::Model(
            "no labeled tokens available for training".to_string(),
        ));
    }
    let positives = dataset.labels.iter().filter(|&&l| l == 1).count();
    log::info!(
        "dataset: {} tokens, {} positive ({:.1}%)",
        dataset.len(),
        positives,
        positives as f64 / dataset.len() as f64 * 100.0
    );

    let (train, test) = dataset.train_test_split(train_cfg.test_fraction, train_cfg.seed)?;
    let forest = TrainedForest::fit(
        &train,
        &ForestParams {
            n_trees: train_cfg.n_trees,
            max_depth: train_cfg.max_depth,
            seed: train_cfg.seed,
        },
    )?;

    let test_accuracy = forest.accuracy(&test)?;
    log::info!("test accuracy: {:.3}", test_accuracy);

    let importance = forest.permutation_importance(&test, IMPORTANCE_REPEATS, train_cfg.seed)?;
    for (rank, fi) in importance.iter().enumerate() {
        log::info!(
            "  {:>2}. {:<28} {:+.4}",
            rank + 1,
            fi.feature,
            fi.importance
        );
    }

    let report = TrainReport {
        samples_train: train.len(),
        samples_test: test.len(),
        positive_rate: positives as f64 / dataset.len() as f64,
        test_accuracy,
        importance,
    };
    let json = serde_json::to_string_pretty(&report)
        .map_err(|e| PipelineError::Model(format!("report serialization: {}", e)))?;
    let report_path = Path::new(&train_cfg.report_json);
    if let Some(parent) = report_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    std::fs::write(report_path, json)?;
    log::info!("importance report written to {}", report_path.display());
    Ok(())
}
