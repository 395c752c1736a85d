//! Run configuration from the parameters file
//!
//! A single JSON document, loaded once per run and validated eagerly:
//! every comparator string and every EDA attribute name is checked here so
//! a bad configuration fails before the datastore is touched.

use crate::db;
use crate::error::PipelineError;
use crate::filter::FilterSet;
use crate::report::eda;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_PATH: &str = "data/parameters.txt";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Datastore path; when absent the newest `.db` under `db_dir` is used
    pub db_path: Option<String>,
    #[serde(default = "default_db_dir")]
    pub db_dir: String,
    /// Only analyze launches detected in the last N days
    pub days_back: Option<i64>,
    /// Truncate charts to the first N seconds of price history
    pub max_seconds: Option<i64>,
    #[serde(default)]
    pub filters: BTreeMap<String, String>,
    #[serde(default)]
    pub eda_limits: BTreeMap<String, f64>,
    #[serde(default = "default_output_pdf")]
    pub output_pdf: String,
    /// EDA report path; default lands next to `output_pdf`
    pub eda_pdf: Option<String>,
    #[serde(default)]
    pub train: TrainConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TrainConfig {
    /// Price history window the classifier is allowed to see, in seconds
    pub early_window_secs: i64,
    pub n_trees: u16,
    pub max_depth: u16,
    pub test_fraction: f64,
    pub seed: u64,
    pub report_json: String,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            early_window_secs: 120,
            n_trees: 200,
            max_depth: 6,
            test_fraction: 0.25,
            seed: 42,
            report_json: "data/output_data/feature_importance.json".to_string(),
        }
    }
}

fn default_db_dir() -> String {
    "data".to_string()
}

fn default_output_pdf() -> String {
    "data/output_data/filtered_tokens.pdf".to_string()
}

impl Config {
    pub fn load(path: &Path) -> Result<Self, PipelineError> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            PipelineError::ConfigParse(format!(
                "cannot read parameters file {}: {}",
                path.display(),
                e
            ))
        })?;
        let config: Config = serde_json::from_str(&text).map_err(|e| {
            PipelineError::ConfigParse(format!(
                "malformed parameters file {}: {}",
                path.display(),
                e
            ))
        })?;
        config.validate()?;
        log::info!("loaded parameters from {}", path.display());
        Ok(config)
    }

    /// Fail fast on comparators, EDA attributes, and bounds
    fn validate(&self) -> Result<(), PipelineError> {
        FilterSet::parse(&self.filters)?;

        for (attr, limit) in &self.eda_limits {
            if !eda::EDA_FEATURES.contains(&attr.as_str()) {
                return Err(PipelineError::SchemaMismatch(format!(
                    "eda_limits attribute {:?} is not charted in the EDA report (known: {})",
                    attr,
                    eda::EDA_FEATURES.join(", ")
                )));
            }
            if !limit.is_finite() {
                return Err(PipelineError::ConfigParse(format!(
                    "eda_limits.{} must be finite, got {}",
                    attr, limit
                )));
            }
        }

        if let Some(days) = self.days_back {
            if days <= 0 {
                return Err(PipelineError::ConfigParse(format!(
                    "days_back must be positive, got {}",
                    days
                )));
            }
        }
        if let Some(secs) = self.max_seconds {
            if secs <= 0 {
                return Err(PipelineError::ConfigParse(format!(
                    "max_seconds must be positive, got {}",
                    secs
                )));
            }
        }
        if !(0.0..1.0).contains(&self.train.test_fraction) {
            return Err(PipelineError::ConfigParse(format!(
                "train.test_fraction must be in [0, 1), got {}",
                self.train.test_fraction
            )));
        }
        Ok(())
    }

    /// Configured `db_path`, or the newest `.db` under `db_dir`
    pub fn resolve_db_path(&self) -> Result<PathBuf, PipelineError> {
        match &self.db_path {
            Some(path) => Ok(PathBuf::from(path)),
            None => db::latest_db_in(Path::new(&self.db_dir)),
        }
    }

    pub fn output_pdf_path(&self) -> PathBuf {
        PathBuf::from(&self.output_pdf)
    }

    pub fn eda_pdf_path(&self) -> PathBuf {
        match &self.eda_pdf {
            Some(path) => PathBuf::from(path),
            None => {
                let mut path = self.output_pdf_path();
                path.set_file_name("eda_report.pdf");
                path
            }
        }
    }
}
