//! Random-forest training and permutation feature importance

use super::features::Dataset;
use crate::error::PipelineError;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::Serialize;
use smartcore::ensemble::random_forest_classifier::{
    RandomForestClassifier, RandomForestClassifierParameters,
};
use smartcore::linalg::basic::matrix::DenseMatrix;

#[derive(Debug, Clone)]
pub struct ForestParams {
    pub n_trees: u16,
    pub max_depth: u16,
    pub seed: u64,
}

impl Default for ForestParams {
    fn default() -> Self {
        Self {
            n_trees: 200,
            max_depth: 6,
            seed: 42,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct FeatureImportance {
    pub feature: String,
    /// Mean accuracy drop when the feature's column is shuffled
    pub importance: f64,
}

/// Artifact written by the train binary
#[derive(Debug, Clone, Serialize)]
pub struct TrainReport {
    pub samples_train: usize,
    pub samples_test: usize,
    pub positive_rate: f64,
    pub test_accuracy: f64,
    /// Sorted by importance, highest first
    pub importance: Vec<FeatureImportance>,
}

pub struct TrainedForest {
    model: RandomForestClassifier<f64, i32, DenseMatrix<f64>, Vec<i32>>,
    feature_names: Vec<String>,
}

impl TrainedForest {
    pub fn fit(train: &Dataset, params: &ForestParams) -> Result<Self, PipelineError> {
        if train.is_empty() {
            return Err(PipelineError::Model("empty training set".to_string()));
        }
        let x = DenseMatrix::from_2d_vec(&train.features)
            .map_err(|e| PipelineError::Model(format!("feature matrix: {:?}", e)))?;

        log::info!(
            "training random forest: {} samples, {} features, {} trees",
            train.len(),
            train.num_features(),
            params.n_trees
        );
        let model = RandomForestClassifier::fit(
            &x,
            &train.labels,
            RandomForestClassifierParameters::default()
                .with_n_trees(params.n_trees)
                .with_max_depth(params.max_depth)
                .with_seed(params.seed),
        )
        .map_err(|e| PipelineError::Model(format!("training failed: {:?}", e)))?;

        Ok(Self {
            model,
            feature_names: train.feature_names.clone(),
        })
    }

    pub fn predict(&self, features: &[Vec<f64>]) -> Result<Vec<i32>, PipelineError> {
        let x = DenseMatrix::from_2d_vec(&features.to_vec())
            .map_err(|e| PipelineError::Model(format!("feature matrix: {:?}", e)))?;
        self.model
            .predict(&x)
            .map_err(|e| PipelineError::Model(format!("prediction failed: {:?}", e)))
    }

    pub fn accuracy(&self, data: &Dataset) -> Result<f64, PipelineError> {
        let predictions = self.predict(&data.features)?;
        Ok(accuracy_of(&data.labels, &predictions))
    }

    /// Rank features by mean accuracy drop over shuffled copies
    ///
    /// For each feature the column is shuffled `repeats` times and the model
    /// re-scored; an uninformative feature scores near zero.
    pub fn permutation_importance(
        &self,
        data: &Dataset,
        repeats: usize,
        seed: u64,
    ) -> Result<Vec<FeatureImportance>, PipelineError> {
        let baseline = self.accuracy(data)?;
        let mut rng = StdRng::seed_from_u64(seed);
        let mut ranked = Vec::with_capacity(self.feature_names.len());

        for (col, name) in self.feature_names.iter().enumerate() {
            let mut total_drop = 0.0;
            for _ in 0..repeats.max(1) {
                let mut shuffled: Vec<f64> =
                    data.features.iter().map(|row| row[col]).collect();
                shuffled.shuffle(&mut rng);

                let mut permuted = data.features.clone();
                for (row, value) in permuted.iter_mut().zip(shuffled) {
                    row[col] = value;
                }
                let predictions = self.predict(&permuted)?;
                total_drop += baseline - accuracy_of(&data.labels, &predictions);
            }
            ranked.push(FeatureImportance {
                feature: name.clone(),
                importance: total_drop / repeats.max(1) as f64,
            });
        }

        ranked.sort_by(|a, b| b.importance.total_cmp(&a.importance));
        Ok(ranked)
    }
}

fn accuracy_of(y_true: &[i32], y_pred: &[i32]) -> f64 {
    if y_true.is_empty() {
        return 0.0;
    }
    let correct = y_true
        .iter()
        .zip(y_pred.iter())
        .filter(|(t, p)| t == p)
        .count();
    correct as f64 / y_true.len() as f64
}
