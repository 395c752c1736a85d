//! Early-lifetime feature engineering
//!
//! The classifier may only see what was knowable shortly after detection:
//! the static launch attributes plus aggregates over the first
//! `early_window_secs` of price history. Late observations (which the label
//! is largely derived from) are deliberately excluded.

use crate::error::PipelineError;
use crate::record::PriceObservation;
use crate::summary::TokenSummary;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::collections::HashMap;

/// Feature matrix plus labels, row-aligned with `mints`
#[derive(Debug, Clone)]
pub struct Dataset {
    pub feature_names: Vec<String>,
    pub features: Vec<Vec<f64>>,
    pub labels: Vec<i32>,
    pub mints: Vec<String>,
}

impl Dataset {
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn num_features(&self) -> usize {
        self.feature_names.len()
    }

    /// Seeded shuffle split; the test side gets `test_fraction` of the rows
    ///
    /// Both sides must end up non-empty: a fraction that rounds to zero test
    /// rows (small dataset, or `test_fraction` of 0) is an error here rather
    /// than a cryptic matrix failure at scoring time.
    pub fn train_test_split(
        &self,
        test_fraction: f64,
        seed: u64,
    ) -> Result<(Dataset, Dataset), PipelineError> {
        let mut indices: Vec<usize> = (0..self.len()).collect();
        let mut rng = StdRng::seed_from_u64(seed);
        indices.shuffle(&mut rng);

        let test_len = ((self.len() as f64) * test_fraction).round() as usize;
        let test_len = test_len.min(self.len().saturating_sub(1));
        if test_len == 0 {
            return Err(PipelineError::Model(format!(
                "test split is empty ({} rows at test_fraction {}); raise test_fraction or add data",
                self.len(),
                test_fraction
            )));
        }
        let (test_idx, train_idx) = indices.split_at(test_len);

        Ok((self.subset(train_idx), self.subset(test_idx)))
    }

    fn subset(&self, indices: &[usize]) -> Dataset {
        Dataset {
            feature_names: self.feature_names.clone(),
            features: indices.iter().map(|&i| self.features[i].clone()).collect(),
            labels: indices.iter().map(|&i| self.labels[i]).collect(),
            mints: indices.iter().map(|&i| self.mints[i].clone()).collect(),
        }
    }
}

pub fn feature_names() -> Vec<String> {
    [
        "market_cap",
        "total_liquidity",
        "total_lp_providers",
        "rug_score",
        "token_age_min",
        "amount",
        "is_pump",
        "early_obs_count",
        "early_max_variation_pct",
        "early_min_variation_pct",
        "early_last_variation_pct",
        "early_span_secs",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

/// One row per labeled token; tokens without history get zero aggregates
pub fn build_dataset(
    summaries: &[TokenSummary],
    observations: &[PriceObservation],
    early_window_secs: i64,
) -> Dataset {
    let mut by_mint: HashMap<&str, Vec<&PriceObservation>> = HashMap::new();
    for obs in observations {
        if obs.seconds_since_detection <= early_window_secs {
            by_mint.entry(obs.mint.as_str()).or_default().push(obs);
        }
    }

    let mut features = Vec::with_capacity(summaries.len());
    let mut labels = Vec::with_capacity(summaries.len());
    let mut mints = Vec::with_capacity(summaries.len());

    for summary in summaries {
        let early = by_mint.get(summary.mint.as_str()).map(Vec::as_slice).unwrap_or(&[]);

        let mut early_max = 0.0f64;
        let mut early_min = 0.0f64;
        for o in early {
            early_max = early_max.max(o.variation_pct);
            early_min = early_min.min(o.variation_pct);
        }
        let early_last = early.last().map(|o| o.variation_pct).unwrap_or(0.0);
        let early_span = early
            .last()
            .map(|o| o.seconds_since_detection)
            .unwrap_or(0);

        features.push(vec![
            summary.market_cap as f64,
            summary.total_liquidity as f64,
            summary.total_lp_providers as f64,
            summary.rug_score as f64,
            summary.token_age_min as f64,
            summary.amount as f64,
            summary.is_pump as u8 as f64,
            early.len() as f64,
            early_max,
            early_min,
            early_last,
            early_span as f64,
        ]);
        labels.push(summary.is_worth_it as i32);
        mints.push(summary.mint.clone());
    }

    Dataset {
        feature_names: feature_names(),
        features,
        labels,
        mints,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::Trigger;
    use crate::summary::tests::{obs_with, summary_with};

    #[test]
    fn test_rows_align_with_summaries() {
        let mut summaries = vec![summary_with("a", 600_000, 100), summary_with("b", 1_000, 5)];
        summaries[0].is_worth_it = true;
        let observations = vec![
            obs_with("a", 10, 5.0, Trigger::NoEvent),
            obs_with("a", 60, 20.0, Trigger::NoEvent),
            obs_with("a", 500, 80.0, Trigger::TakeProfit), // beyond the window
        ];

        let ds = build_dataset(&summaries, &observations, 120);
        assert_eq!(ds.len(), 2);
        assert_eq!(ds.num_features(), ds.features[0].len());
        assert_eq!(ds.labels, vec![1, 0]);

        let names = &ds.feature_names;
        let idx = |n: &str| names.iter().position(|x| x == n).unwrap();
        let row_a = &ds.features[0];
        assert_eq!(row_a[idx("early_obs_count")], 2.0);
        assert_eq!(row_a[idx("early_max_variation_pct")], 20.0);
        assert_eq!(row_a[idx("early_span_secs")], 60.0);

        // The token with no history gets zero aggregates, not dropped
        let row_b = &ds.features[1];
        assert_eq!(row_b[idx("early_obs_count")], 0.0);
    }

    #[test]
    fn test_split_sizes_and_determinism() {
        let summaries: Vec<_> = (0..20)
            .map(|i| summary_with(&format!("m{}", i), 1_000 * i as i64, i as i64))
            .collect();
        let ds = build_dataset(&summaries, &[], 120);

        let (train, test) = ds.train_test_split(0.25, 7).unwrap();
        assert_eq!(train.len(), 15);
        assert_eq!(test.len(), 5);

        let (train2, test2) = ds.train_test_split(0.25, 7).unwrap();
        assert_eq!(train.mints, train2.mints);
        assert_eq!(test.mints, test2.mints);
    }

    /// A fraction that rounds to zero test rows must fail up front, not at
    /// scoring time with an empty-matrix error.
    #[test]
    fn test_split_rejects_empty_test_side() {
        let summaries: Vec<_> = (0..3)
            .map(|i| summary_with(&format!("m{}", i), 1_000 * (i + 1) as i64, i as i64))
            .collect();
        let ds = build_dataset(&summaries, &[], 120);

        // 3 rows at 0.1 rounds to 0 test rows
        match ds.train_test_split(0.1, 42) {
            Err(PipelineError::Model(msg)) => assert!(msg.contains("test split is empty")),
            other => panic!("expected Model error, got {:?}", other.map(|(a, b)| (a.len(), b.len()))),
        }
        assert!(ds.train_test_split(0.0, 42).is_err());

        // The same dataset splits fine once the fraction is workable
        let (train, test) = ds.train_test_split(0.34, 42).unwrap();
        assert_eq!(train.len(), 2);
        assert_eq!(test.len(), 1);
    }
}
