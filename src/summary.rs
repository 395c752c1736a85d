//! Per-token behavior summaries
//!
//! Joins the cleaned token attributes with aggregates over the flattened
//! price observations (peak/trough variation and when they happened, first
//! exit trigger). Filters, EDA, and target definition all read from here.

use crate::record::{PriceObservation, TokenRecord, Trigger};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;

/// Attribute names addressable from filter and EDA configuration
///
/// Kept in sync with [`TokenSummary::attribute`]; a config key outside this
/// list is a schema mismatch.
pub const ATTRIBUTES: &[&str] = &[
    "MarketCap",
    "TotalLiquidity",
    "TotalLPProviders",
    "RugScore",
    "TokenAge",
    "Amount",
    "IsPump",
    "MaxPriceVar",
    "MinPriceVar",
    "IsWorthIt",
];

#[derive(Debug, Clone, Serialize)]
pub struct TokenSummary {
    pub mint: String,
    pub name: String,
    pub detected_at: DateTime<Utc>,
    pub amount: i64,
    pub market_cap: i64,
    pub total_liquidity: i64,
    pub total_lp_providers: i64,
    pub rug_score: i64,
    pub token_age_min: i64,
    pub is_pump: bool,

    pub observation_count: usize,
    pub max_variation_pct: f64,
    pub min_variation_pct: f64,
    pub max_variation_secs: i64,
    pub min_variation_secs: i64,
    pub first_trigger: Trigger,
    pub first_trigger_secs: Option<i64>,
    /// Seconds until a detected rug pull. No detector fills this yet; the
    /// rug-aware label rules treat `None` as "no rug pull".
    pub rug_pull_secs: Option<i64>,

    /// Set by target definition; false until labeled
    pub is_worth_it: bool,
}

impl TokenSummary {
    /// Numeric view of an attribute by its configured name
    pub fn attribute(&self, name: &str) -> Option<f64> {
        match name {
            "MarketCap" => Some(self.market_cap as f64),
            "TotalLiquidity" => Some(self.total_liquidity as f64),
            "TotalLPProviders" => Some(self.total_lp_providers as f64),
            "RugScore" => Some(self.rug_score as f64),
            "TokenAge" => Some(self.token_age_min as f64),
            "Amount" => Some(self.amount as f64),
            "IsPump" => Some(self.is_pump as u8 as f64),
            "MaxPriceVar" => Some(self.max_variation_pct),
            "MinPriceVar" => Some(self.min_variation_pct),
            "IsWorthIt" => Some(self.is_worth_it as u8 as f64),
            _ => None,
        }
    }
}

/// Build one summary per token record
///
/// A token with zero observations still gets a summary (zero aggregates,
/// no trigger); it is never dropped here.
pub fn summarize(
    tokens: &[TokenRecord],
    observations: &[PriceObservation],
) -> Vec<TokenSummary> {
    let mut by_mint: HashMap<&str, Vec<&PriceObservation>> = HashMap::new();
    for obs in observations {
        by_mint.entry(obs.mint.as_str()).or_default().push(obs);
    }

    tokens
        .iter()
        .map(|token| {
            let obs = by_mint.get(token.mint.as_str()).map(Vec::as_slice).unwrap_or(&[]);
            build_summary(token, obs)
        })
        .collect()
}

fn build_summary(token: &TokenRecord, obs: &[&PriceObservation]) -> TokenSummary {
    let mut max_variation_pct = 0.0;
    let mut min_variation_pct = 0.0;
    let mut max_variation_secs = 0;
    let mut min_variation_secs = 0;
    let mut first_trigger = Trigger::NoEvent;
    let mut first_trigger_secs = None;

    for o in obs {
        if o.variation_pct > max_variation_pct {
            max_variation_pct = o.variation_pct;
            max_variation_secs = o.seconds_since_detection;
        }
        if o.variation_pct < min_variation_pct {
            min_variation_pct = o.variation_pct;
            min_variation_secs = o.seconds_since_detection;
        }
        if first_trigger_secs.is_none() && o.trigger.is_event() {
            first_trigger = o.trigger;
            first_trigger_secs = Some(o.seconds_since_detection);
        }
    }

    TokenSummary {
        mint: token.mint.clone(),
        name: token.name.clone(),
        detected_at: token.detected_at,
        amount: token.amount,
        market_cap: token.market_cap,
        total_liquidity: token.total_liquidity,
        total_lp_providers: token.total_lp_providers,
        rug_score: token.rug_score,
        token_age_min: token.token_age_min,
        is_pump: token.is_pump,
        observation_count: obs.len(),
        max_variation_pct,
        min_variation_pct,
        max_variation_secs,
        min_variation_secs,
        first_trigger,
        first_trigger_secs,
        rug_pull_secs: None,
        is_worth_it: false,
    }
}
