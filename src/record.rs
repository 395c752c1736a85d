//! Core value types for the launch-analysis pipeline

use chrono::{DateTime, Utc};
use serde::Serialize;

/// A cleaned, typed token launch row
///
/// Immutable once built by preprocessing. `token_age_min` is minutes since
/// token creation at detection time (the datastore stores milliseconds).
#[derive(Debug, Clone, Serialize)]
pub struct TokenRecord {
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
}

/// One flattened price-history entry for a token
///
/// Observations are produced sorted by timestamp within a token, so
/// `seconds_since_detection` is non-decreasing (and clamped at zero).
#[derive(Debug, Clone, Serialize)]
pub struct PriceObservation {
    pub mint: String,
    pub time: DateTime<Utc>,
    pub price: f64,
    pub seconds_since_detection: i64,
    /// Percent change from the token's first observed price
    pub variation_pct: f64,
    pub trigger: Trigger,
}

/// Simulated exit event at an observation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Trigger {
    TakeProfit,
    StopLoss,
    NoEvent,
}

impl Trigger {
    pub fn as_str(&self) -> &'static str {
        match self {
            Trigger::TakeProfit => "TP",
            Trigger::StopLoss => "SL",
            Trigger::NoEvent => "No event",
        }
    }

    pub fn is_event(&self) -> bool {
        !matches!(self, Trigger::NoEvent)
    }
}
