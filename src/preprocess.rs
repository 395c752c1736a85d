//! Cleaning and flattening of raw launch rows
//!
//! Coerces SQLite's dynamic values into typed token records and explodes the
//! nested PriceHistory JSON into one row per observation. Malformed token
//! rows and malformed price entries are dropped with a warning, never fatal;
//! a dropped row contributes no observations, so every observation that
//! survives references a surviving token.

use crate::db::RawLaunch;
use crate::record::{PriceObservation, TokenRecord, Trigger};
use chrono::{DateTime, Duration, NaiveDateTime, Utc};
use rusqlite::types::Value;
use std::collections::HashSet;

/// Variation at or above this marks a take-profit exit
pub const TAKE_PROFIT_PCT: f64 = 35.0;
/// Variation at or below this marks a stop-loss exit
pub const STOP_LOSS_PCT: f64 = -40.0;

/// TokenAge arrives in milliseconds; summaries use whole minutes
const MS_PER_MINUTE: i64 = 60_000;

/// Price history whose first entry lags detection by more than this is
/// stale (recorded for an earlier pool) and is discarded whole.
const MAX_HISTORY_LAG_SECS: i64 = 60;

/// Clean raw rows into typed records and flattened observations
///
/// `cutoff`: drop launches detected before this instant (the `days_back`
/// window); `None` keeps everything.
pub fn clean(
    raw: Vec<RawLaunch>,
    cutoff: Option<DateTime<Utc>>,
) -> (Vec<TokenRecord>, Vec<PriceObservation>) {
    let mut tokens = Vec::with_capacity(raw.len());
    let mut observations = Vec::new();
    let mut seen: HashSet<String> = HashSet::new();
    let mut dropped = 0usize;

    for row in &raw {
        let token = match coerce_token(row) {
            Some(token) => token,
            None => {
                dropped += 1;
                continue;
            }
        };
        if let Some(cutoff) = cutoff {
            if token.detected_at < cutoff {
                continue;
            }
        }
        if !seen.insert(token.mint.clone()) {
            log::warn!("dropping duplicate launch row for mint {}", token.mint);
            continue;
        }

        observations.extend(flatten_price_history(
            &token.mint,
            token.detected_at,
            &row.price_history,
        ));
        tokens.push(token);
    }

    if dropped > 0 {
        log::warn!("dropped {} malformed launch rows", dropped);
    }
    log::info!(
        "cleaned {} tokens, {} price observations",
        tokens.len(),
        observations.len()
    );
    (tokens, observations)
}

fn coerce_token(row: &RawLaunch) -> Option<TokenRecord> {
    let mint = as_str(&row.token_mint)?.to_string();
    if mint.is_empty() {
        return None;
    }
    let build = || -> Option<TokenRecord> {
        Some(TokenRecord {
            name: as_str(&row.token_name).unwrap_or("").to_string(),
            detected_at: as_datetime(&row.detected_at)?,
            amount: as_i64(&row.amount)?,
            market_cap: as_i64(&row.market_cap)?,
            total_liquidity: as_i64(&row.total_liquidity)?,
            total_lp_providers: as_i64(&row.total_lp_providers)?,
            rug_score: as_i64(&row.rug_score)?,
            token_age_min: as_i64(&row.token_age)? / MS_PER_MINUTE,
            is_pump: as_bool(&row.is_pump)?,
            mint: mint.clone(),
        })
    };
    let token = build();
    if token.is_none() {
        log::warn!("dropping malformed launch row for mint {}", mint);
    }
    token
}

/// Parse one token's PriceHistory JSON into sorted observations
///
/// The upstream writer double-encodes the array (escaped quotes inside an
/// outer string); both the wrapped and plain forms are accepted. Entries
/// with an unparseable time or a non-numeric price are skipped one by one.
pub fn flatten_price_history(
    mint: &str,
    detected_at: DateTime<Utc>,
    raw: &Value,
) -> Vec<PriceObservation> {
    let text = match as_str(raw) {
        Some(t) => t.trim(),
        None => return Vec::new(),
    };
    if text.is_empty() || text == "nan" || text == "null" {
        return Vec::new();
    }
    let unescaped = text.trim_matches('"').replace("\\\"", "\"");

    let parsed: serde_json::Value = match serde_json::from_str(&unescaped) {
        Ok(v) => v,
        Err(e) => {
            log::warn!("unparseable price history for {}: {}", mint, e);
            return Vec::new();
        }
    };
    let entries = match parsed.as_array() {
        Some(arr) if !arr.is_empty() => arr,
        _ => return Vec::new(),
    };

    let mut points: Vec<(DateTime<Utc>, f64)> = Vec::with_capacity(entries.len());
    for entry in entries {
        let time = entry
            .get("time")
            .or_else(|| entry.get("Time"))
            .and_then(json_datetime);
        let price = entry
            .get("price")
            .or_else(|| entry.get("Price"))
            .and_then(json_f64);
        match (time, price) {
            (Some(time), Some(price)) if price.is_finite() => points.push((time, price)),
            _ => log::debug!("skipping malformed price entry for {}", mint),
        }
    }
    if points.is_empty() {
        return Vec::new();
    }
    points.sort_by_key(|(time, _)| *time);

    // Stale history check: the series must start near the detection time.
    if points[0].0 > detected_at + Duration::seconds(MAX_HISTORY_LAG_SECS) {
        log::warn!("discarding stale price history for {}", mint);
        return Vec::new();
    }

    let start_price = points[0].1;
    if start_price <= 0.0 {
        log::warn!("discarding price history for {} (non-positive start price)", mint);
        return Vec::new();
    }

    points
        .into_iter()
        .map(|(time, price)| {
            let seconds = (time - detected_at).num_seconds().max(0);
            let variation = ((price - start_price) / start_price * 100.0 * 100.0).round() / 100.0;
            PriceObservation {
                mint: mint.to_string(),
                time,
                price,
                seconds_since_detection: seconds,
                variation_pct: variation,
                trigger: trigger_for(variation),
            }
        })
        .collect()
}

fn trigger_for(variation_pct: f64) -> Trigger {
    if variation_pct >= TAKE_PROFIT_PCT {
        Trigger::TakeProfit
    } else if variation_pct <= STOP_LOSS_PCT {
        Trigger::StopLoss
    } else {
        Trigger::NoEvent
    }
}

fn as_str(v: &Value) -> Option<&str> {
    match v {
        Value::Text(s) => Some(s.as_str()),
        _ => None,
    }
}

fn as_i64(v: &Value) -> Option<i64> {
    match v {
        Value::Integer(i) => Some(*i),
        Value::Real(r) if r.is_finite() => Some(*r as i64),
        Value::Text(s) => {
            let t = s.trim();
            t.parse::<i64>()
                .ok()
                .or_else(|| t.parse::<f64>().ok().filter(|f| f.is_finite()).map(|f| f as i64))
        }
        _ => None,
    }
}

fn as_bool(v: &Value) -> Option<bool> {
    match v {
        Value::Integer(i) => Some(*i != 0),
        Value::Text(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "1" => Some(true),
            "false" | "0" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

fn as_datetime(v: &Value) -> Option<DateTime<Utc>> {
    match v {
        Value::Text(s) => parse_datetime_str(s.trim()),
        // Epoch milliseconds, the writer's older format
        Value::Integer(ms) => DateTime::from_timestamp_millis(*ms),
        _ => None,
    }
}

fn parse_datetime_str(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(naive.and_utc());
        }
    }
    None
}

fn json_datetime(v: &serde_json::Value) -> Option<DateTime<Utc>> {
    match v {
        serde_json::Value::String(s) => parse_datetime_str(s.trim()),
        serde_json::Value::Number(n) => n.as_i64().and_then(DateTime::from_timestamp_millis),
        _ => None,
    }
}

fn json_f64(v: &serde_json::Value) -> Option<f64> {
    match v {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn detected() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap()
    }

    fn raw_launch(mint: &str, price_history: &str) -> RawLaunch {
        RawLaunch {
            token_mint: Value::Text(mint.to_string()),
            token_name: Value::Text(format!("token-{}", mint)),
            detected_at: Value::Text("2025-06-01T12:00:00Z".to_string()),
            amount: Value::Integer(100),
            market_cap: Value::Integer(600_000),
            total_liquidity: Value::Integer(40_000),
            total_lp_providers: Value::Integer(4),
            rug_score: Value::Integer(12),
            token_age: Value::Integer(9_000_000), // 150 minutes in ms
            is_pump: Value::Integer(0),
            price_history: Value::Text(price_history.to_string()),
        }
    }

    fn history(entries: &[(&str, f64)]) -> String {
        let parts: Vec<String> = entries
            .iter()
            .map(|(t, p)| format!(r#"{{"time":"{}","price":{}}}"#, t, p))
            .collect();
        format!("[{}]", parts.join(","))
    }

    #[test]
    fn test_numeric_strings_are_coerced() {
        let mut row = raw_launch("a", "[]");
        row.market_cap = Value::Text(" 600000 ".to_string());
        row.rug_score = Value::Text("12.7".to_string());
        row.is_pump = Value::Text("true".to_string());

        let (tokens, _) = clean(vec![row], None);
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].market_cap, 600_000);
        assert_eq!(tokens[0].rug_score, 12);
        assert!(tokens[0].is_pump);
    }

    #[test]
    fn test_token_age_ms_to_minutes() {
        let (tokens, _) = clean(vec![raw_launch("a", "[]")], None);
        assert_eq!(tokens[0].token_age_min, 150);
    }

    #[test]
    fn test_malformed_row_dropped_not_fatal() {
        let mut bad = raw_launch("bad", "[]");
        bad.market_cap = Value::Text("not a number".to_string());
        let good = raw_launch("good", "[]");

        let (tokens, observations) = clean(vec![bad, good], None);
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].mint, "good");
        assert!(observations.is_empty());
    }

    #[test]
    fn test_days_back_cutoff() {
        let recent = raw_launch("recent", "[]");
        let mut old = raw_launch("old", "[]");
        old.detected_at = Value::Text("2025-05-01T12:00:00Z".to_string());

        let cutoff = Utc.with_ymd_and_hms(2025, 5, 25, 0, 0, 0).unwrap();
        let (tokens, _) = clean(vec![recent, old], Some(cutoff));
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].mint, "recent");
    }

    #[test]
    fn test_flatten_sorts_and_derives_fields() {
        let h = history(&[
            ("2025-06-01T12:01:00Z", 1.4),
            ("2025-06-01T12:00:00Z", 1.0),
            ("2025-06-01T12:02:00Z", 0.55),
        ]);
        let obs = flatten_price_history("a", detected(), &Value::Text(h));
        assert_eq!(obs.len(), 3);

        // Sorted by time, seconds non-decreasing and non-negative
        assert_eq!(obs[0].seconds_since_detection, 0);
        assert_eq!(obs[1].seconds_since_detection, 60);
        assert_eq!(obs[2].seconds_since_detection, 120);

        assert_eq!(obs[0].variation_pct, 0.0);
        assert_eq!(obs[1].variation_pct, 40.0);
        assert_eq!(obs[1].trigger, Trigger::TakeProfit);
        assert_eq!(obs[2].variation_pct, -45.0);
        assert_eq!(obs[2].trigger, Trigger::StopLoss);
    }

    #[test]
    fn test_double_encoded_history_is_unwrapped() {
        let wrapped = r#""[{\"time\":\"2025-06-01T12:00:00Z\",\"price\":2.0}]""#;
        let obs = flatten_price_history("a", detected(), &Value::Text(wrapped.to_string()));
        assert_eq!(obs.len(), 1);
        assert_eq!(obs[0].price, 2.0);
    }

    #[test]
    fn test_capitalized_keys_accepted() {
        let h = r#"[{"Time":"2025-06-01T12:00:30Z","Price":"1.25"}]"#;
        let obs = flatten_price_history("a", detected(), &Value::Text(h.to_string()));
        assert_eq!(obs.len(), 1);
        assert_eq!(obs[0].price, 1.25);
        assert_eq!(obs[0].seconds_since_detection, 30);
    }

    #[test]
    fn test_malformed_entries_skipped_entry_wise() {
        let h = r#"[
            {"time":"2025-06-01T12:00:00Z","price":1.0},
            {"time":"2025-06-01T12:00:10Z","price":"garbage"},
            {"time":"not a time","price":1.1},
            {"time":"2025-06-01T12:00:20Z","price":1.2}
        ]"#;
        let obs = flatten_price_history("a", detected(), &Value::Text(h.to_string()));
        assert_eq!(obs.len(), 2);
        assert_eq!(obs[1].seconds_since_detection, 20);
    }

    #[test]
    fn test_stale_history_discarded() {
        let h = history(&[("2025-06-01T12:05:00Z", 1.0)]); // 5 min after detection
        let obs = flatten_price_history("a", detected(), &Value::Text(h));
        assert!(obs.is_empty());
    }

    #[test]
    fn test_empty_and_junk_histories_yield_no_observations() {
        for raw in ["", "nan", "null", "[]", "not json at all"] {
            let obs = flatten_price_history("a", detected(), &Value::Text(raw.to_string()));
            assert!(obs.is_empty(), "expected no observations for {:?}", raw);
        }
        assert!(flatten_price_history("a", detected(), &Value::Null).is_empty());
    }

    #[test]
    fn test_pre_detection_timestamps_clamped_to_zero() {
        let h = history(&[
            ("2025-06-01T11:59:30Z", 1.0),
            ("2025-06-01T12:00:30Z", 1.1),
        ]);
        let obs = flatten_price_history("a", detected(), &Value::Text(h));
        assert_eq!(obs[0].seconds_since_detection, 0);
        assert_eq!(obs[1].seconds_since_detection, 30);
    }
}
