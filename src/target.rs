//! IsWorthIt target definition
//!
//! The label is the OR of a flat list of independent, named rules over the
//! token summary. Adding or removing a rule means editing WORTH_RULES and
//! nothing else; the rules never see each other.

use crate::record::Trigger;
use crate::summary::TokenSummary;

/// Peak variation that counts as a real pump
const MIN_PEAK_PCT: f64 = 30.0;
/// Trough below this is a deep drawdown
const DEEP_TROUGH_PCT: f64 = -20.0;
/// A TP that fired this many seconds before a rug pull still counts
const RUG_GRACE_SECS: i64 = 30;

pub type Rule = fn(&TokenSummary) -> bool;

pub const WORTH_RULES: &[(&str, Rule)] = &[
    ("tp_without_rug", tp_without_rug),
    ("tp_outran_rug", tp_outran_rug),
    ("peak_before_trough", peak_before_trough),
    ("peak_after_deep_trough", peak_after_deep_trough),
];

/// Take-profit fired and no rug pull was ever detected
fn tp_without_rug(s: &TokenSummary) -> bool {
    s.first_trigger == Trigger::TakeProfit && s.rug_pull_secs.is_none()
}

/// Take-profit fired comfortably before a detected rug pull
fn tp_outran_rug(s: &TokenSummary) -> bool {
    match (s.first_trigger, s.first_trigger_secs, s.rug_pull_secs) {
        (Trigger::TakeProfit, Some(tp_secs), Some(rug_secs)) => {
            rug_secs > tp_secs + RUG_GRACE_SECS
        }
        _ => false,
    }
}

/// Pumped hard and the peak came before the worst drawdown
fn peak_before_trough(s: &TokenSummary) -> bool {
    s.max_variation_pct >= MIN_PEAK_PCT && s.max_variation_secs < s.min_variation_secs
}

/// Recovered to a hard pump after a deep early drawdown
fn peak_after_deep_trough(s: &TokenSummary) -> bool {
    s.max_variation_pct >= MIN_PEAK_PCT
        && s.min_variation_pct < DEEP_TROUGH_PCT
        && s.min_variation_secs < s.max_variation_secs
}

pub fn is_worth_it(summary: &TokenSummary) -> bool {
    WORTH_RULES.iter().any(|(_, rule)| rule(summary))
}

/// Label every summary in place; deterministic for a given input
pub fn label(summaries: &mut [TokenSummary]) {
    let mut positives = 0usize;
    for s in summaries.iter_mut() {
        s.is_worth_it = is_worth_it(s);
        if s.is_worth_it {
            positives += 1;
        }
    }
    log::info!(
        "labeled {} tokens, {} worth tracking",
        summaries.len(),
        positives
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::summary::tests::summary_with;

    #[test]
    fn test_tp_without_rug() {
        let mut s = summary_with("a", 1, 1);
        s.first_trigger = Trigger::TakeProfit;
        s.first_trigger_secs = Some(45);
        assert!(is_worth_it(&s));

        s.rug_pull_secs = Some(50);
        assert!(!tp_without_rug(&s));
    }

    #[test]
    fn test_tp_outran_rug_needs_grace_margin() {
        let mut s = summary_with("a", 1, 1);
        s.first_trigger = Trigger::TakeProfit;
        s.first_trigger_secs = Some(45);

        s.rug_pull_secs = Some(76); // 45 + 30 + 1
        assert!(is_worth_it(&s));

        s.rug_pull_secs = Some(75); // exactly at the grace boundary
        assert!(!tp_outran_rug(&s));
    }

    #[test]
    fn test_peak_before_trough() {
        let mut s = summary_with("a", 1, 1);
        s.max_variation_pct = 35.0;
        s.max_variation_secs = 60;
        s.min_variation_pct = -5.0;
        s.min_variation_secs = 120;
        assert!(is_worth_it(&s));

        s.max_variation_pct = 29.9;
        assert!(!is_worth_it(&s));
    }

    #[test]
    fn test_peak_after_deep_trough() {
        let mut s = summary_with("a", 1, 1);
        s.max_variation_pct = 40.0;
        s.max_variation_secs = 300;
        s.min_variation_pct = -25.0;
        s.min_variation_secs = 60;
        assert!(is_worth_it(&s));

        // Shallow dip does not qualify
        s.min_variation_pct = -15.0;
        assert!(!is_worth_it(&s));
    }

    #[test]
    fn test_stop_loss_only_token_is_not_worth_it() {
        let mut s = summary_with("a", 1, 1);
        s.first_trigger = Trigger::StopLoss;
        s.first_trigger_secs = Some(10);
        s.min_variation_pct = -45.0;
        s.min_variation_secs = 10;
        assert!(!is_worth_it(&s));
    }

    #[test]
    fn test_label_is_deterministic() {
        let mut a = vec![summary_with("a", 1, 1), summary_with("b", 1, 1)];
        a[0].first_trigger = Trigger::TakeProfit;
        let mut b = a.clone();

        label(&mut a);
        label(&mut b);
        let labels_a: Vec<bool> = a.iter().map(|s| s.is_worth_it).collect();
        let labels_b: Vec<bool> = b.iter().map(|s| s.is_worth_it).collect();
        assert_eq!(labels_a, labels_b);
        assert_eq!(labels_a, vec![true, false]);
    }
}
