//! Comparator parsing and conjunctive token filtering
//!
//! The parameters file maps attribute names to comparator strings such as
//! `"<=200"`. This is the only parsing surface in the system, so comparators
//! are validated eagerly at config load and again never re-parsed per row.

use crate::error::PipelineError;
use crate::summary::{self, TokenSummary};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    Le,
    Ge,
    Lt,
    Gt,
    Eq,
}

impl CmpOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            CmpOp::Le => "<=",
            CmpOp::Ge => ">=",
            CmpOp::Lt => "<",
            CmpOp::Gt => ">",
            CmpOp::Eq => "==",
        }
    }
}

/// One parsed comparison: operator + numeric threshold
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Comparator {
    pub op: CmpOp,
    pub threshold: f64,
}

impl Comparator {
    /// Parse a comparator string like `"<=200"` or `">= 0.5"`
    ///
    /// Two-character operators are matched before their one-character
    /// prefixes. Unrecognized operators and junk thresholds fail fast.
    pub fn parse(raw: &str) -> Result<Self, PipelineError> {
        let s = raw.trim();
        let (op, rest) = if let Some(rest) = s.strip_prefix("<=") {
            (CmpOp::Le, rest)
        } else if let Some(rest) = s.strip_prefix(">=") {
            (CmpOp::Ge, rest)
        } else if let Some(rest) = s.strip_prefix("==") {
            (CmpOp::Eq, rest)
        } else if let Some(rest) = s.strip_prefix('<') {
            (CmpOp::Lt, rest)
        } else if let Some(rest) = s.strip_prefix('>') {
            (CmpOp::Gt, rest)
        } else {
            return Err(PipelineError::ConfigParse(format!(
                "unrecognized comparator operator in {:?} (expected <=, >=, <, >, ==)",
                raw
            )));
        };

        let threshold: f64 = rest.trim().parse().map_err(|_| {
            PipelineError::ConfigParse(format!("invalid threshold in comparator {:?}", raw))
        })?;
        if !threshold.is_finite() {
            return Err(PipelineError::ConfigParse(format!(
                "non-finite threshold in comparator {:?}",
                raw
            )));
        }

        Ok(Comparator { op, threshold })
    }

    pub fn matches(&self, value: f64) -> bool {
        match self.op {
            CmpOp::Le => value <= self.threshold,
            CmpOp::Ge => value >= self.threshold,
            CmpOp::Lt => value < self.threshold,
            CmpOp::Gt => value > self.threshold,
            CmpOp::Eq => (value - self.threshold).abs() < 1e-9,
        }
    }
}

/// All configured filters, applied conjunctively
#[derive(Debug, Clone)]
pub struct FilterSet {
    rules: Vec<(String, Comparator)>,
}

impl FilterSet {
    /// Parse every configured comparator, failing on the first bad one
    ///
    /// Attribute names are checked against the summary schema here, not at
    /// apply time, so an unknown name is fatal even on an empty table.
    pub fn parse(filters: &BTreeMap<String, String>) -> Result<Self, PipelineError> {
        let mut rules = Vec::with_capacity(filters.len());
        for (attr, raw) in filters {
            if !summary::ATTRIBUTES.contains(&attr.as_str()) {
                return Err(PipelineError::SchemaMismatch(format!(
                    "filter attribute {:?} is not a known token attribute",
                    attr
                )));
            }
            let cmp = match Comparator::parse(raw) {
                Ok(c) => c,
                Err(PipelineError::ConfigParse(msg)) => {
                    return Err(PipelineError::ConfigParse(format!(
                        "filter {:?}: {}",
                        attr, msg
                    )))
                }
                Err(e) => return Err(e),
            };
            rules.push((attr.clone(), cmp));
        }
        Ok(FilterSet { rules })
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Return the tokens satisfying every configured comparator
    pub fn apply<'a>(&self, summaries: &'a [TokenSummary]) -> Vec<&'a TokenSummary> {
        summaries
            .iter()
            .filter(|s| self.matches(s))
            .collect()
    }

    pub fn matches(&self, summary: &TokenSummary) -> bool {
        self.rules.iter().all(|(attr, cmp)| {
            // Names were validated against ATTRIBUTES in parse()
            summary
                .attribute(attr)
                .map(|v| cmp.matches(v))
                .unwrap_or(false)
        })
    }
}
