//! EDA distribution report
//!
//! One histogram per configured feature, bars split by the IsWorthIt label,
//! clipped to the configured axis cap (or the 95th percentile when no cap is
//! set). Purely presentational: nothing here feeds back into filtering.

use super::chart::{ChartImage, CHART_HEIGHT, CHART_WIDTH};
use super::pdf::PdfReport;
use crate::error::PipelineError;
use crate::summary::TokenSummary;
use plotters::prelude::*;
use std::collections::BTreeMap;
use std::path::Path;

/// Features charted in the EDA report, in page order
pub const EDA_FEATURES: &[&str] = &[
    "MarketCap",
    "TotalLiquidity",
    "Amount",
    "RugScore",
    "TokenAge",
    "TotalLPProviders",
    "IsPump",
];

const BIN_COUNT: usize = 50;
/// Quantile used as the axis cap when eda_limits has no entry
const DEFAULT_CAP_QUANTILE: f64 = 0.95;
/// Hard clip for the MarketCap/TotalLiquidity ratio page
const RATIO_CLIP: f64 = 50.0;

// Label palette: worth-it teal over not-worth-it red
const COLOR_WORTH: RGBColor = RGBColor(78, 205, 196);
const COLOR_NOT_WORTH: RGBColor = RGBColor(255, 107, 107);

fn render_err<E: std::fmt::Display>(e: E) -> PipelineError {
    PipelineError::Render(e.to_string())
}

/// Write the full EDA PDF: one page per feature plus the ratio page
pub fn write_eda_report(
    summaries: &[TokenSummary],
    eda_limits: &BTreeMap<String, f64>,
    path: &Path,
) -> Result<(), PipelineError> {
    let mut pdf = PdfReport::new("EDA report")?;

    for feature in EDA_FEATURES {
        let values: Vec<(f64, bool)> = summaries
            .iter()
            .filter_map(|s| s.attribute(feature).map(|v| (v, s.is_worth_it)))
            .collect();
        let cap = eda_limits.get(*feature).copied();
        let page = render_distribution(feature, &values, cap)?;
        pdf.add_chart_page(&page.heading, &page.notes, &page.image)?;
    }

    // Extra page: MarketCap / TotalLiquidity ratio
    let ratio_values: Vec<(f64, bool)> = summaries
        .iter()
        .map(|s| {
            let ratio = s.market_cap as f64 / (s.total_liquidity as f64 + 1.0);
            (ratio, s.is_worth_it)
        })
        .filter(|(v, _)| *v < RATIO_CLIP)
        .collect();
    let page = render_distribution("MarketCap / TotalLiquidity", &ratio_values, Some(RATIO_CLIP))?;
    pdf.add_chart_page(&page.heading, &page.notes, &page.image)?;

    pdf.save(path)
}

pub struct DistributionPage {
    pub heading: String,
    pub notes: Vec<String>,
    pub image: ChartImage,
}

/// Histogram of one feature, bars per label class, clipped at the cap
pub fn render_distribution(
    feature: &str,
    values: &[(f64, bool)],
    cap: Option<f64>,
) -> Result<DistributionPage, PipelineError> {
    let all: Vec<f64> = values.iter().map(|(v, _)| *v).collect();
    let limit = upper_limit(&all, cap);

    let kept: Vec<(f64, bool)> = values
        .iter()
        .copied()
        .filter(|(v, _)| *v <= limit)
        .collect();
    let clipped = values.len() - kept.len();

    let worth: Vec<f64> = kept.iter().filter(|(_, w)| *w).map(|(v, _)| *v).collect();
    let not_worth: Vec<f64> = kept.iter().filter(|(_, w)| !*w).map(|(v, _)| *v).collect();

    let lo = kept
        .iter()
        .map(|(v, _)| *v)
        .fold(f64::INFINITY, f64::min)
        .min(0.0);
    let hi = if limit > lo { limit } else { lo + 1.0 };

    let (bins_worth, _) = bin_values(&worth, lo, hi);
    let (bins_not, _) = bin_values(&not_worth, lo, hi);
    let y_max = bins_worth
        .iter()
        .chain(bins_not.iter())
        .copied()
        .max()
        .unwrap_or(0)
        .max(1) as f64;

    let mut pixels = vec![0u8; (CHART_WIDTH * CHART_HEIGHT * 3) as usize];
    {
        let root = BitMapBackend::with_buffer(&mut pixels, (CHART_WIDTH, CHART_HEIGHT))
            .into_drawing_area();
        root.fill(&WHITE).map_err(render_err)?;

        let mut chart = ChartBuilder::on(&root)
            .margin(24)
            .build_cartesian_2d(lo..hi, 0.0..(y_max * 1.05))
            .map_err(render_err)?;

        let bin_width = (hi - lo) / BIN_COUNT as f64;
        for (bins, color) in [(&bins_not, COLOR_NOT_WORTH), (&bins_worth, COLOR_WORTH)] {
            chart
                .draw_series(bins.iter().enumerate().filter(|(_, c)| **c > 0).map(
                    |(i, count)| {
                        let x0 = lo + i as f64 * bin_width;
                        let x1 = x0 + bin_width;
                        Rectangle::new([(x0, 0.0), (x1, *count as f64)], color.mix(0.5).filled())
                    },
                ))
                .map_err(render_err)?;
        }

        root.present().map_err(render_err)?;
    }

    let mean_worth = mean(&worth);
    let mean_not = mean(&not_worth);
    let mut notes = vec![
        format!(
            "teal: IsWorthIt=1 (n={}, mean {:.2})   red: IsWorthIt=0 (n={}, mean {:.2})",
            worth.len(),
            mean_worth,
            not_worth.len(),
            mean_not
        ),
        format!("x: {:.2}..{:.2} in {} bins", lo, hi, BIN_COUNT),
    ];
    if clipped > 0 {
        notes.push(format!("{} values above the cap excluded from this plot", clipped));
    }

    Ok(DistributionPage {
        heading: format!("Distribution of {}", feature),
        notes,
        image: ChartImage {
            pixels,
            width: CHART_WIDTH,
            height: CHART_HEIGHT,
        },
    })
}

fn bin_values(values: &[f64], lo: f64, hi: f64) -> (Vec<usize>, f64) {
    let mut bins = vec![0usize; BIN_COUNT];
    let span = hi - lo;
    if span <= 0.0 {
        return (bins, 0.0);
    }
    let width = span / BIN_COUNT as f64;
    for &v in values {
        let idx = (((v - lo) / width) as usize).min(BIN_COUNT - 1);
        bins[idx] += 1;
    }
    (bins, width)
}

/// Configured cap, or the distribution's 95th percentile
fn upper_limit(values: &[f64], cap: Option<f64>) -> f64 {
    if let Some(cap) = cap {
        return cap;
    }
    percentile(values, DEFAULT_CAP_QUANTILE)
}

fn percentile(values: &[f64], q: f64) -> f64 {
    if values.is_empty() {
        return 1.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let rank = q * (sorted.len() - 1) as f64;
    let lo_idx = rank.floor() as usize;
    let hi_idx = rank.ceil() as usize;
    if lo_idx == hi_idx {
        sorted[lo_idx]
    } else {
        let frac = rank - lo_idx as f64;
        sorted[lo_idx] * (1.0 - frac) + sorted[hi_idx] * frac
    }
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::summary::tests::summary_with;

    #[test]
    fn test_percentile_interpolates() {
        let values = vec![1.0, 2.0, 3.0, 4.0, 5.0];
        assert_eq!(percentile(&values, 0.5), 3.0);
        assert_eq!(percentile(&values, 0.0), 1.0);
        assert_eq!(percentile(&values, 1.0), 5.0);
        assert_eq!(percentile(&values, 0.25), 2.0);
    }

    #[test]
    fn test_cap_overrides_percentile() {
        let values = vec![1.0, 2.0, 100.0];
        assert_eq!(upper_limit(&values, Some(10.0)), 10.0);
        assert!(upper_limit(&values, None) <= 100.0);
    }

    /// A configured cap excludes values from the plot but the caller's
    /// summary table is untouched.
    #[test]
    fn test_cap_excludes_from_plot_only() {
        let values = vec![(100_000.0, false), (150_000.0, true), (300_000.0, false)];
        let page = render_distribution("MarketCap", &values, Some(200_000.0)).unwrap();
        assert!(page
            .notes
            .iter()
            .any(|n| n.contains("1 values above the cap")));
    }

    #[test]
    fn test_eda_report_written() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("eda.pdf");

        let mut summaries = vec![
            summary_with("a", 100_000, 10),
            summary_with("b", 200_000, 20),
            summary_with("c", 5_000_000, 30),
        ];
        summaries[1].is_worth_it = true;

        let mut limits = BTreeMap::new();
        limits.insert("MarketCap".to_string(), 250_000.0);
        write_eda_report(&summaries, &limits, &path).unwrap();
        assert!(std::fs::read(&path).unwrap().starts_with(b"%PDF"));
    }

    #[test]
    fn test_empty_table_still_renders() {
        let page = render_distribution("MarketCap", &[], None).unwrap();
        assert_eq!(page.image.pixels.len(), (CHART_WIDTH * CHART_HEIGHT * 3) as usize);
    }
}
