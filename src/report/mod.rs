//! Report generation
//!
//! Charts are rasterized with plotters into in-memory RGB buffers and
//! assembled one per page into PDFs. Headings and annotations are set in
//! the PDF layer itself (built-in fonts), so chart bitmaps stay pure
//! geometry and the renderer needs no system font stack.

pub mod chart;
pub mod eda;
pub mod pdf;

pub use chart::ChartImage;
pub use pdf::PdfReport;

use crate::error::PipelineError;
use crate::record::PriceObservation;
use crate::summary::TokenSummary;
use std::collections::HashMap;
use std::path::Path;

/// Render one page per selected token into `path`
///
/// A token with no (or fully truncated) price history still gets its page,
/// with a placeholder chart. Returns the number of token pages written.
pub fn write_token_report(
    selected: &[&TokenSummary],
    observations: &[PriceObservation],
    max_seconds: Option<i64>,
    path: &Path,
) -> Result<usize, PipelineError> {
    let mut by_mint: HashMap<&str, Vec<&PriceObservation>> = HashMap::new();
    for obs in observations {
        by_mint.entry(obs.mint.as_str()).or_default().push(obs);
    }

    let mut pdf = PdfReport::new("Filtered token launches")?;

    if selected.is_empty() {
        log::warn!("no tokens passed the filters; writing empty report");
        pdf.add_text_page(
            "Filtered token launches",
            &["No tokens passed the configured filters.".to_string()],
        )?;
        pdf.save(path)?;
        return Ok(0);
    }

    for summary in selected {
        let mut obs: Vec<&PriceObservation> = by_mint
            .get(summary.mint.as_str())
            .cloned()
            .unwrap_or_default();
        if let Some(max) = max_seconds {
            obs.retain(|o| o.seconds_since_detection <= max);
        }

        let heading = format!("{} ({})", summary.name, summary.mint);
        let mut notes = vec![format!(
            "MarketCap {}  liquidity {}  LP providers {}  rug score {}  age {} min",
            summary.market_cap,
            summary.total_liquidity,
            summary.total_lp_providers,
            summary.rug_score,
            summary.token_age_min
        )];

        if obs.is_empty() {
            notes.push("no price history recorded".to_string());
            let image = chart::render_placeholder()?;
            pdf.add_chart_page(&heading, &notes, &image)?;
        } else {
            notes.push(chart_caption(summary, &obs));
            let image = chart::render_price_chart(&obs)?;
            pdf.add_chart_page(&heading, &notes, &image)?;
        }
    }

    pdf.save(path)?;
    Ok(selected.len())
}

/// Axis ranges and the first exit event, spelled out next to the chart
fn chart_caption(summary: &TokenSummary, obs: &[&PriceObservation]) -> String {
    let last_secs = obs.last().map(|o| o.seconds_since_detection).unwrap_or(0);
    let first_price = obs.first().map(|o| o.price).unwrap_or(0.0);
    let event = obs.iter().find(|o| o.trigger.is_event());
    let event_note = match event {
        Some(o) => format!(
            "{} at {} s ({:+.1}%)",
            o.trigger.as_str(),
            o.seconds_since_detection,
            o.variation_pct
        ),
        None => "no exit event".to_string(),
    };
    format!(
        "x: 0..{} s   start price {:.6}   peak {:+.1}%   trough {:+.1}%   {}",
        last_secs, first_price, summary.max_variation_pct, summary.min_variation_pct, event_note
    )
}
