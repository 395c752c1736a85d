//! Pipeline orchestration
//!
//! Pure composition of the stages: open datastore, load, clean, summarize,
//! label, then drive the two reports. No stage failure is swallowed; the
//! first error aborts the run.

use crate::config::Config;
use crate::error::PipelineError;
use crate::filter::FilterSet;
use crate::record::PriceObservation;
use crate::report;
use crate::summary::{self, TokenSummary};
use crate::{db, preprocess, target};
use chrono::{Duration, Utc};

/// Labeled summary table plus the flattened price series
#[derive(Debug)]
pub struct PipelineOutput {
    pub summaries: Vec<TokenSummary>,
    pub observations: Vec<PriceObservation>,
}

/// Load, clean, summarize, and label the datastore contents
pub fn run(config: &Config) -> Result<PipelineOutput, PipelineError> {
    let db_path = config.resolve_db_path()?;
    let conn = db::open_read_only(&db_path)?;
    let raw = db::load_launches(&conn)?;

    let cutoff = config.days_back.map(|days| Utc::now() - Duration::days(days));
    let (tokens, observations) = preprocess::clean(raw, cutoff);

    let mut summaries = summary::summarize(&tokens, &observations);
    target::label(&mut summaries);

    Ok(PipelineOutput {
        summaries,
        observations,
    })
}

/// Write the EDA report, then filter and write the token report
pub fn generate_reports(output: &PipelineOutput, config: &Config) -> Result<(), PipelineError> {
    let eda_path = config.eda_pdf_path();
    report::eda::write_eda_report(&output.summaries, &config.eda_limits, &eda_path)?;
    log::info!("EDA report written to {}", eda_path.display());

    let filter_set = FilterSet::parse(&config.filters)?;
    let selected = filter_set.apply(&output.summaries);
    log::info!(
        "{} of {} tokens passed {} filters",
        selected.len(),
        output.summaries.len(),
        filter_set.len()
    );

    let pdf_path = config.output_pdf_path();
    report::write_token_report(&selected, &output.observations, config.max_seconds, &pdf_path)?;
    log::info!("filtered-tokens report written to {}", pdf_path.display());
    Ok(())
}
