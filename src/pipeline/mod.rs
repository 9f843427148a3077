//! DD → DDR → E: extraction, order statistics, relative divergence and
//! classification. Everything here is a pure function of its arguments.

use tracing::debug;

mod classify;
mod error;
mod extract;
mod gate;
mod normalize;
mod report;
mod stats;
mod thresholds;

pub use error::PipelineError;
pub use extract::{
    DEFAULT_POST_KEY, DEFAULT_PRE_KEY, ExtractionConfig, ExtractionResult, HEADING_SOURCE,
    SectionDetector, extract_sections,
};
pub use report::{Report, Window};
pub use stats::Sample;
pub use thresholds::{
    DEFAULT_EPS, DEFAULT_MAX_UNASSIGNED_RATIO, DEFAULT_MIN_N_FOR_MAD, DEFAULT_MIN_N_FOR_MOMENTS,
    DEFAULT_MIN_N_FOR_QUANTILES, PolicyFlags, Thresholds,
};

use gate::enforce_policy;
use report::{REPORT_VERSION, compare_windows};

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub thresholds: Thresholds,
    pub policy: PolicyFlags,
    pub pre_key: String,
    pub post_key: String,
    pub with_e: bool,
}

pub fn run_document(
    text: &str,
    extraction_config: &ExtractionConfig,
    config: &PipelineConfig,
) -> Result<Report, PipelineError> {
    let mut extraction = extract_sections(text, extraction_config);
    extraction.warn_missing_sections(
        &[config.pre_key.as_str(), config.post_key.as_str()],
        HEADING_SOURCE,
    );
    debug!(
        assigned = extraction.assigned_items_count,
        unassigned = extraction.unassigned_items_count,
        ignored_fenced_lines = extraction.parsing_meta.ignored_fenced_lines,
        "extraction finished"
    );

    run_counts(extraction, config)
}

pub fn run_counts(
    extraction: ExtractionResult,
    config: &PipelineConfig,
) -> Result<Report, PipelineError> {
    config.thresholds.validate()?;
    config.policy.validate()?;
    enforce_policy(&extraction, &config.policy)?;

    let pre = Window::new(
        config.pre_key.clone(),
        Sample::proxy_ids(extraction.count_for(&config.pre_key)),
    );
    let post = Window::new(
        config.post_key.clone(),
        Sample::proxy_ids(extraction.count_for(&config.post_key)),
    );

    let (ddr, e) = compare_windows(&pre, &post, &config.thresholds, true);
    let warnings = extraction.warnings.clone();

    Ok(Report {
        version: REPORT_VERSION.to_string(),
        extraction: Some(extraction),
        ddr,
        e: config.with_e.then_some(e),
        warnings,
    })
}

/// Raw numeric windows; no extraction and no policy gate.
pub fn run_samples(
    pre: &Window,
    post: &Window,
    thresholds: &Thresholds,
    with_e: bool,
    warnings: Vec<String>,
) -> Result<Report, PipelineError> {
    thresholds.validate()?;

    for window in [pre, post] {
        if let Some(value) = window.sample.values().iter().find(|value| !value.is_finite()) {
            return Err(PipelineError::InvalidInput(format!(
                "window {} contains a non-finite value: {value}",
                window.label
            )));
        }
    }

    let (ddr, e) = compare_windows(pre, post, thresholds, false);

    Ok(Report {
        version: REPORT_VERSION.to_string(),
        extraction: None,
        ddr,
        e: with_e.then_some(e),
        warnings,
    })
}
