use anyhow::Result;
use chrono::Utc;
use tracing::{info, warn};

use crate::cli::DdrArgs;
use crate::commands::artifacts::{run_id_for, write_run_outputs};
use crate::pipeline::{ExtractionConfig, PipelineConfig, PolicyFlags, SectionDetector, run_document};
use crate::util::read_input_text;

pub fn run(args: DdrArgs) -> Result<()> {
    let run_id = run_id_for(Utc::now());
    let (extraction_config, config) = build_config(&args)?;

    info!(
        document = %args.document.display(),
        run_id = %run_id,
        pre_key = %config.pre_key,
        post_key = %config.post_key,
        "starting ddr run"
    );

    let text = read_input_text(&args.document)?;
    let report = run_document(&text, &extraction_config, &config)?;

    if let Some(extraction) = report.extraction.as_ref() {
        info!(
            assigned = extraction.assigned_items_count,
            unassigned = extraction.unassigned_items_count,
            unassigned_ratio = extraction.unassigned_items_ratio,
            ignored_fenced_lines = extraction.parsing_meta.ignored_fenced_lines,
            "extraction complete"
        );
    }
    for warning in &report.warnings {
        warn!(warning = %warning, "extraction warning");
    }

    let manifest = write_run_outputs(&args.out, "ddr", &run_id, &args.document, &report, None)?;

    info!(
        ddr = %report.ddr.classification.as_str(),
        e = %manifest.e.as_deref().unwrap_or("-"),
        digest = %manifest.report_digest,
        summary = %report.ddr.summary,
        "ddr run completed"
    );

    Ok(())
}

pub fn build_config(args: &DdrArgs) -> Result<(ExtractionConfig, PipelineConfig)> {
    let thresholds = args.thresholds.to_thresholds()?;

    let policy = PolicyFlags {
        strict_parsing: args.strict_parsing,
        max_unassigned_ratio: args.max_unassigned_ratio,
    };
    policy.validate()?;

    let extraction_config = if args.sections.is_empty() {
        ExtractionConfig::with_default_sections(args.reset_on_blank_line)?
    } else {
        let detectors = args
            .sections
            .iter()
            .map(|raw| SectionDetector::parse_assignment(raw))
            .collect::<Result<Vec<SectionDetector>, _>>()?;
        ExtractionConfig::new(detectors, args.reset_on_blank_line)?
    };

    let config = PipelineConfig {
        thresholds,
        policy,
        pre_key: args.pre_key.clone(),
        post_key: args.post_key.clone(),
        with_e: args.with_e,
    };

    Ok((extraction_config, config))
}
