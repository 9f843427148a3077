use std::path::Path;

use anyhow::Result;
use chrono::Utc;
use serde::Deserialize;
use tracing::{info, warn};

use crate::cli::SeriesArgs;
use crate::commands::artifacts::{run_id_for, write_run_outputs};
use crate::model::{RunManifest, Windowing};
use crate::pipeline::{PipelineError, Report, Sample, Thresholds, Window, run_samples};
use crate::util::read_input_text;

const SMALL_WINDOW_MIN: usize = 3;

#[derive(Debug, Deserialize)]
struct SampleWindows {
    pre: Vec<f64>,
    post: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SplitSeries {
    pub pre: Vec<f64>,
    pub post: Vec<f64>,
    pub split_index: usize,
    pub warnings: Vec<String>,
}

pub fn run(args: SeriesArgs) -> Result<()> {
    let run_id = run_id_for(Utc::now());
    let options = SeriesOptions {
        thresholds: args.thresholds.to_thresholds()?,
        split_index: args.split_index,
        with_e: args.with_e,
    };

    info!(input = %args.input.display(), run_id = %run_id, "starting series run");

    let (report, manifest) = run_series_file(&args.input, &args.out, "series", &run_id, &options)?;

    info!(
        ddr = %report.ddr.classification.as_str(),
        e = %manifest.e.as_deref().unwrap_or("-"),
        digest = %manifest.report_digest,
        summary = %report.ddr.summary,
        "series run completed"
    );

    Ok(())
}

#[derive(Debug, Clone)]
pub struct SeriesOptions {
    pub thresholds: Thresholds,
    pub split_index: Option<usize>,
    pub with_e: bool,
}

pub fn run_series_file(
    input: &Path,
    out_dir: &Path,
    command: &str,
    run_id: &str,
    options: &SeriesOptions,
) -> Result<(Report, RunManifest)> {
    let raw = read_input_text(input)?;
    let split = if is_json_input(input) {
        if options.split_index.is_some() {
            warn!("--split-index is ignored for JSON sample windows");
        }
        parse_sample_windows(&raw)?
    } else {
        let values = parse_series_csv(&raw)?;
        split_series(values, options.split_index)
    };

    info!(
        pre_n = split.pre.len(),
        post_n = split.post.len(),
        split_index = split.split_index,
        "windows prepared"
    );
    for warning in &split.warnings {
        warn!(warning = %warning, "series warning");
    }

    let windowing = Windowing {
        split_index: split.split_index,
        n: split.pre.len() + split.post.len(),
    };
    let pre = Window::new("pre", Sample::new(split.pre));
    let post = Window::new("post", Sample::new(split.post));
    let report = run_samples(
        &pre,
        &post,
        &options.thresholds,
        options.with_e,
        split.warnings,
    )?;

    let manifest = write_run_outputs(out_dir, command, run_id, input, &report, Some(windowing))?;
    Ok((report, manifest))
}

fn is_json_input(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case("json"))
        .unwrap_or(false)
}

pub fn parse_sample_windows(raw: &str) -> Result<SplitSeries, PipelineError> {
    let windows: SampleWindows = serde_json::from_str(raw)
        .map_err(|err| PipelineError::InvalidInput(format!("invalid sample windows: {err}")))?;

    let split_index = windows.pre.len();
    let warnings = window_warnings(windows.pre.len(), windows.post.len());
    Ok(SplitSeries {
        pre: windows.pre,
        post: windows.post,
        split_index,
        warnings,
    })
}

/// Quoted fields are not supported.
pub fn parse_series_csv(raw: &str) -> Result<Vec<f64>, PipelineError> {
    let mut lines = raw
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty());

    let (_, header) = lines
        .next()
        .ok_or_else(|| PipelineError::InvalidInput("CSV has no header".to_string()))?;
    let columns = header
        .split(',')
        .map(|column| column.trim())
        .collect::<Vec<&str>>();

    let find = |names: &[&str]| {
        names
            .iter()
            .find_map(|name| columns.iter().position(|column| column == name))
    };
    let has_time = find(&["t", "time"]).is_some();
    let value_index = find(&["value", "y"]);
    let value_index = match (has_time, value_index) {
        (true, Some(index)) => index,
        _ => {
            return Err(PipelineError::InvalidInput(
                "CSV must contain columns (t|time) and (value|y)".to_string(),
            ));
        }
    };

    let mut values = Vec::<f64>::new();
    for (line_index, line) in lines {
        let cell = line.split(',').nth(value_index).map(str::trim).ok_or_else(|| {
            PipelineError::InvalidInput(format!("line {}: missing value column", line_index + 1))
        })?;
        let value = cell.parse::<f64>().map_err(|err| {
            PipelineError::InvalidInput(format!(
                "line {}: invalid value {cell:?}: {err}",
                line_index + 1
            ))
        })?;
        values.push(value);
    }

    Ok(values)
}

/// Splits at `split_index` (midpoint by default), clamped so both windows
/// are non-empty whenever the series has two or more values.
pub fn split_series(values: Vec<f64>, split_index: Option<usize>) -> SplitSeries {
    let n = values.len();
    if n == 0 {
        return SplitSeries {
            pre: Vec::new(),
            post: Vec::new(),
            split_index: 0,
            warnings: vec!["empty_series".to_string()],
        };
    }

    let split = split_index.unwrap_or(n / 2).min(n - 1).max(1);
    let mut pre = values;
    let post = pre.split_off(split.min(n));
    let warnings = window_warnings(pre.len(), post.len());

    SplitSeries {
        pre,
        post,
        split_index: split,
        warnings,
    }
}

fn window_warnings(pre_n: usize, post_n: usize) -> Vec<String> {
    if pre_n < SMALL_WINDOW_MIN || post_n < SMALL_WINDOW_MIN {
        vec!["small_window".to_string()]
    } else {
        Vec::new()
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::TempDir;

    use super::*;

    #[test]
    fn series_manifest_records_windowing() {
        let dir = TempDir::new().expect("tempdir");
        let input = dir.path().join("series.csv");
        fs::write(&input, "t,value\n0,1\n1,2\n2,3\n3,4\n4,5\n").expect("write");
        let options = SeriesOptions {
            thresholds: Thresholds::default(),
            split_index: Some(2),
            with_e: false,
        };

        let (report, manifest) =
            run_series_file(&input, &dir.path().join("out"), "series", "run-test", &options)
                .expect("series run");

        assert_eq!(
            manifest.windowing,
            Some(Windowing {
                split_index: 2,
                n: 5
            })
        );
        assert_eq!(report.ddr.pre.n, 2);
        assert_eq!(report.ddr.post.n, 3);
        assert_eq!(report.warnings, vec!["small_window".to_string()]);
    }

    #[test]
    fn parse_series_csv_reads_value_column_and_ignores_extras() {
        let raw = "t,value,label\n0,1.5,a\n1,2.5,b\n\n2,4,c\n";
        let values = parse_series_csv(raw).expect("csv should parse");
        assert_eq!(values, vec![1.5, 2.5, 4.0]);
    }

    #[test]
    fn parse_series_csv_accepts_time_and_y_aliases() {
        let raw = "y,time\n10,0\n20,1\n";
        let values = parse_series_csv(raw).expect("csv should parse");
        assert_eq!(values, vec![10.0, 20.0]);
    }

    #[test]
    fn parse_series_csv_rejects_missing_columns() {
        let err = parse_series_csv("a,b\n1,2\n").expect_err("missing columns");
        assert!(matches!(err, PipelineError::InvalidInput(_)));
    }

    #[test]
    fn parse_series_csv_reports_bad_values_with_line_number() {
        let err = parse_series_csv("t,value\n0,1\n1,oops\n").expect_err("bad value");
        assert!(err.to_string().contains("line 3"));
    }

    #[test]
    fn split_series_defaults_to_midpoint() {
        let split = split_series(vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0], None);
        assert_eq!(split.split_index, 3);
        assert_eq!(split.pre, vec![1.0, 2.0, 3.0]);
        assert_eq!(split.post, vec![4.0, 5.0, 6.0]);
        assert!(split.warnings.is_empty());
    }

    #[test]
    fn split_series_clamps_index_and_flags_small_windows() {
        let split = split_series(vec![1.0, 2.0, 3.0], Some(10));
        assert_eq!(split.split_index, 2);
        assert_eq!(split.post, vec![3.0]);
        assert_eq!(split.warnings, vec!["small_window".to_string()]);

        let split = split_series(vec![1.0, 2.0, 3.0], Some(0));
        assert_eq!(split.split_index, 1);
        assert_eq!(split.pre, vec![1.0]);
    }

    #[test]
    fn split_series_single_value_keeps_it_in_pre_window() {
        let split = split_series(vec![7.0], None);
        assert_eq!(split.pre, vec![7.0]);
        assert!(split.post.is_empty());
    }

    #[test]
    fn split_series_empty_input_warns() {
        let split = split_series(Vec::new(), Some(3));
        assert!(split.pre.is_empty() && split.post.is_empty());
        assert_eq!(split.warnings, vec!["empty_series".to_string()]);
    }

    #[test]
    fn parse_sample_windows_reads_pre_and_post() {
        let split = parse_sample_windows(r#"{"pre": [1, 2, 3], "post": [1, 2, 3, 4]}"#)
            .expect("windows should parse");
        assert_eq!(split.pre.len(), 3);
        assert_eq!(split.post.len(), 4);
        assert!(split.warnings.is_empty());
    }
}
