use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use chrono::Utc;
use tracing::{info, warn};

use crate::cli::BandsArgs;
use crate::commands::artifacts::run_id_for;
use crate::commands::series::{SeriesOptions, run_series_file};
use crate::model::{BandOutcome, BandsSummary};
use crate::pipeline::PipelineError;
use crate::util::{now_utc_string, write_json_pretty};

pub const BANDS_SUMMARY_FILE: &str = "bands_summary.json";
const BANDS_SUMMARY_VERSION: u32 = 1;
const BAND_PREFIX: &str = "band_";

pub fn run(args: BandsArgs) -> Result<()> {
    let run_id = run_id_for(Utc::now());
    let options = SeriesOptions {
        thresholds: args.thresholds.to_thresholds()?,
        split_index: args.split_index,
        with_e: args.with_e,
    };

    let bands = discover_bands(&args.input_dir)?;
    if bands.is_empty() {
        bail!(
            "no {BAND_PREFIX}*.csv files found in {}",
            args.input_dir.display()
        );
    }

    info!(
        input_dir = %args.input_dir.display(),
        bands = bands.len(),
        run_id = %run_id,
        "starting band suite"
    );

    let outcomes = bands
        .iter()
        .map(|path| run_band(path, &args.out, &run_id, &options))
        .collect::<Vec<BandOutcome>>();
    let ok = outcomes.iter().filter(|outcome| outcome.success).count();

    let summary = BandsSummary {
        manifest_version: BANDS_SUMMARY_VERSION,
        run_id,
        generated_at: now_utc_string(),
        input_dir: args.input_dir.display().to_string(),
        ok,
        total: outcomes.len(),
        bands: outcomes,
    };
    let summary_path = args.out.join(BANDS_SUMMARY_FILE);
    write_json_pretty(&summary_path, &summary)?;

    info!(
        ok = summary.ok,
        total = summary.total,
        out = %summary_path.display(),
        "band suite completed"
    );

    if summary.ok == 0 {
        bail!("no band succeeded ({} attempted)", summary.total);
    }
    Ok(())
}

pub fn discover_bands(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(PipelineError::InputNotFound {
            path: dir.to_path_buf(),
        }
        .into());
    }

    let entries = fs::read_dir(dir).with_context(|| format!("failed to read {}", dir.display()))?;

    let mut bands = Vec::new();
    for entry in entries {
        let entry = entry.with_context(|| format!("failed to read entry in {}", dir.display()))?;
        let path = entry.path();
        let is_band = path.is_file()
            && path
                .file_name()
                .and_then(|name| name.to_str())
                .is_some_and(|name| name.starts_with(BAND_PREFIX) && name.ends_with(".csv"));
        if is_band {
            bands.push(path);
        }
    }

    bands.sort();
    Ok(bands)
}

/// A failing band is recorded and the suite moves on.
fn run_band(path: &Path, out_root: &Path, run_id: &str, options: &SeriesOptions) -> BandOutcome {
    let band = path
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    let band_dir = out_root.join(&band);

    match run_series_file(path, &band_dir, "bands", run_id, options) {
        Ok((report, manifest)) => {
            info!(
                band = %band,
                ddr = %manifest.ddr,
                e = %manifest.e.as_deref().unwrap_or("-"),
                "band completed"
            );
            BandOutcome {
                band,
                success: true,
                out_dir: band_dir.display().to_string(),
                split_index: manifest.windowing.map(|windowing| windowing.split_index),
                ddr: Some(manifest.ddr),
                e: manifest.e,
                report_digest: Some(manifest.report_digest),
                warnings: report.warnings.len(),
                error: None,
            }
        }
        Err(err) => {
            let message = err
                .chain()
                .map(ToString::to_string)
                .collect::<Vec<String>>()
                .join(": ");
            warn!(band = %band, error = %message, "band failed");
            BandOutcome {
                band,
                success: false,
                out_dir: band_dir.display().to_string(),
                split_index: None,
                ddr: None,
                e: None,
                report_digest: None,
                warnings: 0,
                error: Some(message),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use clap::Parser;
    use tempfile::TempDir;

    use super::*;
    use crate::cli::{Cli, Commands};
    use crate::commands::artifacts::RUN_MANIFEST_FILE;
    use crate::model::{RunManifest, Windowing};

    fn bands_args(input_dir: &Path, out: &Path) -> BandsArgs {
        let cli = Cli::try_parse_from([
            "sost",
            "bands",
            "--input-dir",
            input_dir.to_str().expect("utf8 path"),
            "--out",
            out.to_str().expect("utf8 path"),
            "--with-e",
        ])
        .expect("cli");
        match cli.command {
            Commands::Bands(args) => args,
            other => panic!("unexpected command {other:?}"),
        }
    }

    fn read_summary(out: &Path) -> BandsSummary {
        let raw = fs::read_to_string(out.join(BANDS_SUMMARY_FILE)).expect("summary");
        serde_json::from_str(&raw).expect("summary json")
    }

    #[test]
    fn discover_bands_keeps_band_csv_files_sorted() {
        let dir = TempDir::new().expect("tempdir");
        for name in ["band_b.csv", "band_a.csv", "other.csv", "band_c.json"] {
            fs::write(dir.path().join(name), "").expect("write");
        }

        let names = discover_bands(dir.path())
            .expect("discover")
            .iter()
            .filter_map(|path| path.file_name().map(|name| name.to_string_lossy().into_owned()))
            .collect::<Vec<String>>();
        assert_eq!(names, vec!["band_a.csv", "band_b.csv"]);

        let err = discover_bands(&dir.path().join("absent")).expect_err("missing dir");
        let pipeline_err = err.downcast_ref::<PipelineError>().expect("pipeline error");
        assert_eq!(pipeline_err.exit_code(), 3);
    }

    #[test]
    fn band_suite_writes_per_band_outputs_and_summary() {
        let input = TempDir::new().expect("tempdir");
        let out = TempDir::new().expect("tempdir");
        fs::write(
            input.path().join("band_low.csv"),
            "t,value\n0,1\n1,2\n2,3\n3,1\n4,2\n5,3\n",
        )
        .expect("write");
        fs::write(input.path().join("band_bad.csv"), "a,b\n1,2\n").expect("write");

        run(bands_args(input.path(), out.path())).expect("suite");

        let summary = read_summary(out.path());
        assert_eq!(summary.total, 2);
        assert_eq!(summary.ok, 1);

        let bad = &summary.bands[0];
        assert_eq!(bad.band, "band_bad");
        assert!(!bad.success);
        assert!(bad.error.as_deref().is_some_and(|message| message.contains("CSV must contain")));

        let low = &summary.bands[1];
        assert_eq!(low.band, "band_low");
        assert!(low.success);
        assert_eq!(low.split_index, Some(3));
        assert_eq!(low.ddr.as_deref(), Some("RESTORED"));
        assert_eq!(low.e.as_deref(), Some("COMPATIBLE"));

        let raw = fs::read_to_string(out.path().join("band_low").join(RUN_MANIFEST_FILE))
            .expect("band manifest");
        let manifest: RunManifest = serde_json::from_str(&raw).expect("manifest json");
        assert_eq!(manifest.command, "bands");
        assert_eq!(
            manifest.windowing,
            Some(Windowing {
                split_index: 3,
                n: 6
            })
        );
        assert_eq!(low.report_digest.as_deref(), Some(manifest.report_digest.as_str()));
    }

    #[test]
    fn band_suite_fails_when_no_band_succeeds() {
        let input = TempDir::new().expect("tempdir");
        let out = TempDir::new().expect("tempdir");
        fs::write(input.path().join("band_bad.csv"), "t,value\n0,oops\n").expect("write");

        let err = run(bands_args(input.path(), out.path())).expect_err("no success");
        assert!(err.to_string().contains("no band succeeded"));

        let summary = read_summary(out.path());
        assert_eq!(summary.ok, 0);
        assert_eq!(summary.total, 1);
    }

    #[test]
    fn empty_band_directory_is_an_error() {
        let input = TempDir::new().expect("tempdir");
        let out = TempDir::new().expect("tempdir");

        let err = run(bands_args(input.path(), out.path())).expect_err("no bands");
        assert!(err.to_string().contains("band_*.csv"));
    }
}
