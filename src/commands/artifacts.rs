use std::path::Path;

use anyhow::Result;
use chrono::{DateTime, Utc};
use tracing::info;

use crate::canonical::{canonical_digest, write_digest_sidecar};
use crate::model::{ArtifactEntry, InputFingerprint, RunManifest, Windowing};
use crate::pipeline::Report;
use crate::util::{
    ensure_directory, now_utc_string, sha256_file, utc_compact_string, write_json_pretty,
};

pub const EXTRACTION_REPORT_FILE: &str = "extraction_report.json";
pub const DDR_REPORT_FILE: &str = "ddr_report.json";
pub const E_REPORT_FILE: &str = "e_report.json";
pub const REPORT_DIGEST_FILE: &str = "report.sha256.txt";
pub const RUN_MANIFEST_FILE: &str = "run_manifest.json";

pub fn run_id_for(started: DateTime<Utc>) -> String {
    format!("run-{}", utc_compact_string(started))
}

pub fn write_run_outputs(
    out_dir: &Path,
    command: &str,
    run_id: &str,
    input_path: &Path,
    report: &Report,
    windowing: Option<Windowing>,
) -> Result<RunManifest> {
    ensure_directory(out_dir)?;

    let mut written = Vec::<String>::new();

    if let Some(extraction) = report.extraction.as_ref() {
        write_json_pretty(&out_dir.join(EXTRACTION_REPORT_FILE), extraction)?;
        written.push(EXTRACTION_REPORT_FILE.to_string());
    }

    write_json_pretty(&out_dir.join(DDR_REPORT_FILE), &report.ddr)?;
    written.push(DDR_REPORT_FILE.to_string());

    if let Some(e_report) = report.e.as_ref() {
        write_json_pretty(&out_dir.join(E_REPORT_FILE), e_report)?;
        written.push(E_REPORT_FILE.to_string());
    }

    let report_digest = canonical_digest(report)?;
    write_digest_sidecar(&out_dir.join(REPORT_DIGEST_FILE), &report_digest)?;
    written.push(REPORT_DIGEST_FILE.to_string());

    let artifacts = written
        .into_iter()
        .map(|name| {
            let sha256 = sha256_file(&out_dir.join(&name))?;
            Ok(ArtifactEntry { path: name, sha256 })
        })
        .collect::<Result<Vec<ArtifactEntry>>>()?;

    let manifest = RunManifest {
        manifest_version: 1,
        run_id: run_id.to_string(),
        generated_at: now_utc_string(),
        command: command.to_string(),
        input: InputFingerprint {
            path: input_path.display().to_string(),
            sha256: sha256_file(input_path)?,
        },
        report_digest,
        ddr: report.ddr.classification.as_str().to_string(),
        e: report
            .e
            .as_ref()
            .map(|e_report| e_report.classification.as_str().to_string()),
        artifacts,
        warnings: report.warnings.clone(),
        windowing,
    };

    let manifest_path = out_dir.join(RUN_MANIFEST_FILE);
    write_json_pretty(&manifest_path, &manifest)?;
    info!(
        path = %manifest_path.display(),
        artifacts = manifest.artifacts.len(),
        "wrote run manifest"
    );

    Ok(manifest)
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::TempDir;

    use super::*;
    use crate::canonical::read_digest_sidecar;
    use crate::pipeline::{
        ExtractionConfig, PipelineConfig, PolicyFlags, Sample, Thresholds, Window, run_document,
        run_samples,
    };

    const DOCUMENT: &str = "## A. Structure
- a1
- a2
- a3

## B. Métrologie
- b1
- b2
- b3
- b4
";

    fn document_report(with_e: bool) -> Report {
        let extraction_config = ExtractionConfig::with_default_sections(false).expect("sections");
        let config = PipelineConfig {
            thresholds: Thresholds::default(),
            policy: PolicyFlags::default(),
            pre_key: "A_structure".to_string(),
            post_key: "B_metrologie".to_string(),
            with_e,
        };
        run_document(DOCUMENT, &extraction_config, &config).expect("report")
    }

    fn artifact_names(manifest: &RunManifest) -> Vec<&str> {
        manifest
            .artifacts
            .iter()
            .map(|artifact| artifact.path.as_str())
            .collect()
    }

    #[test]
    fn run_outputs_fingerprint_every_artifact() {
        let dir = TempDir::new().expect("tempdir");
        let input = dir.path().join("protocol.md");
        fs::write(&input, DOCUMENT).expect("write input");
        let out = dir.path().join("out");
        let report = document_report(true);

        let manifest =
            write_run_outputs(&out, "ddr", "run-test", &input, &report, None).expect("outputs");

        assert_eq!(
            artifact_names(&manifest),
            vec![
                EXTRACTION_REPORT_FILE,
                DDR_REPORT_FILE,
                E_REPORT_FILE,
                REPORT_DIGEST_FILE
            ]
        );
        for artifact in &manifest.artifacts {
            let actual = sha256_file(&out.join(&artifact.path)).expect("hash");
            assert_eq!(artifact.sha256, actual, "{}", artifact.path);
        }

        let digest = canonical_digest(&report).expect("digest");
        assert_eq!(manifest.report_digest, digest);
        assert_eq!(
            read_digest_sidecar(&out.join(REPORT_DIGEST_FILE)).expect("sidecar"),
            digest
        );
        assert_eq!(manifest.input.sha256, sha256_file(&input).expect("hash"));
        assert_eq!(manifest.ddr, report.ddr.classification.as_str());
        assert_eq!(
            manifest.e.as_deref(),
            report.e.as_ref().map(|e| e.classification.as_str())
        );
        assert!(manifest.windowing.is_none());

        let raw = fs::read_to_string(out.join(RUN_MANIFEST_FILE)).expect("manifest");
        let stored: RunManifest = serde_json::from_str(&raw).expect("manifest json");
        assert_eq!(stored.run_id, "run-test");
        assert_eq!(stored.command, "ddr");
        assert_eq!(stored.report_digest, digest);
        assert_eq!(stored.artifacts, manifest.artifacts);
    }

    #[test]
    fn e_report_is_written_only_when_requested() {
        let dir = TempDir::new().expect("tempdir");
        let input = dir.path().join("protocol.md");
        fs::write(&input, DOCUMENT).expect("write input");
        let out = dir.path().join("out");

        let report = document_report(false);
        let manifest =
            write_run_outputs(&out, "ddr", "run-test", &input, &report, None).expect("outputs");

        assert!(!out.join(E_REPORT_FILE).exists());
        assert!(manifest.e.is_none());
        assert_eq!(
            artifact_names(&manifest),
            vec![EXTRACTION_REPORT_FILE, DDR_REPORT_FILE, REPORT_DIGEST_FILE]
        );
    }

    #[test]
    fn sample_reports_skip_the_extraction_file() {
        let dir = TempDir::new().expect("tempdir");
        let input = dir.path().join("series.json");
        fs::write(&input, r#"{"pre": [1, 2, 3], "post": [1, 2, 3]}"#).expect("write input");
        let out = dir.path().join("out");

        let pre = Window::new("pre", Sample::new(vec![1.0, 2.0, 3.0]));
        let post = Window::new("post", Sample::new(vec![1.0, 2.0, 3.0]));
        let report =
            run_samples(&pre, &post, &Thresholds::default(), true, Vec::new()).expect("report");
        let windowing = Windowing {
            split_index: 3,
            n: 6,
        };

        let manifest =
            write_run_outputs(&out, "series", "run-test", &input, &report, Some(windowing))
                .expect("outputs");

        assert!(!out.join(EXTRACTION_REPORT_FILE).exists());
        assert_eq!(
            artifact_names(&manifest),
            vec![DDR_REPORT_FILE, E_REPORT_FILE, REPORT_DIGEST_FILE]
        );
        assert_eq!(manifest.windowing, Some(windowing));
    }

    #[test]
    fn missing_input_fails_before_manifest_is_written() {
        let dir = TempDir::new().expect("tempdir");
        let out = dir.path().join("out");

        let result = write_run_outputs(
            &out,
            "ddr",
            "run-test",
            &dir.path().join("absent.md"),
            &document_report(true),
            None,
        );
        assert!(result.is_err());
        assert!(!out.join(RUN_MANIFEST_FILE).exists());
    }
}
