use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactEntry {
    pub path: String,
    pub sha256: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputFingerprint {
    pub path: String,
    pub sha256: String,
}

/// Written next to the report files of a `ddr`, `series` or `bands` run. Holds the
/// only timestamps; the reports themselves stay reproducible.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunManifest {
    pub manifest_version: u32,
    pub run_id: String,
    pub generated_at: String,
    pub command: String,
    pub input: InputFingerprint,
    pub report_digest: String,
    pub ddr: String,
    pub e: Option<String>,
    pub artifacts: Vec<ArtifactEntry>,
    pub warnings: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub windowing: Option<Windowing>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Windowing {
    pub split_index: usize,
    pub n: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BandOutcome {
    pub band: String,
    pub success: bool,
    pub out_dir: String,
    pub split_index: Option<usize>,
    pub ddr: Option<String>,
    pub e: Option<String>,
    pub report_digest: Option<String>,
    pub warnings: usize,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BandsSummary {
    pub manifest_version: u32,
    pub run_id: String,
    pub generated_at: String,
    pub input_dir: String,
    pub ok: usize,
    pub total: usize,
    pub bands: Vec<BandOutcome>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexEntry {
    pub sha256: String,
    pub path: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct IndexVerification {
    pub checked: usize,
    pub ok: usize,
    pub bad: Vec<IndexMismatch>,
    pub missing: Vec<String>,
}

impl IndexVerification {
    pub fn is_clean(&self) -> bool {
        self.bad.is_empty() && self.missing.is_empty()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct IndexMismatch {
    pub path: String,
    pub expected: String,
    pub actual: String,
}
