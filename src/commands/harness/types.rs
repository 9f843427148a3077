use super::*;

pub const STRUCT_N_MODE: &str = "STRUCT_N";
pub const STRUCT_N_KERNEL: &str = "STRUCT_N_v0.1";
pub const UNASSIGNED_GROUP: &str = "__UNASSIGNED__";
pub const DEFAULT_GROUP_COLUMN: &str = "Status";

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AdapterId {
    Docs,
    Tickets,
    Generic,
}

impl AdapterId {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Docs => "docs",
            Self::Tickets => "tickets",
            Self::Generic => "generic",
        }
    }
}

fn default_mode() -> String {
    STRUCT_N_MODE.to_string()
}

fn default_eps() -> f64 {
    DEFAULT_EPS
}

fn default_min_n_for_moments() -> usize {
    DEFAULT_MIN_N_FOR_MOMENTS
}

fn default_min_n_for_quantiles() -> usize {
    DEFAULT_MIN_N_FOR_QUANTILES
}

fn default_min_n_for_mad() -> usize {
    DEFAULT_MIN_N_FOR_MAD
}

fn default_max_unassigned_ratio() -> f64 {
    DEFAULT_MAX_UNASSIGNED_RATIO
}

#[derive(Debug, Clone, Deserialize)]
pub struct HarnessProfile {
    pub id: String,
    #[serde(default = "default_mode")]
    pub mode: String,
    #[serde(default)]
    pub ingestion: Option<String>,
    pub adapter_id: AdapterId,
    pub fixture: String,
    pub pre_key: String,
    pub post_key: String,
    #[serde(default = "default_eps")]
    pub eps: f64,
    #[serde(default = "default_min_n_for_moments")]
    pub min_n_for_moments: usize,
    #[serde(default = "default_min_n_for_quantiles")]
    pub min_n_for_quantiles: usize,
    #[serde(default = "default_min_n_for_mad", alias = "min_n_for_MAD")]
    pub min_n_for_mad: usize,
    #[serde(default)]
    pub strict_parsing: bool,
    #[serde(default = "default_max_unassigned_ratio")]
    pub max_unassigned_ratio: f64,
    #[serde(default)]
    pub reset_on_blank_line: Option<bool>,
    #[serde(default)]
    pub group_col: Option<String>,
    #[serde(default)]
    pub expected: Option<String>,
}

impl HarnessProfile {
    pub fn thresholds(&self) -> Result<Thresholds, PipelineError> {
        Thresholds::new(
            self.eps,
            self.min_n_for_moments,
            self.min_n_for_quantiles,
            self.min_n_for_mad,
        )
    }

    pub fn policy(&self) -> PolicyFlags {
        PolicyFlags {
            strict_parsing: self.strict_parsing,
            max_unassigned_ratio: self.max_unassigned_ratio,
        }
    }

    /// Document profiles reset the current section on blank lines unless
    /// they say otherwise.
    pub fn resolved_reset_on_blank_line(&self) -> bool {
        self.reset_on_blank_line.unwrap_or(true)
    }

    pub fn group_column(&self) -> &str {
        self.group_col.as_deref().unwrap_or(DEFAULT_GROUP_COLUMN)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct HarnessMeta {
    pub profile_id: String,
    pub mode: String,
    pub ingestion: Option<String>,
    pub adapter_id: AdapterId,
    pub kernel: String,
    pub fixture: String,
    pub pre_key: String,
    pub post_key: String,
    pub thresholds: Thresholds,
    pub policy: PolicyFlags,
}

#[derive(Debug, Clone, Serialize)]
pub struct HarnessCaseReport {
    pub meta: HarnessMeta,
    pub report: Report,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CaseStatus {
    Pass,
    FailHash,
    MissingExpected,
    Updated,
    NoExpected,
    Error,
}

impl CaseStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pass => "PASS",
            Self::FailHash => "FAIL_HASH",
            Self::MissingExpected => "MISSING_EXPECTED",
            Self::Updated => "UPDATED",
            Self::NoExpected => "NO_EXPECTED",
            Self::Error => "ERROR",
        }
    }

    pub fn is_failure(self) -> bool {
        matches!(self, Self::FailHash | Self::Error)
    }
}

impl From<SnapshotStatus> for CaseStatus {
    fn from(status: SnapshotStatus) -> Self {
        match status {
            SnapshotStatus::Pass => Self::Pass,
            SnapshotStatus::FailHash => Self::FailHash,
            SnapshotStatus::MissingExpected => Self::MissingExpected,
            SnapshotStatus::Updated => Self::Updated,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct HarnessCaseResult {
    pub profile_id: String,
    pub profile_path: String,
    pub status: CaseStatus,
    pub hash_sha256: Option<String>,
    pub error: Option<String>,
    pub case: Option<HarnessCaseReport>,
}

#[derive(Debug, Clone, Serialize)]
pub struct HarnessResults {
    pub manifest_version: u32,
    pub generated_at: String,
    pub snapshot_mode: String,
    pub summary: BTreeMap<String, CaseStatus>,
    pub results: Vec<HarnessCaseResult>,
}
