use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::pipeline::{
    DEFAULT_EPS, DEFAULT_MAX_UNASSIGNED_RATIO, DEFAULT_MIN_N_FOR_MAD, DEFAULT_MIN_N_FOR_MOMENTS,
    DEFAULT_MIN_N_FOR_QUANTILES, DEFAULT_POST_KEY, DEFAULT_PRE_KEY, PipelineError, Thresholds,
};

#[derive(Parser, Debug)]
#[command(
    name = "sost",
    version,
    about = "Descriptive pre/post comparison: DD, DDR and E reports"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Extract section item counts from a document and classify pre vs post.
    Ddr(DdrArgs),
    /// Compare two windows of raw numeric samples.
    Series(SeriesArgs),
    /// Run the series comparison once per band_*.csv in a directory.
    Bands(BandsArgs),
    /// Run every harness profile and compare against golden snapshots.
    Harness(HarnessArgs),
    /// Build or verify a SHA-256 file index.
    Index(IndexArgs),
}

#[derive(Args, Debug, Clone)]
pub struct ThresholdArgs {
    #[arg(long, default_value_t = DEFAULT_EPS)]
    pub eps: f64,

    #[arg(long = "min-n-moments", default_value_t = DEFAULT_MIN_N_FOR_MOMENTS)]
    pub min_n_for_moments: usize,

    #[arg(long = "min-n-quantiles", default_value_t = DEFAULT_MIN_N_FOR_QUANTILES)]
    pub min_n_for_quantiles: usize,

    #[arg(long = "min-n-mad", default_value_t = DEFAULT_MIN_N_FOR_MAD)]
    pub min_n_for_mad: usize,
}

impl ThresholdArgs {
    pub fn to_thresholds(&self) -> Result<Thresholds, PipelineError> {
        Thresholds::new(
            self.eps,
            self.min_n_for_moments,
            self.min_n_for_quantiles,
            self.min_n_for_mad,
        )
    }
}

#[derive(Args, Debug, Clone)]
pub struct DdrArgs {
    #[arg(long)]
    pub document: PathBuf,

    #[arg(long, default_value = DEFAULT_PRE_KEY)]
    pub pre_key: String,

    #[arg(long, default_value = DEFAULT_POST_KEY)]
    pub post_key: String,

    #[arg(long, default_value = "outputs")]
    pub out: PathBuf,

    #[command(flatten)]
    pub thresholds: ThresholdArgs,

    #[arg(long, default_value_t = false)]
    pub with_e: bool,

    #[arg(long, default_value_t = false)]
    pub strict_parsing: bool,

    #[arg(long, default_value_t = DEFAULT_MAX_UNASSIGNED_RATIO)]
    pub max_unassigned_ratio: f64,

    #[arg(long, default_value_t = false)]
    pub reset_on_blank_line: bool,

    /// Section detector as KEY=REGEX over normalized heading text; repeatable.
    #[arg(long = "section")]
    pub sections: Vec<String>,
}

#[derive(Args, Debug, Clone)]
pub struct SeriesArgs {
    /// CSV series (t|time, value|y) or JSON {"pre": [...], "post": [...]}.
    #[arg(long)]
    pub input: PathBuf,

    #[arg(long)]
    pub split_index: Option<usize>,

    #[arg(long, default_value = "outputs")]
    pub out: PathBuf,

    #[command(flatten)]
    pub thresholds: ThresholdArgs,

    #[arg(long, default_value_t = false)]
    pub with_e: bool,
}

#[derive(Args, Debug, Clone)]
pub struct BandsArgs {
    #[arg(long)]
    pub input_dir: PathBuf,

    #[arg(long, default_value = "outputs/bands")]
    pub out: PathBuf,

    #[arg(long)]
    pub split_index: Option<usize>,

    #[command(flatten)]
    pub thresholds: ThresholdArgs,

    #[arg(long, default_value_t = false)]
    pub with_e: bool,
}

#[derive(Args, Debug, Clone)]
pub struct HarnessArgs {
    #[arg(long, default_value = ".")]
    pub repo_root: PathBuf,

    #[arg(long, default_value = "tests/profiles")]
    pub profiles: PathBuf,

    #[arg(long, default_value = "tests/results.json")]
    pub out: PathBuf,

    #[arg(long, default_value_t = false)]
    pub update_expected: bool,
}

#[derive(Args, Debug, Clone)]
pub struct IndexArgs {
    #[command(subcommand)]
    pub action: IndexAction,
}

#[derive(Subcommand, Debug, Clone)]
pub enum IndexAction {
    Build(IndexBuildArgs),
    Verify(IndexVerifyArgs),
}

#[derive(Args, Debug, Clone)]
pub struct IndexBuildArgs {
    #[arg(long, default_value = ".")]
    pub root: PathBuf,

    #[arg(long, default_value = "FILE_INDEX_SHA256.txt")]
    pub out: PathBuf,

    #[arg(long = "exclude")]
    pub excludes: Vec<String>,
}

#[derive(Args, Debug, Clone)]
pub struct IndexVerifyArgs {
    #[arg(long, default_value = ".")]
    pub root: PathBuf,

    #[arg(long, default_value = "FILE_INDEX_SHA256.txt")]
    pub index: PathBuf,
}
