use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::canonical::{
    SnapshotMode, SnapshotStatus, canonical_digest, canonical_value, check_snapshot,
    resolve_snapshot_mode,
};
use crate::cli::HarnessArgs;
use crate::pipeline::{
    DEFAULT_EPS, DEFAULT_MAX_UNASSIGNED_RATIO, DEFAULT_MIN_N_FOR_MAD, DEFAULT_MIN_N_FOR_MOMENTS,
    DEFAULT_MIN_N_FOR_QUANTILES, ExtractionConfig, ExtractionResult, HEADING_SOURCE,
    PipelineConfig, PipelineError, PolicyFlags, Report, Thresholds, extract_sections, run_counts,
};
use crate::util::{now_utc_string, read_input_text, write_json_pretty};

mod adapters;
mod run;
mod types;

pub use run::run;

use adapters::*;
use run::*;
use types::*;
