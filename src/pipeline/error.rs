use std::path::PathBuf;

use thiserror::Error;

/// Failures that abort a pipeline invocation.
///
/// Non-computable statistics are not errors; they travel through the report
/// as `None` values and steer classification instead.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("input not found: {}", path.display())]
    InputNotFound { path: PathBuf },

    #[error("structural violation: {0}")]
    StructuralViolation(StructuralViolation),

    #[error("invalid thresholds: {0}")]
    InvalidThresholds(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum StructuralViolation {
    StrictParsing { unassigned_count: usize },
    UnassignedRatio { ratio: f64, max_ratio: f64 },
}

impl std::fmt::Display for StructuralViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::StrictParsing { unassigned_count } => write!(
                f,
                "strict parsing: {unassigned_count} list item(s) outside any recognized section"
            ),
            Self::UnassignedRatio { ratio, max_ratio } => {
                write!(f, "unassigned_ratio={ratio:.3} > {max_ratio:.3}")
            }
        }
    }
}

impl PipelineError {
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::StructuralViolation(_) => 2,
            Self::InputNotFound { .. } => 3,
            Self::InvalidThresholds(_) | Self::InvalidInput(_) => 1,
        }
    }
}
