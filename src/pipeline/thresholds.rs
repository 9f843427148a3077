use serde::{Deserialize, Serialize};

use super::error::PipelineError;

pub const DEFAULT_EPS: f64 = 0.02;
pub const DEFAULT_MIN_N_FOR_MOMENTS: usize = 5;
pub const DEFAULT_MIN_N_FOR_QUANTILES: usize = 2;
pub const DEFAULT_MIN_N_FOR_MAD: usize = 2;
pub const DEFAULT_MAX_UNASSIGNED_RATIO: f64 = 0.10;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Thresholds {
    pub eps: f64,
    pub min_n_for_moments: usize,
    pub min_n_for_quantiles: usize,
    pub min_n_for_mad: usize,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            eps: DEFAULT_EPS,
            min_n_for_moments: DEFAULT_MIN_N_FOR_MOMENTS,
            min_n_for_quantiles: DEFAULT_MIN_N_FOR_QUANTILES,
            min_n_for_mad: DEFAULT_MIN_N_FOR_MAD,
        }
    }
}

impl Thresholds {
    pub fn new(
        eps: f64,
        min_n_for_moments: usize,
        min_n_for_quantiles: usize,
        min_n_for_mad: usize,
    ) -> Result<Self, PipelineError> {
        let thresholds = Self {
            eps,
            min_n_for_moments,
            min_n_for_quantiles,
            min_n_for_mad,
        };
        thresholds.validate()?;
        Ok(thresholds)
    }

    pub fn validate(&self) -> Result<(), PipelineError> {
        if !self.eps.is_finite() || self.eps < 0.0 {
            return Err(PipelineError::InvalidThresholds(format!(
                "eps must be finite and >= 0, got {}",
                self.eps
            )));
        }

        for (name, value) in [
            ("min_n_for_moments", self.min_n_for_moments),
            ("min_n_for_quantiles", self.min_n_for_quantiles),
            ("min_n_for_mad", self.min_n_for_mad),
        ] {
            if value < 1 {
                return Err(PipelineError::InvalidThresholds(format!(
                    "{name} must be >= 1, got {value}"
                )));
            }
        }

        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PolicyFlags {
    pub strict_parsing: bool,
    pub max_unassigned_ratio: f64,
}

impl Default for PolicyFlags {
    fn default() -> Self {
        Self {
            strict_parsing: false,
            max_unassigned_ratio: DEFAULT_MAX_UNASSIGNED_RATIO,
        }
    }
}

impl PolicyFlags {
    pub fn validate(&self) -> Result<(), PipelineError> {
        if self.max_unassigned_ratio.is_nan() || self.max_unassigned_ratio < 0.0 {
            return Err(PipelineError::InvalidThresholds(format!(
                "max_unassigned_ratio must be >= 0, got {}",
                self.max_unassigned_ratio
            )));
        }
        Ok(())
    }
}
