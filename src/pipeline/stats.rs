use serde::{Deserialize, Serialize};

use super::thresholds::Thresholds;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Sample {
    values: Vec<f64>,
}

impl Sample {
    pub fn new(values: Vec<f64>) -> Self {
        Self { values }
    }

    /// Proxy series `1..=n` standing in for a section with `n` list items.
    pub fn proxy_ids(n: usize) -> Self {
        Self {
            values: (1..=n).map(|id| id as f64).collect(),
        }
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn sorted(&self) -> Vec<f64> {
        let mut sorted = self.values.clone();
        sorted.sort_by(|left, right| left.total_cmp(right));
        sorted
    }
}

/// The five statistics compared across windows. Variance and std are
/// reported but never compared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Invariant {
    Mean,
    Median,
    Mad,
    P90,
    P99,
}

impl Invariant {
    pub const ALL: [Invariant; 5] = [
        Invariant::Mean,
        Invariant::Median,
        Invariant::Mad,
        Invariant::P90,
        Invariant::P99,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Mean => "mean",
            Self::Median => "median",
            Self::Mad => "mad",
            Self::P90 => "p90",
            Self::P99 => "p99",
        }
    }

    pub fn value_in(self, stats: &WindowStatistics) -> Option<f64> {
        match self {
            Self::Mean => stats.mean,
            Self::Median => stats.median,
            Self::Mad => stats.mad,
            Self::P90 => stats.p90,
            Self::P99 => stats.p99,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WindowStatistics {
    pub n: usize,
    pub mean: Option<f64>,
    pub median: Option<f64>,
    pub mad: Option<f64>,
    pub p90: Option<f64>,
    pub p99: Option<f64>,
    pub variance: Option<f64>,
    pub std: Option<f64>,
}

impl WindowStatistics {
    pub fn compute(sample: &Sample, thresholds: &Thresholds) -> Self {
        let sorted = sample.sorted();
        let n = sorted.len();

        let (variance, std) = if moments_allowed(n, thresholds) {
            let variance = sample_variance(&sorted);
            (variance, variance.map(f64::sqrt))
        } else {
            (None, None)
        };

        Self {
            n,
            mean: mean(&sorted),
            median: median_sorted(&sorted),
            mad: mad_sorted(&sorted, thresholds.min_n_for_mad),
            p90: quantile_sorted(&sorted, 0.90, thresholds.min_n_for_quantiles),
            p99: quantile_sorted(&sorted, 0.99, thresholds.min_n_for_quantiles),
            variance,
            std,
        }
    }

    pub fn neutralized(&self, thresholds: &Thresholds) -> Vec<String> {
        if moments_allowed(self.n, thresholds) {
            Vec::new()
        } else {
            vec!["variance".to_string(), "std".to_string()]
        }
    }
}

fn moments_allowed(n: usize, thresholds: &Thresholds) -> bool {
    n >= thresholds.min_n_for_moments && n >= 2
}

pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }

    // Dividing first keeps sums of values near f64::MAX finite.
    let n = values.len() as f64;
    Some(values.iter().map(|value| value / n).sum::<f64>())
}

pub fn median_sorted(sorted: &[f64]) -> Option<f64> {
    let n = sorted.len();
    if n == 0 {
        return None;
    }

    let mid = n / 2;
    if n % 2 == 1 {
        Some(sorted[mid])
    } else {
        Some((sorted[mid - 1] + sorted[mid]) / 2.0)
    }
}

pub fn quantile_sorted(sorted: &[f64], q: f64, min_n: usize) -> Option<f64> {
    let n = sorted.len();
    if n == 0 || n < min_n {
        return None;
    }

    let pos = (n - 1) as f64 * q;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    if lo == hi {
        return Some(sorted[lo]);
    }

    let frac = pos - lo as f64;
    Some(sorted[lo] + frac * (sorted[hi] - sorted[lo]))
}

pub fn mad_sorted(sorted: &[f64], min_n: usize) -> Option<f64> {
    if sorted.is_empty() || sorted.len() < min_n {
        return None;
    }

    let center = median_sorted(sorted)?;
    let mut deviations = sorted
        .iter()
        .map(|value| (value - center).abs())
        .collect::<Vec<f64>>();
    deviations.sort_by(|left, right| left.total_cmp(right));
    median_sorted(&deviations)
}

pub fn sample_variance(values: &[f64]) -> Option<f64> {
    let n = values.len();
    if n < 2 {
        return None;
    }

    let center = mean(values)?;
    let sum_sq = values
        .iter()
        .map(|value| (value - center) * (value - center))
        .sum::<f64>();
    Some(sum_sq / (n - 1) as f64).filter(|variance| variance.is_finite())
}
