use std::collections::BTreeMap;

use serde::Serialize;

use super::classify::{Comparison, DdrClass, EClass, compare};
use super::extract::ExtractionResult;
use super::stats::{Invariant, Sample, WindowStatistics};
use super::thresholds::Thresholds;

pub const REPORT_VERSION: &str = "0.3.1";

#[derive(Debug, Clone)]
pub struct Window {
    pub label: String,
    pub sample: Sample,
}

impl Window {
    pub fn new(label: impl Into<String>, sample: Sample) -> Self {
        Self {
            label: label.into(),
            sample,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WindowReport {
    pub label: String,
    pub n: usize,
    pub statistics: WindowStatistics,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryDetail {
    pub overview: String,
    pub invariants_ok: Vec<Invariant>,
    pub invariants_ko: Vec<Invariant>,
    pub divergences: BTreeMap<String, Option<f64>>,
    pub neutralized: Vec<String>,
    pub notes: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DdrReport {
    pub thresholds: Thresholds,
    pub neutralized_by_min_n_for_moments: Vec<String>,
    pub pre: WindowReport,
    pub post: WindowReport,
    pub divergences: BTreeMap<String, Option<f64>>,
    pub invariants_ok: Vec<Invariant>,
    pub invariants_ko: Vec<Invariant>,
    pub invariants_nc: Vec<Invariant>,
    pub classification: DdrClass,
    pub summary: String,
    pub summary_detail: SummaryDetail,
    pub limits: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EReport {
    pub classification: EClass,
    pub ko: Vec<Invariant>,
    pub nc: Vec<Invariant>,
}

/// Everything one invocation produces. This is the tree that gets
/// canonically serialized and hashed, so it carries no timestamps.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Report {
    pub version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extraction: Option<ExtractionResult>,
    pub ddr: DdrReport,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub e: Option<EReport>,
    pub warnings: Vec<String>,
}

pub fn compare_windows(
    pre: &Window,
    post: &Window,
    thresholds: &Thresholds,
    proxy_series: bool,
) -> (DdrReport, EReport) {
    let pre_stats = WindowStatistics::compute(&pre.sample, thresholds);
    let post_stats = WindowStatistics::compute(&post.sample, thresholds);
    let comparison = compare(&pre_stats, &post_stats, thresholds.eps);

    let mut neutralized = pre_stats.neutralized(thresholds);
    for metric in post_stats.neutralized(thresholds) {
        if !neutralized.contains(&metric) {
            neutralized.push(metric);
        }
    }

    let divergences = comparison.divergence_map();
    let summary = summary_line(&comparison, thresholds.eps);
    let overview = format!(
        "Comparison {} (n={}) vs {} (n={}): {} invariant(s) KO, {} invariant(s) OK. DDR={}.",
        pre.label,
        pre_stats.n,
        post.label,
        post_stats.n,
        comparison.buckets.ko.len(),
        comparison.buckets.ok.len(),
        comparison.ddr.as_str()
    );

    let mut limits = Vec::<String>::new();
    if proxy_series {
        limits.push("proxy series are item IDs 1..n per section, not temporal phases".to_string());
    }
    limits.push(format!(
        "variance/std neutralized when n < min_n_for_moments ({})",
        thresholds.min_n_for_moments
    ));

    let e_report = EReport {
        classification: comparison.e,
        ko: comparison.buckets.ko.clone(),
        nc: comparison.buckets.nc.clone(),
    };

    let ddr_report = DdrReport {
        thresholds: *thresholds,
        neutralized_by_min_n_for_moments: neutralized.clone(),
        pre: WindowReport {
            label: pre.label.clone(),
            n: pre_stats.n,
            statistics: pre_stats,
        },
        post: WindowReport {
            label: post.label.clone(),
            n: post_stats.n,
            statistics: post_stats,
        },
        divergences: divergences.clone(),
        invariants_ok: comparison.buckets.ok.clone(),
        invariants_ko: comparison.buckets.ko.clone(),
        invariants_nc: comparison.buckets.nc.clone(),
        classification: comparison.ddr,
        summary,
        summary_detail: SummaryDetail {
            overview,
            invariants_ok: comparison.buckets.ok.clone(),
            invariants_ko: comparison.buckets.ko.clone(),
            divergences,
            neutralized,
            notes: vec![format!(
                "quantiles computed when n >= min_n_for_quantiles ({})",
                thresholds.min_n_for_quantiles
            )],
        },
        limits,
    };

    (ddr_report, e_report)
}

fn summary_line(comparison: &Comparison, eps: f64) -> String {
    let buckets = &comparison.buckets;
    if !buckets.nc.is_empty() {
        return format!(
            "Inconclusive: non-computable invariants = {}.",
            join_invariants(&buckets.nc)
        );
    }
    if !buckets.ko.is_empty() {
        let ok = if buckets.ok.is_empty() {
            "none".to_string()
        } else {
            join_invariants(&buckets.ok)
        };
        return format!(
            "Differences beyond eps={eps}: KO={} ; OK={ok}.",
            join_invariants(&buckets.ko)
        );
    }
    format!("No divergence > eps={eps} on computable invariants.")
}

fn join_invariants(values: &[Invariant]) -> String {
    values
        .iter()
        .map(|value| value.as_str())
        .collect::<Vec<&str>>()
        .join(", ")
}
