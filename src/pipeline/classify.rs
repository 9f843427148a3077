use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::stats::{Invariant, WindowStatistics};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DdrClass {
    Restored,
    Partial,
    Illusion,
    Inconclusive,
}

impl DdrClass {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Restored => "RESTORED",
            Self::Partial => "PARTIAL",
            Self::Illusion => "ILLUSION",
            Self::Inconclusive => "INCONCLUSIVE",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EClass {
    Compatible,
    Incompatible,
    Inconclusive,
}

impl EClass {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Compatible => "COMPATIBLE",
            Self::Incompatible => "INCOMPATIBLE",
            Self::Inconclusive => "INCONCLUSIVE",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DivergenceEntry {
    pub metric: Invariant,
    pub relative_delta: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Buckets {
    pub ok: Vec<Invariant>,
    pub ko: Vec<Invariant>,
    pub nc: Vec<Invariant>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Comparison {
    pub divergences: Vec<DivergenceEntry>,
    pub buckets: Buckets,
    pub ddr: DdrClass,
    pub e: EClass,
}

impl Comparison {
    pub fn divergence_map(&self) -> BTreeMap<String, Option<f64>> {
        self.divergences
            .iter()
            .map(|entry| (entry.metric.as_str().to_string(), entry.relative_delta))
            .collect()
    }
}

/// `|post - pre| / |pre|`, undefined when either side is missing, `pre` is
/// zero, or the quotient is not finite.
pub fn relative_delta(pre: Option<f64>, post: Option<f64>) -> Option<f64> {
    let (pre, post) = (pre?, post?);
    if pre == 0.0 {
        return None;
    }
    let delta = (post - pre).abs() / pre.abs();
    delta.is_finite().then_some(delta)
}

pub fn bucket_divergences(divergences: &[DivergenceEntry], eps: f64) -> Buckets {
    let mut buckets = Buckets::default();
    for entry in divergences {
        match entry.relative_delta {
            None => buckets.nc.push(entry.metric),
            Some(delta) if !delta.is_finite() => buckets.nc.push(entry.metric),
            Some(delta) if delta.abs() > eps => buckets.ko.push(entry.metric),
            Some(_) => buckets.ok.push(entry.metric),
        }
    }
    buckets
}

pub fn classify_ddr(buckets: &Buckets) -> DdrClass {
    if !buckets.nc.is_empty() {
        return DdrClass::Inconclusive;
    }
    if buckets.ok.is_empty() && !buckets.ko.is_empty() {
        return DdrClass::Illusion;
    }
    if !buckets.ok.is_empty() && !buckets.ko.is_empty() {
        return DdrClass::Partial;
    }
    if buckets.ko.is_empty() && !buckets.ok.is_empty() {
        return DdrClass::Restored;
    }
    DdrClass::Inconclusive
}

pub fn classify_e(buckets: &Buckets) -> EClass {
    if !buckets.ko.is_empty() {
        EClass::Incompatible
    } else if !buckets.nc.is_empty() {
        EClass::Inconclusive
    } else {
        EClass::Compatible
    }
}

pub fn compare(pre: &WindowStatistics, post: &WindowStatistics, eps: f64) -> Comparison {
    let divergences = Invariant::ALL
        .iter()
        .map(|metric| DivergenceEntry {
            metric: *metric,
            relative_delta: relative_delta(metric.value_in(pre), metric.value_in(post)),
        })
        .collect::<Vec<DivergenceEntry>>();

    let buckets = bucket_divergences(&divergences, eps);
    let ddr = classify_ddr(&buckets);
    let e = classify_e(&buckets);

    Comparison {
        divergences,
        buckets,
        ddr,
        e,
    }
}
