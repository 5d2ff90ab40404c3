//! Population statistics over a window's scores.
//!
//! Percentiles use linear interpolation between the bracketing order
//! statistics, and the median is `percentile(50)` under the same rule.

use serde::{Deserialize, Serialize};

use crate::model::ScoreScale;

/// Arithmetic mean, or `None` for an empty input.
pub fn mean<I>(values: I) -> Option<f64>
where
    I: IntoIterator<Item = f64>,
{
    let (sum, count) = values
        .into_iter()
        .fold((0.0f64, 0usize), |(sum, count), v| (sum + v, count + 1));
    if count == 0 {
        None
    } else {
        Some(sum / count as f64)
    }
}

/// Mean of the values that are present; `None` when none are.
pub fn mean_present<'a, I>(values: I) -> Option<f64>
where
    I: IntoIterator<Item = &'a Option<f64>>,
{
    mean(values.into_iter().filter_map(|v| *v))
}

/// Linearly interpolated percentile of an ascending-sorted slice.
///
/// `p` is clamped to `0..=100`. Returns `None` for an empty slice.
pub fn percentile(sorted: &[f64], p: f64) -> Option<f64> {
    if sorted.is_empty() {
        return None;
    }
    let p = p.clamp(0.0, 100.0);
    let idx = (p / 100.0) * (sorted.len() - 1) as f64;
    let lower = idx.floor() as usize;
    let upper = idx.ceil() as usize;
    let weight = idx - lower as f64;
    Some(sorted[lower] * (1.0 - weight) + sorted[upper] * weight)
}

/// Summary statistics for one window's flattened score population.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PopulationStats {
    /// Number of scored cells.
    pub count: usize,
    pub mean: f64,
    pub min: f64,
    pub max: f64,
    pub p10: f64,
    pub p25: f64,
    pub median: f64,
    pub p75: f64,
    pub p90: f64,
}

impl PopulationStats {
    /// Compute statistics over `scores` (any order). `None` if empty.
    pub fn compute(scores: &[f64]) -> Option<Self> {
        let mut sorted = scores.to_vec();
        sorted.sort_by(f64::total_cmp);

        let at = |p: f64| percentile(&sorted, p);
        Some(Self {
            count: sorted.len(),
            mean: mean(sorted.iter().copied())?,
            min: *sorted.first()?,
            max: *sorted.last()?,
            p10: at(10.0)?,
            p25: at(25.0)?,
            median: at(50.0)?,
            p75: at(75.0)?,
            p90: at(90.0)?,
        })
    }
}

/// Number of scores that round into one integer bucket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DistributionBucket {
    pub score: i64,
    pub count: usize,
}

/// Bucket raw scores into the scale's integer buckets by rounding.
///
/// Every bucket of the scale is present, including empty ones.
pub fn score_distribution<I>(scores: I, scale: &ScoreScale) -> Vec<DistributionBucket>
where
    I: IntoIterator<Item = f64>,
{
    let mut buckets: Vec<DistributionBucket> = scale
        .buckets()
        .map(|score| DistributionBucket { score, count: 0 })
        .collect();
    let first = *scale.buckets().start();
    for score in scores {
        let index = (scale.bucket_of(score) - first) as usize;
        if let Some(bucket) = buckets.get_mut(index) {
            bucket.count += 1;
        }
    }
    buckets
}
