//! Result aggregation: summary statistics, histogram and percentile curve.
//!
//! Conventions (fixed, every figure depends on them):
//!   - Percentiles interpolate linearly between closest ranks of the
//!     ascending sequence: rank = p / 100 * (n - 1).
//!   - Standard deviation is the population form (divide by n).
//!   - Histogram buckets are equal width over [min, max], the last one
//!     closed on the right. A zero-width range yields one bucket.
//!   - Empty input yields zeros and no buckets, never NaN.

use crate::run::{SimulationRun, TrialResult};
use serde::{Deserialize, Serialize};

pub const HISTOGRAM_BUCKETS: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HistogramBucket {
    pub range_start: f64,
    pub range_end:   f64,
    pub count:       u64,
}

/// min / mean / max of one per-year quantity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ComponentSummary {
    pub min:  f64,
    pub mean: f64,
    pub max:  f64,
}

impl ComponentSummary {
    fn from_values(values: impl Iterator<Item = f64>) -> Self {
        let mut n = 0usize;
        let mut sum = 0.0;
        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;
        for v in values {
            n += 1;
            sum += v;
            min = min.min(v);
            max = max.max(v);
        }
        if n == 0 {
            return Self::default();
        }
        Self { min, mean: sum / n as f64, max }
    }
}

/// Per-year breakdown of the loss components.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ComponentBreakdown {
    pub loss_events:    ComponentSummary,
    pub primary_loss:   ComponentSummary,
    pub secondary_loss: ComponentSummary,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryStatistics {
    pub trial_count:   usize,
    pub mean:          f64,
    pub median:        f64,
    pub std_dev:       f64,
    pub percentile_10: f64,
    pub percentile_50: f64,
    pub percentile_90: f64,
    pub min:           f64,
    pub max:           f64,
    /// Fraction of simulated years with at least one loss event, in [0, 1].
    pub vulnerability_percentage: f64,
    pub histogram_buckets:        Vec<HistogramBucket>,
    pub breakdown:                ComponentBreakdown,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PercentilePoint {
    pub percentile: u8,
    pub value:      f64,
}

/// Summarize a run's annual loss distribution.
pub fn summarize(run: &SimulationRun) -> SummaryStatistics {
    let trials = run.trials();
    let sorted = sorted_losses(run);
    let n = sorted.len();

    let mean = if n == 0 { 0.0 } else { sorted.iter().sum::<f64>() / n as f64 };
    let variance = if n == 0 {
        0.0
    } else {
        sorted.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / n as f64
    };
    let vulnerable = trials.iter().filter(|t| t.had_loss_event()).count();
    let vulnerability_percentage = if n == 0 { 0.0 } else { vulnerable as f64 / n as f64 };

    let median = percentile(&sorted, 50.0);
    SummaryStatistics {
        trial_count: n,
        mean,
        median,
        std_dev: variance.sqrt(),
        percentile_10: percentile(&sorted, 10.0),
        percentile_50: median,
        percentile_90: percentile(&sorted, 90.0),
        min: sorted.first().copied().unwrap_or(0.0),
        max: sorted.last().copied().unwrap_or(0.0),
        vulnerability_percentage,
        histogram_buckets: histogram(&sorted, HISTOGRAM_BUCKETS),
        breakdown: breakdown(trials),
    }
}

fn breakdown(trials: &[TrialResult]) -> ComponentBreakdown {
    ComponentBreakdown {
        loss_events:    ComponentSummary::from_values(trials.iter().map(|t| t.event_count as f64)),
        primary_loss:   ComponentSummary::from_values(trials.iter().map(|t| t.primary_loss)),
        secondary_loss: ComponentSummary::from_values(trials.iter().map(|t| t.secondary_loss)),
    }
}

fn sorted_losses(run: &SimulationRun) -> Vec<f64> {
    let mut losses = run.total_losses();
    losses.sort_by(|a, b| a.total_cmp(b));
    losses
}

/// Linearly interpolated percentile of an ascending slice. `p` in [0, 100].
pub fn percentile(sorted: &[f64], p: f64) -> f64 {
    let n = sorted.len();
    if n == 0 {
        return 0.0;
    }
    if n == 1 {
        return sorted[0];
    }

    let rank = (p.clamp(0.0, 100.0) / 100.0) * (n - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    if lower == upper {
        sorted[lower]
    } else {
        let w = rank - lower as f64;
        sorted[lower] + w * (sorted[upper] - sorted[lower])
    }
}

/// Equal-width histogram over [min(values), max(values)].
pub fn histogram(values: &[f64], bucket_count: usize) -> Vec<HistogramBucket> {
    if values.is_empty() || bucket_count == 0 {
        return Vec::new();
    }

    let lo = values.iter().copied().fold(f64::INFINITY, f64::min);
    let hi = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if hi <= lo {
        return vec![HistogramBucket { range_start: lo, range_end: hi, count: values.len() as u64 }];
    }

    let width = (hi - lo) / bucket_count as f64;
    let mut buckets: Vec<HistogramBucket> = (0..bucket_count)
        .map(|i| HistogramBucket {
            range_start: lo + i as f64 * width,
            range_end:   if i + 1 == bucket_count { hi } else { lo + (i + 1) as f64 * width },
            count:       0,
        })
        .collect();

    for &v in values {
        let idx = (((v - lo) / width) as usize).min(bucket_count - 1);
        buckets[idx].count += 1;
    }
    buckets
}

/// 1st through 99th percentile of annual loss, for the ALE curve chart.
pub fn percentile_curve(run: &SimulationRun) -> Vec<PercentilePoint> {
    let sorted = sorted_losses(run);
    (1..=99u8)
        .map(|p| PercentilePoint { percentile: p, value: percentile(&sorted, p as f64) })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percentile_interpolates_between_points() {
        let values = [1.0, 2.0, 3.0, 4.0];
        assert!((percentile(&values, 25.0) - 1.75).abs() < 1e-12);
        assert!((percentile(&values, 50.0) - 2.5).abs() < 1e-12);
        assert_eq!(percentile(&values, 0.0), 1.0);
        assert_eq!(percentile(&values, 100.0), 4.0);
    }

    #[test]
    fn percentile_of_empty_is_zero() {
        assert_eq!(percentile(&[], 90.0), 0.0);
        assert_eq!(percentile(&[7.0], 90.0), 7.0);
    }

    #[test]
    fn histogram_counts_every_value() {
        let values: Vec<f64> = (0..100).map(|i| i as f64).collect();
        let buckets = histogram(&values, 10);
        assert_eq!(buckets.len(), 10);
        assert_eq!(buckets.iter().map(|b| b.count).sum::<u64>(), 100);
        assert_eq!(buckets[0].range_start, 0.0);
        assert_eq!(buckets[9].range_end, 99.0);
        assert_eq!(buckets[9].count, 10, "max value belongs to the last bucket");
    }

    #[test]
    fn zero_width_histogram_is_one_bucket() {
        let buckets = histogram(&[0.0; 50], HISTOGRAM_BUCKETS);
        assert_eq!(
            buckets,
            vec![HistogramBucket { range_start: 0.0, range_end: 0.0, count: 50 }]
        );
        assert!(histogram(&[], HISTOGRAM_BUCKETS).is_empty());
    }

    #[test]
    fn component_summary_of_nothing_is_zero() {
        let summary = ComponentSummary::from_values(std::iter::empty());
        assert_eq!(summary, ComponentSummary::default());
    }
}
