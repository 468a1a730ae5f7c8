//! Aggregation of runs into summary statistics.

use fair_core::{
    engine::SimEngine,
    scenario::RiskScenario,
    stats::{percentile_curve, summarize, HISTOGRAM_BUCKETS},
};

#[test]
fn zero_frequency_run_summarizes_to_zero() {
    let scenario = RiskScenario::builder()
        .frequency(0.0, 0.0, 0.0)
        .magnitude(1_000.0, 5_000.0, 10_000.0)
        .confidence(0.5)
        .trial_count(3_000)
        .seed(42)
        .build()
        .unwrap();

    let run = SimEngine::new().simulate(scenario).unwrap();
    assert!(run.losses().all(|loss| loss == 0.0));

    let s = summarize(&run);
    for value in [
        s.mean, s.median, s.std_dev, s.percentile_10, s.percentile_50,
        s.percentile_90, s.min, s.max, s.vulnerability_percentage,
    ] {
        assert_eq!(value, 0.0);
    }
    assert_eq!(s.histogram_buckets.len(), 1);
    assert_eq!(s.histogram_buckets[0].count, 3_000);
    assert!(percentile_curve(&run).iter().all(|p| p.value == 0.0));
}

#[test]
fn histogram_spans_the_loss_range() {
    let scenario = RiskScenario::builder()
        .frequency(1.0, 3.0, 8.0)
        .magnitude(1_000.0, 50_000.0, 1_000_000.0)
        .confidence(0.5)
        .trial_count(10_000)
        .seed(11)
        .build()
        .unwrap();

    let s = summarize(&SimEngine::new().simulate(scenario).unwrap());
    assert_eq!(s.histogram_buckets.len(), HISTOGRAM_BUCKETS);
    assert_eq!(s.histogram_buckets.first().unwrap().range_start, s.min);
    assert_eq!(s.histogram_buckets.last().unwrap().range_end, s.max);
    assert_eq!(s.histogram_buckets.iter().map(|b| b.count).sum::<u64>(), 10_000);
    for pair in s.histogram_buckets.windows(2) {
        assert!(pair[0].range_end <= pair[1].range_start + 1e-6);
    }
}

#[test]
fn percentile_curve_is_monotone() {
    let scenario = RiskScenario::builder()
        .frequency(0.1, 1.0, 10.0)
        .magnitude(1_000.0, 50_000.0, 1_000_000.0)
        .confidence(0.5)
        .trial_count(10_000)
        .seed(12)
        .build()
        .unwrap();

    let run = SimEngine::new().simulate(scenario).unwrap();
    let curve = percentile_curve(&run);
    let s = summarize(&run);

    assert_eq!(curve.len(), 99);
    assert_eq!(curve[0].percentile, 1);
    assert_eq!(curve[98].percentile, 99);
    assert!(curve.windows(2).all(|w| w[0].value <= w[1].value));
    assert_eq!(curve[9].value, s.percentile_10);
    assert_eq!(curve[89].value, s.percentile_90);
}

#[test]
fn mean_and_std_dev_match_direct_computation() {
    let scenario = RiskScenario::builder()
        .frequency(0.0, 2.0, 5.0)
        .magnitude(100.0, 400.0, 900.0)
        .confidence(0.4)
        .trial_count(4_000)
        .seed(13)
        .build()
        .unwrap();

    let run = SimEngine::new().simulate(scenario).unwrap();
    let losses = run.total_losses();
    let n = losses.len() as f64;
    let mean = losses.iter().sum::<f64>() / n;
    let var = losses.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / n;

    let s = summarize(&run);
    assert!((s.mean - mean).abs() <= 1e-9 * mean.max(1.0));
    assert!((s.std_dev - var.sqrt()).abs() <= 1e-9 * var.sqrt().max(1.0));
}
