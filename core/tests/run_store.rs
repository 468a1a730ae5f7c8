//! Run archive on an in-memory SQLite database.

use fair_core::{
    engine::SimEngine,
    error::FairError,
    scenario::RiskScenario,
    stats::summarize,
    store::RunStore,
};

fn store() -> RunStore {
    let store = RunStore::in_memory().expect("in-memory store");
    store.migrate().expect("migration");
    store
}

fn scenario(seed: u64) -> RiskScenario {
    RiskScenario::builder()
        .frequency(0.0, 2.0, 6.0)
        .magnitude(1_000.0, 20_000.0, 400_000.0)
        .confidence(0.5)
        .trial_count(2_000)
        .seed(seed)
        .build()
        .unwrap()
}

#[test]
fn recorded_run_can_be_reloaded() {
    let store = store();
    let run = SimEngine::new().simulate(scenario(42)).unwrap();
    let summary = summarize(&run);

    let run_id = store.record_run(&run, &summary, "0.1.0-test").unwrap();
    assert_eq!(store.run_count().unwrap(), 1);

    let losses = store.load_losses(&run_id).unwrap();
    assert_eq!(losses, run.total_losses());

    let reloaded = store.load_summary(&run_id).unwrap();
    assert_eq!(reloaded.trial_count, summary.trial_count);
    assert_eq!(reloaded.histogram_buckets.len(), summary.histogram_buckets.len());
    assert!((reloaded.mean - summary.mean).abs() <= 1e-9 * summary.mean.max(1.0));
    assert!((reloaded.vulnerability_percentage - summary.vulnerability_percentage).abs() < 1e-12);

    let records = store.recent_runs(10).unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].run_id, run_id);
    assert_eq!(records[0].seed, 42);
    assert_eq!(records[0].trial_count, 2_000);
}

#[test]
fn every_run_gets_a_distinct_id() {
    let store = store();
    let mut ids = Vec::new();
    for seed in [1, 2, 3] {
        let run = SimEngine::new().simulate(scenario(seed)).unwrap();
        ids.push(store.record_run(&run, &summarize(&run), "0.1.0-test").unwrap());
    }
    ids.sort();
    ids.dedup();
    assert_eq!(ids.len(), 3);
    assert_eq!(store.recent_runs(2).unwrap().len(), 2);
}

#[test]
fn unknown_run_is_reported() {
    let store = store();
    assert!(matches!(
        store.load_summary("no-such-run"),
        Err(FairError::RunNotFound { .. })
    ));
    assert!(matches!(
        store.load_losses("no-such-run"),
        Err(FairError::RunNotFound { .. })
    ));
}
