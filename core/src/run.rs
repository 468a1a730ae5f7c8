//! Simulation output records.

use crate::{scenario::RiskScenario, types::Seed};
use serde::Serialize;

/// One simulated year.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TrialResult {
    pub event_count:    u64,
    pub primary_loss:   f64,
    pub secondary_loss: f64,
    pub total_loss:     f64,
}

impl TrialResult {
    pub fn no_loss() -> Self {
        Self {
            event_count:    0,
            primary_loss:   0.0,
            secondary_loss: 0.0,
            total_loss:     0.0,
        }
    }

    /// At least one loss event happened this year.
    pub fn had_loss_event(&self) -> bool {
        self.event_count >= 1
    }
}

/// The complete output of one engine invocation. Immutable once produced.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimulationRun {
    scenario: RiskScenario,
    seed:     Seed,
    trials:   Vec<TrialResult>,
}

impl SimulationRun {
    pub(crate) fn new(scenario: RiskScenario, seed: Seed, trials: Vec<TrialResult>) -> Self {
        debug_assert_eq!(trials.len(), scenario.trial_count());
        Self { scenario, seed, trials }
    }

    pub fn scenario(&self) -> &RiskScenario {
        &self.scenario
    }

    /// The master seed the run was drawn from. Replays the run exactly.
    pub fn seed(&self) -> Seed {
        self.seed
    }

    pub fn trials(&self) -> &[TrialResult] {
        &self.trials
    }

    pub fn trial_count(&self) -> usize {
        self.trials.len()
    }

    /// Annual losses in trial order.
    pub fn losses(&self) -> impl Iterator<Item = f64> + '_ {
        self.trials.iter().map(|t| t.total_loss)
    }

    pub fn total_losses(&self) -> Vec<f64> {
        self.losses().collect()
    }
}
