//! The Monte Carlo engine.
//!
//! TRIAL (repeated trial_count times, fully independent):
//!   1. Sample the number of loss events in the year.
//!   2. Zero events: the year's loss is 0, no magnitude is sampled.
//!   3. Otherwise sample one primary magnitude per event, plus one
//!      secondary magnitude per event when a secondary range is set.
//!   4. The year's loss is the sum over all events.
//!
//! RULES:
//!   - Trials are grouped into batches of BATCH_SIZE.
//!   - Batch i draws only from RngBank::for_batch(i).
//!   - Batches are concatenated in index order, so parallel and
//!     sequential execution produce the same run bit for bit.
//!   - The engine keeps no state between invocations.

use crate::{
    distribution::{FrequencySampler, Pert},
    error::{ConfigError, FairResult},
    rng::RngBank,
    run::{SimulationRun, TrialResult},
    scenario::{FrequencyModel, RiskScenario},
};
use rand::Rng;
use rayon::prelude::*;

/// Trials per RNG stream. Changing this changes every seeded run.
pub const BATCH_SIZE: usize = 1024;

/// A single loss event. Lives only for the duration of its trial.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LossEvent {
    pub primary:   f64,
    pub secondary: f64,
}

impl LossEvent {
    pub fn total(&self) -> f64 {
        self.primary + self.secondary
    }
}

/// Samplers built once per run and shared read-only by every batch.
struct TrialModel {
    frequency: FrequencySampler,
    primary:   Pert,
    secondary: Option<Pert>,
}

impl TrialModel {
    fn compile(scenario: &RiskScenario) -> Result<Self, ConfigError> {
        let confidence = scenario.confidence();
        let rule = scenario.count_rule();

        let frequency = match scenario.frequency() {
            FrequencyModel::LossEvents(lef) => {
                FrequencySampler::direct(Pert::new("frequency", lef, confidence)?, rule)
            }
            FrequencyModel::ThreatEvents { threat_events, vulnerability } => {
                vulnerability.validate_probability("vulnerability")?;
                FrequencySampler::thinned(
                    Pert::new("threat_event_frequency", threat_events, confidence)?,
                    Pert::new("vulnerability", vulnerability, confidence)?,
                    rule,
                )
            }
        };
        let primary = Pert::new("magnitude", scenario.magnitude(), confidence)?;
        let secondary = scenario
            .secondary_magnitude()
            .map(|s| Pert::new("secondary_magnitude", s, confidence))
            .transpose()?;

        Ok(Self { frequency, primary, secondary })
    }

    fn sample_event<R: Rng + ?Sized>(&self, rng: &mut R) -> LossEvent {
        let primary = self.primary.sample(rng);
        let secondary = match &self.secondary {
            Some(pert) => pert.sample(rng),
            None => 0.0,
        };
        LossEvent { primary, secondary }
    }

    fn run_trial<R: Rng + ?Sized>(&self, rng: &mut R) -> FairResult<TrialResult> {
        let event_count = self.frequency.sample_count(rng)?;
        if event_count == 0 {
            return Ok(TrialResult::no_loss());
        }

        let mut trial = TrialResult { event_count, ..TrialResult::no_loss() };
        for _ in 0..event_count {
            let event = self.sample_event(rng);
            trial.primary_loss += event.primary;
            trial.secondary_loss += event.secondary;
            trial.total_loss += event.total();
        }
        Ok(trial)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct SimEngine {
    parallel: bool,
}

impl Default for SimEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl SimEngine {
    /// An engine that spreads batches over the rayon thread pool.
    pub fn new() -> Self {
        Self { parallel: true }
    }

    /// An engine that runs every batch on the calling thread.
    pub fn sequential() -> Self {
        Self { parallel: false }
    }

    /// Run the scenario with its own seed, or fresh entropy if it has none.
    pub fn simulate(&self, scenario: RiskScenario) -> FairResult<SimulationRun> {
        let bank = match scenario.random_seed() {
            Some(seed) => RngBank::new(seed),
            None => RngBank::from_entropy(),
        };
        self.simulate_with_bank(scenario, &bank)
    }

    /// Run the scenario drawing every variate from `bank`.
    /// The scenario's own seed is ignored.
    pub fn simulate_with_bank(
        &self,
        scenario: RiskScenario,
        bank: &RngBank,
    ) -> FairResult<SimulationRun> {
        let model = TrialModel::compile(&scenario)?;
        let trial_count = scenario.trial_count();
        let batches = trial_count.div_ceil(BATCH_SIZE);

        log::info!(
            "simulating {trial_count} trials in {batches} batches (seed={}, parallel={})",
            bank.master_seed(),
            self.parallel
        );

        let run_batch = |batch: usize| -> FairResult<Vec<TrialResult>> {
            let mut rng = bank.for_batch(batch as u64);
            let len = BATCH_SIZE.min(trial_count - batch * BATCH_SIZE);
            let trials = (0..len)
                .map(|_| model.run_trial(&mut rng))
                .collect::<FairResult<Vec<_>>>()?;
            log::debug!("batch {batch}: {len} trials done");
            Ok(trials)
        };

        let per_batch: Vec<Vec<TrialResult>> = if self.parallel {
            (0..batches)
                .into_par_iter()
                .map(&run_batch)
                .collect::<FairResult<Vec<_>>>()?
        } else {
            (0..batches).map(&run_batch).collect::<FairResult<Vec<_>>>()?
        };

        let trials: Vec<TrialResult> = per_batch.into_iter().flatten().collect();
        let vulnerable = trials.iter().filter(|t| t.had_loss_event()).count();
        log::info!("simulation complete: {vulnerable}/{trial_count} years with a loss event");

        Ok(SimulationRun::new(scenario, bank.master_seed(), trials))
    }
}

/// Run `scenario` on a default engine.
pub fn simulate(scenario: RiskScenario) -> FairResult<SimulationRun> {
    SimEngine::new().simulate(scenario)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loss_event_total_adds_components() {
        let event = LossEvent { primary: 1_500.0, secondary: 250.0 };
        assert_eq!(event.total(), 1_750.0);
    }

    #[test]
    fn partial_last_batch_is_sized_correctly() {
        let scenario = RiskScenario::builder()
            .frequency(1.0, 2.0, 3.0)
            .magnitude(10.0, 20.0, 30.0)
            .confidence(0.5)
            .trial_count(BATCH_SIZE * 2 + 17)
            .seed(3)
            .build()
            .unwrap();
        let run = SimEngine::sequential().simulate(scenario).unwrap();
        assert_eq!(run.trial_count(), BATCH_SIZE * 2 + 17);
    }
}
