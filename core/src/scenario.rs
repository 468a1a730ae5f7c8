//! Scenario configuration: one immutable description of a risk scenario.
//!
//! RULE: A RiskScenario can only be obtained through ScenarioBuilder::build
//! (or deserialization, which goes through the same validation).
//! There are no setters. To change a scenario, build a new one.

use crate::{
    config::ScenarioInput,
    distribution::{validate_confidence, CountRule, Estimate},
    error::ConfigError,
    types::Seed,
};
use serde::{Deserialize, Serialize};

pub const DEFAULT_TRIAL_COUNT: usize = 10_000;

/// Below this many trials the tails of the distribution are unreliable.
const LOW_TRIAL_WARNING: usize = 1_000;

/// Where the annual number of loss events comes from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FrequencyModel {
    /// Loss event frequency estimated directly.
    LossEvents(Estimate),
    /// Threat event frequency thinned by the probability that a threat
    /// event becomes a loss event (LEF = TEF x Vulnerability).
    ThreatEvents {
        threat_events: Estimate,
        vulnerability: Estimate,
    },
}

impl FrequencyModel {
    fn validate(&self) -> Result<(), ConfigError> {
        match self {
            Self::LossEvents(frequency) => frequency.validate("frequency"),
            Self::ThreatEvents { threat_events, vulnerability } => {
                threat_events.validate("threat_event_frequency")?;
                vulnerability.validate_probability("vulnerability")
            }
        }
    }

    /// Upper bound of the sampled annual frequency.
    pub fn max_frequency(&self) -> f64 {
        match self {
            Self::LossEvents(frequency) => frequency.max,
            Self::ThreatEvents { threat_events, .. } => threat_events.max,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "ScenarioInput", into = "ScenarioInput")]
pub struct RiskScenario {
    frequency:           FrequencyModel,
    magnitude:           Estimate,
    secondary_magnitude: Option<Estimate>,
    confidence:          f64,
    trial_count:         usize,
    random_seed:         Option<Seed>,
    count_rule:          CountRule,
}

impl RiskScenario {
    pub fn builder() -> ScenarioBuilder {
        ScenarioBuilder::default()
    }

    pub fn frequency(&self) -> FrequencyModel {
        self.frequency
    }

    pub fn magnitude(&self) -> Estimate {
        self.magnitude
    }

    pub fn secondary_magnitude(&self) -> Option<Estimate> {
        self.secondary_magnitude
    }

    pub fn confidence(&self) -> f64 {
        self.confidence
    }

    pub fn trial_count(&self) -> usize {
        self.trial_count
    }

    pub fn random_seed(&self) -> Option<Seed> {
        self.random_seed
    }

    pub fn count_rule(&self) -> CountRule {
        self.count_rule
    }
}

/// Collects scenario fields; `build` validates all of them at once.
#[derive(Debug, Clone, Default)]
pub struct ScenarioBuilder {
    frequency:           Option<FrequencyModel>,
    magnitude:           Option<Estimate>,
    secondary_magnitude: Option<Estimate>,
    confidence:          Option<f64>,
    trial_count:         Option<usize>,
    random_seed:         Option<Seed>,
    count_rule:          CountRule,
}

impl ScenarioBuilder {
    /// Loss event frequency as (min, likely, max) events per year.
    pub fn frequency(mut self, min: f64, likely: f64, max: f64) -> Self {
        self.frequency = Some(FrequencyModel::LossEvents(Estimate::new(min, likely, max)));
        self
    }

    /// Threat event frequency plus the vulnerability probability range.
    pub fn threat_events(mut self, threat_events: Estimate, vulnerability: Estimate) -> Self {
        self.frequency = Some(FrequencyModel::ThreatEvents { threat_events, vulnerability });
        self
    }

    pub fn frequency_model(mut self, model: FrequencyModel) -> Self {
        self.frequency = Some(model);
        self
    }

    /// Primary loss per event.
    pub fn magnitude(mut self, min: f64, likely: f64, max: f64) -> Self {
        self.magnitude = Some(Estimate::new(min, likely, max));
        self
    }

    /// Secondary loss per event, added on top of the primary loss.
    pub fn secondary_magnitude(mut self, min: f64, likely: f64, max: f64) -> Self {
        self.secondary_magnitude = Some(Estimate::new(min, likely, max));
        self
    }

    pub fn confidence(mut self, confidence: f64) -> Self {
        self.confidence = Some(confidence);
        self
    }

    pub fn trial_count(mut self, trial_count: usize) -> Self {
        self.trial_count = Some(trial_count);
        self
    }

    pub fn seed(mut self, seed: Seed) -> Self {
        self.random_seed = Some(seed);
        self
    }

    pub fn maybe_seed(mut self, seed: Option<Seed>) -> Self {
        self.random_seed = seed;
        self
    }

    pub fn count_rule(mut self, rule: CountRule) -> Self {
        self.count_rule = rule;
        self
    }

    pub fn build(self) -> Result<RiskScenario, ConfigError> {
        let frequency = self.frequency.ok_or(ConfigError::MissingField { field: "frequency" })?;
        let magnitude = self.magnitude.ok_or(ConfigError::MissingField { field: "magnitude" })?;
        let confidence = self.confidence.ok_or(ConfigError::MissingField { field: "confidence" })?;
        let trial_count = self.trial_count.unwrap_or(DEFAULT_TRIAL_COUNT);

        frequency.validate()?;
        magnitude.validate("magnitude")?;
        if let Some(secondary) = &self.secondary_magnitude {
            secondary.validate("secondary_magnitude")?;
        }
        validate_confidence(confidence)?;
        if trial_count == 0 {
            return Err(ConfigError::InvalidTrialCount { value: 0 });
        }
        if trial_count < LOW_TRIAL_WARNING {
            log::warn!("only {trial_count} trials requested; percentiles will be noisy");
        }

        Ok(RiskScenario {
            frequency,
            magnitude,
            secondary_magnitude: self.secondary_magnitude,
            confidence,
            trial_count,
            random_seed: self.random_seed,
            count_rule: self.count_rule,
        })
    }
}

/// Convert "`events` threat events every `years` years" into an annual rate.
pub fn annualized_frequency(events: f64, years: f64) -> Result<f64, ConfigError> {
    if !events.is_finite() || !years.is_finite() || events < 0.0 || years <= 0.0 {
        return Err(ConfigError::InvalidAnnualization { events, years });
    }
    Ok(events / years)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> ScenarioBuilder {
        RiskScenario::builder()
            .frequency(0.1, 1.0, 10.0)
            .magnitude(1_000.0, 50_000.0, 1_000_000.0)
            .confidence(0.5)
    }

    #[test]
    fn builds_with_default_trial_count() {
        let scenario = base().build().unwrap();
        assert_eq!(scenario.trial_count(), DEFAULT_TRIAL_COUNT);
        assert_eq!(scenario.random_seed(), None);
        assert_eq!(scenario.count_rule(), CountRule::Floor);
    }

    #[test]
    fn missing_magnitude_is_reported() {
        let err = RiskScenario::builder()
            .frequency(0.0, 1.0, 2.0)
            .confidence(0.5)
            .build()
            .unwrap_err();
        assert_eq!(err, ConfigError::MissingField { field: "magnitude" });
    }

    #[test]
    fn zero_trials_rejected() {
        let err = base().trial_count(0).build().unwrap_err();
        assert_eq!(err, ConfigError::InvalidTrialCount { value: 0 });
    }

    #[test]
    fn secondary_range_is_validated() {
        let err = base().secondary_magnitude(10.0, 5.0, 20.0).build().unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidRange { field: "secondary_magnitude", .. }
        ));
    }

    #[test]
    fn vulnerability_above_one_rejected() {
        let err = base()
            .threat_events(Estimate::new(1.0, 2.0, 3.0), Estimate::new(0.2, 0.5, 1.5))
            .build()
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidProbability { field: "vulnerability", .. }));
    }

    #[test]
    fn max_frequency_follows_the_frequency_source() {
        let direct = base().build().unwrap();
        assert_eq!(direct.frequency().max_frequency(), 10.0);

        let threat = base()
            .threat_events(Estimate::new(1.0, 2.0, 3.5), Estimate::new(0.1, 0.2, 0.3))
            .build()
            .unwrap();
        assert_eq!(threat.frequency().max_frequency(), 3.5);
    }

    #[test]
    fn annualizes_event_counts() {
        assert_eq!(annualized_frequency(3.0, 2.0).unwrap(), 1.5);
        assert!(annualized_frequency(3.0, 0.0).is_err());
        assert!(annualized_frequency(-1.0, 1.0).is_err());
    }
}
