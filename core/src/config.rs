//! Flat scenario input record, as collected by a form or read from JSON.
//!
//! Field names follow the presentation layer's inputs one-to-one.
//! Conversion into a RiskScenario performs all validation.

use crate::{
    distribution::{CountRule, Estimate},
    error::ConfigError,
    scenario::{FrequencyModel, RiskScenario, DEFAULT_TRIAL_COUNT},
    types::Seed,
};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioInput {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frequency_min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frequency_likely: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frequency_max: Option<f64>,

    /// Threat event model; replaces the frequency_* fields when present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub threat_event_frequency: Option<Estimate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vulnerability: Option<Estimate>,

    pub magnitude_min:    f64,
    pub magnitude_likely: f64,
    pub magnitude_max:    f64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secondary_magnitude_min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secondary_magnitude_likely: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secondary_magnitude_max: Option<f64>,

    pub confidence: f64,
    #[serde(default = "default_trial_count")]
    pub trial_count: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub random_seed: Option<Seed>,
    #[serde(default)]
    pub count_rule: CountRule,
}

fn default_trial_count() -> i64 {
    DEFAULT_TRIAL_COUNT as i64
}

impl ScenarioInput {
    /// Load a scenario input from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Cannot read {}: {e}", path.display()))?;
        let input: ScenarioInput = serde_json::from_str(&content)
            .map_err(|e| anyhow::anyhow!("Cannot parse {}: {e}", path.display()))?;
        Ok(input)
    }

    pub fn into_scenario(self) -> Result<RiskScenario, ConfigError> {
        RiskScenario::try_from(self)
    }

    fn frequency_model(&self) -> Result<FrequencyModel, ConfigError> {
        let direct = triple(
            ["frequency_min", "frequency_likely", "frequency_max"],
            [self.frequency_min, self.frequency_likely, self.frequency_max],
        )?;
        match (direct, self.threat_event_frequency, self.vulnerability) {
            (Some(_), Some(_), _) | (Some(_), _, Some(_)) => Err(ConfigError::ConflictingFrequency),
            (Some(frequency), None, None) => Ok(FrequencyModel::LossEvents(frequency)),
            (None, Some(threat_events), Some(vulnerability)) => {
                Ok(FrequencyModel::ThreatEvents { threat_events, vulnerability })
            }
            (None, Some(_), None) | (None, None, Some(_)) => Err(ConfigError::IncompleteThreatModel),
            (None, None, None) => Err(ConfigError::MissingField { field: "frequency_min" }),
        }
    }
}

/// All three bounds or none of them.
fn triple(names: [&'static str; 3], values: [Option<f64>; 3]) -> Result<Option<Estimate>, ConfigError> {
    match values {
        [Some(min), Some(likely), Some(max)] => Ok(Some(Estimate::new(min, likely, max))),
        [None, None, None] => Ok(None),
        _ => {
            let missing = names
                .iter()
                .zip(values.iter())
                .find(|(_, v)| v.is_none())
                .map(|(name, _)| *name)
                .unwrap_or(names[0]);
            Err(ConfigError::MissingField { field: missing })
        }
    }
}

impl TryFrom<ScenarioInput> for RiskScenario {
    type Error = ConfigError;

    fn try_from(input: ScenarioInput) -> Result<Self, Self::Error> {
        let frequency = input.frequency_model()?;
        let secondary = triple(
            ["secondary_magnitude_min", "secondary_magnitude_likely", "secondary_magnitude_max"],
            [
                input.secondary_magnitude_min,
                input.secondary_magnitude_likely,
                input.secondary_magnitude_max,
            ],
        )?;
        if input.trial_count <= 0 {
            return Err(ConfigError::InvalidTrialCount { value: input.trial_count });
        }

        let mut builder = RiskScenario::builder()
            .frequency_model(frequency)
            .magnitude(input.magnitude_min, input.magnitude_likely, input.magnitude_max)
            .confidence(input.confidence)
            .trial_count(input.trial_count as usize)
            .maybe_seed(input.random_seed)
            .count_rule(input.count_rule);
        if let Some(s) = secondary {
            builder = builder.secondary_magnitude(s.min, s.likely, s.max);
        }
        builder.build()
    }
}

impl From<RiskScenario> for ScenarioInput {
    fn from(scenario: RiskScenario) -> Self {
        let (direct, threat_event_frequency, vulnerability) = match scenario.frequency() {
            FrequencyModel::LossEvents(f) => (Some(f), None, None),
            FrequencyModel::ThreatEvents { threat_events, vulnerability } => {
                (None, Some(threat_events), Some(vulnerability))
            }
        };
        let magnitude = scenario.magnitude();
        let secondary = scenario.secondary_magnitude();

        Self {
            frequency_min: direct.map(|f| f.min),
            frequency_likely: direct.map(|f| f.likely),
            frequency_max: direct.map(|f| f.max),
            threat_event_frequency,
            vulnerability,
            magnitude_min: magnitude.min,
            magnitude_likely: magnitude.likely,
            magnitude_max: magnitude.max,
            secondary_magnitude_min: secondary.map(|s| s.min),
            secondary_magnitude_likely: secondary.map(|s| s.likely),
            secondary_magnitude_max: secondary.map(|s| s.max),
            confidence: scenario.confidence(),
            trial_count: scenario.trial_count() as i64,
            random_seed: scenario.random_seed(),
            count_rule: scenario.count_rule(),
        }
    }
}
