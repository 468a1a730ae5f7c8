//! Distribution sampler.
//!
//! Every expert estimate is a (min, likely, max) triple sampled through a
//! PERT distribution: a Beta(alpha, beta) variate rescaled onto [min, max]
//! whose mode is `likely`. The confidence parameter sets the PERT lambda:
//!
//!   lambda = 4 * c / (1 - c)
//!   alpha  = 1 + lambda * (likely - min) / (max - min)
//!   beta   = 1 + lambda * (max - likely) / (max - min)
//!
//! c = 0.5 is the classic PERT (lambda = 4). c -> 0 flattens towards the
//! uniform Beta(1, 1). c = 1 collapses onto `likely`.
//!
//! Event counts are derived from a sampled annual frequency by a CountRule.

use crate::error::{ConfigError, FairError, FairResult};
use rand::Rng;
use rand_distr::{Beta, Binomial, Distribution, Poisson};
use serde::{Deserialize, Serialize};

/// PERT lambda at confidence 0.5.
pub const PERT_LAMBDA_AT_HALF_CONFIDENCE: f64 = 4.0;

/// A (minimum, most likely, maximum) expert estimate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Estimate {
    pub min:    f64,
    pub likely: f64,
    pub max:    f64,
}

impl Estimate {
    pub fn new(min: f64, likely: f64, max: f64) -> Self {
        Self { min, likely, max }
    }

    /// An estimate with no spread.
    pub fn point(value: f64) -> Self {
        Self::new(value, value, value)
    }

    /// Check 0 <= min <= likely <= max with every bound finite.
    pub fn validate(&self, field: &'static str) -> Result<(), ConfigError> {
        let finite = self.min.is_finite() && self.likely.is_finite() && self.max.is_finite();
        let ordered = self.min <= self.likely && self.likely <= self.max;
        if !finite || !ordered || self.min < 0.0 {
            return Err(ConfigError::InvalidRange {
                field,
                min:    self.min,
                likely: self.likely,
                max:    self.max,
            });
        }
        Ok(())
    }

    /// Like `validate`, additionally requiring max <= 1.
    pub fn validate_probability(&self, field: &'static str) -> Result<(), ConfigError> {
        self.validate(field)?;
        if self.max > 1.0 {
            return Err(ConfigError::InvalidProbability {
                field,
                min:    self.min,
                likely: self.likely,
                max:    self.max,
            });
        }
        Ok(())
    }

    pub fn is_degenerate(&self) -> bool {
        self.min == self.max
    }

    pub fn width(&self) -> f64 {
        self.max - self.min
    }
}

/// Confidence must lie in (0, 1].
pub fn validate_confidence(confidence: f64) -> Result<(), ConfigError> {
    if confidence.is_finite() && confidence > 0.0 && confidence <= 1.0 {
        Ok(())
    } else {
        Err(ConfigError::InvalidConfidence { value: confidence })
    }
}

/// PERT lambda for a confidence in (0, 1]. Infinite at 1.
pub fn pert_lambda(confidence: f64) -> f64 {
    if confidence >= 1.0 {
        f64::INFINITY
    } else {
        PERT_LAMBDA_AT_HALF_CONFIDENCE * confidence / (1.0 - confidence)
    }
}

#[derive(Debug, Clone)]
enum Shape {
    Constant(f64),
    Beta { alpha: f64, beta: f64, dist: Beta<f64> },
}

/// A validated PERT distribution ready for sampling.
#[derive(Debug, Clone)]
pub struct Pert {
    estimate: Estimate,
    shape:    Shape,
}

impl Pert {
    /// Build the sampler for `estimate`. `field` names the estimate in errors.
    pub fn new(field: &'static str, estimate: Estimate, confidence: f64) -> Result<Self, ConfigError> {
        estimate.validate(field)?;
        validate_confidence(confidence)?;

        let lambda = pert_lambda(confidence);
        if estimate.is_degenerate() || lambda.is_infinite() {
            return Ok(Self { estimate, shape: Shape::Constant(estimate.likely) });
        }

        let width = estimate.width();
        let alpha = 1.0 + lambda * (estimate.likely - estimate.min) / width;
        let beta = 1.0 + lambda * (estimate.max - estimate.likely) / width;
        let dist = Beta::new(alpha, beta)
            .map_err(|_| ConfigError::InvalidConfidence { value: confidence })?;

        Ok(Self { estimate, shape: Shape::Beta { alpha, beta, dist } })
    }

    /// Beta shape parameters, or None when the distribution is a constant.
    pub fn alpha(&self) -> Option<f64> {
        match &self.shape {
            Shape::Constant(_) => None,
            Shape::Beta { alpha, .. } => Some(*alpha),
        }
    }

    pub fn beta(&self) -> Option<f64> {
        match &self.shape {
            Shape::Constant(_) => None,
            Shape::Beta { beta, .. } => Some(*beta),
        }
    }

    /// Theoretical mean of the distribution.
    pub fn mean(&self) -> f64 {
        match &self.shape {
            Shape::Constant(v) => *v,
            Shape::Beta { alpha, beta, .. } => {
                self.estimate.min + self.estimate.width() * alpha / (alpha + beta)
            }
        }
    }

    /// Draw one variate in [min, max]. Constants consume no randomness.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        match &self.shape {
            Shape::Constant(v) => *v,
            Shape::Beta { dist, .. } => {
                let x = dist.sample(rng);
                (self.estimate.min + x * self.estimate.width())
                    .clamp(self.estimate.min, self.estimate.max)
            }
        }
    }
}

/// How a continuous annual frequency becomes a whole number of events.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CountRule {
    /// floor(frequency). A frequency below 1 never yields an event.
    #[default]
    Floor,
    /// Poisson(frequency): the frequency is an annual rate.
    Poisson,
}

/// Samples the number of loss events in one simulated year.
#[derive(Debug, Clone)]
pub struct FrequencySampler {
    rate:          Pert,
    rule:          CountRule,
    vulnerability: Option<Pert>,
}

impl FrequencySampler {
    /// Loss events sampled straight from a loss event frequency.
    pub fn direct(rate: Pert, rule: CountRule) -> Self {
        Self { rate, rule, vulnerability: None }
    }

    /// Threat events, each becoming a loss event with a sampled probability.
    pub fn thinned(threat_rate: Pert, vulnerability: Pert, rule: CountRule) -> Self {
        Self { rate: threat_rate, rule, vulnerability: Some(vulnerability) }
    }

    pub fn sample_count<R: Rng + ?Sized>(&self, rng: &mut R) -> FairResult<u64> {
        let events = count_events(self.rate.sample(rng), self.rule, rng)?;

        let Some(vulnerability) = &self.vulnerability else {
            return Ok(events);
        };
        if events == 0 {
            return Ok(0);
        }

        let p = vulnerability.sample(rng);
        if p <= 0.0 {
            Ok(0)
        } else if p >= 1.0 {
            Ok(events)
        } else {
            let binomial = Binomial::new(events, p).map_err(sampling_error)?;
            Ok(binomial.sample(rng))
        }
    }
}

fn count_events<R: Rng + ?Sized>(frequency: f64, rule: CountRule, rng: &mut R) -> FairResult<u64> {
    match rule {
        CountRule::Floor => Ok(frequency.floor().max(0.0) as u64),
        CountRule::Poisson => {
            if frequency <= 0.0 {
                return Ok(0);
            }
            let poisson = Poisson::new(frequency).map_err(sampling_error)?;
            let draw: f64 = poisson.sample(rng);
            Ok(draw as u64)
        }
    }
}

fn sampling_error(e: impl std::fmt::Display) -> FairError {
    FairError::Sampling(e.to_string())
}
