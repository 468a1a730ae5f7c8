use thiserror::Error;

/// Scenario invariant violations. Raised before any sampling happens.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("Invalid {field} range: expected 0 <= min <= likely <= max, got ({min}, {likely}, {max})")]
    InvalidRange {
        field:  &'static str,
        min:    f64,
        likely: f64,
        max:    f64,
    },

    #[error("Invalid {field} range: probabilities must lie in [0, 1], got ({min}, {likely}, {max})")]
    InvalidProbability {
        field:  &'static str,
        min:    f64,
        likely: f64,
        max:    f64,
    },

    #[error("Invalid confidence {value}: must be in (0, 1]")]
    InvalidConfidence { value: f64 },

    #[error("Invalid trial count {value}: must be a positive integer")]
    InvalidTrialCount { value: i64 },

    #[error("Invalid annualization: {events} events over {years} years")]
    InvalidAnnualization { events: f64, years: f64 },

    #[error("Missing required field '{field}'")]
    MissingField { field: &'static str },

    #[error("Both a loss event frequency and a threat event model were given")]
    ConflictingFrequency,

    #[error("Threat event model needs both threat_event_frequency and vulnerability")]
    IncompleteThreatModel,
}

#[derive(Error, Debug)]
pub enum FairError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Sampling error: {0}")]
    Sampling(String),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Run '{run_id}' not found")]
    RunNotFound { run_id: String },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type FairResult<T> = Result<T, FairError>;
