//! FAIR Monte Carlo risk engine.
//!
//! Data flows one way:
//!   RiskScenario -> SimEngine (PERT samplers, seeded RNG streams)
//!     -> SimulationRun -> summarize -> SummaryStatistics
//!
//! Nothing here holds state between runs. A run is a pure function of
//! its scenario and master seed.

pub mod config;
pub mod distribution;
pub mod engine;
pub mod error;
pub mod rng;
pub mod run;
pub mod scenario;
pub mod stats;
pub mod store;
pub mod types;

pub use config::ScenarioInput;
pub use distribution::{CountRule, Estimate};
pub use engine::{simulate, SimEngine};
pub use error::{ConfigError, FairError, FairResult};
pub use run::{SimulationRun, TrialResult};
pub use scenario::{FrequencyModel, RiskScenario};
pub use stats::{summarize, SummaryStatistics};
