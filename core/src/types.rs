//! Shared primitive types used across the engine.

/// The canonical identifier of an archived simulation run.
pub type RunId = String;

/// Master seed of a simulation run. Every RNG stream is derived from it.
pub type Seed = u64;
