//! Cycle-length estimation, prediction and validation over a history of
//! period start dates. Every operation is a pure function of its inputs.

pub mod config;
pub mod engine;
pub mod history;
pub mod models;
pub mod prediction;
pub mod validation;

pub use config::{ConfigError, CycleConfig, TimeGranularity};
pub use engine::{CycleEngine, EngineError};
pub use models::*;
pub use validation::ValidationError;
