//! # wpansim-runner
//!
//! Experiment drivers for WPANSim and the `wpansim` command line front end.
//!
//! - [`SweepController`] - packet success rate versus distance
//! - [`ExchangeScenario`] - request/response exchange along a line of nodes

mod exchange;
mod sweep;

pub use exchange::{ExchangeReport, ExchangeScenario, NodeReport};
pub use sweep::{DistanceSample, SweepController};

// Re-exported for callers that only depend on the runner.
pub use wpansim_common::SimTime;
pub use wpansim_model::{load_config, load_config_from_str, SimulationConfig};

use thiserror::Error;
use wpansim_lrwpan::NetworkError;
use wpansim_model::ModelError;

/// Errors that can occur while running an experiment.
#[derive(Debug, Error)]
pub enum RunnerError {
    #[error("Model error: {0}")]
    Model(#[from] ModelError),

    #[error("Network error: {0}")]
    Network(#[from] NetworkError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
