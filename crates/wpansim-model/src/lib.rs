//! # wpansim-model
//!
//! Configuration for WPANSim experiments and the construction functions that
//! turn a configuration into a ready-to-run [`Network`](wpansim_lrwpan::Network).
//!
//! - [`SimulationConfig`] - the YAML document: seed, propagation, error model,
//!   MAC settings and one section per experiment
//! - [`load_config`] / [`load_config_from_str`] - parse and validate
//! - [`build_sweep_network`] / [`build_exchange_network`] - topology builders

mod build;
mod config;

pub use build::{
    build_exchange_network, build_sweep_network, device_addresses, ExchangeNode,
    ExchangeTopology, LinkPair, SweepTopology,
};
pub use config::{
    load_config, load_config_from_str, ExchangeConfig, MacSettings, RadioConfig, SimulationConfig,
    SweepConfig,
};

use thiserror::Error;
use wpansim_link::LinkError;
use wpansim_lrwpan::NetworkError;

/// Errors that can occur while loading a configuration or building a model.
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Network error: {0}")]
    Network(#[from] NetworkError),

    #[error("Link model error: {0}")]
    Link(#[from] LinkError),
}
