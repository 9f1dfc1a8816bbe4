//! # wpansim-link
//!
//! Physical link models for WPANSim.
//!
//! This crate turns geometry into signal strength and signal strength into a
//! reception decision:
//!
//! - **Propagation**: [`PropagationModel`] maps distance to path loss and
//!   propagation delay ([`LogDistanceModel`], [`FreeSpaceModel`]).
//! - **Reception errors**: [`ErrorModel`] maps received power and packet size
//!   to success or failure ([`ThresholdErrorModel`], [`ProbabilisticErrorModel`]).
//! - **Link budget**: [`LinkBudget`] classifies margins and computes range.
//!
//! Both capabilities are selected at construction time through
//! [`PropagationKind`] and [`ErrorPolicy`]; the channel and PHY only ever see
//! the trait objects.

mod budget;
mod error_model;
mod propagation;

pub use budget::{LinkBudget, LinkMarginThresholds, LinkStatus};
pub use error_model::{
    oqpsk_bit_error_rate, packet_success_probability, ErrorModel, ErrorPolicy,
    ProbabilisticErrorModel, ThresholdErrorModel, DEFAULT_NOISE_FLOOR_DBM,
};
pub use propagation::{
    constant_speed_delay, FreeSpaceModel, LogDistanceModel, PropagationKind, PropagationModel,
    DEFAULT_FREQUENCY_HZ, SPEED_OF_LIGHT_M_S,
};

use thiserror::Error;

/// Errors raised while constructing link models.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LinkError {
    /// A model parameter is outside its valid domain.
    #[error("Invalid {model} parameter '{parameter}': {reason}")]
    InvalidParameter {
        /// Model being configured.
        model: &'static str,
        /// Offending parameter name.
        parameter: &'static str,
        /// Why the value was rejected.
        reason: String,
    },
}

impl LinkError {
    pub(crate) fn invalid(
        model: &'static str,
        parameter: &'static str,
        reason: impl Into<String>,
    ) -> Self {
        LinkError::InvalidParameter {
            model,
            parameter,
            reason: reason.into(),
        }
    }
}
