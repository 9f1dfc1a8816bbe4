//! Error types for the LR-WPAN layers.
//!
//! Only engine faults and malformed requests are errors. Lost, corrupted and
//! unacknowledged frames are modeled outcomes reported through confirms.

use crate::address::{Address, AddressMode};
use crate::phy::PhyState;
use std::fmt;
use thiserror::Error;
use wpansim_common::{DeviceId, SimError};
use wpansim_link::LinkError;

/// Which half of the addressing a validation error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressField {
    Source,
    Destination,
}

impl fmt::Display for AddressField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            AddressField::Source => "source",
            AddressField::Destination => "destination",
        })
    }
}

/// Errors raised by the MAC for a data request.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MacError {
    #[error("Invalid address mode: {field} mode is {mode} but {reason}")]
    InvalidAddressMode {
        field: AddressField,
        mode: AddressMode,
        reason: &'static str,
    },

    #[error("Frame too long: PSDU of {psdu_bytes} bytes exceeds the {max} byte maximum")]
    FrameTooLong { psdu_bytes: usize, max: usize },

    #[error(transparent)]
    Sim(#[from] SimError),
}

/// Errors raised by the PHY.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PhyError {
    #[error("Transceiver busy: cannot transmit in state {0}")]
    Busy(PhyState),

    #[error(transparent)]
    Sim(#[from] SimError),
}

/// Errors raised while building or running a [`Network`](crate::Network).
#[derive(Debug, Error)]
pub enum NetworkError {
    #[error("Duplicate address {0}")]
    DuplicateAddress(Address),

    #[error("Unknown device {0}")]
    UnknownDevice(DeviceId),

    #[error("Event {0} has no device context")]
    MissingContext(u64),

    #[error("MAC error on {device}: {source}")]
    Mac {
        device: DeviceId,
        #[source]
        source: MacError,
    },

    #[error(transparent)]
    Phy(#[from] PhyError),

    #[error(transparent)]
    Sim(#[from] SimError),

    #[error(transparent)]
    Link(#[from] LinkError),
}

impl NetworkError {
    /// The MAC error, if this is one.
    pub fn as_mac(&self) -> Option<&MacError> {
        match self {
            NetworkError::Mac { source, .. } => Some(source),
            _ => None,
        }
    }
}
