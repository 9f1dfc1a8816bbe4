//! Error types for the simulation engine.

use crate::{DeviceId, SimTime};
use thiserror::Error;

/// Engine-level invariant violations.
///
/// These indicate a modeling defect upstream, not a link-level outcome.
/// Packet loss, corruption and acknowledgement timeouts are never reported
/// through this type.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SimError {
    /// An event was scheduled before the current virtual time.
    #[error("Causality violation: event scheduled at {scheduled} but current time is {now}")]
    CausalityViolation {
        /// Requested execution time.
        scheduled: SimTime,
        /// Virtual time at the moment of scheduling.
        now: SimTime,
    },

    /// A device identifier does not refer to a registered device.
    #[error("Unknown device: {0}")]
    UnknownDevice(DeviceId),
}
