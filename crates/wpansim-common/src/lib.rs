//! # wpansim-common
//!
//! Shared building blocks for the WPANSim discrete-event simulator:
//!
//! - [`SimTime`] - virtual time with nanosecond resolution
//! - [`EventScheduler`] - the time-ordered event queue every component schedules through
//! - [`DeviceId`] - identifier of a simulated device
//! - [`Vector3`], [`PositionProvider`], [`ConstantPositions`] - device geometry
//! - [`SimError`] - engine-level invariant violations
//!
//! Execution is single-threaded and cooperative. Nothing in this crate reads
//! the wall clock; identical inputs always produce identical event orderings.

mod error;
mod geometry;
mod scheduler;
mod time;

pub use error::SimError;
pub use geometry::{ConstantPositions, PositionProvider, Vector3};
pub use scheduler::{Event, EventHandle, EventScheduler, RunLimit, RunSummary};
pub use time::SimTime;

use serde::{Deserialize, Serialize};

/// Identifier of a simulated device (one PHY + one MAC).
///
/// Device identifiers are dense indices assigned in registration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DeviceId(pub u32);

impl DeviceId {
    /// Create a device identifier.
    pub const fn new(id: u32) -> Self {
        DeviceId(id)
    }

    /// The identifier as a vector index.
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl std::fmt::Display for DeviceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "dev{}", self.0)
    }
}

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, SimError>;
