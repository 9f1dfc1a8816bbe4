//! Device positions.

use crate::{DeviceId, SimError};
use serde::{Deserialize, Serialize};

/// A position in meters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Vector3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vector3 {
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Vector3 { x, y, z }
    }

    /// Euclidean distance to `other` in meters.
    pub fn distance_to(&self, other: &Vector3) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        let dz = self.z - other.z;
        (dx * dx + dy * dy + dz * dz).sqrt()
    }
}

/// Supplies the current position of a device.
pub trait PositionProvider {
    /// Position of `device`, or `None` if the device has no position.
    fn position(&self, device: DeviceId) -> Option<Vector3>;

    /// Distance between two devices, if both have positions.
    fn distance(&self, a: DeviceId, b: DeviceId) -> Option<f64> {
        Some(self.position(a)?.distance_to(&self.position(b)?))
    }
}

/// Fixed positions, changed only between runs.
#[derive(Debug, Clone, Default)]
pub struct ConstantPositions {
    positions: Vec<Option<Vector3>>,
}

impl ConstantPositions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set (or move) the position of `device`.
    pub fn set_position(&mut self, device: DeviceId, position: Vector3) {
        let index = device.index();
        if self.positions.len() <= index {
            self.positions.resize(index + 1, None);
        }
        self.positions[index] = Some(position);
    }

    /// Position of `device`, failing if it was never placed.
    pub fn require(&self, device: DeviceId) -> Result<Vector3, SimError> {
        self.position(device).ok_or(SimError::UnknownDevice(device))
    }
}

impl PositionProvider for ConstantPositions {
    fn position(&self, device: DeviceId) -> Option<Vector3> {
        self.positions.get(device.index()).copied().flatten()
    }
}
