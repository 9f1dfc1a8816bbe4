//! Distance-based propagation models.

use crate::LinkError;
use wpansim_common::SimTime;

/// Speed of light in vacuum (m/s), used for constant-speed propagation delay.
pub const SPEED_OF_LIGHT_M_S: f64 = 299_792_458.0;

/// Center frequency of 2.4 GHz channel 11 in Hz.
pub const DEFAULT_FREQUENCY_HZ: f64 = 2.405e9;

/// Propagation delay at the speed of light.
pub fn constant_speed_delay(distance_m: f64) -> SimTime {
    SimTime::from_secs(distance_m.max(0.0) / SPEED_OF_LIGHT_M_S)
}

/// Maps distance to attenuation and delay.
///
/// Implementations must be monotonically non-decreasing in distance.
pub trait PropagationModel: std::fmt::Debug {
    /// Path loss in dB at `distance_m` meters.
    fn path_loss_db(&self, distance_m: f64) -> f64;

    /// Propagation delay over `distance_m` meters.
    fn delay(&self, distance_m: f64) -> SimTime {
        constant_speed_delay(distance_m)
    }

    /// Short model name for logs.
    fn name(&self) -> &'static str;
}

/// Log-distance path loss.
///
/// ```text
/// PL(d) = PL(d0) + 10 * n * log10(max(d, d0) / d0)
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LogDistanceModel {
    /// Path loss exponent `n`.
    pub exponent: f64,
    /// Path loss at the reference distance, in dB.
    pub reference_loss_db: f64,
    /// Reference distance `d0` in meters.
    pub reference_distance_m: f64,
}

impl Default for LogDistanceModel {
    fn default() -> Self {
        Self {
            exponent: 3.0,
            reference_loss_db: 46.6777,
            reference_distance_m: 1.0,
        }
    }
}

impl LogDistanceModel {
    /// Create a model with a 1 m reference distance.
    pub fn new(exponent: f64, reference_loss_db: f64) -> Result<Self, LinkError> {
        Self::with_reference_distance(exponent, reference_loss_db, 1.0)
    }

    /// Create a model with an explicit reference distance.
    pub fn with_reference_distance(
        exponent: f64,
        reference_loss_db: f64,
        reference_distance_m: f64,
    ) -> Result<Self, LinkError> {
        if !exponent.is_finite() || exponent < 0.0 {
            return Err(LinkError::invalid(
                "log_distance",
                "exponent",
                format!("must be finite and non-negative, got {exponent}"),
            ));
        }
        if !reference_loss_db.is_finite() {
            return Err(LinkError::invalid(
                "log_distance",
                "reference_loss_db",
                "must be finite",
            ));
        }
        if !(reference_distance_m.is_finite() && reference_distance_m > 0.0) {
            return Err(LinkError::invalid(
                "log_distance",
                "reference_distance_m",
                format!("must be positive, got {reference_distance_m}"),
            ));
        }
        Ok(Self {
            exponent,
            reference_loss_db,
            reference_distance_m,
        })
    }
}

impl PropagationModel for LogDistanceModel {
    fn path_loss_db(&self, distance_m: f64) -> f64 {
        let d = distance_m.max(self.reference_distance_m);
        self.reference_loss_db + 10.0 * self.exponent * (d / self.reference_distance_m).log10()
    }

    fn name(&self) -> &'static str {
        "log_distance"
    }
}

/// Friis free-space path loss.
///
/// ```text
/// FSPL(d) = 20 log10(d) + 20 log10(f) - 147.55
/// ```
///
/// Distances below `min_distance_m` are evaluated at `min_distance_m`, where
/// the far-field assumption stops holding.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FreeSpaceModel {
    /// Carrier frequency in Hz.
    pub frequency_hz: f64,
    /// Smallest distance the formula is evaluated at.
    pub min_distance_m: f64,
}

impl Default for FreeSpaceModel {
    fn default() -> Self {
        Self {
            frequency_hz: DEFAULT_FREQUENCY_HZ,
            min_distance_m: 1.0,
        }
    }
}

impl FreeSpaceModel {
    pub fn new(frequency_hz: f64) -> Result<Self, LinkError> {
        if !(frequency_hz.is_finite() && frequency_hz > 0.0) {
            return Err(LinkError::invalid(
                "free_space",
                "frequency_hz",
                format!("must be positive, got {frequency_hz}"),
            ));
        }
        Ok(Self {
            frequency_hz,
            ..Default::default()
        })
    }
}

impl PropagationModel for FreeSpaceModel {
    fn path_loss_db(&self, distance_m: f64) -> f64 {
        let d = distance_m.max(self.min_distance_m);
        20.0 * d.log10() + 20.0 * self.frequency_hz.log10() - 147.55
    }

    fn name(&self) -> &'static str {
        "free_space"
    }
}

/// Selects a propagation model at construction time.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "type", rename_all = "snake_case"))]
pub enum PropagationKind {
    /// Log-distance path loss.
    LogDistance {
        exponent: f64,
        reference_loss_db: f64,
        #[cfg_attr(feature = "serde", serde(default = "default_reference_distance"))]
        reference_distance_m: f64,
    },
    /// Friis free-space path loss.
    FreeSpace { frequency_hz: f64 },
}

#[cfg(feature = "serde")]
fn default_reference_distance() -> f64 {
    1.0
}

impl Default for PropagationKind {
    fn default() -> Self {
        let model = LogDistanceModel::default();
        PropagationKind::LogDistance {
            exponent: model.exponent,
            reference_loss_db: model.reference_loss_db,
            reference_distance_m: model.reference_distance_m,
        }
    }
}

impl PropagationKind {
    /// Build the selected model, validating its parameters.
    pub fn build(&self) -> Result<Box<dyn PropagationModel>, LinkError> {
        match *self {
            PropagationKind::LogDistance {
                exponent,
                reference_loss_db,
                reference_distance_m,
            } => Ok(Box::new(LogDistanceModel::with_reference_distance(
                exponent,
                reference_loss_db,
                reference_distance_m,
            )?)),
            PropagationKind::FreeSpace { frequency_hz } => {
                Ok(Box::new(FreeSpaceModel::new(frequency_hz)?))
            }
        }
    }
}
