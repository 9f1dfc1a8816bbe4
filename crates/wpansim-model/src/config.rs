//! Serde configuration types with reference defaults.
//!
//! Every section is optional in YAML; missing fields take the defaults below.
//!
//! ```yaml
//! seed: 7
//! propagation:
//!   type: log_distance
//!   exponent: 3.0
//!   reference_loss_db: 40.0
//! error_model:
//!   type: threshold
//! sweep:
//!   max_distance_m: 200
//!   increment_m: 10
//!   tx_power_dbm: 0
//! ```

use crate::ModelError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;
use wpansim_link::{ErrorPolicy, PropagationKind};
use wpansim_lrwpan::constants::{A_TURNAROUND_TIME_SYMBOLS, MAC_ACK_WAIT_SYMBOLS};
use wpansim_lrwpan::{
    max_msdu_octets, AddressMode, MacConfig, DEFAULT_RX_SENSITIVITY_DBM, DEFAULT_TX_POWER_DBM,
};

/// Root of a configuration document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SimulationConfig {
    /// Seed for every random stream of the run.
    pub seed: u64,
    pub propagation: PropagationKind,
    pub error_model: ErrorPolicy,
    pub mac: MacSettings,
    pub sweep: SweepConfig,
    pub exchange: ExchangeConfig,
}

/// Transmit power and receiver sensitivity.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RadioConfig {
    pub tx_power_dbm: f64,
    pub rx_sensitivity_dbm: f64,
}

impl Default for RadioConfig {
    fn default() -> Self {
        Self {
            tx_power_dbm: DEFAULT_TX_POWER_DBM,
            rx_sensitivity_dbm: DEFAULT_RX_SENSITIVITY_DBM,
        }
    }
}

/// MAC settings shared by every device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MacSettings {
    pub pan_id: u16,
    pub ack_wait_symbols: u64,
    pub turnaround_symbols: u64,
    pub rx_on_when_idle: bool,
}

impl Default for MacSettings {
    fn default() -> Self {
        Self {
            pan_id: 0,
            ack_wait_symbols: MAC_ACK_WAIT_SYMBOLS,
            turnaround_symbols: A_TURNAROUND_TIME_SYMBOLS,
            rx_on_when_idle: true,
        }
    }
}

impl MacSettings {
    pub fn mac_config(&self) -> MacConfig {
        MacConfig {
            ack_wait_symbols: self.ack_wait_symbols,
            turnaround_symbols: self.turnaround_symbols,
            rx_on_when_idle: self.rx_on_when_idle,
        }
    }
}

/// Packet success rate versus distance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SweepConfig {
    pub min_distance_m: f64,
    pub max_distance_m: f64,
    pub increment_m: f64,
    pub packet_size_bytes: usize,
    pub tx_power_dbm: f64,
    pub rx_sensitivity_dbm: f64,
    pub max_packets_per_distance: u32,
    pub addressing_mode: AddressMode,
    /// Transmitter/receiver pairs exercised side by side.
    pub concurrent_links: u32,
    /// Separation between the pairs, perpendicular to the swept axis.
    pub link_spacing_m: f64,
    /// Spacing of consecutive trials.
    pub trial_interval_us: u64,
    pub ack_requested: bool,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            min_distance_m: 1.0,
            max_distance_m: 100.0,
            increment_m: 10.0,
            packet_size_bytes: 7,
            tx_power_dbm: 5.0,
            rx_sensitivity_dbm: -85.0,
            max_packets_per_distance: 1000,
            addressing_mode: AddressMode::Short,
            concurrent_links: 2,
            link_spacing_m: 10.0,
            trial_interval_us: 1000,
            ack_requested: false,
        }
    }
}

impl SweepConfig {
    /// Distances visited: `min`, `min + increment`, ... while not above `max`.
    pub fn distances(&self) -> Vec<f64> {
        if self.increment_m.is_nan()
            || self.increment_m <= 0.0
            || self.min_distance_m > self.max_distance_m
        {
            return Vec::new();
        }
        let tolerance = self.increment_m * 1e-9;
        let mut distances = Vec::new();
        let mut step = 0u32;
        loop {
            let distance = self.min_distance_m + f64::from(step) * self.increment_m;
            if distance > self.max_distance_m + tolerance {
                break;
            }
            distances.push(distance);
            step += 1;
        }
        distances
    }

    pub fn validate(&self) -> Result<(), ModelError> {
        if !(self.increment_m.is_finite() && self.increment_m > 0.0) {
            return Err(invalid(format!(
                "sweep.increment_m must be positive, got {}",
                self.increment_m
            )));
        }
        if !(self.min_distance_m.is_finite() && self.min_distance_m >= 0.0) {
            return Err(invalid(format!(
                "sweep.min_distance_m must be non-negative, got {}",
                self.min_distance_m
            )));
        }
        if !self.max_distance_m.is_finite() || self.min_distance_m > self.max_distance_m {
            return Err(invalid(format!(
                "sweep.min_distance_m ({}) exceeds sweep.max_distance_m ({})",
                self.min_distance_m, self.max_distance_m
            )));
        }
        if self.addressing_mode == AddressMode::NoAddress {
            return Err(invalid("sweep.addressing_mode must be short or extended"));
        }
        let max = max_msdu_octets(self.addressing_mode);
        if self.packet_size_bytes > max {
            return Err(invalid(format!(
                "sweep.packet_size_bytes {} exceeds the {} byte maximum for {} addressing",
                self.packet_size_bytes, max, self.addressing_mode
            )));
        }
        if self.concurrent_links == 0 {
            return Err(invalid("sweep.concurrent_links must be at least 1"));
        }
        if self.trial_interval_us == 0 {
            return Err(invalid("sweep.trial_interval_us must be positive"));
        }
        finite("sweep.link_spacing_m", self.link_spacing_m)?;
        finite("sweep.tx_power_dbm", self.tx_power_dbm)?;
        finite("sweep.rx_sensitivity_dbm", self.rx_sensitivity_dbm)?;
        Ok(())
    }
}

/// Request/response exchange between a line of nodes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ExchangeConfig {
    pub node_count: u32,
    pub spacing_m: f64,
    pub extended_addressing: bool,
    pub request_size_bytes: usize,
    pub response_size_bytes: usize,
    pub request_time_s: f64,
    /// Offset between consecutive nodes' requests.
    pub request_stagger_ms: f64,
    pub response_time_s: f64,
    pub stop_time_s: f64,
    pub ack_requested: bool,
    pub radio: RadioConfig,
}

impl Default for ExchangeConfig {
    fn default() -> Self {
        Self {
            node_count: 4,
            spacing_m: 25.0,
            extended_addressing: false,
            request_size_bytes: 50,
            response_size_bytes: 60,
            request_time_s: 1.0,
            request_stagger_ms: 10.0,
            response_time_s: 2.0,
            stop_time_s: 5.0,
            ack_requested: true,
            radio: RadioConfig::default(),
        }
    }
}

impl ExchangeConfig {
    pub fn addressing_mode(&self) -> AddressMode {
        if self.extended_addressing {
            AddressMode::Extended
        } else {
            AddressMode::Short
        }
    }

    pub fn validate(&self) -> Result<(), ModelError> {
        if self.node_count < 2 {
            return Err(invalid(format!(
                "exchange.node_count must be at least 2, got {}",
                self.node_count
            )));
        }
        let max = max_msdu_octets(self.addressing_mode());
        for (field, size) in [
            ("request_size_bytes", self.request_size_bytes),
            ("response_size_bytes", self.response_size_bytes),
        ] {
            if size > max {
                return Err(invalid(format!(
                    "exchange.{field} {size} exceeds the {max} byte maximum for {} addressing",
                    self.addressing_mode()
                )));
            }
        }
        for (field, value) in [
            ("request_time_s", self.request_time_s),
            ("request_stagger_ms", self.request_stagger_ms),
            ("response_time_s", self.response_time_s),
            ("stop_time_s", self.stop_time_s),
        ] {
            if !(value.is_finite() && value >= 0.0) {
                return Err(invalid(format!(
                    "exchange.{field} must be non-negative, got {value}"
                )));
            }
        }
        finite("exchange.spacing_m", self.spacing_m)?;
        finite("exchange.radio.tx_power_dbm", self.radio.tx_power_dbm)?;
        finite("exchange.radio.rx_sensitivity_dbm", self.radio.rx_sensitivity_dbm)?;
        Ok(())
    }
}

impl SimulationConfig {
    /// Reject inconsistent values before anything is built.
    pub fn validate(&self) -> Result<(), ModelError> {
        self.propagation.build()?;
        self.error_model.build(self.sweep.rx_sensitivity_dbm, self.seed)?;
        self.sweep.validate()?;
        self.exchange.validate()?;
        Ok(())
    }
}

fn invalid(message: impl Into<String>) -> ModelError {
    ModelError::Invalid(message.into())
}

fn finite(field: &str, value: f64) -> Result<(), ModelError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(invalid(format!("{field} must be finite, got {value}")))
    }
}

/// Parse and validate a YAML configuration.
pub fn load_config_from_str(yaml: &str) -> Result<SimulationConfig, ModelError> {
    let config: SimulationConfig = serde_yaml::from_str(yaml)?;
    config.validate()?;
    Ok(config)
}

/// Load and validate a YAML configuration file.
pub fn load_config(path: impl AsRef<Path>) -> Result<SimulationConfig, ModelError> {
    let path = path.as_ref();
    let yaml = std::fs::read_to_string(path)?;
    let config = load_config_from_str(&yaml)?;
    debug!(path = %path.display(), seed = config.seed, "configuration loaded");
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_defaults() {
        let config = SimulationConfig::default();
        assert_eq!(config.seed, 0);
        assert_eq!(config.error_model, ErrorPolicy::Threshold);
        assert_eq!(config.sweep.packet_size_bytes, 7);
        assert_eq!(config.sweep.max_packets_per_distance, 1000);
        assert_eq!(config.sweep.addressing_mode, AddressMode::Short);
        assert_eq!(config.exchange.node_count, 4);
        assert_eq!(config.mac.mac_config(), MacConfig::default());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_default_distances() {
        let distances = SweepConfig::default().distances();
        assert_eq!(distances.len(), 10);
        assert_relative_eq!(distances[0], 1.0);
        assert_relative_eq!(distances[9], 91.0);
    }

    #[test]
    fn test_distances_include_max() {
        let sweep = SweepConfig {
            min_distance_m: 0.1,
            max_distance_m: 0.3,
            increment_m: 0.1,
            ..SweepConfig::default()
        };
        assert_eq!(sweep.distances().len(), 3);
    }

    #[test]
    fn test_parse_yaml() {
        let yaml = r#"
seed: 11
propagation:
  type: log_distance
  exponent: 3.0
  reference_loss_db: 40.0
error_model:
  type: probabilistic
sweep:
  min_distance_m: 10
  max_distance_m: 200
  increment_m: 190
  tx_power_dbm: 0
  addressing_mode: extended
exchange:
  extended_addressing: true
  radio:
    tx_power_dbm: 3
"#;
        let config = load_config_from_str(yaml).unwrap();
        assert_eq!(config.seed, 11);
        assert_eq!(
            config.propagation,
            PropagationKind::LogDistance {
                exponent: 3.0,
                reference_loss_db: 40.0,
                reference_distance_m: 1.0,
            }
        );
        assert_eq!(
            config.error_model,
            ErrorPolicy::Probabilistic {
                noise_floor_dbm: wpansim_link::DEFAULT_NOISE_FLOOR_DBM
            }
        );
        assert_eq!(config.sweep.distances(), vec![10.0, 200.0]);
        assert_eq!(config.sweep.addressing_mode, AddressMode::Extended);
        assert_eq!(config.sweep.packet_size_bytes, 7);
        assert_eq!(config.exchange.addressing_mode(), AddressMode::Extended);
        assert_eq!(config.exchange.radio.tx_power_dbm, 3.0);
        assert_eq!(config.exchange.radio.rx_sensitivity_dbm, DEFAULT_RX_SENSITIVITY_DBM);
    }

    #[test]
    fn test_unknown_field_rejected() {
        let err = load_config_from_str("sweep:\n  max_distance: 10\n").unwrap_err();
        assert!(matches!(err, ModelError::Yaml(_)));
    }

    #[test]
    fn test_validation_errors() {
        let mut config = SimulationConfig::default();
        config.sweep.increment_m = 0.0;
        assert!(matches!(config.validate(), Err(ModelError::Invalid(_))));

        let mut config = SimulationConfig::default();
        config.sweep.min_distance_m = 50.0;
        config.sweep.max_distance_m = 10.0;
        assert!(matches!(config.validate(), Err(ModelError::Invalid(_))));

        let mut config = SimulationConfig::default();
        config.sweep.packet_size_bytes = 117;
        assert!(matches!(config.validate(), Err(ModelError::Invalid(_))));
        config.sweep.packet_size_bytes = 116;
        assert!(config.validate().is_ok());

        let mut config = SimulationConfig::default();
        config.exchange.node_count = 1;
        assert!(matches!(config.validate(), Err(ModelError::Invalid(_))));

        let mut config = SimulationConfig::default();
        config.sweep.addressing_mode = AddressMode::NoAddress;
        assert!(matches!(config.validate(), Err(ModelError::Invalid(_))));

        let mut config = SimulationConfig::default();
        config.propagation = PropagationKind::FreeSpace { frequency_hz: 0.0 };
        assert!(matches!(config.validate(), Err(ModelError::Link(_))));
    }

    #[test]
    fn test_load_missing_file() {
        let err = load_config("/nonexistent/wpansim.yaml").unwrap_err();
        assert!(matches!(err, ModelError::Io(_)));
    }
}
