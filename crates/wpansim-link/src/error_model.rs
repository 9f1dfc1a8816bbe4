//! Reception error models.
//!
//! An [`ErrorModel`] decides whether a packet arriving with a given received
//! power survives reception. Two policies are provided:
//!
//! - [`ThresholdErrorModel`]: deterministic, success iff the received power
//!   reaches the receiver sensitivity. Used for range and link-budget studies.
//! - [`ProbabilisticErrorModel`]: converts the signal-to-noise ratio into a
//!   bit error rate with the IEEE 802.15.4 O-QPSK curve and draws the number
//!   of bit errors for the packet. Used for ensemble statistics.

use crate::LinkError;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rand_distr::{Binomial, Distribution};
use statrs::function::factorial::binomial;
use tracing::trace;

/// Thermal noise over a 2 MHz channel at 290 K with unit noise figure, in dBm.
pub const DEFAULT_NOISE_FLOOR_DBM: f64 = -111.0;

/// Decides the fate of an arriving packet.
pub trait ErrorModel: std::fmt::Debug {
    /// Whether a packet of `packet_size_bytes` received at
    /// `received_power_dbm` is decoded successfully.
    fn outcome(&mut self, received_power_dbm: f64, packet_size_bytes: usize) -> bool;

    /// Receiver sensitivity currently applied, in dBm.
    fn rx_sensitivity_dbm(&self) -> f64;

    /// Change the receiver sensitivity.
    fn set_rx_sensitivity(&mut self, rx_sensitivity_dbm: f64);

    /// Short policy name for logs.
    fn name(&self) -> &'static str;
}

/// Deterministic sensitivity threshold.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThresholdErrorModel {
    rx_sensitivity_dbm: f64,
}

impl ThresholdErrorModel {
    pub fn new(rx_sensitivity_dbm: f64) -> Self {
        Self { rx_sensitivity_dbm }
    }
}

impl ErrorModel for ThresholdErrorModel {
    fn outcome(&mut self, received_power_dbm: f64, _packet_size_bytes: usize) -> bool {
        received_power_dbm >= self.rx_sensitivity_dbm
    }

    fn rx_sensitivity_dbm(&self) -> f64 {
        self.rx_sensitivity_dbm
    }

    fn set_rx_sensitivity(&mut self, rx_sensitivity_dbm: f64) {
        self.rx_sensitivity_dbm = rx_sensitivity_dbm;
    }

    fn name(&self) -> &'static str {
        "threshold"
    }
}

/// Bit error rate of the 2.4 GHz O-QPSK PHY (IEEE 802.15.4-2006, Annex E).
///
/// ```text
/// BER = (8/15) * (1/16) * sum_{k=2}^{16} (-1)^k C(16,k) exp(20 * SNR * (1/k - 1))
/// ```
///
/// `snr_linear` is the signal-to-noise power ratio (not dB). The result is
/// clamped to `[0, 1]`.
pub fn oqpsk_bit_error_rate(snr_linear: f64) -> f64 {
    if !snr_linear.is_finite() {
        return if snr_linear > 0.0 { 0.0 } else { 1.0 };
    }
    let mut sum = 0.0;
    for k in 2u64..=16 {
        let sign = if k % 2 == 0 { 1.0 } else { -1.0 };
        let kf = k as f64;
        sum += sign * binomial(16, k) * (20.0 * snr_linear * (1.0 / kf - 1.0)).exp();
    }
    (sum * 8.0 / 15.0 / 16.0).clamp(0.0, 1.0)
}

/// Probability that `bits` bits all survive a channel with bit error rate `ber`.
pub fn packet_success_probability(ber: f64, bits: u64) -> f64 {
    (1.0 - ber.clamp(0.0, 1.0)).powf(bits as f64)
}

/// SNR-driven stochastic reception.
///
/// Signals below the sensitivity always fail. Above it, the number of bit
/// errors over `8 * packet_size_bytes` bits is drawn from a binomial
/// distribution and the packet succeeds iff none occur.
#[derive(Debug, Clone)]
pub struct ProbabilisticErrorModel {
    rx_sensitivity_dbm: f64,
    noise_floor_dbm: f64,
    rng: ChaCha8Rng,
}

impl ProbabilisticErrorModel {
    /// Create a model with its own deterministic random stream.
    pub fn new(rx_sensitivity_dbm: f64, noise_floor_dbm: f64, seed: u64) -> Self {
        Self {
            rx_sensitivity_dbm,
            noise_floor_dbm,
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    /// Noise floor used to derive the SNR, in dBm.
    pub fn noise_floor_dbm(&self) -> f64 {
        self.noise_floor_dbm
    }

    /// Bit error rate for a signal received at `received_power_dbm`.
    pub fn bit_error_rate(&self, received_power_dbm: f64) -> f64 {
        let snr_db = received_power_dbm - self.noise_floor_dbm;
        oqpsk_bit_error_rate(10f64.powf(snr_db / 10.0))
    }
}

impl ErrorModel for ProbabilisticErrorModel {
    fn outcome(&mut self, received_power_dbm: f64, packet_size_bytes: usize) -> bool {
        if received_power_dbm < self.rx_sensitivity_dbm {
            return false;
        }
        let bits = 8 * packet_size_bytes as u64;
        let ber = self.bit_error_rate(received_power_dbm);
        if bits == 0 || ber <= 0.0 {
            return true;
        }
        let errors = match Binomial::new(bits, ber) {
            Ok(dist) => dist.sample(&mut self.rng),
            Err(_) => bits,
        };
        trace!(received_power_dbm, ber, bits, errors, "probabilistic reception");
        errors == 0
    }

    fn rx_sensitivity_dbm(&self) -> f64 {
        self.rx_sensitivity_dbm
    }

    fn set_rx_sensitivity(&mut self, rx_sensitivity_dbm: f64) {
        self.rx_sensitivity_dbm = rx_sensitivity_dbm;
    }

    fn name(&self) -> &'static str {
        "probabilistic"
    }
}

/// Selects a reception policy at construction time.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "type", rename_all = "snake_case"))]
pub enum ErrorPolicy {
    /// Deterministic sensitivity threshold.
    Threshold,
    /// O-QPSK bit error curve with random draws.
    Probabilistic {
        #[cfg_attr(feature = "serde", serde(default = "default_noise_floor"))]
        noise_floor_dbm: f64,
    },
}

#[cfg(feature = "serde")]
fn default_noise_floor() -> f64 {
    DEFAULT_NOISE_FLOOR_DBM
}

impl Default for ErrorPolicy {
    fn default() -> Self {
        ErrorPolicy::Threshold
    }
}

impl ErrorPolicy {
    /// Build a model for one receiver.
    ///
    /// `seed` feeds the random stream of the probabilistic policy and is
    /// ignored by the threshold policy.
    pub fn build(
        &self,
        rx_sensitivity_dbm: f64,
        seed: u64,
    ) -> Result<Box<dyn ErrorModel>, LinkError> {
        if !rx_sensitivity_dbm.is_finite() {
            return Err(LinkError::invalid(
                self.name(),
                "rx_sensitivity_dbm",
                "must be finite",
            ));
        }
        match *self {
            ErrorPolicy::Threshold => Ok(Box::new(ThresholdErrorModel::new(rx_sensitivity_dbm))),
            ErrorPolicy::Probabilistic { noise_floor_dbm } => {
                if !noise_floor_dbm.is_finite() {
                    return Err(LinkError::invalid(
                        "probabilistic",
                        "noise_floor_dbm",
                        "must be finite",
                    ));
                }
                Ok(Box::new(ProbabilisticErrorModel::new(
                    rx_sensitivity_dbm,
                    noise_floor_dbm,
                    seed,
                )))
            }
        }
    }

    /// Policy name for logs and reports.
    pub fn name(&self) -> &'static str {
        match self {
            ErrorPolicy::Threshold => "threshold",
            ErrorPolicy::Probabilistic { .. } => "probabilistic",
        }
    }
}
