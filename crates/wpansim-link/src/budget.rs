//! Link budget and link quality classification.

use crate::PropagationModel;

/// Margin thresholds used to classify a link.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LinkMarginThresholds {
    /// Minimum margin for excellent link quality (dB).
    pub excellent_db: f64,
    /// Minimum margin for good link quality (dB).
    pub good_db: f64,
    /// Minimum margin for marginal link quality (dB).
    pub marginal_db: f64,
}

impl Default for LinkMarginThresholds {
    fn default() -> Self {
        Self {
            excellent_db: 10.0,
            good_db: 5.0,
            marginal_db: 0.0,
        }
    }
}

/// Link quality status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum LinkStatus {
    /// Excellent link with >10 dB margin.
    Excellent,
    /// Good link with >5 dB margin.
    Good,
    /// Marginal link with 0-5 dB margin.
    Marginal,
    /// Unreliable link with negative margin.
    Unreliable,
}

impl LinkStatus {
    /// Returns a human-readable description of the status.
    pub fn description(&self) -> &'static str {
        match self {
            LinkStatus::Excellent => "Excellent (>10 dB margin)",
            LinkStatus::Good => "Good (>5 dB margin)",
            LinkStatus::Marginal => "Marginal (0-5 dB margin)",
            LinkStatus::Unreliable => "UNRELIABLE (negative margin)",
        }
    }
}

impl std::fmt::Display for LinkStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.description())
    }
}

/// Transmit power and receiver sensitivity of a link.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LinkBudget {
    /// Transmit power in dBm.
    pub tx_power_dbm: f64,
    /// Receiver sensitivity in dBm.
    pub rx_sensitivity_dbm: f64,
}

impl LinkBudget {
    pub fn new(tx_power_dbm: f64, rx_sensitivity_dbm: f64) -> Self {
        Self {
            tx_power_dbm,
            rx_sensitivity_dbm,
        }
    }

    /// Maximum path loss tolerable before the received power drops below the sensitivity.
    pub fn max_path_loss_db(&self) -> f64 {
        self.tx_power_dbm - self.rx_sensitivity_dbm
    }

    /// Received power after `path_loss_db` of attenuation.
    pub fn received_power_dbm(&self, path_loss_db: f64) -> f64 {
        self.tx_power_dbm - path_loss_db
    }

    /// Margin above the sensitivity after `path_loss_db` of attenuation.
    pub fn margin_db(&self, path_loss_db: f64) -> f64 {
        self.max_path_loss_db() - path_loss_db
    }

    /// Classify a margin against `thresholds`.
    pub fn classify(&self, margin_db: f64, thresholds: &LinkMarginThresholds) -> LinkStatus {
        if margin_db > thresholds.excellent_db {
            LinkStatus::Excellent
        } else if margin_db > thresholds.good_db {
            LinkStatus::Good
        } else if margin_db >= thresholds.marginal_db {
            LinkStatus::Marginal
        } else {
            LinkStatus::Unreliable
        }
    }

    /// Largest distance (meters) at which `model` keeps the margin non-negative.
    ///
    /// Found by bisection, which relies on the model being monotonically
    /// non-decreasing in distance. Returns `0.0` if even a zero-length link
    /// fails and `upper_bound_m` if the link closes over the whole range.
    pub fn max_range_m(&self, model: &dyn PropagationModel, upper_bound_m: f64) -> f64 {
        let budget = self.max_path_loss_db();
        if model.path_loss_db(0.0) > budget {
            return 0.0;
        }
        if model.path_loss_db(upper_bound_m) <= budget {
            return upper_bound_m;
        }
        let (mut lo, mut hi) = (0.0, upper_bound_m);
        for _ in 0..100 {
            let mid = 0.5 * (lo + hi);
            if model.path_loss_db(mid) <= budget {
                lo = mid;
            } else {
                hi = mid;
            }
            if hi - lo < 1e-6 {
                break;
            }
        }
        lo
    }
}
