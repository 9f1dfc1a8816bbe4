//! Metrics declarations for WPANSim.
//!
//! Every metric recorded by the simulator is declared here as a const
//! [`Metric`] so names, units and label keys live in one place. Recording goes
//! through the `metrics` facade, which is a no-op until a recorder is installed.
//!
//! ```rust,ignore
//! use wpansim_metrics::{metric_defs, metrics, MetricLabels};
//!
//! let labels = MetricLabels::new("dev0", "sensor");
//! metrics::counter!(metric_defs::PHY_TX_PACKETS.name, &labels.to_labels()).increment(1);
//! ```

pub use metrics;

use metrics::{describe_counter, describe_gauge, describe_histogram, Unit};

/// The kind of metric (counter, gauge, or histogram).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricKind {
    /// A monotonically increasing counter.
    Counter,
    /// A gauge that can go up and down.
    Gauge,
    /// A histogram for recording distributions.
    Histogram,
}

impl MetricKind {
    pub const fn as_str(&self) -> &'static str {
        match self {
            MetricKind::Counter => "counter",
            MetricKind::Gauge => "gauge",
            MetricKind::Histogram => "histogram",
        }
    }
}

impl std::fmt::Display for MetricKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A metric declaration with its metadata.
///
/// ```rust
/// use wpansim_metrics::{Metric, MetricKind};
/// use metrics::Unit;
///
/// const FRAMES: Metric = Metric::counter("wpansim.test.frames")
///     .with_description("Frames seen")
///     .with_unit(Unit::Count)
///     .with_labels(&["node"]);
///
/// assert_eq!(FRAMES.kind, MetricKind::Counter);
/// ```
#[derive(Debug, Clone)]
pub struct Metric {
    /// The metric name (e.g., "wpansim.phy.tx_packets").
    pub name: &'static str,
    pub kind: MetricKind,
    pub description: &'static str,
    pub unit: Option<Unit>,
    /// Expected label keys.
    pub labels: &'static [&'static str],
}

impl Metric {
    const fn with_kind(name: &'static str, kind: MetricKind) -> Self {
        Self {
            name,
            kind,
            description: "",
            unit: None,
            labels: &[],
        }
    }

    /// Declare a counter.
    pub const fn counter(name: &'static str) -> Self {
        Self::with_kind(name, MetricKind::Counter)
    }

    /// Declare a gauge.
    pub const fn gauge(name: &'static str) -> Self {
        Self::with_kind(name, MetricKind::Gauge)
    }

    /// Declare a histogram.
    pub const fn histogram(name: &'static str) -> Self {
        Self::with_kind(name, MetricKind::Histogram)
    }

    pub const fn with_description(mut self, description: &'static str) -> Self {
        self.description = description;
        self
    }

    pub const fn with_unit(mut self, unit: Unit) -> Self {
        self.unit = Some(unit);
        self
    }

    pub const fn with_labels(mut self, labels: &'static [&'static str]) -> Self {
        self.labels = labels;
        self
    }

    /// Register this metric's description with the installed recorder.
    pub fn describe(&self) {
        match (self.kind, self.unit) {
            (MetricKind::Counter, Some(unit)) => {
                describe_counter!(self.name, unit, self.description);
            }
            (MetricKind::Counter, None) => {
                describe_counter!(self.name, self.description);
            }
            (MetricKind::Gauge, Some(unit)) => {
                describe_gauge!(self.name, unit, self.description);
            }
            (MetricKind::Gauge, None) => {
                describe_gauge!(self.name, self.description);
            }
            (MetricKind::Histogram, Some(unit)) => {
                describe_histogram!(self.name, unit, self.description);
            }
            (MetricKind::Histogram, None) => {
                describe_histogram!(self.name, self.description);
            }
        }
    }

    /// The unit as a human-readable string.
    pub fn unit_str(&self) -> &'static str {
        match self.unit {
            Some(Unit::Count) => "count",
            Some(Unit::Percent) => "percent",
            Some(Unit::Seconds) => "seconds",
            Some(Unit::Milliseconds) => "milliseconds",
            Some(Unit::Microseconds) => "microseconds",
            Some(Unit::Nanoseconds) => "nanoseconds",
            Some(Unit::Bytes) => "bytes",
            Some(_) => "other",
            None => "",
        }
    }
}

/// All metric definitions for the simulator.
pub mod metric_defs {
    use super::{Metric, Unit};

    /// Labels present on all device-scoped metrics.
    pub const DEVICE_LABELS: &[&str] = &["node", "role"];

    // ========================================================================
    // PHY
    // ========================================================================

    pub const PHY_TX_PACKETS: Metric = Metric::counter("wpansim.phy.tx_packets")
        .with_description("Frames transmitted by the PHY")
        .with_unit(Unit::Count)
        .with_labels(DEVICE_LABELS);

    pub const PHY_TX_AIRTIME: Metric = Metric::counter("wpansim.phy.tx_airtime_us")
        .with_description("Total transmit airtime in microseconds")
        .with_unit(Unit::Microseconds)
        .with_labels(DEVICE_LABELS);

    pub const PHY_RX_PACKETS: Metric = Metric::counter("wpansim.phy.rx_packets")
        .with_description("Frames decoded successfully by the PHY")
        .with_unit(Unit::Count)
        .with_labels(DEVICE_LABELS);

    /// Signals dropped because the receiver was not in RX_ON (half duplex).
    pub const PHY_RX_DROPPED_BUSY: Metric = Metric::counter("wpansim.phy.rx_dropped_busy")
        .with_description("Arriving signals dropped because the radio was not listening")
        .with_unit(Unit::Count)
        .with_labels(DEVICE_LABELS);

    pub const PHY_RX_CORRUPTED: Metric = Metric::counter("wpansim.phy.rx_corrupted")
        .with_description("Frames rejected by the error model")
        .with_unit(Unit::Count)
        .with_labels(DEVICE_LABELS);

    pub const PHY_RX_POWER: Metric = Metric::histogram("wpansim.phy.rx_power_dbm")
        .with_description("Received signal power in dBm")
        .with_labels(DEVICE_LABELS);

    pub const PHY_STATE_TRANSITIONS: Metric = Metric::counter("wpansim.phy.state_transitions")
        .with_description("Transceiver state transitions")
        .with_unit(Unit::Count)
        .with_labels(&["node", "role", "state"]);

    // ========================================================================
    // MAC
    // ========================================================================

    pub const MAC_DATA_REQUESTS: Metric = Metric::counter("wpansim.mac.data_requests")
        .with_description("Accepted MCPS-DATA.request primitives")
        .with_unit(Unit::Count)
        .with_labels(DEVICE_LABELS);

    pub const MAC_CONFIRMS: Metric = Metric::counter("wpansim.mac.confirms")
        .with_description("MCPS-DATA.confirm primitives by status")
        .with_unit(Unit::Count)
        .with_labels(&["node", "role", "status"]);

    pub const MAC_INDICATIONS: Metric = Metric::counter("wpansim.mac.indications")
        .with_description("MCPS-DATA.indication primitives")
        .with_unit(Unit::Count)
        .with_labels(DEVICE_LABELS);

    pub const MAC_ACKS_SENT: Metric = Metric::counter("wpansim.mac.acks_sent")
        .with_description("Acknowledgement frames transmitted")
        .with_unit(Unit::Count)
        .with_labels(DEVICE_LABELS);

    pub const MAC_FILTERED: Metric = Metric::counter("wpansim.mac.filtered")
        .with_description("Received frames not addressed to this device")
        .with_unit(Unit::Count)
        .with_labels(DEVICE_LABELS);

    pub const MAC_QUEUE_DEPTH: Metric = Metric::gauge("wpansim.mac.queue_depth")
        .with_description("Data requests waiting in the transmit queue")
        .with_unit(Unit::Count)
        .with_labels(DEVICE_LABELS);

    // ========================================================================
    // Sweep
    // ========================================================================

    pub const SWEEP_SUCCESS_RATE: Metric = Metric::gauge("wpansim.sweep.success_rate")
        .with_description("Packet success rate at the current sweep distance")
        .with_labels(&["distance_m"]);

    pub const SWEEP_TRIALS: Metric = Metric::counter("wpansim.sweep.trials")
        .with_description("Sweep trials issued")
        .with_unit(Unit::Count);

    pub const ALL: &[&Metric] = &[
        &PHY_TX_PACKETS,
        &PHY_TX_AIRTIME,
        &PHY_RX_PACKETS,
        &PHY_RX_DROPPED_BUSY,
        &PHY_RX_CORRUPTED,
        &PHY_RX_POWER,
        &PHY_STATE_TRANSITIONS,
        &MAC_DATA_REQUESTS,
        &MAC_CONFIRMS,
        &MAC_INDICATIONS,
        &MAC_ACKS_SENT,
        &MAC_FILTERED,
        &MAC_QUEUE_DEPTH,
        &SWEEP_SUCCESS_RATE,
        &SWEEP_TRIALS,
    ];
}

/// Labels identifying a device in metrics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricLabels {
    pub node: String,
    pub role: String,
}

impl MetricLabels {
    pub fn new(node: impl Into<String>, role: impl Into<String>) -> Self {
        Self {
            node: node.into(),
            role: role.into(),
        }
    }

    pub fn to_labels(&self) -> Vec<(&'static str, String)> {
        vec![("node", self.node.clone()), ("role", self.role.clone())]
    }

    /// Device labels followed by `extra`.
    pub fn with(&self, extra: &[(&'static str, String)]) -> Vec<(&'static str, String)> {
        let mut labels = self.to_labels();
        labels.extend_from_slice(extra);
        labels
    }
}

/// Describe every metric in [`metric_defs::ALL`].
pub fn describe_metrics() {
    for metric in metric_defs::ALL {
        metric.describe();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_metric_labels() {
        let labels = MetricLabels::new("dev0", "sensor");
        let label_vec = labels.to_labels();
        assert_eq!(label_vec.len(), 2);
        assert!(label_vec.contains(&("node", "dev0".to_string())));
        assert!(label_vec.contains(&("role", "sensor".to_string())));
    }

    #[test]
    fn test_with_extra_labels() {
        let labels = MetricLabels::new("dev0", "sensor");
        let extended = labels.with(&[("status", "SUCCESS".to_string())]);
        assert_eq!(extended.len(), 3);
        assert_eq!(extended[2], ("status", "SUCCESS".to_string()));
    }

    #[test]
    fn test_metric_names_are_unique() {
        let mut seen = HashSet::new();
        for metric in metric_defs::ALL {
            assert!(seen.insert(metric.name), "duplicate metric {}", metric.name);
            assert!(metric.name.starts_with("wpansim."));
            assert!(!metric.description.is_empty());
        }
    }

    #[test]
    fn test_metric_kinds() {
        assert_eq!(metric_defs::PHY_RX_POWER.kind, MetricKind::Histogram);
        assert_eq!(metric_defs::MAC_QUEUE_DEPTH.kind, MetricKind::Gauge);
        assert_eq!(metric_defs::PHY_TX_AIRTIME.unit_str(), "microseconds");
        assert_eq!(MetricKind::Counter.to_string(), "counter");
    }

    #[test]
    fn test_describe_without_recorder() {
        describe_metrics();
    }
}
