//! Half-duplex transceiver state machine.
//!
//! A device is in exactly one [`PhyState`] at any virtual time. Sending walks
//! `RX_ON|TRX_OFF -> TX_ON -> BUSY_TX -> TX_ON -> RX_ON|TRX_OFF`; receiving
//! walks `RX_ON -> BUSY_RX -> RX_ON`. Signals arriving in any state other than
//! `RX_ON` are dropped, so a transmitting or sleeping radio cannot receive.
//! When several signals reach an idle receiver at the same instant the
//! receiver captures the strongest of them.

use crate::channel::Signal;
use crate::error::PhyError;
use crate::event::{DeviceContext, NetworkEvent};
use crate::frame::MacFrame;
use crate::listener::{RxOutcome, StateTransition};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::trace;
use wpansim_common::{EventHandle, SimTime};
use wpansim_link::ErrorModel;
use wpansim_metrics::{metric_defs, metrics};

/// Default transmit power in dBm.
pub const DEFAULT_TX_POWER_DBM: f64 = 0.0;

/// Default receiver sensitivity in dBm.
pub const DEFAULT_RX_SENSITIVITY_DBM: f64 = -106.58;

/// Transceiver state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PhyState {
    TrxOff,
    RxOn,
    TxOn,
    BusyRx,
    BusyTx,
}

impl PhyState {
    pub fn as_str(&self) -> &'static str {
        match self {
            PhyState::TrxOff => "TRX_OFF",
            PhyState::RxOn => "RX_ON",
            PhyState::TxOn => "TX_ON",
            PhyState::BusyRx => "BUSY_RX",
            PhyState::BusyTx => "BUSY_TX",
        }
    }

    /// Whether a transmission may start from this state.
    pub fn can_transmit(&self) -> bool {
        matches!(self, PhyState::TrxOff | PhyState::RxOn)
    }
}

impl fmt::Display for PhyState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-device PHY counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhyStats {
    pub tx_frames: u64,
    pub tx_airtime_us: u64,
    pub rx_ok: u64,
    pub rx_corrupted: u64,
    pub rx_dropped_busy: u64,
}

/// The signal a receiver is locked onto.
#[derive(Debug)]
struct RxLock {
    signal: Box<Signal>,
    started: SimTime,
    end: EventHandle,
}

/// The physical layer of one device.
#[derive(Debug)]
pub struct Phy {
    state: PhyState,
    tx_power_dbm: f64,
    error_model: Box<dyn ErrorModel>,
    /// State to return to once the current transmission ends.
    resume_state: PhyState,
    current_rx: Option<RxLock>,
    stats: PhyStats,
}

impl Phy {
    /// A PHY starting in `TRX_OFF`.
    pub fn new(tx_power_dbm: f64, error_model: Box<dyn ErrorModel>) -> Self {
        Self {
            state: PhyState::TrxOff,
            tx_power_dbm,
            error_model,
            resume_state: PhyState::TrxOff,
            current_rx: None,
            stats: PhyStats::default(),
        }
    }

    pub fn state(&self) -> PhyState {
        self.state
    }

    pub fn tx_power_dbm(&self) -> f64 {
        self.tx_power_dbm
    }

    pub fn set_tx_power_dbm(&mut self, tx_power_dbm: f64) {
        self.tx_power_dbm = tx_power_dbm;
    }

    pub fn rx_sensitivity_dbm(&self) -> f64 {
        self.error_model.rx_sensitivity_dbm()
    }

    pub fn set_rx_sensitivity_dbm(&mut self, rx_sensitivity_dbm: f64) {
        self.error_model.set_rx_sensitivity(rx_sensitivity_dbm);
    }

    pub fn error_model(&self) -> &dyn ErrorModel {
        self.error_model.as_ref()
    }

    pub fn stats(&self) -> &PhyStats {
        &self.stats
    }

    pub(crate) fn set_state(&mut self, new: PhyState, ctx: &mut DeviceContext<'_>) {
        let old = self.state;
        if old == new {
            return;
        }
        self.state = new;
        let time = ctx.now();
        trace!(device = %ctx.device, %old, %new, %time, "phy state");
        metrics::counter!(
            metric_defs::PHY_STATE_TRANSITIONS.name,
            &ctx.labels.with(&[("state", new.as_str().to_string())])
        )
        .increment(1);
        ctx.listeners.emit_state_change(&StateTransition {
            device: ctx.device,
            old,
            new,
            time,
        });
    }

    /// Start sending `frame` and hand it to the channel.
    ///
    /// Returns the airtime. A `TxEnd` event is scheduled for its end.
    pub(crate) fn transmit(
        &mut self,
        frame: MacFrame,
        ctx: &mut DeviceContext<'_>,
    ) -> Result<SimTime, PhyError> {
        if !self.state.can_transmit() {
            return Err(PhyError::Busy(self.state));
        }
        self.resume_state = self.state;
        self.set_state(PhyState::TxOn, ctx);
        self.set_state(PhyState::BusyTx, ctx);

        let airtime = frame.airtime();
        self.stats.tx_frames += 1;
        self.stats.tx_airtime_us += airtime.as_micros();
        let labels = ctx.labels.to_labels();
        metrics::counter!(metric_defs::PHY_TX_PACKETS.name, &labels).increment(1);
        metrics::counter!(metric_defs::PHY_TX_AIRTIME.name, &labels).increment(airtime.as_micros());

        let reached = ctx.channel.propagate(
            ctx.device,
            &frame,
            self.tx_power_dbm,
            airtime,
            ctx.positions,
            ctx.scheduler,
        )?;
        trace!(
            device = %ctx.device,
            frame = frame.frame_type().as_str(),
            dsn = frame.dsn(),
            psdu = frame.psdu_octets(),
            %airtime,
            reached,
            "phy tx start"
        );
        ctx.schedule_in(airtime, NetworkEvent::TxEnd)?;
        Ok(airtime)
    }

    /// Finish the current transmission.
    pub(crate) fn end_tx(&mut self, ctx: &mut DeviceContext<'_>) {
        self.set_state(PhyState::TxOn, ctx);
        self.set_state(self.resume_state, ctx);
    }

    /// A signal's first bit arrives. Returns whether the PHY locked onto it.
    pub(crate) fn start_rx(
        &mut self,
        signal: Box<Signal>,
        ctx: &mut DeviceContext<'_>,
    ) -> Result<bool, PhyError> {
        let now = ctx.now();
        if self.state == PhyState::BusyRx {
            if let Some(lock) = self.current_rx.as_mut() {
                if lock.started == now && signal.rx_power_dbm > lock.signal.rx_power_dbm {
                    ctx.cancel(lock.end);
                    lock.end = ctx.schedule_in(signal.duration, NetworkEvent::RxEnd)?;
                    let weaker = std::mem::replace(&mut lock.signal, signal);
                    trace!(
                        device = %ctx.device,
                        sender = %lock.signal.sender,
                        dropped = %weaker.sender,
                        "phy rx captured stronger signal"
                    );
                    self.count_dropped(ctx);
                    return Ok(true);
                }
            }
        }
        if self.state != PhyState::RxOn {
            self.count_dropped(ctx);
            trace!(
                device = %ctx.device,
                sender = %signal.sender,
                state = %self.state,
                "phy rx dropped, not listening"
            );
            return Ok(false);
        }
        self.set_state(PhyState::BusyRx, ctx);
        let end = ctx.schedule_in(signal.duration, NetworkEvent::RxEnd)?;
        self.current_rx = Some(RxLock {
            signal,
            started: now,
            end,
        });
        Ok(true)
    }

    fn count_dropped(&mut self, ctx: &DeviceContext<'_>) {
        self.stats.rx_dropped_busy += 1;
        metrics::counter!(metric_defs::PHY_RX_DROPPED_BUSY.name, &ctx.labels.to_labels())
            .increment(1);
    }

    /// The signal being received ends.
    ///
    /// Returns the signal if the error model accepted it.
    pub(crate) fn end_rx(&mut self, ctx: &mut DeviceContext<'_>) -> Option<Box<Signal>> {
        let signal = self.current_rx.take()?.signal;
        let success = self
            .error_model
            .outcome(signal.rx_power_dbm, signal.frame.psdu_octets());
        self.set_state(PhyState::RxOn, ctx);

        let labels = ctx.labels.to_labels();
        metrics::histogram!(metric_defs::PHY_RX_POWER.name, &labels).record(signal.rx_power_dbm);
        if success {
            self.stats.rx_ok += 1;
            metrics::counter!(metric_defs::PHY_RX_PACKETS.name, &labels).increment(1);
        } else {
            self.stats.rx_corrupted += 1;
            metrics::counter!(metric_defs::PHY_RX_CORRUPTED.name, &labels).increment(1);
        }
        trace!(
            device = %ctx.device,
            sender = %signal.sender,
            rx_power_dbm = signal.rx_power_dbm,
            success,
            "phy rx end"
        );
        ctx.listeners.emit_rx_outcome(
            ctx.device,
            &RxOutcome {
                sender: signal.sender,
                received_power_dbm: signal.rx_power_dbm,
                success,
                time: ctx.now(),
            },
        );
        success.then_some(signal)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wpansim_link::ThresholdErrorModel;

    #[test]
    fn test_state_names() {
        assert_eq!(PhyState::TrxOff.to_string(), "TRX_OFF");
        assert_eq!(PhyState::BusyRx.as_str(), "BUSY_RX");
    }

    #[test]
    fn test_can_transmit() {
        assert!(PhyState::TrxOff.can_transmit());
        assert!(PhyState::RxOn.can_transmit());
        assert!(!PhyState::TxOn.can_transmit());
        assert!(!PhyState::BusyRx.can_transmit());
        assert!(!PhyState::BusyTx.can_transmit());
    }

    #[test]
    fn test_settings() {
        let mut phy = Phy::new(
            DEFAULT_TX_POWER_DBM,
            Box::new(ThresholdErrorModel::new(DEFAULT_RX_SENSITIVITY_DBM)),
        );
        assert_eq!(phy.state(), PhyState::TrxOff);
        phy.set_tx_power_dbm(5.0);
        phy.set_rx_sensitivity_dbm(-85.0);
        assert_eq!(phy.tx_power_dbm(), 5.0);
        assert_eq!(phy.rx_sensitivity_dbm(), -85.0);
        assert_eq!(phy.error_model().name(), "threshold");
        assert_eq!(*phy.stats(), PhyStats::default());
    }
}
