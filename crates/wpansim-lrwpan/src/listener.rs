//! Observer hooks invoked synchronously from the event loop.
//!
//! Listeners run inside the event that produced the notification, in
//! registration order, before the next event is considered.

use crate::mac::{DataConfirm, DataIndication};
use crate::packet::Packet;
use crate::phy::PhyState;
use wpansim_common::{DeviceId, SimTime};

/// A transceiver state change.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StateTransition {
    pub device: DeviceId,
    pub old: PhyState,
    pub new: PhyState,
    pub time: SimTime,
}

/// The error model's verdict on one received frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RxOutcome {
    pub sender: DeviceId,
    pub received_power_dbm: f64,
    pub success: bool,
    pub time: SimTime,
}

pub type ConfirmListener = Box<dyn FnMut(DeviceId, &DataConfirm)>;
pub type IndicationListener = Box<dyn FnMut(DeviceId, &DataIndication, &Packet)>;
pub type StateChangeListener = Box<dyn FnMut(&StateTransition)>;
pub type RxOutcomeListener = Box<dyn FnMut(DeviceId, &RxOutcome)>;

/// Registered listener lists.
#[derive(Default)]
pub struct Listeners {
    confirm: Vec<ConfirmListener>,
    indication: Vec<IndicationListener>,
    state_change: Vec<StateChangeListener>,
    rx_outcome: Vec<RxOutcomeListener>,
}

impl std::fmt::Debug for Listeners {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Listeners")
            .field("confirm", &self.confirm.len())
            .field("indication", &self.indication.len())
            .field("state_change", &self.state_change.len())
            .field("rx_outcome", &self.rx_outcome.len())
            .finish()
    }
}

impl Listeners {
    pub fn add_confirm(&mut self, listener: ConfirmListener) {
        self.confirm.push(listener);
    }

    pub fn add_indication(&mut self, listener: IndicationListener) {
        self.indication.push(listener);
    }

    pub fn add_state_change(&mut self, listener: StateChangeListener) {
        self.state_change.push(listener);
    }

    pub fn add_rx_outcome(&mut self, listener: RxOutcomeListener) {
        self.rx_outcome.push(listener);
    }

    /// Drop every registered listener.
    pub fn clear(&mut self) {
        self.confirm.clear();
        self.indication.clear();
        self.state_change.clear();
        self.rx_outcome.clear();
    }

    pub(crate) fn emit_confirm(&mut self, device: DeviceId, confirm: &DataConfirm) {
        for listener in &mut self.confirm {
            listener(device, confirm);
        }
    }

    pub(crate) fn emit_indication(
        &mut self,
        device: DeviceId,
        indication: &DataIndication,
        packet: &Packet,
    ) {
        for listener in &mut self.indication {
            listener(device, indication, packet);
        }
    }

    pub(crate) fn emit_state_change(&mut self, transition: &StateTransition) {
        for listener in &mut self.state_change {
            listener(transition);
        }
    }

    pub(crate) fn emit_rx_outcome(&mut self, device: DeviceId, outcome: &RxOutcome) {
        for listener in &mut self.rx_outcome {
            listener(device, outcome);
        }
    }
}
