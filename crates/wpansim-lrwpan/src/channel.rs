//! Shared medium connecting every registered PHY.

use crate::event::NetworkEvent;
use crate::frame::MacFrame;
use tracing::{trace, warn};
use wpansim_common::{DeviceId, EventScheduler, PositionProvider, SimError, SimTime};
use wpansim_link::PropagationModel;

/// A frame in flight towards one receiver.
#[derive(Debug, Clone)]
pub struct Signal {
    pub sender: DeviceId,
    pub frame: MacFrame,
    pub tx_power_dbm: f64,
    pub rx_power_dbm: f64,
    /// Airtime of the frame.
    pub duration: SimTime,
}

/// Fan-out medium.
///
/// Holds device identifiers only. Registration happens while building the
/// network; the list is read-only once the network runs.
#[derive(Debug)]
pub struct Channel {
    devices: Vec<DeviceId>,
    propagation: Box<dyn PropagationModel>,
}

impl Channel {
    pub fn new(propagation: Box<dyn PropagationModel>) -> Self {
        Self {
            devices: Vec::new(),
            propagation,
        }
    }

    pub(crate) fn register(&mut self, device: DeviceId) {
        if !self.devices.contains(&device) {
            self.devices.push(device);
        }
    }

    /// Registered devices in registration order.
    pub fn devices(&self) -> &[DeviceId] {
        &self.devices
    }

    pub fn propagation(&self) -> &dyn PropagationModel {
        self.propagation.as_ref()
    }

    /// Received power at `distance_m` for a transmission at `tx_power_dbm`.
    pub fn received_power_dbm(&self, tx_power_dbm: f64, distance_m: f64) -> f64 {
        tx_power_dbm - self.propagation.path_loss_db(distance_m)
    }

    /// Schedule the arrival of `frame` at every other registered device.
    ///
    /// Devices without a position are skipped. Returns the number of
    /// arrivals scheduled.
    pub(crate) fn propagate(
        &self,
        sender: DeviceId,
        frame: &MacFrame,
        tx_power_dbm: f64,
        duration: SimTime,
        positions: &dyn PositionProvider,
        scheduler: &mut EventScheduler<NetworkEvent>,
    ) -> Result<usize, SimError> {
        let Some(origin) = positions.position(sender) else {
            warn!(%sender, "transmitter has no position, frame not delivered");
            return Ok(0);
        };
        let mut scheduled = 0;
        for &receiver in &self.devices {
            if receiver == sender {
                continue;
            }
            let Some(target) = positions.position(receiver) else {
                continue;
            };
            let distance = origin.distance_to(&target);
            let rx_power_dbm = self.received_power_dbm(tx_power_dbm, distance);
            let delay = self.propagation.delay(distance);
            trace!(%sender, %receiver, distance, rx_power_dbm, %delay, "signal scheduled");
            let signal = Signal {
                sender,
                frame: frame.clone(),
                tx_power_dbm,
                rx_power_dbm,
                duration,
            };
            scheduler.schedule_in(delay, NetworkEvent::RxStart(Box::new(signal)), Some(receiver))?;
            scheduled += 1;
        }
        Ok(scheduled)
    }
}
