//! Network events and the per-device view handed to event handlers.

use crate::channel::{Channel, Signal};
use crate::listener::Listeners;
use crate::mac::TxParams;
use crate::packet::Packet;
use wpansim_common::{ConstantPositions, DeviceId, EventHandle, EventScheduler, SimError, SimTime};
use wpansim_metrics::MetricLabels;

/// Actions the network scheduler executes.
///
/// Every event carries the target device as its scheduler context.
#[derive(Debug, Clone)]
pub enum NetworkEvent {
    /// A deferred MCPS-DATA.request.
    DataRequest { params: TxParams, packet: Packet },
    /// The PHY finished sending a frame.
    TxEnd,
    /// The first bit of a signal reached this device.
    RxStart(Box<Signal>),
    /// The signal currently being received ended.
    RxEnd,
    /// No acknowledgement arrived for the frame with this sequence number.
    AckTimeout { dsn: u8 },
    /// Try to start the next pending transmission.
    ServiceQueue,
}

impl NetworkEvent {
    pub fn name(&self) -> &'static str {
        match self {
            NetworkEvent::DataRequest { .. } => "data_request",
            NetworkEvent::TxEnd => "tx_end",
            NetworkEvent::RxStart(_) => "rx_start",
            NetworkEvent::RxEnd => "rx_end",
            NetworkEvent::AckTimeout { .. } => "ack_timeout",
            NetworkEvent::ServiceQueue => "service_queue",
        }
    }
}

/// Everything a device's PHY and MAC may touch while handling one event.
pub(crate) struct DeviceContext<'a> {
    pub device: DeviceId,
    pub labels: &'a MetricLabels,
    pub scheduler: &'a mut EventScheduler<NetworkEvent>,
    pub channel: &'a Channel,
    pub positions: &'a ConstantPositions,
    pub listeners: &'a mut Listeners,
}

impl DeviceContext<'_> {
    pub fn now(&self) -> SimTime {
        self.scheduler.now()
    }

    /// Schedule `event` for this device after `delay`.
    pub fn schedule_in(
        &mut self,
        delay: SimTime,
        event: NetworkEvent,
    ) -> Result<EventHandle, SimError> {
        self.scheduler.schedule_in(delay, event, Some(self.device))
    }

    pub fn cancel(&mut self, handle: EventHandle) -> bool {
        self.scheduler.cancel(handle)
    }
}
