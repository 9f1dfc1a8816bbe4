//! A simulated device: one PHY and one MAC.

use crate::address::DeviceAddresses;
use crate::channel::Channel;
use crate::error::{MacError, NetworkError};
use crate::event::{DeviceContext, NetworkEvent};
use crate::listener::Listeners;
use crate::mac::Mac;
use crate::phy::{Phy, PhyState};
use tracing::trace;
use wpansim_common::{ConstantPositions, DeviceId, EventScheduler};
use wpansim_metrics::MetricLabels;

/// A device owned by a [`Network`](crate::Network).
#[derive(Debug)]
pub struct Device {
    id: DeviceId,
    name: String,
    role: String,
    labels: MetricLabels,
    pub(crate) phy: Phy,
    pub(crate) mac: Mac,
}

impl Device {
    pub(crate) fn new(id: DeviceId, name: String, role: String, phy: Phy, mac: Mac) -> Self {
        Self {
            id,
            labels: MetricLabels::new(name.clone(), role.clone()),
            name,
            role,
            phy,
            mac,
        }
    }

    pub fn id(&self) -> DeviceId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn role(&self) -> &str {
        &self.role
    }

    pub fn addresses(&self) -> &DeviceAddresses {
        self.mac.addresses()
    }

    pub fn phy(&self) -> &Phy {
        &self.phy
    }

    pub fn mac(&self) -> &Mac {
        &self.mac
    }

    /// Move an idle transceiver to `state` outside of any event.
    pub(crate) fn set_idle_state(
        &mut self,
        state: PhyState,
        scheduler: &mut EventScheduler<NetworkEvent>,
        channel: &Channel,
        positions: &ConstantPositions,
        listeners: &mut Listeners,
    ) {
        let mut ctx = DeviceContext {
            device: self.id,
            labels: &self.labels,
            scheduler,
            channel,
            positions,
            listeners,
        };
        self.phy.set_state(state, &mut ctx);
    }

    /// Run one event addressed to this device.
    pub(crate) fn handle(
        &mut self,
        action: NetworkEvent,
        scheduler: &mut EventScheduler<NetworkEvent>,
        channel: &Channel,
        positions: &ConstantPositions,
        listeners: &mut Listeners,
    ) -> Result<(), NetworkError> {
        let Device {
            id,
            labels,
            phy,
            mac,
            ..
        } = self;
        let device = *id;
        let mut ctx = DeviceContext {
            device,
            labels: &*labels,
            scheduler,
            channel,
            positions,
            listeners,
        };
        let mac_err = |source: MacError| NetworkError::Mac { device, source };
        trace!(%device, event = action.name(), time = %ctx.now(), "device event");

        match action {
            NetworkEvent::DataRequest { params, packet } => {
                mac.enqueue(params, packet, &mut ctx).map_err(mac_err)?;
            }
            NetworkEvent::TxEnd => {
                phy.end_tx(&mut ctx);
                mac.on_tx_complete(&mut ctx).map_err(mac_err)?;
            }
            NetworkEvent::RxStart(signal) => {
                phy.start_rx(signal, &mut ctx)?;
                return Ok(());
            }
            NetworkEvent::RxEnd => {
                if let Some(signal) = phy.end_rx(&mut ctx) {
                    mac.on_frame(signal.frame, signal.rx_power_dbm, &mut ctx)
                        .map_err(mac_err)?;
                }
            }
            NetworkEvent::AckTimeout { dsn } => {
                mac.on_ack_timeout(dsn, &mut ctx);
            }
            NetworkEvent::ServiceQueue => {}
        }
        service_queue(phy, mac, &mut ctx)
    }
}

/// Start the MAC's next frame if the PHY is free.
fn service_queue(phy: &mut Phy, mac: &mut Mac, ctx: &mut DeviceContext<'_>) -> Result<(), NetworkError> {
    if !phy.state().can_transmit() {
        return Ok(());
    }
    if let Some(frame) = mac.next_frame(ctx.now()) {
        phy.transmit(frame, ctx)?;
    }
    Ok(())
}
