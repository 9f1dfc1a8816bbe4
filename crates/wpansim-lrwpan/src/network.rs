//! Device registry, dispatch loop and public primitives.

use crate::address::{Address, DeviceAddresses};
use crate::channel::Channel;
use crate::device::Device;
use crate::error::NetworkError;
use crate::event::NetworkEvent;
use crate::listener::{Listeners, RxOutcome, StateTransition};
use crate::mac::{DataConfirm, DataIndication, Mac, MacConfig, TxParams};
use crate::packet::Packet;
use crate::phy::{Phy, PhyState, DEFAULT_RX_SENSITIVITY_DBM, DEFAULT_TX_POWER_DBM};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::{debug, trace};
use wpansim_common::{
    ConstantPositions, DeviceId, Event, EventHandle, EventScheduler, PositionProvider, RunLimit,
    RunSummary, SimError, SimTime, Vector3,
};
use wpansim_link::{ErrorPolicy, PropagationModel};

/// Everything needed to add one device.
#[derive(Debug, Clone)]
pub struct DeviceConfig {
    pub name: String,
    pub role: String,
    pub addresses: DeviceAddresses,
    pub position: Vector3,
    pub tx_power_dbm: f64,
    pub rx_sensitivity_dbm: f64,
    pub error_policy: ErrorPolicy,
    pub mac: MacConfig,
}

impl DeviceConfig {
    pub fn new(name: impl Into<String>, addresses: DeviceAddresses, position: Vector3) -> Self {
        Self {
            name: name.into(),
            role: "device".to_string(),
            addresses,
            position,
            tx_power_dbm: DEFAULT_TX_POWER_DBM,
            rx_sensitivity_dbm: DEFAULT_RX_SENSITIVITY_DBM,
            error_policy: ErrorPolicy::default(),
            mac: MacConfig::default(),
        }
    }

    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.role = role.into();
        self
    }

    pub fn with_tx_power(mut self, tx_power_dbm: f64) -> Self {
        self.tx_power_dbm = tx_power_dbm;
        self
    }

    pub fn with_rx_sensitivity(mut self, rx_sensitivity_dbm: f64) -> Self {
        self.rx_sensitivity_dbm = rx_sensitivity_dbm;
        self
    }

    pub fn with_error_policy(mut self, error_policy: ErrorPolicy) -> Self {
        self.error_policy = error_policy;
        self
    }

    pub fn with_mac_config(mut self, mac: MacConfig) -> Self {
        self.mac = mac;
        self
    }
}

/// A set of devices sharing one channel and one scheduler.
#[derive(Debug)]
pub struct Network {
    scheduler: EventScheduler<NetworkEvent>,
    channel: Channel,
    positions: ConstantPositions,
    devices: Vec<Device>,
    listeners: Listeners,
    rng: ChaCha8Rng,
}

impl Network {
    /// An empty network. `seed` drives every random stream of the run.
    pub fn new(propagation: Box<dyn PropagationModel>, seed: u64) -> Self {
        Self {
            scheduler: EventScheduler::new(),
            channel: Channel::new(propagation),
            positions: ConstantPositions::new(),
            devices: Vec::new(),
            listeners: Listeners::default(),
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    /// Add a device and register it with the channel.
    ///
    /// Fails if one of its addresses is already taken. The device starts in
    /// `RX_ON` when `rx_on_when_idle` is set, otherwise in `TRX_OFF`.
    pub fn add_device(&mut self, config: DeviceConfig) -> Result<DeviceId, NetworkError> {
        for address in config.addresses.iter() {
            if self.find_device(&address).is_some() {
                return Err(NetworkError::DuplicateAddress(address));
            }
        }

        let id = DeviceId::new(self.devices.len() as u32);
        let error_model = config
            .error_policy
            .build(config.rx_sensitivity_dbm, self.rng.gen())?;
        let phy = Phy::new(config.tx_power_dbm, error_model);
        let mac = Mac::new(config.addresses, config.mac, self.rng.gen());
        debug!(
            device = %id,
            name = %config.name,
            short = ?config.addresses.short,
            extended = ?config.addresses.extended,
            error_model = config.error_policy.name(),
            "device added"
        );

        self.devices
            .push(Device::new(id, config.name, config.role, phy, mac));
        self.channel.register(id);
        self.positions.set_position(id, config.position);

        if config.mac.rx_on_when_idle {
            self.set_trx_state(id, PhyState::RxOn)?;
        }
        Ok(id)
    }

    pub fn devices(&self) -> &[Device] {
        &self.devices
    }

    pub fn device(&self, id: DeviceId) -> Result<&Device, NetworkError> {
        self.devices
            .get(id.index())
            .ok_or(NetworkError::UnknownDevice(id))
    }

    fn device_mut(&mut self, id: DeviceId) -> Result<&mut Device, NetworkError> {
        self.devices
            .get_mut(id.index())
            .ok_or(NetworkError::UnknownDevice(id))
    }

    /// The device answering to `address`, if any.
    pub fn find_device(&self, address: &Address) -> Option<DeviceId> {
        self.devices
            .iter()
            .find(|d| d.addresses().iter().any(|a| a == *address))
            .map(|d| d.id())
    }

    pub fn channel(&self) -> &Channel {
        &self.channel
    }

    pub fn now(&self) -> SimTime {
        self.scheduler.now()
    }

    pub fn scheduler(&self) -> &EventScheduler<NetworkEvent> {
        &self.scheduler
    }

    pub fn position(&self, id: DeviceId) -> Option<Vector3> {
        self.positions.position(id)
    }

    /// Move a device. Intended for use between runs.
    pub fn set_position(&mut self, id: DeviceId, position: Vector3) -> Result<(), NetworkError> {
        self.device(id)?;
        self.positions.set_position(id, position);
        Ok(())
    }

    /// Distance between two devices in meters.
    pub fn distance(&self, a: DeviceId, b: DeviceId) -> Result<f64, NetworkError> {
        let from = self.positions.require(a)?;
        let to = self.positions.require(b)?;
        Ok(from.distance_to(&to))
    }

    pub fn set_tx_power(&mut self, id: DeviceId, tx_power_dbm: f64) -> Result<(), NetworkError> {
        self.device_mut(id)?.phy.set_tx_power_dbm(tx_power_dbm);
        Ok(())
    }

    pub fn set_rx_sensitivity(
        &mut self,
        id: DeviceId,
        rx_sensitivity_dbm: f64,
    ) -> Result<(), NetworkError> {
        self.device_mut(id)?.phy.set_rx_sensitivity_dbm(rx_sensitivity_dbm);
        Ok(())
    }

    /// Switch an idle transceiver between `TRX_OFF` and `RX_ON`.
    ///
    /// Busy transceivers are left alone and reported as an error.
    pub fn set_trx_state(&mut self, id: DeviceId, state: PhyState) -> Result<(), NetworkError> {
        let Network {
            scheduler,
            channel,
            positions,
            devices,
            listeners,
            ..
        } = self;
        let device = devices
            .get_mut(id.index())
            .ok_or(NetworkError::UnknownDevice(id))?;
        let current = device.phy.state();
        if !current.can_transmit() || !state.can_transmit() {
            return Err(crate::error::PhyError::Busy(current).into());
        }
        device.set_idle_state(state, scheduler, channel, positions, listeners);
        Ok(())
    }

    // ========================================================================
    // Listeners
    // ========================================================================

    /// Observe every MCPS-DATA.confirm.
    pub fn on_data_confirm(&mut self, listener: impl FnMut(DeviceId, &DataConfirm) + 'static) {
        self.listeners.add_confirm(Box::new(listener));
    }

    /// Observe every MCPS-DATA.indication.
    pub fn on_data_indication(
        &mut self,
        listener: impl FnMut(DeviceId, &DataIndication, &Packet) + 'static,
    ) {
        self.listeners.add_indication(Box::new(listener));
    }

    /// Observe every transceiver state change.
    pub fn on_state_change(&mut self, listener: impl FnMut(&StateTransition) + 'static) {
        self.listeners.add_state_change(Box::new(listener));
    }

    /// Observe the error model's verdict on every frame a PHY locked onto.
    pub fn on_rx_outcome(&mut self, listener: impl FnMut(DeviceId, &RxOutcome) + 'static) {
        self.listeners.add_rx_outcome(Box::new(listener));
    }

    pub fn clear_listeners(&mut self) {
        self.listeners.clear();
    }

    // ========================================================================
    // Data service
    // ========================================================================

    /// Issue an MCPS-DATA.request now.
    ///
    /// Malformed requests are rejected before anything is queued. The frame
    /// goes on the air immediately if the device is idle.
    pub fn data_request(
        &mut self,
        id: DeviceId,
        params: TxParams,
        packet: Packet,
    ) -> Result<(), NetworkError> {
        self.validate_request(id, &params, &packet)?;
        let Network {
            scheduler,
            channel,
            positions,
            devices,
            listeners,
            ..
        } = self;
        let device = devices
            .get_mut(id.index())
            .ok_or(NetworkError::UnknownDevice(id))?;
        device.handle(
            NetworkEvent::DataRequest { params, packet },
            scheduler,
            channel,
            positions,
            listeners,
        )
    }

    /// Issue an MCPS-DATA.request at `time`.
    ///
    /// The request is validated now, so a malformed request fails here
    /// rather than when its event runs.
    pub fn schedule_data_request(
        &mut self,
        time: SimTime,
        id: DeviceId,
        params: TxParams,
        packet: Packet,
    ) -> Result<EventHandle, NetworkError> {
        self.validate_request(id, &params, &packet)?;
        let handle = self.scheduler.schedule(
            time,
            NetworkEvent::DataRequest { params, packet },
            Some(id),
        )?;
        trace!(device = %id, %time, "data request scheduled");
        Ok(handle)
    }

    fn validate_request(
        &self,
        id: DeviceId,
        params: &TxParams,
        packet: &Packet,
    ) -> Result<(), NetworkError> {
        self.device(id)?
            .mac
            .build_frame(params, packet.clone())
            .map(|_| ())
            .map_err(|source| NetworkError::Mac { device: id, source })
    }

    /// Cancel a pending event. Unknown or executed handles are ignored.
    pub fn cancel(&mut self, handle: EventHandle) -> bool {
        self.scheduler.cancel(handle)
    }

    // ========================================================================
    // Execution
    // ========================================================================

    /// Execute events until `limit`.
    ///
    /// Stops at the first engine fault. Link outcomes never stop a run.
    pub fn run(&mut self, limit: RunLimit) -> Result<RunSummary, NetworkError> {
        let Network {
            scheduler,
            channel,
            positions,
            devices,
            listeners,
            ..
        } = self;
        let summary = scheduler.run(
            limit,
            |scheduler: &mut EventScheduler<NetworkEvent>,
             event: Event<NetworkEvent>|
             -> Result<(), NetworkError> {
                let id = event
                    .context
                    .ok_or(NetworkError::MissingContext(event.handle.sequence()))?;
                let device = devices
                    .get_mut(id.index())
                    .ok_or(SimError::UnknownDevice(id))?;
                device.handle(event.action, scheduler, channel, positions, listeners)
            },
        )?;
        debug!(
            executed = summary.executed,
            end = %summary.end_time,
            stopped_early = summary.stopped_early,
            "run finished"
        );
        Ok(summary)
    }

    /// Run until the queue drains.
    pub fn run_until_empty(&mut self) -> Result<RunSummary, NetworkError> {
        self.run(RunLimit::UntilEmpty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::address::ShortAddress;
    use crate::error::MacError;
    use crate::mac::{ConfirmStatus, MacState};
    use crate::AddressMode;
    use std::cell::RefCell;
    use std::rc::Rc;
    use wpansim_link::LogDistanceModel;

    type Log<T> = Rc<RefCell<Vec<T>>>;

    fn network() -> Network {
        Network::new(Box::new(LogDistanceModel::default()), 7)
    }

    fn add(network: &mut Network, short: u16, x: f64) -> DeviceId {
        network
            .add_device(DeviceConfig::new(
                format!("dev{short}"),
                DeviceAddresses::short(0, ShortAddress(short)),
                Vector3::new(x, 0.0, 0.0),
            ))
            .unwrap()
    }

    fn record_confirms(network: &mut Network) -> Log<(DeviceId, DataConfirm)> {
        let log: Log<(DeviceId, DataConfirm)> = Rc::default();
        let sink = Rc::clone(&log);
        network.on_data_confirm(move |device, confirm| sink.borrow_mut().push((device, *confirm)));
        log
    }

    fn record_indications(network: &mut Network) -> Log<(DeviceId, DataIndication, Packet)> {
        let log: Log<(DeviceId, DataIndication, Packet)> = Rc::default();
        let sink = Rc::clone(&log);
        network.on_data_indication(move |device, indication, packet| {
            sink.borrow_mut().push((device, *indication, packet.clone()))
        });
        log
    }

    #[test]
    fn test_acknowledged_exchange() {
        let mut network = network();
        let a = add(&mut network, 1, 0.0);
        let b = add(&mut network, 2, 10.0);
        let confirms = record_confirms(&mut network);
        let indications = record_indications(&mut network);

        network
            .data_request(
                a,
                TxParams::to(ShortAddress(2)).with_ack(true).with_handle(9),
                Packet::new(20),
            )
            .unwrap();
        assert_eq!(network.device(a).unwrap().phy().state(), PhyState::BusyTx);
        network.run_until_empty().unwrap();

        let confirms = confirms.borrow();
        assert_eq!(confirms.len(), 1);
        assert_eq!(confirms[0].0, a);
        assert_eq!(confirms[0].1.status, ConfirmStatus::Success);
        assert_eq!(confirms[0].1.msdu_handle, 9);
        // Data 1184 us + turnaround 192 us + ACK 352 us, plus flight time.
        assert!(confirms[0].1.time < SimTime::from_micros(1_729));
        assert!(confirms[0].1.time > SimTime::from_micros(1_728));

        let indications = indications.borrow();
        assert_eq!(indications.len(), 1);
        let (device, indication, packet) = &indications[0];
        assert_eq!(*device, b);
        assert_eq!(packet.size_bytes(), 20);
        assert_eq!(indication.src_address, Some(ShortAddress(1).into()));
        assert_eq!(indication.src_addr_mode, AddressMode::Short);
        assert_eq!(indication.src_pan_id, Some(0));

        assert_eq!(network.device(b).unwrap().mac().stats().acks_sent, 1);
        assert_eq!(network.device(a).unwrap().mac().state(), MacState::Idle);
        // The timeout was cancelled rather than executed.
        assert_eq!(network.scheduler().cancelled_events(), 1);
    }

    #[test]
    fn test_unreachable_destination_times_out() {
        let mut network = network();
        let a = add(&mut network, 1, 0.0);
        let b = add(&mut network, 2, 10_000.0);
        let confirms = record_confirms(&mut network);
        let indications = record_indications(&mut network);

        network
            .data_request(a, TxParams::to(ShortAddress(2)).with_ack(true), Packet::new(20))
            .unwrap();
        network.run_until_empty().unwrap();

        let confirms = confirms.borrow();
        assert_eq!(confirms.len(), 1);
        assert_eq!(confirms[0].1.status, ConfirmStatus::NoAck);
        assert_eq!(confirms[0].1.time, SimTime::from_micros(1_184 + 864));
        assert!(indications.borrow().is_empty());
        assert_eq!(network.device(b).unwrap().phy().stats().rx_corrupted, 1);
    }

    #[test]
    fn test_missing_destination_times_out() {
        let mut network = network();
        let a = add(&mut network, 1, 0.0);
        let confirms = record_confirms(&mut network);
        network
            .data_request(a, TxParams::to(ShortAddress(5)).with_ack(true), Packet::new(5))
            .unwrap();
        network.run_until_empty().unwrap();
        assert_eq!(confirms.borrow()[0].1.status, ConfirmStatus::NoAck);
    }

    #[test]
    fn test_state_transitions_of_sender() {
        let mut network = network();
        let a = add(&mut network, 1, 0.0);
        add(&mut network, 2, 10.0);
        let transitions: Log<(PhyState, PhyState)> = Rc::default();
        let sink = Rc::clone(&transitions);
        network.on_state_change(move |t| {
            if t.device == a {
                sink.borrow_mut().push((t.old, t.new));
            }
        });

        network
            .data_request(a, TxParams::to(ShortAddress(2)).with_ack(true), Packet::new(10))
            .unwrap();
        network.run_until_empty().unwrap();

        use PhyState::*;
        assert_eq!(
            *transitions.borrow(),
            vec![
                (RxOn, TxOn),
                (TxOn, BusyTx),
                (BusyTx, TxOn),
                (TxOn, RxOn),
                (RxOn, BusyRx),
                (BusyRx, RxOn),
            ]
        );
    }

    #[test]
    fn test_half_duplex_drops_while_transmitting() {
        let mut network = network();
        let a = add(&mut network, 1, 0.0);
        let b = add(&mut network, 2, 10.0);
        let indications = record_indications(&mut network);

        network
            .data_request(a, TxParams::to(ShortAddress(2)), Packet::new(10))
            .unwrap();
        network
            .data_request(b, TxParams::to(ShortAddress(1)), Packet::new(10))
            .unwrap();
        network.run_until_empty().unwrap();

        assert!(indications.borrow().is_empty());
        for id in [a, b] {
            let stats = network.device(id).unwrap().phy().stats();
            assert_eq!(stats.rx_dropped_busy, 1);
            assert_eq!(stats.tx_frames, 1);
        }
    }

    #[test]
    fn test_simultaneous_arrivals_capture_strongest() {
        let mut network = network();
        let receiver = add(&mut network, 3, 0.0);
        let weak = add(&mut network, 1, 50.0);
        let strong = add(&mut network, 2, -50.0);
        network.set_tx_power(strong, 10.0).unwrap();
        let indications = record_indications(&mut network);

        // Equal flight times, and the weaker frame is scheduled first.
        network
            .data_request(weak, TxParams::to(ShortAddress(3)), Packet::new(10))
            .unwrap();
        network
            .data_request(strong, TxParams::to(ShortAddress(3)), Packet::new(12))
            .unwrap();
        network.run_until_empty().unwrap();

        let indications = indications.borrow();
        assert_eq!(indications.len(), 1);
        let (device, indication, packet) = &indications[0];
        assert_eq!(*device, receiver);
        assert_eq!(indication.src_address, Some(ShortAddress(2).into()));
        assert_eq!(packet.size_bytes(), 12);

        let stats = network.device(receiver).unwrap().phy().stats();
        assert_eq!(stats.rx_ok, 1);
        assert_eq!(stats.rx_dropped_busy, 1);
        assert_eq!(network.device(receiver).unwrap().phy().state(), PhyState::RxOn);
    }

    #[test]
    fn test_requests_queue_in_order() {
        let mut network = network();
        let a = add(&mut network, 1, 0.0);
        let b = add(&mut network, 2, 10.0);
        let confirms = record_confirms(&mut network);
        let indications = record_indications(&mut network);

        for handle in 1..=3u8 {
            network
                .data_request(
                    a,
                    TxParams::to(ShortAddress(2)).with_handle(handle),
                    Packet::new(8).with_handle(handle as u64),
                )
                .unwrap();
        }
        assert_eq!(network.device(a).unwrap().mac().queue_len(), 2);
        network.run_until_empty().unwrap();

        let handles: Vec<u8> = confirms.borrow().iter().map(|(_, c)| c.msdu_handle).collect();
        assert_eq!(handles, vec![1, 2, 3]);
        let received: Vec<u64> = indications
            .borrow()
            .iter()
            .filter(|(device, _, _)| *device == b)
            .map(|(_, _, p)| p.handle)
            .collect();
        assert_eq!(received, vec![1, 2, 3]);

        let dsns: Vec<u8> = indications.borrow().iter().map(|(_, i, _)| i.dsn).collect();
        assert_eq!(dsns[1], dsns[0].wrapping_add(1));
        assert_eq!(dsns[2], dsns[1].wrapping_add(1));
    }

    #[test]
    fn test_filtering_and_broadcast() {
        let mut network = network();
        let a = add(&mut network, 1, 0.0);
        let b = add(&mut network, 2, 10.0);
        let c = add(&mut network, 3, 0.0);
        let confirms = record_confirms(&mut network);
        let indications = record_indications(&mut network);

        network
            .data_request(a, TxParams::to(ShortAddress(2)), Packet::new(4))
            .unwrap();
        network.run_until_empty().unwrap();
        assert_eq!(indications.borrow().len(), 1);
        assert_eq!(network.device(c).unwrap().mac().stats().filtered, 1);

        network
            .data_request(
                a,
                TxParams::to(ShortAddress::BROADCAST).with_ack(true),
                Packet::new(4),
            )
            .unwrap();
        network.run_until_empty().unwrap();

        let receivers: Vec<DeviceId> = indications.borrow()[1..].iter().map(|(d, _, _)| *d).collect();
        assert_eq!(receivers, vec![c, b]);
        assert_eq!(confirms.borrow().len(), 2);
        assert_eq!(confirms.borrow()[1].1.status, ConfirmStatus::Success);
        assert_eq!(network.device(b).unwrap().mac().stats().acks_sent, 0);
    }

    #[test]
    fn test_rx_outcomes_reported() {
        let mut network = network();
        let a = add(&mut network, 1, 0.0);
        add(&mut network, 2, 10.0);
        add(&mut network, 3, 10_000.0);
        let outcomes: Log<(DeviceId, RxOutcome)> = Rc::default();
        let sink = Rc::clone(&outcomes);
        network.on_rx_outcome(move |device, outcome| sink.borrow_mut().push((device, *outcome)));

        network
            .data_request(a, TxParams::to(ShortAddress(2)), Packet::new(4))
            .unwrap();
        network.run_until_empty().unwrap();

        let outcomes = outcomes.borrow();
        assert_eq!(outcomes.len(), 2);
        assert!(outcomes.iter().all(|(_, o)| o.sender == a));
        assert!(outcomes[0].1.success);
        assert!(!outcomes[1].1.success);
        assert!(outcomes[1].1.received_power_dbm < DEFAULT_RX_SENSITIVITY_DBM);
    }

    #[test]
    fn test_invalid_scheduled_request_fails_eagerly() {
        let mut network = network();
        let a = add(&mut network, 1, 0.0);
        let err = network
            .schedule_data_request(
                SimTime::from_millis(5),
                a,
                TxParams::to(ShortAddress(2)).with_src_mode(AddressMode::Extended),
                Packet::new(7),
            )
            .unwrap_err();
        assert!(matches!(
            err.as_mac(),
            Some(MacError::InvalidAddressMode { .. })
        ));
        assert!(network.scheduler().is_empty());
        assert_eq!(network.device(a).unwrap().phy().stats().tx_frames, 0);
    }

    #[test]
    fn test_scheduled_request_in_the_past() {
        let mut network = network();
        let a = add(&mut network, 1, 0.0);
        add(&mut network, 2, 10.0);
        network
            .schedule_data_request(
                SimTime::from_millis(2),
                a,
                TxParams::to(ShortAddress(2)),
                Packet::new(7),
            )
            .unwrap();
        network.run_until_empty().unwrap();
        let err = network
            .schedule_data_request(
                SimTime::from_millis(1),
                a,
                TxParams::to(ShortAddress(2)),
                Packet::new(7),
            )
            .unwrap_err();
        assert!(matches!(
            err,
            NetworkError::Sim(SimError::CausalityViolation { .. })
        ));
    }

    #[test]
    fn test_duplicate_address_rejected() {
        let mut network = network();
        add(&mut network, 1, 0.0);
        let err = network
            .add_device(DeviceConfig::new(
                "again",
                DeviceAddresses::short(0, ShortAddress(1)),
                Vector3::default(),
            ))
            .unwrap_err();
        assert!(matches!(err, NetworkError::DuplicateAddress(Address::Short(ShortAddress(1)))));
        assert_eq!(network.devices().len(), 1);
    }

    #[test]
    fn test_trx_off_device_cannot_receive() {
        let mut network = network();
        let a = add(&mut network, 1, 0.0);
        let sleeper = network
            .add_device(
                DeviceConfig::new(
                    "sleeper",
                    DeviceAddresses::short(0, ShortAddress(2)),
                    Vector3::new(10.0, 0.0, 0.0),
                )
                .with_mac_config(MacConfig {
                    rx_on_when_idle: false,
                    ..MacConfig::default()
                }),
            )
            .unwrap();
        assert_eq!(network.device(sleeper).unwrap().phy().state(), PhyState::TrxOff);

        network
            .data_request(a, TxParams::to(ShortAddress(2)), Packet::new(4))
            .unwrap();
        network.run_until_empty().unwrap();
        assert_eq!(network.device(sleeper).unwrap().phy().stats().rx_dropped_busy, 1);

        network.set_trx_state(sleeper, PhyState::RxOn).unwrap();
        network
            .data_request(a, TxParams::to(ShortAddress(2)), Packet::new(4))
            .unwrap();
        network.run_until_empty().unwrap();
        assert_eq!(network.device(sleeper).unwrap().mac().stats().indications, 1);
    }

    #[test]
    fn test_repositioning_between_runs() {
        let mut network = network();
        let a = add(&mut network, 1, 0.0);
        let b = add(&mut network, 2, 10_000.0);
        assert!(network.distance(a, b).unwrap() > 9_999.0);

        network.set_position(b, Vector3::new(5.0, 0.0, 0.0)).unwrap();
        network
            .data_request(a, TxParams::to(ShortAddress(2)), Packet::new(4))
            .unwrap();
        network.run_until_empty().unwrap();
        assert_eq!(network.device(b).unwrap().mac().stats().indications, 1);
        assert!(network.set_position(DeviceId::new(9), Vector3::default()).is_err());
    }

    #[test]
    fn test_same_seed_same_sequence_numbers() {
        let dsn = |seed| {
            let mut network = Network::new(Box::new(LogDistanceModel::default()), seed);
            let id = add(&mut network, 1, 0.0);
            network.device(id).unwrap().mac().next_dsn()
        };
        assert_eq!(dsn(42), dsn(42));
    }
}
