//! Plain construction functions from configuration to [`Network`].

use crate::{ModelError, SimulationConfig};
use tracing::info;
use wpansim_common::{DeviceId, Vector3};
use wpansim_lrwpan::{
    Address, AddressMode, DeviceAddresses, DeviceConfig, ExtendedAddress, Network, ShortAddress,
};

/// Addresses of the `index`-th device: short `index + 1` or extended `index + 1`.
pub fn device_addresses(
    mode: AddressMode,
    pan_id: u16,
    index: u32,
) -> Result<DeviceAddresses, ModelError> {
    let number = index + 1;
    match mode {
        AddressMode::Short => {
            let short = u16::try_from(number)
                .ok()
                .filter(|&n| n != ShortAddress::BROADCAST.0)
                .ok_or_else(|| {
                    ModelError::Invalid(format!("no short address left for device {index}"))
                })?;
            Ok(DeviceAddresses::short(pan_id, ShortAddress(short)))
        }
        AddressMode::Extended => Ok(DeviceAddresses::extended(
            pan_id,
            ExtendedAddress(u64::from(number)),
        )),
        AddressMode::NoAddress => Err(ModelError::Invalid(
            "devices need a short or extended address".to_string(),
        )),
    }
}

fn own_address(addresses: &DeviceAddresses, mode: AddressMode) -> Result<Address, ModelError> {
    addresses
        .for_mode(mode)
        .ok_or_else(|| ModelError::Invalid(format!("device has no {mode} address")))
}

/// One transmitter/receiver pair of a sweep.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinkPair {
    pub tx: DeviceId,
    pub rx: DeviceId,
    pub rx_address: Address,
    /// Offset of this pair from the swept axis.
    pub lateral_offset_m: f64,
}

impl LinkPair {
    /// Transmitter and receiver positions for a link of `distance_m`.
    pub fn positions(&self, distance_m: f64) -> (Vector3, Vector3) {
        (
            Vector3::new(0.0, self.lateral_offset_m, 0.0),
            Vector3::new(distance_m, self.lateral_offset_m, 0.0),
        )
    }
}

/// A network laid out for a distance sweep.
#[derive(Debug)]
pub struct SweepTopology {
    pub network: Network,
    pub links: Vec<LinkPair>,
}

/// Build `concurrent_links` transmitter/receiver pairs.
///
/// Pair `k` is placed `k * link_spacing_m` off the swept axis, with its
/// receiver at the first sweep distance.
pub fn build_sweep_network(config: &SimulationConfig) -> Result<SweepTopology, ModelError> {
    let sweep = &config.sweep;
    sweep.validate()?;
    let mut network = Network::new(config.propagation.build()?, config.seed);
    let mut links = Vec::new();

    for k in 0..sweep.concurrent_links {
        let lateral_offset_m = f64::from(k) * sweep.link_spacing_m;
        let mut ids = [DeviceId::new(0); 2];
        let mut rx_address = None;
        for (slot, role) in ["tx", "rx"].into_iter().enumerate() {
            let addresses = device_addresses(
                sweep.addressing_mode,
                config.mac.pan_id,
                2 * k + slot as u32,
            )?;
            if role == "rx" {
                rx_address = Some(own_address(&addresses, sweep.addressing_mode)?);
            }
            let x = if role == "rx" { sweep.min_distance_m } else { 0.0 };
            ids[slot] = network.add_device(
                DeviceConfig::new(
                    format!("link{k}-{role}"),
                    addresses,
                    Vector3::new(x, lateral_offset_m, 0.0),
                )
                .with_role(format!("sweep-{role}"))
                .with_tx_power(sweep.tx_power_dbm)
                .with_rx_sensitivity(sweep.rx_sensitivity_dbm)
                .with_error_policy(config.error_model)
                .with_mac_config(config.mac.mac_config()),
            )?;
        }
        let rx_address = rx_address
            .ok_or_else(|| ModelError::Invalid(format!("link {k} has no receiver address")))?;
        links.push(LinkPair {
            tx: ids[0],
            rx: ids[1],
            rx_address,
            lateral_offset_m,
        });
    }

    info!(
        links = links.len(),
        propagation = network.channel().propagation().name(),
        error_model = config.error_model.name(),
        "sweep network built"
    );
    Ok(SweepTopology { network, links })
}

/// A node of the exchange scenario.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExchangeNode {
    pub id: DeviceId,
    pub address: Address,
}

/// A line of nodes for the request/response exchange.
#[derive(Debug)]
pub struct ExchangeTopology {
    pub network: Network,
    /// Node 0 is the coordinator that answers every request.
    pub nodes: Vec<ExchangeNode>,
}

/// Build `node_count` nodes `spacing_m` apart along the x axis.
pub fn build_exchange_network(config: &SimulationConfig) -> Result<ExchangeTopology, ModelError> {
    let exchange = &config.exchange;
    exchange.validate()?;
    let mode = exchange.addressing_mode();
    let mut network = Network::new(config.propagation.build()?, config.seed);
    let mut nodes = Vec::new();

    for i in 0..exchange.node_count {
        let addresses = device_addresses(mode, config.mac.pan_id, i)?;
        let address = own_address(&addresses, mode)?;
        let role = if i == 0 { "coordinator" } else { "device" };
        let id = network.add_device(
            DeviceConfig::new(
                format!("node{i}"),
                addresses,
                Vector3::new(f64::from(i) * exchange.spacing_m, 0.0, 0.0),
            )
            .with_role(role)
            .with_tx_power(exchange.radio.tx_power_dbm)
            .with_rx_sensitivity(exchange.radio.rx_sensitivity_dbm)
            .with_error_policy(config.error_model)
            .with_mac_config(config.mac.mac_config()),
        )?;
        nodes.push(ExchangeNode { id, address });
    }

    info!(nodes = nodes.len(), %mode, "exchange network built");
    Ok(ExchangeTopology { network, nodes })
}
