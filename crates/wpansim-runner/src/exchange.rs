//! Request/response exchange along a line of nodes.
//!
//! Every node other than node 0 sends one request to node 0, staggered by
//! `request_stagger_ms`; at `response_time_s` node 0 answers each of them.

use crate::RunnerError;
use serde::{Deserialize, Serialize};
use tracing::info;
use wpansim_common::{RunLimit, SimTime};
use wpansim_lrwpan::{Network, Packet, TxParams};
use wpansim_model::{build_exchange_network, ExchangeConfig, ExchangeTopology, SimulationConfig};

/// Per-node counters at the end of an exchange.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeReport {
    pub name: String,
    pub address: String,
    pub sent: u64,
    pub confirmed: u64,
    pub no_ack: u64,
    pub received: u64,
    pub rx_corrupted: u64,
    pub rx_dropped_busy: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExchangeReport {
    pub nodes: Vec<NodeReport>,
    pub events_executed: u64,
    pub end_time_s: f64,
}

impl ExchangeReport {
    pub fn total_confirmed(&self) -> u64 {
        self.nodes.iter().map(|n| n.confirmed).sum()
    }

    pub fn total_no_ack(&self) -> u64 {
        self.nodes.iter().map(|n| n.no_ack).sum()
    }

    pub fn total_received(&self) -> u64 {
        self.nodes.iter().map(|n| n.received).sum()
    }
}

#[derive(Debug)]
pub struct ExchangeScenario {
    exchange: ExchangeConfig,
    pan_id: u16,
    topology: ExchangeTopology,
}

impl ExchangeScenario {
    pub fn new(config: &SimulationConfig) -> Result<Self, RunnerError> {
        let mut topology = build_exchange_network(config)?;
        topology.network.on_data_indication(|device, indication, packet| {
            info!(
                %device,
                size = packet.size_bytes(),
                rx_power_dbm = indication.received_power_dbm,
                time = %indication.time,
                "received packet"
            );
        });
        topology.network.on_data_confirm(|device, confirm| {
            info!(
                %device,
                handle = confirm.msdu_handle,
                status = %confirm.status,
                time = %confirm.time,
                "data confirm"
            );
        });
        Ok(Self {
            exchange: config.exchange.clone(),
            pan_id: config.mac.pan_id,
            topology,
        })
    }

    pub fn network(&self) -> &Network {
        &self.topology.network
    }

    pub fn network_mut(&mut self) -> &mut Network {
        &mut self.topology.network
    }

    /// Schedule every request and response, run until the stop time and report.
    pub fn run(mut self) -> Result<ExchangeReport, RunnerError> {
        let exchange = &self.exchange;
        let network = &mut self.topology.network;
        let nodes = &self.topology.nodes;
        let Some((coordinator, others)) = nodes.split_first() else {
            return Ok(ExchangeReport {
                nodes: Vec::new(),
                events_executed: 0,
                end_time_s: 0.0,
            });
        };

        let request_time = SimTime::from_secs(exchange.request_time_s);
        let stagger_s = exchange.request_stagger_ms / 1000.0;
        let response_time = SimTime::from_secs(exchange.response_time_s);
        for (i, node) in others.iter().enumerate() {
            let handle = ((i + 1) % 256) as u8;
            let at = request_time.saturating_add(SimTime::from_secs(stagger_s * i as f64));
            network.schedule_data_request(
                at,
                node.id,
                TxParams::to(coordinator.address)
                    .with_pan_id(self.pan_id)
                    .with_handle(handle)
                    .with_ack(exchange.ack_requested),
                Packet::new(exchange.request_size_bytes),
            )?;
            network.schedule_data_request(
                response_time,
                coordinator.id,
                TxParams::to(node.address)
                    .with_pan_id(self.pan_id)
                    .with_handle(handle)
                    .with_ack(exchange.ack_requested),
                Packet::new(exchange.response_size_bytes),
            )?;
        }

        let summary = network.run(RunLimit::Until(SimTime::from_secs(exchange.stop_time_s)))?;

        let mut reports = Vec::with_capacity(nodes.len());
        for node in nodes {
            let device = network.device(node.id)?;
            let mac = device.mac().stats();
            let phy = device.phy().stats();
            reports.push(NodeReport {
                name: device.name().to_string(),
                address: node.address.to_string(),
                sent: mac.data_requests,
                confirmed: mac.confirms_success,
                no_ack: mac.confirms_no_ack,
                received: mac.indications,
                rx_corrupted: phy.rx_corrupted,
                rx_dropped_busy: phy.rx_dropped_busy,
            });
        }
        info!(
            nodes = reports.len(),
            events = summary.executed,
            end = %summary.end_time,
            "exchange complete"
        );
        Ok(ExchangeReport {
            nodes: reports,
            events_executed: summary.executed,
            end_time_s: summary.end_time.as_secs_f64(),
        })
    }
}
