//! Packet success rate versus distance.
//!
//! For every distance the controller moves each receiver, schedules
//! `max_packets_per_distance` trials per link `trial_interval_us` apart, drains
//! the queue and counts the indications that reached the intended receivers.

use crate::RunnerError;
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use tracing::{debug, info};
use wpansim_common::{DeviceId, SimTime};
use wpansim_lrwpan::{ConfirmStatus, Network, Packet, TxParams};
use wpansim_metrics::{metric_defs, metrics};
use wpansim_model::{build_sweep_network, LinkPair, SimulationConfig, SweepConfig, SweepTopology};

/// Success statistics for one distance.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DistanceSample {
    pub distance_m: f64,
    pub attempted: u64,
    pub received: u64,
    /// `received / attempted`, always within `[0, 1]`.
    pub success_rate: f64,
}

impl DistanceSample {
    /// Returns `None` when nothing was attempted.
    pub fn new(distance_m: f64, attempted: u64, received: u64) -> Option<Self> {
        if attempted == 0 {
            return None;
        }
        let received = received.min(attempted);
        Some(Self {
            distance_m,
            attempted,
            received,
            success_rate: received as f64 / attempted as f64,
        })
    }
}

#[derive(Debug, Default)]
struct SweepTally {
    indications: HashMap<DeviceId, u64>,
    confirmed: u64,
    no_ack: u64,
}

/// Drives a distance sweep over a [`SweepTopology`].
#[derive(Debug)]
pub struct SweepController {
    sweep: SweepConfig,
    pan_id: u16,
    topology: SweepTopology,
    tally: Rc<RefCell<SweepTally>>,
    samples: Vec<DistanceSample>,
}

impl SweepController {
    pub fn new(config: &SimulationConfig) -> Result<Self, RunnerError> {
        let mut topology = build_sweep_network(config)?;
        let tally = Rc::new(RefCell::new(SweepTally::default()));

        let counter = Rc::clone(&tally);
        topology.network.on_data_indication(move |device, _, _| {
            *counter.borrow_mut().indications.entry(device).or_default() += 1;
        });
        let counter = Rc::clone(&tally);
        topology.network.on_data_confirm(move |_, confirm| {
            let mut tally = counter.borrow_mut();
            match confirm.status {
                ConfirmStatus::Success => tally.confirmed += 1,
                ConfirmStatus::NoAck => tally.no_ack += 1,
            }
        });

        Ok(Self {
            sweep: config.sweep.clone(),
            pan_id: config.mac.pan_id,
            topology,
            tally,
            samples: Vec::new(),
        })
    }

    pub fn network(&self) -> &Network {
        &self.topology.network
    }

    /// Mutable access, e.g. to register extra listeners before running.
    pub fn network_mut(&mut self) -> &mut Network {
        &mut self.topology.network
    }

    pub fn links(&self) -> &[LinkPair] {
        &self.topology.links
    }

    /// Visit every configured distance in order.
    pub fn run(&mut self) -> Result<&[DistanceSample], RunnerError> {
        self.samples.clear();
        for distance_m in self.sweep.distances() {
            if let Some(sample) = self.run_distance(distance_m)? {
                self.samples.push(sample);
            }
        }
        Ok(&self.samples)
    }

    /// Place every link at `distance_m` and run one batch of trials.
    pub fn run_distance(&mut self, distance_m: f64) -> Result<Option<DistanceSample>, RunnerError> {
        let network = &mut self.topology.network;
        for link in &self.topology.links {
            let (tx, rx) = link.positions(distance_m);
            network.set_position(link.tx, tx)?;
            network.set_position(link.rx, rx)?;
        }
        *self.tally.borrow_mut() = SweepTally::default();

        let start = network.now();
        let interval = SimTime::from_micros(self.sweep.trial_interval_us);
        for trial in 0..self.sweep.max_packets_per_distance {
            let at = start.saturating_add(interval.saturating_mul(u64::from(trial)));
            for link in &self.topology.links {
                let params = TxParams::to(link.rx_address)
                    .with_pan_id(self.pan_id)
                    .with_handle((trial % 256) as u8)
                    .with_ack(self.sweep.ack_requested);
                let packet = Packet::new(self.sweep.packet_size_bytes).with_handle(u64::from(trial));
                network.schedule_data_request(at, link.tx, params, packet)?;
            }
        }
        let summary = network.run_until_empty()?;

        let attempted =
            u64::from(self.sweep.max_packets_per_distance) * self.topology.links.len() as u64;
        let tally = self.tally.borrow();
        let received: u64 = self
            .topology
            .links
            .iter()
            .map(|link| tally.indications.get(&link.rx).copied().unwrap_or(0))
            .sum();
        metrics::counter!(metric_defs::SWEEP_TRIALS.name).increment(attempted);

        let sample = DistanceSample::new(distance_m, attempted, received);
        match &sample {
            Some(sample) => {
                metrics::gauge!(
                    metric_defs::SWEEP_SUCCESS_RATE.name,
                    "distance_m" => format!("{distance_m}")
                )
                .set(sample.success_rate);
                info!(
                    distance_m,
                    attempted,
                    received = sample.received,
                    success_rate = sample.success_rate,
                    events = summary.executed,
                    "distance complete"
                );
            }
            None => debug!(distance_m, "no trials at this distance, sample omitted"),
        }
        if self.sweep.ack_requested {
            debug!(
                distance_m,
                confirmed = tally.confirmed,
                no_ack = tally.no_ack,
                "acknowledged trials"
            );
        }
        Ok(sample)
    }

    /// Samples of the last [`run`](Self::run), one per distance with trials.
    pub fn results(&self) -> &[DistanceSample] {
        &self.samples
    }

    pub fn into_results(self) -> Vec<DistanceSample> {
        self.samples
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_sample_omitted_without_attempts() {
        assert!(DistanceSample::new(10.0, 0, 0).is_none());
        let sample = DistanceSample::new(10.0, 4, 3).unwrap();
        assert_relative_eq!(sample.success_rate, 0.75);
    }

    #[test]
    fn test_zero_packets_yields_no_samples() {
        let mut config = SimulationConfig::default();
        config.sweep.max_packets_per_distance = 0;
        let mut controller = SweepController::new(&config).unwrap();
        assert!(controller.run().unwrap().is_empty());
    }

    #[test]
    fn test_receivers_moved_before_trials() {
        let mut config = SimulationConfig::default();
        config.sweep.max_packets_per_distance = 1;
        let mut controller = SweepController::new(&config).unwrap();
        controller.run_distance(42.0).unwrap();
        let link = controller.links()[0];
        assert_relative_eq!(
            controller.network().distance(link.tx, link.rx).unwrap(),
            42.0
        );
    }

    #[test]
    fn test_short_range_delivers_every_trial() {
        let mut config = SimulationConfig::default();
        config.sweep.max_packets_per_distance = 20;
        let mut controller = SweepController::new(&config).unwrap();
        let sample = controller.run_distance(1.0).unwrap().unwrap();
        assert_eq!(sample.attempted, 40);
        assert_eq!(sample.received, 40);
    }
}
