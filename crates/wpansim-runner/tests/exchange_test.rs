//! Request/response exchange integration tests.

use wpansim_lrwpan::{
    AddressField, AddressMode, MacError, Packet, PhyState, ShortAddress, TxParams,
};
use wpansim_runner::{ExchangeScenario, SimulationConfig};

// ============================================================================
// Acknowledged Exchange
// ============================================================================

#[test]
fn test_acknowledged_exchange_completes() {
    let config = SimulationConfig::default();
    let report = ExchangeScenario::new(&config)
        .expect("Failed to build exchange")
        .run()
        .expect("Exchange failed");

    assert_eq!(report.nodes.len(), 4);
    let coordinator = &report.nodes[0];
    assert_eq!(coordinator.name, "node0");
    assert_eq!(coordinator.address, "00:01");
    assert_eq!(coordinator.sent, 3);
    assert_eq!(coordinator.received, 3);
    for node in &report.nodes[1..] {
        assert_eq!(node.sent, 1, "{} should send one request", node.name);
        assert_eq!(node.received, 1, "{} should get one response", node.name);
        assert_eq!(node.no_ack, 0);
    }
    assert_eq!(report.total_confirmed(), 6);
    assert_eq!(report.total_no_ack(), 0);
    // The queue drains after the responses, well before the stop time.
    assert!(report.end_time_s > 2.0 && report.end_time_s < 5.0);
}

#[test]
fn test_extended_exchange() {
    let mut config = SimulationConfig::default();
    config.exchange.extended_addressing = true;
    config.exchange.node_count = 2;
    let report = ExchangeScenario::new(&config).unwrap().run().unwrap();
    assert_eq!(report.nodes[1].address, "00:00:00:00:00:00:00:02");
    assert_eq!(report.total_received(), 2);
    assert_eq!(report.total_confirmed(), 2);
}

#[test]
fn test_out_of_range_requests_time_out() {
    let mut config = SimulationConfig::default();
    config.exchange.node_count = 2;
    config.exchange.spacing_m = 10_000.0;
    let report = ExchangeScenario::new(&config).unwrap().run().unwrap();
    assert_eq!(report.total_received(), 0);
    assert_eq!(report.total_confirmed(), 0);
    assert_eq!(report.total_no_ack(), 2);
}

// ============================================================================
// Half-Duplex Collisions
// ============================================================================

#[test]
fn test_simultaneous_requests_collide() {
    let mut config = SimulationConfig::default();
    config.exchange.request_stagger_ms = 0.0;
    config.exchange.ack_requested = false;
    let report = ExchangeScenario::new(&config).unwrap().run().unwrap();

    // The coordinator locks onto the nearest request and drops the other two.
    let coordinator = &report.nodes[0];
    assert_eq!(coordinator.received, 1);
    assert_eq!(coordinator.rx_dropped_busy, 2);
    for node in &report.nodes[1..] {
        assert_eq!(node.received, 1);
    }
    // Without acknowledgements every request still confirms.
    assert_eq!(report.total_confirmed(), 6);
}

// ============================================================================
// Address Mode Validation
// ============================================================================

#[test]
fn test_extended_source_without_extended_address_rejected() {
    let config = SimulationConfig::default();
    let mut scenario = ExchangeScenario::new(&config).unwrap();
    let network = scenario.network_mut();
    let sender = network.devices()[1].id();

    let params = TxParams::to(ShortAddress(1)).with_src_mode(AddressMode::Extended);
    let err = network
        .data_request(sender, params, Packet::new(10))
        .unwrap_err();

    match err.as_mac() {
        Some(MacError::InvalidAddressMode { field, mode, .. }) => {
            assert_eq!(*field, AddressField::Source);
            assert_eq!(*mode, AddressMode::Extended);
        }
        other => panic!("expected InvalidAddressMode, got {other:?}"),
    }

    // Nothing reached the PHY.
    let device = network.device(sender).unwrap();
    assert_eq!(device.phy().stats().tx_frames, 0);
    assert_eq!(device.phy().state(), PhyState::RxOn);
    assert!(network.scheduler().is_empty());
}
