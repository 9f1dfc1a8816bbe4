//! # wpansim-lrwpan
//!
//! IEEE 802.15.4 devices for WPANSim: a half-duplex O-QPSK PHY, a shared
//! channel driven by a [`PropagationModel`](wpansim_link::PropagationModel),
//! and a MAC offering the MCPS-DATA service (request, confirm, indication)
//! with optional acknowledgements.
//!
//! A [`Network`] owns the scheduler, the channel and every [`Device`].
//! Callers add devices, register listeners, issue data requests and run:
//!
//! ```rust,ignore
//! let mut network = Network::new(Box::new(LogDistanceModel::default()), 1);
//! let a = network.add_device(DeviceConfig::new("a", DeviceAddresses::short(0, ShortAddress(1)), Vector3::default()))?;
//! let b = network.add_device(DeviceConfig::new("b", DeviceAddresses::short(0, ShortAddress(2)), Vector3::new(10.0, 0.0, 0.0)))?;
//! network.on_data_indication(|device, indication, packet| println!("{device} got {} bytes", packet.size_bytes()));
//! network.data_request(a, TxParams::to(ShortAddress(2)).with_ack(true), Packet::new(20))?;
//! network.run_until_empty()?;
//! ```

pub mod address;
pub mod channel;
pub mod constants;
mod device;
mod error;
mod event;
pub mod frame;
mod listener;
pub mod mac;
mod network;
pub mod packet;
pub mod phy;

pub use address::{Address, AddressMode, DeviceAddresses, ExtendedAddress, ShortAddress};
pub use channel::{Channel, Signal};
pub use device::Device;
pub use error::{AddressField, MacError, NetworkError, PhyError};
pub use event::NetworkEvent;
pub use frame::{max_msdu_octets, FrameType, MacFrame, MacHeader};
pub use listener::{Listeners, RxOutcome, StateTransition};
pub use mac::{
    ConfirmStatus, DataConfirm, DataIndication, Mac, MacConfig, MacState, MacStats, TxParams,
};
pub use network::{DeviceConfig, Network};
pub use packet::Packet;
pub use phy::{Phy, PhyState, PhyStats, DEFAULT_RX_SENSITIVITY_DBM, DEFAULT_TX_POWER_DBM};
