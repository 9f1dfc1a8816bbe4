//! MAC frames and their on-air size.

use crate::address::{Address, AddressMode};
use crate::constants::{
    transmission_duration, ACK_FRAME_OCTETS, A_MAX_PHY_PACKET_SIZE, MAC_BASE_HEADER_OCTETS,
    MAC_FCS_OCTETS,
};
use crate::packet::Packet;
use serde::{Deserialize, Serialize};
use wpansim_common::SimTime;

/// Frame type field of the frame control.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FrameType {
    Data,
    Ack,
}

impl FrameType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FrameType::Data => "data",
            FrameType::Ack => "ack",
        }
    }
}

/// Largest MSDU a data frame can carry when both ends use `mode` on one PAN.
pub fn max_msdu_octets(mode: AddressMode) -> usize {
    let addressing = match mode {
        AddressMode::NoAddress => 0,
        mode => 2 + 2 * mode.address_octets(),
    };
    A_MAX_PHY_PACKET_SIZE - MAC_BASE_HEADER_OCTETS - addressing - MAC_FCS_OCTETS
}

/// Addressing fields of a data frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MacHeader {
    pub ack_request: bool,
    pub dsn: u8,
    pub dst_pan_id: Option<u16>,
    pub dst_address: Option<Address>,
    pub src_pan_id: Option<u16>,
    pub src_address: Option<Address>,
}

impl MacHeader {
    /// Both addresses present and on the same PAN: the source PAN is elided.
    pub fn pan_id_compression(&self) -> bool {
        self.dst_address.is_some() && self.src_address.is_some() && self.dst_pan_id == self.src_pan_id
    }

    /// Source PAN as seen by the receiver, restoring an elided field.
    pub fn effective_src_pan_id(&self) -> Option<u16> {
        if self.pan_id_compression() {
            self.dst_pan_id
        } else {
            self.src_pan_id
        }
    }

    /// Header length in octets, excluding the FCS.
    pub fn octets(&self) -> usize {
        let mut octets = MAC_BASE_HEADER_OCTETS;
        if let Some(dst) = &self.dst_address {
            octets += 2 + dst.mode().address_octets();
        }
        if let Some(src) = &self.src_address {
            if !self.pan_id_compression() {
                octets += 2;
            }
            octets += src.mode().address_octets();
        }
        octets
    }
}

/// A frame as it travels over the channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MacFrame {
    Data { header: MacHeader, msdu: Packet },
    Ack { dsn: u8 },
}

impl MacFrame {
    pub fn frame_type(&self) -> FrameType {
        match self {
            MacFrame::Data { .. } => FrameType::Data,
            MacFrame::Ack { .. } => FrameType::Ack,
        }
    }

    pub fn dsn(&self) -> u8 {
        match self {
            MacFrame::Data { header, .. } => header.dsn,
            MacFrame::Ack { dsn } => *dsn,
        }
    }

    /// PSDU length: header, payload and FCS.
    pub fn psdu_octets(&self) -> usize {
        match self {
            MacFrame::Data { header, msdu } => header.octets() + msdu.size_bytes() + MAC_FCS_OCTETS,
            MacFrame::Ack { .. } => ACK_FRAME_OCTETS,
        }
    }

    /// Time the frame occupies the air.
    pub fn airtime(&self) -> SimTime {
        transmission_duration(self.psdu_octets())
    }
}
