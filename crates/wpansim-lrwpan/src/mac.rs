//! Link layer: MCPS-DATA request, confirm and indication.
//!
//! The MAC validates a request, frames it and queues it FIFO. The head of
//! the queue is handed to the PHY whenever the PHY can transmit and no
//! earlier frame is outstanding. With an acknowledgement requested, the MAC
//! waits `macAckWaitDuration` after the frame ends and confirms `NoAck` if
//! no matching ACK arrived. There is no channel access backoff and no
//! retransmission.

use crate::address::{Address, AddressMode, DeviceAddresses};
use crate::constants::{symbols, A_MAX_PHY_PACKET_SIZE, A_TURNAROUND_TIME_SYMBOLS, MAC_ACK_WAIT_SYMBOLS};
use crate::error::{AddressField, MacError};
use crate::event::{DeviceContext, NetworkEvent};
use crate::frame::{MacFrame, MacHeader};
use crate::packet::Packet;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;
use tracing::debug;
use wpansim_common::{EventHandle, SimTime};
use wpansim_metrics::{metric_defs, metrics};

/// Parameters of an MCPS-DATA.request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxParams {
    pub src_addr_mode: AddressMode,
    pub dst_addr_mode: AddressMode,
    pub dst_pan_id: u16,
    pub dst_address: Option<Address>,
    pub msdu_handle: u8,
    pub ack_requested: bool,
}

impl TxParams {
    /// Send to `dst` using the same addressing mode for both ends.
    pub fn to(dst: impl Into<Address>) -> Self {
        let dst = dst.into();
        Self {
            src_addr_mode: dst.mode(),
            dst_addr_mode: dst.mode(),
            dst_pan_id: 0,
            dst_address: Some(dst),
            msdu_handle: 0,
            ack_requested: false,
        }
    }

    pub fn with_src_mode(mut self, mode: AddressMode) -> Self {
        self.src_addr_mode = mode;
        self
    }

    pub fn with_pan_id(mut self, pan_id: u16) -> Self {
        self.dst_pan_id = pan_id;
        self
    }

    pub fn with_handle(mut self, msdu_handle: u8) -> Self {
        self.msdu_handle = msdu_handle;
        self
    }

    pub fn with_ack(mut self, ack_requested: bool) -> Self {
        self.ack_requested = ack_requested;
        self
    }
}

/// MCPS-DATA.confirm status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConfirmStatus {
    Success,
    NoAck,
}

impl ConfirmStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConfirmStatus::Success => "SUCCESS",
            ConfirmStatus::NoAck => "NO_ACK",
        }
    }
}

impl fmt::Display for ConfirmStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// MCPS-DATA.confirm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataConfirm {
    pub msdu_handle: u8,
    pub status: ConfirmStatus,
    pub time: SimTime,
}

/// MCPS-DATA.indication without the payload.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DataIndication {
    pub src_addr_mode: AddressMode,
    pub src_pan_id: Option<u16>,
    pub src_address: Option<Address>,
    pub dst_addr_mode: AddressMode,
    pub dst_pan_id: Option<u16>,
    pub dst_address: Option<Address>,
    pub dsn: u8,
    pub received_power_dbm: f64,
    pub time: SimTime,
}

/// MAC timing and receiver behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MacConfig {
    /// macAckWaitDuration in symbols.
    pub ack_wait_symbols: u64,
    /// Delay before an ACK is sent, in symbols.
    pub turnaround_symbols: u64,
    /// Keep the receiver on between transmissions.
    pub rx_on_when_idle: bool,
}

impl Default for MacConfig {
    fn default() -> Self {
        Self {
            ack_wait_symbols: MAC_ACK_WAIT_SYMBOLS,
            turnaround_symbols: A_TURNAROUND_TIME_SYMBOLS,
            rx_on_when_idle: true,
        }
    }
}

impl MacConfig {
    pub fn ack_wait(&self) -> SimTime {
        symbols(self.ack_wait_symbols)
    }

    pub fn turnaround(&self) -> SimTime {
        symbols(self.turnaround_symbols)
    }
}

/// What the MAC is doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MacState {
    Idle,
    Transmitting,
    AwaitingAck,
}

/// Per-device MAC counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MacStats {
    pub data_requests: u64,
    pub confirms_success: u64,
    pub confirms_no_ack: u64,
    pub indications: u64,
    pub acks_sent: u64,
    pub filtered: u64,
}

#[derive(Debug)]
struct QueuedFrame {
    msdu_handle: u8,
    frame: MacFrame,
}

#[derive(Debug)]
enum InFlight {
    Data {
        msdu_handle: u8,
        dsn: u8,
        ack_request: bool,
    },
    Ack,
}

#[derive(Debug)]
struct AckWait {
    msdu_handle: u8,
    dsn: u8,
    timeout: EventHandle,
}

#[derive(Debug)]
struct PendingAck {
    dsn: u8,
    ready_at: SimTime,
}

/// The MAC of one device.
#[derive(Debug)]
pub struct Mac {
    addresses: DeviceAddresses,
    config: MacConfig,
    dsn: u8,
    queue: VecDeque<QueuedFrame>,
    in_flight: Option<InFlight>,
    awaiting_ack: Option<AckWait>,
    pending_ack: Option<PendingAck>,
    stats: MacStats,
}

impl Mac {
    pub fn new(addresses: DeviceAddresses, config: MacConfig, initial_dsn: u8) -> Self {
        Self {
            addresses,
            config,
            dsn: initial_dsn,
            queue: VecDeque::new(),
            in_flight: None,
            awaiting_ack: None,
            pending_ack: None,
            stats: MacStats::default(),
        }
    }

    pub fn addresses(&self) -> &DeviceAddresses {
        &self.addresses
    }

    pub fn config(&self) -> &MacConfig {
        &self.config
    }

    /// Sequence number the next data frame will carry.
    pub fn next_dsn(&self) -> u8 {
        self.dsn
    }

    pub fn stats(&self) -> &MacStats {
        &self.stats
    }

    pub fn queue_len(&self) -> usize {
        self.queue.len()
    }

    pub fn state(&self) -> MacState {
        if self.in_flight.is_some() {
            MacState::Transmitting
        } else if self.awaiting_ack.is_some() {
            MacState::AwaitingAck
        } else {
            MacState::Idle
        }
    }

    /// Check `params` against this device's addresses and frame `packet`.
    ///
    /// The frame carries the current sequence number; nothing is queued.
    pub fn build_frame(&self, params: &TxParams, packet: Packet) -> Result<MacFrame, MacError> {
        if params.src_addr_mode == AddressMode::NoAddress
            && params.dst_addr_mode == AddressMode::NoAddress
        {
            return Err(MacError::InvalidAddressMode {
                field: AddressField::Source,
                mode: AddressMode::NoAddress,
                reason: "a frame needs at least one address",
            });
        }

        let src_address = match params.src_addr_mode {
            AddressMode::NoAddress => None,
            mode => Some(self.addresses.for_mode(mode).ok_or(MacError::InvalidAddressMode {
                field: AddressField::Source,
                mode,
                reason: "the device has no address of that kind",
            })?),
        };

        let dst_address = match (params.dst_addr_mode, params.dst_address) {
            (AddressMode::NoAddress, None) => None,
            (AddressMode::NoAddress, Some(_)) => {
                return Err(MacError::InvalidAddressMode {
                    field: AddressField::Destination,
                    mode: AddressMode::NoAddress,
                    reason: "an address was supplied",
                })
            }
            (mode, None) => {
                return Err(MacError::InvalidAddressMode {
                    field: AddressField::Destination,
                    mode,
                    reason: "no address was supplied",
                })
            }
            (mode, Some(address)) if address.mode() != mode => {
                return Err(MacError::InvalidAddressMode {
                    field: AddressField::Destination,
                    mode,
                    reason: "the supplied address has a different width",
                })
            }
            (_, Some(address)) => Some(address),
        };

        let broadcast = dst_address.map_or(false, |a| a.is_broadcast());
        let header = MacHeader {
            ack_request: params.ack_requested && dst_address.is_some() && !broadcast,
            dsn: self.dsn,
            dst_pan_id: dst_address.map(|_| params.dst_pan_id),
            dst_address,
            src_pan_id: src_address.map(|_| self.addresses.pan_id),
            src_address,
        };
        let frame = MacFrame::Data {
            header,
            msdu: packet,
        };
        let psdu_bytes = frame.psdu_octets();
        if psdu_bytes > A_MAX_PHY_PACKET_SIZE {
            return Err(MacError::FrameTooLong {
                psdu_bytes,
                max: A_MAX_PHY_PACKET_SIZE,
            });
        }
        Ok(frame)
    }

    /// Frame and queue a data request.
    pub(crate) fn enqueue(
        &mut self,
        params: TxParams,
        packet: Packet,
        ctx: &mut DeviceContext<'_>,
    ) -> Result<(), MacError> {
        let frame = self.build_frame(&params, packet)?;
        self.dsn = self.dsn.wrapping_add(1);
        self.stats.data_requests += 1;
        debug!(
            device = %ctx.device,
            dsn = frame.dsn(),
            handle = params.msdu_handle,
            ack = params.ack_requested,
            queued = self.queue.len(),
            "data request"
        );
        self.queue.push_back(QueuedFrame {
            msdu_handle: params.msdu_handle,
            frame,
        });
        let labels = ctx.labels.to_labels();
        metrics::counter!(metric_defs::MAC_DATA_REQUESTS.name, &labels).increment(1);
        metrics::gauge!(metric_defs::MAC_QUEUE_DEPTH.name, &labels).set(self.queue.len() as f64);
        Ok(())
    }

    /// The next frame to hand to the PHY, if one may start at `now`.
    ///
    /// A pending ACK goes first once the turnaround has elapsed. Data waits
    /// while a frame is on the air, an ACK is owed or an ACK is awaited.
    pub(crate) fn next_frame(&mut self, now: SimTime) -> Option<MacFrame> {
        if self.in_flight.is_some() {
            return None;
        }
        if let Some(pending) = &self.pending_ack {
            if now < pending.ready_at {
                return None;
            }
            let dsn = pending.dsn;
            self.pending_ack = None;
            self.in_flight = Some(InFlight::Ack);
            return Some(MacFrame::Ack { dsn });
        }
        if self.awaiting_ack.is_some() {
            return None;
        }
        let queued = self.queue.pop_front()?;
        let ack_request = matches!(&queued.frame, MacFrame::Data { header, .. } if header.ack_request);
        self.in_flight = Some(InFlight::Data {
            msdu_handle: queued.msdu_handle,
            dsn: queued.frame.dsn(),
            ack_request,
        });
        Some(queued.frame)
    }

    /// The PHY finished sending the in-flight frame.
    pub(crate) fn on_tx_complete(&mut self, ctx: &mut DeviceContext<'_>) -> Result<(), MacError> {
        match self.in_flight.take() {
            None => {}
            Some(InFlight::Ack) => {
                self.stats.acks_sent += 1;
                metrics::counter!(metric_defs::MAC_ACKS_SENT.name, &ctx.labels.to_labels())
                    .increment(1);
            }
            Some(InFlight::Data {
                msdu_handle,
                dsn,
                ack_request: true,
            }) => {
                let timeout = ctx.schedule_in(self.config.ack_wait(), NetworkEvent::AckTimeout { dsn })?;
                debug!(device = %ctx.device, dsn, "awaiting ack");
                self.awaiting_ack = Some(AckWait {
                    msdu_handle,
                    dsn,
                    timeout,
                });
            }
            Some(InFlight::Data { msdu_handle, .. }) => {
                self.confirm(msdu_handle, ConfirmStatus::Success, ctx);
            }
        }
        metrics::gauge!(metric_defs::MAC_QUEUE_DEPTH.name, &ctx.labels.to_labels())
            .set(self.queue.len() as f64);
        Ok(())
    }

    /// A frame passed the PHY's error model.
    pub(crate) fn on_frame(
        &mut self,
        frame: MacFrame,
        received_power_dbm: f64,
        ctx: &mut DeviceContext<'_>,
    ) -> Result<(), MacError> {
        match frame {
            MacFrame::Ack { dsn } => {
                match &self.awaiting_ack {
                    Some(wait) if wait.dsn == dsn => {
                        let cancelled = ctx.cancel(wait.timeout);
                        debug!(device = %ctx.device, dsn, cancelled, "ack matched");
                        let msdu_handle = wait.msdu_handle;
                        self.awaiting_ack = None;
                        self.confirm(msdu_handle, ConfirmStatus::Success, ctx);
                    }
                    _ => debug!(device = %ctx.device, dsn, "unexpected ack ignored"),
                }
                Ok(())
            }
            MacFrame::Data { header, msdu } => {
                if !self.accepts(&header) {
                    self.stats.filtered += 1;
                    metrics::counter!(metric_defs::MAC_FILTERED.name, &ctx.labels.to_labels())
                        .increment(1);
                    debug!(device = %ctx.device, dst = ?header.dst_address, "frame filtered");
                    return Ok(());
                }
                let indication = DataIndication {
                    src_addr_mode: header.src_address.map_or(AddressMode::NoAddress, |a| a.mode()),
                    src_pan_id: header.effective_src_pan_id(),
                    src_address: header.src_address,
                    dst_addr_mode: header.dst_address.map_or(AddressMode::NoAddress, |a| a.mode()),
                    dst_pan_id: header.dst_pan_id,
                    dst_address: header.dst_address,
                    dsn: header.dsn,
                    received_power_dbm,
                    time: ctx.now(),
                };
                self.stats.indications += 1;
                metrics::counter!(metric_defs::MAC_INDICATIONS.name, &ctx.labels.to_labels())
                    .increment(1);
                ctx.listeners.emit_indication(ctx.device, &indication, &msdu);

                if header.ack_request {
                    let turnaround = self.config.turnaround();
                    self.pending_ack = Some(PendingAck {
                        dsn: header.dsn,
                        ready_at: ctx.now() + turnaround,
                    });
                    ctx.schedule_in(turnaround, NetworkEvent::ServiceQueue)?;
                }
                Ok(())
            }
        }
    }

    /// The acknowledgement window for `dsn` closed.
    pub(crate) fn on_ack_timeout(&mut self, dsn: u8, ctx: &mut DeviceContext<'_>) {
        match &self.awaiting_ack {
            Some(wait) if wait.dsn == dsn => {
                debug!(device = %ctx.device, dsn, "ack timeout");
                let msdu_handle = wait.msdu_handle;
                self.awaiting_ack = None;
                self.confirm(msdu_handle, ConfirmStatus::NoAck, ctx);
            }
            _ => {}
        }
    }

    /// Whether a data frame is addressed to this device.
    pub fn accepts(&self, header: &MacHeader) -> bool {
        let Some(dst) = &header.dst_address else {
            return true;
        };
        let pan_ok = header
            .dst_pan_id
            .map_or(true, |pan| pan == self.addresses.pan_id || pan == crate::constants::BROADCAST_PAN_ID);
        pan_ok && self.addresses.matches(dst)
    }

    fn confirm(&mut self, msdu_handle: u8, status: ConfirmStatus, ctx: &mut DeviceContext<'_>) {
        match status {
            ConfirmStatus::Success => self.stats.confirms_success += 1,
            ConfirmStatus::NoAck => self.stats.confirms_no_ack += 1,
        }
        metrics::counter!(
            metric_defs::MAC_CONFIRMS.name,
            &ctx.labels.with(&[("status", status.as_str().to_string())])
        )
        .increment(1);
        let confirm = DataConfirm {
            msdu_handle,
            status,
            time: ctx.now(),
        };
        ctx.listeners.emit_confirm(ctx.device, &confirm);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::address::{ExtendedAddress, ShortAddress};

    fn short_mac(short: u16) -> Mac {
        Mac::new(
            DeviceAddresses::short(0, ShortAddress(short)),
            MacConfig::default(),
            10,
        )
    }

    #[test]
    fn test_build_frame_short() {
        let mac = short_mac(1);
        let frame = mac
            .build_frame(&TxParams::to(ShortAddress(2)).with_ack(true), Packet::new(7))
            .unwrap();
        let MacFrame::Data { header, msdu } = &frame else {
            panic!("expected data frame");
        };
        assert!(header.ack_request);
        assert_eq!(header.dsn, 10);
        assert_eq!(header.src_address, Some(Address::Short(ShortAddress(1))));
        assert!(header.pan_id_compression());
        assert_eq!(msdu.size_bytes(), 7);
        assert_eq!(frame.psdu_octets(), 7 + 11);
    }

    #[test]
    fn test_extended_source_with_only_short_address() {
        let mac = short_mac(1);
        let params = TxParams::to(ShortAddress(2)).with_src_mode(AddressMode::Extended);
        let err = mac.build_frame(&params, Packet::new(7)).unwrap_err();
        assert_eq!(
            err,
            MacError::InvalidAddressMode {
                field: AddressField::Source,
                mode: AddressMode::Extended,
                reason: "the device has no address of that kind",
            }
        );
    }

    #[test]
    fn test_destination_mode_mismatches() {
        let mac = short_mac(1);
        let mut params = TxParams::to(ShortAddress(2));
        params.dst_address = None;
        assert!(matches!(
            mac.build_frame(&params, Packet::new(1)),
            Err(MacError::InvalidAddressMode {
                field: AddressField::Destination,
                ..
            })
        ));

        let mut params = TxParams::to(ShortAddress(2));
        params.dst_addr_mode = AddressMode::Extended;
        assert!(mac.build_frame(&params, Packet::new(1)).is_err());

        let mut params = TxParams::to(ShortAddress(2));
        params.dst_addr_mode = AddressMode::NoAddress;
        assert!(mac.build_frame(&params, Packet::new(1)).is_err());

        let mut params = TxParams::to(ShortAddress(2));
        params.src_addr_mode = AddressMode::NoAddress;
        params.dst_addr_mode = AddressMode::NoAddress;
        params.dst_address = None;
        assert!(mac.build_frame(&params, Packet::new(1)).is_err());
    }

    #[test]
    fn test_frame_too_long() {
        let mac = short_mac(1);
        let params = TxParams::to(ShortAddress(2));
        // 11 octets of overhead with short addresses
        assert!(mac.build_frame(&params, Packet::new(116)).is_ok());
        assert_eq!(
            mac.build_frame(&params, Packet::new(117)).unwrap_err(),
            MacError::FrameTooLong {
                psdu_bytes: 128,
                max: 127
            }
        );
    }

    #[test]
    fn test_broadcast_never_requests_ack() {
        let mac = short_mac(1);
        let frame = mac
            .build_frame(&TxParams::to(ShortAddress::BROADCAST).with_ack(true), Packet::new(3))
            .unwrap();
        let MacFrame::Data { header, .. } = frame else {
            panic!("expected data frame");
        };
        assert!(!header.ack_request);
    }

    #[test]
    fn test_address_filtering() {
        let mac = short_mac(2);
        let header = |dst: Option<Address>, pan: u16| MacHeader {
            ack_request: false,
            dsn: 0,
            dst_pan_id: dst.map(|_| pan),
            dst_address: dst,
            src_pan_id: Some(0),
            src_address: Some(ShortAddress(1).into()),
        };
        assert!(mac.accepts(&header(Some(ShortAddress(2).into()), 0)));
        assert!(mac.accepts(&header(Some(ShortAddress(2).into()), 0xFFFF)));
        assert!(mac.accepts(&header(Some(ShortAddress::BROADCAST.into()), 0)));
        assert!(mac.accepts(&header(None, 0)));
        assert!(!mac.accepts(&header(Some(ShortAddress(3).into()), 0)));
        assert!(!mac.accepts(&header(Some(ShortAddress(2).into()), 7)));
        assert!(!mac.accepts(&header(Some(ExtendedAddress(2).into()), 0)));
    }

    #[test]
    fn test_config_timing() {
        let config = MacConfig::default();
        assert_eq!(config.ack_wait().as_micros(), 864);
        assert_eq!(config.turnaround().as_micros(), 192);
        assert_eq!(short_mac(1).state(), MacState::Idle);
        assert_eq!(ConfirmStatus::NoAck.to_string(), "NO_ACK");
    }
}
