//! IEEE 802.15.4 constants for the 2.4 GHz O-QPSK PHY.

use wpansim_common::SimTime;

// ============================================================================
// PHY
// ============================================================================

/// Duration of one O-QPSK symbol (62.5 ksymbol/s).
pub const SYMBOL_DURATION: SimTime = SimTime::from_micros(16);

/// Symbols needed to carry one octet (4 bits per symbol).
pub const SYMBOLS_PER_OCTET: u64 = 2;

/// Raw bit rate of the PHY in bits per second.
pub const DATA_RATE_BPS: u64 = 250_000;

/// Preamble (4) + start-of-frame delimiter (1) + PHY header (1).
pub const SHR_PHR_OCTETS: usize = 6;

/// aMaxPHYPacketSize: largest PSDU the PHY accepts.
pub const A_MAX_PHY_PACKET_SIZE: usize = 127;

/// aTurnaroundTime in symbols (RX-to-TX or TX-to-RX).
pub const A_TURNAROUND_TIME_SYMBOLS: u64 = 12;

// ============================================================================
// MAC
// ============================================================================

/// macAckWaitDuration in symbols for the 2.4 GHz PHY.
pub const MAC_ACK_WAIT_SYMBOLS: u64 = 54;

/// Frame check sequence length.
pub const MAC_FCS_OCTETS: usize = 2;

/// Frame control (2) + sequence number (1).
pub const MAC_BASE_HEADER_OCTETS: usize = 3;

/// Acknowledgement frame: frame control, sequence number and FCS.
pub const ACK_FRAME_OCTETS: usize = MAC_BASE_HEADER_OCTETS + MAC_FCS_OCTETS;

/// Broadcast short address and broadcast PAN identifier.
pub const BROADCAST_SHORT_ADDRESS: u16 = 0xFFFF;
pub const BROADCAST_PAN_ID: u16 = 0xFFFF;

/// Time needed to send `symbols` symbols.
pub const fn symbols(symbols: u64) -> SimTime {
    SYMBOL_DURATION.saturating_mul(symbols)
}

/// Airtime of a PSDU of `psdu_octets` octets including the synchronization
/// and PHY headers.
pub const fn transmission_duration(psdu_octets: usize) -> SimTime {
    symbols((SHR_PHR_OCTETS + psdu_octets) as u64 * SYMBOLS_PER_OCTET)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_symbol_rate_matches_bit_rate() {
        let bits_per_symbol = 8 / SYMBOLS_PER_OCTET;
        let symbols_per_second = 1_000_000 / SYMBOL_DURATION.as_micros();
        assert_eq!(symbols_per_second * bits_per_symbol, DATA_RATE_BPS);
    }

    #[test]
    fn test_transmission_duration() {
        // 5-octet ACK: 11 octets on air, 32 us each
        assert_eq!(transmission_duration(ACK_FRAME_OCTETS).as_micros(), 352);
        assert_eq!(transmission_duration(A_MAX_PHY_PACKET_SIZE).as_micros(), 4_256);
        assert_eq!(symbols(A_TURNAROUND_TIME_SYMBOLS).as_micros(), 192);
        assert_eq!(symbols(MAC_ACK_WAIT_SYMBOLS).as_micros(), 864);
    }
}
