//! Opaque MSDU payloads.

/// A payload handed to the MAC for transmission.
///
/// `handle` is assigned by the caller and carried through to indications so
/// the receiving side can correlate what it got with what was sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    pub handle: u64,
    pub payload: Vec<u8>,
}

impl Packet {
    /// A zero-filled packet of `size_bytes` bytes.
    pub fn new(size_bytes: usize) -> Self {
        Self {
            handle: 0,
            payload: vec![0; size_bytes],
        }
    }

    pub fn from_payload(payload: Vec<u8>) -> Self {
        Self { handle: 0, payload }
    }

    pub fn with_handle(mut self, handle: u64) -> Self {
        self.handle = handle;
        self
    }

    pub fn size_bytes(&self) -> usize {
        self.payload.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_packet_size() {
        let packet = Packet::new(50).with_handle(7);
        assert_eq!(packet.size_bytes(), 50);
        assert_eq!(packet.handle, 7);
        assert!(packet.payload.iter().all(|&b| b == 0));
        assert_eq!(Packet::from_payload(vec![1, 2, 3]).size_bytes(), 3);
    }
}
