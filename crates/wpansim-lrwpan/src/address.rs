//! Short and extended device addresses.

use crate::constants::BROADCAST_SHORT_ADDRESS;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Error parsing a colon-separated address.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid {kind} address '{input}': expected {octets} colon-separated hex octets")]
pub struct AddressParseError {
    kind: &'static str,
    octets: usize,
    input: String,
}

/// A 16-bit short address, written `00:01`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ShortAddress(pub u16);

impl ShortAddress {
    pub const BROADCAST: ShortAddress = ShortAddress(BROADCAST_SHORT_ADDRESS);

    pub fn is_broadcast(self) -> bool {
        self == Self::BROADCAST
    }
}

/// A 64-bit extended address, written `00:00:00:00:00:00:00:01`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ExtendedAddress(pub u64);

fn write_octets(f: &mut fmt::Formatter<'_>, bytes: &[u8]) -> fmt::Result {
    for (i, byte) in bytes.iter().enumerate() {
        if i > 0 {
            f.write_str(":")?;
        }
        write!(f, "{byte:02x}")?;
    }
    Ok(())
}

fn parse_octets<const N: usize>(input: &str, kind: &'static str) -> Result<[u8; N], AddressParseError> {
    let err = || AddressParseError {
        kind,
        octets: N,
        input: input.to_string(),
    };
    let mut bytes = [0u8; N];
    let mut parts = input.split(':');
    for byte in bytes.iter_mut() {
        let part = parts.next().ok_or_else(err)?;
        if part.len() != 2 {
            return Err(err());
        }
        *byte = u8::from_str_radix(part, 16).map_err(|_| err())?;
    }
    if parts.next().is_some() {
        return Err(err());
    }
    Ok(bytes)
}

impl fmt::Display for ShortAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_octets(f, &self.0.to_be_bytes())
    }
}

impl fmt::Display for ExtendedAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_octets(f, &self.0.to_be_bytes())
    }
}

impl FromStr for ShortAddress {
    type Err = AddressParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_octets::<2>(s, "short").map(|b| ShortAddress(u16::from_be_bytes(b)))
    }
}

impl FromStr for ExtendedAddress {
    type Err = AddressParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_octets::<8>(s, "extended").map(|b| ExtendedAddress(u64::from_be_bytes(b)))
    }
}

/// Which address field a frame carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AddressMode {
    /// No address (and no PAN identifier) in the frame.
    NoAddress,
    Short,
    Extended,
}

impl AddressMode {
    /// Octets the address occupies in the MAC header.
    pub fn address_octets(self) -> usize {
        match self {
            AddressMode::NoAddress => 0,
            AddressMode::Short => 2,
            AddressMode::Extended => 8,
        }
    }
}

impl fmt::Display for AddressMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            AddressMode::NoAddress => "none",
            AddressMode::Short => "short",
            AddressMode::Extended => "extended",
        })
    }
}

/// A device address of either width.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Address {
    Short(ShortAddress),
    Extended(ExtendedAddress),
}

impl Address {
    pub fn mode(&self) -> AddressMode {
        match self {
            Address::Short(_) => AddressMode::Short,
            Address::Extended(_) => AddressMode::Extended,
        }
    }

    pub fn is_broadcast(&self) -> bool {
        matches!(self, Address::Short(a) if a.is_broadcast())
    }
}

impl From<ShortAddress> for Address {
    fn from(address: ShortAddress) -> Self {
        Address::Short(address)
    }
}

impl From<ExtendedAddress> for Address {
    fn from(address: ExtendedAddress) -> Self {
        Address::Extended(address)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Address::Short(a) => a.fmt(f),
            Address::Extended(a) => a.fmt(f),
        }
    }
}

/// The addresses a device answers to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceAddresses {
    pub pan_id: u16,
    pub short: Option<ShortAddress>,
    pub extended: Option<ExtendedAddress>,
}

impl DeviceAddresses {
    pub fn short(pan_id: u16, short: ShortAddress) -> Self {
        Self {
            pan_id,
            short: Some(short),
            extended: None,
        }
    }

    pub fn extended(pan_id: u16, extended: ExtendedAddress) -> Self {
        Self {
            pan_id,
            short: None,
            extended: Some(extended),
        }
    }

    /// Own address for `mode`, if the device has one.
    pub fn for_mode(&self, mode: AddressMode) -> Option<Address> {
        match mode {
            AddressMode::NoAddress => None,
            AddressMode::Short => self.short.map(Address::Short),
            AddressMode::Extended => self.extended.map(Address::Extended),
        }
    }

    /// Whether a frame sent to `address` is for this device.
    pub fn matches(&self, address: &Address) -> bool {
        match address {
            Address::Short(a) => a.is_broadcast() || self.short == Some(*a),
            Address::Extended(a) => self.extended == Some(*a),
        }
    }

    /// All assigned addresses.
    pub fn iter(&self) -> impl Iterator<Item = Address> {
        self.short
            .map(Address::Short)
            .into_iter()
            .chain(self.extended.map(Address::Extended))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        assert_eq!(ShortAddress(1).to_string(), "00:01");
        assert_eq!(ShortAddress(0xABCD).to_string(), "ab:cd");
        assert_eq!(ExtendedAddress(1).to_string(), "00:00:00:00:00:00:00:01");
    }

    #[test]
    fn test_parse() {
        assert_eq!("00:02".parse::<ShortAddress>().unwrap(), ShortAddress(2));
        assert_eq!(
            "00:00:00:00:00:00:01:00".parse::<ExtendedAddress>().unwrap(),
            ExtendedAddress(0x100)
        );
        assert!("0002".parse::<ShortAddress>().is_err());
        assert!("00:02:03".parse::<ShortAddress>().is_err());
        assert!("zz:01".parse::<ShortAddress>().is_err());
        assert!("00:01".parse::<ExtendedAddress>().is_err());
    }

    #[test]
    fn test_device_matching() {
        let short = DeviceAddresses::short(0, ShortAddress(2));
        assert!(short.matches(&Address::Short(ShortAddress(2))));
        assert!(short.matches(&Address::Short(ShortAddress::BROADCAST)));
        assert!(!short.matches(&Address::Short(ShortAddress(3))));
        assert!(!short.matches(&Address::Extended(ExtendedAddress(2))));

        let extended = DeviceAddresses::extended(0, ExtendedAddress(2));
        assert!(extended.matches(&Address::Extended(ExtendedAddress(2))));
        assert!(extended.for_mode(AddressMode::Short).is_none());
        assert_eq!(extended.iter().count(), 1);
    }

    #[test]
    fn test_mode_octets() {
        assert_eq!(AddressMode::NoAddress.address_octets(), 0);
        assert_eq!(Address::from(ShortAddress(1)).mode().address_octets(), 2);
        assert_eq!(Address::from(ExtendedAddress(1)).mode().address_octets(), 8);
    }
}
