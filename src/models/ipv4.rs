//! IPv4 address and CIDR notation utilities.
//!
//! Provides [`Ipv4`] for representing an address block in CIDR notation and
//! [`CidrDetails`], the network/broadcast/host-range view of a block that the
//! inventory exposes for each subnet record.

use serde::de;
use serde::{Deserialize, Deserializer, Serialize};
use std::net::Ipv4Addr;
use std::str::FromStr;
use thiserror::Error;

/// Maximum length for an IPv4 subnet mask (32 bits).
pub const MAX_LENGTH: u8 = 32;

/// Errors produced while parsing or computing CIDR blocks.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CidrError {
    #[error("Invalid address/mask: {0}")]
    Format(String),

    #[error("Invalid address {0}")]
    Address(String),

    #[error("Invalid subnet mask {0}")]
    Mask(String),

    #[error("Network length is too long")]
    TooLong,
}

/// Convert a CIDR prefix length to a subnet mask as u32.
///
/// # Examples
/// ```
/// use cloud_subnet_sync::models::get_cidr_mask;
/// assert_eq!(get_cidr_mask(24).unwrap(), 0xFFFFFF00);
/// ```
pub fn get_cidr_mask(len: u8) -> Result<u32, CidrError> {
    if len > MAX_LENGTH {
        Err(CidrError::TooLong)
    } else {
        let right_len = MAX_LENGTH - len;
        let all_bits = u32::MAX as u64;

        let mask = (all_bits >> right_len) << right_len;

        Ok(mask as u32)
    }
}

/// Get the network address for a given IP and prefix length.
pub fn cut_addr(addr: Ipv4Addr, len: u8) -> Result<Ipv4Addr, CidrError> {
    let mask = get_cidr_mask(len)?;
    Ok(Ipv4Addr::from(u32::from(addr) & mask))
}

/// Calculate the broadcast address for a given IP and prefix length.
pub fn broadcast_addr(addr: Ipv4Addr, len: u8) -> Result<Ipv4Addr, CidrError> {
    let mask = get_cidr_mask(len)?;
    let network_bits = u32::from(addr) & mask;
    Ok(Ipv4Addr::from(network_bits | !mask))
}

/// Number of addresses a cloud lets you use in a block of prefix `len`,
/// after the provider keeps `reserved` of them for itself.
///
/// Returns a signed value so a block smaller than the reservation comes out
/// as zero or negative instead of wrapping.
///
/// ```
/// use cloud_subnet_sync::models::usable_hosts;
/// assert_eq!(usable_hosts(24, 5), 251);
/// assert_eq!(usable_hosts(30, 5), -1);
/// ```
pub fn usable_hosts(len: u8, reserved: u32) -> i64 {
    let len = len.min(MAX_LENGTH);
    (1i64 << (MAX_LENGTH - len)) - reserved as i64
}

/// IPv4 address with CIDR notation support.
#[derive(Eq, Ord, Debug, Copy, Clone, Hash)]
pub struct Ipv4 {
    /// The IPv4 address.
    pub addr: Ipv4Addr,
    /// The subnet mask length (0-32).
    pub mask: u8,
}

impl Serialize for Ipv4 {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::ser::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Ipv4 {
    fn deserialize<D>(deserializer: D) -> Result<Ipv4, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Ipv4::new(&s).map_err(de::Error::custom)
    }
}

impl Ipv4 {
    /// Create a new [`Ipv4`] from a CIDR string (e.g., "10.0.0.0/24").
    pub fn new(addr_cidr: &str) -> Result<Ipv4, CidrError> {
        let addr_cidr = addr_cidr.trim();
        let (addr, mask) = addr_cidr
            .split_once('/')
            .ok_or_else(|| CidrError::Format(addr_cidr.to_string()))?;
        let addr = Ipv4Addr::from_str(addr).map_err(|_| CidrError::Address(addr.to_string()))?;
        let mask: u8 = mask.parse().map_err(|_| CidrError::Mask(mask.to_string()))?;
        if mask > MAX_LENGTH {
            return Err(CidrError::TooLong);
        }
        Ok(Ipv4 { addr, mask })
    }

    /// Get the lowest (network) address in the subnet.
    pub fn lo(&self) -> Ipv4Addr {
        // mask is validated on construction
        cut_addr(self.addr, self.mask).unwrap_or(self.addr)
    }

    /// Get the highest (broadcast) address in the subnet.
    pub fn hi(&self) -> Ipv4Addr {
        broadcast_addr(self.addr, self.mask).unwrap_or(self.addr)
    }

    /// Total number of addresses in the block, reserved ones included.
    pub fn size(&self) -> u64 {
        1u64 << (MAX_LENGTH - self.mask.min(MAX_LENGTH))
    }

    /// Network/broadcast/host-range view of this block.
    pub fn details(&self) -> CidrDetails {
        let network = self.lo();
        let broadcast = self.hi();
        let (first_host, last_host, host_count) = match self.mask {
            32 => (network, network, 1),
            31 => (network, broadcast, 2),
            _ => (
                Ipv4Addr::from(u32::from(network) + 1),
                Ipv4Addr::from(u32::from(broadcast) - 1),
                self.size() - 2,
            ),
        };
        CidrDetails {
            cidr: *self,
            network,
            broadcast,
            first_host,
            last_host,
            host_count,
            is_canonical: network == self.addr,
        }
    }
}

impl FromStr for Ipv4 {
    type Err = CidrError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ipv4::new(s)
    }
}

impl std::fmt::Display for Ipv4 {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}/{}", self.addr, self.mask)
    }
}

impl PartialEq for Ipv4 {
    fn eq(&self, other: &Ipv4) -> bool {
        self.addr == other.addr && self.mask == other.mask
    }
}

impl PartialOrd for Ipv4 {
    fn partial_cmp(&self, other: &Ipv4) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

/// Derived addressing facts for one CIDR block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CidrDetails {
    pub cidr: Ipv4,
    pub network: Ipv4Addr,
    pub broadcast: Ipv4Addr,
    pub first_host: Ipv4Addr,
    pub last_host: Ipv4Addr,
    pub host_count: u64,
    /// False when the address has host bits set (e.g. "10.0.0.7/24").
    pub is_canonical: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_cidr_mask() {
        assert_eq!(get_cidr_mask(0).unwrap(), 0x00000000);
        assert_eq!(get_cidr_mask(8).unwrap(), 0xFF000000);
        assert_eq!(get_cidr_mask(16).unwrap(), 0xFFFF0000);
        assert_eq!(get_cidr_mask(24).unwrap(), 0xFFFFFF00);
        assert_eq!(get_cidr_mask(32).unwrap(), 0xFFFFFFFF);
        assert!(get_cidr_mask(33).is_err());
    }

    #[test]
    fn test_cut_addr() {
        let ip = Ipv4Addr::new(192, 168, 1, 42);
        assert_eq!(cut_addr(ip, 24).unwrap(), Ipv4Addr::new(192, 168, 1, 0));
        assert_eq!(cut_addr(ip, 16).unwrap(), Ipv4Addr::new(192, 168, 0, 0));
        assert_eq!(cut_addr(ip, 32).unwrap(), Ipv4Addr::new(192, 168, 1, 42));
        assert!(cut_addr(ip, 33).is_err());
    }

    #[test]
    fn test_broadcast_addr() {
        let ip = Ipv4Addr::new(192, 168, 1, 0);
        assert_eq!(
            broadcast_addr(ip, 24).unwrap(),
            Ipv4Addr::new(192, 168, 1, 255)
        );
        assert_eq!(
            broadcast_addr(ip, 8).unwrap(),
            Ipv4Addr::new(192, 255, 255, 255)
        );
        assert_eq!(
            broadcast_addr(ip, 32).unwrap(),
            Ipv4Addr::new(192, 168, 1, 0)
        );
    }

    #[test]
    fn test_usable_hosts() {
        assert_eq!(usable_hosts(16, 5), 65531);
        assert_eq!(usable_hosts(24, 5), 251);
        assert_eq!(usable_hosts(28, 5), 11);
        assert_eq!(usable_hosts(29, 5), 3);
        assert_eq!(usable_hosts(30, 5), -1);
        assert_eq!(usable_hosts(24, 0), 256);
    }

    #[test]
    fn test_ipv4_new_errors() {
        assert_eq!(
            Ipv4::new("10.0.0.0").unwrap_err(),
            CidrError::Format("10.0.0.0".to_string())
        );
        assert!(matches!(Ipv4::new("10.0.0/24"), Err(CidrError::Address(_))));
        assert!(matches!(Ipv4::new("10.0.0.0/x"), Err(CidrError::Mask(_))));
        assert_eq!(Ipv4::new("10.0.0.0/33").unwrap_err(), CidrError::TooLong);
        assert_eq!(
            Ipv4::new(" 10.1.0.0/16 ").unwrap(),
            Ipv4 {
                addr: Ipv4Addr::new(10, 1, 0, 0),
                mask: 16
            }
        );
    }

    #[test]
    fn test_details() {
        let d = Ipv4::new("10.0.1.0/24").unwrap().details();
        assert_eq!(d.network, Ipv4Addr::new(10, 0, 1, 0));
        assert_eq!(d.broadcast, Ipv4Addr::new(10, 0, 1, 255));
        assert_eq!(d.first_host, Ipv4Addr::new(10, 0, 1, 1));
        assert_eq!(d.last_host, Ipv4Addr::new(10, 0, 1, 254));
        assert_eq!(d.host_count, 254);
        assert!(d.is_canonical);

        let d = Ipv4::new("10.0.1.7/24").unwrap().details();
        assert!(!d.is_canonical);

        let d = Ipv4::new("10.0.1.7/32").unwrap().details();
        assert_eq!(d.host_count, 1);
        assert_eq!(d.first_host, d.last_host);
    }

    #[test]
    fn test_serde_roundtrip_string_form() {
        let ip = Ipv4::new("172.16.0.0/12").unwrap();
        let json = serde_json::to_string(&ip).unwrap();
        assert_eq!(json, "\"172.16.0.0/12\"");
        assert!(serde_json::from_str::<Ipv4>("\"172.16.0.0\"").is_err());
    }

    #[test]
    fn test_ip4_cmp_overlap() {
        let ip1 = Ipv4::new("10.0.10.0/24").unwrap();
        let ip2 = Ipv4::new("10.0.0.0/8").unwrap();
        let ip3 = Ipv4::new("10.0.10.64/26").unwrap();

        assert!(ip1 > ip2);
        assert!(ip1 < ip3);
        assert!(ip2.lo() < ip1.lo());
        assert!(ip2.hi() > ip3.hi());
        assert_eq!(ip2.hi(), Ipv4Addr::new(10, 255, 255, 255));
    }
}
