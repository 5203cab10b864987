// Copyright (c) 2025 - Cowboy AI, Inc.
//! Network Value Objects with Validation Invariants

use ipnetwork::IpNetwork;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::str::FromStr;
use thiserror::Error;

/// Network validation error
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum NetworkError {
    #[error("Invalid IP address format: {0}")]
    InvalidIpAddress(String),

    #[error("Invalid CIDR notation: {0}")]
    InvalidCidr(String),

    #[error("Invalid prefix length: {0} (must be 0-32 for IPv4, 0-128 for IPv6)")]
    InvalidPrefixLength(u8),
}

/// Parse a bare IP address (no prefix)
pub fn parse_address(address: impl AsRef<str>) -> Result<IpAddr, NetworkError> {
    let address = address.as_ref().trim();
    IpAddr::from_str(address).map_err(|_| NetworkError::InvalidIpAddress(address.to_string()))
}

/// CIDR network value object
///
/// Represents an IPv4 or IPv6 network prefix in canonical form.
/// Invariants:
/// - Valid `address/prefix` notation, prefix within range for the family
/// - Host bits are cleared (`10.0.0.1/30` is held as `10.0.0.0/30`)
///
/// # Examples
///
/// ```rust
/// use dcim_ipam::domain::Cidr;
///
/// let cidr = Cidr::new("10.0.0.1/30").unwrap();
/// assert_eq!(cidr.to_string(), "10.0.0.0/30");
/// assert_eq!(cidr.capacity(), 2);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Cidr {
    network: IpNetwork,
}

impl Cidr {
    /// Parse and canonicalize a CIDR string
    ///
    /// # Invariants
    /// - Prefix length must be present
    /// - Prefix length 0-32 for IPv4, 0-128 for IPv6
    pub fn new(cidr: impl AsRef<str>) -> Result<Self, NetworkError> {
        let cidr = cidr.as_ref().trim();

        let (addr_str, prefix_str) = cidr
            .split_once('/')
            .ok_or_else(|| NetworkError::InvalidCidr(cidr.to_string()))?;

        let address = IpAddr::from_str(addr_str)
            .map_err(|_| NetworkError::InvalidIpAddress(addr_str.to_string()))?;

        let prefix = prefix_str
            .parse::<u8>()
            .map_err(|_| NetworkError::InvalidCidr(cidr.to_string()))?;

        let max_prefix = match address {
            IpAddr::V4(_) => 32,
            IpAddr::V6(_) => 128,
        };
        if prefix > max_prefix {
            return Err(NetworkError::InvalidPrefixLength(prefix));
        }

        let network = IpNetwork::new(address, prefix)
            .map_err(|_| NetworkError::InvalidCidr(cidr.to_string()))?;
        let network = IpNetwork::new(network.network(), prefix)
            .map_err(|_| NetworkError::InvalidCidr(cidr.to_string()))?;

        Ok(Self { network })
    }

    /// Network (first) address of the prefix
    pub fn network(&self) -> IpAddr {
        self.network.network()
    }

    /// Prefix length
    pub fn prefix(&self) -> u8 {
        self.network.prefix()
    }

    pub fn is_ipv4(&self) -> bool {
        self.network.is_ipv4()
    }

    /// Check whether an address falls inside this network
    pub fn contains(&self, address: IpAddr) -> bool {
        self.network.contains(address)
    }

    /// Check whether an address is a usable host address of this network
    pub fn is_host(&self, address: IpAddr) -> bool {
        if !self.contains(address) {
            return false;
        }
        let (first, last) = self.host_bounds();
        let value = to_u128(address);
        value >= first && value <= last
    }

    /// Number of usable host addresses
    pub fn capacity(&self) -> u128 {
        let (first, last) = self.host_bounds();
        last - first + 1
    }

    /// Usable host addresses in ascending numeric order
    ///
    /// IPv4 excludes the network and broadcast addresses, except for /31
    /// (both addresses usable) and /32 (the single address). IPv6 excludes
    /// the subnet-router anycast address, except for /127 and /128.
    pub fn hosts(&self) -> HostIter {
        let (first, last) = self.host_bounds();
        HostIter {
            next: Some(first),
            last,
            ipv4: self.is_ipv4(),
        }
    }

    /// Inclusive numeric bounds of the usable host range
    fn host_bounds(&self) -> (u128, u128) {
        let bits: u32 = if self.is_ipv4() { 32 } else { 128 };
        let host_bits = bits - u32::from(self.prefix());
        let host_mask = if host_bits == 128 {
            u128::MAX
        } else {
            (1u128 << host_bits) - 1
        };

        let first = to_u128(self.network());
        let last = first | host_mask;

        match (self.is_ipv4(), host_bits) {
            (_, 0) | (_, 1) => (first, last),
            (true, _) => (first + 1, last - 1),
            (false, _) => (first + 1, last),
        }
    }
}

fn to_u128(address: IpAddr) -> u128 {
    match address {
        IpAddr::V4(v4) => u128::from(u32::from(v4)),
        IpAddr::V6(v6) => u128::from(v6),
    }
}

/// Ascending iterator over the usable hosts of a [`Cidr`]
#[derive(Debug, Clone)]
pub struct HostIter {
    next: Option<u128>,
    last: u128,
    ipv4: bool,
}

impl Iterator for HostIter {
    type Item = IpAddr;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next?;
        self.next = if current < self.last {
            Some(current + 1)
        } else {
            None
        };

        let address = if self.ipv4 {
            IpAddr::V4(Ipv4Addr::from(current as u32))
        } else {
            IpAddr::V6(Ipv6Addr::from(current))
        };
        Some(address)
    }
}

impl fmt::Display for Cidr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.network(), self.prefix())
    }
}

impl FromStr for Cidr {
    type Err = NetworkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for Cidr {
    type Error = NetworkError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Cidr> for String {
    fn from(cidr: Cidr) -> Self {
        cidr.to_string()
    }
}
