// NetCarve: Network Emulation Setup written in Rust
// Copyright (C) 2022-2023 Tibor Schneider <sctibor@ethz.ch>
//
// This program is free software; you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation; either version 2 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along
// with this program; if not, write to the Free Software Foundation, Inc.,
// 51 Franklin Street, Fifth Floor, Boston, MA 02110-1301 USA.

//! IPv4 address-space management: parsing helpers on top of [`ipnet`], subnet arithmetic, the
//! avoid-list address iterator, and the power-of-two subnet fragmenter.

use std::net::Ipv4Addr;

use ipnet::Ipv4Net;
use thiserror::Error;

mod frag;
mod iter;

pub use frag::FragIter;
pub use iter::AddrIter;

/// Errors for parsing and slicing IPv4 address space.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IpError {
    /// The string is not a dotted-quad IPv4 address.
    #[error("Invalid IPv4 address: {0}")]
    BadAddress(String),
    /// The string is not in `a.b.c.d/p` CIDR notation.
    #[error("Invalid CIDR notation: {0}")]
    BadCidr(String),
    /// The subnet does not contain enough addresses for the requested number of fragments.
    #[error("The subnet {subnet} is not large enough to be split into {fragments} parts.")]
    SubnetTooSmall {
        /// The subnet that was to be fragmented.
        subnet: Ipv4Net,
        /// The requested number of fragments.
        fragments: u32,
    },
}

/// Parse a dotted-quad IPv4 address.
pub fn parse_addr(s: &str) -> Result<Ipv4Addr, IpError> {
    s.parse().map_err(|_| IpError::BadAddress(s.to_string()))
}

/// Parse a subnet in CIDR notation. The host bits of the address are zeroed, so `10.0.0.5/24`
/// yields `10.0.0.0/24`.
pub fn parse_subnet(s: &str) -> Result<Ipv4Net, IpError> {
    s.parse::<Ipv4Net>()
        .map(|net| net.trunc())
        .map_err(|_| IpError::BadCidr(s.to_string()))
}

/// The number of addresses in the subnet. With `exclude_reserved`, the network and broadcast
/// addresses are not counted (they only exist for prefixes up to /30).
pub fn subnet_size(subnet: &Ipv4Net, exclude_reserved: bool) -> u64 {
    let count = 1u64 << (32 - subnet.prefix_len());
    if exclude_reserved && has_reserved_hosts(subnet) {
        count - 2
    } else {
        count
    }
}

/// Whether the subnet has distinct network and broadcast addresses.
pub fn has_reserved_hosts(subnet: &Ipv4Net) -> bool {
    subnet.prefix_len() <= 30
}

/// Check whether two subnets share any address. Both addresses are masked by the shorter of the
/// two prefixes and compared.
pub fn subnets_overlap(a: &Ipv4Net, b: &Ipv4Net) -> bool {
    let mask = if a.prefix_len() < b.prefix_len() {
        u32::from(a.netmask())
    } else {
        u32::from(b.netmask())
    };
    (u32::from(a.addr()) & mask) == (u32::from(b.addr()) & mask)
}

/// First address of the subnet in host byte order.
pub(crate) fn subnet_first(subnet: &Ipv4Net) -> u32 {
    u32::from(subnet.network())
}

/// Last address of the subnet in host byte order.
pub(crate) fn subnet_last(subnet: &Ipv4Net) -> u32 {
    u32::from(subnet.broadcast())
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn parse_and_canonicalize() {
        assert_eq!(parse_addr("10.1.2.3"), Ok(Ipv4Addr::new(10, 1, 2, 3)));
        assert_eq!(parse_addr("10.1.2"), Err(IpError::BadAddress("10.1.2".to_string())));
        assert_eq!(parse_subnet("10.0.0.5/24"), Ok("10.0.0.0/24".parse().unwrap()));
        assert!(parse_subnet("10.0.0.0").is_err());
        assert!(parse_subnet("10.0.0.0/33").is_err());
    }

    #[test]
    fn sizes() {
        let net = parse_subnet("10.0.0.0/24").unwrap();
        assert_eq!(subnet_size(&net, false), 256);
        assert_eq!(subnet_size(&net, true), 254);
        let host = parse_subnet("10.0.0.1/32").unwrap();
        assert_eq!(subnet_size(&host, false), 1);
        assert_eq!(subnet_size(&host, true), 1);
        assert!(!has_reserved_hosts(&host));
        let all = parse_subnet("0.0.0.0/0").unwrap();
        assert_eq!(subnet_size(&all, false), 1u64 << 32);
    }

    #[test]
    fn overlap() {
        let a = parse_subnet("10.0.0.0/8").unwrap();
        let b = parse_subnet("10.1.0.0/16").unwrap();
        let c = parse_subnet("11.0.0.0/8").unwrap();
        assert!(subnets_overlap(&a, &b));
        assert!(subnets_overlap(&b, &a));
        assert!(!subnets_overlap(&a, &c));
        assert!(subnets_overlap(&a, &a));
    }
}
