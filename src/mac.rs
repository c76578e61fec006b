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

//! MAC addresses and the monotonic allocator used to hand out addresses for virtual interfaces.

use std::fmt;
use std::str::FromStr;

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// Number of octets in a MAC address.
pub const MAC_ADDR_BYTES: usize = 6;

/// A 48-bit MAC address. The all-zero address is reserved and never assigned by the allocator.
#[derive(Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MacAddr {
    octets: [u8; MAC_ADDR_BYTES],
}

impl MacAddr {
    /// The reserved all-zero address.
    pub const ZERO: MacAddr = MacAddr { octets: [0; MAC_ADDR_BYTES] };

    /// Create an address from raw octets.
    pub const fn new(octets: [u8; MAC_ADDR_BYTES]) -> Self {
        Self { octets }
    }

    /// The raw octets, most significant first.
    pub const fn octets(&self) -> [u8; MAC_ADDR_BYTES] {
        self.octets
    }

    /// The next address in big-endian counting order, or `None` when incrementing the highest
    /// address wraps around.
    pub fn successor(self) -> Option<MacAddr> {
        let mut octets = self.octets;
        for octet in octets.iter_mut().rev() {
            *octet = octet.wrapping_add(1);
            if *octet != 0 {
                return Some(MacAddr { octets });
            }
        }
        None
    }
}

impl fmt::Display for MacAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let o = &self.octets;
        write!(f, "{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}", o[0], o[1], o[2], o[3], o[4], o[5])
    }
}

impl fmt::Debug for MacAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

/// Error when parsing a MAC address string.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid MAC address: {0}")]
pub struct MacParseError(pub String);

impl FromStr for MacAddr {
    type Err = MacParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut octets = [0u8; MAC_ADDR_BYTES];
        let mut parts = s.split(':');
        for octet in octets.iter_mut() {
            let part = parts.next().ok_or_else(|| MacParseError(s.to_string()))?;
            if part.is_empty() || part.len() > 2 {
                return Err(MacParseError(s.to_string()));
            }
            *octet = u8::from_str_radix(part, 16).map_err(|_| MacParseError(s.to_string()))?;
        }
        if parts.next().is_some() {
            return Err(MacParseError(s.to_string()));
        }
        Ok(MacAddr { octets })
    }
}

impl Serialize for MacAddr {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for MacAddr {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(de::Error::custom)
    }
}

/// Monotonic allocator handing out MAC addresses in strictly increasing order, starting right
/// after the reserved all-zero address.
#[derive(Debug, Clone)]
pub struct MacAllocator {
    /// The address handed out next; `None` once the counter has wrapped.
    next: Option<MacAddr>,
}

impl Default for MacAllocator {
    fn default() -> Self {
        Self::new()
    }
}

impl MacAllocator {
    /// Create an allocator whose first address is `00:00:00:00:00:01`.
    pub fn new() -> Self {
        Self { next: MacAddr::ZERO.successor() }
    }

    /// Create an allocator whose first address is `start`.
    pub fn starting_at(start: MacAddr) -> Self {
        Self { next: Some(start) }
    }

    /// Allocate a single address. Returns `None` exactly once the 2^48 counter has wrapped.
    pub fn next_addr(&mut self) -> Option<MacAddr> {
        let current = self.next.take()?;
        self.next = current.successor();
        Some(current)
    }

    /// Allocate a block of `K` consecutive addresses. Returns `None` if the space is exhausted
    /// before the block is complete.
    pub fn next_block<const K: usize>(&mut self) -> Option<[MacAddr; K]> {
        let mut block = [MacAddr::ZERO; K];
        for slot in block.iter_mut() {
            *slot = self.next_addr()?;
        }
        Some(block)
    }
}
