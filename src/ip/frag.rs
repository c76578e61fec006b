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

use std::net::Ipv4Addr;

use ipnet::Ipv4Net;

use super::{subnet_first, subnet_size, IpError};

/// Iterator that partitions a subnet into a fixed number of aligned power-of-two fragments.
///
/// The parent is split into "small" and "large" fragments, where large fragments are exactly twice
/// the size of small ones. The small size is the largest power of two such that all fragments fit;
/// the leftover address space is used up by promoting the first fragments to large ones. The
/// fragments are contiguous, non-overlapping, aligned on their own size, and together cover the
/// parent exactly.
///
/// ```
/// use netcarve::ip::{parse_subnet, FragIter};
///
/// let parent = parse_subnet("10.0.0.0/24").unwrap();
/// let parts: Vec<String> = FragIter::new(parent, 3).unwrap().map(|n| n.to_string()).collect();
/// assert_eq!(parts, ["10.0.0.0/25", "10.0.0.128/26", "10.0.0.192/26"]);
/// ```
#[derive(Debug, Clone)]
pub struct FragIter {
    /// Base address of the next fragment, in host byte order (u64 so that advancing past
    /// 255.255.255.255 cannot overflow).
    current: u64,
    small_size: u64,
    small_prefix: u8,
    large_remaining: u64,
    remaining: u64,
}

impl FragIter {
    /// Split `subnet` into exactly `fragments` parts. Fails with [`IpError::SubnetTooSmall`] if
    /// the subnet has fewer addresses than the requested number of fragments. No subnet can be
    /// covered by zero fragments.
    pub fn new(subnet: Ipv4Net, fragments: u32) -> Result<Self, IpError> {
        let parent_size = subnet_size(&subnet, false);
        if fragments == 0 || parent_size < u64::from(fragments) {
            return Err(IpError::SubnetTooSmall { subnet, fragments });
        }

        let small_pow2 = (parent_size / u64::from(fragments)).ilog2();
        let small_size = 1u64 << small_pow2;
        let total_small = small_size * u64::from(fragments);
        // The leftover is always a multiple of the small fragment size.
        let large = (parent_size - total_small) / small_size;

        Ok(Self {
            current: u64::from(subnet_first(&subnet)),
            small_size,
            small_prefix: (32 - small_pow2) as u8,
            large_remaining: large,
            remaining: u64::from(fragments),
        })
    }
}

impl Iterator for FragIter {
    type Item = Ipv4Net;

    fn next(&mut self) -> Option<Ipv4Net> {
        if self.remaining == 0 {
            return None;
        }
        let large = self.large_remaining > 0;
        let prefix = if large { self.small_prefix - 1 } else { self.small_prefix };
        // The prefix is at most 32 by construction.
        let fragment = Ipv4Net::new(Ipv4Addr::from(self.current as u32), prefix).unwrap();

        self.current += self.small_size * if large { 2 } else { 1 };
        if large {
            self.large_remaining -= 1;
        }
        self.remaining -= 1;
        Some(fragment)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining as usize, Some(self.remaining as usize))
    }
}
