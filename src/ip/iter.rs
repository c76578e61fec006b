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

use super::{has_reserved_hosts, subnet_first, subnet_last};

/// An avoid range in host byte order, both bounds inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct AvoidRange {
    start: i64,
    end: i64,
}

/// Iterator over the addresses of a subnet, in ascending order, skipping an arbitrary list of
/// avoid subnets.
///
/// ```
/// use netcarve::ip::{parse_subnet, AddrIter};
///
/// let parent = parse_subnet("10.0.0.0/30").unwrap();
/// let avoid = [parse_subnet("10.0.0.1/32").unwrap()];
/// let addrs: Vec<String> = AddrIter::new(parent, &avoid, false).map(|a| a.to_string()).collect();
/// assert_eq!(addrs, ["10.0.0.0", "10.0.0.2", "10.0.0.3"]);
/// ```
#[derive(Debug, Clone)]
pub struct AddrIter {
    /// Address yielded last, in host byte order. Starts one below the subnet base.
    current: i64,
    /// Last address of the parent subnet, inclusive.
    last: i64,
    /// Sorted by (start ascending, end descending), so that among ranges with the same start, the
    /// one skipping the furthest comes first.
    avoid: Vec<AvoidRange>,
    cursor: usize,
}

impl AddrIter {
    /// Create an iterator over `parent`, skipping every address contained in one of the
    /// `avoid` subnets. The avoid subnets may overlap each other and need not be contained in the
    /// parent. With `exclude_reserved`, the network and broadcast addresses of the parent are
    /// skipped as well.
    pub fn new(parent: Ipv4Net, avoid: &[Ipv4Net], exclude_reserved: bool) -> Self {
        let mut ranges: Vec<AvoidRange> = avoid
            .iter()
            .map(|net| AvoidRange {
                start: i64::from(subnet_first(net)),
                end: i64::from(subnet_last(net)),
            })
            .collect();
        if exclude_reserved && has_reserved_hosts(&parent) {
            for addr in [subnet_first(&parent), subnet_last(&parent)] {
                let addr = i64::from(addr);
                ranges.push(AvoidRange { start: addr, end: addr });
            }
        }
        ranges.sort_by(|a, b| a.start.cmp(&b.start).then(b.end.cmp(&a.end)));

        Self {
            current: i64::from(subnet_first(&parent)) - 1,
            last: i64::from(subnet_last(&parent)),
            avoid: ranges,
            cursor: 0,
        }
    }
}

impl Iterator for AddrIter {
    type Item = Ipv4Addr;

    fn next(&mut self) -> Option<Ipv4Addr> {
        if self.current >= self.last {
            return None;
        }
        self.current += 1;

        // Containment must be re-checked after every skip because avoid ranges may overlap.
        loop {
            // A single skip can jump over several subsequent ranges; ranges can also lie entirely
            // below the parent subnet.
            while let Some(range) = self.avoid.get(self.cursor) {
                if range.end >= self.current {
                    break;
                }
                self.cursor += 1;
            }
            match self.avoid.get(self.cursor) {
                Some(range) if self.current >= range.start => {
                    self.current = range.end + 1;
                    self.cursor += 1;
                }
                _ => break,
            }
        }

        if self.current <= self.last {
            Some(Ipv4Addr::from(self.current as u32))
        } else {
            None
        }
    }
}
