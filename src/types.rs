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

//! Module containing the common type definitions and the top-level error type.

use std::net::Ipv4Addr;

use ipnet::Ipv4Net;
use petgraph::prelude::NodeIndex;
use thiserror::Error;

use crate::graphml::{GmlError, GraphMlError};
use crate::ip::IpError;
use crate::worker::WorkerError;

pub(crate) type IndexType = u32;

/// Identifier of a virtual host (and index into the routing graph). Hosts are numbered densely in
/// the order in which they first appear in the topology file.
pub type NodeId = NodeIndex<IndexType>;

/// Weight of a single link in the routing graph.
pub type LinkWeight = f64;

/// Errors raised while setting up the virtual network.
#[derive(Debug, Error)]
pub enum SetupError {
    /// The configuration did not contain any edge nodes.
    #[error("No edge nodes were specified. Configure them in a setup file or with --edge-node.")]
    NoEdgeNodes,
    /// An edge node has no interface and no global default interface exists.
    #[error("No interface was specified for edge node with IP {0}. Either specify an interface, or set a default if all edge nodes are behind the same one.")]
    MissingInterface(Ipv4Addr),
    /// The remote MAC address of an edge node could not be discovered.
    #[error("Could not locate the MAC address for edge node with IP {ip} on interface '{iface}'. Verify that the host is online, or configure the MAC address manually.")]
    EdgeMacUnresolved {
        /// Physical IP of the edge node.
        ip: Ipv4Addr,
        /// Interface behind which the edge node lives.
        iface: String,
        /// The underlying worker failure.
        source: WorkerError,
    },
    /// Two edge nodes were assigned overlapping virtual client subnets.
    #[error("The virtual client subnets {0} and {1} overlap.")]
    OverlappingSubnets(Ipv4Net, Ipv4Net),
    /// An address computation failed.
    #[error(transparent)]
    Ip(#[from] IpError),
    /// The topology file could not be parsed.
    #[error(transparent)]
    Parse(#[from] GraphMlError),
    /// A `<node>` element appeared after the first `<edge>` element in single-pass mode.
    #[error("The GraphML file contains <node> elements after the <edge> elements. To parse this file, enable two-pass mode.")]
    NodesAfterEdges,
    /// Two-pass parsing was requested while reading from stdin.
    #[error("Cannot perform two passes when reading a GraphML file from stdin. Either ensure that all nodes appear before edges, or read from a file.")]
    TwoPassOnStdin,
    /// The topology contains fewer client hosts than there are edge nodes.
    #[error("There are fewer client nodes in the topology ({clients}) than edge nodes ({edges}). Either use a larger topology, or decrease the number of edge nodes.")]
    NotEnoughClients {
        /// Number of client hosts found in the topology.
        clients: u32,
        /// Number of configured edge nodes.
        edges: u32,
    },
    /// The topology did not contain a single link.
    #[error("Network topology did not contain any links.")]
    EmptyTopology,
    /// A link carries a weight that cannot be used for shortest-path routing.
    #[error("The link from '{src_host}' to '{target}' has weight {weight}, which is not supported.")]
    NegativeWeight {
        /// Name of the source host.
        src_host: String,
        /// Name of the target host.
        target: String,
        /// The offending weight.
        weight: LinkWeight,
    },
    /// An edge referenced a host that was never declared.
    #[error("Requested state for unknown host '{0}'.")]
    UnknownNode(String),
    /// The non-reserved IPv4 address space has been used up.
    #[error("The IPv4 address space available for internal interfaces is exhausted. Either decrease the number of nodes in the topology, or assign fewer addresses to the edge nodes.")]
    AddrSpaceExhausted,
    /// All 2^48 - 1 assignable MAC addresses have been handed out.
    #[error("Ran out of MAC addresses for virtual interfaces.")]
    MacSpaceExhausted,
    /// A worker operation failed.
    #[error(transparent)]
    Worker(#[from] WorkerError),
    /// An internal invariant was violated.
    #[error("BUG: {0}")]
    Internal(&'static str),
}

impl From<GmlError<SetupError>> for SetupError {
    fn from(value: GmlError<SetupError>) -> Self {
        match value {
            GmlError::Parse(e) => e.into(),
            GmlError::Handler(e) => e,
        }
    }
}
