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

//! The worker backend contract. The orchestrator describes the virtual network through this
//! trait; implementations realize it with network namespaces, virtual ethernet pairs, switch
//! ports and kernel routes. Operations must be idempotent per (identifier, kind) so that a setup
//! can be re-run over leftover state.

use std::net::Ipv4Addr;
use std::path::Path;

use ipnet::Ipv4Net;
use log::*;
use thiserror::Error;

use crate::graphml::{GmlLink, GmlNode};
use crate::mac::MacAddr;
use crate::types::NodeId;

/// Number of MAC addresses required to instantiate one client host.
pub const NEEDED_MACS_CLIENT: usize = 2;

/// Number of MAC addresses required to instantiate one internal link.
pub const NEEDED_MACS_LINK: usize = 2;

/// Failure of a worker operation.
#[derive(Debug, Clone, Error)]
#[error("Worker operation '{op}' failed: {msg}")]
pub struct WorkerError {
    /// Name of the failed operation.
    pub op: &'static str,
    /// Backend-specific description of the failure.
    pub msg: String,
}

impl WorkerError {
    /// Create a new error for the given operation.
    pub fn new(op: &'static str, msg: impl Into<String>) -> Self {
        Self { op, msg: msg.into() }
    }
}

/// Backend realizing hosts, links and routes.
///
/// All calls are made from a single thread, in a fixed order: `init`, root and edge installation,
/// host and link registration in document order, then route emission. Implementations may block;
/// the first error aborts the setup.
pub trait Worker {
    /// Capture the global parameters. Called exactly once, before any other operation.
    fn init(
        &mut self,
        ns_prefix: &str,
        ovs_dir: Option<&Path>,
        ovs_schema: Option<&Path>,
        soft_mem_cap: u64,
    ) -> Result<(), WorkerError>;

    /// Tear down all hosts of a previously created virtual network with the same namespace
    /// prefix. Returns the number of hosts that were deleted.
    fn destroy_hosts(&mut self) -> Result<u32, WorkerError>;

    /// Discover the MAC address of the edge node with the given IP, reachable through `iface`.
    fn get_edge_remote_mac(&mut self, iface: &str, ip: Ipv4Addr) -> Result<MacAddr, WorkerError>;

    /// The MAC address of the local interface `iface`.
    fn get_edge_local_mac(&mut self, iface: &str) -> Result<MacAddr, WorkerError>;

    /// Create the root namespace with its two administrative addresses.
    fn add_root(&mut self, addr_a: Ipv4Addr, addr_b: Ipv4Addr) -> Result<(), WorkerError>;

    /// Move `iface` into the root namespace and attach it to the switch. Returns the switch port.
    fn add_edge_interface(&mut self, iface: &str) -> Result<u32, WorkerError>;

    /// Install the flow rules directing traffic for an edge's virtual subnet out of `port`.
    fn add_edge_routes(
        &mut self,
        subnet: Ipv4Net,
        port: u32,
        local_mac: MacAddr,
        remote_mac: MacAddr,
    ) -> Result<(), WorkerError>;

    /// Create the namespace for a single virtual host. `macs` holds
    /// [`NEEDED_MACS_CLIENT`] addresses for client hosts and is empty otherwise.
    fn add_host(
        &mut self,
        id: NodeId,
        addr: Ipv4Addr,
        macs: &[MacAddr],
        node: &GmlNode,
    ) -> Result<(), WorkerError>;

    /// Apply link characteristics to a client's loopback connection.
    fn set_self_link(&mut self, id: NodeId, link: &GmlLink) -> Result<(), WorkerError>;

    /// Create a virtual ethernet connection between two hosts. `macs` holds
    /// [`NEEDED_MACS_LINK`] addresses.
    #[allow(clippy::too_many_arguments)]
    fn add_link(
        &mut self,
        source: NodeId,
        target: NodeId,
        source_addr: Ipv4Addr,
        target_addr: Ipv4Addr,
        macs: &[MacAddr],
        link: &GmlLink,
    ) -> Result<(), WorkerError>;

    /// Install the routes connecting a client host to its edge node through `port`.
    fn add_client_routes(
        &mut self,
        id: NodeId,
        macs: &[MacAddr],
        subnet: Ipv4Net,
        port: u32,
    ) -> Result<(), WorkerError>;

    /// Install one hop of a client-to-client path: packets between `src_subnet` and `dst_subnet`
    /// travel from `from` to `to`.
    #[allow(clippy::too_many_arguments)]
    fn add_internal_routes(
        &mut self,
        from: NodeId,
        to: NodeId,
        from_addr: Ipv4Addr,
        to_addr: Ipv4Addr,
        src_subnet: Ipv4Net,
        dst_subnet: Ipv4Net,
    ) -> Result<(), WorkerError>;

    /// Raise kernel limits for the upcoming topology size before links are created.
    fn ensure_system_scaling(
        &mut self,
        max_links: u64,
        nodes: u32,
        clients: u32,
    ) -> Result<(), WorkerError>;

    /// Release all resources held by the worker. Artifacts of the virtual network survive.
    fn cleanup(&mut self) -> Result<(), WorkerError>;
}

/// A worker that performs no system changes and only logs what would be done.
///
/// Return values are fabricated deterministically: switch ports count up from zero, and MAC
/// lookups derive a locally-administered address from the query. This makes it possible to run
/// the full pipeline without privileges, to validate a configuration and topology.
#[derive(Debug, Default, Clone)]
pub struct DryRunWorker {
    next_port: u32,
}

impl Worker for DryRunWorker {
    fn init(
        &mut self,
        ns_prefix: &str,
        ovs_dir: Option<&Path>,
        ovs_schema: Option<&Path>,
        soft_mem_cap: u64,
    ) -> Result<(), WorkerError> {
        info!(
            "Dry run: namespace prefix '{}', ovs dir {:?}, ovs schema {:?}, soft memory cap {}",
            ns_prefix, ovs_dir, ovs_schema, soft_mem_cap
        );
        Ok(())
    }

    fn destroy_hosts(&mut self) -> Result<u32, WorkerError> {
        info!("Dry run: would destroy any existing virtual hosts");
        Ok(0)
    }

    fn get_edge_remote_mac(&mut self, iface: &str, ip: Ipv4Addr) -> Result<MacAddr, WorkerError> {
        let [a, b, c, d] = ip.octets();
        let mac = MacAddr::new([0x02, 0x00, a, b, c, d]);
        debug!("Dry run: resolved remote MAC for {ip} on '{iface}' as {mac}");
        Ok(mac)
    }

    fn get_edge_local_mac(&mut self, iface: &str) -> Result<MacAddr, WorkerError> {
        let mut octets = [0x02, 0x01, 0, 0, 0, 0];
        for (slot, byte) in octets[2..].iter_mut().zip(iface.bytes()) {
            *slot = byte;
        }
        let mac = MacAddr::new(octets);
        debug!("Dry run: local MAC of '{iface}' is {mac}");
        Ok(mac)
    }

    fn add_root(&mut self, addr_a: Ipv4Addr, addr_b: Ipv4Addr) -> Result<(), WorkerError> {
        info!("Dry run: would create root namespace with addresses {addr_a} and {addr_b}");
        Ok(())
    }

    fn add_edge_interface(&mut self, iface: &str) -> Result<u32, WorkerError> {
        let port = self.next_port;
        self.next_port += 1;
        info!("Dry run: would attach edge interface '{iface}' as port {port}");
        Ok(port)
    }

    fn add_edge_routes(
        &mut self,
        subnet: Ipv4Net,
        port: u32,
        local_mac: MacAddr,
        remote_mac: MacAddr,
    ) -> Result<(), WorkerError> {
        info!("Dry run: would route {subnet} via port {port} ({local_mac} -> {remote_mac})");
        Ok(())
    }

    fn add_host(
        &mut self,
        id: NodeId,
        addr: Ipv4Addr,
        macs: &[MacAddr],
        node: &GmlNode,
    ) -> Result<(), WorkerError> {
        info!(
            "Dry run: would create host {} ('{}') with IP {}{}",
            id.index(),
            node.name,
            addr,
            if macs.is_empty() { "" } else { " (client)" }
        );
        Ok(())
    }

    fn set_self_link(&mut self, id: NodeId, link: &GmlLink) -> Result<(), WorkerError> {
        info!(
            "Dry run: would set self-link of host {} (latency {} ms, loss {})",
            id.index(),
            link.latency,
            link.packet_loss
        );
        Ok(())
    }

    fn add_link(
        &mut self,
        source: NodeId,
        target: NodeId,
        source_addr: Ipv4Addr,
        target_addr: Ipv4Addr,
        _macs: &[MacAddr],
        link: &GmlLink,
    ) -> Result<(), WorkerError> {
        info!(
            "Dry run: would link host {} ({}) with host {} ({}), latency {} ms",
            source.index(),
            source_addr,
            target.index(),
            target_addr,
            link.latency
        );
        Ok(())
    }

    fn add_client_routes(
        &mut self,
        id: NodeId,
        _macs: &[MacAddr],
        subnet: Ipv4Net,
        port: u32,
    ) -> Result<(), WorkerError> {
        info!("Dry run: would route client {} subnet {} through port {}", id.index(), subnet, port);
        Ok(())
    }

    fn add_internal_routes(
        &mut self,
        from: NodeId,
        to: NodeId,
        _from_addr: Ipv4Addr,
        _to_addr: Ipv4Addr,
        src_subnet: Ipv4Net,
        dst_subnet: Ipv4Net,
    ) -> Result<(), WorkerError> {
        debug!(
            "Dry run: would forward {src_subnet} <-> {dst_subnet} over hop {} -> {}",
            from.index(),
            to.index()
        );
        Ok(())
    }

    fn ensure_system_scaling(
        &mut self,
        max_links: u64,
        nodes: u32,
        clients: u32,
    ) -> Result<(), WorkerError> {
        info!(
            "Dry run: would scale the system for up to {max_links} links ({nodes} hosts, {clients} clients)"
        );
        Ok(())
    }

    fn cleanup(&mut self) -> Result<(), WorkerError> {
        debug!("Dry run: cleanup");
        Ok(())
    }
}
