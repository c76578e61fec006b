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

//! End-to-end tests driving the full setup pipeline against a recording worker.


use std::cell::{Cell, RefCell};
use std::net::Ipv4Addr;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use ipnet::Ipv4Net;

use crate::graphml::{GmlLink, GmlNode};
use crate::mac::MacAddr;
use crate::types::NodeId;
use crate::worker::{Worker, WorkerError};

/// A recorded worker operation. MAC discovery is not recorded; it has no side effects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Call {
    Init { ns_prefix: String },
    DestroyHosts,
    AddRoot(Ipv4Addr, Ipv4Addr),
    AddEdgeInterface(String),
    AddEdgeRoutes { subnet: Ipv4Net, port: u32 },
    AddHost { id: u32, addr: Ipv4Addr, client: bool, name: String },
    SetSelfLink { id: u32 },
    AddLink { source: u32, target: u32 },
    AddClientRoutes { id: u32, subnet: Ipv4Net, port: u32 },
    AddInternalRoutes { from: u32, to: u32, src_subnet: Ipv4Net, dst_subnet: Ipv4Net },
    EnsureSystemScaling { max_links: u64, nodes: u32, clients: u32 },
    Cleanup,
}

/// Worker that records every operation. Clones share the same log, so a handle can outlive the
/// setup that consumed the worker.
#[derive(Debug, Clone, Default)]
pub(crate) struct RecordingWorker {
    calls: Rc<RefCell<Vec<Call>>>,
    next_port: Rc<Cell<u32>>,
    fail_remote_mac: bool,
}

impl RecordingWorker {
    pub(crate) fn failing_remote_mac() -> Self {
        Self { fail_remote_mac: true, ..Self::default() }
    }

    pub(crate) fn calls(&self) -> Vec<Call> {
        self.calls.borrow().clone()
    }

    fn record(&self, call: Call) {
        self.calls.borrow_mut().push(call);
    }
}

impl Worker for RecordingWorker {
    fn init(
        &mut self,
        ns_prefix: &str,
        _ovs_dir: Option<&Path>,
        _ovs_schema: Option<&Path>,
        _soft_mem_cap: u64,
    ) -> Result<(), WorkerError> {
        self.record(Call::Init { ns_prefix: ns_prefix.to_string() });
        Ok(())
    }

    fn destroy_hosts(&mut self) -> Result<u32, WorkerError> {
        self.record(Call::DestroyHosts);
        Ok(0)
    }

    fn get_edge_remote_mac(&mut self, _iface: &str, ip: Ipv4Addr) -> Result<MacAddr, WorkerError> {
        if self.fail_remote_mac {
            return Err(WorkerError::new("get_edge_remote_mac", "host offline"));
        }
        let [a, b, c, d] = ip.octets();
        Ok(MacAddr::new([0x02, 0x00, a, b, c, d]))
    }

    fn get_edge_local_mac(&mut self, _iface: &str) -> Result<MacAddr, WorkerError> {
        Ok(MacAddr::new([0x02, 0x01, 0, 0, 0, 1]))
    }

    fn add_root(&mut self, addr_a: Ipv4Addr, addr_b: Ipv4Addr) -> Result<(), WorkerError> {
        self.record(Call::AddRoot(addr_a, addr_b));
        Ok(())
    }

    fn add_edge_interface(&mut self, iface: &str) -> Result<u32, WorkerError> {
        self.record(Call::AddEdgeInterface(iface.to_string()));
        let port = self.next_port.get();
        self.next_port.set(port + 1);
        Ok(port)
    }

    fn add_edge_routes(
        &mut self,
        subnet: Ipv4Net,
        port: u32,
        _local_mac: MacAddr,
        _remote_mac: MacAddr,
    ) -> Result<(), WorkerError> {
        self.record(Call::AddEdgeRoutes { subnet, port });
        Ok(())
    }

    fn add_host(
        &mut self,
        id: NodeId,
        addr: Ipv4Addr,
        macs: &[MacAddr],
        node: &GmlNode,
    ) -> Result<(), WorkerError> {
        self.record(Call::AddHost {
            id: id.index() as u32,
            addr,
            client: !macs.is_empty(),
            name: node.name.clone(),
        });
        Ok(())
    }

    fn set_self_link(&mut self, id: NodeId, _link: &GmlLink) -> Result<(), WorkerError> {
        self.record(Call::SetSelfLink { id: id.index() as u32 });
        Ok(())
    }

    fn add_link(
        &mut self,
        source: NodeId,
        target: NodeId,
        _source_addr: Ipv4Addr,
        _target_addr: Ipv4Addr,
        _macs: &[MacAddr],
        _link: &GmlLink,
    ) -> Result<(), WorkerError> {
        self.record(Call::AddLink { source: source.index() as u32, target: target.index() as u32 });
        Ok(())
    }

    fn add_client_routes(
        &mut self,
        id: NodeId,
        _macs: &[MacAddr],
        subnet: Ipv4Net,
        port: u32,
    ) -> Result<(), WorkerError> {
        self.record(Call::AddClientRoutes { id: id.index() as u32, subnet, port });
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
        self.record(Call::AddInternalRoutes {
            from: from.index() as u32,
            to: to.index() as u32,
            src_subnet,
            dst_subnet,
        });
        Ok(())
    }

    fn ensure_system_scaling(
        &mut self,
        max_links: u64,
        nodes: u32,
        clients: u32,
    ) -> Result<(), WorkerError> {
        self.record(Call::EnsureSystemScaling { max_links, nodes, clients });
        Ok(())
    }

    fn cleanup(&mut self) -> Result<(), WorkerError> {
        self.record(Call::Cleanup);
        Ok(())
    }
}

/// A file in the system temp directory, removed on drop.
#[derive(Debug)]
pub(crate) struct TempFile {
    path: PathBuf,
}

impl TempFile {
    pub(crate) fn new(name: &str, content: &str) -> Self {
        let path = std::env::temp_dir().join(format!("netcarve-{}-{}", std::process::id(), name));
        std::fs::write(&path, content).unwrap();
        Self { path }
    }

    pub(crate) fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for TempFile {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.path);
    }
}
