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

//! # Setup orchestrator
//!
//! This module ties everything together: it validates and completes the edge node table, installs
//! the root namespace and the edge interfaces, streams the GraphML topology into virtual hosts and
//! links, plans shortest paths, distributes client hosts across the edge nodes, and emits the
//! per-hop forwarding entries for every pair of clients.

use std::collections::HashMap;
use std::io;
use std::net::Ipv4Addr;

use ipnet::Ipv4Net;
use itertools::Itertools;
use log::*;

use crate::config::Config;
use crate::graphml::{self, GmlHandler, GmlLink, GmlNode};
use crate::ip::{self, AddrIter, FragIter};
use crate::mac::{MacAddr, MacAllocator};
use crate::routing::RoutePlanner;
use crate::types::{NodeId, SetupError};
use crate::worker::{Worker, NEEDED_MACS_CLIENT, NEEDED_MACS_LINK};

/// Address blocks that must never be assigned to internal interfaces.
const RESERVED_SUBNETS: [&str; 3] = ["0.0.0.0/8", "127.0.0.0/8", "255.255.255.255/32"];

/// An edge node with all optional fields resolved.
#[derive(Debug, Clone)]
pub(crate) struct Edge {
    pub(crate) ip: Ipv4Addr,
    pub(crate) iface: String,
    pub(crate) mac: MacAddr,
    pub(crate) vsubnet: Ipv4Net,
}

/// One emulated network setup run.
///
/// Creating the value performs edge node validation and defaulting against the worker;
/// [`Setup::build_topology`] then instantiates the topology. All intermediate state lives inside
/// the method calls, so partial failures release their resources on the way out.
#[derive(Debug)]
pub struct Setup<W> {
    config: Config,
    edges: Vec<Edge>,
    worker: W,
}

impl<W: Worker> Setup<W> {
    /// Initialize the worker and complete the edge node definitions: missing interfaces fall back
    /// to the global default, missing MAC addresses are discovered through the worker, and edges
    /// without a virtual subnet receive a fragment of the global client subnet. On failure the
    /// worker is cleaned up before returning.
    pub fn new(config: Config, mut worker: W) -> Result<Self, SetupError> {
        worker.init(
            &config.ns_prefix,
            config.ovs_dir.as_deref(),
            config.ovs_schema.as_deref(),
            config.soft_mem_cap,
        )?;

        match complete_edges(&config, &mut worker) {
            Ok(edges) => Ok(Self { config, edges, worker }),
            Err(e) => {
                if let Err(cleanup_err) = worker.cleanup() {
                    error!("Worker cleanup after a failed setup also failed: {cleanup_err}");
                }
                Err(e)
            }
        }
    }

    /// Access the worker backend.
    pub fn worker(&self) -> &W {
        &self.worker
    }

    pub(crate) fn edges(&self) -> &[Edge] {
        &self.edges
    }

    /// Tear down any virtual network left behind by a previous run with the same namespace
    /// prefix.
    pub fn destroy_network(&mut self) -> Result<(), SetupError> {
        info!(
            "Destroying any existing virtual network with namespace prefix '{}'",
            self.config.ns_prefix
        );
        let deleted = self.worker.destroy_hosts()?;
        if deleted > 0 {
            info!("Destroyed an existing virtual network with {deleted} hosts");
        }
        Ok(())
    }

    /// Instantiate the virtual network from the configured GraphML source.
    pub fn build_topology(&mut self) -> Result<(), SetupError> {
        let config = &self.config;
        let edges = &self.edges;
        let worker = &mut self.worker;

        match &config.src_file {
            Some(path) => info!("Reading network topology in GraphML format from {}", path.display()),
            None => info!("Reading network topology in GraphML format from <stdin>"),
        }

        // Internal interface addresses are drawn from the full IPv4 space, minus the reserved
        // blocks and the edge node subnets. Using publicly routable addresses internally does not
        // matter, since the node namespaces are not connected to the Internet.
        let restricted: Vec<Ipv4Net> = RESERVED_SUBNETS
            .iter()
            .map(|s| s.parse().unwrap())
            .chain(edges.iter().map(|e| e.vsubnet))
            .collect();
        let everything: Ipv4Net = "0.0.0.0/0".parse().unwrap();

        let mut ctx = TopoContext {
            worker,
            edges,
            finished_nodes: false,
            ignore_nodes: false,
            ignore_edges: false,
            states: Vec::new(),
            names: HashMap::new(),
            client_count: 0,
            clients_per_edge: 0.0,
            addrs: AddrIter::new(everything, &restricted, false),
            macs: MacAllocator::new(),
            planner: None,
        };

        let root_a = ctx.addrs.next().ok_or(SetupError::AddrSpaceExhausted)?;
        let root_b = ctx.addrs.next().ok_or(SetupError::AddrSpaceExhausted)?;
        ctx.worker.add_root(root_a, root_b)?;

        // Move all interfaces associated with edge nodes into the root namespace. Duplicate
        // interfaces share a switch port; a linear scan suffices for the handful of edge nodes.
        let mut edge_ports: Vec<u32> = Vec::with_capacity(edges.len());
        for (i, edge) in edges.iter().enumerate() {
            let port = match edges[..i].iter().position(|other| other.iface == edge.iface) {
                Some(j) => edge_ports[j],
                None => ctx.worker.add_edge_interface(&edge.iface)?,
            };
            edge_ports.push(port);

            let local_mac = ctx.worker.get_edge_local_mac(&edge.iface)?;
            ctx.worker.add_edge_routes(edge.vsubnet, port, local_mac, edge.mac)?;
        }

        let gml = &config.graphml;
        match &config.src_file {
            Some(path) => {
                let passes = if gml.two_pass { 2 } else { 1 };
                if passes > 1 {
                    ctx.ignore_edges = true;
                }
                for pass in (1..=passes).rev() {
                    graphml::parse_file(path, &mut ctx, gml.client_type.as_deref(), &gml.weight_key)?;
                    if pass == 2 {
                        // Pretend that we reached the end of the node section of a sorted file,
                        // and ignore any further nodes instead of raising an error.
                        ctx.finished_nodes = true;
                        ctx.ignore_nodes = true;
                        ctx.ignore_edges = false;
                    }
                }
            }
            None => {
                if gml.two_pass {
                    return Err(SetupError::TwoPassOnStdin);
                }
                let stdin = io::stdin();
                graphml::parse(stdin.lock(), &mut ctx, gml.client_type.as_deref(), &gml.weight_key)?;
            }
        }

        // Host and link construction is finished. Now set up routing.
        info!("Setting up static routing for the network");
        let Some(mut planner) = ctx.planner.take() else {
            return Err(SetupError::EmptyTopology);
        };
        planner.plan();

        debug!("Assigning {} client nodes to {} edge nodes", ctx.client_count, edges.len());
        let mut subnets = ClientSubnets::new(edges, ctx.clients_per_edge);
        for index in 0..ctx.states.len() {
            if !ctx.states[index].is_client {
                continue;
            }
            let (subnet, edge_idx) = subnets.next_subnet()?;
            ctx.states[index].client_subnet = Some(subnet);
            debug!("Assigned client node {index} to subnet {subnet} owned by edge {edge_idx}");
            ctx.worker.add_client_routes(
                NodeId::new(index),
                &ctx.states[index].client_macs,
                subnet,
                edge_ports[edge_idx],
            )?;
        }

        // Build routes between every pair of client nodes.
        debug!("Adding static routes along paths for all client node pairs");
        let mut seen_unroutable = false;
        let clients: Vec<usize> = ctx
            .states
            .iter()
            .enumerate()
            .filter(|(_, state)| state.is_client)
            .map(|(index, _)| index)
            .collect();
        for (&start, &end) in clients.iter().tuple_combinations() {
            debug!("Constructing route from client {start} to {end}");
            let Some(path) = planner.route(NodeId::new(start), NodeId::new(end)) else {
                if !seen_unroutable {
                    warn!(
                        "Topology contains unconnected client nodes (e.g., {start} to {end} is unroutable)"
                    );
                    seen_unroutable = true;
                }
                continue;
            };
            if path.len() < 2 {
                error!("BUG: route from client {start} to {end} has {} steps", path.len());
                continue;
            }

            let src_subnet = ctx.states[start].client_subnet.unwrap();
            let dst_subnet = ctx.states[end].client_subnet.unwrap();
            for hop in path.windows(2) {
                let (from, to) = (hop[0], hop[1]);
                debug!(
                    "Hop for {start} => {end}: {} => {}",
                    from.index(),
                    to.index()
                );
                ctx.worker.add_internal_routes(
                    from,
                    to,
                    ctx.states[from.index()].addr,
                    ctx.states[to.index()].addr,
                    src_subnet,
                    dst_subnet,
                )?;
            }
        }

        Ok(())
    }

    /// Release the worker's resources and hand it back. The artifacts of the virtual network
    /// itself survive in kernel state.
    pub fn cleanup(mut self) -> Result<W, SetupError> {
        self.worker.cleanup()?;
        Ok(self.worker)
    }
}

/// Validate the edge node table and fill in missing fields. Returns the completed edges.
fn complete_edges<W: Worker>(config: &Config, worker: &mut W) -> Result<Vec<Edge>, SetupError> {
    if config.edge_nodes.is_empty() {
        return Err(SetupError::NoEdgeNodes);
    }

    let mut edges = Vec::with_capacity(config.edge_nodes.len());
    let mut subnets_needed: u32 = 0;
    for edge in &config.edge_nodes {
        let iface = match (&edge.iface, &config.defaults.iface) {
            (Some(iface), _) => iface.clone(),
            (None, Some(default)) => default.clone(),
            (None, None) => return Err(SetupError::MissingInterface(edge.ip)),
        };
        let mac = match edge.mac {
            Some(mac) => mac,
            None => worker.get_edge_remote_mac(&iface, edge.ip).map_err(|source| {
                SetupError::EdgeMacUnresolved { ip: edge.ip, iface: iface.clone(), source }
            })?,
        };
        if edge.vsubnet.is_none() {
            subnets_needed += 1;
        }
        edges.push(Edge {
            ip: edge.ip,
            iface,
            mac,
            // Filled in below for edges without an explicit subnet.
            vsubnet: edge.vsubnet.unwrap_or(config.defaults.global_vsubnet),
        });
    }

    // Automatically provide client subnets to unconfigured edge nodes.
    if subnets_needed > 0 {
        let mut fragments = FragIter::new(config.defaults.global_vsubnet, subnets_needed)?;
        for (edge, cfg) in edges.iter_mut().zip(&config.edge_nodes) {
            if cfg.vsubnet.is_none() {
                edge.vsubnet = fragments
                    .next()
                    .ok_or(SetupError::Internal("exhausted vsubnet fragment iterator"))?;
            }
        }
    }

    for (a, b) in edges.iter().tuple_combinations() {
        if ip::subnets_overlap(&a.vsubnet, &b.vsubnet) {
            return Err(SetupError::OverlappingSubnets(a.vsubnet, b.vsubnet));
        }
    }

    for edge in &edges {
        info!(
            "Configured edge node: IP {}, interface {}, MAC {}, client subnet {}",
            edge.ip, edge.iface, edge.mac, edge.vsubnet
        );
    }
    Ok(edges)
}

/// Per-host state accumulated during the GraphML ingest.
#[derive(Debug, Clone)]
struct NodeState {
    addr: Ipv4Addr,
    is_client: bool,
    client_subnet: Option<Ipv4Net>,
    client_macs: [MacAddr; NEEDED_MACS_CLIENT],
}

/// Parse context implementing the GraphML callbacks. Referenced state is borrowed from the
/// enclosing [`Setup`] frame; everything else is owned and dropped with the context.
struct TopoContext<'a, W> {
    worker: &'a mut W,
    edges: &'a [Edge],

    finished_nodes: bool,
    ignore_nodes: bool,
    ignore_edges: bool,

    states: Vec<NodeState>,
    /// Maps GraphML names to indices into `states`.
    names: HashMap<String, usize>,
    client_count: u32,

    clients_per_edge: f64,
    addrs: AddrIter,
    macs: MacAllocator,
    planner: Option<RoutePlanner>,
}

impl<'a, W: Worker> TopoContext<'a, W> {
    /// Look up the state index for a GraphML name. If the state does not exist and `node` is
    /// given, a new state with a fresh interface address is created.
    fn resolve(&mut self, name: &str, node: Option<&GmlNode>) -> Result<usize, SetupError> {
        if let Some(&index) = self.names.get(name) {
            return Ok(index);
        }
        let Some(node) = node else {
            return Err(SetupError::UnknownNode(name.to_string()));
        };
        let addr = self.addrs.next().ok_or(SetupError::AddrSpaceExhausted)?;
        let index = self.states.len();
        self.states.push(NodeState {
            addr,
            is_client: node.client,
            client_subnet: None,
            client_macs: [MacAddr::ZERO; NEEDED_MACS_CLIENT],
        });
        self.names.insert(name.to_string(), index);
        Ok(index)
    }
}

impl<'a, W: Worker> GmlHandler for TopoContext<'a, W> {
    type Error = SetupError;

    fn add_node(&mut self, node: &GmlNode) -> Result<(), SetupError> {
        if self.ignore_nodes {
            return Ok(());
        }
        if self.finished_nodes {
            return Err(SetupError::NodesAfterEdges);
        }

        let known = self.names.contains_key(&node.name);
        let index = self.resolve(&node.name, Some(node))?;
        if node.client && !known {
            self.states[index].client_macs =
                self.macs.next_block().ok_or(SetupError::MacSpaceExhausted)?;
            self.client_count += 1;
        }

        let state = &self.states[index];
        debug!(
            "GraphML node '{}' assigned identifier {} and IP address {}",
            node.name, index, state.addr
        );
        let macs: &[MacAddr] = if state.is_client { &state.client_macs } else { &[] };
        self.worker
            .add_host(NodeId::new(index), state.addr, macs, node)
            .map_err(SetupError::from)
    }

    fn add_link(&mut self, link: &GmlLink) -> Result<(), SetupError> {
        if self.ignore_edges {
            return Ok(());
        }
        if self.planner.is_none() {
            // The first link ends the host creation phase.
            self.finished_nodes = true;
            info!("Host creation complete. Now adding virtual ethernet connections.");
            debug!("Encountered {} nodes ({} clients)", self.states.len(), self.client_count);

            let edge_count = self.edges.len() as u32;
            if self.client_count < edge_count {
                return Err(SetupError::NotEnoughClients {
                    clients: self.client_count,
                    edges: edge_count,
                });
            }

            let nodes = self.states.len() as u32;
            let worst_case_links = u64::from(nodes) * u64::from(nodes);
            self.worker.ensure_system_scaling(worst_case_links, nodes, self.client_count)?;

            self.clients_per_edge = f64::from(self.client_count) / f64::from(edge_count);
            self.planner = Some(RoutePlanner::new(nodes));
        }

        let source = self.resolve(&link.source, None)?;
        let target = self.resolve(&link.target, None)?;

        if source == target {
            if self.states[source].is_client {
                self.worker.set_self_link(NodeId::new(source), link)?;
            }
            return Ok(());
        }

        let macs: [MacAddr; NEEDED_MACS_LINK] =
            self.macs.next_block().ok_or(SetupError::MacSpaceExhausted)?;
        self.worker.add_link(
            NodeId::new(source),
            NodeId::new(target),
            self.states[source].addr,
            self.states[target].addr,
            &macs,
            link,
        )?;

        if link.weight < 0.0 || link.weight.is_nan() {
            return Err(SetupError::NegativeWeight {
                src_host: link.source.clone(),
                target: link.target.clone(),
                weight: link.weight,
            });
        }
        let planner = self.planner.as_mut().unwrap();
        planner.set_weight(NodeId::new(source), NodeId::new(target), link.weight);
        planner.set_weight(NodeId::new(target), NodeId::new(source), link.weight);
        Ok(())
    }
}

/// Number of client subnets assigned to the edge at `index`. Computed as the difference of
/// rounded cumulative markers (round to nearest, ties to even) instead of an accumulated
/// remainder; the capacities therefore sum to the total client count exactly, independent of how
/// the per-edge ratio is represented.
fn edge_capacity(clients_per_edge: f64, index: usize) -> u32 {
    let prev = (clients_per_edge * index as f64).round_ties_even();
    let next = (clients_per_edge * (index as f64 + 1.0)).round_ties_even();
    (next - prev) as u32
}

/// Walks the edge nodes in order and fragments each edge's virtual subnet into its share of
/// client subnets.
#[derive(Debug)]
struct ClientSubnets<'a> {
    edges: &'a [Edge],
    clients_per_edge: f64,
    edge_idx: usize,
    fragments: Option<FragIter>,
}

impl<'a> ClientSubnets<'a> {
    fn new(edges: &'a [Edge], clients_per_edge: f64) -> Self {
        Self { edges, clients_per_edge, edge_idx: 0, fragments: None }
    }

    /// The next client subnet, together with the index of the edge that owns it.
    fn next_subnet(&mut self) -> Result<(Ipv4Net, usize), SetupError> {
        loop {
            if let Some(fragments) = &mut self.fragments {
                if let Some(subnet) = fragments.next() {
                    return Ok((subnet, self.edge_idx));
                }
                self.fragments = None;
                self.edge_idx += 1;
            }

            let Some(edge) = self.edges.get(self.edge_idx) else {
                return Err(SetupError::Internal("exhausted client node subnet space"));
            };
            let capacity = edge_capacity(self.clients_per_edge, self.edge_idx);
            if capacity == 0 {
                self.edge_idx += 1;
                continue;
            }
            debug!(
                "Now allocating {} client subnets for edge {} (range {})",
                capacity, edge.ip, edge.vsubnet
            );
            self.fragments = Some(FragIter::new(edge.vsubnet, capacity)?);
        }
    }
}
