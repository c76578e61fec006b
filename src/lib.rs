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

#![deny(missing_docs, missing_debug_implementations)]

//! # NetCarve
//!
//! This is a library for turning a GraphML network topology into an emulated virtual network on a
//! physical host.
//!
//! Given a set of *edge nodes* (physical machines that bridge real traffic into the emulation) and
//! a GraphML file of hosts and weighted links, the library assigns IPv4 and MAC address space,
//! partitions the client address range across the edge nodes, instantiates every virtual host and
//! link through a [`worker::Worker`] backend, and emits static forwarding entries so that every
//! pair of client hosts can reach each other along shortest paths.
//!
//! ## Main Concepts
//!
//! The [`setup::Setup`] structure is the main entry point. Constructing it validates and completes
//! the edge node table (resolving interfaces, MAC addresses and virtual subnets), and
//! [`setup::Setup::build_topology`] runs the whole pipeline: root namespace installation, GraphML
//! ingest, shortest-path planning with [`routing::RoutePlanner`], client-to-edge assignment, and
//! per-pair route emission.
//!
//! The low-level realization of namespaces, links and kernel routes is behind the
//! [`worker::Worker`] trait. The crate ships [`worker::DryRunWorker`], which only logs what would
//! be done; real backends live outside this crate.
//!
//! ## Example usage
//!
//! ```no_run
//! use netcarve::prelude::*;
//!
//! fn main() -> Result<(), SetupError> {
//!     let mut config = Config::default();
//!     config.src_file = Some("topology.graphml".into());
//!     config.edge_nodes.push("10.0.0.1,eth0,aa:bb:cc:dd:ee:ff,192.168.0.0/24".parse().unwrap());
//!
//!     let mut setup = Setup::new(config, DryRunWorker::default())?;
//!     setup.destroy_network()?;
//!     setup.build_topology()?;
//!     setup.cleanup()?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod graphml;
pub mod ip;
pub mod mac;
pub mod prelude;
pub mod routing;
pub mod setup;
pub mod types;
pub mod worker;

#[cfg(test)]
mod test;
