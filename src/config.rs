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

//! This module contains the code for reading the configuration.
//!
//! The configuration is a TOML file; every field has a default, so a minimal setup only needs the
//! edge node list and a topology file. The binary merges command-line flags on top. The snapshot
//! is threaded by reference through all setup stages and never changes afterwards.

use std::net::Ipv4Addr;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use ipnet::Ipv4Net;
use serde::Deserialize;
use thiserror::Error;

use crate::mac::MacAddr;

/// Errors raised while loading the configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("Cannot read '{0}': {1}")]
    Io(PathBuf, std::io::Error),
    /// The configuration file is not valid TOML.
    #[error("Cannot parse the configuration: {0}")]
    Toml(#[from] toml::de::Error),
    /// An `--edge-node` specification on the command line is malformed.
    #[error("Invalid edge node specification '{0}'. Expected \"ip[,iface][,mac][,subnet]\".")]
    BadEdgeNode(String),
}

/// A single edge node. Only the physical IP is mandatory; the interface falls back to the global
/// default, the MAC address is discovered through the worker, and the virtual subnet is carved
/// out of the global client subnet.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct EdgeNode {
    /// Physical IP address of the edge node.
    pub ip: Ipv4Addr,
    /// Local interface behind which the edge node is reachable.
    #[serde(default)]
    pub iface: Option<String>,
    /// MAC address of the edge node.
    #[serde(default)]
    pub mac: Option<MacAddr>,
    /// Virtual client subnet served by this edge node.
    #[serde(default)]
    pub vsubnet: Option<Ipv4Net>,
}

impl FromStr for EdgeNode {
    type Err = ConfigError;

    /// Parse a comma-separated edge node specification. The first element is the IP address;
    /// the remaining elements are classified by shape: anything containing `/` is the virtual
    /// subnet, anything containing `:` is the MAC address, and everything else is the interface.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bad = || ConfigError::BadEdgeNode(s.to_string());
        let mut parts = s.split(',');
        let ip = parts.next().ok_or_else(bad)?.trim().parse().map_err(|_| bad())?;
        let mut edge = EdgeNode { ip, iface: None, mac: None, vsubnet: None };
        for part in parts {
            let part = part.trim();
            if part.contains('/') {
                let net: Ipv4Net = part.parse().map_err(|_| bad())?;
                edge.vsubnet = Some(net.trunc());
            } else if part.contains(':') {
                edge.mac = Some(part.parse().map_err(|_| bad())?);
            } else if !part.is_empty() {
                edge.iface = Some(part.to_string());
            }
        }
        Ok(edge)
    }
}

/// Fallback values applied to edge nodes with missing fields.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EdgeDefaults {
    /// Interface used by edge nodes that do not specify one.
    pub iface: Option<String>,
    /// The global client subnet that is fragmented across edge nodes without an explicit virtual
    /// subnet.
    pub global_vsubnet: Ipv4Net,
}

impl Default for EdgeDefaults {
    fn default() -> Self {
        Self {
            iface: None,
            global_vsubnet: "10.0.0.0/8".parse().unwrap(),
        }
    }
}

/// Options controlling the GraphML ingest.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GraphMlParams {
    /// Read the file twice, so that `<node>` elements may appear after `<edge>` elements. Not
    /// available when reading from stdin.
    pub two_pass: bool,
    /// Value of a node's `type` attribute that marks it as a client. When unset, every node is a
    /// client.
    pub client_type: Option<String>,
    /// Name of the edge attribute used as the routing weight.
    pub weight_key: String,
}

impl Default for GraphMlParams {
    fn default() -> Self {
        Self { two_pass: false, client_type: None, weight_key: "latency".to_string() }
    }
}

/// The complete configuration snapshot for one setup run.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Prefix for the network namespace names owned by this emulator instance.
    pub ns_prefix: String,
    /// Open vSwitch working directory. `None` uses the backend default.
    pub ovs_dir: Option<PathBuf>,
    /// Open vSwitch database schema path. `None` uses the backend default.
    pub ovs_schema: Option<PathBuf>,
    /// Soft memory cap for the backend in bytes. Zero disables the cap.
    pub soft_mem_cap: u64,
    /// The GraphML topology file. `None` reads from stdin.
    pub src_file: Option<PathBuf>,
    /// Fallbacks for underspecified edge nodes.
    pub defaults: EdgeDefaults,
    /// GraphML ingest options.
    pub graphml: GraphMlParams,
    /// The edge nodes bridging real traffic into the emulation.
    pub edge_nodes: Vec<EdgeNode>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            ns_prefix: "nc".to_string(),
            ovs_dir: None,
            ovs_schema: None,
            soft_mem_cap: 0,
            src_file: None,
            defaults: EdgeDefaults::default(),
            graphml: GraphMlParams::default(),
            edge_nodes: Vec::new(),
        }
    }
}

impl Config {
    /// Load a configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(path.to_path_buf(), e))?;
        Ok(toml::from_str(&raw)?)
    }
}
