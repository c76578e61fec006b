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

use std::path::PathBuf;

use clap::Parser;

use netcarve::prelude::*;

/// Carve a physical host into an emulated virtual network described by a GraphML topology.
///
/// The system changes that would be performed are written to the log; build with a real worker
/// backend to apply them. Verbosity is controlled through RUST_LOG.
#[derive(Debug, Parser)]
#[clap(version, about)]
struct Cli {
    /// Path to the TOML setup file.
    #[clap(long, short)]
    config: Option<PathBuf>,
    /// GraphML topology file. Overrides the setup file; use '-' to read from stdin.
    #[clap(long, short)]
    topology: Option<PathBuf>,
    /// Edge node specification "ip[,iface][,mac][,subnet]". May be repeated; appended to the edge
    /// nodes from the setup file.
    #[clap(long = "edge-node", short = 'e')]
    edge_nodes: Vec<EdgeNode>,
    /// Default interface for edge nodes that do not specify one.
    #[clap(long, short)]
    iface: Option<String>,
    /// Read the topology twice, so that <node> elements may appear after <edge> elements.
    #[clap(long)]
    two_pass: bool,
    /// Value of the node 'type' attribute that marks client nodes. Without it, every node is a
    /// client.
    #[clap(long)]
    client_type: Option<String>,
    /// Edge attribute used as the routing weight.
    #[clap(long)]
    weight_key: Option<String>,
    /// Destroy a previously created virtual network and exit.
    #[clap(long)]
    destroy: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    pretty_env_logger::init_timed();

    let args = Cli::parse();
    let mut config = match &args.config {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    };
    if let Some(topology) = args.topology {
        config.src_file = (topology.as_os_str() != "-").then_some(topology);
    }
    config.edge_nodes.extend(args.edge_nodes);
    if args.iface.is_some() {
        config.defaults.iface = args.iface;
    }
    if args.two_pass {
        config.graphml.two_pass = true;
    }
    if args.client_type.is_some() {
        config.graphml.client_type = args.client_type;
    }
    if let Some(weight_key) = args.weight_key {
        config.graphml.weight_key = weight_key;
    }

    let mut setup = Setup::new(config, DryRunWorker::default())?;
    let result = run(&mut setup, args.destroy);
    setup.cleanup()?;
    result?;
    Ok(())
}

fn run(setup: &mut Setup<DryRunWorker>, destroy_only: bool) -> Result<(), SetupError> {
    setup.destroy_network()?;
    if !destroy_only {
        setup.build_topology()?;
    }
    Ok(())
}
