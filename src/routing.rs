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

//! Static route planning. The planner computes shortest paths over the weighted link graph; no
//! messages are exchanged, the converged forwarding decision is computed directly.

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};

use ordered_float::NotNan;
use petgraph::visit::EdgeRef;
use petgraph::{Directed, Graph};

use crate::types::{IndexType, LinkWeight, NodeId};

/// Shortest-path planner over a fixed set of nodes.
///
/// The caller first registers all link weights with [`RoutePlanner::set_weight`] (both directions
/// for an undirected link), freezes the graph with [`RoutePlanner::plan`], and then queries paths
/// with [`RoutePlanner::route`]. Shortest-path trees are computed per source on first use and
/// cached, so querying all pairs costs one Dijkstra run per distinct source.
#[derive(Debug, Clone)]
pub struct RoutePlanner {
    graph: Graph<(), LinkWeight, Directed, IndexType>,
    planned: bool,
    /// Parent pointers of the shortest-path tree, per source.
    trees: HashMap<NodeId, Vec<Option<NodeId>>>,
}

impl RoutePlanner {
    /// Create a planner for `nodes` nodes with no links. Node ids `0..nodes` index directly into
    /// the graph.
    pub fn new(nodes: u32) -> Self {
        let mut graph = Graph::with_capacity(nodes as usize, nodes as usize);
        (0..nodes).for_each(|_| {
            graph.add_node(());
        });
        Self { graph, planned: false, trees: HashMap::new() }
    }

    /// The number of nodes the planner was created with.
    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Set or overwrite the weight of the directed link from `source` to `target`. Weights must be
    /// non-negative and must not change after [`RoutePlanner::plan`].
    pub fn set_weight(&mut self, source: NodeId, target: NodeId, weight: LinkWeight) {
        debug_assert!(!self.planned, "weights must not change after planning");
        debug_assert!(weight >= 0.0, "link weights must be non-negative");
        self.graph.update_edge(source, target, weight);
    }

    /// Freeze the graph. Weights registered afterwards would invalidate cached trees.
    pub fn plan(&mut self) {
        self.planned = true;
    }

    /// Shortest path from `source` to `target`, including both endpoints. Returns `None` if the
    /// target is unreachable. `route(s, s)` yields a single-element path.
    pub fn route(&mut self, source: NodeId, target: NodeId) -> Option<Vec<NodeId>> {
        debug_assert!(self.planned, "route() called before plan()");
        let parents = self
            .trees
            .entry(source)
            .or_insert_with(|| shortest_path_tree(&self.graph, source));

        let mut path = vec![target];
        let mut current = target;
        while current != source {
            current = parents[current.index()]?;
            path.push(current);
        }
        path.reverse();
        Some(path)
    }
}

/// Dijkstra from `source` over the full graph. Ties are broken towards the lower node id by the
/// heap ordering, which makes the resulting parent pointers deterministic.
fn shortest_path_tree(
    graph: &Graph<(), LinkWeight, Directed, IndexType>,
    source: NodeId,
) -> Vec<Option<NodeId>> {
    let n = graph.node_count();
    let mut dist = vec![LinkWeight::INFINITY; n];
    let mut parent: Vec<Option<NodeId>> = vec![None; n];
    let mut heap: BinaryHeap<Reverse<(NotNan<LinkWeight>, NodeId)>> = BinaryHeap::new();

    dist[source.index()] = 0.0;
    // Weights are validated to be finite and non-negative before they enter the graph.
    heap.push(Reverse((NotNan::new(0.0).unwrap(), source)));

    while let Some(Reverse((cost, node))) = heap.pop() {
        if *cost > dist[node.index()] {
            continue;
        }
        for edge in graph.edges(node) {
            let next = edge.target();
            let next_cost = *cost + *edge.weight();
            if next_cost < dist[next.index()] {
                dist[next.index()] = next_cost;
                parent[next.index()] = Some(node);
                heap.push(Reverse((NotNan::new(next_cost).unwrap(), next)));
            }
        }
    }

    parent
}
