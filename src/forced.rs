//! Forced edges.
//!
//! Scanning the edges like Kruskal does (ascending weight, edges between
//! two terminals first among equal weights), an edge that joins two
//! components and has terminals at both ends belongs to some minimum
//! Steiner tree: any tree must cross the cut between the two components,
//! and no crossing edge is lighter.

use log::debug;

use crate::graph::Graph;
use crate::types::EdgeId;
use crate::union_find::UnionFind;

/// Returns the forced edges of `graph` in scan order.
pub fn forced_edges(graph: &Graph) -> Vec<EdgeId> {
    let mut order: Vec<EdgeId> = graph.edges().map(|(e, _)| e).collect();
    let between_terminals = |e: EdgeId| {
        let edge = graph.edge(e);
        graph.is_terminal(edge.u) && graph.is_terminal(edge.v)
    };
    order.sort_by_key(|&e| (graph.edge(e).weight, !between_terminals(e)));

    let mut uf = UnionFind::new(graph.num_vertices());
    let mut forced = Vec::new();
    for e in order {
        let edge = graph.edge(e);
        if !uf.union(edge.u.index(), edge.v.index()) {
            continue;
        }
        if between_terminals(e) {
            forced.push(e);
        }
    }

    debug!("Found {} forced edges", forced.len());
    forced
}
