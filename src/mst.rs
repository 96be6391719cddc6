//! Kruskal spanning trees over a vertex subset.
//!
//! Used to turn the vertex set recovered from the DP provenance into
//! an explicit edge set.

use crate::graph::Graph;
use crate::types::EdgeId;
use crate::union_find::UnionFind;
use crate::vertex_set::VertexSet;

/// Minimum spanning forest of the subgraph induced by `vertices`.
///
/// Ties are broken by the smaller endpoint, then the larger endpoint.
pub fn spanning_tree(graph: &Graph, vertices: &VertexSet) -> Vec<EdgeId> {
    let mut candidates: Vec<EdgeId> = graph
        .edges()
        .filter(|(_, e)| vertices.contains(e.u) && vertices.contains(e.v))
        .map(|(id, _)| id)
        .collect();
    candidates.sort_by_key(|&id| {
        let edge = graph.edge(id);
        let (lo, hi) = edge.endpoints();
        (edge.weight, lo, hi, id)
    });

    let mut uf = UnionFind::new(graph.num_vertices());
    candidates
        .into_iter()
        .filter(|&id| {
            let edge = graph.edge(id);
            uf.union(edge.u.index(), edge.v.index())
        })
        .collect()
}
