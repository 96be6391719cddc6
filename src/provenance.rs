//! Provenance of table entries.
//!
//! Every entry records where it came from as a node `(bag, subset, left,
//! right)` in a flat arena: `subset` are the colors active at `bag`, and
//! `left`/`right` are the nodes of the entries it was built from. Nodes are
//! plain values, so identical nodes are shared through an interning lookup.
//! The lookup is cleared at well-defined points (evaluation start, after
//! each Join) to keep its memory bounded; the arena itself only grows.

use std::collections::HashMap;

use crate::canonical::CanonicalDecomposition;
use crate::color_set::ColorSet;
use crate::metrics::Metrics;
use crate::table::DetState;
use crate::types::BagId;
use crate::vertex_set::VertexSet;

/// Index of a node in a [`Provenance`] arena.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct ProvId(u32);

impl ProvId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct ProvNode {
    pub bag: BagId,
    pub subset: ColorSet,
    pub left: Option<ProvId>,
    pub right: Option<ProvId>,
}

#[derive(Debug, Default)]
pub struct Provenance {
    nodes: Vec<ProvNode>,
    lookup: HashMap<ProvNode, ProvId, DetState>,
}

impl Provenance {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the id of `node`, allocating it unless an identical node is
    /// still in the lookup.
    pub fn intern(&mut self, node: ProvNode, metrics: &mut Metrics) -> ProvId {
        if let Some(&id) = self.lookup.get(&node) {
            metrics.provenance_hits += 1;
            return id;
        }
        metrics.provenance_misses += 1;
        let id = ProvId(self.nodes.len() as u32);
        self.nodes.push(node);
        self.lookup.insert(node, id);
        metrics.provenance_nodes = self.nodes.len();
        id
    }

    pub fn node(&self, id: ProvId) -> &ProvNode {
        &self.nodes[id.index()]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn clear_lookup(&mut self) {
        self.lookup.clear();
    }

    /// Collects every vertex that was active in some node reachable from `root`.
    pub fn collect_vertices(&self, root: ProvId, td: &CanonicalDecomposition) -> VertexSet {
        let mut vertices = VertexSet::default();
        let mut visited = vec![false; self.nodes.len()];
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            if std::mem::replace(&mut visited[id.index()], true) {
                continue;
            }
            let node = self.node(id);
            let bag = td.bag(node.bag);
            vertices.extend(node.subset.iter().filter_map(|c| bag.vertex_of(c)));
            stack.extend(node.left);
            stack.extend(node.right);
        }
        vertices
    }
}
