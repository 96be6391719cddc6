//! The Steiner tree dynamic program.
//!
//! Tables are [`DpTable`]s: for every active subset of the bag, the
//! cheapest partial forests keyed by the [`Partition`] of the active colors
//! into connected classes. Every terminal of a bag is active; a non-terminal
//! is active iff the partial forest uses it.
//!
//! Reductions ([`crate::rank::reduce`]) run at the points and thresholds
//! given by [`ReductionConfig`]:
//! - on each child subset before Introduce extends it,
//! - after edges are introduced (the batched strategy reduces while it goes),
//! - on every narrowed subset after Forget,
//! - on both operands of a Join. The Join result itself is left alone; the
//!   next step reduces it.

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashSet};

use log::trace;

use crate::canonical::CanonicalDecomposition;
use crate::color_set::ColorSet;
use crate::config::ReductionConfig;
use crate::eval::DpAlgorithm;
use crate::graph::Graph;
use crate::metrics::Metrics;
use crate::partition::Partition;
use crate::provenance::{ProvNode, Provenance};
use crate::rank::{reduce, EchelonBasis};
use crate::table::{DetState, DpTable, Entry, SubsetTable};
use crate::types::{BagId, Color, Cost, EdgeId, VertexId};

/// An edge in bag-local terms: both endpoint colors and the weight.
#[derive(Debug, Copy, Clone)]
struct LocalEdge {
    a: Color,
    b: Color,
    weight: Cost,
}

pub struct SteinerDp<'a> {
    graph: &'a Graph,
    config: &'a ReductionConfig,
    provenance: Provenance,
}

impl<'a> SteinerDp<'a> {
    pub fn new(graph: &'a Graph, config: &'a ReductionConfig) -> Self {
        SteinerDp {
            graph,
            config,
            provenance: Provenance::new(),
        }
    }

    pub fn provenance(&self) -> &Provenance {
        &self.provenance
    }

    pub fn into_provenance(self) -> Provenance {
        self.provenance
    }

    /// Unions the endpoints of `edge` in every entry where they are apart,
    /// keeping the original entries.
    fn introduce_edge(&self, table: &mut SubsetTable, edge: LocalEdge, metrics: &mut Metrics) {
        let snapshot: Vec<(Partition, Entry)> = table.iter().map(|(p, e)| (*p, *e)).collect();
        for (p, e) in snapshot {
            let mut q = p;
            if q.union(edge.a, edge.b) {
                table.upsert(q, Entry::new(e.cost.saturating_add(edge.weight), e.origin));
                metrics.entries_created += 1;
            }
        }
    }

    /// Introduces all `edges` at once, expanding entries in ascending cost
    /// order and extending only those independent of the cheaper ones.
    ///
    /// Extending a dependent entry is pointless: the same edges could be
    /// added to the entries spanning it.
    fn introduce_batched(&self, table: SubsetTable, edges: &[LocalEdge], metrics: &mut Metrics) -> SubsetTable {
        let subset = table.subset();
        let before = table.len();
        let mut basis = EchelonBasis::new(subset);
        let mut pending = table.into_entries();
        let mut heap: BinaryHeap<Reverse<(Cost, usize)>> =
            pending.iter().enumerate().map(|(i, (_, e))| Reverse((e.cost, i))).collect();
        let mut seen: HashSet<Partition, DetState> = HashSet::default();
        let mut result = SubsetTable::new(subset);

        while let Some(Reverse((cost, i))) = heap.pop() {
            let (p, entry) = pending[i];
            if !seen.insert(p) || !basis.insert(&p, metrics) {
                continue;
            }
            result.upsert(p, entry);

            for edge in edges {
                let mut q = p;
                if q.union(edge.a, edge.b) {
                    let next = Entry::new(cost.saturating_add(edge.weight), entry.origin);
                    heap.push(Reverse((next.cost, pending.len())));
                    pending.push((q, next));
                    metrics.entries_created += 1;
                }
            }
        }

        metrics.reductions += 1;
        trace!(
            "Batched {} edges into subset {}: {} -> {} entries ({} generated)",
            edges.len(),
            subset,
            before,
            result.len(),
            pending.len()
        );
        result
    }
}

impl DpAlgorithm for SteinerDp<'_> {
    type Table = DpTable;

    fn leaf(&mut self, _td: &CanonicalDecomposition, _bag: BagId, _metrics: &mut Metrics) -> DpTable {
        self.provenance.clear_lookup();
        DpTable::leaf()
    }

    fn introduce(
        &mut self,
        td: &CanonicalDecomposition,
        bag: BagId,
        table: DpTable,
        vertices: &[VertexId],
        metrics: &mut Metrics,
    ) -> DpTable {
        let (terminals, others): (Vec<VertexId>, Vec<VertexId>) =
            vertices.iter().partition(|&&v| self.graph.is_terminal(v));
        let required = td.color_set(&terminals);
        let optional: Vec<Color> = td.color_set(&others).iter().collect();

        let mut result = DpTable::new();
        for child in table {
            let child = reduce(child, self.config.before_extend, self.config, metrics);
            for mask in 0..(1u64 << optional.len()) {
                let add: ColorSet = optional
                    .iter()
                    .enumerate()
                    .filter(|&(j, _)| (mask >> j) & 1 == 1)
                    .map(|(_, &c)| c)
                    .chain(required)
                    .collect();
                let subset = child.subset().union(add);

                let mut out = SubsetTable::new(subset);
                for (p, e) in child.iter() {
                    let node = ProvNode {
                        bag,
                        subset,
                        left: e.origin,
                        right: None,
                    };
                    let origin = self.provenance.intern(node, metrics);
                    out.upsert(p.activate(add), Entry::new(e.cost, Some(origin)));
                }
                metrics.entries_created += out.len() as u64;
                result.insert_subset(out);
            }
        }

        trace!(
            "Introduced {} terminals and {} other vertices at {}: {} subsets, {} entries",
            terminals.len(),
            others.len(),
            bag,
            result.num_subsets(),
            result.len()
        );
        result
    }

    fn forget(
        &mut self,
        td: &CanonicalDecomposition,
        bag: BagId,
        table: DpTable,
        vertices: &[VertexId],
        metrics: &mut Metrics,
    ) -> DpTable {
        let gone = td.color_set(vertices);
        let mut narrowed = DpTable::new();
        let mut dropped = 0usize;

        for child in table {
            let subset = child.subset().difference(gone);
            for (p, e) in child.iter() {
                // A class made only of forgotten vertices can never be connected again.
                if p.count_components_in(subset) != p.count_components() {
                    dropped += 1;
                    continue;
                }
                narrowed.upsert(p.restrict(subset), *e);
            }
        }

        let mut result = DpTable::new();
        for t in narrowed {
            result.insert_subset(reduce(t, self.config.after_forget, self.config, metrics));
        }
        trace!("Forgot {} vertices at {}: {} entries dropped", vertices.len(), bag, dropped);
        result
    }

    fn join(
        &mut self,
        _td: &CanonicalDecomposition,
        bag: BagId,
        left: DpTable,
        mut right: DpTable,
        metrics: &mut Metrics,
    ) -> DpTable {
        let mut result = DpTable::new();
        let mut rejected = 0usize;

        for l in left {
            let subset = l.subset();
            let Some(r) = right.remove_subset(subset) else {
                continue;
            };
            if l.is_empty() || r.is_empty() {
                continue;
            }
            let l = reduce(l, self.config.before_join, self.config, metrics);
            let r = reduce(r, self.config.before_join, self.config, metrics);

            let mut out = SubsetTable::new(subset);
            for (lp, le) in l.iter() {
                for (rp, re) in r.iter() {
                    let Some(q) = lp.merge(rp) else {
                        rejected += 1;
                        continue;
                    };
                    let node = ProvNode {
                        bag,
                        subset,
                        left: le.origin,
                        right: re.origin,
                    };
                    let origin = self.provenance.intern(node, metrics);
                    out.upsert(q, Entry::new(le.cost.saturating_add(re.cost), Some(origin)));
                    metrics.entries_created += 1;
                }
            }
            result.insert_subset(out);
        }

        self.provenance.clear_lookup();
        trace!("Joined at {}: {} entries, {} pairs would close a cycle", bag, result.len(), rejected);
        result
    }

    fn introduce_edges(
        &mut self,
        td: &CanonicalDecomposition,
        _bag: BagId,
        table: DpTable,
        edges: &[EdgeId],
        metrics: &mut Metrics,
    ) -> DpTable {
        if edges.is_empty() {
            return table;
        }
        let edges: Vec<LocalEdge> = edges
            .iter()
            .map(|&e| {
                let edge = self.graph.edge(e);
                LocalEdge {
                    a: td.color_of(edge.u),
                    b: td.color_of(edge.v),
                    weight: edge.weight,
                }
            })
            .collect();

        let mut result = DpTable::new();
        for mut t in table {
            let subset = t.subset();
            let applicable: Vec<LocalEdge> = edges
                .iter()
                .copied()
                .filter(|e| subset.contains(e.a) && subset.contains(e.b))
                .collect();

            if applicable.len() >= self.config.batched_edge_minimum.max(1) {
                t = self.introduce_batched(t, &applicable, metrics);
            } else {
                for &edge in &applicable {
                    self.introduce_edge(&mut t, edge, metrics);
                    t = reduce(t, self.config.after_edge, self.config, metrics);
                }
            }
            result.insert_subset(t);
        }
        result
    }

    fn table_size(&self, table: &DpTable) -> usize {
        table.len()
    }
}
