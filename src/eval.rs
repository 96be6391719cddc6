//! Bottom-up evaluation of a canonical decomposition.
//!
//! A [`DpAlgorithm`] supplies the per-bag table operations; the
//! [`Evaluator`] walks the decomposition children-first and decides which
//! operation each bag needs:
//!
//! - no children: [`leaf`][DpAlgorithm::leaf], then an introduce of the whole bag,
//! - one child: an introduce or a forget of the vertices that differ,
//!   or nothing when the bags are equal,
//! - two children: each child table is aligned to the join bag by an
//!   introduce, then [`join`][DpAlgorithm::join].
//!
//! Every bag finishes with [`introduce_edges`][DpAlgorithm::introduce_edges]
//! for the edges assigned to it.

use std::time::Instant;

use log::debug;

use crate::canonical::{CanonicalDecomposition, Step};
use crate::error::SteinerError;
use crate::graph::Graph;
use crate::metrics::Metrics;
use crate::types::{BagId, EdgeId, VertexId};

/// Table operations of a dynamic program over tree decompositions.
pub trait DpAlgorithm {
    type Table;

    /// The table of an empty bag with nothing chosen.
    fn leaf(&mut self, td: &CanonicalDecomposition, bag: BagId, metrics: &mut Metrics) -> Self::Table;

    /// Adds `vertices` of `bag` to a table of a subset of `bag`.
    fn introduce(
        &mut self,
        td: &CanonicalDecomposition,
        bag: BagId,
        table: Self::Table,
        vertices: &[VertexId],
        metrics: &mut Metrics,
    ) -> Self::Table;

    /// Drops `vertices`, which are not in `bag`, from a child table.
    fn forget(
        &mut self,
        td: &CanonicalDecomposition,
        bag: BagId,
        table: Self::Table,
        vertices: &[VertexId],
        metrics: &mut Metrics,
    ) -> Self::Table;

    /// Combines two tables over the vertices of `bag`.
    fn join(
        &mut self,
        td: &CanonicalDecomposition,
        bag: BagId,
        left: Self::Table,
        right: Self::Table,
        metrics: &mut Metrics,
    ) -> Self::Table;

    /// Applies the graph edges assigned to `bag`.
    fn introduce_edges(
        &mut self,
        td: &CanonicalDecomposition,
        bag: BagId,
        table: Self::Table,
        edges: &[EdgeId],
        metrics: &mut Metrics,
    ) -> Self::Table;

    /// Number of entries, for logging and metrics.
    fn table_size(&self, table: &Self::Table) -> usize;
}

/// Drives a [`DpAlgorithm`] over a canonical decomposition.
pub struct Evaluator<'a> {
    td: &'a CanonicalDecomposition,
    graph: &'a Graph,
}

impl<'a> Evaluator<'a> {
    pub fn new(td: &'a CanonicalDecomposition, graph: &'a Graph) -> Self {
        Evaluator { td, graph }
    }

    /// Evaluates every bag and returns the table of the root.
    pub fn run<A: DpAlgorithm>(&self, algo: &mut A, metrics: &mut Metrics) -> Result<A::Table, SteinerError> {
        let td = self.td;
        if let Some(id) = td.ids().find(|&id| td.bag(id).children().len() > 2) {
            return Err(SteinerError::TooManyChildren {
                bag: id,
                children: td.bag(id).children().len(),
            });
        }

        let mut tables: Vec<Option<A::Table>> = (0..td.num_bags()).map(|_| None).collect();
        for id in td.ids() {
            let mut children = Vec::with_capacity(2);
            for &child in td.bag(id).children() {
                match tables[child.index()].take() {
                    Some(table) => children.push((child, table)),
                    None => panic!("Table of {} is missing when evaluating {}", child, id),
                }
            }

            let table = self.step(algo, id, children, metrics);
            let start = Instant::now();
            let table = algo.introduce_edges(td, id, table, td.bag(id).introduce_edges(), metrics);
            metrics.introduce_edges.record(start.elapsed());

            let size = algo.table_size(&table);
            metrics.bags += 1;
            metrics.observe_table(size);
            debug!(
                "Bag {} ({}, {} vertices, {} edges): {} entries",
                id,
                td.step(id).name(),
                td.bag(id).len(),
                td.bag(id).introduce_edges().len(),
                size
            );
            tables[id.index()] = Some(table);
        }

        match tables[td.root().index()].take() {
            Some(table) => Ok(table),
            None => panic!("Root {} was not evaluated", td.root()),
        }
    }

    fn step<A: DpAlgorithm>(
        &self,
        algo: &mut A,
        id: BagId,
        mut children: Vec<(BagId, A::Table)>,
        metrics: &mut Metrics,
    ) -> A::Table {
        let td = self.td;
        match td.step(id) {
            Step::Leaf => {
                let start = Instant::now();
                let table = algo.leaf(td, id, metrics);
                metrics.leaf.record(start.elapsed());
                if td.bag(id).is_empty() {
                    return table;
                }
                let start = Instant::now();
                let table = algo.introduce(td, id, table, td.bag(id).vertices(), metrics);
                metrics.introduce.record(start.elapsed());
                table
            }
            Step::Introduce => {
                let (child, table) = children.remove(0);
                let vertices = td.difference(id, child);
                let start = Instant::now();
                let table = algo.introduce(td, id, table, &vertices, metrics);
                metrics.introduce.record(start.elapsed());
                table
            }
            Step::Forget => {
                let (child, table) = children.remove(0);
                let vertices = self.forget_order(child, td.difference(child, id));
                let start = Instant::now();
                let table = algo.forget(td, id, table, &vertices, metrics);
                metrics.forget.record(start.elapsed());
                table
            }
            Step::Pass => children.remove(0).1,
            Step::Join => {
                let mut aligned = Vec::with_capacity(2);
                for (child, table) in children {
                    let missing = td.difference(id, child);
                    if missing.is_empty() {
                        aligned.push(table);
                    } else {
                        let start = Instant::now();
                        aligned.push(algo.introduce(td, id, table, &missing, metrics));
                        metrics.introduce.record(start.elapsed());
                    }
                }
                let (Some(right), Some(left)) = (aligned.pop(), aligned.pop()) else {
                    panic!("Join bag {} needs two children", id);
                };
                let start = Instant::now();
                let table = algo.join(td, id, left, right, metrics);
                metrics.join.record(start.elapsed());
                table
            }
        }
    }

    /// Orders forgotten vertices by how many neighbors they have in the
    /// child bag, most first.
    fn forget_order(&self, child: BagId, mut vertices: Vec<VertexId>) -> Vec<VertexId> {
        let in_bag = |v: VertexId| {
            self.graph
                .neighbors(v)
                .filter(|&(_, w)| self.td.bag_contains(child, w))
                .count()
        };
        vertices.sort_by_key(|&v| std::cmp::Reverse(in_bag(v)));
        vertices
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;
    use crate::config::SolverConfig;
    use crate::decomposition::TreeDecomposition;

    /// Records the operations it is asked to perform.
    struct TraceDp;

    impl DpAlgorithm for TraceDp {
        type Table = Vec<String>;

        fn leaf(&mut self, _td: &CanonicalDecomposition, bag: BagId, _metrics: &mut Metrics) -> Vec<String> {
            vec![format!("leaf {}", bag)]
        }

        fn introduce(
            &mut self,
            _td: &CanonicalDecomposition,
            bag: BagId,
            mut table: Vec<String>,
            vertices: &[VertexId],
            _metrics: &mut Metrics,
        ) -> Vec<String> {
            table.push(format!("introduce {} {}", bag, vertices.len()));
            table
        }

        fn forget(
            &mut self,
            _td: &CanonicalDecomposition,
            bag: BagId,
            mut table: Vec<String>,
            vertices: &[VertexId],
            _metrics: &mut Metrics,
        ) -> Vec<String> {
            table.push(format!("forget {} {}", bag, vertices.len()));
            table
        }

        fn join(
            &mut self,
            _td: &CanonicalDecomposition,
            bag: BagId,
            mut left: Vec<String>,
            right: Vec<String>,
            _metrics: &mut Metrics,
        ) -> Vec<String> {
            left.extend(right);
            left.push(format!("join {}", bag));
            left
        }

        fn introduce_edges(
            &mut self,
            _td: &CanonicalDecomposition,
            bag: BagId,
            mut table: Vec<String>,
            edges: &[EdgeId],
            _metrics: &mut Metrics,
        ) -> Vec<String> {
            table.push(format!("edges {} {}", bag, edges.len()));
            table
        }

        fn table_size(&self, table: &Vec<String>) -> usize {
            table.len()
        }
    }

    fn v(i: u32) -> VertexId {
        VertexId::new(i)
    }

    #[test]
    fn test_path_trace() {
        let mut g = Graph::new(3);
        g.add_edge(v(0), v(1), 1);
        g.add_edge(v(1), v(2), 1);
        g.set_terminal(v(0), true);
        g.set_terminal(v(2), true);
        let raw = TreeDecomposition::path(vec![vec![v(0), v(1)], vec![v(1), v(2)]]);
        let td = CanonicalDecomposition::build(&raw, &g, &SolverConfig::default()).expect("valid");

        let mut metrics = Metrics::default();
        let trace = Evaluator::new(&td, &g).run(&mut TraceDp, &mut metrics).expect("binary");
        assert_eq!(
            trace,
            vec![
                "leaf B0",
                "introduce B0 2",
                "edges B0 1",
                "forget B1 1",
                "edges B1 0",
                "introduce B2 1",
                "edges B2 1",
            ]
        );
        assert_eq!(metrics.bags, 3);
        assert_eq!(metrics.leaf.count, 1);
        assert_eq!(metrics.introduce.count, 2);
        assert_eq!(metrics.forget.count, 1);
        assert_eq!(metrics.introduce_edges.count, 3);
    }

    #[test]
    fn test_join_aligns_children() {
        // Bag {0,1} joins {0,2} and {1,3}; narrowed children {0} and {1}
        // are each aligned to {0,1} before the join.
        let mut g = Graph::new(4);
        g.add_edge(v(0), v(1), 1);
        g.add_edge(v(0), v(2), 1);
        g.add_edge(v(1), v(3), 1);
        for i in 0..4 {
            g.set_terminal(v(i), true);
        }
        let raw = TreeDecomposition::new(
            vec![vec![v(0), v(1)], vec![v(0), v(2)], vec![v(1), v(3)]],
            vec![(BagId::new(0), BagId::new(1)), (BagId::new(0), BagId::new(2))],
        );
        let td = CanonicalDecomposition::build(&raw, &g, &SolverConfig::default()).expect("valid");

        let mut metrics = Metrics::default();
        let trace = Evaluator::new(&td, &g).run(&mut TraceDp, &mut metrics).expect("binary");
        let joins = td.ids().filter(|&id| td.step(id) == Step::Join).count();
        assert_eq!(trace.iter().filter(|s| s.starts_with("join")).count(), joins);
        assert_eq!(trace.iter().filter(|s| s.starts_with("edges")).count(), td.num_bags());
        assert_eq!(metrics.join.count, joins);
        // Each of the three edges is applied exactly once.
        let applied: usize = trace
            .iter()
            .filter_map(|s| s.strip_prefix("edges "))
            .filter_map(|s| s.split(' ').nth(1))
            .map(|n| n.parse::<usize>().expect("count"))
            .sum();
        assert_eq!(applied, 3);
    }
}
