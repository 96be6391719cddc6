//! Raw tree decompositions as given by the input.
//!
//! A [`TreeDecomposition`] is a list of bags (vertex lists) and the tree
//! edges between them. Before anything else uses it, it is checked with
//! [`validate`][TreeDecomposition::validate]:
//!
//! - there is at least one bag, and no bag is larger than 32 vertices,
//! - bag vertices are in range and not repeated inside a bag,
//! - the `bags - 1` tree edges connect all bags without self loops,
//! - every graph edge has both endpoints in a common bag,
//! - for every vertex, the bags containing it form a connected subtree.
//!
//! [`coloring`][TreeDecomposition::coloring] then assigns every vertex a
//! color that is unique inside every bag containing it.

use log::debug;

use crate::error::SteinerError;
use crate::graph::Graph;
use crate::types::{BagId, Color, VertexId, MAX_BAG_SIZE};
use crate::union_find::UnionFind;

#[derive(Debug, Clone, Default)]
pub struct TreeDecomposition {
    bags: Vec<Vec<VertexId>>,
    edges: Vec<(BagId, BagId)>,
    adj: Vec<Vec<BagId>>,
}

impl TreeDecomposition {
    /// Creates a decomposition from bags and tree edges.
    ///
    /// # Panics
    ///
    /// Panics if a tree edge refers to a bag that does not exist.
    pub fn new(bags: Vec<Vec<VertexId>>, edges: Vec<(BagId, BagId)>) -> Self {
        let mut adj = vec![Vec::new(); bags.len()];
        for &(a, b) in &edges {
            assert!(
                a.index() < bags.len() && b.index() < bags.len(),
                "Tree edge {}-{} out of range for {} bags",
                a,
                b,
                bags.len()
            );
            adj[a.index()].push(b);
            if a != b {
                adj[b.index()].push(a);
            }
        }
        TreeDecomposition { bags, edges, adj }
    }

    /// A path decomposition: consecutive bags are adjacent.
    pub fn path(bags: Vec<Vec<VertexId>>) -> Self {
        let edges = (1..bags.len()).map(|i| (BagId::from(i - 1), BagId::from(i))).collect();
        TreeDecomposition::new(bags, edges)
    }

    pub fn num_bags(&self) -> usize {
        self.bags.len()
    }

    pub fn bag(&self, id: BagId) -> &[VertexId] {
        &self.bags[id.index()]
    }

    pub fn bag_ids(&self) -> impl Iterator<Item = BagId> + '_ {
        (0..self.bags.len()).map(BagId::from)
    }

    pub fn neighbors(&self, id: BagId) -> &[BagId] {
        &self.adj[id.index()]
    }

    pub fn tree_edges(&self) -> &[(BagId, BagId)] {
        &self.edges
    }

    /// Largest bag size (width + 1).
    pub fn max_bag_size(&self) -> usize {
        self.bags.iter().map(Vec::len).max().unwrap_or(0)
    }

    /// Width: one less than the largest bag size.
    pub fn width(&self) -> usize {
        self.max_bag_size().saturating_sub(1)
    }

    /// Checks that this is a tree decomposition of `graph`.
    pub fn validate(&self, graph: &Graph) -> Result<(), SteinerError> {
        let malformed = |msg: String| -> Result<(), SteinerError> { Err(SteinerError::MalformedDecomposition(msg)) };
        let n = graph.num_vertices();

        if self.bags.is_empty() {
            return malformed("no bags".into());
        }
        if self.max_bag_size() > MAX_BAG_SIZE {
            return Err(SteinerError::WidthTooLarge { width: self.width() });
        }

        // Bag contents.
        let mut seen = vec![usize::MAX; n];
        for (i, bag) in self.bags.iter().enumerate() {
            for &v in bag {
                if v.index() >= n {
                    return malformed(format!("bag {} contains vertex {} but the graph has {} vertices", i + 1, v.index() + 1, n));
                }
                if seen[v.index()] == i {
                    return malformed(format!("bag {} contains vertex {} twice", i + 1, v.index() + 1));
                }
                seen[v.index()] = i;
            }
        }

        // Tree shape.
        if self.edges.len() + 1 != self.bags.len() {
            return malformed(format!("{} bags need {} tree edges, got {}", self.bags.len(), self.bags.len() - 1, self.edges.len()));
        }
        let mut uf = UnionFind::new(self.bags.len());
        for &(a, b) in &self.edges {
            if a == b {
                return malformed(format!("tree edge {}-{} is a self loop", a.index() + 1, b.index() + 1));
            }
            if !uf.union(a.index(), b.index()) {
                return malformed(format!("tree edge {}-{} closes a cycle", a.index() + 1, b.index() + 1));
            }
        }

        // Running intersection: the bags holding a vertex induce a subtree
        // iff they are connected by exactly (count - 1) tree edges.
        let membership = self.membership(n);
        let mut bags_with = vec![0usize; n];
        for bag in &self.bags {
            for &v in bag {
                bags_with[v.index()] += 1;
            }
        }
        let mut edges_with = vec![0usize; n];
        for &(a, b) in &self.edges {
            for &v in &self.bags[a.index()] {
                if membership[v.index()].contains(&b) {
                    edges_with[v.index()] += 1;
                }
            }
        }
        for v in 0..n {
            if bags_with[v] > 0 && edges_with[v] + 1 != bags_with[v] {
                return malformed(format!("the bags containing vertex {} are not connected", v + 1));
            }
        }

        // Edge coverage.
        for (e, edge) in graph.edges() {
            let covered = membership[edge.u.index()]
                .iter()
                .any(|b| membership[edge.v.index()].contains(b));
            if !covered {
                return malformed(format!(
                    "edge {} ({}-{}) is not covered by any bag",
                    e.index() + 1,
                    edge.u.index() + 1,
                    edge.v.index() + 1
                ));
            }
        }

        if graph.num_terminals() > 0 && graph.terminals().iter().all(|t| bags_with[t.index()] == 0) {
            return malformed("no bag contains a terminal".into());
        }

        debug!(
            "Validated decomposition: {} bags, width {}, {} vertices",
            self.bags.len(),
            self.width(),
            n
        );
        Ok(())
    }

    /// For every vertex, the bags containing it in ascending order.
    pub fn membership(&self, num_vertices: usize) -> Vec<Vec<BagId>> {
        let mut membership = vec![Vec::new(); num_vertices];
        for (i, bag) in self.bags.iter().enumerate() {
            for &v in bag {
                membership[v.index()].push(BagId::from(i));
            }
        }
        membership
    }

    /// Colors the vertices so that no two vertices of a bag share a color.
    ///
    /// The first bag takes colors `0..len` in bag order. Walking the tree
    /// from there, every later bag keeps the colors of the vertices it
    /// shares with its parent and gives each new vertex the lowest free
    /// color. Vertices in no bag stay uncolored.
    pub fn coloring(&self, graph: &Graph) -> Result<Vec<Option<Color>>, SteinerError> {
        let mut colors: Vec<Option<Color>> = vec![None; graph.num_vertices()];
        if self.bags.is_empty() {
            return Ok(colors);
        }

        let mut visited = vec![false; self.bags.len()];
        let mut stack = vec![BagId::new(0)];
        visited[0] = true;

        while let Some(id) = stack.pop() {
            let bag = &self.bags[id.index()];
            let mut used = 0u64;
            for &v in bag {
                if let Some(c) = colors[v.index()] {
                    assert!(used & (1 << c.index()) == 0, "Color {} used twice in bag {}", c, id);
                    used |= 1 << c.index();
                }
            }
            for &v in bag {
                if colors[v.index()].is_none() {
                    let free = (!used).trailing_zeros() as usize;
                    if free >= MAX_BAG_SIZE {
                        return Err(SteinerError::WidthTooLarge { width: bag.len() - 1 });
                    }
                    used |= 1 << free;
                    colors[v.index()] = Some(Color::new(free));
                }
            }
            for &nb in self.adj[id.index()].iter().rev() {
                if !visited[nb.index()] {
                    visited[nb.index()] = true;
                    stack.push(nb);
                }
            }
        }

        Ok(colors)
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;

    fn v(i: u32) -> VertexId {
        VertexId::new(i)
    }

    fn b(i: u32) -> BagId {
        BagId::new(i)
    }

    fn cycle4() -> Graph {
        let mut g = Graph::new(4);
        g.add_edge(v(0), v(1), 1);
        g.add_edge(v(1), v(2), 1);
        g.add_edge(v(2), v(3), 1);
        g.add_edge(v(3), v(0), 5);
        for i in 0..4 {
            g.set_terminal(v(i), true);
        }
        g
    }

    #[test]
    fn test_valid_decomposition() {
        let g = cycle4();
        let td = TreeDecomposition::path(vec![vec![v(0), v(1), v(2)], vec![v(0), v(2), v(3)]]);
        assert!(td.validate(&g).is_ok());
        assert_eq!(td.width(), 2);
        assert_eq!(td.neighbors(b(1)), &[b(0)]);
    }

    #[test]
    fn test_uncovered_edge() {
        let g = cycle4();
        let td = TreeDecomposition::path(vec![vec![v(0), v(1), v(2)], vec![v(2), v(3)]]);
        let err = td.validate(&g).unwrap_err();
        assert!(err.to_string().contains("not covered"), "{}", err);
    }

    #[test]
    fn test_running_intersection_violated() {
        let g = cycle4();
        let td = TreeDecomposition::path(vec![
            vec![v(0), v(1), v(2)],
            vec![v(2), v(3)],
            vec![v(0), v(2), v(3)],
        ]);
        let err = td.validate(&g).unwrap_err();
        assert!(err.to_string().contains("vertex 1 are not connected"), "{}", err);
    }

    #[test]
    fn test_not_a_tree() {
        let g = cycle4();
        let td = TreeDecomposition::new(vec![vec![v(0), v(1), v(2)], vec![v(0), v(2), v(3)]], vec![]);
        assert!(matches!(td.validate(&g), Err(SteinerError::MalformedDecomposition(_))));

        let td = TreeDecomposition::new(
            vec![vec![v(0), v(1), v(2)], vec![v(0), v(2), v(3)], vec![v(0)]],
            vec![(b(0), b(1)), (b(1), b(0))],
        );
        let err = td.validate(&g).unwrap_err();
        assert!(err.to_string().contains("cycle"), "{}", err);
    }

    #[test]
    fn test_duplicate_and_out_of_range() {
        let g = cycle4();
        let td = TreeDecomposition::path(vec![vec![v(0), v(0)]]);
        assert!(td.validate(&g).unwrap_err().to_string().contains("twice"));
        let td = TreeDecomposition::path(vec![vec![v(9)]]);
        assert!(td.validate(&g).unwrap_err().to_string().contains("vertex 10"));
    }

    #[test]
    fn test_too_wide() {
        let g = Graph::new(40);
        let td = TreeDecomposition::path(vec![(0..33).map(v).collect()]);
        assert!(matches!(td.validate(&g), Err(SteinerError::WidthTooLarge { width: 32 })));
    }

    #[test]
    fn test_coloring_consistent() {
        let mut g = Graph::new(6);
        g.set_terminal(v(0), true);
        let td = TreeDecomposition::new(
            vec![vec![v(0), v(1), v(2)], vec![v(2), v(3)], vec![v(0), v(4), v(5)]],
            vec![(b(0), b(1)), (b(0), b(2))],
        );
        td.validate(&g).expect("valid");
        let colors = td.coloring(&g).expect("colorable");
        let c = |i: u32| colors[i as usize].expect("colored").index();
        assert_eq!((c(0), c(1), c(2)), (0, 1, 2));
        // Bag 2 keeps color 2 for vertex 2 and gives vertex 3 the lowest free color.
        assert_eq!(c(3), 0);
        // Bag 3 keeps color 0 for vertex 0.
        assert_eq!((c(4), c(5)), (1, 2));
        for bag in td.bag_ids() {
            let mut seen = std::collections::HashSet::new();
            for &x in td.bag(bag) {
                assert!(seen.insert(c(x.index() as u32)));
            }
        }
    }
}
