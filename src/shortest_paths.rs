//! All-pairs shortest paths by repeated Dijkstra.

use std::cmp::Reverse;
use std::collections::BinaryHeap;

use log::debug;

use crate::graph::Graph;
use crate::types::{Cost, EdgeId, VertexId};

/// Distance and predecessor-edge matrices, row `s` for source `s`.
#[derive(Debug, Clone)]
pub struct ShortestPaths {
    n: usize,
    dist: Vec<Cost>,
    pred: Vec<Option<EdgeId>>,
}

impl ShortestPaths {
    pub fn compute(graph: &Graph) -> Self {
        let n = graph.num_vertices();
        let mut paths = ShortestPaths {
            n,
            dist: vec![Cost::MAX; n * n],
            pred: vec![None; n * n],
        };
        for s in graph.vertex_ids() {
            paths.dijkstra(graph, s);
        }
        debug!("Computed shortest paths between {} vertices", n);
        paths
    }

    fn dijkstra(&mut self, graph: &Graph, source: VertexId) {
        let row = source.index() * self.n;
        let mut visited = vec![false; self.n];
        let mut heap: BinaryHeap<Reverse<(Cost, VertexId)>> = BinaryHeap::new();
        self.dist[row + source.index()] = 0;
        heap.push(Reverse((0, source)));

        while let Some(Reverse((d, x))) = heap.pop() {
            if std::mem::replace(&mut visited[x.index()], true) {
                continue;
            }
            for (e, y) in graph.neighbors(x) {
                let next = d.saturating_add(graph.edge(e).weight);
                if next < self.dist[row + y.index()] {
                    self.dist[row + y.index()] = next;
                    self.pred[row + y.index()] = Some(e);
                    heap.push(Reverse((next, y)));
                }
            }
        }
    }

    pub fn num_vertices(&self) -> usize {
        self.n
    }

    /// Shortest distance, `Cost::MAX` if unreachable.
    pub fn distance(&self, s: VertexId, t: VertexId) -> Cost {
        self.dist[s.index() * self.n + t.index()]
    }

    /// The last edge of a shortest path from `s` to `t`.
    pub fn predecessor(&self, s: VertexId, t: VertexId) -> Option<EdgeId> {
        self.pred[s.index() * self.n + t.index()]
    }

    /// Edges of a shortest path from `s` to `t`, walking back from `t`.
    /// Empty if `s == t` or `t` is unreachable.
    pub fn path(&self, graph: &Graph, s: VertexId, t: VertexId) -> Vec<EdgeId> {
        let mut edges = Vec::new();
        let mut cur = t;
        while let Some(e) = self.predecessor(s, cur) {
            edges.push(e);
            cur = graph.edge(e).other(cur);
        }
        edges
    }
}
