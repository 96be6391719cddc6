//! Weighted undirected graphs with terminal marks.
//!
//! Edges are owned once by the [`Graph`] arena and referenced by [`EdgeId`]
//! from the adjacency lists of both endpoints.

use crate::types::{Cost, EdgeId, VertexId};

/// An undirected weighted edge.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct Edge {
    pub u: VertexId,
    pub v: VertexId,
    pub weight: Cost,
}

impl Edge {
    /// Returns the endpoint opposite to `x`.
    ///
    /// # Panics
    ///
    /// Panics if `x` is not an endpoint of this edge.
    pub fn other(&self, x: VertexId) -> VertexId {
        if x == self.u {
            self.v
        } else {
            assert_eq!(x, self.v, "{} is not an endpoint of {}-{}", x, self.u, self.v);
            self.u
        }
    }

    /// Returns the endpoints ordered as `(min, max)`.
    pub fn endpoints(&self) -> (VertexId, VertexId) {
        if self.u <= self.v {
            (self.u, self.v)
        } else {
            (self.v, self.u)
        }
    }
}

/// A vertex: its terminal flag and incident edges.
#[derive(Debug, Clone, Default)]
pub struct Vertex {
    pub terminal: bool,
    pub incident: Vec<EdgeId>,
}

/// A weighted undirected graph.
#[derive(Debug, Clone, Default)]
pub struct Graph {
    vertices: Vec<Vertex>,
    edges: Vec<Edge>,
}

impl Graph {
    /// Creates a graph with `n` isolated non-terminal vertices.
    pub fn new(n: usize) -> Self {
        Graph {
            vertices: vec![Vertex::default(); n],
            edges: Vec::new(),
        }
    }

    pub fn num_vertices(&self) -> usize {
        self.vertices.len()
    }

    pub fn num_edges(&self) -> usize {
        self.edges.len()
    }

    /// Adds an undirected edge and returns its id.
    ///
    /// # Panics
    ///
    /// Panics if an endpoint is out of range.
    pub fn add_edge(&mut self, u: VertexId, v: VertexId, weight: Cost) -> EdgeId {
        let n = self.vertices.len();
        assert!(u.index() < n && v.index() < n, "Edge {}-{} out of range for {} vertices", u, v, n);
        let id = EdgeId::from(self.edges.len());
        self.edges.push(Edge { u, v, weight });
        self.vertices[u.index()].incident.push(id);
        if u != v {
            self.vertices[v.index()].incident.push(id);
        }
        id
    }

    pub fn set_terminal(&mut self, v: VertexId, terminal: bool) {
        self.vertices[v.index()].terminal = terminal;
    }

    #[inline]
    pub fn is_terminal(&self, v: VertexId) -> bool {
        self.vertices[v.index()].terminal
    }

    #[inline]
    pub fn vertex(&self, v: VertexId) -> &Vertex {
        &self.vertices[v.index()]
    }

    #[inline]
    pub fn edge(&self, e: EdgeId) -> &Edge {
        &self.edges[e.index()]
    }

    pub fn vertex_ids(&self) -> impl Iterator<Item = VertexId> + '_ {
        (0..self.vertices.len()).map(VertexId::from)
    }

    /// Iterates over all edges together with their ids.
    pub fn edges(&self) -> impl Iterator<Item = (EdgeId, &Edge)> + '_ {
        self.edges.iter().enumerate().map(|(i, e)| (EdgeId::from(i), e))
    }

    /// Iterates over `(edge, neighbor)` pairs of `v`.
    pub fn neighbors(&self, v: VertexId) -> impl Iterator<Item = (EdgeId, VertexId)> + '_ {
        self.vertices[v.index()]
            .incident
            .iter()
            .map(move |&e| (e, self.edges[e.index()].other(v)))
    }

    pub fn degree(&self, v: VertexId) -> usize {
        self.vertices[v.index()].incident.len()
    }

    /// Returns the terminals in ascending id order.
    pub fn terminals(&self) -> Vec<VertexId> {
        self.vertex_ids().filter(|&v| self.is_terminal(v)).collect()
    }

    pub fn num_terminals(&self) -> usize {
        self.vertices.iter().filter(|v| v.terminal).count()
    }

    /// Total weight of a set of edges.
    pub fn weight_of(&self, edges: &[EdgeId]) -> Cost {
        edges.iter().map(|&e| self.edge(e).weight).sum()
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;

    fn v(i: u32) -> VertexId {
        VertexId::new(i)
    }

    #[test]
    fn test_adjacency_shared() {
        let mut g = Graph::new(3);
        let e0 = g.add_edge(v(0), v(1), 4);
        let e1 = g.add_edge(v(2), v(1), 7);
        assert_eq!(g.num_edges(), 2);
        assert_eq!(g.degree(v(1)), 2);
        let around: Vec<_> = g.neighbors(v(1)).collect();
        assert_eq!(around, vec![(e0, v(0)), (e1, v(2))]);
        assert_eq!(g.edge(e1).endpoints(), (v(1), v(2)));
        assert_eq!(g.weight_of(&[e0, e1]), 11);
    }

    #[test]
    fn test_terminals() {
        let mut g = Graph::new(4);
        g.set_terminal(v(3), true);
        g.set_terminal(v(1), true);
        assert_eq!(g.terminals(), vec![v(1), v(3)]);
        assert_eq!(g.num_terminals(), 2);
        assert!(!g.is_terminal(v(0)));
    }

    #[test]
    #[should_panic(expected = "out of range")]
    fn test_edge_out_of_range() {
        let mut g = Graph::new(2);
        g.add_edge(v(0), v(2), 1);
    }
}
