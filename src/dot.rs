//! Canonical decomposition to DOT (Graphviz) conversion.
//!
//! The generated DOT output follows these conventions:
//! - every bag is a box labelled with its id, its step kind and its vertices
//!   (1-based, in color order), terminals in bold,
//! - the root bag sits at the top (source rank),
//! - tree edges connect each bag to its parent,
//! - optionally, the graph edges a bag introduces are listed under its vertices.
//!
//! # Examples
//!
//! ```
//! use steiner_tw::canonical::CanonicalDecomposition;
//! use steiner_tw::config::SolverConfig;
//! use steiner_tw::decomposition::TreeDecomposition;
//! use steiner_tw::graph::Graph;
//! use steiner_tw::types::VertexId;
//!
//! let mut graph = Graph::new(2);
//! graph.add_edge(VertexId::new(0), VertexId::new(1), 3);
//! graph.set_terminal(VertexId::new(0), true);
//! let raw = TreeDecomposition::path(vec![vec![VertexId::new(0), VertexId::new(1)]]);
//! let td = CanonicalDecomposition::build(&raw, &graph, &SolverConfig::default()).unwrap();
//!
//! let dot = td.to_dot(&graph).unwrap();
//! // Write to file and render with: dot -Tpng output.dot -o output.png
//! assert!(dot.starts_with("graph {"));
//! ```

use std::fmt::Write as _;

use crate::canonical::CanonicalDecomposition;
use crate::graph::Graph;
use crate::types::{BagId, VertexId};

/// Configuration options for DOT output generation.
///
/// Use `DotConfig::default()` for standard settings:
///
/// ```
/// use steiner_tw::dot::DotConfig;
///
/// let config = DotConfig {
///     show_edges: false,
///     ..DotConfig::default()
/// };
/// assert_eq!(config.bag_shape, "box");
/// ```
#[derive(Debug, Clone)]
pub struct DotConfig {
    /// Shape for bags (default: "box")
    pub bag_shape: &'static str,
    /// Shape for the root bag (default: "doubleoctagon")
    pub root_shape: &'static str,
    /// Style for tree edges (default: "solid")
    pub tree_edge_style: &'static str,
    /// Whether to list the graph edges each bag introduces (default: true)
    pub show_edges: bool,
    /// Whether to use HTML labels, needed for bold terminals (default: true)
    pub use_html_labels: bool,
}

impl Default for DotConfig {
    fn default() -> Self {
        Self {
            bag_shape: "box",
            root_shape: "doubleoctagon",
            tree_edge_style: "solid",
            show_edges: true,
            use_html_labels: true,
        }
    }
}

impl CanonicalDecomposition {
    /// Converts the decomposition to DOT (Graphviz) format.
    pub fn to_dot(&self, graph: &Graph) -> Result<String, std::fmt::Error> {
        self.to_dot_with_config(graph, &DotConfig::default())
    }

    /// Converts the decomposition to DOT format with custom configuration.
    pub fn to_dot_with_config(&self, graph: &Graph, config: &DotConfig) -> Result<String, std::fmt::Error> {
        let mut dot = String::new();
        writeln!(dot, "graph {{")?;
        writeln!(dot, "node [shape={}];", config.bag_shape)?;

        writeln!(dot, "{{ rank=source")?;
        writeln!(
            dot,
            "b{} [shape={}, label={}];",
            self.root().index(),
            config.root_shape,
            self.bag_label(graph, self.root(), config)
        )?;
        writeln!(dot, "}}")?;

        for id in self.ids().filter(|&id| id != self.root()) {
            writeln!(dot, "b{} [label={}];", id.index(), self.bag_label(graph, id, config))?;
        }

        for id in self.ids() {
            if let Some(parent) = self.bag(id).parent() {
                writeln!(dot, "b{} -- b{} [style={}];", parent.index(), id.index(), config.tree_edge_style)?;
            }
        }

        writeln!(dot, "}}")?;
        Ok(dot)
    }

    fn bag_label(&self, graph: &Graph, id: BagId, config: &DotConfig) -> String {
        let bag = self.bag(id);
        let vertex = |v: VertexId| {
            if config.use_html_labels && graph.is_terminal(v) {
                format!("<B>{}</B>", v.index() + 1)
            } else if graph.is_terminal(v) {
                format!("*{}", v.index() + 1)
            } else {
                format!("{}", v.index() + 1)
            }
        };
        let vertices: Vec<String> = bag.vertices().iter().map(|&v| vertex(v)).collect();
        let edges: Vec<String> = bag
            .introduce_edges()
            .iter()
            .map(|&e| {
                let (u, v) = graph.edge(e).endpoints();
                format!("{}-{}", u.index() + 1, v.index() + 1)
            })
            .collect();

        let (open, close, newline) = if config.use_html_labels {
            ("<", ">", "<BR/>")
        } else {
            ("\"", "\"", "\\n")
        };
        let mut label = format!("{}{} {}{}{{{}}}", open, id.index() + 1, self.step(id).name(), newline, vertices.join(" "));
        if config.show_edges && !edges.is_empty() {
            label.push_str(newline);
            label.push_str(&edges.join(" "));
        }
        label.push_str(close);
        label
    }
}
