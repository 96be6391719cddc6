//! Reading and writing the PACE 2018 Steiner tree text format.
//!
//! # Instance format
//!
//! ```text
//! SECTION Graph
//! Nodes <n>
//! Edges <m>
//! E <u> <v> <weight>      # one line per edge
//! END
//!
//! SECTION Terminals
//! Terminals <k>
//! T <v>                   # one line per terminal
//! END
//!
//! SECTION Tree Decomposition
//! c <comment>
//! s td <bags> <max bag size> <vertices>
//! b <id> <v>...           # one line per bag
//! <a> <b>                 # one line per tree edge
//! END
//!
//! EOF
//! ```
//!
//! All ids are 1-based in text and 0-based in memory. The tree
//! decomposition section is optional, and lines outside of sections
//! (such as a file header) are ignored.
//!
//! # Solution format
//!
//! `VALUE <cost>` followed by one `<u> <v>` line per tree edge, smaller id
//! first, or the single line `Impossible`.

use std::fs;
use std::io::{self, Read, Write};
use std::path::Path;
use std::str::FromStr;

use log::{debug, warn};

use crate::decomposition::TreeDecomposition;
use crate::graph::Graph;
use crate::solver::Outcome;
use crate::types::{BagId, Cost, VertexId};

/// Error type for I/O operations.
#[derive(Debug)]
pub enum IoError {
    /// File I/O error.
    Io(io::Error),
    /// Parse error with message.
    Parse(String),
}

impl From<io::Error> for IoError {
    fn from(e: io::Error) -> Self {
        IoError::Io(e)
    }
}

impl std::fmt::Display for IoError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IoError::Io(e) => write!(f, "I/O error: {}", e),
            IoError::Parse(msg) => write!(f, "Parse error: {}", msg),
        }
    }
}

impl std::error::Error for IoError {}

/// A graph with terminals, and optionally a tree decomposition of it.
#[derive(Debug, Clone)]
pub struct Instance {
    pub graph: Graph,
    pub decomposition: Option<TreeDecomposition>,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
enum Section {
    Outside,
    Graph,
    Terminals,
    Decomposition,
    Unknown,
}

fn parse_error<T>(line: usize, msg: impl std::fmt::Display) -> Result<T, IoError> {
    Err(IoError::Parse(format!("line {}: {}", line, msg)))
}

fn field<T: FromStr>(parts: &[&str], i: usize, line: usize, what: &str) -> Result<T, IoError> {
    match parts.get(i).map(|s| s.parse::<T>()) {
        Some(Ok(value)) => Ok(value),
        Some(Err(_)) => parse_error(line, format!("invalid {} '{}'", what, parts[i])),
        None => parse_error(line, format!("missing {}", what)),
    }
}

/// Converts a 1-based id in `1..=count` to 0-based.
fn one_based(id: usize, count: usize, line: usize, what: &str) -> Result<usize, IoError> {
    if id == 0 || id > count {
        return parse_error(line, format!("{} {} out of range 1..={}", what, id, count));
    }
    Ok(id - 1)
}

impl Instance {
    /// Reads an instance from a file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, IoError> {
        let content = fs::read_to_string(path)?;
        Self::from_pace_string(&content)
    }

    /// Reads an instance from any reader, such as stdin.
    pub fn read<R: Read>(mut reader: R) -> Result<Self, IoError> {
        let mut content = String::new();
        reader.read_to_string(&mut content)?;
        Self::from_pace_string(&content)
    }

    /// Parses an instance in PACE format.
    pub fn from_pace_string(content: &str) -> Result<Self, IoError> {
        let mut section = Section::Outside;
        let mut graph: Option<Graph> = None;
        let mut declared_edges: Option<usize> = None;
        let mut declared_terminals: Option<usize> = None;
        let mut terminal_lines: Vec<(usize, usize)> = Vec::new();
        let mut bags: Option<Vec<Option<Vec<VertexId>>>> = None;
        let mut tree_edges: Vec<(BagId, BagId)> = Vec::new();

        for (i, raw) in content.lines().enumerate() {
            let line = i + 1;
            let parts: Vec<&str> = raw.split_whitespace().collect();
            let Some(&head) = parts.first() else {
                continue;
            };

            if section == Section::Outside {
                if head.eq_ignore_ascii_case("SECTION") {
                    section = match parts[1..].join(" ").to_ascii_lowercase().as_str() {
                        "graph" => Section::Graph,
                        "terminals" => Section::Terminals,
                        "tree decomposition" => Section::Decomposition,
                        _ => Section::Unknown,
                    };
                } else if head.eq_ignore_ascii_case("EOF") {
                    break;
                }
                continue;
            }
            if head.eq_ignore_ascii_case("END") {
                section = Section::Outside;
                continue;
            }

            match section {
                Section::Graph => match head {
                    "Nodes" => graph = Some(Graph::new(field(&parts, 1, line, "node count")?)),
                    "Edges" => declared_edges = Some(field(&parts, 1, line, "edge count")?),
                    "E" => {
                        let Some(g) = graph.as_mut() else {
                            return parse_error(line, "edge before 'Nodes'");
                        };
                        let n = g.num_vertices();
                        let u = one_based(field(&parts, 1, line, "endpoint")?, n, line, "vertex")?;
                        let v = one_based(field(&parts, 2, line, "endpoint")?, n, line, "vertex")?;
                        let w: Cost = field(&parts, 3, line, "weight")?;
                        g.add_edge(VertexId::from(u), VertexId::from(v), w);
                    }
                    _ => return parse_error(line, format!("unexpected '{}' in graph section", head)),
                },
                Section::Terminals => match head {
                    "Terminals" => declared_terminals = Some(field(&parts, 1, line, "terminal count")?),
                    "T" => terminal_lines.push((line, field(&parts, 1, line, "terminal")?)),
                    _ => return parse_error(line, format!("unexpected '{}' in terminals section", head)),
                },
                Section::Decomposition => match head {
                    "c" => {}
                    "s" => {
                        let count: usize = field(&parts, 2, line, "bag count")?;
                        bags = Some(vec![None; count]);
                    }
                    "b" => {
                        let Some(list) = bags.as_mut() else {
                            return parse_error(line, "bag before 's' line");
                        };
                        let Some(g) = graph.as_ref() else {
                            return parse_error(line, "bag before the graph section");
                        };
                        let id = one_based(field(&parts, 1, line, "bag id")?, list.len(), line, "bag")?;
                        let mut vertices = Vec::with_capacity(parts.len() - 2);
                        for j in 2..parts.len() {
                            let v = one_based(field(&parts, j, line, "bag vertex")?, g.num_vertices(), line, "vertex")?;
                            vertices.push(VertexId::from(v));
                        }
                        list[id] = Some(vertices);
                    }
                    _ => {
                        let Some(list) = bags.as_ref() else {
                            return parse_error(line, "tree edge before 's' line");
                        };
                        let a = one_based(field(&parts, 0, line, "bag id")?, list.len(), line, "bag")?;
                        let b = one_based(field(&parts, 1, line, "bag id")?, list.len(), line, "bag")?;
                        tree_edges.push((BagId::from(a), BagId::from(b)));
                    }
                },
                Section::Unknown | Section::Outside => {}
            }
        }

        let Some(mut graph) = graph else {
            return Err(IoError::Parse("missing graph section".into()));
        };
        for (line, t) in terminal_lines {
            let t = one_based(t, graph.num_vertices(), line, "terminal")?;
            graph.set_terminal(VertexId::from(t), true);
        }

        if declared_edges.is_some_and(|m| m != graph.num_edges()) {
            warn!("Declared {:?} edges, read {}", declared_edges, graph.num_edges());
        }
        if declared_terminals.is_some_and(|k| k != graph.num_terminals()) {
            warn!("Declared {:?} terminals, read {}", declared_terminals, graph.num_terminals());
        }

        let decomposition = match bags {
            None => None,
            Some(list) => {
                let mut bags = Vec::with_capacity(list.len());
                for (i, bag) in list.into_iter().enumerate() {
                    match bag {
                        Some(bag) => bags.push(bag),
                        None => return Err(IoError::Parse(format!("bag {} is never defined", i + 1))),
                    }
                }
                Some(TreeDecomposition::new(bags, tree_edges))
            }
        };

        debug!(
            "Read instance: {} vertices, {} edges, {} terminals, {}",
            graph.num_vertices(),
            graph.num_edges(),
            graph.num_terminals(),
            match &decomposition {
                Some(td) => format!("{} bags of width {}", td.num_bags(), td.width()),
                None => "no decomposition".to_string(),
            }
        );
        Ok(Instance { graph, decomposition })
    }

    /// Formats the instance in PACE format.
    pub fn to_pace_string(&self) -> String {
        let g = &self.graph;
        let mut output = String::new();
        output.push_str("SECTION Graph\n");
        output.push_str(&format!("Nodes {}\nEdges {}\n", g.num_vertices(), g.num_edges()));
        for (_, e) in g.edges() {
            output.push_str(&format!("E {} {} {}\n", e.u.index() + 1, e.v.index() + 1, e.weight));
        }
        output.push_str("END\n\nSECTION Terminals\n");
        output.push_str(&format!("Terminals {}\n", g.num_terminals()));
        for t in g.terminals() {
            output.push_str(&format!("T {}\n", t.index() + 1));
        }
        output.push_str("END\n");

        if let Some(td) = &self.decomposition {
            output.push_str("\nSECTION Tree Decomposition\n");
            output.push_str(&format!("s td {} {} {}\n", td.num_bags(), td.max_bag_size(), g.num_vertices()));
            for id in td.bag_ids() {
                output.push_str(&format!("b {}", id.index() + 1));
                for v in td.bag(id) {
                    output.push_str(&format!(" {}", v.index() + 1));
                }
                output.push('\n');
            }
            for &(a, b) in td.tree_edges() {
                output.push_str(&format!("{} {}\n", a.index() + 1, b.index() + 1));
            }
            output.push_str("END\n");
        }
        output.push_str("\nEOF\n");
        output
    }
}

/// Formats a solve outcome in PACE solution format.
pub fn solution_to_string(graph: &Graph, outcome: &Outcome) -> String {
    match outcome {
        Outcome::NoSolution => "Impossible\n".to_string(),
        Outcome::Solved(tree) => {
            let mut output = format!("VALUE {}\n", tree.cost);
            for &e in &tree.edges {
                let (u, v) = graph.edge(e).endpoints();
                output.push_str(&format!("{} {}\n", u.index() + 1, v.index() + 1));
            }
            output
        }
    }
}

/// Writes a solve outcome in PACE solution format.
pub fn write_solution<W: Write>(out: &mut W, graph: &Graph, outcome: &Outcome) -> Result<(), IoError> {
    out.write_all(solution_to_string(graph, outcome).as_bytes())?;
    Ok(())
}
