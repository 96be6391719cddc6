//! # steiner-tw: exact Steiner trees on graphs of bounded treewidth
//!
//! **`steiner-tw`** computes minimum-weight Steiner trees: given an
//! edge-weighted graph and a set of *terminal* vertices, find the cheapest
//! connected subgraph containing all terminals.
//!
//! The problem is NP-hard in general, but it becomes tractable when the
//! graph comes with a tree decomposition of small width. The main algorithm
//! is a dynamic program over a nice tree decomposition whose tables map
//! *partitions* of the bag vertices to the cheapest partial forest realizing
//! them. Those tables are kept small by a **rank-based reduction**: only
//! entries whose cut vectors are linearly independent over GF(2) (cheapest
//! first) can matter for the optimum, so the rest are dropped.
//!
//! For instances with few terminals, the classic **Dreyfus–Wagner** terminal
//! DP is available as well, and by default the solver picks whichever of the
//! two is estimated to be cheaper.
//!
//! ## Basic Usage
//!
//! ```rust
//! use steiner_tw::config::SolverConfig;
//! use steiner_tw::io::{solution_to_string, Instance};
//! use steiner_tw::metrics::Metrics;
//! use steiner_tw::solver::solve;
//!
//! let text = "\
//! SECTION Graph
//! Nodes 4
//! Edges 4
//! E 1 2 1
//! E 2 3 1
//! E 3 4 1
//! E 4 1 5
//! END
//! SECTION Terminals
//! Terminals 2
//! T 1
//! T 4
//! END
//! SECTION Tree Decomposition
//! s td 2 3 4
//! b 1 1 2 3
//! b 2 1 3 4
//! 1 2
//! END
//! EOF
//! ";
//!
//! let instance = Instance::from_pace_string(text).unwrap();
//! let mut metrics = Metrics::default();
//! let outcome = solve(
//!     &instance.graph,
//!     instance.decomposition.as_ref(),
//!     &SolverConfig::default(),
//!     &mut metrics,
//! )
//! .unwrap();
//! assert_eq!(solution_to_string(&instance.graph, &outcome), "VALUE 3\n1 2\n2 3\n3 4\n");
//! ```
//!
//! ## Core Components
//!
//! - **[`canonical`]**: turns a raw tree decomposition into a binary, nice
//!   decomposition with a cost-model-selected root and edge assignment.
//! - **[`eval`]**: the [`DpAlgorithm`][crate::eval::DpAlgorithm] trait and
//!   the [`Evaluator`][crate::eval::Evaluator] driving it bottom-up.
//! - **[`steiner`]**: the Steiner tree DP over [`partition`]s.
//! - **[`rank`]**: the rank-based reducer over [`cut`] vectors.
//! - **[`dreyfus_wagner`]**: the terminal DP.
//! - **[`solver`]**: algorithm choice and tree reconstruction.
//! - **[`io`]**: the PACE 2018 text format.
//!
//! The library logs through the [`log`] facade and never installs a logger.

pub mod canonical;
pub mod color_set;
pub mod config;
pub mod cut;
pub mod decomposition;
pub mod dot;
pub mod dreyfus_wagner;
pub mod error;
pub mod eval;
pub mod forced;
pub mod graph;
pub mod io;
pub mod metrics;
pub mod mst;
pub mod partition;
pub mod provenance;
pub mod rank;
pub mod shortest_paths;
pub mod solver;
pub mod steiner;
pub mod table;
pub mod types;
pub mod union_find;
pub mod vertex_set;
