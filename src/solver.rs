//! Top-level solving: trivial cases, algorithm choice, reconstruction.
//!
//! ```
//! use steiner_tw::config::SolverConfig;
//! use steiner_tw::decomposition::TreeDecomposition;
//! use steiner_tw::graph::Graph;
//! use steiner_tw::metrics::Metrics;
//! use steiner_tw::solver::{solve, Outcome};
//! use steiner_tw::types::VertexId;
//!
//! let v = VertexId::new;
//! let mut graph = Graph::new(3);
//! graph.add_edge(v(0), v(1), 2);
//! graph.add_edge(v(1), v(2), 2);
//! graph.add_edge(v(0), v(2), 3);
//! graph.set_terminal(v(0), true);
//! graph.set_terminal(v(2), true);
//! let td = TreeDecomposition::path(vec![vec![v(0), v(1), v(2)]]);
//!
//! let mut metrics = Metrics::default();
//! let outcome = solve(&graph, Some(&td), &SolverConfig::default(), &mut metrics).unwrap();
//! match outcome {
//!     Outcome::Solved(tree) => assert_eq!(tree.cost, 3),
//!     Outcome::NoSolution => unreachable!(),
//! }
//! ```

use log::{info, warn};
use num_bigint::BigUint;

use crate::canonical::CanonicalDecomposition;
use crate::config::{AlgorithmChoice, SolverConfig};
use crate::decomposition::TreeDecomposition;
use crate::dreyfus_wagner;
use crate::error::SteinerError;
use crate::eval::Evaluator;
use crate::forced::forced_edges;
use crate::graph::Graph;
use crate::metrics::Metrics;
use crate::mst::spanning_tree;
use crate::steiner::SteinerDp;
use crate::types::{Cost, EdgeId};
use crate::vertex_set::VertexSet;

/// A Steiner tree: its cost and its edges, sorted by weight then endpoints.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct SteinerTree {
    pub cost: Cost,
    pub edges: Vec<EdgeId>,
}

impl SteinerTree {
    pub fn new(graph: &Graph, cost: Cost, mut edges: Vec<EdgeId>) -> Self {
        edges.sort_by_key(|&e| {
            let edge = graph.edge(e);
            let (lo, hi) = edge.endpoints();
            (edge.weight, lo, hi, e)
        });
        edges.dedup();
        SteinerTree { cost, edges }
    }
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub enum Outcome {
    Solved(SteinerTree),
    /// The terminals cannot be connected.
    NoSolution,
}

/// The algorithm actually run by [`solve`].
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Algorithm {
    TreeDecomposition,
    TerminalDp,
}

/// Resolves [`AlgorithmChoice::Auto`].
///
/// The terminal DP is preferred iff `5^bag_size > 3^terminals`, where
/// `terminals` excludes those removed by forced edges, and it is within
/// the configured terminal limit.
pub fn choose_algorithm(
    td: Option<&TreeDecomposition>,
    terminals: usize,
    forced: usize,
    config: &SolverConfig,
) -> Algorithm {
    let remaining = terminals.saturating_sub(forced);
    let fits = remaining <= config.terminal_dp_max_terminals.min(dreyfus_wagner::MAX_TERMINALS);
    match config.algorithm {
        AlgorithmChoice::TreeDecomposition => Algorithm::TreeDecomposition,
        AlgorithmChoice::TerminalDp => Algorithm::TerminalDp,
        AlgorithmChoice::Auto => match td {
            None if fits => Algorithm::TerminalDp,
            None => Algorithm::TreeDecomposition,
            Some(td) => {
                let tw_work = BigUint::from(5u32).pow(td.max_bag_size() as u32);
                let terminal_work = BigUint::from(3u32).pow(remaining as u32);
                if fits && tw_work > terminal_work {
                    Algorithm::TerminalDp
                } else {
                    Algorithm::TreeDecomposition
                }
            }
        },
    }
}

/// Computes a minimum Steiner tree of `graph`.
pub fn solve(
    graph: &Graph,
    td: Option<&TreeDecomposition>,
    config: &SolverConfig,
    metrics: &mut Metrics,
) -> Result<Outcome, SteinerError> {
    let terminals = graph.terminals();
    match terminals.as_slice() {
        [] => return Err(SteinerError::NoTerminals),
        [_] => return Ok(Outcome::Solved(SteinerTree::new(graph, 0, Vec::new()))),
        _ => {}
    }
    if let Some(&t) = terminals.iter().find(|&&t| graph.neighbors(t).all(|(_, w)| w == t)) {
        info!("Terminal {} has no neighbors", t);
        return Ok(Outcome::NoSolution);
    }

    let forced = forced_edges(graph);
    let algorithm = choose_algorithm(td, terminals.len(), forced.len(), config);
    info!(
        "Solving with {:?}: {} vertices, {} edges, {} terminals, {} forced edges, width {}",
        algorithm,
        graph.num_vertices(),
        graph.num_edges(),
        terminals.len(),
        forced.len(),
        td.map_or(0, TreeDecomposition::width)
    );

    let tree = match algorithm {
        Algorithm::TerminalDp => dreyfus_wagner::solve(graph, &forced, config.terminal_dp_max_terminals)?,
        Algorithm::TreeDecomposition => {
            let td = td.ok_or(SteinerError::MissingDecomposition)?;
            solve_with_decomposition(graph, td, config, metrics)?
        }
    };

    match tree {
        Some(tree) => {
            info!("Optimum: {} with {} edges", tree.cost, tree.edges.len());
            Ok(Outcome::Solved(tree))
        }
        None => {
            info!("Terminals cannot be connected");
            Ok(Outcome::NoSolution)
        }
    }
}

/// Runs the tree-decomposition DP and reconstructs the tree from the
/// vertices recorded in the provenance of the best entry.
pub fn solve_with_decomposition(
    graph: &Graph,
    td: &TreeDecomposition,
    config: &SolverConfig,
    metrics: &mut Metrics,
) -> Result<Option<SteinerTree>, SteinerError> {
    let canonical = CanonicalDecomposition::build(td, graph, config)?;
    let mut dp = SteinerDp::new(graph, &config.reduction);
    let table = Evaluator::new(&canonical, graph).run(&mut dp, metrics)?;
    info!("{}", metrics);

    let Some((_, best)) = table.best_connected() else {
        return Ok(None);
    };
    let cost = best.cost;

    let provenance = dp.into_provenance();
    let vertices = match best.origin {
        Some(origin) => provenance.collect_vertices(origin, &canonical),
        None => VertexSet::default(),
    };
    let edges = spanning_tree(graph, &vertices);
    let weight = graph.weight_of(&edges);
    if weight != cost {
        warn!(
            "Reconstructed tree over {} vertices weighs {}, the optimum is {}",
            vertices.len(),
            weight,
            cost
        );
    }
    Ok(Some(SteinerTree::new(graph, cost, edges)))
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;
    use crate::types::VertexId;

    fn v(i: u32) -> VertexId {
        VertexId::new(i)
    }

    fn path_graph(n: u32) -> (Graph, TreeDecomposition) {
        let mut g = Graph::new(n as usize);
        let mut bags = Vec::new();
        for i in 1..n {
            g.add_edge(v(i - 1), v(i), i as Cost);
            bags.push(vec![v(i - 1), v(i)]);
        }
        (g, TreeDecomposition::path(bags))
    }

    #[test]
    fn test_no_terminals() {
        let (g, td) = path_graph(3);
        let result = solve(&g, Some(&td), &SolverConfig::default(), &mut Metrics::default());
        assert!(matches!(result, Err(SteinerError::NoTerminals)));
    }

    #[test]
    fn test_single_terminal() {
        let (mut g, td) = path_graph(3);
        g.set_terminal(v(1), true);
        let outcome = solve(&g, Some(&td), &SolverConfig::default(), &mut Metrics::default()).expect("solvable");
        assert_eq!(outcome, Outcome::Solved(SteinerTree { cost: 0, edges: vec![] }));
    }

    #[test]
    fn test_isolated_terminal() {
        let mut g = Graph::new(4);
        g.add_edge(v(0), v(1), 1);
        g.add_edge(v(1), v(2), 1);
        g.add_edge(v(3), v(3), 1);
        g.set_terminal(v(0), true);
        g.set_terminal(v(3), true);
        let outcome = solve(&g, None, &SolverConfig::default(), &mut Metrics::default()).expect("trivial");
        assert_eq!(outcome, Outcome::NoSolution);
    }

    #[test]
    fn test_both_algorithms_agree() {
        let (mut g, td) = path_graph(5);
        g.set_terminal(v(0), true);
        g.set_terminal(v(4), true);
        g.set_terminal(v(2), true);
        for algorithm in [AlgorithmChoice::TreeDecomposition, AlgorithmChoice::TerminalDp] {
            let config = SolverConfig {
                algorithm,
                ..SolverConfig::default()
            };
            let outcome = solve(&g, Some(&td), &config, &mut Metrics::default()).expect("solvable");
            let Outcome::Solved(tree) = outcome else {
                panic!("{:?} found no solution", algorithm);
            };
            assert_eq!(tree.cost, 1 + 2 + 3 + 4);
            assert_eq!(tree.edges.len(), 4);
            // Sorted by weight.
            let weights: Vec<Cost> = tree.edges.iter().map(|&e| g.edge(e).weight).collect();
            assert_eq!(weights, vec![1, 2, 3, 4]);
        }
    }

    #[test]
    fn test_missing_decomposition() {
        let (mut g, _) = path_graph(3);
        g.set_terminal(v(0), true);
        g.set_terminal(v(2), true);
        let config = SolverConfig {
            algorithm: AlgorithmChoice::TreeDecomposition,
            ..SolverConfig::default()
        };
        let result = solve(&g, None, &config, &mut Metrics::default());
        assert!(matches!(result, Err(SteinerError::MissingDecomposition)));
    }

    #[test]
    fn test_choose_algorithm() {
        let (_, td) = path_graph(3);
        let config = SolverConfig::default();
        // 5^2 = 25 > 3^2 = 9
        assert_eq!(choose_algorithm(Some(&td), 2, 0, &config), Algorithm::TerminalDp);
        // 25 < 3^3 = 27
        assert_eq!(choose_algorithm(Some(&td), 4, 1, &config), Algorithm::TreeDecomposition);
        assert_eq!(choose_algorithm(None, 30, 0, &config), Algorithm::TreeDecomposition);
        assert_eq!(choose_algorithm(None, 3, 0, &config), Algorithm::TerminalDp);

        let wide = TreeDecomposition::path(vec![(0..30).map(v).collect()]);
        // 5^30 beats 3^25, but 25 terminals are over the limit.
        assert_eq!(choose_algorithm(Some(&wide), 25, 0, &config), Algorithm::TreeDecomposition);
        assert_eq!(choose_algorithm(Some(&wide), 20, 0, &config), Algorithm::TerminalDp);
    }
}
