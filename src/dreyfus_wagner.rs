//! The Dreyfus–Wagner terminal dynamic program.
//!
//! `dp[v][S]` is the cost of a cheapest tree connecting vertex `v` to the
//! terminal subset `S`. Singletons are shortest paths. A larger subset is
//! reached from some vertex `via` where the tree splits into two nonempty
//! parts, plus a shortest path from `v` to `via`:
//!
//! ```text
//! dp[v][S] = min over via, split of  dist(v, via) + dp[via][split] + dp[via][S \ split]
//! ```
//!
//! Each unordered split is tried once, as the part holding the highest
//! terminal of `S`. Running time is `O(3^k n + 2^k n^2)` for `k` terminals.
//!
//! Before the DP, forced edges (see [`crate::forced`]) are contracted: one
//! endpoint stops being a terminal and a zero-weight helper edge joins the
//! endpoints. The forced edges themselves are added back to the result.

use std::collections::BTreeSet;

use log::{debug, info};

use crate::error::SteinerError;
use crate::graph::Graph;
use crate::shortest_paths::ShortestPaths;
use crate::solver::SteinerTree;
use crate::types::{Cost, EdgeId, VertexId};

/// Terminal masks are `u32`.
pub const MAX_TERMINALS: usize = 32;

#[derive(Debug, Copy, Clone)]
enum Parent {
    Unset,
    /// Shortest path to the single terminal.
    Path(VertexId),
    /// Shortest path to `via`, where the tree splits into `split` and the rest.
    Split { split: u32, via: VertexId },
}

/// Solves the instance exactly, or returns `None` if the terminals are
/// not connected.
///
/// Fails with [`SteinerError::TooManyTerminals`] if more than
/// `max_terminals` terminals remain after contracting `forced`.
pub fn solve(graph: &Graph, forced: &[EdgeId], max_terminals: usize) -> Result<Option<SteinerTree>, SteinerError> {
    let work = contract(graph, forced);
    let terminals = work.terminals();
    let limit = max_terminals.min(MAX_TERMINALS);
    if terminals.len() > limit {
        return Err(SteinerError::TooManyTerminals {
            terminals: terminals.len(),
            limit,
        });
    }
    info!(
        "Running the terminal DP on {} terminals ({} forced edges contracted)",
        terminals.len(),
        forced.len()
    );

    let paths = ShortestPaths::compute(&work);
    let n = work.num_vertices();
    let k = terminals.len();
    let width = 1usize << k;
    let full = (width - 1) as u32;
    let at = |v: usize, s: u32| v * width + s as usize;

    let mut dp = vec![Cost::MAX; n * width];
    let mut parent = vec![Parent::Unset; n * width];
    for v in 0..n {
        dp[at(v, 0)] = 0;
        for (i, &t) in terminals.iter().enumerate() {
            dp[at(v, 1 << i)] = paths.distance(VertexId::from(v), t);
            parent[at(v, 1 << i)] = Parent::Path(t);
        }
    }

    let mut by_size: Vec<Vec<u32>> = vec![Vec::new(); k + 1];
    for s in 1..=full {
        by_size[s.count_ones() as usize].push(s);
    }

    let mut best = vec![(Cost::MAX, 0u32); width];
    for (size, subsets) in by_size.iter().enumerate().skip(2) {
        for via in 0..n {
            for &s in subsets {
                let high = 1u32 << (31 - s.leading_zeros());
                let rest = s ^ high;
                let mut found = (Cost::MAX, 0);
                // Proper submasks of `rest`, each completed with the highest terminal.
                let mut sub = (rest - 1) & rest;
                loop {
                    let split = sub | high;
                    let cost = dp[at(via, split)].saturating_add(dp[at(via, s ^ split)]);
                    if cost < found.0 {
                        found = (cost, split);
                    }
                    if sub == 0 {
                        break;
                    }
                    sub = (sub - 1) & rest;
                }
                best[s as usize] = found;
            }

            for from in 0..n {
                let d = paths.distance(VertexId::from(from), VertexId::from(via));
                if d == Cost::MAX {
                    continue;
                }
                for &s in subsets {
                    let (cost, split) = best[s as usize];
                    let total = d.saturating_add(cost);
                    if total < dp[at(from, s)] {
                        dp[at(from, s)] = total;
                        parent[at(from, s)] = Parent::Split {
                            split,
                            via: VertexId::from(via),
                        };
                    }
                }
            }
        }
        debug!("Terminal DP finished subsets of size {}/{}", size, k);
    }

    let Some(root) = (0..n).min_by_key(|&v| dp[at(v, full)]) else {
        return Ok(None);
    };
    let cost = dp[at(root, full)];
    if cost == Cost::MAX {
        return Ok(None);
    }

    let mut edges: BTreeSet<EdgeId> = BTreeSet::new();
    let mut stack = vec![(VertexId::from(root), full)];
    while let Some((v, s)) = stack.pop() {
        if s == 0 {
            continue;
        }
        match parent[at(v.index(), s)] {
            Parent::Unset => panic!("Subset {:#b} at {} has no parent", s, v),
            Parent::Path(t) => edges.extend(paths.path(&work, v, t)),
            Parent::Split { split, via } => {
                edges.extend(paths.path(&work, v, via));
                stack.push((via, split));
                stack.push((via, s ^ split));
            }
        }
    }

    // Helper edges come after the original ones.
    edges.retain(|e| e.index() < graph.num_edges());
    edges.extend(forced.iter().copied());
    let total = cost.saturating_add(graph.weight_of(forced));
    Ok(Some(SteinerTree::new(graph, total, edges.into_iter().collect())))
}

/// Copy of `graph` with the forced edges contracted.
fn contract(graph: &Graph, forced: &[EdgeId]) -> Graph {
    let mut work = graph.clone();
    for &e in forced {
        let (lo, hi) = graph.edge(e).endpoints();
        let dropped = if work.is_terminal(lo) { lo } else { hi };
        work.set_terminal(dropped, false);
        work.add_edge(lo, hi, 0);
    }
    work
}
