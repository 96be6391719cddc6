//! Solver configuration.
//!
//! All knobs are plain public fields with sensible defaults, so a caller only
//! spells out what it wants to change:
//!
//! ```
//! use steiner_tw::config::{AlgorithmChoice, SolverConfig};
//!
//! let config = SolverConfig {
//!     seed: 7,
//!     algorithm: AlgorithmChoice::TreeDecomposition,
//!     ..SolverConfig::default()
//! };
//! assert_eq!(config.reduction.after_forget, 0.125);
//! ```

use crate::dot::DotConfig;

/// Which exact algorithm the solver runs.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub enum AlgorithmChoice {
    /// Pick by comparing the estimated work of both algorithms.
    #[default]
    Auto,
    /// Always run the tree-decomposition DP.
    TreeDecomposition,
    /// Always run the Dreyfus–Wagner terminal DP.
    TerminalDp,
}

/// Which elimination strategy the rank-based reducer uses.
///
/// Both produce the same surviving entries for the same input order.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub enum ReducerKind {
    /// One vector at a time against the whole echelon basis.
    Incremental,
    /// Blocked elimination with bucketed corrections ("method of four Russians").
    #[default]
    FourRussians,
}

#[derive(Debug, Copy, Clone)]
pub struct FourRussiansConfig {
    /// Pivots per block; buckets are indexed by `block` bits (default: 5)
    pub block: usize,
    /// A block is only applied when more vectors than this remain (default: 512)
    pub min_remaining: usize,
}

impl Default for FourRussiansConfig {
    fn default() -> Self {
        Self {
            block: 5,
            min_remaining: 512,
        }
    }
}

/// Thresholds controlling when tables are reduced.
///
/// A table of `n` entries over `k` active colors is reduced with ratio `r`
/// only if `n * r > 2^(k-1)`, the dimension of its cut space. Smaller ratios
/// reduce less often.
#[derive(Debug, Copy, Clone)]
pub struct ReductionConfig {
    pub reducer: ReducerKind,
    /// Applied to each child subset before Introduce extends it (default: 0.999)
    pub before_extend: f64,
    /// Applied after edges are introduced (default: 0.125)
    pub after_edge: f64,
    /// Applied to each narrowed subset after Forget (default: 0.125)
    pub after_forget: f64,
    /// Applied to both operands of a Join (default: 0.999)
    pub before_join: f64,
    /// From this many applicable edges on, edge introduction uses the
    /// cost-ordered batched strategy (default: 3)
    pub batched_edge_minimum: usize,
    pub four_russians: FourRussiansConfig,
}

impl Default for ReductionConfig {
    fn default() -> Self {
        Self {
            reducer: ReducerKind::default(),
            before_extend: 0.999,
            after_edge: 0.125,
            after_forget: 0.125,
            before_join: 0.999,
            batched_edge_minimum: 3,
            four_russians: FourRussiansConfig::default(),
        }
    }
}

/// Top-level solver configuration.
#[derive(Debug, Clone)]
pub struct SolverConfig {
    /// Seed for root sampling (default: 4321)
    pub seed: u64,
    /// Root candidates are sampled until the summed size of the explored
    /// trees reaches this budget (default: 1_000_000)
    pub root_search_budget: usize,
    pub algorithm: AlgorithmChoice,
    /// `Auto` never picks the terminal DP above this many non-forced
    /// terminals, and forcing it above is an error (default: 20)
    pub terminal_dp_max_terminals: usize,
    pub reduction: ReductionConfig,
    pub dot: DotConfig,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            seed: 4321,
            root_search_budget: 1_000_000,
            algorithm: AlgorithmChoice::default(),
            terminal_dp_max_terminals: 20,
            reduction: ReductionConfig::default(),
            dot: DotConfig::default(),
        }
    }
}
