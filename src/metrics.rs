//! Counters and timings collected during a solve.
//!
//! A [`Metrics`] value is created by the caller, passed by `&mut` through the
//! evaluator and the DP algorithm, and read back once the run completes.

use std::fmt;
use std::time::Duration;

/// Step count and cumulative time of one DP operation kind.
#[derive(Debug, Default, Clone, Copy)]
pub struct OpStats {
    pub count: usize,
    pub time: Duration,
}

impl OpStats {
    pub fn record(&mut self, elapsed: Duration) {
        self.count += 1;
        self.time += elapsed;
    }
}

#[derive(Debug, Default, Clone)]
pub struct Metrics {
    /// Canonical bags evaluated
    pub bags: usize,
    pub leaf: OpStats,
    pub introduce: OpStats,
    pub forget: OpStats,
    pub join: OpStats,
    pub introduce_edges: OpStats,
    /// Table entries produced by the transitions (before deduplication)
    pub entries_created: u64,
    /// Largest table (summed over subsets) seen after any step
    pub largest_table: usize,
    /// Reductions that actually ran elimination
    pub reductions: u64,
    /// Entries dropped by reduction
    pub reduced_away: u64,
    /// Cut vectors generated
    pub cut_columns: u64,
    /// Vector XOR operations during elimination
    pub xor_ops: u64,
    /// Provenance nodes allocated
    pub provenance_nodes: usize,
    pub provenance_hits: u64,
    pub provenance_misses: u64,
}

impl Metrics {
    /// Fraction of reduced entries among all entries created.
    pub fn reduction_ratio(&self) -> f64 {
        if self.entries_created == 0 {
            return 0.0;
        }
        self.reduced_away as f64 / self.entries_created as f64
    }

    /// Total time spent inside the DP operations.
    pub fn total_time(&self) -> Duration {
        self.leaf.time + self.introduce.time + self.forget.time + self.join.time + self.introduce_edges.time
    }

    pub fn observe_table(&mut self, size: usize) {
        self.largest_table = self.largest_table.max(size);
    }
}

impl fmt::Display for Metrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "bags={} intro={}/{:.2?} forget={}/{:.2?} join={}/{:.2?} edges={}/{:.2?} \
             entries={} largest={} reductions={} reduced={} ({:.1}%) cuts={} xors={} prov={} (hits={}, misses={})",
            self.bags,
            self.introduce.count,
            self.introduce.time,
            self.forget.count,
            self.forget.time,
            self.join.count,
            self.join.time,
            self.introduce_edges.count,
            self.introduce_edges.time,
            self.entries_created,
            self.largest_table,
            self.reductions,
            self.reduced_away,
            self.reduction_ratio() * 100.0,
            self.cut_columns,
            self.xor_ops,
            self.provenance_nodes,
            self.provenance_hits,
            self.provenance_misses,
        )
    }
}
