//! Rank-based reduction of subset tables.
//!
//! # Theory
//!
//! Let `M` be the matrix whose rows are the partial solutions of one active
//! subset and whose columns are the cuts of that subset, with `M[p][c] = 1`
//! iff partition `p` is consistent with cut `c` (see [`crate::cut`]). Any
//! way of completing a partial solution into a Steiner tree is decided by
//! the cut space alone: if the row of an entry is a GF(2) combination of
//! rows of entries that are not more expensive, one of those entries admits
//! every completion the dropped entry admits, at no higher cost. Keeping a
//! row basis chosen greedily in ascending cost order therefore preserves
//! the optimum.
//!
//! # Algorithm
//!
//! Entries are stably sorted by cost and inserted into an [`EchelonBasis`]:
//! each new vector is XORed with every basis vector whose pivot bit it has
//! set (in pivot insertion order). A zero result means the entry is
//! redundant; otherwise its lowest set bit becomes a new pivot.
//!
//! The four-Russians variant processes pivots in blocks of `b`: once a
//! block is complete it is back-substituted so that each block vector is
//! zero at the other block pivots. Every remaining vector is then bucketed
//! by its `b` pivot bits, and the XOR of the block vectors selected by a
//! bucket index is applied to the whole bucket at once. The elimination of
//! a vector against a block is unique, so both variants keep exactly the
//! same entries.
//!
//! Reduction is skipped when `len * ratio <= 2^(k-1)`: a table that is
//! small relative to its cut space dimension cannot shrink much.

use log::{debug, trace};

use crate::config::{FourRussiansConfig, ReducerKind, ReductionConfig};
use crate::cut::{BitPos, CutArena, CutId, CutSpace};
use crate::color_set::ColorSet;
use crate::metrics::Metrics;
use crate::partition::Partition;
use crate::table::{Entry, SubsetTable};

/// An incrementally built echelon basis of cut vectors.
#[derive(Debug)]
pub struct EchelonBasis {
    space: CutSpace,
    arena: CutArena,
    pivots: Vec<(BitPos, CutId)>,
}

impl EchelonBasis {
    pub fn new(active: ColorSet) -> Self {
        let space = CutSpace::new(active);
        let arena = CutArena::new(space.lanes());
        EchelonBasis {
            space,
            arena,
            pivots: Vec::new(),
        }
    }

    /// Number of basis vectors.
    pub fn rank(&self) -> usize {
        self.pivots.len()
    }

    /// Adds the cut vector of `p`. Returns false if it was already spanned.
    pub fn insert(&mut self, p: &Partition, metrics: &mut Metrics) -> bool {
        let v = self.arena.alloc();
        self.space.fill(p, self.arena.get_mut(v));
        metrics.cut_columns += 1;

        for &(pos, row) in &self.pivots {
            if self.arena.test(v, pos) {
                self.arena.xor_into(v, row);
                metrics.xor_ops += 1;
            }
        }

        match self.arena.first_set(v) {
            Some(bit) => {
                self.pivots.push((BitPos::new(bit), v));
                true
            }
            None => {
                self.arena.pop(v);
                false
            }
        }
    }

    /// Returns true if the cut vector of `p` lies in the span of the basis.
    pub fn spans(&mut self, p: &Partition, metrics: &mut Metrics) -> bool {
        if self.insert(p, metrics) {
            if let Some((_, v)) = self.pivots.pop() {
                self.arena.pop(v);
            }
            false
        } else {
            true
        }
    }
}

/// Returns true if a table of `len` entries over `k` colors is worth
/// reducing at `ratio`.
pub fn worth_reducing(len: usize, k: usize, ratio: f64) -> bool {
    len > 1 && (len as f64) * ratio > CutSpace::dimension_of(k) as f64
}

/// Reduces a subset table at the given threshold ratio.
pub fn reduce(table: SubsetTable, ratio: f64, config: &ReductionConfig, metrics: &mut Metrics) -> SubsetTable {
    let subset = table.subset();
    let k = subset.len();
    if !worth_reducing(table.len(), k, ratio) {
        return table;
    }

    let before = table.len();
    let mut sorted = table.into_entries();
    sorted.sort_by_key(|(_, e)| e.cost);

    let kept: Vec<(Partition, Entry)> = if k <= 1 {
        sorted.truncate(1);
        sorted
    } else {
        let keep = match config.reducer {
            ReducerKind::Incremental => reduce_incremental(subset, &sorted, metrics),
            ReducerKind::FourRussians => reduce_four_russians(subset, &sorted, &config.four_russians, metrics),
        };
        sorted.into_iter().zip(keep).filter(|(_, keep)| *keep).map(|(e, _)| e).collect()
    };

    metrics.reductions += 1;
    metrics.reduced_away += (before - kept.len()) as u64;
    trace!("Reduced subset {} from {} to {} entries", subset, before, kept.len());
    SubsetTable::from_entries(subset, kept)
}

fn reduce_incremental(subset: ColorSet, sorted: &[(Partition, Entry)], metrics: &mut Metrics) -> Vec<bool> {
    let mut basis = EchelonBasis::new(subset);
    sorted.iter().map(|(p, _)| basis.insert(p, metrics)).collect()
}

fn reduce_four_russians(
    subset: ColorSet,
    sorted: &[(Partition, Entry)],
    config: &FourRussiansConfig,
    metrics: &mut Metrics,
) -> Vec<bool> {
    let n = sorted.len();
    let space = CutSpace::new(subset);
    let mut arena = CutArena::with_capacity(space.lanes(), n + 1);

    let columns: Vec<CutId> = sorted
        .iter()
        .map(|(p, _)| {
            let id = arena.alloc();
            space.fill(p, arena.get_mut(id));
            id
        })
        .collect();
    metrics.cut_columns += n as u64;
    let correction = arena.alloc();

    let block = config.block.min(16);
    let mut buckets: Vec<Vec<CutId>> = vec![Vec::new(); 1 << block];
    let mut pivots: Vec<(BitPos, CutId)> = Vec::new();
    let mut start = 0;
    let mut keep = vec![false; n];
    let mut blocks = 0;

    for i in 0..n {
        let v = columns[i];
        for &(pos, row) in &pivots[start..] {
            if arena.test(v, pos) {
                arena.xor_into(v, row);
                metrics.xor_ops += 1;
            }
        }

        let Some(bit) = arena.first_set(v) else {
            continue;
        };
        keep[i] = true;
        pivots.push((BitPos::new(bit), v));

        if block == 0 || pivots.len() - start < block || n - i <= config.min_remaining {
            continue;
        }

        let current = &pivots[start..];

        // Back-substitute so each block vector is zero at the other pivots.
        for j in (0..current.len() - 1).rev() {
            for k in (j + 1..current.len()).rev() {
                if arena.test(current[j].1, current[k].0) {
                    arena.xor_into(current[j].1, current[k].1);
                    metrics.xor_ops += 1;
                }
            }
        }

        for &w in &columns[i + 1..] {
            let mut index = 0;
            for (b, &(pos, _)) in current.iter().enumerate() {
                if arena.test(w, pos) {
                    index |= 1 << b;
                }
            }
            buckets[index].push(w);
        }

        // Walk bucket indices in ascending order, updating the correction
        // vector by the bits that changed since the last non-empty bucket.
        arena.clear(correction);
        let mut prev = 0usize;
        for (index, bucket) in buckets.iter_mut().enumerate() {
            if bucket.is_empty() {
                continue;
            }
            let mut delta = index ^ prev;
            let mut b = 0;
            while delta != 0 {
                if delta & 1 != 0 {
                    arena.xor_into(correction, current[b].1);
                    metrics.xor_ops += 1;
                }
                b += 1;
                delta >>= 1;
            }
            prev = index;
            for w in bucket.drain(..) {
                arena.xor_into(w, correction);
                metrics.xor_ops += 1;
            }
        }

        start = pivots.len();
        blocks += 1;
    }

    if blocks > 0 {
        debug!("Four-Russians reduction of {} vectors used {} blocks", n, blocks);
    }
    keep
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;
    use crate::types::Color;

    fn set(colors: &[usize]) -> ColorSet {
        colors.iter().map(|&i| Color::new(i)).collect()
    }

    /// All partitions of `colors`, built by restricted growth strings.
    fn all_partitions(colors: &[usize]) -> Vec<Partition> {
        fn grow(colors: &[usize], pos: usize, blocks: &mut Vec<usize>, out: &mut Vec<Partition>) {
            if pos == colors.len() {
                let active: ColorSet = colors.iter().map(|&i| Color::new(i)).collect();
                let mut p = Partition::singletons(active);
                for i in 0..colors.len() {
                    for j in 0..i {
                        if blocks[i] == blocks[j] {
                            p.union(Color::new(colors[i]), Color::new(colors[j]));
                        }
                    }
                }
                out.push(p);
                return;
            }
            let max = blocks.iter().copied().max().map_or(0, |m| m + 1);
            for b in 0..=max {
                blocks.push(b);
                grow(colors, pos + 1, blocks, out);
                blocks.pop();
            }
        }
        let mut out = Vec::new();
        grow(colors, 0, &mut Vec::new(), &mut out);
        out
    }

    fn table_from(colors: &[usize], costs: impl Fn(usize) -> u64) -> SubsetTable {
        let parts = all_partitions(colors);
        SubsetTable::from_entries(
            set(colors),
            parts.into_iter().enumerate().map(|(i, p)| (p, Entry::new(costs(i), None))),
        )
    }

    fn forced(reducer: ReducerKind, min_remaining: usize) -> ReductionConfig {
        ReductionConfig {
            reducer,
            four_russians: FourRussiansConfig { block: 5, min_remaining },
            ..ReductionConfig::default()
        }
    }

    #[test]
    fn test_bell_numbers() {
        assert_eq!(all_partitions(&[0, 1, 2]).len(), 5);
        assert_eq!(all_partitions(&[0, 1, 2, 3, 4]).len(), 52);
    }

    #[test]
    fn test_reduction_keeps_rank_many() {
        let mut metrics = Metrics::default();
        let table = table_from(&[0, 1, 2, 3, 4], |i| (i as u64 * 7) % 11);
        let reduced = reduce(table, 1.0, &forced(ReducerKind::Incremental, 0), &mut metrics);
        // Cut matrix of all partitions has full rank 2^(k-1).
        assert_eq!(reduced.len(), 16);
        assert_eq!(metrics.reduced_away, 52 - 16);
    }

    #[test]
    fn test_reduction_soundness() {
        let mut metrics = Metrics::default();
        let table = table_from(&[0, 2, 3, 5, 6], |i| (i as u64 * 13) % 17);
        let original: Vec<(Partition, Entry)> = table.clone().into_entries();
        let reduced = reduce(table, 1.0, &forced(ReducerKind::Incremental, 0), &mut metrics);

        for (p, e) in &original {
            if reduced.get(p).is_some() {
                continue;
            }
            // A dropped entry is spanned by kept entries that are not more expensive.
            let mut basis = EchelonBasis::new(reduced.subset());
            for (q, f) in reduced.iter() {
                if f.cost <= e.cost {
                    basis.insert(q, &mut metrics);
                }
            }
            assert!(basis.spans(p, &mut metrics), "{} (cost {}) is not spanned", p, e.cost);
        }
    }

    #[test]
    fn test_four_russians_matches_incremental() {
        let colors = [0, 1, 2, 3, 4, 5];
        let table = table_from(&colors, |i| (i as u64 * 31) % 23);
        assert_eq!(table.len(), 203);

        let mut m1 = Metrics::default();
        let mut m2 = Metrics::default();
        let a = reduce(table.clone(), 1.0, &forced(ReducerKind::Incremental, 0), &mut m1);
        let b = reduce(table, 1.0, &forced(ReducerKind::FourRussians, 0), &mut m2);

        let keys_a: Vec<Partition> = a.iter().map(|(p, _)| *p).collect();
        let keys_b: Vec<Partition> = b.iter().map(|(p, _)| *p).collect();
        assert_eq!(keys_a, keys_b);
        assert_eq!(keys_a.len(), 32);
    }

    #[test]
    fn test_skipped_when_small() {
        let mut metrics = Metrics::default();
        let table = table_from(&[0, 1, 2], |_| 1);
        // 5 entries * 0.125 <= 4 cuts
        let same = reduce(table, 0.125, &ReductionConfig::default(), &mut metrics);
        assert_eq!(same.len(), 5);
        assert_eq!(metrics.reductions, 0);
    }

    #[test]
    fn test_cheapest_survives() {
        let mut metrics = Metrics::default();
        let colors = [0, 1, 2, 3];
        let table = table_from(&colors, |i| if i == 9 { 0 } else { 10 + i as u64 });
        let cheapest = *table.iter().nth(9).map(|(p, _)| p).expect("15 partitions");
        let reduced = reduce(table, 1.0, &forced(ReducerKind::FourRussians, 0), &mut metrics);
        assert_eq!(reduced.get(&cheapest).map(|e| e.cost), Some(0));
        assert_eq!(reduced.min_entry().map(|(p, _)| *p), Some(cheapest));
    }

    #[test]
    fn test_single_color_keeps_minimum() {
        let mut metrics = Metrics::default();
        let mut table = SubsetTable::new(set(&[4]));
        table.upsert(Partition::singletons(set(&[4])), Entry::new(3, None));
        let reduced = reduce(table, 1.0, &ReductionConfig::default(), &mut metrics);
        assert_eq!(reduced.len(), 1);
    }

    #[test]
    fn test_basis_rank_and_spans() {
        let mut metrics = Metrics::default();
        let active = set(&[0, 1, 2]);
        let mut basis = EchelonBasis::new(active);
        let singles = Partition::singletons(active);
        let mut all = singles;
        all.union(Color::new(0), Color::new(1));
        all.union(Color::new(1), Color::new(2));
        assert!(basis.insert(&singles, &mut metrics));
        assert!(basis.insert(&all, &mut metrics));
        assert!(!basis.insert(&all, &mut metrics));
        assert_eq!(basis.rank(), 2);
        let mut pair = singles;
        pair.union(Color::new(0), Color::new(1));
        assert!(!basis.spans(&pair, &mut metrics));
        assert_eq!(basis.rank(), 2);
    }
}
