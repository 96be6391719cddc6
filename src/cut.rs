//! Cut vectors: the GF(2) encoding of a partition's connectivity.
//!
//! Fix an active subset of `k` colors and let its smallest color be the
//! *anchor*. A *cut* puts every non-anchor color on side 0 or side 1 (the
//! anchor always sits on side 0), so there are `2^(k-1)` cuts; cut index bit
//! `i-1` holds the side of the `i`-th active color. A partition is
//! *consistent* with a cut when none of its classes is split by it. The cut
//! vector of a partition has a 1 for every consistent cut.
//!
//! # Layout
//!
//! Vectors are packed into fixed-width [`Lane`]s of four `u64` words, so
//! elimination and zero tests run lane by lane. A bit position is
//! precomputed once as a [`BitPos`] `(lane, word, mask)` triple, which makes
//! testing a pivot bit a single load and AND.
//!
//! # Storage
//!
//! Vectors live in a [`CutArena`]: one flat buffer, addressed by [`CutId`],
//! owned by the reduction that uses it and reset or dropped as a whole when
//! the reduction finishes.

use std::ops::BitXorAssign;

use crate::color_set::ColorSet;
use crate::partition::Partition;
use crate::types::{Color, MAX_BAG_SIZE};

pub const LANE_WORDS: usize = 4;
pub const LANE_BITS: usize = LANE_WORDS * 64;

/// 256 bits of a cut vector.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
#[repr(align(32))]
pub struct Lane(pub [u64; LANE_WORDS]);

impl Lane {
    pub const ZERO: Lane = Lane([0; LANE_WORDS]);

    #[inline]
    pub fn is_zero(&self) -> bool {
        self.0.iter().all(|&w| w == 0)
    }

    /// Index of the lowest set bit inside this lane.
    #[inline]
    pub fn first_set(&self) -> Option<usize> {
        self.0
            .iter()
            .position(|&w| w != 0)
            .map(|i| i * 64 + self.0[i].trailing_zeros() as usize)
    }
}

impl BitXorAssign for Lane {
    #[inline]
    fn bitxor_assign(&mut self, rhs: Lane) {
        for (a, b) in self.0.iter_mut().zip(rhs.0) {
            *a ^= b;
        }
    }
}

/// A precomputed bit position inside a lane-packed vector.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct BitPos {
    lane: u32,
    word: u8,
    mask: u64,
}

impl BitPos {
    pub fn new(index: usize) -> Self {
        let in_lane = index % LANE_BITS;
        BitPos {
            lane: (index / LANE_BITS) as u32,
            word: (in_lane / 64) as u8,
            mask: 1u64 << (in_lane % 64),
        }
    }

    pub fn index(self) -> usize {
        self.lane as usize * LANE_BITS + self.word as usize * 64 + self.mask.trailing_zeros() as usize
    }

    #[inline]
    pub fn test(self, v: &[Lane]) -> bool {
        v[self.lane as usize].0[self.word as usize] & self.mask != 0
    }

    #[inline]
    pub fn set(self, v: &mut [Lane]) {
        v[self.lane as usize].0[self.word as usize] |= self.mask;
    }
}

/// Returns the index of the lowest set bit of a vector.
pub fn first_set(v: &[Lane]) -> Option<usize> {
    v.iter()
        .enumerate()
        .find_map(|(i, lane)| lane.first_set().map(|b| i * LANE_BITS + b))
}

/// The cut space of one active subset.
#[derive(Debug, Clone)]
pub struct CutSpace {
    colors: Vec<Color>,
    dimension: usize,
    lanes: usize,
}

impl CutSpace {
    pub fn new(active: ColorSet) -> Self {
        let colors: Vec<Color> = active.iter().collect();
        let dimension = Self::dimension_of(colors.len());
        CutSpace {
            colors,
            dimension,
            lanes: dimension.div_ceil(LANE_BITS),
        }
    }

    /// Number of cuts of a subset with `k` active colors: `2^(k-1)`, and 1 when empty.
    pub fn dimension_of(k: usize) -> usize {
        if k <= 1 {
            1
        } else {
            1usize << (k - 1)
        }
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Lanes per vector.
    pub fn lanes(&self) -> usize {
        self.lanes
    }

    /// Writes the cut vector of `p` into `out`, which must be zeroed.
    ///
    /// Each non-anchor class contributes the mask of its cut bits; walking
    /// the subsets of classes in Gray-code order flips one class per step,
    /// so every consistent cut is emitted with a single XOR.
    pub fn fill(&self, p: &Partition, out: &mut [Lane]) {
        debug_assert_eq!(out.len(), self.lanes);
        debug_assert_eq!(p.active(), self.colors.iter().copied().collect::<ColorSet>());

        if self.colors.len() <= 1 {
            BitPos::new(0).set(out);
            return;
        }

        let anchor = p.find(self.colors[0]);
        // One spare slot: the last Gray step reads one class past the end.
        let mut class_masks = [0usize; MAX_BAG_SIZE + 1];
        let mut slot = [u8::MAX; MAX_BAG_SIZE];
        let mut classes = 0;
        for (i, &c) in self.colors.iter().enumerate().skip(1) {
            let rep = p.find(c);
            if rep == anchor {
                continue;
            }
            if slot[rep.index()] == u8::MAX {
                slot[rep.index()] = classes as u8;
                classes += 1;
            }
            class_masks[slot[rep.index()] as usize] |= 1 << (i - 1);
        }

        let mut cut = 0usize;
        for i in 0..(1usize << classes) {
            BitPos::new(cut).set(out);
            let mut delta = i ^ (i + 1);
            let mut j = 0;
            while delta != 0 {
                cut ^= class_masks[j];
                j += 1;
                delta >>= 1;
            }
        }
    }

    /// Convenience wrapper returning a freshly allocated vector.
    pub fn vector(&self, p: &Partition) -> Vec<Lane> {
        let mut out = vec![Lane::ZERO; self.lanes];
        self.fill(p, &mut out);
        out
    }
}

/// Handle to a vector inside a [`CutArena`].
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct CutId(u32);

impl CutId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Flat storage for same-length cut vectors.
#[derive(Debug, Clone)]
pub struct CutArena {
    lanes: usize,
    data: Vec<Lane>,
}

impl CutArena {
    pub fn new(lanes: usize) -> Self {
        CutArena { lanes, data: Vec::new() }
    }

    pub fn with_capacity(lanes: usize, vectors: usize) -> Self {
        CutArena {
            lanes,
            data: Vec::with_capacity(lanes * vectors),
        }
    }

    /// Number of vectors currently allocated.
    pub fn len(&self) -> usize {
        self.data.len() / self.lanes
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Allocates a zeroed vector.
    pub fn alloc(&mut self) -> CutId {
        let id = CutId(self.len() as u32);
        self.data.resize(self.data.len() + self.lanes, Lane::ZERO);
        id
    }

    /// Releases the most recently allocated vector.
    ///
    /// # Panics
    ///
    /// Panics if `id` is not the last allocated vector.
    pub fn pop(&mut self, id: CutId) {
        assert_eq!(id.index() + 1, self.len(), "Only the last vector can be released");
        self.data.truncate(self.data.len() - self.lanes);
    }

    /// Drops every vector, keeping the buffer for reuse.
    pub fn reset(&mut self) {
        self.data.clear();
    }

    #[inline]
    fn range(&self, id: CutId) -> std::ops::Range<usize> {
        let start = id.index() * self.lanes;
        start..start + self.lanes
    }

    #[inline]
    pub fn get(&self, id: CutId) -> &[Lane] {
        &self.data[self.range(id)]
    }

    #[inline]
    pub fn get_mut(&mut self, id: CutId) -> &mut [Lane] {
        let range = self.range(id);
        &mut self.data[range]
    }

    #[inline]
    pub fn test(&self, id: CutId, pos: BitPos) -> bool {
        pos.test(self.get(id))
    }

    pub fn first_set(&self, id: CutId) -> Option<usize> {
        first_set(self.get(id))
    }

    pub fn is_zero(&self, id: CutId) -> bool {
        self.get(id).iter().all(Lane::is_zero)
    }

    pub fn clear(&mut self, id: CutId) {
        self.get_mut(id).fill(Lane::ZERO);
    }

    /// `dst ^= src`.
    ///
    /// # Panics
    ///
    /// Panics if `dst == src`.
    #[inline]
    pub fn xor_into(&mut self, dst: CutId, src: CutId) {
        assert_ne!(dst, src, "Cannot XOR a vector into itself");
        let lanes = self.lanes;
        let (d, s) = (dst.index() * lanes, src.index() * lanes);
        let (dst_slice, src_slice) = if d < s {
            let (head, tail) = self.data.split_at_mut(s);
            (&mut head[d..d + lanes], &tail[..lanes])
        } else {
            let (head, tail) = self.data.split_at_mut(d);
            (&mut tail[..lanes], &head[s..s + lanes])
        };
        for (a, &b) in dst_slice.iter_mut().zip(src_slice.iter()) {
            *a ^= b;
        }
    }
}
