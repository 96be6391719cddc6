//! Type-safe wrappers for graph and decomposition identifiers.
//!
//! Vertices, edges and bags all live in flat arenas and are referenced by
//! index. The newtypes below keep those indices apart at compile time.
use std::fmt;

/// Edge weights and accumulated solution costs.
///
/// [`Cost::MAX`] is used as the "infinite" sentinel.
pub type Cost = u64;

/// Largest supported bag size (treewidth 31).
///
/// Bag-local data (colors, partitions, active subsets) is packed into `u32`
/// masks and fixed-size arrays of this length.
pub const MAX_BAG_SIZE: usize = 32;

/// A vertex identifier (0-indexed).
///
/// Text formats are 1-indexed; the conversion happens in [`crate::io`].
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct VertexId(u32);

impl VertexId {
    pub const fn new(index: u32) -> Self {
        VertexId(index)
    }

    /// Returns the raw index as a `usize`, suitable for indexing arenas.
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for VertexId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.0)
    }
}

impl From<usize> for VertexId {
    fn from(index: usize) -> Self {
        VertexId(index as u32)
    }
}

/// An edge identifier: index into [`crate::graph::Graph`]'s edge arena.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct EdgeId(u32);

impl EdgeId {
    pub const fn new(index: u32) -> Self {
        EdgeId(index)
    }

    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for EdgeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "e{}", self.0)
    }
}

impl From<usize> for EdgeId {
    fn from(index: usize) -> Self {
        EdgeId(index as u32)
    }
}

/// A bag identifier inside a (raw or canonical) tree decomposition.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct BagId(u32);

impl BagId {
    pub const fn new(index: u32) -> Self {
        BagId(index)
    }

    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for BagId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "B{}", self.0)
    }
}

impl From<usize> for BagId {
    fn from(index: usize) -> Self {
        BagId(index as u32)
    }
}

/// A bag-local vertex color in `0..MAX_BAG_SIZE`.
///
/// # Invariants
///
/// - Within a bag no two vertices share a color.
/// - A vertex has the same color in every bag that contains it.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Color(u8);

impl Color {
    /// Creates a new color.
    ///
    /// # Panics
    ///
    /// Panics if `index >= MAX_BAG_SIZE`.
    pub fn new(index: usize) -> Self {
        assert!(index < MAX_BAG_SIZE, "Color {} out of range", index);
        Color(index as u8)
    }

    pub const fn index(self) -> usize {
        self.0 as usize
    }

    /// The single-bit mask of this color.
    pub const fn bit(self) -> u32 {
        1 << self.0
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "c{}", self.0)
    }
}
