//! Bitmask sets of bag colors.
//!
//! A [`ColorSet`] is the DP's "active subset": which bag vertices (identified
//! by color) currently take part in a partial Steiner tree. Bags hold at most
//! [`MAX_BAG_SIZE`] vertices, so a single `u32` word is enough.

use std::fmt;

use crate::types::{Color, MAX_BAG_SIZE};

/// A set of colors packed into a `u32`.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct ColorSet(u32);

impl ColorSet {
    pub const EMPTY: ColorSet = ColorSet(0);

    pub const fn from_bits(bits: u32) -> Self {
        ColorSet(bits)
    }

    pub const fn bits(self) -> u32 {
        self.0
    }

    /// Returns the number of colors in the set.
    #[inline]
    pub const fn len(self) -> usize {
        self.0.count_ones() as usize
    }

    #[inline]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub const fn contains(self, color: Color) -> bool {
        self.0 & color.bit() != 0
    }

    #[inline]
    pub fn insert(&mut self, color: Color) {
        self.0 |= color.bit();
    }

    #[inline]
    pub fn remove(&mut self, color: Color) {
        self.0 &= !color.bit();
    }

    #[inline]
    pub const fn union(self, other: ColorSet) -> ColorSet {
        ColorSet(self.0 | other.0)
    }

    #[inline]
    pub const fn intersection(self, other: ColorSet) -> ColorSet {
        ColorSet(self.0 & other.0)
    }

    #[inline]
    pub const fn difference(self, other: ColorSet) -> ColorSet {
        ColorSet(self.0 & !other.0)
    }

    #[inline]
    pub const fn is_subset(self, other: ColorSet) -> bool {
        self.0 & !other.0 == 0
    }

    /// Returns the smallest color in the set, if any.
    pub fn first(self) -> Option<Color> {
        if self.0 == 0 {
            None
        } else {
            Some(Color::new(self.0.trailing_zeros() as usize))
        }
    }

    /// Iterates over the colors in ascending order.
    pub fn iter(self) -> ColorSetIter {
        ColorSetIter { word: self.0 }
    }
}

impl FromIterator<Color> for ColorSet {
    fn from_iter<I: IntoIterator<Item = Color>>(iter: I) -> Self {
        let mut set = ColorSet::EMPTY;
        for color in iter {
            set.insert(color);
        }
        set
    }
}

impl IntoIterator for ColorSet {
    type Item = Color;
    type IntoIter = ColorSetIter;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl fmt::Display for ColorSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, color) in self.iter().enumerate() {
            if i > 0 {
                write!(f, ",")?;
            }
            write!(f, "{}", color.index())?;
        }
        write!(f, "}}")
    }
}

/// Ascending iterator over the colors of a [`ColorSet`].
pub struct ColorSetIter {
    word: u32,
}

impl Iterator for ColorSetIter {
    type Item = Color;

    fn next(&mut self) -> Option<Self::Item> {
        if self.word == 0 {
            return None;
        }
        let index = self.word.trailing_zeros() as usize;
        self.word &= self.word - 1; // Clear lowest set bit
        debug_assert!(index < MAX_BAG_SIZE);
        Some(Color::new(index))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = self.word.count_ones() as usize;
        (n, Some(n))
    }
}

impl ExactSizeIterator for ColorSetIter {}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;

    fn set(colors: &[usize]) -> ColorSet {
        colors.iter().map(|&c| Color::new(c)).collect()
    }

    #[test]
    fn test_insert_remove() {
        let mut s = ColorSet::EMPTY;
        assert!(s.is_empty());
        s.insert(Color::new(3));
        s.insert(Color::new(0));
        assert_eq!(s.len(), 2);
        assert!(s.contains(Color::new(3)));
        s.remove(Color::new(3));
        assert!(!s.contains(Color::new(3)));
        assert_eq!(s, set(&[0]));
    }

    #[test]
    fn test_set_algebra() {
        let a = set(&[0, 1, 4]);
        let b = set(&[1, 2]);
        assert_eq!(a.union(b), set(&[0, 1, 2, 4]));
        assert_eq!(a.intersection(b), set(&[1]));
        assert_eq!(a.difference(b), set(&[0, 4]));
        assert!(set(&[1]).is_subset(a));
        assert!(!b.is_subset(a));
        assert!(ColorSet::EMPTY.is_subset(b));
    }

    #[test]
    fn test_iter_ascending() {
        let s = set(&[31, 5, 0, 17]);
        let colors: Vec<usize> = s.iter().map(|c| c.index()).collect();
        assert_eq!(colors, vec![0, 5, 17, 31]);
        assert_eq!(s.first(), Some(Color::new(0)));
        assert_eq!(ColorSet::EMPTY.first(), None);
    }

    #[test]
    fn test_display() {
        assert_eq!(set(&[2, 0]).to_string(), "{0,2}");
        assert_eq!(ColorSet::EMPTY.to_string(), "{}");
    }
}
