//! Canonical connectivity partitions over the active colors of a bag.
//!
//! A [`Partition`] records which active bag vertices are already connected by
//! the edges chosen so far. Every active color stores the *smallest* color of
//! its class; inactive colors store themselves. Because this labeling is a
//! pure function of the equivalence classes, two partitions built by
//! different union sequences compare (and hash) equal exactly when they
//! describe the same classes, which is what table deduplication relies on.
//!
//! # Operations
//!
//! - [`activate`][Partition::activate]: new colors join as singletons.
//! - [`union`][Partition::union]: merge two classes, relabeling the larger
//!   representative to the smaller one.
//! - [`restrict`][Partition::restrict]: project onto a narrower subset,
//!   re-electing the smallest surviving member of each class.
//! - [`merge`][Partition::merge]: combine two partitions over the same
//!   subset, failing when the union of both forests would close a cycle.

use std::fmt;

use crate::color_set::ColorSet;
use crate::types::{Color, MAX_BAG_SIZE};

/// Equivalence classes over an active color subset, in canonical form.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Partition {
    active: ColorSet,
    labels: [u8; MAX_BAG_SIZE],
}

const IDENTITY: [u8; MAX_BAG_SIZE] = {
    let mut labels = [0u8; MAX_BAG_SIZE];
    let mut i = 0;
    while i < MAX_BAG_SIZE {
        labels[i] = i as u8;
        i += 1;
    }
    labels
};

impl Default for Partition {
    fn default() -> Self {
        Partition::empty()
    }
}

impl Partition {
    /// The partition with no active colors.
    pub const fn empty() -> Self {
        Partition {
            active: ColorSet::EMPTY,
            labels: IDENTITY,
        }
    }

    /// All colors of `active` as singleton classes.
    pub fn singletons(active: ColorSet) -> Self {
        Partition { active, labels: IDENTITY }
    }

    #[inline]
    pub fn active(&self) -> ColorSet {
        self.active
    }

    /// Returns the representative (smallest member) of the class of `c`.
    #[inline]
    pub fn find(&self, c: Color) -> Color {
        debug_assert!(self.active.contains(c), "{} is not active in {}", c, self);
        Color::new(self.labels[c.index()] as usize)
    }

    #[inline]
    pub fn same(&self, a: Color, b: Color) -> bool {
        self.labels[a.index()] == self.labels[b.index()]
    }

    /// Returns a copy where every color of `add` is a new singleton class.
    ///
    /// # Panics
    ///
    /// Panics if some color of `add` is already active.
    pub fn activate(&self, add: ColorSet) -> Partition {
        assert!(
            add.intersection(self.active).is_empty(),
            "Colors {} are already active in {}",
            add.intersection(self.active),
            self
        );
        let mut result = *self;
        result.active = self.active.union(add);
        for c in add {
            result.labels[c.index()] = c.index() as u8;
        }
        result
    }

    /// Merges the classes of `a` and `b`.
    ///
    /// Returns false (leaving the partition untouched) if they were already
    /// in the same class.
    pub fn union(&mut self, a: Color, b: Color) -> bool {
        let ra = self.find(a);
        let rb = self.find(b);
        if ra == rb {
            return false;
        }
        let (keep, drop) = if ra < rb { (ra, rb) } else { (rb, ra) };
        for c in self.active {
            if self.labels[c.index()] == drop.index() as u8 {
                self.labels[c.index()] = keep.index() as u8;
            }
        }
        true
    }

    /// Number of classes.
    pub fn count_components(&self) -> usize {
        self.active.iter().filter(|c| self.labels[c.index()] == c.index() as u8).count()
    }

    /// Number of distinct classes met by the colors of `subset`.
    pub fn count_components_in(&self, subset: ColorSet) -> usize {
        let mut seen = 0u32;
        for c in subset.intersection(self.active) {
            seen |= 1 << self.labels[c.index()];
        }
        seen.count_ones() as usize
    }

    /// Projects the partition onto `subset`, which must be a subset of the
    /// active colors. Each class is relabeled by its smallest surviving color.
    pub fn restrict(&self, subset: ColorSet) -> Partition {
        debug_assert!(subset.is_subset(self.active), "Cannot restrict {} to {}", self, subset);
        let mut relabel = [u8::MAX; MAX_BAG_SIZE];
        let mut result = Partition::singletons(subset);
        for c in subset {
            let old = self.labels[c.index()] as usize;
            if relabel[old] == u8::MAX {
                relabel[old] = c.index() as u8;
            }
            result.labels[c.index()] = relabel[old];
        }
        result
    }

    /// Combines two partitions over the same active subset.
    ///
    /// Each class of `other` is read as a spanning star around its
    /// representative. Those star edges are added to `self` one by one; if
    /// any of them joins two colors that are already connected, the union of
    /// both forests contains a cycle and `None` is returned.
    pub fn merge(&self, other: &Partition) -> Option<Partition> {
        assert_eq!(self.active, other.active, "Cannot merge partitions over different subsets");
        let mut result = *self;
        for c in other.active {
            let r = other.find(c);
            if r != c && !result.union(c, r) {
                return None;
            }
        }
        Some(result)
    }

    /// Iterates over class representatives in ascending order.
    pub fn representatives(&self) -> impl Iterator<Item = Color> + '_ {
        self.active.iter().filter(move |c| self.labels[c.index()] == c.index() as u8)
    }

    /// Returns the members of the class represented by `rep`.
    pub fn class_of(&self, rep: Color) -> ColorSet {
        self.active
            .iter()
            .filter(|c| self.labels[c.index()] == rep.index() as u8)
            .collect()
    }
}

impl fmt::Display for Partition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, rep) in self.representatives().enumerate() {
            if i > 0 {
                write!(f, "|")?;
            }
            for (j, c) in self.class_of(rep).iter().enumerate() {
                if j > 0 {
                    write!(f, " ")?;
                }
                write!(f, "{}", c.index())?;
            }
        }
        write!(f, "]")
    }
}

#[cfg(test)]
mod tests {
    use std::collections::hash_map::DefaultHasher;
    use std::hash::{Hash, Hasher};

    use test_log::test;

    use super::*;

    fn c(i: usize) -> Color {
        Color::new(i)
    }

    fn set(colors: &[usize]) -> ColorSet {
        colors.iter().map(|&i| c(i)).collect()
    }

    fn hash_of(p: &Partition) -> u64 {
        let mut h = DefaultHasher::new();
        p.hash(&mut h);
        h.finish()
    }

    #[test]
    fn test_canonical_regardless_of_union_order() {
        let mut a = Partition::singletons(set(&[0, 1, 2, 3]));
        a.union(c(0), c(1));
        a.union(c(2), c(3));
        a.union(c(1), c(2));

        let mut b = Partition::singletons(set(&[0, 1, 2, 3]));
        b.union(c(2), c(3));
        b.union(c(0), c(2));
        b.union(c(0), c(1));

        assert_eq!(a, b);
        assert_eq!(hash_of(&a), hash_of(&b));
        assert_eq!(a.find(c(3)), c(0));
    }

    #[test]
    fn test_union_reports_existing_connection() {
        let mut p = Partition::singletons(set(&[1, 4, 6]));
        assert!(p.union(c(6), c(4)));
        assert!(!p.union(c(4), c(6)));
        assert_eq!(p.find(c(6)), c(4));
        assert_eq!(p.count_components(), 2);
        assert_eq!(p.to_string(), "[1|4 6]");
    }

    #[test]
    fn test_activate_adds_singletons() {
        let mut p = Partition::singletons(set(&[0, 2]));
        p.union(c(0), c(2));
        let q = p.activate(set(&[1, 5]));
        assert_eq!(q.active(), set(&[0, 1, 2, 5]));
        assert_eq!(q.count_components(), 3);
        assert_eq!(q.find(c(2)), c(0));
        assert_eq!(q.find(c(1)), c(1));
    }

    #[test]
    #[should_panic(expected = "already active")]
    fn test_activate_twice_panics() {
        Partition::singletons(set(&[0, 2])).activate(set(&[2]));
    }

    #[test]
    fn test_restrict_reelects_representative() {
        let mut p = Partition::singletons(set(&[0, 1, 2, 3]));
        p.union(c(0), c(3));
        p.union(c(1), c(2));
        let q = p.restrict(set(&[1, 2, 3]));
        assert_eq!(q.find(c(3)), c(3));
        assert_eq!(q.find(c(2)), c(1));

        let mut expected = Partition::singletons(set(&[1, 2, 3]));
        expected.union(c(2), c(1));
        assert_eq!(q, expected);
    }

    #[test]
    fn test_count_components_in() {
        let mut p = Partition::singletons(set(&[0, 1, 2]));
        p.union(c(0), c(1));
        // Dropping 1 keeps the class alive through 0.
        assert_eq!(p.count_components_in(set(&[0, 2])), 2);
        // Dropping 2 loses its whole class.
        assert_eq!(p.count_components_in(set(&[0, 1])), 1);
    }

    #[test]
    fn test_merge_accepts_forest() {
        let mut left = Partition::singletons(set(&[0, 1, 2]));
        left.union(c(0), c(1));
        let mut right = Partition::singletons(set(&[0, 1, 2]));
        right.union(c(1), c(2));
        let merged = left.merge(&right).expect("no cycle");
        assert_eq!(merged.count_components(), 1);
    }

    #[test]
    fn test_merge_rejects_cycle() {
        let mut left = Partition::singletons(set(&[0, 1, 2]));
        left.union(c(0), c(1));
        left.union(c(1), c(2));
        let mut right = Partition::singletons(set(&[0, 1, 2]));
        right.union(c(0), c(2));
        assert_eq!(left.merge(&right), None);
        assert_eq!(right.merge(&left), None);
    }

    #[test]
    fn test_merge_rejects_cycle_through_later_color() {
        // Left connects {0,2} and {1,3}; right connects {0,1} and {2,3}.
        // Together they form the 4-cycle 0-2-3-1-0.
        let mut left = Partition::singletons(set(&[0, 1, 2, 3]));
        left.union(c(0), c(2));
        left.union(c(1), c(3));
        let mut right = Partition::singletons(set(&[0, 1, 2, 3]));
        right.union(c(0), c(1));
        right.union(c(2), c(3));
        assert_eq!(left.merge(&right), None);
    }
}
