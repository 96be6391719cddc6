//! Partial-solution tables.
//!
//! A [`DpTable`] is the per-bag DP state: for every active subset it holds a
//! [`SubsetTable`] mapping canonical partitions to the cheapest [`Entry`]
//! found so far. Subset tables keep entries in insertion order, so
//! iteration (and everything derived from it, such as the stable cost sort
//! of the reducer) is deterministic.
//!
//! # Upsert-with-min
//!
//! [`SubsetTable::upsert`] inserts a new key, or replaces an existing one
//! only when the new cost is strictly lower. Equal or higher costs are
//! no-ops, so repeated inserts are idempotent.

use std::collections::hash_map::DefaultHasher;
use std::collections::{BTreeMap, HashMap};
use std::hash::BuildHasherDefault;

use crate::color_set::ColorSet;
use crate::partition::Partition;
use crate::provenance::ProvId;
use crate::types::Cost;

/// Fixed-key hasher state: equal inputs give equal iteration orders.
pub type DetState = BuildHasherDefault<DefaultHasher>;

/// Cost and provenance of one partial solution.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct Entry {
    pub cost: Cost,
    pub origin: Option<ProvId>,
}

impl Entry {
    pub const fn new(cost: Cost, origin: Option<ProvId>) -> Self {
        Entry { cost, origin }
    }
}

/// All entries sharing one active subset.
#[derive(Debug, Clone)]
pub struct SubsetTable {
    subset: ColorSet,
    entries: Vec<(Partition, Entry)>,
    index: HashMap<Partition, usize, DetState>,
}

impl SubsetTable {
    pub fn new(subset: ColorSet) -> Self {
        SubsetTable {
            subset,
            entries: Vec::new(),
            index: HashMap::default(),
        }
    }

    /// Builds a table from entries, applying upsert-with-min on duplicates.
    pub fn from_entries(subset: ColorSet, entries: impl IntoIterator<Item = (Partition, Entry)>) -> Self {
        let mut table = SubsetTable::new(subset);
        for (p, e) in entries {
            table.upsert(p, e);
        }
        table
    }

    #[inline]
    pub fn subset(&self) -> ColorSet {
        self.subset
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Inserts `(p, entry)` unless an entry for `p` with cost at most
    /// `entry.cost` exists. Returns true if the table changed.
    ///
    /// # Panics
    ///
    /// Panics if `p` is not over this table's subset.
    pub fn upsert(&mut self, p: Partition, entry: Entry) -> bool {
        assert_eq!(p.active(), self.subset, "Partition {} does not belong to subset {}", p, self.subset);
        match self.index.get(&p) {
            Some(&i) => {
                let slot = &mut self.entries[i].1;
                if entry.cost < slot.cost {
                    *slot = entry;
                    true
                } else {
                    false
                }
            }
            None => {
                self.index.insert(p, self.entries.len());
                self.entries.push((p, entry));
                true
            }
        }
    }

    pub fn get(&self, p: &Partition) -> Option<&Entry> {
        self.index.get(p).map(|&i| &self.entries[i].1)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Partition, &Entry)> + '_ {
        self.entries.iter().map(|(p, e)| (p, e))
    }

    pub fn into_entries(self) -> Vec<(Partition, Entry)> {
        self.entries
    }

    /// The first cheapest entry, in insertion order.
    pub fn min_entry(&self) -> Option<(&Partition, &Entry)> {
        let mut best: Option<(&Partition, &Entry)> = None;
        for (p, e) in self.iter() {
            if best.map_or(true, |(_, b)| e.cost < b.cost) {
                best = Some((p, e));
            }
        }
        best
    }
}

/// A DP table: subset tables keyed by active subset, in ascending subset order.
#[derive(Debug, Clone, Default)]
pub struct DpTable {
    subsets: BTreeMap<ColorSet, SubsetTable>,
}

impl DpTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// The base table: a single empty partition of cost 0.
    pub fn leaf() -> Self {
        let mut table = DpTable::new();
        table.upsert(Partition::empty(), Entry::new(0, None));
        table
    }

    pub fn upsert(&mut self, p: Partition, entry: Entry) -> bool {
        self.subsets
            .entry(p.active())
            .or_insert_with(|| SubsetTable::new(p.active()))
            .upsert(p, entry)
    }

    /// Stores a subset table, dropping it if empty.
    pub fn insert_subset(&mut self, table: SubsetTable) {
        if table.is_empty() {
            self.subsets.remove(&table.subset());
        } else {
            self.subsets.insert(table.subset(), table);
        }
    }

    pub fn subset(&self, subset: ColorSet) -> Option<&SubsetTable> {
        self.subsets.get(&subset)
    }

    pub fn remove_subset(&mut self, subset: ColorSet) -> Option<SubsetTable> {
        self.subsets.remove(&subset)
    }

    pub fn subsets(&self) -> impl Iterator<Item = &SubsetTable> + '_ {
        self.subsets.values()
    }

    pub fn num_subsets(&self) -> usize {
        self.subsets.len()
    }

    /// Total number of entries over all subsets.
    pub fn len(&self) -> usize {
        self.subsets.values().map(SubsetTable::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.subsets.is_empty()
    }

    /// The cheapest entry whose partition has exactly one class.
    pub fn best_connected(&self) -> Option<(&Partition, &Entry)> {
        let mut best: Option<(&Partition, &Entry)> = None;
        for table in self.subsets.values() {
            for (p, e) in table.iter() {
                if p.count_components() == 1 && e.cost != Cost::MAX && best.map_or(true, |(_, b)| e.cost < b.cost) {
                    best = Some((p, e));
                }
            }
        }
        best
    }
}

impl IntoIterator for DpTable {
    type Item = SubsetTable;
    type IntoIter = std::collections::btree_map::IntoValues<ColorSet, SubsetTable>;

    fn into_iter(self) -> Self::IntoIter {
        self.subsets.into_values()
    }
}
