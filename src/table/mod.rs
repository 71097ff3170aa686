//! Construction tables that pick one probe function per key.
//!
//! Both variants share the same life cycle: exactly `max_entries` calls to
//! [`CuckooTable::prepare`], then any number of independent
//! [`CuckooTable::construct`] attempts, each a pure function of the prepared
//! entries, the table size and the seed.

mod matching;
mod random_walk;

pub use matching::HopcroftKarpMatchingCuckooHashTable;
pub use random_walk::{DEFAULT_MAX_DISPLACEMENTS, RandomWalkCuckooHashTable};

/// Default construction table.
pub type HeterogeneousCuckooHashTable = RandomWalkCuckooHashTable;

use crate::class::{ProbeMask, Thresholds};
use crate::hash::HashedKey;
use crate::util::BitSet;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TableEntry {
    pub hash: HashedKey,
    pub probe_index: u8,
    pub mask: ProbeMask,
}

impl TableEntry {
    /// Cell this entry currently targets.
    #[inline]
    pub fn cell(&self, m: usize, seed: u64) -> usize {
        self.hash.probe(seed.wrapping_add(self.probe_index as u64), m)
    }
}

/// Common contract of the construction strategies.
pub trait CuckooTable {
    fn new(max_entries: usize, thresholds: Thresholds) -> Self
    where
        Self: Sized;

    fn name() -> &'static str
    where
        Self: Sized;

    /// Adds one key. Panics when called more than `max_entries` times.
    fn prepare(&mut self, hash: HashedKey);

    /// Tries to give every prepared key its own cell among `m`.
    /// `false` means this `(m, seed)` pair has no assignment under this strategy.
    fn construct(&mut self, m: usize, seed: u64) -> bool;

    /// Prepared entries in `prepare` order. After a successful `construct`
    /// each `probe_index` is the chosen probe function.
    fn entries(&self) -> &[TableEntry];
}

/// Owned, insertion-ordered storage of the prepared entries.
#[derive(Debug)]
pub(crate) struct EntryHeap {
    entries: Vec<TableEntry>,
    max_entries: usize,
    thresholds: Thresholds,
}

impl EntryHeap {
    pub(crate) fn new(max_entries: usize, thresholds: Thresholds) -> Self {
        assert!(
            u32::try_from(max_entries).is_ok(),
            "at most u32::MAX entries are supported"
        );
        Self {
            entries: Vec::with_capacity(max_entries),
            max_entries,
            thresholds,
        }
    }

    pub(crate) fn prepare(&mut self, hash: HashedKey) {
        assert!(
            self.entries.len() < self.max_entries,
            "prepare() called more than max_entries ({}) times",
            self.max_entries
        );
        self.entries.push(TableEntry {
            hash,
            probe_index: 0,
            mask: self.thresholds.mask_for(hash.mhc),
        });
    }

    /// Starts a new attempt: every entry goes back to probe index 0.
    pub(crate) fn begin_attempt(&mut self) {
        assert_eq!(
            self.entries.len(),
            self.max_entries,
            "construct() called before all entries were prepared"
        );
        for entry in &mut self.entries {
            entry.probe_index = 0;
        }
    }

    #[inline]
    pub(crate) fn entries(&self) -> &[TableEntry] {
        &self.entries
    }

    #[inline]
    pub(crate) fn entries_mut(&mut self) -> &mut [TableEntry] {
        &mut self.entries
    }
}

/// Checks that every entry uses a permitted probe index and that no two
/// entries share a cell.
pub fn verify_assignment(entries: &[TableEntry], m: usize, seed: u64) -> bool {
    if entries.len() > m {
        return false;
    }
    let mut taken = BitSet::new(m);
    entries
        .iter()
        .all(|e| e.mask.allows(e.probe_index) && taken.insert(e.cell(m, seed)))
}
