use super::{CuckooTable, EntryHeap, TableEntry};
use crate::class::Thresholds;
use crate::hash::HashedKey;

/// Displacements allowed per inserted key before the attempt is abandoned.
pub const DEFAULT_MAX_DISPLACEMENTS: usize = 10_000;

/// Cuckoo insertion by random walk: an evicted key moves on to its next
/// permitted probe function.
#[derive(Debug)]
pub struct RandomWalkCuckooHashTable {
    heap: EntryHeap,
    cells: Vec<Option<u32>>,
    max_displacements: usize,
}

impl RandomWalkCuckooHashTable {
    pub fn with_max_displacements(mut self, max_displacements: usize) -> Self {
        self.max_displacements = max_displacements;
        self
    }

    pub fn max_displacements(&self) -> usize {
        self.max_displacements
    }

    /// Places entry `start`, walking the eviction chain it triggers.
    fn insert(&mut self, start: u32, m: usize, seed: u64) -> bool {
        let max_displacements = self.max_displacements;
        let entries = self.heap.entries_mut();
        let mut in_hand = start;
        let mut displacements = 0usize;
        loop {
            let cell = entries[in_hand as usize].cell(m, seed);
            let Some(evicted) = self.cells[cell].replace(in_hand) else {
                return true;
            };
            if displacements == max_displacements {
                // `evicted` stays out of the table; the attempt is over anyway.
                return false;
            }
            displacements += 1;
            let e = &mut entries[evicted as usize];
            e.probe_index = e.mask.next_after(e.probe_index);
            in_hand = evicted;
        }
    }
}

impl CuckooTable for RandomWalkCuckooHashTable {
    fn new(max_entries: usize, thresholds: Thresholds) -> Self {
        Self {
            heap: EntryHeap::new(max_entries, thresholds),
            cells: Vec::new(),
            max_displacements: DEFAULT_MAX_DISPLACEMENTS,
        }
    }

    fn name() -> &'static str {
        "RandomWalkCuckooHashTable"
    }

    fn prepare(&mut self, hash: HashedKey) {
        self.heap.prepare(hash);
    }

    fn construct(&mut self, m: usize, seed: u64) -> bool {
        self.heap.begin_attempt();
        self.cells.clear();
        self.cells.resize(m, None);

        let n = self.heap.entries().len();
        if n > m {
            log::debug!("{}: {n} keys cannot fit into {m} cells", Self::name());
            return false;
        }
        for i in 0..n as u32 {
            if !self.insert(i, m, seed) {
                log::debug!(
                    "{}: key {i} exceeded {} displacements (m={m}, seed={seed:#x})",
                    Self::name(),
                    self.max_displacements
                );
                return false;
            }
        }
        log::trace!("{}: placed {n} keys into {m} cells (seed={seed:#x})", Self::name());
        true
    }

    fn entries(&self) -> &[TableEntry] {
        self.heap.entries()
    }
}
