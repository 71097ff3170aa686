use super::{CuckooTable, EntryHeap, TableEntry};
use crate::class::Thresholds;
use crate::hash::HashedKey;
use crate::matching::{BipartiteMatching, UNMATCHED};

/// Exact construction: a perfect matching between keys and the cells their
/// permitted probe functions reach.
#[derive(Debug)]
pub struct HopcroftKarpMatchingCuckooHashTable {
    heap: EntryHeap,
}

impl CuckooTable for HopcroftKarpMatchingCuckooHashTable {
    fn new(max_entries: usize, thresholds: Thresholds) -> Self {
        Self {
            heap: EntryHeap::new(max_entries, thresholds),
        }
    }

    fn name() -> &'static str {
        "HopcroftKarpMatchingCuckooHashTable"
    }

    fn prepare(&mut self, hash: HashedKey) {
        self.heap.prepare(hash);
    }

    fn construct(&mut self, m: usize, seed: u64) -> bool {
        self.heap.begin_attempt();
        let n = self.heap.entries().len();
        if n > m {
            log::debug!("{}: {n} keys cannot fit into {m} cells", Self::name());
            return false;
        }

        let mut matching = BipartiteMatching::new(n, m);
        for (i, entry) in self.heap.entries().iter().enumerate() {
            for h in entry.mask.indices() {
                matching.add(i, entry.hash.probe(seed.wrapping_add(h as u64), m));
            }
        }

        let matched = matching.get_max_matching();
        if matched != n {
            log::debug!(
                "{}: matching size {matched}, N={n} (m={m}, seed={seed:#x})",
                Self::name()
            );
            return false;
        }

        // The solver only knows cells; recover which probe index reaches each.
        let cells = matching.match_from_left();
        for (entry, &cell) in self.heap.entries_mut().iter_mut().zip(cells) {
            debug_assert_ne!(cell, UNMATCHED);
            let target = cell as usize;
            entry.probe_index = entry
                .mask
                .indices()
                .find(|&h| entry.hash.probe(seed.wrapping_add(h as u64), m) == target)
                .expect("matched cell is reachable by a permitted index");
        }
        log::trace!("{}: matched {n} keys into {m} cells (seed={seed:#x})", Self::name());
        true
    }

    fn entries(&self) -> &[TableEntry] {
        self.heap.entries()
    }
}
