//! heterogeneous_cuckoo — key assignment for heterogeneous cuckoo perfect hashing.
//!
//! - Every key gets a 64-bit fingerprint; two thresholds split the fingerprint
//!   domain into classes allowed one, two or three probe functions.
//! - A construction table picks one permitted probe function per key so that
//!   all keys land on distinct cells: either by cuckoo random walk (fast) or by
//!   Hopcroft–Karp matching (exact).
//! - Queries recompute a key's cell from its fingerprint and the stored probe
//!   index alone.

mod builder;
pub mod class;
pub mod hash;
pub mod matching;
pub mod table;
mod util;

pub use builder::{BucketPlacement, BuildConfig, BuildError, Builder, Placement, Strategy};
pub use class::{ProbeMask, Thresholds};
pub use hash::HashedKey;
pub use matching::BipartiteMatching;
pub use table::{
    CuckooTable, HopcroftKarpMatchingCuckooHashTable, RandomWalkCuckooHashTable, TableEntry,
    verify_assignment,
};
