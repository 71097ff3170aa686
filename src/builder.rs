use crate::class::{ProbeMask, Thresholds};
use crate::hash::HashedKey;
use crate::table::{
    CuckooTable, DEFAULT_MAX_DISPLACEMENTS, HopcroftKarpMatchingCuckooHashTable,
    RandomWalkCuckooHashTable,
};
use crate::util::BitSet;
use std::borrow::Borrow;
use thiserror::Error;

/// Which construction table places the keys of each small table.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// Cuckoo displacement; fast, may miss assignments that exist.
    RandomWalk,
    /// Hopcroft–Karp; finds an assignment whenever one exists.
    Matching,
}

/// Build parameters.
#[derive(Debug, Clone)]
pub struct BuildConfig {
    /// Keys per small table (average). Each small table gets its own seed.
    pub bucket_size: usize,
    /// Keys per cell inside a small table, in (0, 1].
    pub load_factor: f64,
    /// Percent of the fingerprint domain restricted to one probe function.
    pub class1_percentage: f64,
    /// Percent of the fingerprint domain allowed two probe functions.
    pub class2_percentage: f64,
    /// Base salt for fingerprints. Effective salts are derived per round.
    pub salt: u64,
    /// How many different salts (rounds) to try before giving up.
    pub rehash_limit: u32,
    /// Seeds tried per small table before the round is abandoned.
    pub seed_attempts: u32,
    /// Displacement bound per key for [`Strategy::RandomWalk`].
    pub max_displacements: usize,
    pub strategy: Strategy,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            bucket_size: 32,
            load_factor: 0.8,
            class1_percentage: 20.0,
            class2_percentage: 30.0,
            salt: 0xC0FF_EE00_D15E_A5E,
            rehash_limit: 6,
            seed_attempts: 4_096,
            max_displacements: DEFAULT_MAX_DISPLACEMENTS,
            strategy: Strategy::Matching,
        }
    }
}

#[derive(Debug, Error)]
pub enum BuildError {
    #[error("duplicate key detected during build")]
    DuplicateKey,
    #[error("invalid build configuration: {0}")]
    InvalidConfig(&'static str),
    #[error("could not place all small tables after {rounds} rehash rounds")]
    Unresolvable { rounds: u32 },
    #[error("invalid placement: {0}")]
    InvalidPlacement(&'static str),
    #[cfg(feature = "serde")]
    #[error("serialization error: {0}")]
    Serde(#[from] Box<bincode::ErrorKind>),
}

/// Cells and seed of one small table.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BucketPlacement {
    /// First global cell of this small table.
    pub offset: u64,
    pub m: u32,
    pub seed: u64,
}

/// Result of a build: the chosen probe function of every key plus what a
/// query needs to turn that choice back into a cell.
///
/// Storing `probe_indices` compactly (so that a query can fetch a key's index
/// without knowing its position) is left to the caller.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct Placement {
    pub n: u64,
    pub salt: u64,
    pub thresholds: Thresholds,
    pub buckets: Vec<BucketPlacement>,
    /// Probe index of every key, in input order.
    pub probe_indices: Vec<u8>,
}

impl Placement {
    /// Total number of cells over all small tables.
    pub fn table_size(&self) -> u64 {
        self.buckets.last().map_or(0, |b| b.offset + b.m as u64)
    }

    /// Global cell of `key` when it uses probe function `probe_index`.
    #[inline]
    pub fn cell(&self, key: &[u8], probe_index: u8) -> u64 {
        let hash = HashedKey::from_key(key, self.salt);
        let bucket = &self.buckets[hash.bucket(self.buckets.len())];
        let local = hash.probe(bucket.seed.wrapping_add(probe_index as u64), bucket.m as usize);
        bucket.offset + local as u64
    }

    #[inline]
    pub fn cell_str(&self, key: &str, probe_index: u8) -> u64 {
        self.cell(key.as_bytes(), probe_index)
    }

    /// Class of `key`, re-derived from its fingerprint.
    #[inline]
    pub fn mask(&self, key: &[u8]) -> ProbeMask {
        self.thresholds.mask_for(HashedKey::from_key(key, self.salt).mhc)
    }

    /// Checks that `keys` (in build order) use permitted probe functions and
    /// land on pairwise distinct cells.
    pub fn verify<K, I>(&self, keys: I) -> bool
    where
        K: Borrow<[u8]>,
        I: IntoIterator<Item = K>,
    {
        let mut taken = BitSet::new(self.table_size() as usize);
        let mut count = 0usize;
        for key in keys {
            let Some(&index) = self.probe_indices.get(count) else {
                return false;
            };
            let key = key.borrow();
            if !self.mask(key).allows(index) || !taken.insert(self.cell(key, index) as usize) {
                return false;
            }
            count += 1;
        }
        count == self.probe_indices.len()
    }

    #[cfg(feature = "serde")]
    pub fn to_bytes(&self) -> Result<Vec<u8>, BuildError> {
        Ok(bincode::serialize(self)?)
    }

    /// Decodes a placement and rejects layouts a query cannot use.
    #[cfg(feature = "serde")]
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, BuildError> {
        let placement: Placement = bincode::deserialize(bytes)?;
        placement.check_layout()?;
        Ok(placement)
    }

    #[cfg(feature = "serde")]
    fn check_layout(&self) -> Result<(), BuildError> {
        if self.buckets.is_empty() {
            return Err(BuildError::InvalidPlacement("no small tables"));
        }
        if self.probe_indices.len() as u64 != self.n {
            return Err(BuildError::InvalidPlacement("probe index count differs from n"));
        }
        if self.probe_indices.iter().any(|&i| i >= crate::class::MAX_PROBES) {
            return Err(BuildError::InvalidPlacement("probe index out of range"));
        }
        let mut offset = 0u64;
        for bucket in &self.buckets {
            if bucket.offset != offset {
                return Err(BuildError::InvalidPlacement("small tables are not contiguous"));
            }
            offset += bucket.m as u64;
        }
        Ok(())
    }
}

pub struct Builder {
    cfg: BuildConfig,
}

impl Default for Builder {
    fn default() -> Self {
        Self::new()
    }
}

impl Builder {
    pub fn new() -> Self {
        Self {
            cfg: BuildConfig::default(),
        }
    }

    pub fn with_config(mut self, cfg: BuildConfig) -> Self {
        self.cfg = cfg;
        self
    }

    /// Assigns a probe function to every key. **Unique** keys are required.
    pub fn build<K, I>(self, keys: I) -> Result<Placement, BuildError>
    where
        K: Borrow<[u8]>,
        I: IntoIterator<Item = K>,
    {
        let thresholds =
            Thresholds::from_percentages(self.cfg.class1_percentage, self.cfg.class2_percentage)?;
        if !(self.cfg.load_factor > 0.0 && self.cfg.load_factor <= 1.0) {
            return Err(BuildError::InvalidConfig("load factor must lie in (0, 1]"));
        }
        if self.cfg.bucket_size == 0 {
            return Err(BuildError::InvalidConfig("bucket size must be positive"));
        }

        // Collect and verify true uniqueness on the exact bytes.
        let mut uniq = Vec::<Vec<u8>>::new();
        let mut seen = hashbrown::HashSet::<Vec<u8>>::new();
        for k in keys {
            let v = k.borrow().to_vec();
            if !seen.insert(v.clone()) {
                return Err(BuildError::DuplicateKey);
            }
            uniq.push(v);
        }
        drop(seen);
        if u32::try_from(uniq.len()).is_err() {
            return Err(BuildError::InvalidConfig("key count must fit in u32"));
        }
        // A small table never holds more than every key.
        cells_for(uniq.len(), self.cfg.load_factor)?;

        for round in 0..=self.cfg.rehash_limit {
            let salt = mix_salt(self.cfg.salt, round);
            let hashes = fingerprints(&uniq, salt);
            match try_build_once(&hashes, salt, thresholds, &self.cfg)? {
                Some(placement) => {
                    log::debug!(
                        "placed {} keys into {} cells in round {round}",
                        placement.n,
                        placement.table_size()
                    );
                    return Ok(placement);
                }
                None => log::debug!("round {round} (salt={salt:#x}) failed, rehashing"),
            }
        }
        Err(BuildError::Unresolvable {
            rounds: self.cfg.rehash_limit + 1,
        })
    }
}

/// Single build attempt for a specific salt.
fn try_build_once(
    hashes: &[HashedKey],
    salt: u64,
    thresholds: Thresholds,
    cfg: &BuildConfig,
) -> Result<Option<Placement>, BuildError> {
    let n = hashes.len();

    // 1) Split keys into small tables, remembering each key's input position.
    let buckets_cnt = n.div_ceil(cfg.bucket_size).max(1);
    let mut members: Vec<Vec<u32>> = vec![Vec::new(); buckets_cnt];
    for (i, hash) in hashes.iter().enumerate() {
        members[hash.bucket(buckets_cnt)].push(i as u32);
    }

    // 2) Place every small table with its own seed.
    let mut buckets = Vec::with_capacity(buckets_cnt);
    let mut probe_indices = vec![0u8; n];
    let mut offset = 0u64;
    for (b, keys) in members.iter().enumerate() {
        let cells = cells_for(keys.len(), cfg.load_factor)?;
        let m = cells as usize;
        let bucket_salt = salt.wrapping_add(b as u64);
        let local: Vec<HashedKey> = keys.iter().map(|&i| hashes[i as usize]).collect();

        let placed = match cfg.strategy {
            Strategy::RandomWalk => place_bucket(
                RandomWalkCuckooHashTable::new(local.len(), thresholds)
                    .with_max_displacements(cfg.max_displacements),
                &local,
                m,
                bucket_salt,
                cfg.seed_attempts,
            ),
            Strategy::Matching => place_bucket(
                HopcroftKarpMatchingCuckooHashTable::new(local.len(), thresholds),
                &local,
                m,
                bucket_salt,
                cfg.seed_attempts,
            ),
        };
        let Some((seed, indices)) = placed else {
            log::debug!(
                "small table {b} ({} keys, {m} cells) found no seed in {} attempts",
                keys.len(),
                cfg.seed_attempts
            );
            return Ok(None);
        };

        for (&i, index) in keys.iter().zip(indices) {
            probe_indices[i as usize] = index;
        }
        buckets.push(BucketPlacement {
            offset,
            m: cells,
            seed,
        });
        offset += m as u64;
    }

    Ok(Some(Placement {
        n: n as u64,
        salt,
        thresholds,
        buckets,
        probe_indices,
    }))
}

/// Cells of a small table holding `len` keys: `ceil(len / load_factor)`,
/// never fewer than `len`.
fn cells_for(len: usize, load_factor: f64) -> Result<u32, BuildError> {
    let cells = (len as f64 / load_factor).ceil();
    if !(cells <= u32::MAX as f64) {
        return Err(BuildError::InvalidConfig("small table size must fit in u32"));
    }
    Ok((cells as u32).max(len as u32))
}

/// Sweeps seeds until `table` constructs; returns the seed and the chosen
/// probe indices in `local` order.
fn place_bucket<T: CuckooTable>(
    mut table: T,
    local: &[HashedKey],
    m: usize,
    bucket_salt: u64,
    seed_attempts: u32,
) -> Option<(u64, Vec<u8>)> {
    for &hash in local {
        table.prepare(hash);
    }
    for attempt in 0..seed_attempts {
        let seed = mix_salt(bucket_salt, attempt);
        if table.construct(m, seed) {
            log::trace!("{}: seed {seed:#x} after {} attempts", T::name(), attempt + 1);
            let indices = table.entries().iter().map(|e| e.probe_index).collect();
            return Some((seed, indices));
        }
    }
    None
}

/// Fingerprints for every key (in parallel with the "parallel" feature).
fn fingerprints(keys: &[Vec<u8>], salt: u64) -> Vec<HashedKey> {
    #[cfg(feature = "parallel")]
    {
        use rayon::prelude::*;
        keys.par_iter()
            .map(|k| HashedKey::from_key(k, salt))
            .collect()
    }
    #[cfg(not(feature = "parallel"))]
    {
        keys.iter().map(|k| HashedKey::from_key(k, salt)).collect()
    }
}

/// Deterministically tweak base salt by round (FNV-like).
#[inline]
fn mix_salt(base: u64, round: u32) -> u64 {
    const FNV_OFFSET: u64 = 0xcbf29ce484222325;
    const FNV_PRIME: u64 = 0x100000001b3;
    let mut h = FNV_OFFSET ^ base;
    h ^= round as u64;
    h = h.wrapping_mul(FNV_PRIME);
    h ^ (h >> 33)
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_log::test;

    fn keys(n: usize) -> Vec<Vec<u8>> {
        (0..n).map(|i| format!("key-{i:06}").into_bytes()).collect()
    }

    #[test]
    fn rejects_duplicates() {
        let result = Builder::new().build([b"a".as_slice(), b"b".as_slice(), b"a".as_slice()]);
        assert!(matches!(result, Err(BuildError::DuplicateKey)));
    }

    #[test]
    fn rejects_bad_config() {
        let cfg = BuildConfig {
            load_factor: 1.5,
            ..Default::default()
        };
        let result = Builder::new().with_config(cfg).build(keys(10));
        assert!(matches!(result, Err(BuildError::InvalidConfig(_))));

        let cfg = BuildConfig {
            class1_percentage: 70.0,
            class2_percentage: 40.0,
            ..Default::default()
        };
        let result = Builder::new().with_config(cfg).build(keys(10));
        assert!(matches!(result, Err(BuildError::InvalidConfig(_))));

        let cfg = BuildConfig {
            bucket_size: 0,
            ..Default::default()
        };
        let result = Builder::new().with_config(cfg).build(keys(10));
        assert!(matches!(result, Err(BuildError::InvalidConfig(_))));
    }

    #[test]
    fn empty_key_set() {
        let placement = Builder::new().build(Vec::<Vec<u8>>::new()).unwrap();
        assert_eq!(placement.n, 0);
        assert!(placement.probe_indices.is_empty());
        assert_eq!(placement.table_size(), 0);
        assert!(placement.verify(Vec::<Vec<u8>>::new()));
    }

    #[test]
    fn default_build_verifies() {
        let keys = keys(2_000);
        let placement = Builder::new().build(keys.iter().map(|k| k.as_slice())).unwrap();
        assert_eq!(placement.n, 2_000);
        assert!(placement.table_size() >= 2_000);
        assert!(placement.verify(keys.iter().map(|k| k.as_slice())));
    }

    #[test]
    fn verify_catches_tampering() {
        let keys = keys(500);
        let mut placement = Builder::new().build(keys.iter().map(|k| k.as_slice())).unwrap();
        assert!(placement.verify(keys.iter().map(|k| k.as_slice())));
        // Fewer or more keys than indices.
        assert!(!placement.verify(keys[..499].iter().map(|k| k.as_slice())));
        let extra = b"not-built".to_vec();
        assert!(!placement.verify(keys.iter().chain([&extra]).map(|k| k.as_slice())));
        // An index outside a key's class.
        placement.probe_indices[0] = 3;
        assert!(!placement.verify(keys.iter().map(|k| k.as_slice())));
    }

    #[test]
    fn tiny_load_factor_is_rejected() {
        let cfg = BuildConfig {
            load_factor: 1e-300,
            ..Default::default()
        };
        let result = Builder::new().with_config(cfg).build(keys(10));
        assert!(matches!(result, Err(BuildError::InvalidConfig(_))));
    }

    #[test]
    fn cells_round_up_and_cover_keys() {
        assert_eq!(cells_for(0, 0.8).unwrap(), 0);
        assert_eq!(cells_for(8, 0.5).unwrap(), 16);
        assert_eq!(cells_for(3, 0.75).unwrap(), 4);
        assert_eq!(cells_for(32, 1.0).unwrap(), 32);
        assert!(cells_for(5, 1e-9).is_err());
    }

    #[test]
    fn mix_salt_differs_by_round() {
        assert_ne!(mix_salt(1, 0), mix_salt(1, 1));
        assert_eq!(mix_salt(1, 5), mix_salt(1, 5));
    }
}
