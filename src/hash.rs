use xxhash_rust::xxh3::xxh3_64_with_seed;

/// Per-key fingerprint. Every probe position is derived from `mhc` alone,
/// so the same value must be used during construction and at query time.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct HashedKey {
    pub mhc: u64,
}

impl HashedKey {
    #[inline]
    pub fn new(mhc: u64) -> Self {
        Self { mhc }
    }

    #[inline]
    pub fn from_key(bytes: &[u8], salt: u64) -> Self {
        Self {
            mhc: xxh3_64_with_seed(bytes, salt),
        }
    }

    #[inline]
    pub fn from_key_str(s: &str, salt: u64) -> Self {
        Self::from_key(s.as_bytes(), salt)
    }

    /// Small-table selector. Mixed first so that it is independent of the
    /// class, which is read straight off `mhc`.
    #[inline]
    pub fn bucket(&self, buckets: usize) -> usize {
        fastrange64(remix(self.mhc ^ 0x9E37_79B9_7F4A_7C15), buckets as u64) as usize
    }

    /// Cell for probe function `index` in a table of `range` cells:
    /// pos = fastrange(remix(mhc + index), range)
    #[inline]
    pub fn probe(&self, index: u64, range: usize) -> usize {
        fastrange64(remix(self.mhc.wrapping_add(index)), range as u64) as usize
    }
}

/// Stafford variant 13 finalizer (the splitmix64 output mix).
#[inline]
pub fn remix(mut z: u64) -> u64 {
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

/// Maps a uniform 64-bit word onto `[0, range)` without a division.
#[inline]
pub fn fastrange64(word: u64, range: u64) -> u64 {
    ((word as u128 * range as u128) >> 64) as u64
}
