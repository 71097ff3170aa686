/// Fixed-size occupancy bitmap.
#[derive(Debug)]
pub(crate) struct BitSet {
    bits: Vec<u64>,
}

impl BitSet {
    pub(crate) fn new(n: usize) -> Self {
        Self {
            bits: vec![0; n.div_ceil(64)],
        }
    }

    #[inline]
    pub(crate) fn test(&self, idx: usize) -> bool {
        let (w, b) = (idx / 64, idx % 64);
        (self.bits[w] >> b) & 1 == 1
    }

    #[inline]
    pub(crate) fn set(&mut self, idx: usize) {
        let (w, b) = (idx / 64, idx % 64);
        self.bits[w] |= 1u64 << b;
    }

    /// Sets `idx` and reports whether it was clear before.
    #[inline]
    pub(crate) fn insert(&mut self, idx: usize) -> bool {
        if self.test(idx) {
            return false;
        }
        self.set(idx);
        true
    }
}
