use crate::BuildError;

/// Number of probe functions a key can ever be given.
pub const MAX_PROBES: u8 = 3;

/// Set of probe indices a key may use, one bit per index.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ProbeMask(u8);

impl ProbeMask {
    pub const ONE: ProbeMask = ProbeMask(0b001);
    pub const TWO: ProbeMask = ProbeMask(0b011);
    pub const THREE: ProbeMask = ProbeMask(0b111);

    #[inline]
    pub fn allows(self, index: u8) -> bool {
        index < MAX_PROBES && (self.0 >> index) & 1 == 1
    }

    #[inline]
    pub fn len(self) -> usize {
        self.0.count_ones() as usize
    }

    #[inline]
    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn indices(self) -> impl Iterator<Item = u8> {
        (0..MAX_PROBES).filter(move |&i| self.allows(i))
    }

    /// Next permitted index after `index`, wrapping around.
    /// Index 0 is in every class, so the cycle always terminates.
    #[inline]
    pub fn next_after(self, index: u8) -> u8 {
        let mut next = index;
        loop {
            next = (next + 1) % MAX_PROBES;
            if self.allows(next) {
                return next;
            }
        }
    }
}

/// Fingerprint cut-offs between the three key classes.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Thresholds {
    pub t1: u64,
    pub t2: u64,
}

impl Thresholds {
    pub fn new(t1: u64, t2: u64) -> Self {
        assert!(t1 <= t2, "thresholds must satisfy t1 <= t2");
        Self { t1, t2 }
    }

    /// `class1` percent of the fingerprint domain gets a single probe,
    /// the next `class2` percent gets two, the rest gets three.
    pub fn from_percentages(class1: f64, class2: f64) -> Result<Self, BuildError> {
        if !(0.0..=100.0).contains(&class1) || !(0.0..=100.0).contains(&class2) {
            return Err(BuildError::InvalidConfig("class percentages must lie in [0, 100]"));
        }
        if class1 + class2 > 100.0 {
            return Err(BuildError::InvalidConfig("class percentages must not exceed 100 in total"));
        }
        Ok(Self::new(
            percent_of_domain(class1),
            percent_of_domain(class1 + class2),
        ))
    }

    /// Every key restricted to probe index 0.
    pub fn single() -> Self {
        Self::new(u64::MAX, u64::MAX)
    }

    #[inline]
    pub fn mask_for(&self, mhc: u64) -> ProbeMask {
        if mhc <= self.t1 {
            ProbeMask::ONE
        } else if mhc <= self.t2 {
            ProbeMask::TWO
        } else {
            ProbeMask::THREE
        }
    }
}

#[inline]
fn percent_of_domain(percent: f64) -> u64 {
    if percent >= 100.0 {
        u64::MAX
    } else {
        // The float product rounds; saturating cast keeps it inside u64.
        (u64::MAX as f64 * (percent / 100.0)) as u64
    }
}
