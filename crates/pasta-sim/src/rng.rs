use serde::{Deserialize, Serialize};

/// Small seeded generator so a simulation replays identically everywhere.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeterministicRng {
    state: u64,
}

impl DeterministicRng {
    #[must_use]
    pub const fn new(seed: u64) -> Self {
        Self {
            state: seed ^ 0x9E37_79B9_7F4A_7C15,
        }
    }

    /// Derive an independent stream for a sub-component (one per chatter).
    #[must_use]
    pub const fn fork(&self, stream: u64) -> Self {
        Self::new(self.state ^ stream.wrapping_mul(0xD1B5_4A32_D192_ED03))
    }

    #[must_use]
    pub const fn next_u64(&mut self) -> u64 {
        self.state = self
            .state
            .wrapping_mul(6_364_136_223_846_793_005)
            .wrapping_add(1_442_695_040_888_963_407);
        // High bits of an LCG are far better distributed than low ones.
        self.state >> 11
    }

    /// Uniform index in `[0, len)`; zero when `len` is zero.
    #[must_use]
    pub fn index(&mut self, len: usize) -> usize {
        let Ok(len_u64) = u64::try_from(len) else {
            return 0;
        };
        if len_u64 == 0 {
            return 0;
        }
        usize::try_from(self.next_u64() % len_u64).unwrap_or(0)
    }

    /// Pick one element of `items`.
    #[must_use]
    pub fn pick<'a, T>(&mut self, items: &'a [T]) -> Option<&'a T> {
        if items.is_empty() {
            return None;
        }
        items.get(self.index(items.len()))
    }

    /// Bernoulli trial with integer percent.
    #[must_use]
    pub fn percent(&mut self, percent: u8) -> bool {
        match percent {
            0 => false,
            100.. => true,
            p => self.next_u64() % 100 < u64::from(p),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_seed_same_stream() {
        let mut a = DeterministicRng::new(7);
        let mut b = DeterministicRng::new(7);
        for _ in 0..32 {
            assert_eq!(a.next_u64(), b.next_u64());
        }
    }

    #[test]
    fn forks_diverge() {
        let root = DeterministicRng::new(7);
        let mut a = root.fork(1);
        let mut b = root.fork(2);
        let same = (0..32).filter(|_| a.next_u64() == b.next_u64()).count();
        assert!(same < 32);
    }

    #[test]
    fn index_stays_in_range() {
        let mut rng = DeterministicRng::new(3);
        assert_eq!(rng.index(0), 0);
        for _ in 0..1_000 {
            assert!(rng.index(5) < 5);
        }
        assert!(rng.pick::<u8>(&[]).is_none());
    }

    #[test]
    fn percent_extremes_are_exact() {
        let mut rng = DeterministicRng::new(11);
        assert!((0..100).all(|_| !rng.percent(0)));
        assert!((0..100).all(|_| rng.percent(100)));
    }
}
