//! Seedable ChaCha20 random source for fold shuffling.
//!
//! Fold assignment must be unpredictable in production and exactly repeatable
//! in tests and audits, so the generator is either seeded from OS entropy or
//! from a caller-supplied `u64`.

use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;

/// ChaCha20 wrapper used by fold generation.
#[derive(Clone, Debug)]
pub struct SecureRng {
    rng: ChaCha20Rng,
    seed: Option<u64>,
}

impl SecureRng {
    /// Generator seeded from OS entropy.
    pub fn new() -> Self {
        Self {
            rng: ChaCha20Rng::from_entropy(),
            seed: None,
        }
    }

    /// Deterministic generator.
    ///
    /// The `u64` is expanded to a full 256-bit ChaCha key by `seed_from_u64`.
    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: ChaCha20Rng::seed_from_u64(seed),
            seed: Some(seed),
        }
    }

    /// Seeded when `seed` is `Some`, entropy-backed otherwise.
    pub fn from_optional_seed(seed: Option<u64>) -> Self {
        match seed {
            Some(seed) => Self::with_seed(seed),
            None => Self::new(),
        }
    }

    /// Seed this generator was created with, if any.
    pub fn seed(&self) -> Option<u64> {
        self.seed
    }

    /// In-place uniform shuffle.
    pub fn shuffle<T>(&mut self, items: &mut [T]) {
        items.shuffle(&mut self.rng);
    }

    /// `0..n` in random order.
    pub fn shuffled_indices(&mut self, n: usize) -> Vec<usize> {
        let mut indices: Vec<usize> = (0..n).collect();
        self.shuffle(&mut indices);
        indices
    }
}

impl Default for SecureRng {
    fn default() -> Self {
        Self::new()
    }
}
