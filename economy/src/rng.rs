//! Randomness source for shuffles, spins, and weighted draws.
//!
//! Production engines seed from OS entropy; tests construct a [`GameRng`]
//! from a fixed seed to make every deal and spin reproducible.

use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;

pub struct GameRng(ChaCha20Rng);

impl GameRng {
    /// Cryptographically seeded generator for live play.
    pub fn from_entropy() -> Self {
        Self(ChaCha20Rng::from_entropy())
    }

    /// Deterministic generator for tests and replay.
    pub fn from_seed(seed: u64) -> Self {
        Self(ChaCha20Rng::seed_from_u64(seed))
    }

    /// Fisher-Yates shuffle in place.
    pub fn shuffle<T>(&mut self, items: &mut [T]) {
        items.shuffle(&mut self.0);
    }

    /// Uniform index into `0..len`. `len` must be non-zero.
    pub fn pick_index(&mut self, len: usize) -> usize {
        self.0.gen_range(0..len)
    }

    /// Draw an index with probability `weights[i] / Σ weights`.
    ///
    /// Weights are integers (callers pre-scale fractional odds tables); the
    /// draw is exact, with no float accumulation error.
    pub fn weighted_index(&mut self, weights: &[u64]) -> usize {
        let total: u64 = weights.iter().sum();
        debug_assert!(total > 0, "weights must not all be zero");
        let mut target = self.0.gen_range(0..total);
        for (idx, weight) in weights.iter().enumerate() {
            if target < *weight {
                return idx;
            }
            target -= weight;
        }
        weights.len() - 1
    }

    /// Random lowercase-hex token of `bytes * 2` characters (round and bet
    /// ids).
    pub fn token_hex(&mut self, bytes: usize) -> String {
        use std::fmt::Write as _;
        let mut out = String::with_capacity(bytes * 2);
        for _ in 0..bytes {
            let byte: u8 = self.0.gen();
            let _ = write!(out, "{byte:02x}");
        }
        out
    }

    /// Uniform value in the inclusive range.
    pub fn range_inclusive(&mut self, min: u64, max: u64) -> u64 {
        self.0.gen_range(min..=max)
    }
}
