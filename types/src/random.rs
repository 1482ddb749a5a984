//! Randomness seam for amount allocation and intent ids.

use rand::{Rng, RngCore};

/// Source of randomness.
///
/// Production code uses [`ThreadRandom`]; tests swap in a scripted source.
pub trait RandomSource: Send + Sync {
    /// Uniform draw from the inclusive range `low..=high`.
    fn u64_in_range(&self, low: u64, high: u64) -> u64;

    /// Fill `dest` with random bytes.
    fn fill_bytes(&self, dest: &mut [u8]);
}

/// Thread-local RNG for draws, OS entropy for ids.
#[derive(Clone, Copy, Debug, Default)]
pub struct ThreadRandom;

impl RandomSource for ThreadRandom {
    fn u64_in_range(&self, low: u64, high: u64) -> u64 {
        if low >= high {
            return low;
        }
        rand::thread_rng().gen_range(low..=high)
    }

    fn fill_bytes(&self, dest: &mut [u8]) {
        rand::rngs::OsRng.fill_bytes(dest);
    }
}
