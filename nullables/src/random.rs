//! Nullable random: scripted draws and ids.

use dustproof_types::RandomSource;
use std::sync::Mutex;

/// A deterministic random source for testing.
///
/// Range draws replay the scripted values in order (cycling), clamped into
/// the requested range. Byte fills are a counter, so every generated intent
/// id is distinct unless [`NullRandom::repeat_bytes`] is set.
pub struct NullRandom {
    draws: Mutex<(Vec<u64>, usize)>,
    bytes: Mutex<u64>,
    repeat_bytes: bool,
}

impl NullRandom {
    /// Create with a sequence of range draws.
    pub fn new(draws: Vec<u64>) -> Self {
        Self {
            draws: Mutex::new((draws, 0)),
            bytes: Mutex::new(0),
            repeat_bytes: false,
        }
    }

    /// Create with a single draw returned for every call.
    pub fn constant(value: u64) -> Self {
        Self::new(vec![value])
    }

    /// Return identical bytes on every fill, to provoke id collisions.
    pub fn repeat_bytes(mut self) -> Self {
        self.repeat_bytes = true;
        self
    }
}

impl RandomSource for NullRandom {
    fn u64_in_range(&self, low: u64, high: u64) -> u64 {
        let mut guard = self.draws.lock().unwrap();
        let (draws, idx) = &mut *guard;
        if draws.is_empty() {
            return low;
        }
        let value = draws[*idx % draws.len()];
        *idx += 1;
        value.clamp(low, high.max(low))
    }

    fn fill_bytes(&self, dest: &mut [u8]) {
        let mut counter = self.bytes.lock().unwrap();
        if !self.repeat_bytes {
            *counter += 1;
        }
        let seed = counter.to_be_bytes();
        for (i, byte) in dest.iter_mut().enumerate() {
            *byte = seed[i % seed.len()];
        }
    }
}
