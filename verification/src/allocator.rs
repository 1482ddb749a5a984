//! Verification amount allocation.
//!
//! The amount is the verification secret. It is drawn uniformly at lamport
//! precision from a deliberately tiny range, which keeps the real cost near
//! zero while the number of distinct values stays large relative to the
//! number of intents alive at once.

use std::collections::HashSet;
use std::sync::Arc;

use dustproof_types::{Lamports, RandomSource};

use crate::VerifyError;

/// Default lower bound: 0.000000010 SOL.
pub const DEFAULT_MIN_LAMPORTS: u64 = 10;
/// Default upper bound: 0.000010000 SOL.
pub const DEFAULT_MAX_LAMPORTS: u64 = 10_000;
/// Default number of draws when avoiding amounts already pending.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 8;

/// Draws verification amounts.
pub struct AmountAllocator {
    min: u64,
    max: u64,
    avoid_collisions: bool,
    max_attempts: u32,
    random: Arc<dyn RandomSource>,
}

impl AmountAllocator {
    /// Allocator over `min..=max` lamports.
    ///
    /// With `avoid_collisions`, a draw equal to an amount already pending is
    /// redrawn up to `max_attempts` times. Uniqueness is still not
    /// guaranteed: if every draw collides the last one is issued.
    pub fn new(
        min: u64,
        max: u64,
        avoid_collisions: bool,
        max_attempts: u32,
        random: Arc<dyn RandomSource>,
    ) -> Result<Self, VerifyError> {
        if min == 0 || min > max {
            return Err(VerifyError::Config(format!(
                "amount range must be non-empty and positive, got {min}..={max} lamports"
            )));
        }
        Ok(Self {
            min,
            max,
            avoid_collisions,
            max_attempts: max_attempts.max(1),
            random,
        })
    }

    /// The default 10..=10_000 lamport range with collision avoidance.
    pub fn with_defaults(random: Arc<dyn RandomSource>) -> Self {
        Self {
            min: DEFAULT_MIN_LAMPORTS,
            max: DEFAULT_MAX_LAMPORTS,
            avoid_collisions: true,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            random,
        }
    }

    /// Number of distinct amounts the allocator can issue.
    pub fn space(&self) -> u64 {
        self.max - self.min + 1
    }

    /// Draw an amount, preferring one not in `in_use`.
    pub fn allocate(&self, in_use: &HashSet<Lamports>) -> Lamports {
        let attempts = if self.avoid_collisions {
            self.max_attempts
        } else {
            1
        };
        let mut amount = self.draw();
        for _ in 1..attempts {
            if !in_use.contains(&amount) {
                return amount;
            }
            amount = self.draw();
        }
        if self.avoid_collisions && in_use.contains(&amount) {
            tracing::warn!(
                %amount,
                pending = in_use.len(),
                "amount collides with a pending intent after every redraw"
            );
        }
        amount
    }

    fn draw(&self) -> Lamports {
        Lamports::new(self.random.u64_in_range(self.min, self.max))
    }
}
