//! Nullable infrastructure for deterministic testing.
//!
//! All external dependencies (clock, randomness, chain, storage) sit behind
//! traits. This crate provides test-friendly implementations that:
//! - Return deterministic values
//! - Can be controlled programmatically
//! - Never touch the filesystem or network
//!
//! Usage: swap real implementations for nullables in tests.

pub mod chain;
pub mod clock;
pub mod random;
pub mod store;

pub use chain::NullChain;
pub use clock::NullClock;
pub use random::NullRandom;
pub use store::{NullIntentStore, NullSignatureStore, NullVerifiedStore};
