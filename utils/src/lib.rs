//! Shared utilities for the dustproof workspace.

pub mod logging;
pub mod retry;
pub mod time;

pub use logging::init_tracing;
pub use retry::{retry, Backoff, RetryPolicy};
pub use time::format_duration;
