//! Bounded retry and exponential backoff.
//!
//! [`retry`] wraps a fallible async operation and re-runs it up to
//! `max_attempts` times, returning the last error instead of a sentinel.
//! [`Backoff`] is the delay schedule used by long-lived reconnect loops.

use std::future::Future;
use std::time::Duration;

/// How many times to attempt an operation and how long to wait in between.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first. Zero is treated as one.
    pub max_attempts: u32,
    /// Delay before the second attempt.
    pub delay: Duration,
    /// Multiply the delay by this factor after each failed attempt (1 = fixed).
    pub multiplier: u32,
    /// Upper bound on any single delay.
    pub max_delay: Duration,
}

impl RetryPolicy {
    /// Fixed delay between attempts.
    pub fn fixed(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts,
            delay,
            multiplier: 1,
            max_delay: delay,
        }
    }

    /// Doubling delay between attempts, capped at `max_delay`.
    pub fn exponential(max_attempts: u32, delay: Duration, max_delay: Duration) -> Self {
        Self {
            max_attempts,
            delay,
            multiplier: 2,
            max_delay,
        }
    }

    /// A single attempt, no retries.
    pub fn none() -> Self {
        Self::fixed(1, Duration::ZERO)
    }

    fn backoff(&self) -> Backoff {
        Backoff::new(self.delay, self.max_delay, self.multiplier)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::fixed(3, Duration::from_millis(500))
    }
}

/// Run `op` until it succeeds or `policy.max_attempts` is exhausted.
///
/// Returns the first success or the error from the final attempt.
pub async fn retry<T, E, F, Fut>(policy: &RetryPolicy, label: &str, mut op: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    let attempts = policy.max_attempts.max(1);
    let mut backoff = policy.backoff();
    let mut attempt = 1;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if attempt >= attempts => return Err(e),
            Err(e) => {
                let delay = backoff.next_delay();
                tracing::debug!(
                    operation = label,
                    attempt,
                    error = %e,
                    delay_ms = delay.as_millis() as u64,
                    "retrying after failure"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
        }
    }
}

/// Exponential backoff schedule with an upper bound.
#[derive(Clone, Debug)]
pub struct Backoff {
    initial: Duration,
    current: Duration,
    max: Duration,
    multiplier: u32,
}

impl Backoff {
    pub fn new(initial: Duration, max: Duration, multiplier: u32) -> Self {
        Self {
            initial,
            current: initial,
            max,
            multiplier: multiplier.max(1),
        }
    }

    /// 1s doubling up to 30s, the reconnect schedule for subscribers.
    pub fn reconnect() -> Self {
        Self::new(Duration::from_secs(1), Duration::from_secs(30), 2)
    }

    /// The delay to wait now; advances the schedule.
    pub fn next_delay(&mut self) -> Duration {
        let delay = self.current.min(self.max);
        self.current = self
            .current
            .checked_mul(self.multiplier)
            .unwrap_or(self.max)
            .min(self.max);
        delay
    }

    /// Return to the initial delay, e.g. after a successful connection.
    pub fn reset(&mut self) {
        self.current = self.initial;
    }
}
