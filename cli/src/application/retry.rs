//! Bounded retry with a fixed interval.
//!
//! Used by exactly one call site today (waiting for a new instance to accept
//! sessions), but the policy is kept as a value so it stays visible and
//! testable.

use std::future::Future;
use std::time::Duration;

use anyhow::Result;
use tokio::time::Instant;

use crate::domain::WaitError;

/// Poll interval while waiting for an instance to become reachable.
pub const ACTIVATION_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Overall deadline for an instance to become reachable.
pub const ACTIVATION_DEADLINE: Duration = Duration::from_secs(120);

/// Repeats a fallible check every `interval` until it succeeds or `deadline`
/// has elapsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryWaiter {
    pub interval: Duration,
    pub deadline: Duration,
}

impl Default for RetryWaiter {
    fn default() -> Self {
        Self::new(ACTIVATION_POLL_INTERVAL, ACTIVATION_DEADLINE)
    }
}

impl RetryWaiter {
    #[must_use]
    pub fn new(interval: Duration, deadline: Duration) -> Self {
        Self { interval, deadline }
    }

    /// Upper bound on the number of predicate evaluations.
    #[must_use]
    pub fn max_attempts(&self) -> u32 {
        if self.interval.is_zero() {
            return 1;
        }
        let n = self.deadline.as_nanos().div_ceil(self.interval.as_nanos());
        u32::try_from(n.max(1)).unwrap_or(u32::MAX)
    }

    /// Evaluate `predicate` until it returns `Ok`.
    ///
    /// A failing predicate counts as "not ready yet". No further attempt is
    /// made once the next one would start at or past the deadline, so an
    /// always-failing predicate runs at most [`Self::max_attempts`] times.
    ///
    /// # Errors
    ///
    /// Returns `WaitError::Timeout` whose source is the last attempt's error.
    pub async fn wait_until<T, F, Fut>(&self, mut predicate: F) -> Result<T, WaitError>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let started = Instant::now();
        let max_attempts = self.max_attempts();
        let mut attempt = 0u32;
        loop {
            attempt += 1;
            let last = match predicate(attempt).await {
                Ok(value) => {
                    tracing::debug!(attempt, "wait condition met");
                    return Ok(value);
                }
                Err(e) => e,
            };
            let elapsed = started.elapsed();
            tracing::debug!(attempt, ?elapsed, error = %last, "wait condition not met");
            if attempt >= max_attempts || elapsed + self.interval >= self.deadline {
                return Err(WaitError::Timeout {
                    elapsed,
                    attempts: attempt,
                    last: last.into(),
                });
            }
            tokio::time::sleep(self.interval).await;
        }
    }
}
