use std::{fmt, future::Future, time::Duration};

use tokio::time::sleep;
use tokio_util::sync::CancellationToken;

/// Attempt count and backoff curve for retried calls.
///
/// The delay before attempt `i` (1-indexed, `i >= 2`) is
/// `base_delay_ms * multiplier^(i - 2)`.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts including the first one. `0` is treated as `1`.
    pub max_attempts: u32,
    /// Delay after the first failed attempt, in milliseconds.
    pub base_delay_ms: u64,
    /// Growth factor applied per additional failure. `0` is treated as `1`.
    pub multiplier: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 1_000,
            multiplier: 2,
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay_ms: u64, multiplier: u32) -> Self {
        Self {
            max_attempts,
            base_delay_ms,
            multiplier,
        }
    }

    /// Single attempt, no backoff.
    pub fn no_retry() -> Self {
        Self::new(1, 0, 1)
    }

    /// Same curve with a different attempt count.
    pub fn with_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    pub fn attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }

    /// Delay to wait after failed attempt number `attempt` (1-indexed).
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let exp = attempt.saturating_sub(1);
        let factor = u64::from(self.multiplier.max(1))
            .checked_pow(exp)
            .unwrap_or(u64::MAX);
        Duration::from_millis(self.base_delay_ms.saturating_mul(factor))
    }
}

/// Runs `op` until it succeeds or `policy` runs out of attempts.
///
/// The final failure is returned unchanged.
pub async fn retry_with_backoff<T, E, F, Fut>(policy: &RetryPolicy, op: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: fmt::Display,
{
    run(policy, &CancellationToken::new(), op).await
}

/// Retry loop shared by the tracked and untracked executors.
///
/// A cancelled `cancel` token interrupts a pending backoff; the failure of the
/// attempt being waited on is returned and no further attempts are made.
pub(crate) async fn run<T, E, F, Fut>(
    policy: &RetryPolicy,
    cancel: &CancellationToken,
    mut op: F,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: fmt::Display,
{
    let max_attempts = policy.attempts();
    let mut attempt = 1u32;
    loop {
        let err = match op().await {
            Ok(value) => return Ok(value),
            Err(err) => err,
        };

        tracing::warn!(attempt, max_attempts, error = %err, "api attempt failed");
        if attempt >= max_attempts {
            return Err(err);
        }

        let delay = policy.delay_after(attempt);
        tracing::debug!(
            attempt,
            delay_ms = delay.as_millis() as u64,
            "retrying after backoff"
        );
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::debug!(attempt, "backoff cancelled, giving up");
                return Err(err);
            }
            _ = sleep(delay) => {}
        }
        attempt += 1;
    }
}
