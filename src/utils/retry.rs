// Bounded fixed-interval polling

use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tracing::debug;

use crate::types::{AppError, AppResult};

/// Outcome of a single check.
#[derive(Debug, Clone, PartialEq)]
pub enum PollStatus<T> {
    Ready(T),
    Pending,
}

/// Fixed interval, hard attempt cap.
#[derive(Debug, Clone, Copy)]
pub struct PollPolicy {
    pub interval: Duration,
    pub max_attempts: u32,
}

impl PollPolicy {
    pub fn new(interval: Duration, max_attempts: u32) -> Self {
        Self {
            interval,
            max_attempts,
        }
    }

    /// Upper bound on the time spent waiting between attempts.
    pub fn ceiling(&self) -> Duration {
        self.interval
            .checked_mul(self.max_attempts.saturating_sub(1))
            .unwrap_or(Duration::MAX)
    }
}

/// Runs `check` until it is `Ready` or fails, making at most `max_attempts` calls.
///
/// An error from `check` ends polling immediately. Exhaustion yields `AppError::Timeout`.
/// There is no sleep after the final attempt.
pub async fn poll_until<T, F, Fut>(policy: &PollPolicy, what: &str, mut check: F) -> AppResult<T>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = AppResult<PollStatus<T>>>,
{
    for attempt in 1..=policy.max_attempts {
        match check(attempt).await? {
            PollStatus::Ready(value) => return Ok(value),
            PollStatus::Pending => {
                debug!(attempt, max_attempts = policy.max_attempts, "{} still pending", what);
                if attempt < policy.max_attempts {
                    sleep(policy.interval).await;
                }
            }
        }
    }

    Err(AppError::Timeout(format!(
        "{} did not complete after {} attempts",
        what, policy.max_attempts
    )))
}
