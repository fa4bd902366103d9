use std::fmt::Display;
use std::future::Future;
use tokio::time::{Duration, sleep};

pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
pub const DEFAULT_FIRST_DELAY: Duration = Duration::from_millis(1000);
pub const DEFAULT_SUBSEQUENT_DELAY: Duration = Duration::from_millis(3000);

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("gave up after {attempts} attempt(s): {last_error}")]
pub struct MaxAttemptsExceeded<E> {
    pub attempts: u32,
    pub last_error: E,
}

/// Bounded retry with an attempt-indexed delay schedule.
///
/// The wait before attempt 2 is `first_delay`; every later attempt waits
/// `subsequent_delay`. Nothing is awaited after the final failure.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    first_delay: Duration,
    subsequent_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            first_delay: DEFAULT_FIRST_DELAY,
            subsequent_delay: DEFAULT_SUBSEQUENT_DELAY,
        }
    }
}

impl RetryPolicy {
    /// `max_attempts` below 1 is treated as a single attempt.
    pub fn new(max_attempts: u32, first_delay: Duration, subsequent_delay: Duration) -> Self {
        RetryPolicy {
            max_attempts: max_attempts.max(1),
            first_delay,
            subsequent_delay,
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Delay to wait before the 1-based `attempt`.
    pub fn delay_before(&self, attempt: u32) -> Duration {
        match attempt {
            0 | 1 => Duration::ZERO,
            2 => self.first_delay,
            _ => self.subsequent_delay,
        }
    }

    /// Runs `action` until it succeeds or the attempt budget is spent.
    /// The action receives the 1-based attempt number.
    pub async fn retry<T, E, F, Fut>(&self, mut action: F) -> Result<T, MaxAttemptsExceeded<E>>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display,
    {
        let mut attempt = 1;

        loop {
            match action(attempt).await {
                Ok(value) => return Ok(value),
                Err(e) if attempt >= self.max_attempts => {
                    tracing::error!(attempts = attempt, error = %e, "Retries exhausted");
                    return Err(MaxAttemptsExceeded {
                        attempts: attempt,
                        last_error: e,
                    });
                }
                Err(e) => {
                    attempt += 1;
                    let delay = self.delay_before(attempt);
                    tracing::warn!(
                        attempt,
                        max_attempts = self.max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Attempt failed, retrying"
                    );
                    sleep(delay).await;
                }
            }
        }
    }
}
