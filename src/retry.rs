//! Retry classification and exponential backoff.

use crate::config::BatcherConfig;
use crate::{Error, Result};
use std::future::Future;
use std::time::Duration;

/// Single generic retry/backoff policy applied to any unit of work.
///
/// Failures carrying a transient HTTP status (408, 429, 500, 502, 503, 504)
/// are retried up to the attempt ceiling with exponentially growing delays;
/// everything else is terminal on first failure.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    max_attempts: u32,
    base_delay: Duration,
    max_delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration, max_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
            max_delay,
        }
    }

    pub fn from_config(config: &BatcherConfig) -> Self {
        Self::new(
            config.max_retry_attempts,
            config.retry_base_delay,
            config.retry_max_delay,
        )
    }

    pub fn is_retryable(&self, error: &Error) -> bool {
        error.is_retryable()
    }

    /// Backoff before the attempt after `attempt` (1-based):
    /// `min(base * 2^(attempt-1), max)`.
    pub fn compute_delay(&self, attempt: u32) -> Duration {
        let base = self.base_delay.as_millis() as u64;
        let factor = 1u64
            .checked_shl(attempt.saturating_sub(1))
            .unwrap_or(u64::MAX);
        let delay = base.saturating_mul(factor);
        Duration::from_millis(delay).min(self.max_delay)
    }

    /// Runs `op` until it succeeds, fails terminally, or exhausts the
    /// attempt ceiling. The closure receives the 1-based attempt number.
    pub async fn execute<T, F, Fut>(&self, mut op: F) -> Result<T>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut attempt = 1;
        loop {
            match op(attempt).await {
                Ok(value) => return Ok(value),
                Err(err) if self.is_retryable(&err) && attempt < self.max_attempts => {
                    let delay = self.compute_delay(attempt);
                    tracing::debug!(
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "transient failure, backing off"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(err) if self.is_retryable(&err) => {
                    return Err(Error::MaxRetriesExceeded {
                        attempts: self.max_attempts,
                        message: err.to_string(),
                    });
                }
                Err(err) => return Err(err),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn policy() -> RetryPolicy {
        RetryPolicy::new(3, Duration::from_millis(1000), Duration::from_secs(300))
    }

    fn transient() -> Error {
        Error::Transport {
            status: 503,
            message: "unavailable".into(),
        }
    }

    #[test]
    fn test_backoff_sequence() {
        let policy = policy();
        let delays: Vec<u64> = (1..=4)
            .map(|a| policy.compute_delay(a).as_millis() as u64)
            .collect();
        assert_eq!(delays, vec![1000, 2000, 4000, 8000]);
    }

    #[test]
    fn test_backoff_ceiling() {
        let policy = RetryPolicy::new(10, Duration::from_millis(1000), Duration::from_secs(4));
        assert_eq!(policy.compute_delay(3), Duration::from_secs(4));
        assert_eq!(policy.compute_delay(30), Duration::from_secs(4));
        // large attempt numbers must not overflow the shift
        assert_eq!(policy.compute_delay(u32::MAX), Duration::from_secs(4));
    }

    #[tokio::test(start_paused = true)]
    async fn test_execute_retries_transient_then_succeeds() {
        let attempts = AtomicU32::new(0);
        let result = policy()
            .execute(|_| {
                let n = attempts.fetch_add(1, Ordering::Relaxed);
                async move {
                    if n < 2 {
                        Err(transient())
                    } else {
                        Ok(42u32)
                    }
                }
            })
            .await;
        assert_eq!(result.unwrap(), 42);
        assert_eq!(attempts.load(Ordering::Relaxed), 3);
    }

    #[tokio::test]
    async fn test_execute_terminal_error_no_retry() {
        let attempts = AtomicU32::new(0);
        let result: Result<u32> = policy()
            .execute(|_| {
                attempts.fetch_add(1, Ordering::Relaxed);
                async {
                    Err(Error::Transport {
                        status: 400,
                        message: "bad request".into(),
                    })
                }
            })
            .await;
        assert_eq!(result.unwrap_err().status(), Some(400));
        assert_eq!(attempts.load(Ordering::Relaxed), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_execute_exhaustion() {
        let attempts = AtomicU32::new(0);
        let result: Result<u32> = policy()
            .execute(|_| {
                attempts.fetch_add(1, Ordering::Relaxed);
                async { Err(transient()) }
            })
            .await;
        match result.unwrap_err() {
            Error::MaxRetriesExceeded { attempts: n, .. } => assert_eq!(n, 3),
            other => panic!("expected MaxRetriesExceeded, got {other:?}"),
        }
        assert_eq!(attempts.load(Ordering::Relaxed), 3);
    }
}
