//! Retry policy for transient LLM failures.
//!
//! Default is a single attempt. When `max_attempts` is raised, only errors with
//! [`PipelineError::is_recoverable`] are retried; the delay before attempt `n+1`
//! is `initial_backoff_ms * multiplier^(n-1)`, capped at `max_backoff_ms`.

use crate::types::Result;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RetryPolicy {
    /// Total attempts including the first (0 behaves as 1)
    pub max_attempts: u32,
    pub initial_backoff_ms: u64,
    pub multiplier: f64,
    pub max_backoff_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 1,
            initial_backoff_ms: 500,
            multiplier: 2.0,
            max_backoff_ms: 8_000,
        }
    }
}

impl RetryPolicy {
    /// Single attempt, no backoff.
    pub fn none() -> Self {
        Self::default()
    }

    /// Exponential backoff with `max_attempts` total attempts.
    pub fn exponential(max_attempts: u32, initial_backoff: Duration) -> Self {
        Self {
            max_attempts,
            initial_backoff_ms: initial_backoff.as_millis() as u64,
            ..Default::default()
        }
    }

    pub fn attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }

    /// Delay after failed attempt `attempt` (1-based).
    pub fn backoff(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(63) as i32;
        let millis = self.initial_backoff_ms as f64 * self.multiplier.max(1.0).powi(exponent);
        Duration::from_millis(millis.min(self.max_backoff_ms as f64) as u64)
    }

    /// Run `op` until it succeeds, fails permanently, or attempts run out.
    ///
    /// # Returns
    ///
    /// The final outcome and the number of attempts made
    pub async fn run<T, F, Fut>(&self, mut op: F) -> (Result<T>, u32)
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut attempt = 1;
        loop {
            match op(attempt).await {
                Err(e) if e.is_recoverable() && attempt < self.attempts() => {
                    let delay = self.backoff(attempt);
                    tracing::warn!(
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Transient failure, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                outcome => return (outcome, attempt),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PipelineError;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn test_backoff_schedule() {
        let policy = RetryPolicy {
            max_attempts: 6,
            initial_backoff_ms: 500,
            multiplier: 2.0,
            max_backoff_ms: 3_000,
        };
        assert_eq!(policy.backoff(1), Duration::from_millis(500));
        assert_eq!(policy.backoff(2), Duration::from_millis(1_000));
        assert_eq!(policy.backoff(3), Duration::from_millis(2_000));
        assert_eq!(policy.backoff(4), Duration::from_millis(3_000));
        assert_eq!(policy.backoff(40), Duration::from_millis(3_000));
    }

    #[test]
    fn test_zero_attempts_means_one() {
        let policy = RetryPolicy {
            max_attempts: 0,
            ..Default::default()
        };
        assert_eq!(policy.attempts(), 1);
    }

    #[tokio::test]
    async fn test_default_policy_does_not_retry() {
        let calls = AtomicU32::new(0);
        let counter = &calls;
        let (outcome, attempts) = RetryPolicy::none()
            .run(move |_| async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err::<(), _>(PipelineError::ServiceUnavailable("503".into()))
            })
            .await;

        assert!(outcome.is_err());
        assert_eq!(attempts, 1);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_transient_failures_retried_until_success() {
        let policy = RetryPolicy::exponential(3, Duration::from_millis(1));
        let (outcome, attempts) = policy
            .run(|attempt| async move {
                if attempt < 3 {
                    Err(PipelineError::ServiceUnavailable("429".into()))
                } else {
                    Ok("SELECT 1")
                }
            })
            .await;

        assert_eq!(outcome.unwrap(), "SELECT 1");
        assert_eq!(attempts, 3);
    }

    #[tokio::test]
    async fn test_transient_failures_exhaust_attempts() {
        let policy = RetryPolicy::exponential(2, Duration::from_millis(1));
        let (outcome, attempts) = policy
            .run(|_| async { Err::<(), _>(PipelineError::ServiceUnavailable("503".into())) })
            .await;

        assert!(matches!(outcome, Err(PipelineError::ServiceUnavailable(_))));
        assert_eq!(attempts, 2);
    }

    #[tokio::test]
    async fn test_permanent_failure_not_retried() {
        let policy = RetryPolicy::exponential(5, Duration::from_millis(1));
        let (outcome, attempts) = policy
            .run(|_| async { Err::<(), _>(PipelineError::generation("401 unauthorized")) })
            .await;

        assert!(matches!(outcome, Err(PipelineError::GenerationError(_))));
        assert_eq!(attempts, 1);
    }
}
