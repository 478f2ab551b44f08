//! Retry policy with exponential backoff for critic invocations
//!
//! Backoff grows geometrically: `min × multiplier^attempt`, capped at `max`.
//!
//! # Retry Decision
//! - Retry on: connection failures, timeouts, rate limiting, server errors
//! - Do NOT retry: malformed responses, rejected requests

use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::domain::models::RetryConfig;
use crate::domain::ports::CriticError;

/// Result of a retried operation, with the number of attempts it took.
#[derive(Debug)]
pub struct RetryOutcome<T> {
    pub result: Result<T, CriticError>,
    pub attempts: u32,
}

/// Retry policy configuration for handling retryable critic failures
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts, including the first
    max_attempts: u32,
    /// Backoff before the first retry in milliseconds
    initial_backoff_ms: u64,
    /// Maximum backoff duration in milliseconds
    max_backoff_ms: u64,
    /// Growth factor between consecutive backoffs
    multiplier: f64,
}

impl RetryPolicy {
    /// Create a new retry policy
    ///
    /// Degenerate inputs are normalised: at least one attempt, a multiplier
    /// of at least 1 and a cap no smaller than the initial backoff.
    ///
    /// # Example
    /// ```
    /// use tribunal::services::retry::RetryPolicy;
    ///
    /// let policy = RetryPolicy::new(3, 1_000, 10_000, 2.0);
    /// assert_eq!(policy.max_attempts(), 3);
    /// ```
    pub fn new(max_attempts: u32, initial_backoff_ms: u64, max_backoff_ms: u64, multiplier: f64) -> Self {
        let multiplier = if multiplier.is_finite() { multiplier.max(1.0) } else { 1.0 };
        Self {
            max_attempts: max_attempts.max(1),
            initial_backoff_ms,
            max_backoff_ms: max_backoff_ms.max(initial_backoff_ms),
            multiplier,
        }
    }

    pub fn from_config(config: &RetryConfig) -> Self {
        Self::new(
            config.max_retry_attempts,
            config.retry_backoff_min_ms,
            config.retry_backoff_max_ms,
            config.retry_backoff_multiplier,
        )
    }

    pub const fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Execute an operation, retrying retryable failures with backoff
    ///
    /// Never panics and never retries a non-retryable failure. The outcome
    /// reports how many attempts were made.
    pub async fn execute<F, Fut, T>(&self, mut operation: F) -> RetryOutcome<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, CriticError>>,
    {
        let mut attempt = 0;

        loop {
            match operation().await {
                Ok(result) => {
                    if attempt > 0 {
                        debug!("Operation succeeded after {} retries", attempt);
                    }
                    return RetryOutcome {
                        result: Ok(result),
                        attempts: attempt + 1,
                    };
                }
                Err(err) => {
                    if self.should_retry(&err, attempt) {
                        let backoff = self.calculate_backoff(attempt);
                        warn!(
                            attempt = attempt + 1,
                            max_attempts = self.max_attempts,
                            error = %err,
                            backoff_ms = backoff.as_millis() as u64,
                            "Retryable critic failure, backing off"
                        );

                        sleep(backoff).await;
                        attempt += 1;
                    } else {
                        if err.is_retryable() {
                            warn!("Operation failed after {} attempts: {}", attempt + 1, err);
                        } else {
                            debug!("Non-retryable error, not retrying: {}", err);
                        }
                        return RetryOutcome {
                            result: Err(err),
                            attempts: attempt + 1,
                        };
                    }
                }
            }
        }
    }

    /// Calculate the backoff before retry number `attempt` (0-indexed)
    ///
    /// Formula: min(initial × multiplier^attempt, max)
    pub fn calculate_backoff(&self, attempt: u32) -> Duration {
        let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
        let scaled = self.initial_backoff_ms as f64 * self.multiplier.powi(exponent);
        let capped = scaled.min(self.max_backoff_ms as f64);

        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        Duration::from_millis(capped as u64)
    }

    /// Whether another attempt is allowed after a failure on `attempt`
    fn should_retry(&self, error: &CriticError, attempt: u32) -> bool {
        attempt + 1 < self.max_attempts && error.is_retryable()
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&RetryConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_backoff_calculation() {
        let policy = RetryPolicy::new(5, 1000, 60000, 2.0);

        assert_eq!(policy.calculate_backoff(0), Duration::from_millis(1000));
        assert_eq!(policy.calculate_backoff(1), Duration::from_millis(2000));
        assert_eq!(policy.calculate_backoff(2), Duration::from_millis(4000));
        assert_eq!(policy.calculate_backoff(5), Duration::from_millis(32000));
        assert_eq!(policy.calculate_backoff(6), Duration::from_millis(60000)); // capped
        assert_eq!(policy.calculate_backoff(40), Duration::from_millis(60000));
    }

    #[test]
    fn test_backoff_with_fractional_multiplier() {
        let policy = RetryPolicy::new(3, 100, 1000, 1.5);
        assert_eq!(policy.calculate_backoff(0), Duration::from_millis(100));
        assert_eq!(policy.calculate_backoff(1), Duration::from_millis(150));
        assert_eq!(policy.calculate_backoff(2), Duration::from_millis(225));
    }

    #[test]
    fn test_degenerate_inputs_are_normalised() {
        let policy = RetryPolicy::new(0, 500, 100, 0.5);
        assert_eq!(policy.max_attempts(), 1);
        assert_eq!(policy.calculate_backoff(3), Duration::from_millis(500));
    }

    #[test]
    fn test_should_retry() {
        let policy = RetryPolicy::new(3, 1, 10, 2.0);
        assert!(policy.should_retry(&CriticError::RateLimited, 0));
        assert!(policy.should_retry(&CriticError::Connection("reset".into()), 1));
        assert!(!policy.should_retry(&CriticError::RateLimited, 2));
        assert!(!policy.should_retry(&CriticError::Malformed("bad".into()), 0));
    }

    #[tokio::test]
    async fn test_execute_succeeds_immediately() {
        let policy = RetryPolicy::new(3, 1, 10, 2.0);
        let calls = Arc::new(AtomicU32::new(0));

        let outcome = policy
            .execute(|| {
                let calls = Arc::clone(&calls);
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok::<_, CriticError>(42)
                }
            })
            .await;

        assert_eq!(outcome.result.unwrap(), 42);
        assert_eq!(outcome.attempts, 1);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_execute_retries_retryable_errors() {
        let policy = RetryPolicy::new(3, 1, 10, 2.0);
        let calls = Arc::new(AtomicU32::new(0));

        let outcome = policy
            .execute(|| {
                let calls = Arc::clone(&calls);
                async move {
                    if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                        Err(CriticError::Connection("refused".into()))
                    } else {
                        Ok(7)
                    }
                }
            })
            .await;

        assert_eq!(outcome.result.unwrap(), 7);
        assert_eq!(outcome.attempts, 3);
    }

    #[tokio::test]
    async fn test_execute_stops_on_fatal_error() {
        let policy = RetryPolicy::new(3, 1, 10, 2.0);
        let calls = Arc::new(AtomicU32::new(0));

        let outcome: RetryOutcome<()> = policy
            .execute(|| {
                let calls = Arc::clone(&calls);
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Err(CriticError::Malformed("missing verdict".into()))
                }
            })
            .await;

        assert!(matches!(outcome.result, Err(CriticError::Malformed(_))));
        assert_eq!(outcome.attempts, 1);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_execute_exhausts_attempts() {
        let policy = RetryPolicy::new(2, 1, 10, 2.0);
        let calls = Arc::new(AtomicU32::new(0));

        let outcome: RetryOutcome<()> = policy
            .execute(|| {
                let calls = Arc::clone(&calls);
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Err(CriticError::RateLimited)
                }
            })
            .await;

        assert_eq!(outcome.result, Err(CriticError::RateLimited));
        assert_eq!(outcome.attempts, 2);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
