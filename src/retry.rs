use rand::Rng;
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::{config::WorkOrderConfig, errors::ServiceError};

/// Configuration for retry behavior
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of attempts, the first one included
    pub max_attempts: u32,
    /// Initial delay between retries
    pub initial_delay: Duration,
    /// Maximum delay between retries
    pub max_delay: Duration,
    /// Factor to multiply delay by after each attempt
    pub backoff_factor: f64,
    /// Sleep a random share of the current delay instead of all of it
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_millis(10),
            max_delay: Duration::from_millis(250),
            backoff_factor: 2.0,
            jitter: true,
        }
    }
}

impl From<&WorkOrderConfig> for RetryConfig {
    fn from(settings: &WorkOrderConfig) -> Self {
        Self {
            max_attempts: settings.create_max_attempts.max(1),
            initial_delay: Duration::from_millis(settings.retry_initial_delay_ms),
            max_delay: Duration::from_millis(settings.retry_max_delay_ms),
            backoff_factor: settings.retry_backoff_factor,
            jitter: true,
        }
    }
}

impl RetryConfig {
    /// How long to sleep for the given backoff step.
    fn pause(&self, delay: Duration) -> Duration {
        if !self.jitter || delay.is_zero() {
            return delay;
        }
        let upper = u64::try_from(delay.as_micros()).unwrap_or(u64::MAX);
        Duration::from_micros(rand::thread_rng().gen_range(0..=upper))
    }

    fn next_delay(&self, delay: Duration) -> Duration {
        let scaled = delay.as_nanos() as f64 * self.backoff_factor.max(1.0);
        if !scaled.is_finite() || scaled >= self.max_delay.as_nanos() as f64 {
            self.max_delay
        } else {
            Duration::from_nanos(scaled as u64)
        }
    }
}

/// Retry policy for determining if an error is retryable
pub trait RetryPolicy<E> {
    fn is_retryable(&self, error: &E) -> bool;
}

/// Retries unique-constraint conflicts only.
pub struct ConflictRetryPolicy;

impl RetryPolicy<ServiceError> for ConflictRetryPolicy {
    fn is_retryable(&self, error: &ServiceError) -> bool {
        error.is_conflict()
    }
}

/// Execute an async function with retries
pub async fn with_retry<F, Fut, T, E>(
    config: &RetryConfig,
    policy: impl RetryPolicy<E>,
    mut operation: F,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    let mut delay = config.initial_delay;
    let mut attempts = 0;

    loop {
        attempts += 1;

        match operation().await {
            Ok(result) => {
                if attempts > 1 {
                    debug!("Operation succeeded after {} attempts", attempts);
                }
                return Ok(result);
            }
            Err(error) if !policy.is_retryable(&error) => return Err(error),
            Err(error) => {
                if attempts >= config.max_attempts {
                    warn!("Operation failed after {} attempts: {}", attempts, error);
                    return Err(error);
                }

                let pause = config.pause(delay);
                warn!(
                    "Attempt {} failed: {}. Retrying in {:?}...",
                    attempts, error, pause
                );
                sleep(pause).await;

                delay = config.next_delay(delay);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn quick(max_attempts: u32) -> RetryConfig {
        RetryConfig {
            max_attempts,
            initial_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(4),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn retries_conflicts_until_the_operation_succeeds() {
        let calls = AtomicU32::new(0);
        let calls = &calls;

        let result = with_retry(&quick(5), ConflictRetryPolicy, || async move {
            if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                Err(ServiceError::Conflict("taken".into()))
            } else {
                Ok("000003")
            }
        })
        .await;

        assert_eq!(result.unwrap(), "000003");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn stops_after_max_attempts() {
        let calls = AtomicU32::new(0);
        let calls = &calls;

        let result: Result<(), _> = with_retry(&quick(3), ConflictRetryPolicy, || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(ServiceError::Conflict("taken".into()))
        })
        .await;

        assert_matches!(result, Err(ServiceError::Conflict(_)));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn other_errors_are_returned_immediately() {
        let calls = AtomicU32::new(0);
        let calls = &calls;

        let result: Result<(), _> = with_retry(&quick(5), ConflictRetryPolicy, || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(ServiceError::MalformedIdentifier("00A1".into()))
        })
        .await;

        assert_matches!(result, Err(ServiceError::MalformedIdentifier(_)));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn jittered_pause_stays_within_the_delay() {
        let config = RetryConfig::default();
        let delay = Duration::from_millis(20);
        for _ in 0..200 {
            assert!(config.pause(delay) <= delay);
        }

        let fixed = RetryConfig {
            jitter: false,
            ..Default::default()
        };
        assert_eq!(fixed.pause(delay), delay);
    }

    #[test]
    fn delay_grows_up_to_the_cap() {
        let config = RetryConfig {
            initial_delay: Duration::from_millis(10),
            max_delay: Duration::from_millis(30),
            backoff_factor: 2.0,
            ..Default::default()
        };
        let second = config.next_delay(config.initial_delay);
        assert_eq!(second, Duration::from_millis(20));
        assert_eq!(config.next_delay(second), Duration::from_millis(30));
        assert_eq!(
            config.next_delay(Duration::from_millis(30)),
            Duration::from_millis(30)
        );
    }

    #[test]
    fn follows_work_order_settings() {
        let settings = WorkOrderConfig {
            create_max_attempts: 7,
            retry_initial_delay_ms: 3,
            retry_max_delay_ms: 90,
            retry_backoff_factor: 1.5,
            ..Default::default()
        };
        let config = RetryConfig::from(&settings);
        assert_eq!(config.max_attempts, 7);
        assert_eq!(config.initial_delay, Duration::from_millis(3));
        assert_eq!(config.max_delay, Duration::from_millis(90));
        assert_eq!(config.backoff_factor, 1.5);
        assert!(config.jitter);
    }
}
