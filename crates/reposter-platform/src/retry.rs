//! Retry policy with exponential backoff and jitter for idempotent reads.
//!
//! Only feed lookups go through here. Publishing is never retried: a
//! repeated publish can post the same video twice.

use std::future::Future;
use std::time::Duration;

use rand::Rng;
use tracing::{info_span, warn, Instrument};

use crate::error::PlatformResult;
use crate::metrics::record_retry;

/// Retry policy configuration.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of retry attempts (not including the initial attempt).
    pub max_retries: u32,
    /// Base delay for exponential backoff.
    pub base_delay: Duration,
    /// Maximum delay cap.
    pub max_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(10),
        }
    }
}

impl RetryConfig {
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_base_delay(mut self, base_delay: Duration) -> Self {
        self.base_delay = base_delay;
        self
    }

    /// Backoff for `attempt` (0-based): full jitter over `base * 2^attempt`,
    /// capped at `max_delay`, never below `base_delay`.
    fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let exp = self
            .base_delay
            .saturating_mul(2u32.saturating_pow(attempt))
            .min(self.max_delay);
        if exp <= self.base_delay {
            return exp;
        }
        let jittered = rand::rng().random_range(self.base_delay..=exp);
        jittered.max(self.base_delay)
    }
}

/// Execute an async operation, retrying errors that
/// [`PlatformError::is_retryable`](crate::PlatformError::is_retryable).
pub async fn with_retry<T, F, Fut>(config: &RetryConfig, operation: &str, op: F) -> PlatformResult<T>
where
    F: Fn() -> Fut,
    Fut: Future<Output = PlatformResult<T>>,
{
    let mut attempt = 0;
    loop {
        let span = info_span!("platform_retry", operation = %operation, attempt = attempt + 1);
        match op().instrument(span).await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_retryable() && attempt < config.max_retries => {
                let delay = config.delay_for_attempt(attempt);
                warn!(
                    operation = %operation,
                    attempt = attempt + 1,
                    delay_ms = delay.as_millis() as u64,
                    "Platform request failed, retrying: {}",
                    e
                );
                record_retry(operation);
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{PlatformError, PublishStep};
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast() -> RetryConfig {
        RetryConfig::default().with_base_delay(Duration::from_millis(1))
    }

    #[test]
    fn test_delay_bounds() {
        let config = RetryConfig {
            max_retries: 5,
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_millis(400),
        };
        assert_eq!(config.delay_for_attempt(0), Duration::from_millis(100));
        for attempt in 1..10 {
            let delay = config.delay_for_attempt(attempt);
            assert!(delay >= Duration::from_millis(100));
            assert!(delay <= Duration::from_millis(400));
        }
    }

    #[tokio::test]
    async fn test_retries_transient_then_succeeds() {
        let calls = AtomicU32::new(0);
        let result = with_retry(&fast(), "item_list", || async {
            if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                Err(PlatformError::network(PublishStep::ItemList, 503, "busy"))
            } else {
                Ok(7)
            }
        })
        .await;
        assert_eq!(result.unwrap(), 7);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_does_not_retry_permanent_errors() {
        let calls = AtomicU32::new(0);
        let result: PlatformResult<()> = with_retry(&fast(), "user_detail", || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(PlatformError::network(PublishStep::UserDetail, 404, "gone"))
        })
        .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_gives_up_after_max_retries() {
        let calls = AtomicU32::new(0);
        let config = fast().with_max_retries(2);
        let result: PlatformResult<()> = with_retry(&config, "item_list", || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(PlatformError::network(PublishStep::ItemList, 500, ""))
        })
        .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }
}
