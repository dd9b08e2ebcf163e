//! # Retry Policy
//!
//! Explicit, composable retry policy for platform calls: bounded attempts,
//! exponential backoff with optional jitter, and server retry-after hints.
//! Only transient errors are retried; permanent errors propagate on the
//! first attempt.

use std::future::Future;
use std::time::Duration;

use rand::Rng;
use tracing::{debug, warn};

use crate::clients::error::{PlatformError, PlatformResult};
use crate::config::BackoffConfig;

/// Retry policy wrapping individual client calls
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub backoff_multiplier: f64,
    pub jitter: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(1_000),
            max_delay: Duration::from_millis(30_000),
            backoff_multiplier: 2.0,
            jitter: true,
        }
    }
}

impl From<&BackoffConfig> for RetryPolicy {
    fn from(config: &BackoffConfig) -> Self {
        Self {
            max_attempts: config.max_attempts,
            base_delay: Duration::from_millis(config.base_delay_ms),
            max_delay: Duration::from_millis(config.max_delay_ms),
            backoff_multiplier: config.backoff_multiplier,
            jitter: config.jitter,
        }
    }
}

impl RetryPolicy {
    /// Policy that never retries (single attempt)
    pub fn no_retries() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    /// Delay before the given retry (attempt is 1-based; attempt 1 is the
    /// first retry). A server retry-after hint overrides the curve.
    fn delay_for_attempt(&self, attempt: u32, hint: Option<Duration>) -> Duration {
        if let Some(hint) = hint {
            return hint.min(self.max_delay);
        }
        let factor = self.backoff_multiplier.powi(attempt.saturating_sub(1) as i32);
        let raw = self.base_delay.as_millis() as f64 * factor;
        let mut delay_ms = (raw as u64).min(self.max_delay.as_millis() as u64);
        if self.jitter && delay_ms > 0 {
            // up to +25% jitter to spread concurrent retries
            let spread = delay_ms / 4;
            delay_ms += rand::thread_rng().gen_range(0..=spread);
        }
        Duration::from_millis(delay_ms.min(self.max_delay.as_millis() as u64))
    }

    /// Execute `operation`, retrying transient failures with backoff.
    ///
    /// `label` names the call in logs. Exhausted retries return the last
    /// transient error.
    pub async fn call<F, T, Fut>(&self, label: &str, mut operation: F) -> PlatformResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = PlatformResult<T>>,
    {
        let mut attempt = 1u32;
        loop {
            match operation().await {
                Ok(value) => return Ok(value),
                Err(error) if error.is_transient() && attempt < self.max_attempts => {
                    let delay = self.delay_for_attempt(attempt, error.retry_after());
                    warn!(
                        operation = label,
                        attempt,
                        max_attempts = self.max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %error,
                        "transient platform error, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(error) => {
                    if error.is_transient() {
                        warn!(
                            operation = label,
                            attempts = attempt,
                            error = %error,
                            "retries exhausted"
                        );
                    } else {
                        debug!(operation = label, error = %error, "permanent platform error");
                    }
                    return Err(error);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    fn fast_policy() -> RetryPolicy {
        RetryPolicy {
            max_attempts: 3,
            base_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(5),
            backoff_multiplier: 2.0,
            jitter: false,
        }
    }

    #[tokio::test]
    async fn test_transient_errors_retried_until_success() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();
        let result = fast_policy()
            .call("test", move || {
                let counter = counter.clone();
                async move {
                    if counter.fetch_add(1, Ordering::SeqCst) < 2 {
                        Err(PlatformError::connection("reset"))
                    } else {
                        Ok("done")
                    }
                }
            })
            .await;
        assert_eq!(result.unwrap(), "done");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_permanent_error_not_retried() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();
        let result: PlatformResult<()> = fast_policy()
            .call("test", move || {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Err(PlatformError::conflict("Demo1_Lakehouse"))
                }
            })
            .await;
        assert!(matches!(result, Err(PlatformError::Conflict { .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_retries_bounded() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();
        let result: PlatformResult<()> = fast_policy()
            .call("test", move || {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Err(PlatformError::internal("500"))
                }
            })
            .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_backoff_curve_bounded_by_max_delay() {
        let policy = RetryPolicy {
            max_attempts: 10,
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_millis(400),
            backoff_multiplier: 2.0,
            jitter: false,
        };
        assert_eq!(policy.delay_for_attempt(1, None), Duration::from_millis(100));
        assert_eq!(policy.delay_for_attempt(2, None), Duration::from_millis(200));
        assert_eq!(policy.delay_for_attempt(3, None), Duration::from_millis(400));
        assert_eq!(policy.delay_for_attempt(8, None), Duration::from_millis(400));
    }

    #[test]
    fn test_retry_after_hint_overrides_curve() {
        let policy = fast_policy();
        assert_eq!(
            policy.delay_for_attempt(1, Some(Duration::from_millis(3))),
            Duration::from_millis(3)
        );
        // hint is still clamped to max_delay
        assert_eq!(
            policy.delay_for_attempt(1, Some(Duration::from_secs(60))),
            policy.max_delay
        );
    }
}
