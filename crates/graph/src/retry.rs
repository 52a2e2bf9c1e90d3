//! Retry with exponential backoff for throttled and transient failures.
//!
//! Only reads go through here. Creating an assignment twice is not
//! idempotent on every tenant, so writes are attempted exactly once.

use std::thread;
use std::time::Duration;

use crate::error::{Error, Result};

/// Configuration for retry logic.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of attempts, including the first
    pub max_attempts: u32,
    /// Delay before the first retry
    pub base_delay: Duration,
    /// Multiplier for exponential backoff
    pub backoff_factor: f64,
    /// Upper bound for any single delay
    pub max_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 4,
            base_delay: Duration::from_secs(2),
            backoff_factor: 2.0,
            max_delay: Duration::from_secs(60),
        }
    }
}

impl RetryConfig {
    /// Retry config with a custom attempt count and default delays.
    pub fn with_attempts(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            ..Default::default()
        }
    }

    /// Calculate the delay for a given attempt number (0-indexed).
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let delay = self.base_delay.as_secs_f64() * self.backoff_factor.powi(attempt as i32);
        let capped = delay.min(self.max_delay.as_secs_f64());
        Duration::from_secs_f64(capped)
    }

    /// Create a config that never retries.
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            ..Default::default()
        }
    }
}

/// Callback trait for retry progress notifications.
pub trait RetryCallback {
    /// Called before sleeping ahead of the next attempt.
    ///
    /// `attempt` is 1-indexed and counts the attempt that just failed.
    fn on_retry(&self, attempt: u32, max_attempts: u32, error: &Error, delay: Duration);
}

/// Callback that logs retries at debug level.
pub struct LogCallback;

impl RetryCallback for LogCallback {
    fn on_retry(&self, attempt: u32, max_attempts: u32, error: &Error, delay: Duration) {
        log::debug!(
            "Attempt {}/{} failed: {}. Retrying in {:.1}s",
            attempt,
            max_attempts,
            error,
            delay.as_secs_f64()
        );
    }
}

/// Execute an operation, retrying retryable errors with exponential backoff.
///
/// Non-retryable errors are returned immediately. After the last attempt the
/// last error is returned.
pub fn with_retry<T, F>(
    config: &RetryConfig,
    callback: Option<&dyn RetryCallback>,
    mut operation: F,
) -> Result<T>
where
    F: FnMut() -> Result<T>,
{
    let max_attempts = config.max_attempts.max(1);
    let mut attempt = 0;

    loop {
        match operation() {
            Ok(result) => return Ok(result),
            Err(e) if !e.is_retryable() || attempt + 1 >= max_attempts => return Err(e),
            Err(e) => {
                let delay = config.delay_for_attempt(attempt);
                if let Some(cb) = callback {
                    cb.on_retry(attempt + 1, max_attempts, &e, delay);
                }
                thread::sleep(delay);
                attempt += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    fn fast(max_attempts: u32) -> RetryConfig {
        RetryConfig {
            max_attempts,
            base_delay: Duration::from_millis(1),
            backoff_factor: 1.0,
            max_delay: Duration::from_millis(5),
        }
    }

    #[test]
    fn test_delay_grows_and_caps() {
        let config = RetryConfig {
            max_attempts: 5,
            base_delay: Duration::from_secs(1),
            backoff_factor: 2.0,
            max_delay: Duration::from_secs(5),
        };
        assert_eq!(config.delay_for_attempt(0), Duration::from_secs(1));
        assert_eq!(config.delay_for_attempt(2), Duration::from_secs(4));
        assert_eq!(config.delay_for_attempt(3), Duration::from_secs(5));
    }

    #[test]
    fn test_success_first_try() {
        let result = with_retry(&RetryConfig::no_retry(), None, || Ok::<_, Error>(7));
        assert_eq!(result.unwrap(), 7);
    }

    #[test]
    fn test_not_found_is_not_retried() {
        let attempts = Cell::new(0);
        let result: Result<()> = with_retry(&fast(4), None, || {
            attempts.set(attempts.get() + 1);
            Err(Error::api(404, None, "missing"))
        });

        assert!(result.is_err());
        assert_eq!(attempts.get(), 1);
    }

    #[test]
    fn test_throttling_eventually_succeeds() {
        let attempts = Cell::new(0);
        let result = with_retry(&fast(3), None, || {
            attempts.set(attempts.get() + 1);
            if attempts.get() < 3 {
                Err(Error::api(429, None, "Too many requests"))
            } else {
                Ok("page")
            }
        });

        assert_eq!(result.unwrap(), "page");
        assert_eq!(attempts.get(), 3);
    }

    #[test]
    fn test_callback_invoked_between_attempts() {
        struct Counting(Cell<u32>);
        impl RetryCallback for Counting {
            fn on_retry(&self, _: u32, _: u32, _: &Error, _: Duration) {
                self.0.set(self.0.get() + 1);
            }
        }

        let callback = Counting(Cell::new(0));
        let _: Result<()> = with_retry(&fast(3), Some(&callback), || {
            Err(Error::Transport("connection reset".into()))
        });

        assert_eq!(callback.0.get(), 2);
    }
}
