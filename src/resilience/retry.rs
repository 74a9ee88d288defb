//! Exponential-backoff retry, selective on error kind.
//!
//! The wait before attempt `n` (1-indexed, retries are attempts `2..=n`) is
//! `min(initial_wait * multiplier^(n-2), max_wait)`.

use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::config::RetryConfig;
use crate::error::{ClassifiedError, ErrorKind};

/// Cumulative counters tracked by a [`RetryPolicy`].
#[derive(Debug, Clone, Default)]
pub struct RetryCounters {
    /// Every attempt made, across all calls.
    pub total_attempts: u64,
    /// `total_attempts - total_calls` (attempts beyond the first per call).
    pub total_retries: u64,
    /// Calls that eventually succeeded.
    pub total_successes: u64,
    /// Calls that exhausted their attempts or hit a non-retriable error.
    pub total_failures: u64,
    /// Failure counts broken down by abstract error kind.
    pub by_kind: HashMap<ErrorKind, u64>,
}

#[derive(Default)]
struct Counters {
    total_attempts: AtomicU64,
    total_calls: AtomicU64,
    total_successes: AtomicU64,
    total_failures: AtomicU64,
    by_kind: Mutex<HashMap<ErrorKind, u64>>,
}

/// Wraps a callable with exponential-backoff retry and exposes aggregate
/// counters across all calls made through it.
pub struct RetryPolicy {
    config: RetryConfig,
    counters: Counters,
}

impl RetryPolicy {
    /// Creates a retry policy with the given configuration.
    pub fn new(config: RetryConfig) -> Self {
        Self {
            config,
            counters: Counters::default(),
        }
    }

    /// The wait before 1-indexed attempt `n` (n >= 2).
    pub fn delay_for_attempt(&self, n: u32) -> std::time::Duration {
        debug_assert!(n >= 2);
        let exponent = (n - 2) as i32;
        let raw_ms = self.config.initial_wait.as_millis() as f64 * self.config.multiplier.powi(exponent);
        let capped_ms = raw_ms.min(self.config.max_wait.as_millis() as f64);
        std::time::Duration::from_millis(capped_ms.max(0.0) as u64)
    }

    /// Runs `op` synchronously, retrying retriable failures up to
    /// `max_attempts` times.
    pub fn call<T, E, F>(&self, mut op: F) -> Result<T, E>
    where
        E: ClassifiedError,
        F: FnMut() -> Result<T, E>,
    {
        self.counters.total_calls.fetch_add(1, Ordering::Relaxed);
        let mut last_err = None;

        for attempt in 1..=self.config.max_attempts {
            self.counters.total_attempts.fetch_add(1, Ordering::Relaxed);
            match op() {
                Ok(value) => {
                    self.counters.total_successes.fetch_add(1, Ordering::Relaxed);
                    return Ok(value);
                }
                Err(err) => {
                    *self
                        .counters
                        .by_kind
                        .lock()
                        .entry(err.kind())
                        .or_insert(0) += 1;

                    if !err.is_retriable() || attempt == self.config.max_attempts {
                        self.counters.total_failures.fetch_add(1, Ordering::Relaxed);
                        return Err(err);
                    }

                    let wait = self.delay_for_attempt(attempt + 1);
                    debug!(attempt, ?wait, "retrying after retriable error");
                    last_err = Some(err);
                    std::thread::sleep(wait);
                }
            }
        }

        self.counters.total_failures.fetch_add(1, Ordering::Relaxed);
        warn!("retry loop exhausted without a terminal result");
        Err(last_err.expect("loop runs at least once"))
    }

    /// Async counterpart to [`Self::call`], using `tokio::time::sleep` for
    /// backoff.
    pub async fn call_async<T, E, F, Fut>(&self, mut op: F) -> Result<T, E>
    where
        E: ClassifiedError,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        self.counters.total_calls.fetch_add(1, Ordering::Relaxed);
        let mut last_err = None;

        for attempt in 1..=self.config.max_attempts {
            self.counters.total_attempts.fetch_add(1, Ordering::Relaxed);
            match op().await {
                Ok(value) => {
                    self.counters.total_successes.fetch_add(1, Ordering::Relaxed);
                    return Ok(value);
                }
                Err(err) => {
                    *self
                        .counters
                        .by_kind
                        .lock()
                        .entry(err.kind())
                        .or_insert(0) += 1;

                    if !err.is_retriable() || attempt == self.config.max_attempts {
                        self.counters.total_failures.fetch_add(1, Ordering::Relaxed);
                        return Err(err);
                    }

                    let wait = self.delay_for_attempt(attempt + 1);
                    debug!(attempt, ?wait, "retrying after retriable error");
                    last_err = Some(err);
                    tokio::time::sleep(wait).await;
                }
            }
        }

        self.counters.total_failures.fetch_add(1, Ordering::Relaxed);
        Err(last_err.expect("loop runs at least once"))
    }

    /// Snapshot of aggregate counters.
    pub fn counters(&self) -> RetryCounters {
        RetryCounters {
            total_attempts: self.counters.total_attempts.load(Ordering::Relaxed),
            total_retries: self.counters.total_attempts.load(Ordering::Relaxed)
                - self.counters.total_calls.load(Ordering::Relaxed),
            total_successes: self.counters.total_successes.load(Ordering::Relaxed),
            total_failures: self.counters.total_failures.load(Ordering::Relaxed),
            by_kind: self.counters.by_kind.lock().clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::time::Duration;

    #[derive(Debug, Clone, Copy)]
    struct TestError(ErrorKind);

    impl ClassifiedError for TestError {
        fn kind(&self) -> ErrorKind {
            self.0
        }
    }

    fn fast_config(max_attempts: u32) -> RetryConfig {
        RetryConfig {
            max_attempts,
            initial_wait: Duration::from_millis(1),
            multiplier: 2.0,
            max_wait: Duration::from_millis(10),
        }
    }

    #[test]
    fn succeeds_first_try_without_retry() {
        let policy = RetryPolicy::new(fast_config(3));
        let result: Result<_, TestError> = policy.call(|| Ok::<_, TestError>(42));
        assert_eq!(result.unwrap(), 42);
        assert_eq!(policy.counters().total_attempts, 1);
        assert_eq!(policy.counters().total_retries, 0);
    }

    #[test]
    fn retries_retriable_errors_up_to_max_attempts() {
        let policy = RetryPolicy::new(fast_config(4));
        let attempts = Cell::new(0);
        let result: Result<(), TestError> = policy.call(|| {
            attempts.set(attempts.get() + 1);
            Err(TestError(ErrorKind::Connection))
        });
        assert!(result.is_err());
        assert_eq!(attempts.get(), 4);
        assert_eq!(policy.counters().total_attempts, 4);
    }

    #[test]
    fn non_retriable_error_fails_after_one_attempt() {
        let policy = RetryPolicy::new(fast_config(5));
        let attempts = Cell::new(0);
        let result: Result<(), TestError> = policy.call(|| {
            attempts.set(attempts.get() + 1);
            Err(TestError(ErrorKind::Validation))
        });
        assert!(result.is_err());
        assert_eq!(attempts.get(), 1);
    }

    #[test]
    fn succeeds_after_some_retries() {
        let policy = RetryPolicy::new(fast_config(5));
        let attempts = Cell::new(0);
        let result = policy.call(|| {
            let n = attempts.get();
            attempts.set(n + 1);
            if n < 2 {
                Err(TestError(ErrorKind::Timeout))
            } else {
                Ok(n)
            }
        });
        assert_eq!(result.unwrap(), 2);
        assert_eq!(attempts.get(), 3);
    }

    #[test]
    fn by_kind_breakdown_tracks_failures() {
        let policy = RetryPolicy::new(fast_config(2));
        let _: Result<(), TestError> = policy.call(|| Err(TestError(ErrorKind::Io)));
        let counters = policy.counters();
        assert_eq!(counters.by_kind.get(&ErrorKind::Io), Some(&2));
    }

    #[tokio::test]
    async fn async_retry_succeeds_after_retries() {
        let policy = RetryPolicy::new(fast_config(5));
        let attempts = Cell::new(0);
        let result = policy
            .call_async(|| async {
                let n = attempts.get();
                attempts.set(n + 1);
                if n < 1 {
                    Err(TestError(ErrorKind::Connection))
                } else {
                    Ok(n)
                }
            })
            .await;
        assert_eq!(result.unwrap(), 1);
        assert_eq!(attempts.get(), 2);
    }

    #[test]
    fn backoff_respects_multiplier_and_cap() {
        let policy = RetryPolicy::new(RetryConfig {
            max_attempts: 5,
            initial_wait: Duration::from_millis(100),
            multiplier: 2.0,
            max_wait: Duration::from_millis(500),
        });
        assert_eq!(policy.delay_for_attempt(2), Duration::from_millis(100));
        assert_eq!(policy.delay_for_attempt(3), Duration::from_millis(200));
        assert_eq!(policy.delay_for_attempt(4), Duration::from_millis(400));
        assert_eq!(policy.delay_for_attempt(5), Duration::from_millis(500));
    }
}
