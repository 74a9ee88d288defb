//! Three-state circuit breaker with a sliding failure window.
//!
//! Unlike a simple consecutive-failure counter, failures are timestamped and
//! pruned against `failure_window` on every accounting pass, so a burst of
//! failures outside the window does not keep tripping the breaker.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::CircuitBreakerConfig;
use crate::error::{ClassifiedError, ErrorKind};

/// Circuit breaker state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    /// Calls pass through normally.
    Closed,
    /// Calls are rejected immediately.
    Open,
    /// A single probe call is admitted to test recovery.
    HalfOpen,
}

impl std::fmt::Display for CircuitState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Closed => write!(f, "closed"),
            Self::Open => write!(f, "open"),
            Self::HalfOpen => write!(f, "half_open"),
        }
    }
}

/// Returned when a call is rejected by an open breaker.
#[derive(Debug, Error, Clone)]
#[error("circuit breaker open: {failure_count} failures in the last {window_secs}s, retry in {remaining_secs:.1}s")]
pub struct CircuitBreakerError {
    /// Failures counted within the current window at rejection time.
    pub failure_count: u32,
    /// Configured failure window, in seconds.
    pub window_secs: u64,
    /// Seconds remaining until a probe would be admitted.
    pub remaining_secs: f64,
}

impl ClassifiedError for CircuitBreakerError {
    fn kind(&self) -> ErrorKind {
        ErrorKind::CircuitOpen
    }
}

/// Point-in-time counters, exposed for statistics/health endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CircuitMetrics {
    /// Current state.
    pub state: CircuitState,
    /// Failures presently counted within the window.
    pub failure_count: u32,
    /// Calls rejected while open, cumulative.
    pub rejected_requests: u64,
    /// Total state transitions, cumulative.
    pub state_changes: u64,
    /// Total Closed→Open transitions, cumulative.
    pub circuit_opened_total: u64,
    /// Total →Closed transitions, cumulative.
    pub circuit_closed_total: u64,
}

struct Inner {
    state: CircuitState,
    failure_timestamps: VecDeque<Instant>,
    last_state_change: Instant,
    rejected_requests: u64,
    state_changes: u64,
    circuit_opened_total: u64,
    circuit_closed_total: u64,
}

impl Inner {
    fn prune(&mut self, window: Duration, now: Instant) {
        while let Some(&front) = self.failure_timestamps.front() {
            if now.duration_since(front) > window {
                self.failure_timestamps.pop_front();
            } else {
                break;
            }
        }
    }

    fn transition(&mut self, to: CircuitState, now: Instant) {
        if self.state != to {
            self.state = to;
            self.last_state_change = now;
            self.state_changes += 1;
            match to {
                CircuitState::Open => self.circuit_opened_total += 1,
                CircuitState::Closed => self.circuit_closed_total += 1,
                CircuitState::HalfOpen => {}
            }
        }
    }
}

/// A three-state failure gate around an arbitrary operation.
///
/// `check()`/`record_success()`/`record_failure()` are the primitives a
/// caller composes around its own call; see [`crate::vectordb::adapter`]
/// for the canonical usage.
pub struct CircuitBreaker {
    config: CircuitBreakerConfig,
    inner: Mutex<Inner>,
}

impl CircuitBreaker {
    /// Creates a breaker with the given configuration.
    pub fn new(config: CircuitBreakerConfig) -> Self {
        let now = Instant::now();
        Self {
            config,
            inner: Mutex::new(Inner {
                state: CircuitState::Closed,
                failure_timestamps: VecDeque::new(),
                last_state_change: now,
                rejected_requests: 0,
                state_changes: 0,
                circuit_opened_total: 0,
                circuit_closed_total: 0,
            }),
        }
    }

    /// Read-only view of the current state. Does not perform the
    /// Open→HalfOpen transition (that only happens via [`Self::check`]).
    pub fn state(&self) -> CircuitState {
        let inner = self.inner.lock();
        Self::effective_state(&inner, &self.config)
    }

    /// The state `inner` represents right now, accounting for an elapsed
    /// recovery timeout, without taking any lock. Callers must already hold
    /// `inner`'s guard.
    fn effective_state(inner: &Inner, config: &CircuitBreakerConfig) -> CircuitState {
        if inner.state == CircuitState::Open && inner.last_state_change.elapsed() >= config.recovery_timeout {
            CircuitState::HalfOpen
        } else {
            inner.state
        }
    }

    /// Checks whether a call should proceed. Performs the Open→HalfOpen
    /// recovery transition as a side effect when the recovery timeout has
    /// elapsed.
    pub fn check(&self) -> Result<(), CircuitBreakerError> {
        let now = Instant::now();
        let mut inner = self.inner.lock();

        if inner.state == CircuitState::Open {
            if now.duration_since(inner.last_state_change) >= self.config.recovery_timeout {
                inner.transition(CircuitState::HalfOpen, now);
                debug!("circuit breaker admitting half-open probe");
                return Ok(());
            }

            inner.rejected_requests += 1;
            let remaining = self
                .config
                .recovery_timeout
                .saturating_sub(now.duration_since(inner.last_state_change));
            return Err(CircuitBreakerError {
                failure_count: inner.failure_timestamps.len() as u32,
                window_secs: self.config.failure_window.as_secs(),
                remaining_secs: remaining.as_secs_f64(),
            });
        }

        Ok(())
    }

    /// Records a successful call.
    pub fn record_success(&self) {
        let now = Instant::now();
        let mut inner = self.inner.lock();
        match inner.state {
            CircuitState::HalfOpen => {
                inner.failure_timestamps.clear();
                inner.transition(CircuitState::Closed, now);
                info!("circuit breaker closed after successful probe");
            }
            CircuitState::Closed => {
                inner.prune(self.config.failure_window, now);
            }
            CircuitState::Open => {}
        }
    }

    /// Records a failed call, possibly tripping the breaker.
    pub fn record_failure(&self) {
        let now = Instant::now();
        let mut inner = self.inner.lock();
        match inner.state {
            CircuitState::HalfOpen => {
                inner.failure_timestamps.clear();
                inner.failure_timestamps.push_back(now);
                inner.transition(CircuitState::Open, now);
                warn!("circuit breaker re-opened after failed probe");
            }
            CircuitState::Closed => {
                inner.failure_timestamps.push_back(now);
                inner.prune(self.config.failure_window, now);
                if inner.failure_timestamps.len() as u32 >= self.config.failure_threshold {
                    inner.transition(CircuitState::Open, now);
                    warn!(
                        failures = inner.failure_timestamps.len(),
                        "circuit breaker opened"
                    );
                }
            }
            CircuitState::Open => {
                inner.failure_timestamps.push_back(now);
            }
        }
    }

    /// Forces the breaker back to `Closed` and clears failure history.
    pub fn reset(&self) {
        let now = Instant::now();
        let mut inner = self.inner.lock();
        inner.failure_timestamps.clear();
        inner.transition(CircuitState::Closed, now);
    }

    /// Snapshot of the breaker's counters.
    pub fn metrics(&self) -> CircuitMetrics {
        let inner = self.inner.lock();
        CircuitMetrics {
            state: Self::effective_state(&inner, &self.config),
            failure_count: inner.failure_timestamps.len() as u32,
            rejected_requests: inner.rejected_requests,
            state_changes: inner.state_changes,
            circuit_opened_total: inner.circuit_opened_total,
            circuit_closed_total: inner.circuit_closed_total,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(threshold: u32, window: Duration, recovery: Duration) -> CircuitBreakerConfig {
        CircuitBreakerConfig {
            failure_threshold: threshold,
            failure_window: window,
            recovery_timeout: recovery,
        }
    }

    #[test]
    fn starts_closed() {
        let cb = CircuitBreaker::new(config(3, Duration::from_secs(60), Duration::from_secs(1)));
        assert_eq!(cb.state(), CircuitState::Closed);
        assert!(cb.check().is_ok());
    }

    #[test]
    fn opens_at_threshold() {
        let cb = CircuitBreaker::new(config(3, Duration::from_secs(60), Duration::from_secs(30)));
        for _ in 0..3 {
            cb.record_failure();
        }
        assert_eq!(cb.state(), CircuitState::Open);
        assert!(cb.check().is_err());
    }

    #[test]
    fn stays_closed_under_threshold() {
        let cb = CircuitBreaker::new(config(5, Duration::from_secs(60), Duration::from_secs(30)));
        for _ in 0..4 {
            cb.record_failure();
        }
        assert_eq!(cb.state(), CircuitState::Closed);
    }

    #[test]
    fn transitions_to_half_open_and_back_to_closed() {
        let cb = CircuitBreaker::new(config(
            3,
            Duration::from_secs(60),
            Duration::from_millis(30),
        ));
        for _ in 0..3 {
            cb.record_failure();
        }
        assert_eq!(cb.state(), CircuitState::Open);

        std::thread::sleep(Duration::from_millis(50));
        assert_eq!(cb.state(), CircuitState::HalfOpen);
        assert!(cb.check().is_ok());

        cb.record_success();
        assert_eq!(cb.state(), CircuitState::Closed);
    }

    #[test]
    fn half_open_failure_reopens() {
        let cb = CircuitBreaker::new(config(
            2,
            Duration::from_secs(60),
            Duration::from_millis(20),
        ));
        for _ in 0..2 {
            cb.record_failure();
        }
        std::thread::sleep(Duration::from_millis(30));
        assert_eq!(cb.state(), CircuitState::HalfOpen);
        cb.check().unwrap();
        cb.record_failure();
        assert_eq!(cb.state(), CircuitState::Open);
    }

    #[test]
    fn failures_outside_window_are_pruned() {
        let cb = CircuitBreaker::new(config(
            2,
            Duration::from_millis(20),
            Duration::from_secs(30),
        ));
        cb.record_failure();
        std::thread::sleep(Duration::from_millis(30));
        cb.record_failure();
        // The first failure should have aged out of the window.
        assert_eq!(cb.state(), CircuitState::Closed);
    }

    #[test]
    fn reset_forces_closed() {
        let cb = CircuitBreaker::new(config(1, Duration::from_secs(60), Duration::from_secs(60)));
        cb.record_failure();
        assert_eq!(cb.state(), CircuitState::Open);
        cb.reset();
        assert_eq!(cb.state(), CircuitState::Closed);
        assert!(cb.check().is_ok());
    }

    #[test]
    fn state_changes_counted_once_per_transition() {
        let cb = CircuitBreaker::new(config(
            1,
            Duration::from_secs(60),
            Duration::from_millis(10),
        ));
        cb.record_failure();
        assert_eq!(cb.metrics().state_changes, 1);
        std::thread::sleep(Duration::from_millis(20));
        cb.check().unwrap();
        cb.record_success();
        assert_eq!(cb.metrics().state_changes, 3);
    }
}
