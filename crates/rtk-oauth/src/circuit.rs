//! Circuit breaker: trips after a burst of consecutive refresh
//! failures and short-circuits `get_token` while open.

use std::sync::Mutex;
use std::time::{Duration, Instant};

/// A snapshot of the breaker's current state, for introspection,
/// analogous to `PoolStats` for a connection pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    /// Calls are admitted normally.
    Closed,
    /// Calls are rejected without attempting HTTP.
    Open,
    /// A single trial call is admitted to test recovery.
    HalfOpen,
}

#[derive(Debug)]
enum Inner {
    Closed { consecutive_failures: u32 },
    Open { opened_at: Instant },
    HalfOpen { trial_in_flight: bool },
}

/// Configuration for [`CircuitBreaker`]: trips after
/// `failure_threshold` consecutive failures, stays open for
/// `open_duration`, then allows one half-open trial call.
#[derive(Debug, Clone)]
pub struct CircuitBreakerConfig {
    /// Consecutive failures (with no intervening success) required to trip.
    pub failure_threshold: u32,
    /// How long the breaker stays open before admitting a trial call.
    pub open_duration: Duration,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self { failure_threshold: 3, open_duration: Duration::from_secs(60) }
    }
}

/// A Closed/Open/HalfOpen breaker guarding the token endpoint.
#[derive(Debug)]
pub struct CircuitBreaker {
    config: CircuitBreakerConfig,
    state: Mutex<Inner>,
}

impl CircuitBreaker {
    /// Creates a breaker starting `Closed`.
    #[must_use]
    pub fn new(config: CircuitBreakerConfig) -> Self {
        Self { config, state: Mutex::new(Inner::Closed { consecutive_failures: 0 }) }
    }

    /// Returns whether a refresh attempt may proceed right now. A `true`
    /// result from the `HalfOpen` branch reserves the trial slot for the
    /// caller — concurrent callers arriving while a trial is already in
    /// flight are rejected.
    #[must_use]
    pub fn allow_call(&self) -> bool {
        let mut state = self.state.lock().expect("circuit breaker lock poisoned");
        match &*state {
            Inner::Closed { .. } => true,
            Inner::Open { opened_at } => {
                if opened_at.elapsed() >= self.config.open_duration {
                    *state = Inner::HalfOpen { trial_in_flight: true };
                    true
                } else {
                    false
                }
            }
            Inner::HalfOpen { trial_in_flight } => {
                if *trial_in_flight {
                    false
                } else {
                    *state = Inner::HalfOpen { trial_in_flight: true };
                    true
                }
            }
        }
    }

    /// Records a successful refresh: closes the breaker and resets the
    /// failure streak.
    pub fn record_success(&self) {
        let mut state = self.state.lock().expect("circuit breaker lock poisoned");
        *state = Inner::Closed { consecutive_failures: 0 };
    }

    /// Records a failed refresh: trips the breaker open if this was a
    /// half-open trial, or if the consecutive-failure streak reaches
    /// `failure_threshold`.
    pub fn record_failure(&self) {
        let mut state = self.state.lock().expect("circuit breaker lock poisoned");
        *state = match &*state {
            Inner::HalfOpen { .. } => Inner::Open { opened_at: Instant::now() },
            Inner::Closed { consecutive_failures } => {
                let failures = consecutive_failures + 1;
                if failures >= self.config.failure_threshold {
                    Inner::Open { opened_at: Instant::now() }
                } else {
                    Inner::Closed { consecutive_failures: failures }
                }
            }
            Inner::Open { opened_at } => Inner::Open { opened_at: *opened_at },
        };
    }

    /// A snapshot of the current state for observability.
    #[must_use]
    pub fn state(&self) -> CircuitState {
        match &*self.state.lock().expect("circuit breaker lock poisoned") {
            Inner::Closed { .. } => CircuitState::Closed,
            Inner::Open { .. } => CircuitState::Open,
            Inner::HalfOpen { .. } => CircuitState::HalfOpen,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fast_config() -> CircuitBreakerConfig {
        CircuitBreakerConfig { failure_threshold: 3, open_duration: Duration::from_millis(20) }
    }

    #[test]
    fn starts_closed_and_admits_calls() {
        let cb = CircuitBreaker::new(fast_config());
        assert_eq!(cb.state(), CircuitState::Closed);
        assert!(cb.allow_call());
    }

    #[test]
    fn trips_open_after_consecutive_failures() {
        let cb = CircuitBreaker::new(fast_config());
        cb.record_failure();
        cb.record_failure();
        assert_eq!(cb.state(), CircuitState::Closed);
        cb.record_failure();
        assert_eq!(cb.state(), CircuitState::Open);
        assert!(!cb.allow_call());
    }

    #[test]
    fn success_resets_failure_streak() {
        let cb = CircuitBreaker::new(fast_config());
        cb.record_failure();
        cb.record_failure();
        cb.record_success();
        cb.record_failure();
        cb.record_failure();
        assert_eq!(cb.state(), CircuitState::Closed);
    }

    #[test]
    fn half_open_after_open_duration_admits_one_trial() {
        let cb = CircuitBreaker::new(fast_config());
        cb.record_failure();
        cb.record_failure();
        cb.record_failure();
        assert_eq!(cb.state(), CircuitState::Open);
        std::thread::sleep(Duration::from_millis(30));
        assert!(cb.allow_call());
        assert_eq!(cb.state(), CircuitState::HalfOpen);
        assert!(!cb.allow_call());
    }

    #[test]
    fn half_open_failure_reopens() {
        let cb = CircuitBreaker::new(fast_config());
        cb.record_failure();
        cb.record_failure();
        cb.record_failure();
        std::thread::sleep(Duration::from_millis(30));
        assert!(cb.allow_call());
        cb.record_failure();
        assert_eq!(cb.state(), CircuitState::Open);
    }

    #[test]
    fn half_open_success_closes() {
        let cb = CircuitBreaker::new(fast_config());
        cb.record_failure();
        cb.record_failure();
        cb.record_failure();
        std::thread::sleep(Duration::from_millis(30));
        assert!(cb.allow_call());
        cb.record_success();
        assert_eq!(cb.state(), CircuitState::Closed);
    }
}
