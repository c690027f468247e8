//! A three-state (closed/open/half-open) circuit breaker guarding calls to
//! an inference provider.
//!
//! A config plus a counter-backed classification, generalized from a
//! monotonic usage counter into a full state machine with a recovery
//! timer. A state machine with timers needs a mutex rather than plain
//! atomics; an internal mutex is acceptable on this hot path since the
//! critical section is a handful of comparisons.

use std::sync::Mutex;
use std::time::{Duration, Instant};
use superego_core::{Error, ErrorKind};

/// Configuration for a [`CircuitBreaker`].
#[derive(Debug, Clone, Copy)]
pub struct BreakerConfig {
    /// Consecutive failures before the breaker opens.
    pub failure_threshold: u32,
    /// How long the breaker stays open before allowing a trial call.
    pub recovery_timeout: Duration,
    /// Consecutive trial successes (while half-open) required to close again.
    pub success_threshold: u32,
}

impl Default for BreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            recovery_timeout: Duration::from_secs(30),
            success_threshold: 2,
        }
    }
}

/// The breaker's current state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakerState {
    /// Calls are allowed; failures are being counted.
    Closed,
    /// Calls are rejected immediately until `recovery_timeout` elapses.
    Open,
    /// A single trial call is allowed to decide whether to close or reopen.
    HalfOpen,
}

struct Inner {
    state: BreakerState,
    consecutive_failures: u32,
    consecutive_successes: u32,
    opened_at: Option<Instant>,
    /// Set while a half-open trial call is in flight, so a second
    /// concurrent caller is rejected rather than also probing the
    /// dependency — at most one probe call is allowed.
    trial_in_flight: bool,
}

/// Guards calls to a single dependency (typically one inference provider).
pub struct CircuitBreaker {
    config: BreakerConfig,
    inner: Mutex<Inner>,
}

impl CircuitBreaker {
    /// Build a new breaker, starting `Closed`.
    #[must_use]
    pub fn new(config: BreakerConfig) -> Self {
        Self {
            config,
            inner: Mutex::new(Inner {
                state: BreakerState::Closed,
                consecutive_failures: 0,
                consecutive_successes: 0,
                opened_at: None,
                trial_in_flight: false,
            }),
        }
    }

    /// Current state, resolving an expired `Open` timer into `HalfOpen`
    /// first.
    #[must_use]
    pub fn state(&self) -> BreakerState {
        let mut guard = self.inner.lock().expect("breaker lock poisoned");
        self.maybe_transition_to_half_open(&mut guard);
        guard.state
    }

    fn maybe_transition_to_half_open(&self, guard: &mut Inner) {
        if guard.state == BreakerState::Open {
            if let Some(opened_at) = guard.opened_at {
                if opened_at.elapsed() >= self.config.recovery_timeout {
                    guard.state = BreakerState::HalfOpen;
                    guard.consecutive_successes = 0;
                    guard.trial_in_flight = false;
                    tracing::info!("circuit breaker entering half-open trial");
                }
            }
        }
    }

    /// Run `operation` with a timeout, counting the outcome toward the
    /// breaker's state. Rejects immediately (without running `operation`)
    /// if the breaker is open.
    pub async fn call<F, Fut, T>(&self, timeout: Duration, operation: F) -> Result<T, Error>
    where
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = Result<T, Error>>,
    {
        {
            let mut guard = self.inner.lock().expect("breaker lock poisoned");
            self.maybe_transition_to_half_open(&mut guard);
            if guard.state == BreakerState::Open {
                return Err(Error::new(ErrorKind::CircuitOpen, "circuit breaker is open"));
            }
            if guard.state == BreakerState::HalfOpen {
                if guard.trial_in_flight {
                    return Err(Error::new(
                        ErrorKind::CircuitOpen,
                        "a half-open trial call is already in flight",
                    ));
                }
                guard.trial_in_flight = true;
            }
        }

        let result = tokio::time::timeout(timeout, operation()).await;

        match result {
            Ok(Ok(value)) => {
                self.record_success();
                Ok(value)
            }
            Ok(Err(e)) => {
                self.record_failure();
                Err(e)
            }
            Err(_) => {
                self.record_failure();
                Err(Error::new(ErrorKind::InferenceTimeout, "operation exceeded breaker timeout"))
            }
        }
    }

    fn record_success(&self) {
        let mut guard = self.inner.lock().expect("breaker lock poisoned");
        match guard.state {
            BreakerState::Closed => {
                guard.consecutive_failures = 0;
            }
            BreakerState::HalfOpen => {
                guard.trial_in_flight = false;
                guard.consecutive_successes += 1;
                if guard.consecutive_successes >= self.config.success_threshold {
                    guard.state = BreakerState::Closed;
                    guard.consecutive_failures = 0;
                    guard.consecutive_successes = 0;
                    tracing::info!("circuit breaker closed after successful trial");
                }
            }
            BreakerState::Open => {}
        }
    }

    fn record_failure(&self) {
        let mut guard = self.inner.lock().expect("breaker lock poisoned");
        match guard.state {
            BreakerState::Closed => {
                guard.consecutive_failures += 1;
                if guard.consecutive_failures >= self.config.failure_threshold {
                    guard.state = BreakerState::Open;
                    guard.opened_at = Some(Instant::now());
                    tracing::warn!(
                        failures = guard.consecutive_failures,
                        "circuit breaker opened"
                    );
                }
            }
            BreakerState::HalfOpen => {
                guard.state = BreakerState::Open;
                guard.opened_at = Some(Instant::now());
                guard.consecutive_successes = 0;
                guard.trial_in_flight = false;
                tracing::warn!("circuit breaker reopened after failed trial");
            }
            BreakerState::Open => {}
        }
    }
}
