//! Circuit breaker for a guarded resource.
//!
//! # States
//! - Closed: normal operation, calls pass through
//! - Open: resource assumed down, calls fail fast
//! - Half-Open: probe calls test whether the resource recovered
//!
//! # State Transitions
//! ```text
//! Closed → Open: failure_count >= failure_threshold (consecutive)
//! Open → Half-Open: first eligibility check after reset_timeout
//! Half-Open → Closed: success_count >= half_open_success_threshold
//! Half-Open → Open: any probe failure
//! ```
//!
//! # Design Decisions
//! - One breaker per guarded resource, shared by reference (`Arc`)
//! - Cooldown expiry is evaluated lazily on the next call; no timer task
//! - Elapsed time is read from the monotonic tokio clock
//! - All mutable state sits behind one mutex that is never held across an await
//! - Successes while Closed do not heal earlier failures

use std::fmt;
use std::future::Future;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use serde::Serialize;
use thiserror::Error;
use tokio::time::Instant;

use crate::observability::metrics;
use crate::resilience::timeouts;

/// Circuit state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CircuitState {
    /// Calls flow normally.
    Closed,
    /// Calls are rejected without invoking the operation.
    Open,
    /// Probe calls are admitted to test recovery.
    HalfOpen,
}

impl CircuitState {
    pub fn as_str(self) -> &'static str {
        match self {
            CircuitState::Closed => "closed",
            CircuitState::Open => "open",
            CircuitState::HalfOpen => "half_open",
        }
    }

    /// Numeric encoding used by the state gauge.
    pub fn as_gauge(self) -> f64 {
        match self {
            CircuitState::Closed => 0.0,
            CircuitState::Open => 1.0,
            CircuitState::HalfOpen => 2.0,
        }
    }
}

impl fmt::Display for CircuitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Breaker parameters, fixed at construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CircuitBreakerConfig {
    /// Consecutive failures in Closed state that open the circuit.
    pub failure_threshold: u32,

    /// Cooldown after the last failure before a probe is admitted.
    pub reset_timeout: Duration,

    /// Consecutive probe successes in Half-Open state that close the circuit.
    pub half_open_success_threshold: u32,

    /// Upper bound on a single invocation. `None` waits indefinitely.
    pub call_timeout: Option<Duration>,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            reset_timeout: Duration::from_millis(30_000),
            half_open_success_threshold: 2,
            call_timeout: None,
        }
    }
}

/// Rejection raised by an open circuit. The operation was not invoked.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Service unavailable - circuit breaker '{breaker}' is open")]
pub struct CircuitOpenError {
    /// Name of the rejecting breaker.
    pub breaker: String,
    /// Remaining cooldown before a probe will be admitted.
    pub retry_after: Duration,
}

/// Error returned by [`CircuitBreaker::execute`].
///
/// Keeps breaker-originated rejections apart from failures of the
/// guarded operation, which are passed through untouched.
#[derive(Debug, Error)]
pub enum BreakerError<E> {
    /// The circuit is open; the operation was never invoked.
    #[error(transparent)]
    Open(#[from] CircuitOpenError),

    /// The operation ran and failed with its own error.
    #[error(transparent)]
    Inner(E),

    /// The operation exceeded the configured call timeout.
    #[error("Operation timed out after {0:?}")]
    Timeout(Duration),
}

impl<E> BreakerError<E> {
    pub fn is_open(&self) -> bool {
        matches!(self, BreakerError::Open(_))
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, BreakerError::Timeout(_))
    }

    /// Borrow the operation's own error, if that is what failed.
    pub fn inner(&self) -> Option<&E> {
        match self {
            BreakerError::Inner(e) => Some(e),
            _ => None,
        }
    }

    /// Unwrap the operation's own error, if that is what failed.
    pub fn into_inner(self) -> Option<E> {
        match self {
            BreakerError::Inner(e) => Some(e),
            _ => None,
        }
    }
}

/// Point-in-time view of a breaker, for logs and status output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BreakerSnapshot {
    pub name: String,
    pub state: CircuitState,
    pub failure_count: u32,
    pub success_count: u32,
    /// Milliseconds since the last recorded failure.
    pub last_failure_ms_ago: Option<u64>,
}

#[derive(Debug)]
struct BreakerInner {
    state: CircuitState,
    failure_count: u32,
    success_count: u32,
    last_failure: Option<Instant>,
}

impl BreakerInner {
    fn closed() -> Self {
        Self {
            state: CircuitState::Closed,
            failure_count: 0,
            success_count: 0,
            last_failure: None,
        }
    }

    fn reset_counters(&mut self) {
        self.failure_count = 0;
        self.success_count = 0;
    }

    fn trip(&mut self) {
        self.state = CircuitState::Open;
        self.reset_counters();
    }
}

/// State change produced inside a critical section, reported after the lock is released.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Transition {
    Opened { failures: u32 },
    Reopened,
    HalfOpened,
    Closed { successes: u32 },
}

/// Circuit breaker guarding one resource.
///
/// Construct once per resource and share it through an `Arc`; the type is
/// intentionally not `Clone` so that every call site observes the same state.
#[derive(Debug)]
pub struct CircuitBreaker {
    name: String,
    config: CircuitBreakerConfig,
    inner: Mutex<BreakerInner>,
}

impl CircuitBreaker {
    /// Create a closed breaker with zeroed counters.
    pub fn new(name: impl Into<String>, config: CircuitBreakerConfig) -> Self {
        let name = name.into();
        metrics::record_state(&name, CircuitState::Closed);
        Self {
            name,
            config,
            inner: Mutex::new(BreakerInner::closed()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn config(&self) -> &CircuitBreakerConfig {
        &self.config
    }

    /// Current state. Does not evaluate cooldown expiry.
    pub fn state(&self) -> CircuitState {
        self.lock().state
    }

    pub fn snapshot(&self) -> BreakerSnapshot {
        let now = Instant::now();
        let inner = self.lock();
        BreakerSnapshot {
            name: self.name.clone(),
            state: inner.state,
            failure_count: inner.failure_count,
            success_count: inner.success_count,
            last_failure_ms_ago: inner
                .last_failure
                .map(|at| now.saturating_duration_since(at).as_millis() as u64),
        }
    }

    /// Run `operation` through the breaker.
    ///
    /// The operation is invoked at most once, and only if the circuit admits
    /// the call. Its value or error is returned unchanged; the breaker never
    /// retries.
    ///
    /// # Errors
    ///
    /// - [`BreakerError::Open`] if the circuit rejected the call
    /// - [`BreakerError::Inner`] with the operation's own error
    /// - [`BreakerError::Timeout`] if a call timeout is configured and expired
    pub async fn execute<F, Fut, T, E>(&self, operation: F) -> Result<T, BreakerError<E>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        self.try_acquire()?;

        let started = Instant::now();
        let outcome = match timeouts::bounded(self.config.call_timeout, operation()).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(error)) => Err(BreakerError::Inner(error)),
            Err(limit) => {
                tracing::warn!(
                    breaker = %self.name,
                    timeout_ms = limit.as_millis() as u64,
                    "Guarded call exceeded timeout"
                );
                Err(BreakerError::Timeout(limit))
            }
        };

        match &outcome {
            Ok(_) => {
                metrics::record_call(&self.name, "success", started);
                self.record_success();
            }
            Err(e) => {
                let label = if e.is_timeout() { "timeout" } else { "failure" };
                metrics::record_call(&self.name, label, started);
                self.record_failure();
            }
        }

        outcome
    }

    /// Eligibility check. Performs the Open → Half-Open transition when the
    /// cooldown has expired; the call doing so is admitted as a probe.
    fn try_acquire(&self) -> Result<(), CircuitOpenError> {
        let now = Instant::now();
        let mut inner = self.lock();

        if inner.state != CircuitState::Open {
            return Ok(());
        }

        let elapsed = inner
            .last_failure
            .map_or(self.config.reset_timeout, |at| now.saturating_duration_since(at));

        if elapsed >= self.config.reset_timeout {
            inner.state = CircuitState::HalfOpen;
            inner.reset_counters();
            drop(inner);
            self.report(Transition::HalfOpened);
            return Ok(());
        }
        drop(inner);

        let retry_after = self.config.reset_timeout - elapsed;
        tracing::warn!(
            breaker = %self.name,
            retry_after_ms = retry_after.as_millis() as u64,
            "Circuit is open, rejecting call"
        );
        metrics::record_rejection(&self.name);

        Err(CircuitOpenError {
            breaker: self.name.clone(),
            retry_after,
        })
    }

    fn record_success(&self) {
        let mut inner = self.lock();

        if inner.state != CircuitState::HalfOpen {
            return;
        }

        inner.success_count = inner.success_count.saturating_add(1);
        if inner.success_count >= self.config.half_open_success_threshold {
            let successes = inner.success_count;
            inner.state = CircuitState::Closed;
            inner.reset_counters();
            drop(inner);
            self.report(Transition::Closed { successes });
        }
    }

    fn record_failure(&self) {
        let mut inner = self.lock();
        inner.last_failure = Some(Instant::now());

        let transition = match inner.state {
            CircuitState::Closed => {
                inner.failure_count = inner.failure_count.saturating_add(1);
                if inner.failure_count >= self.config.failure_threshold {
                    let failures = inner.failure_count;
                    inner.trip();
                    Some(Transition::Opened { failures })
                } else {
                    None
                }
            }
            CircuitState::HalfOpen => {
                inner.trip();
                Some(Transition::Reopened)
            }
            // Late failure from a call admitted before the circuit opened:
            // only the cooldown restarts.
            CircuitState::Open => None,
        };
        drop(inner);

        if let Some(transition) = transition {
            self.report(transition);
        }
    }

    fn report(&self, transition: Transition) {
        let (from, to) = match transition {
            Transition::Opened { failures } => {
                tracing::warn!(
                    breaker = %self.name,
                    failures,
                    "Circuit opening after consecutive failures"
                );
                (CircuitState::Closed, CircuitState::Open)
            }
            Transition::Reopened => {
                tracing::warn!(
                    breaker = %self.name,
                    "Failed operation in half-open state, circuit opening again"
                );
                (CircuitState::HalfOpen, CircuitState::Open)
            }
            Transition::HalfOpened => {
                tracing::info!(breaker = %self.name, "Circuit transitioning to half-open state");
                (CircuitState::Open, CircuitState::HalfOpen)
            }
            Transition::Closed { successes } => {
                tracing::info!(
                    breaker = %self.name,
                    successes,
                    "Circuit closed after successful probes"
                );
                (CircuitState::HalfOpen, CircuitState::Closed)
            }
        };
        metrics::record_transition(&self.name, from, to);
    }

    fn lock(&self) -> MutexGuard<'_, BreakerInner> {
        // Critical sections never panic, so a poisoned lock still holds consistent state.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
