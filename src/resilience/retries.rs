//! Retry layered above the circuit breaker.
//!
//! # Responsibilities
//! - Re-run a failed guarded call with exponential backoff + jitter
//! - Stop as soon as the breaker rejects; an open circuit is not a transient failure
//!
//! # Design Decisions
//! - The breaker itself never retries; each attempt is one `execute` call
//! - Every attempt counts toward the breaker's failure tracking
//! - Retries are opt-in via config; disabled means a single attempt

use std::fmt;
use std::future::Future;
use std::time::Duration;

use crate::config::RetryConfig;
use crate::resilience::backoff::backoff_delay;
use crate::resilience::circuit_breaker::{BreakerError, CircuitBreaker};

/// How many times to attempt a guarded call and how long to wait in between.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first one.
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(2),
        }
    }
}

impl RetryPolicy {
    /// A policy that makes exactly one attempt.
    pub fn single_attempt() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self {
            max_attempts: if config.enabled { config.max_attempts.max(1) } else { 1 },
            base_delay: Duration::from_millis(config.base_delay_ms),
            max_delay: Duration::from_millis(config.max_delay_ms),
        }
    }
}

/// Run `operation` through `breaker`, retrying failed attempts per `policy`.
///
/// # Errors
///
/// Returns the breaker's rejection immediately, or the last attempt's error
/// once `max_attempts` is exhausted.
pub async fn retry_through<F, Fut, T, E>(
    policy: &RetryPolicy,
    breaker: &CircuitBreaker,
    mut operation: F,
) -> Result<T, BreakerError<E>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: fmt::Display,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 0;

    loop {
        attempt += 1;
        match breaker.execute(|| operation()).await {
            Ok(value) => {
                if attempt > 1 {
                    tracing::info!(breaker = %breaker.name(), attempt, "Guarded call succeeded after retry");
                }
                return Ok(value);
            }
            Err(err @ BreakerError::Open(_)) => return Err(err),
            Err(err) if attempt >= max_attempts => {
                tracing::warn!(
                    breaker = %breaker.name(),
                    attempts = attempt,
                    error = %err,
                    "Guarded call failed, retries exhausted"
                );
                return Err(err);
            }
            Err(err) => {
                let delay = backoff_delay(attempt, policy.base_delay, policy.max_delay);
                tracing::debug!(
                    breaker = %breaker.name(),
                    attempt,
                    max_attempts,
                    error = %err,
                    delay_ms = delay.as_millis() as u64,
                    "Guarded call failed, retrying"
                );
                tokio::time::sleep(delay).await;
            }
        }
    }
}
