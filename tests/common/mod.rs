//! Shared utilities for breaker integration tests.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::time::Duration;

use resource_breaker::{CircuitBreaker, CircuitBreakerConfig};
use thiserror::Error;

/// Error produced by [`ScriptedResource`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueryError {
    #[error("document store unreachable (request {0})")]
    Unreachable(u32),
}

/// A guarded resource whose health is switched by the test.
///
/// Counts every invocation so tests can prove the breaker did not call it.
#[derive(Debug)]
pub struct ScriptedResource {
    calls: AtomicU32,
    healthy: AtomicBool,
}

#[allow(dead_code)]
impl ScriptedResource {
    pub fn new(healthy: bool) -> Self {
        Self {
            calls: AtomicU32::new(0),
            healthy: AtomicBool::new(healthy),
        }
    }

    pub fn set_healthy(&self, healthy: bool) {
        self.healthy.store(healthy, Ordering::SeqCst);
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    pub async fn query(&self) -> Result<String, QueryError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if self.healthy.load(Ordering::SeqCst) {
            Ok(format!("document-{n}"))
        } else {
            Err(QueryError::Unreachable(n))
        }
    }

    pub async fn slow_query(&self, delay: Duration) -> Result<String, QueryError> {
        tokio::time::sleep(delay).await;
        self.query().await
    }
}

/// Breaker named "users" with the given thresholds and cooldown.
#[allow(dead_code)]
pub fn breaker(failure_threshold: u32, reset_timeout_ms: u64, half_open_successes: u32) -> CircuitBreaker {
    CircuitBreaker::new(
        "users",
        CircuitBreakerConfig {
            failure_threshold,
            reset_timeout: Duration::from_millis(reset_timeout_ms),
            half_open_success_threshold: half_open_successes,
            call_timeout: None,
        },
    )
}
