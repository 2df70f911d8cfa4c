//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Call to a guarded resource:
//!     → registry.rs (one shared breaker per resource name)
//!     → retries.rs (optional, layered above the breaker)
//!     → circuit_breaker.rs (admit or reject, record outcome)
//!     → timeouts.rs (optional bound on the single invocation)
//! ```
//!
//! # Design Decisions
//! - The breaker decides only whether to attempt a call; it never retries
//! - Rejections and operation failures are distinct error variants
//! - Timeouts are opt-in; without one a hung operation hangs the caller
//! - Circuit breaker prevents cascading failures

pub mod backoff;
pub mod circuit_breaker;
pub mod registry;
pub mod retries;
pub mod timeouts;

pub use circuit_breaker::{
    BreakerError, BreakerSnapshot, CircuitBreaker, CircuitBreakerConfig, CircuitOpenError,
    CircuitState,
};
pub use registry::BreakerRegistry;
pub use retries::{retry_through, RetryPolicy};
