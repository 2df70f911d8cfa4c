//! Resource-agnostic circuit breaker for guarding fallible async operations.

pub mod config;
pub mod observability;
pub mod resilience;

pub use config::AppConfig;
pub use resilience::{
    BreakerError, BreakerRegistry, BreakerSnapshot, CircuitBreaker, CircuitBreakerConfig,
    CircuitOpenError, CircuitState,
};
