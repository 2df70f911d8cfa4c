//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the breaker
//! host. All types derive Serde traits for deserialization from config files.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::resilience::CircuitBreakerConfig;

/// Root configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// Default breaker settings for every resource.
    pub breaker: BreakerSettings,

    /// Named resources, each with optional overrides of the defaults.
    pub resources: Vec<ResourceConfig>,

    /// Retry policy layered above the breakers.
    pub retries: RetryConfig,

    /// Logging and metrics settings.
    pub observability: ObservabilityConfig,
}

/// Circuit breaker settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct BreakerSettings {
    /// Consecutive failures that open the circuit.
    pub failure_threshold: u32,

    /// Cooldown before a probe is admitted, in milliseconds.
    pub reset_timeout_ms: u64,

    /// Consecutive probe successes that close the circuit.
    pub half_open_success_threshold: u32,

    /// Optional bound on a single guarded call, in milliseconds.
    pub call_timeout_ms: Option<u64>,
}

impl Default for BreakerSettings {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            reset_timeout_ms: 30_000,
            half_open_success_threshold: 2,
            call_timeout_ms: None,
        }
    }
}

impl BreakerSettings {
    pub fn to_breaker_config(&self) -> CircuitBreakerConfig {
        CircuitBreakerConfig {
            failure_threshold: self.failure_threshold,
            reset_timeout: Duration::from_millis(self.reset_timeout_ms),
            half_open_success_threshold: self.half_open_success_threshold,
            call_timeout: self.call_timeout_ms.map(Duration::from_millis),
        }
    }
}

/// A guarded resource (e.g. "users", "products", "feed").
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ResourceConfig {
    /// Resource identifier, used as the breaker name in logs and metrics.
    pub name: String,

    #[serde(default)]
    pub failure_threshold: Option<u32>,

    #[serde(default)]
    pub reset_timeout_ms: Option<u64>,

    #[serde(default)]
    pub half_open_success_threshold: Option<u32>,

    #[serde(default)]
    pub call_timeout_ms: Option<u64>,
}

impl ResourceConfig {
    /// Breaker settings for this resource, falling back to `defaults` per field.
    pub fn apply_to(&self, defaults: &BreakerSettings) -> CircuitBreakerConfig {
        BreakerSettings {
            failure_threshold: self.failure_threshold.unwrap_or(defaults.failure_threshold),
            reset_timeout_ms: self.reset_timeout_ms.unwrap_or(defaults.reset_timeout_ms),
            half_open_success_threshold: self
                .half_open_success_threshold
                .unwrap_or(defaults.half_open_success_threshold),
            call_timeout_ms: self.call_timeout_ms.or(defaults.call_timeout_ms),
        }
        .to_breaker_config()
    }
}

/// Retry configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Enable retries for guarded calls.
    pub enabled: bool,

    /// Total attempts per call, including the first.
    pub max_attempts: u32,

    /// Base delay for exponential backoff in milliseconds.
    pub base_delay_ms: u64,

    /// Upper bound on a single backoff delay in milliseconds.
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            max_attempts: 3,
            base_delay_ms: 100,
            max_delay_ms: 2_000,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level filter used when `RUST_LOG` is not set.
    pub log_level: String,

    pub log_format: LogFormat,

    /// Enable the Prometheus metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
