//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (thresholds >= 1, timeouts > 0)
//! - Detect duplicate or unnamed resources
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: AppConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::collections::HashSet;
use std::net::SocketAddr;

use thiserror::Error;

use crate::config::schema::{AppConfig, BreakerSettings};

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{field} must be at least 1")]
    ZeroThreshold { field: String },

    #[error("{field} must be greater than 0")]
    ZeroTimeout { field: String },

    #[error("resource name must not be empty")]
    EmptyResourceName,

    #[error("duplicate resource '{0}'")]
    DuplicateResource(String),

    #[error("retries.max_attempts must be at least 1")]
    ZeroRetryAttempts,

    #[error("retries.base_delay_ms ({base}) exceeds retries.max_delay_ms ({max})")]
    RetryDelayOrder { base: u64, max: u64 },

    #[error("invalid metrics address '{0}'")]
    MetricsAddress(String),
}

/// Check `config` for semantic errors.
pub fn validate_config(config: &AppConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    check_breaker(&config.breaker, "breaker", &mut errors);

    let mut seen = HashSet::new();
    for resource in &config.resources {
        if resource.name.trim().is_empty() {
            errors.push(ValidationError::EmptyResourceName);
            continue;
        }
        if !seen.insert(resource.name.as_str()) {
            errors.push(ValidationError::DuplicateResource(resource.name.clone()));
        }

        let scope = format!("resources[{}]", resource.name);
        check_threshold(resource.failure_threshold, &scope, "failure_threshold", &mut errors);
        check_threshold(
            resource.half_open_success_threshold,
            &scope,
            "half_open_success_threshold",
            &mut errors,
        );
        check_timeout(resource.call_timeout_ms, &scope, "call_timeout_ms", &mut errors);
    }

    let retries = &config.retries;
    if retries.max_attempts == 0 {
        errors.push(ValidationError::ZeroRetryAttempts);
    }
    if retries.base_delay_ms > retries.max_delay_ms {
        errors.push(ValidationError::RetryDelayOrder {
            base: retries.base_delay_ms,
            max: retries.max_delay_ms,
        });
    }

    let observability = &config.observability;
    if observability.metrics_enabled && observability.metrics_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::MetricsAddress(observability.metrics_address.clone()));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_breaker(settings: &BreakerSettings, scope: &str, errors: &mut Vec<ValidationError>) {
    check_threshold(Some(settings.failure_threshold), scope, "failure_threshold", errors);
    check_threshold(
        Some(settings.half_open_success_threshold),
        scope,
        "half_open_success_threshold",
        errors,
    );
    check_timeout(settings.call_timeout_ms, scope, "call_timeout_ms", errors);
}

fn check_threshold(value: Option<u32>, scope: &str, name: &str, errors: &mut Vec<ValidationError>) {
    if value == Some(0) {
        errors.push(ValidationError::ZeroThreshold {
            field: format!("{scope}.{name}"),
        });
    }
}

fn check_timeout(value: Option<u64>, scope: &str, name: &str, errors: &mut Vec<ValidationError>) {
    if value == Some(0) {
        errors.push(ValidationError::ZeroTimeout {
            field: format!("{scope}.{name}"),
        });
    }
}
