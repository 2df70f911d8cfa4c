//! Per-resource breaker registry.
//!
//! # Responsibilities
//! - Hand out exactly one breaker per named resource
//! - Apply per-resource overrides on top of the default settings
//! - Report a snapshot of every breaker for status output
//!
//! # Design Decisions
//! - Explicit value passed to collaborators, never a global
//! - Breakers are created lazily on first use; creation is atomic per name
//! - Breakers live as long as the registry; there is no eviction

use std::collections::HashMap;
use std::sync::Arc;

use dashmap::DashMap;

use crate::config::AppConfig;
use crate::resilience::circuit_breaker::{BreakerSnapshot, CircuitBreaker, CircuitBreakerConfig};

/// Registry mapping resource names to their shared breaker.
#[derive(Debug, Default)]
pub struct BreakerRegistry {
    defaults: CircuitBreakerConfig,
    overrides: HashMap<String, CircuitBreakerConfig>,
    breakers: DashMap<String, Arc<CircuitBreaker>>,
}

impl BreakerRegistry {
    /// Create a registry where every resource uses `defaults`.
    pub fn new(defaults: CircuitBreakerConfig) -> Self {
        Self {
            defaults,
            overrides: HashMap::new(),
            breakers: DashMap::new(),
        }
    }

    /// Create a registry from loaded configuration.
    ///
    /// Every configured resource gets its breaker up front so status output
    /// lists it even before its first call.
    pub fn from_config(config: &AppConfig) -> Self {
        let defaults = config.breaker.to_breaker_config();
        let overrides = config
            .resources
            .iter()
            .map(|resource| (resource.name.clone(), resource.apply_to(&config.breaker)))
            .collect();

        let registry = Self {
            defaults,
            overrides,
            breakers: DashMap::new(),
        };
        for resource in &config.resources {
            registry.get_or_create(&resource.name);
        }
        registry
    }

    /// The breaker for `name`, created with its configured settings on first use.
    pub fn get_or_create(&self, name: &str) -> Arc<CircuitBreaker> {
        if let Some(existing) = self.breakers.get(name) {
            return Arc::clone(existing.value());
        }

        let entry = self.breakers.entry(name.to_string()).or_insert_with(|| {
            let config = self
                .overrides
                .get(name)
                .cloned()
                .unwrap_or_else(|| self.defaults.clone());
            tracing::debug!(
                breaker = name,
                failure_threshold = config.failure_threshold,
                reset_timeout_ms = config.reset_timeout.as_millis() as u64,
                half_open_success_threshold = config.half_open_success_threshold,
                "Circuit breaker created"
            );
            Arc::new(CircuitBreaker::new(name, config))
        });
        Arc::clone(entry.value())
    }

    /// The breaker for `name`, if one has been created.
    pub fn get(&self, name: &str) -> Option<Arc<CircuitBreaker>> {
        self.breakers.get(name).map(|r| Arc::clone(r.value()))
    }

    pub fn len(&self) -> usize {
        self.breakers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.breakers.is_empty()
    }

    /// Snapshots of every breaker, sorted by name.
    pub fn snapshots(&self) -> Vec<BreakerSnapshot> {
        let mut snapshots: Vec<_> = self.breakers.iter().map(|r| r.value().snapshot()).collect();
        snapshots.sort_by(|a, b| a.name.cmp(&b.name));
        snapshots
    }
}
