//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML, optional)
//!     → loader.rs (parse & deserialize)
//!     → loader.rs (BREAKER_* / LOG_LEVEL environment overrides)
//!     → validation.rs (semantic checks)
//!     → AppConfig (validated, immutable)
//!     → BreakerRegistry builds one breaker per resource
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; breakers never change settings at runtime
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{apply_env_overrides, load_config, load_config_with_env, parse_config, ConfigError};
pub use schema::{
    AppConfig, BreakerSettings, LogFormat, ObservabilityConfig, ResourceConfig, RetryConfig,
};
pub use validation::{validate_config, ValidationError};
