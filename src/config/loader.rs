//! Configuration loading from disk and environment.

use std::fs;
use std::path::Path;
use std::str::FromStr;

use thiserror::Error;

use crate::config::schema::AppConfig;
use crate::config::validation::{validate_config, ValidationError};

pub const ENV_FAILURE_THRESHOLD: &str = "BREAKER_FAILURE_THRESHOLD";
pub const ENV_RESET_TIMEOUT_MS: &str = "BREAKER_RESET_TIMEOUT_MS";
pub const ENV_HALF_OPEN_SUCCESS_THRESHOLD: &str = "BREAKER_HALF_OPEN_SUCCESS_THRESHOLD";
pub const ENV_CALL_TIMEOUT_MS: &str = "BREAKER_CALL_TIMEOUT_MS";
pub const ENV_LOG_LEVEL: &str = "LOG_LEVEL";

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid value {value:?} for {var}")]
    Env { var: &'static str, value: String },

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Parse and validate configuration from TOML text.
pub fn parse_config(content: &str) -> Result<AppConfig, ConfigError> {
    let config: AppConfig = toml::from_str(content)?;
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<AppConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    parse_config(&content)
}

/// Override breaker defaults and log level from environment-style variables.
///
/// `lookup` returns the raw value of a variable, if set. Unparseable values
/// are rejected rather than ignored.
pub fn apply_env_overrides<F>(config: &mut AppConfig, lookup: F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let failure_threshold = parse_var(ENV_FAILURE_THRESHOLD, &lookup)?;
    let reset_timeout_ms = parse_var(ENV_RESET_TIMEOUT_MS, &lookup)?;
    let half_open_success_threshold = parse_var(ENV_HALF_OPEN_SUCCESS_THRESHOLD, &lookup)?;
    let call_timeout_ms = parse_var(ENV_CALL_TIMEOUT_MS, &lookup)?;
    let log_level = lookup(ENV_LOG_LEVEL).filter(|l| !l.trim().is_empty());

    // Nothing is applied unless every variable parsed.
    if let Some(v) = failure_threshold {
        config.breaker.failure_threshold = v;
    }
    if let Some(v) = reset_timeout_ms {
        config.breaker.reset_timeout_ms = v;
    }
    if let Some(v) = half_open_success_threshold {
        config.breaker.half_open_success_threshold = v;
    }
    if call_timeout_ms.is_some() {
        config.breaker.call_timeout_ms = call_timeout_ms;
    }
    if let Some(level) = log_level {
        config.observability.log_level = level;
    }
    Ok(())
}

/// Load configuration from `path` (or defaults), then apply process environment overrides.
pub fn load_config_with_env(path: Option<&Path>) -> Result<AppConfig, ConfigError> {
    let mut config = match path {
        Some(path) => load_config(path)?,
        None => AppConfig::default(),
    };

    apply_env_overrides(&mut config, |var| std::env::var(var).ok())?;
    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

fn parse_var<T, F>(var: &'static str, lookup: &F) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    match lookup(var) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::Env { var, value: raw }),
    }
}
