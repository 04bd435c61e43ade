//! Configuration loading from disk and the environment.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::config::schema::GatewayConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid value for {key}: {reason}")]
    Env { key: String, reason: String },

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

/// Load the configuration once at startup.
///
/// Order: TOML file (if given) or defaults, then environment overrides,
/// then validation.
pub fn load_config(path: Option<&Path>) -> Result<GatewayConfig, ConfigError> {
    let mut config = match path {
        Some(path) => {
            let content = fs::read_to_string(path)?;
            toml::from_str(&content)?
        }
        None => GatewayConfig::default(),
    };

    apply_env_overrides(&mut config, |key| std::env::var(key).ok())?;
    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Apply the environment variables the gateway understands.
///
/// - `SERVICE_PORT`: port, `:port` or `host:port`
/// - `REQUEST_SENT_LIMIT`: requests per window
/// - `REQUEST_SENT_TIME_WINDOW`: window in seconds
/// - `REQUEST_SIZE_LIMIT`: max body size in MiB
/// - `MAIN_API_ROUTE`: public prefix
/// - `LOG_LEVEL`
/// - `<SERVICE>_SERVICE_URL`: base URL per configured service
pub fn apply_env_overrides<F>(config: &mut GatewayConfig, lookup: F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(port) = lookup("SERVICE_PORT") {
        config.listener.bind_address = bind_address_from_port(&port);
    }
    if let Some(limit) = lookup("REQUEST_SENT_LIMIT") {
        config.rate_limit.requests_per_window = parse_number("REQUEST_SENT_LIMIT", &limit)?;
    }
    if let Some(window) = lookup("REQUEST_SENT_TIME_WINDOW") {
        config.rate_limit.window_secs = parse_number("REQUEST_SENT_TIME_WINDOW", &window)?;
    }
    if let Some(size) = lookup("REQUEST_SIZE_LIMIT") {
        let mib: usize = parse_number("REQUEST_SIZE_LIMIT", &size)?;
        config.security.max_body_size = mib.saturating_mul(1024 * 1024);
    }
    if let Some(prefix) = lookup("MAIN_API_ROUTE") {
        config.gateway.public_prefix = prefix;
    }
    if let Some(level) = lookup("LOG_LEVEL") {
        config.observability.log_level = level;
    }

    for service in &mut config.services {
        if let Some(url) = lookup(&service_url_key(&service.name)) {
            service.base_url = url;
        }
    }

    Ok(())
}

/// Environment key overriding a service's base URL, e.g. `PRODUCT_SERVICE_URL`.
pub fn service_url_key(service: &str) -> String {
    format!("{}_SERVICE_URL", service.to_ascii_uppercase().replace('-', "_"))
}

fn bind_address_from_port(value: &str) -> String {
    let value = value.trim();
    if let Some(port) = value.strip_prefix(':') {
        format!("0.0.0.0:{}", port)
    } else if value.contains(':') {
        value.to_string()
    } else {
        format!("0.0.0.0:{}", value)
    }
}

fn parse_number<T>(key: &str, value: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value.trim().parse().map_err(|e: T::Err| ConfigError::Env {
        key: key.to_string(),
        reason: e.to_string(),
    })
}
