//! Configuration loading from disk and environment.

use std::fs;
use std::path::Path;

use crate::config::schema::GatewayConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Invalid value for {key}: '{value}'")]
    Env { key: String, value: String },
    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load configuration from an optional TOML file, apply environment
/// overrides, then validate.
pub fn load_config(path: Option<&Path>) -> Result<GatewayConfig, ConfigError> {
    let config = match path {
        Some(path) => {
            let content = fs::read_to_string(path)?;
            toml::from_str(&content)?
        }
        None => GatewayConfig::default(),
    };

    let config = apply_env_overrides(config, |key| std::env::var(key).ok())?;
    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Apply `GATEWAY_*` overrides using the given variable lookup.
///
/// Replica lists are overridden per group with `GATEWAY_REPLICAS_<GROUP>`,
/// where `<GROUP>` is the upper-cased group name.
pub fn apply_env_overrides<F>(mut config: GatewayConfig, lookup: F) -> Result<GatewayConfig, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(addr) = lookup("GATEWAY_BIND_ADDRESS") {
        config.listener.bind_address = addr;
    }
    if let Some(secret) = lookup("GATEWAY_JWT_SECRET") {
        config.auth.jwt_secret = secret;
    }
    if let Some(ttl) = parse_var(&lookup, "GATEWAY_TOKEN_TTL_SECS")? {
        config.auth.token_ttl_secs = ttl;
    }
    if let Some(ttl) = parse_var(&lookup, "GATEWAY_CACHE_TTL_SECS")? {
        config.cache.ttl_secs = ttl;
    }
    if let Some(timeout) = parse_var(&lookup, "GATEWAY_UPSTREAM_TIMEOUT_SECS")? {
        config.timeouts.upstream_secs = timeout;
        config.timeouts.request_secs = config.timeouts.request_secs.max(timeout);
    }

    for upstream in &mut config.upstreams {
        let key = format!("GATEWAY_REPLICAS_{}", upstream.name.to_uppercase().replace('-', "_"));
        if let Some(list) = lookup(&key) {
            upstream.replicas = list
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect();
        }
    }

    Ok(config)
}

fn parse_var<F>(lookup: &F, key: &str) -> Result<Option<u64>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::Env {
                key: key.to_string(),
                value,
            }),
        None => Ok(None),
    }
}
