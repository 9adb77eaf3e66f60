//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check every upstream group has replicas with usable addresses
//! - Validate value ranges (timeouts > 0, TTLs > 0)
//! - Detect conflicting group names and prefixes
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: GatewayConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::collections::HashSet;
use std::net::SocketAddr;

use axum::http::uri::Authority;

use crate::config::schema::GatewayConfig;

/// A single semantic problem found in the configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Validate a parsed configuration, collecting every problem.
pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "listener.bind_address",
            format!("'{}' is not a socket address", config.listener.bind_address),
        ));
    }

    if config.upstreams.is_empty() {
        errors.push(ValidationError::new("upstreams", "at least one upstream group is required"));
    }

    let mut names = HashSet::new();
    let mut prefixes = HashSet::new();
    for (i, upstream) in config.upstreams.iter().enumerate() {
        let field = format!("upstreams[{}]", i);

        if upstream.name.trim().is_empty() {
            errors.push(ValidationError::new(format!("{}.name", field), "must not be empty"));
        } else if !names.insert(upstream.name.as_str()) {
            errors.push(ValidationError::new(
                format!("{}.name", field),
                format!("duplicate group name '{}'", upstream.name),
            ));
        }

        if !upstream.path_prefix.starts_with('/') || upstream.path_prefix.len() < 2 {
            errors.push(ValidationError::new(
                format!("{}.path_prefix", field),
                "must start with '/' and name at least one segment",
            ));
        } else if upstream.path_prefix == "/auth" {
            errors.push(ValidationError::new(
                format!("{}.path_prefix", field),
                "'/auth' is reserved for the gateway",
            ));
        } else if !prefixes.insert(upstream.path_prefix.trim_end_matches('/')) {
            errors.push(ValidationError::new(
                format!("{}.path_prefix", field),
                format!("duplicate prefix '{}'", upstream.path_prefix),
            ));
        }

        if upstream.replicas.is_empty() {
            errors.push(ValidationError::new(
                format!("{}.replicas", field),
                "at least one replica is required",
            ));
        }
        for replica in &upstream.replicas {
            let valid = replica
                .parse::<Authority>()
                .map(|a| a.port_u16().is_some())
                .unwrap_or(false);
            if !valid {
                errors.push(ValidationError::new(
                    format!("{}.replicas", field),
                    format!("'{}' is not a host:port address", replica),
                ));
            }
        }
    }

    if config.cache.ttl_secs == 0 {
        errors.push(ValidationError::new("cache.ttl_secs", "must be greater than 0"));
    }
    if config.auth.jwt_secret.is_empty() {
        errors.push(ValidationError::new("auth.jwt_secret", "must not be empty"));
    }
    if config.auth.token_ttl_secs == 0 {
        errors.push(ValidationError::new("auth.token_ttl_secs", "must be greater than 0"));
    }
    if config.auth.user_id_header.parse::<axum::http::HeaderName>().is_err() {
        errors.push(ValidationError::new(
            "auth.user_id_header",
            format!("'{}' is not a valid header name", config.auth.user_id_header),
        ));
    }
    if config.timeouts.upstream_secs == 0 {
        errors.push(ValidationError::new("timeouts.upstream_secs", "must be greater than 0"));
    }
    if config.timeouts.connect_secs == 0 {
        errors.push(ValidationError::new("timeouts.connect_secs", "must be greater than 0"));
    }
    if config.timeouts.request_secs < config.timeouts.upstream_secs {
        errors.push(ValidationError::new(
            "timeouts.request_secs",
            "must not be shorter than timeouts.upstream_secs",
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::UpstreamConfig;

    #[test]
    fn test_defaults_are_valid() {
        assert!(validate_config(&GatewayConfig::default()).is_ok());
    }

    #[test]
    fn test_collects_all_errors() {
        let mut config = GatewayConfig::default();
        config.cache.ttl_secs = 0;
        config.auth.jwt_secret.clear();
        config.upstreams.push(UpstreamConfig {
            name: "marketplace".into(),
            path_prefix: "orders".into(),
            replicas: vec![],
            cacheable: false,
        });

        let errors = validate_config(&config).unwrap_err();
        let fields: Vec<&str> = errors.iter().map(|e| e.field.as_str()).collect();
        assert!(fields.contains(&"cache.ttl_secs"));
        assert!(fields.contains(&"auth.jwt_secret"));
        assert!(fields.contains(&"upstreams[2].name"));
        assert!(fields.contains(&"upstreams[2].path_prefix"));
        assert!(fields.contains(&"upstreams[2].replicas"));
    }

    #[test]
    fn test_rejects_replica_without_port() {
        let mut config = GatewayConfig::default();
        config.upstreams[0].replicas = vec!["localhost".into()];
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "upstreams[0].replicas");
    }
}
