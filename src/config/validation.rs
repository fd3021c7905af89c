//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, ports valid)
//! - Check that origins and the upstream authority are well-formed
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ProxyConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use axum::http::uri::Authority;
use url::Url;

use crate::config::schema::ProxyConfig;

/// A single semantic problem with the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path of the offending field.
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Validate a configuration, collecting every error.
pub fn validate_config(config: &ProxyConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "listener.bind_address",
            format!("'{}' is not a socket address", config.listener.bind_address),
        ));
    }

    if let Some(origin) = &config.listener.public_origin {
        if !is_origin(origin) {
            errors.push(ValidationError::new(
                "listener.public_origin",
                format!("'{}' is not an http(s) origin", origin),
            ));
        }
    }

    if config.upstream.host.trim().is_empty() {
        errors.push(ValidationError::new("upstream.host", "must not be empty"));
    } else if config.upstream.authority().parse::<Authority>().is_err() {
        errors.push(ValidationError::new(
            "upstream.host",
            format!("'{}' is not a valid authority", config.upstream.authority()),
        ));
    }

    if config.upstream.port == 0 {
        errors.push(ValidationError::new("upstream.port", "must be non-zero"));
    }

    for (field, prefix) in [
        ("paths.console_prefix", &config.paths.console_prefix),
        ("paths.api_prefix", &config.paths.api_prefix),
    ] {
        if !prefix.starts_with('/') {
            errors.push(ValidationError::new(
                field,
                format!("'{}' must start with '/'", prefix),
            ));
        }
    }

    if config.cors.allowed_origins.is_empty() {
        errors.push(ValidationError::new(
            "cors.allowed_origins",
            "must list at least one origin (or \"*\")",
        ));
    }
    for origin in config.cors.allowed_origins.iter().filter(|o| *o != "*") {
        if !is_origin(origin) {
            errors.push(ValidationError::new(
                "cors.allowed_origins",
                format!("'{}' is not an http(s) origin", origin),
            ));
        }
    }

    for (field, secs) in [
        ("timeouts.connect_secs", config.timeouts.connect_secs),
        ("timeouts.upstream_secs", config.timeouts.upstream_secs),
        ("timeouts.request_secs", config.timeouts.request_secs),
    ] {
        if secs == 0 {
            errors.push(ValidationError::new(field, "must be greater than zero"));
        }
    }

    let timeouts = &config.timeouts;
    if timeouts.upstream_secs > 0 && timeouts.request_secs <= timeouts.upstream_secs {
        errors.push(ValidationError::new(
            "timeouts.request_secs",
            format!(
                "must exceed timeouts.upstream_secs ({}s), got {}s",
                timeouts.upstream_secs, timeouts.request_secs
            ),
        ));
    }

    for ext in &config.cache.static_extensions {
        if ext.trim_start_matches('.').is_empty() || ext.contains('/') {
            errors.push(ValidationError::new(
                "cache.static_extensions",
                format!("'{}' is not a file extension", ext),
            ));
        }
    }

    if config.limits.max_rewrite_body_bytes == 0 {
        errors.push(ValidationError::new(
            "limits.max_rewrite_body_bytes",
            "must be greater than zero",
        ));
    }

    if !["trace", "debug", "info", "warn", "error"]
        .contains(&config.observability.log_level.to_ascii_lowercase().as_str())
    {
        errors.push(ValidationError::new(
            "observability.log_level",
            format!("unknown level '{}'", config.observability.log_level),
        ));
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            format!(
                "'{}' is not a socket address",
                config.observability.metrics_address
            ),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn is_origin(value: &str) -> bool {
    match Url::parse(value) {
        Ok(url) => matches!(url.scheme(), "http" | "https") && url.host_str().is_some(),
        Err(_) => false,
    }
}
