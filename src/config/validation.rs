//! Configuration validation.
//!
//! Semantic checks only; serde handles syntax. Returns every error found,
//! not just the first.

use thiserror::Error;

use crate::config::schema::PlatformConfig;

/// A single semantic problem in a loaded configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{field}: {message}")]
pub struct ValidationError {
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

/// Validate a configuration, collecting all errors.
pub fn validate_config(config: &PlatformConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<std::net::SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "listener.bind_address",
            format!("not a socket address: {}", config.listener.bind_address),
        ));
    }

    if config.auth.jwt_secret.is_empty() {
        errors.push(ValidationError::new("auth.jwt_secret", "must not be empty"));
    }
    if !matches!(config.auth.jwt_algorithm.as_str(), "HS256" | "HS384" | "HS512") {
        errors.push(ValidationError::new(
            "auth.jwt_algorithm",
            format!("unsupported algorithm {}", config.auth.jwt_algorithm),
        ));
    }
    if config.auth.access_token_expire_minutes <= 0 {
        errors.push(ValidationError::new(
            "auth.access_token_expire_minutes",
            "must be positive",
        ));
    }
    if config.auth.refresh_token_expire_days <= 0 {
        errors.push(ValidationError::new(
            "auth.refresh_token_expire_days",
            "must be positive",
        ));
    }

    let rl = &config.rate_limit;
    if rl.window_secs == 0 {
        errors.push(ValidationError::new("rate_limit.window_secs", "must be positive"));
    }
    if rl.free_tier == 0 || rl.pro_tier == 0 || rl.enterprise_tier == 0 {
        errors.push(ValidationError::new(
            "rate_limit",
            "tier ceilings must be positive",
        ));
    }

    if config.audit.retention_days <= 0 {
        errors.push(ValidationError::new("audit.retention_days", "must be positive"));
    }
    if config.audit.prune_interval_secs == 0 {
        errors.push(ValidationError::new(
            "audit.prune_interval_secs",
            "must be positive",
        ));
    }

    for origin in &config.cors.allowed_origins {
        if url::Url::parse(origin).is_err() {
            errors.push(ValidationError::new(
                "cors.allowed_origins",
                format!("invalid origin {origin}"),
            ));
        }
    }

    if url::Url::parse(&config.billing.api_base).is_err() {
        errors.push(ValidationError::new(
            "billing.api_base",
            format!("invalid URL {}", config.billing.api_base),
        ));
    }

    if config.features.billing {
        if config.billing.secret_key.is_empty() {
            errors.push(ValidationError::new(
                "billing.secret_key",
                "must be set when billing is enabled",
            ));
        }
        if config.billing.webhook_secret.is_empty() {
            errors.push(ValidationError::new(
                "billing.webhook_secret",
                "must be set when billing is enabled",
            ));
        }
    }

    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::new("timeouts.request_secs", "must be positive"));
    }

    if !matches!(config.observability.log_format.as_str(), "pretty" | "json") {
        errors.push(ValidationError::new(
            "observability.log_format",
            "must be \"pretty\" or \"json\"",
        ));
    }
    if config.observability.metrics_enabled
        && config
            .observability
            .metrics_address
            .parse::<std::net::SocketAddr>()
            .is_err()
    {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            "not a socket address",
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
