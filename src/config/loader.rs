//! Configuration loading from disk and environment.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::config::schema::PlatformConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Environment variable overriding `auth.jwt_secret`.
pub const ENV_JWT_SECRET: &str = "PLATFORM_JWT_SECRET";
/// Environment variable overriding `billing.secret_key`.
pub const ENV_STRIPE_SECRET_KEY: &str = "PLATFORM_STRIPE_SECRET_KEY";
/// Environment variable overriding `billing.webhook_secret`.
pub const ENV_STRIPE_WEBHOOK_SECRET: &str = "PLATFORM_STRIPE_WEBHOOK_SECRET";

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),

    #[error("Watch error: {0}")]
    Watch(#[from] notify::Error),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<PlatformConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    parse_config(&content)
}

/// Parse, apply environment overrides, and validate.
pub fn parse_config(content: &str) -> Result<PlatformConfig, ConfigError> {
    let mut config: PlatformConfig = toml::from_str(content)?;
    apply_env_overrides(&mut config, |key| std::env::var(key).ok());

    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Overlay secrets from the environment. `lookup` is injected for tests.
pub fn apply_env_overrides<F>(config: &mut PlatformConfig, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(secret) = lookup(ENV_JWT_SECRET) {
        config.auth.jwt_secret = secret;
    }
    if let Some(key) = lookup(ENV_STRIPE_SECRET_KEY) {
        config.billing.secret_key = key;
    }
    if let Some(secret) = lookup(ENV_STRIPE_WEBHOOK_SECRET) {
        config.billing.webhook_secret = secret;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_file_uses_defaults() {
        let config = parse_config(
            r#"
            [rate_limit]
            free_tier = 5

            [features]
            signup = false
            "#,
        )
        .unwrap();

        assert_eq!(config.rate_limit.free_tier, 5);
        assert_eq!(config.rate_limit.pro_tier, 1000);
        assert!(!config.features.signup);
        assert!(!config.features.billing);
        assert_eq!(config.auth.jwt_algorithm, "HS256");
    }

    #[test]
    fn test_invalid_values_are_reported() {
        let err = parse_config(
            r#"
            [audit]
            retention_days = 0
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Validation(ref e) if e.len() == 1));
        assert!(err.to_string().contains("audit.retention_days"));
    }

    #[test]
    fn test_env_overrides_secrets() {
        let mut config = PlatformConfig::default();
        apply_env_overrides(&mut config, |key| match key {
            ENV_JWT_SECRET => Some("from-env".to_string()),
            _ => None,
        });
        assert_eq!(config.auth.jwt_secret, "from-env");
        assert!(config.billing.secret_key.is_empty());
    }

    #[test]
    fn test_load_from_file() {
        let path = std::env::temp_dir().join(format!("platform-{}.toml", uuid::Uuid::new_v4()));
        fs::write(&path, "[listener]\nbind_address = \"127.0.0.1:9999\"\n").unwrap();

        let config = load_config(&path).unwrap();
        assert_eq!(config.listener.bind_address, "127.0.0.1:9999");

        fs::remove_file(&path).unwrap_or_default();
    }
}
