//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the platform.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

use crate::models::SubscriptionTier;

/// Root configuration for the platform service.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct PlatformConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Token signing and lifetimes.
    pub auth: AuthConfig,

    /// Per-tier sliding-window quotas.
    pub rate_limit: RateLimitConfig,

    /// Audit recording and retention.
    pub audit: AuditConfig,

    /// Cross-origin policy.
    pub cors: CorsConfig,

    /// Payment provider settings.
    pub billing: BillingConfig,

    /// Administrative feature switches.
    pub features: FeatureFlags,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Request hardening.
    pub security: SecurityConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8000").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8000".to_string(),
        }
    }
}

/// Token codec configuration. Fixed at process start.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Symmetric signing secret.
    pub jwt_secret: String,

    /// HMAC algorithm name: HS256, HS384 or HS512.
    pub jwt_algorithm: String,

    /// Access token lifetime in minutes.
    pub access_token_expire_minutes: i64,

    /// Refresh token lifetime in days.
    pub refresh_token_expire_days: i64,

    /// Minimum accepted password length on registration and user creation.
    pub min_password_length: usize,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            // WARNING: This is a placeholder! Change this in production.
            jwt_secret: "CHANGE_ME_IN_PRODUCTION".to_string(),
            jwt_algorithm: "HS256".to_string(),
            access_token_expire_minutes: 30,
            refresh_token_expire_days: 7,
            min_password_length: 8,
        }
    }
}

/// Rate limiting configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Enable rate limiting.
    pub enabled: bool,

    /// Sliding window length in seconds.
    pub window_secs: u64,

    /// Requests per window for the free tier.
    pub free_tier: u64,

    /// Requests per window for the pro tier.
    pub pro_tier: u64,

    /// Requests per window for the enterprise tier.
    pub enterprise_tier: u64,
}

impl RateLimitConfig {
    /// Ceiling for a subscription tier.
    pub fn limit_for(&self, tier: SubscriptionTier) -> u64 {
        match tier {
            SubscriptionTier::Free => self.free_tier,
            SubscriptionTier::Pro => self.pro_tier,
            SubscriptionTier::Enterprise => self.enterprise_tier,
        }
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            window_secs: 3600,
            free_tier: 100,
            pro_tier: 1000,
            enterprise_tier: 10_000,
        }
    }
}

/// Audit retention configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AuditConfig {
    /// Records older than this many days are pruned.
    pub retention_days: i64,

    /// Interval between retention runs in seconds.
    pub prune_interval_secs: u64,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            retention_days: 90,
            prune_interval_secs: 86_400,
        }
    }
}

/// Cross-origin policy.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CorsConfig {
    /// Allowed origins (exact match).
    pub allowed_origins: Vec<String>,

    /// Allow credentialed requests.
    pub allow_credentials: bool,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: vec![
                "http://localhost:3000".to_string(),
                "http://localhost:8000".to_string(),
            ],
            allow_credentials: true,
        }
    }
}

/// Payment provider configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BillingConfig {
    /// Provider API base URL.
    pub api_base: String,

    /// Provider secret API key.
    pub secret_key: String,

    /// Webhook signing secret.
    pub webhook_secret: String,

    /// Maximum accepted age of a webhook signature timestamp in seconds.
    pub webhook_tolerance_secs: i64,

    /// Provider price identifier for the pro tier.
    pub pro_price_id: String,

    /// Provider price identifier for the enterprise tier.
    pub enterprise_price_id: String,
}

impl Default for BillingConfig {
    fn default() -> Self {
        Self {
            api_base: "https://api.stripe.com".to_string(),
            secret_key: String::new(),
            webhook_secret: String::new(),
            webhook_tolerance_secs: 300,
            pro_price_id: "price_pro_monthly".to_string(),
            enterprise_price_id: "price_enterprise_monthly".to_string(),
        }
    }
}

/// Administrative feature switches. Hot-reloadable.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct FeatureFlags {
    /// Allow self-service organization registration.
    pub signup: bool,

    /// Enable checkout and webhook processing. Requires the billing secrets.
    pub billing: bool,

    /// Enable the audit recorder stage.
    pub audit_logs: bool,
}

impl Default for FeatureFlags {
    fn default() -> Self {
        Self {
            signup: true,
            billing: false,
            audit_logs: true,
        }
    }
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Request timeout (total time for request/response) in seconds.
    pub request_secs: u64,

    /// Payment provider call timeout in seconds.
    pub provider_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            request_secs: 30,
            provider_secs: 10,
        }
    }
}

/// Security hardening configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Maximum body size in bytes.
    pub max_body_size: usize,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            max_body_size: 2 * 1024 * 1024, // 2MB
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Log output format: "pretty" or "json".
    pub log_format: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: "pretty".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
