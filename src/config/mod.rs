//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse, deserialize, env overrides for secrets)
//!     → validation.rs (semantic checks)
//!     → PlatformConfig (validated, immutable)
//!     → shared via Arc to all subsystems
//!
//! On file change:
//!     watcher.rs detects change
//!     → loader.rs loads new config
//!     → validation.rs validates
//!     → atomic swap of the runtime snapshot (quotas, feature flags)
//! ```
//!
//! # Design Decisions
//! - Signing secret and listener are fixed at start; only runtime knobs reload
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;
pub mod watcher;

pub use loader::{load_config, ConfigError};
pub use schema::{
    AuditConfig, AuthConfig, BillingConfig, CorsConfig, FeatureFlags, ListenerConfig,
    ObservabilityConfig, PlatformConfig, RateLimitConfig, SecurityConfig, TimeoutConfig,
};
