//! Tenant identity propagation.
//!
//! # Data Flow
//! ```text
//! Authorization: Bearer <access token>
//!     → resolver.rs (verify, build TenantContext)
//!     → request extensions (TenantContext, RequestAttributes slot)
//!     → rate limiter, audit recorder, handlers
//! ```

pub mod context;
pub mod resolver;

pub use context::{CredentialRejection, RequestAttributes, TenantContext};
pub use resolver::{resolve, resolve_tenant, Resolution};
