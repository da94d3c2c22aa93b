//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request:
//!     → cors.rs (preflight, origin check)
//!     → [audit recorder, tenant resolver]
//!     → rate_limit.rs (per-tenant sliding window)
//!     → Pass to handler
//! ```
//!
//! # Design Decisions
//! - Quotas are per tenant, selected by subscription tier
//! - Fail open when the counter store is unavailable

pub mod cors;
pub mod rate_limit;

pub use cors::cors_layer;
pub use rate_limit::{rate_limit, Admission, QuotaHeaders, SlidingWindowLimiter};
