//! Tenant-isolation pipeline.
//!
//! Stages are listed outermost first. A request passes through them in
//! order; the response passes back in reverse. The audit recorder sits
//! outside the resolver so it observes the final status, and reads the
//! resolved tenant through the [`RequestAttributes`] slot it installs.
//! The rate limiter sits inside the resolver because quotas are keyed on
//! the resolved tenant.
//!
//! [`RequestAttributes`]: crate::tenant::RequestAttributes

use axum::{middleware::from_fn_with_state, Router};

use crate::audit::record_audit;
use crate::http::server::AppState;
use crate::security::{cors_layer, rate_limit};
use crate::tenant::resolve_tenant;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Cors,
    Audit,
    TenantResolver,
    RateLimiter,
}

pub const STAGES: [Stage; 4] = [Stage::Cors, Stage::Audit, Stage::TenantResolver, Stage::RateLimiter];

impl Stage {
    fn wrap(self, router: Router<AppState>, state: &AppState) -> Router<AppState> {
        match self {
            Stage::Cors => router.layer(cors_layer(&state.config().cors)),
            Stage::Audit => router.layer(from_fn_with_state(state.clone(), record_audit)),
            Stage::TenantResolver => router.layer(from_fn_with_state(state.clone(), resolve_tenant)),
            Stage::RateLimiter => router.layer(from_fn_with_state(state.clone(), rate_limit)),
        }
    }
}

/// Wrap `routes` in every stage. Later layers end up outermost, so the
/// list is applied innermost first.
pub fn apply(routes: Router<AppState>, state: &AppState) -> Router<AppState> {
    STAGES
        .iter()
        .rev()
        .fold(routes, |router, stage| stage.wrap(router, state))
}
