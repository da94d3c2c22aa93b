//! Per-tenant sliding-window rate limiting with tiered quotas.

use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{HeaderMap, HeaderValue, Request},
    middleware::Next,
    response::{IntoResponse, Response},
};
use chrono::Utc;
use uuid::Uuid;

use crate::error::ApiError;
use crate::http::paths;
use crate::http::server::AppState;
use crate::observability::metrics;
use crate::store::{counter::window_key, CounterStore, WindowRequest};
use crate::tenant::TenantContext;

pub const LIMIT_HEADER: &str = "x-ratelimit-limit";
pub const REMAINING_HEADER: &str = "x-ratelimit-remaining";
pub const RESET_HEADER: &str = "x-ratelimit-reset";

/// Quota headers attached to admitted responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuotaHeaders {
    pub limit: u64,
    pub remaining: u64,
    /// Epoch seconds at which the oldest entry leaves the window.
    pub reset: i64,
}

impl QuotaHeaders {
    pub fn apply(&self, headers: &mut HeaderMap) {
        headers.insert(LIMIT_HEADER, HeaderValue::from(self.limit));
        headers.insert(REMAINING_HEADER, HeaderValue::from(self.remaining));
        headers.insert(RESET_HEADER, HeaderValue::from(self.reset));
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Admitted(QuotaHeaders),
    Rejected { limit: u64, window_secs: u64, reset: i64 },
    /// The counter store failed; the request proceeds unmetered.
    FailOpen,
}

/// Sliding-window log limiter over a shared counter store.
#[derive(Clone)]
pub struct SlidingWindowLimiter {
    store: Arc<dyn CounterStore>,
}

impl SlidingWindowLimiter {
    pub fn new(store: Arc<dyn CounterStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<dyn CounterStore> {
        &self.store
    }

    pub async fn check(&self, tenant_id: Uuid, subject: &str, limit: u64, window_secs: u64) -> Admission {
        self.check_at(tenant_id, subject, limit, window_secs, Utc::now().timestamp_millis())
            .await
    }

    /// Admit one request for `tenant_id` at `now_ms`.
    pub async fn check_at(
        &self,
        tenant_id: Uuid,
        subject: &str,
        limit: u64,
        window_secs: u64,
        now_ms: i64,
    ) -> Admission {
        let key = window_key(tenant_id);
        let window_ms = (window_secs as i64).saturating_mul(1000);

        let decision = match self
            .store
            .admit(WindowRequest {
                key: &key,
                subject,
                now_ms,
                window_ms,
                limit,
            })
            .await
        {
            Ok(decision) => decision,
            Err(e) => {
                tracing::warn!(tenant_id = %tenant_id, error = %e, "Counter store unavailable, admitting request");
                metrics::record_rate_limiter_fail_open();
                return Admission::FailOpen;
            }
        };

        let oldest_ms = decision.oldest_ms.unwrap_or(now_ms);
        let reset = (oldest_ms + window_ms + 999).div_euclid(1000);

        if decision.admitted {
            Admission::Admitted(QuotaHeaders {
                limit,
                remaining: limit.saturating_sub(decision.count + 1),
                reset,
            })
        } else {
            Admission::Rejected {
                limit,
                window_secs,
                reset,
            }
        }
    }
}

/// Rate limiting stage. Runs inside the tenant resolver.
pub async fn rate_limit(State(state): State<AppState>, req: Request<Body>, next: Next) -> Response {
    let config = state.config();
    if !config.rate_limit.enabled || paths::skips_rate_limit(req.uri().path()) {
        return next.run(req).await;
    }

    let Some(ctx) = req.extensions().get::<TenantContext>().cloned() else {
        return next.run(req).await;
    };

    let tier = state.tiers.tier_for(state.persistence.as_ref(), ctx.tenant_id).await;
    let limit = config.rate_limit.limit_for(tier);
    let subject = ctx.subject_id.to_string();

    match state
        .limiter
        .check(ctx.tenant_id, &subject, limit, config.rate_limit.window_secs)
        .await
    {
        Admission::Admitted(quota) => {
            let mut response = next.run(req).await;
            quota.apply(response.headers_mut());
            response
        }
        Admission::Rejected {
            limit,
            window_secs,
            reset,
        } => {
            tracing::warn!(tenant_id = %ctx.tenant_id, tier = tier.as_str(), limit, "Rate limit exceeded");
            metrics::record_rate_limited(tier.as_str());
            ApiError::RateLimitExceeded {
                limit,
                window_secs,
                reset,
            }
            .into_response()
        }
        Admission::FailOpen => next.run(req).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{CounterStoreError, MemoryCounterStore, WindowDecision};
    use async_trait::async_trait;

    struct BrokenStore;

    #[async_trait]
    impl CounterStore for BrokenStore {
        async fn admit(&self, _request: WindowRequest<'_>) -> Result<WindowDecision, CounterStoreError> {
            Err(CounterStoreError::Unavailable("connection refused".into()))
        }

        async fn ping(&self) -> Result<(), CounterStoreError> {
            Err(CounterStoreError::Unavailable("connection refused".into()))
        }
    }

    fn limiter() -> SlidingWindowLimiter {
        SlidingWindowLimiter::new(Arc::new(MemoryCounterStore::new()))
    }

    #[tokio::test]
    async fn test_n_plus_one_is_rejected() {
        let limiter = limiter();
        let tenant = Uuid::new_v4();
        let t0 = 1_000_000;

        for i in 0..100 {
            match limiter.check_at(tenant, "u", 100, 3600, t0 + i).await {
                Admission::Admitted(q) => assert_eq!(q.remaining, 99 - i as u64),
                other => panic!("request {i} not admitted: {other:?}"),
            }
        }

        let rejected = limiter.check_at(tenant, "u", 100, 3600, t0 + 100).await;
        assert_eq!(
            rejected,
            Admission::Rejected {
                limit: 100,
                window_secs: 3600,
                reset: (t0 + 3_600_000 + 999) / 1000,
            }
        );
    }

    #[tokio::test]
    async fn test_capacity_frees_as_oldest_ages_out() {
        let limiter = limiter();
        let tenant = Uuid::new_v4();

        assert!(matches!(limiter.check_at(tenant, "u", 2, 10, 0).await, Admission::Admitted(_)));
        assert!(matches!(limiter.check_at(tenant, "u", 2, 10, 5_000).await, Admission::Admitted(_)));
        assert!(matches!(limiter.check_at(tenant, "u", 2, 10, 9_999).await, Admission::Rejected { .. }));

        // The t=0 entry leaves the window at t=10s, freeing exactly one slot.
        assert!(matches!(limiter.check_at(tenant, "u", 2, 10, 10_000).await, Admission::Admitted(_)));
        assert!(matches!(limiter.check_at(tenant, "u", 2, 10, 10_001).await, Admission::Rejected { .. }));
    }

    #[tokio::test]
    async fn test_tenants_have_separate_windows() {
        let limiter = limiter();
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());

        assert!(matches!(limiter.check_at(a, "u", 1, 60, 0).await, Admission::Admitted(_)));
        assert!(matches!(limiter.check_at(a, "u", 1, 60, 1).await, Admission::Rejected { .. }));
        assert!(matches!(limiter.check_at(b, "u", 1, 60, 1).await, Admission::Admitted(_)));
    }

    #[tokio::test]
    async fn test_store_failure_fails_open() {
        let limiter = SlidingWindowLimiter::new(Arc::new(BrokenStore));
        assert_eq!(
            limiter.check_at(Uuid::new_v4(), "u", 1, 60, 0).await,
            Admission::FailOpen
        );
    }

    #[test]
    fn test_headers_applied() {
        let mut headers = HeaderMap::new();
        QuotaHeaders {
            limit: 100,
            remaining: 42,
            reset: 1_700_000_000,
        }
        .apply(&mut headers);
        assert_eq!(headers[LIMIT_HEADER], "100");
        assert_eq!(headers[REMAINING_HEADER], "42");
        assert_eq!(headers[RESET_HEADER], "1700000000");
    }
}
