//! Subscription tier caching.

use std::sync::Arc;

use dashmap::DashMap;
use uuid::Uuid;

use crate::models::SubscriptionTier;
use crate::store::Persistence;

/// A thread-safe tenant → tier cache consulted by the rate limiter.
///
/// Filled on registration, login and billing webhook events. A miss reads
/// the organization from persistence; a failed read falls back to the free
/// tier and is not cached.
#[derive(Clone, Default)]
pub struct TierCache {
    inner: Arc<DashMap<Uuid, SubscriptionTier>>,
}

impl TierCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, tenant_id: Uuid, tier: SubscriptionTier) {
        self.inner.insert(tenant_id, tier);
    }

    pub fn get(&self, tenant_id: &Uuid) -> Option<SubscriptionTier> {
        self.inner.get(tenant_id).map(|r| *r.value())
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Cached tier, loading from persistence on a miss.
    pub async fn tier_for(&self, persistence: &dyn Persistence, tenant_id: Uuid) -> SubscriptionTier {
        if let Some(tier) = self.get(&tenant_id) {
            return tier;
        }

        match persistence.organization_by_id(tenant_id).await {
            Ok(Some(org)) => {
                self.set(tenant_id, org.subscription_tier);
                org.subscription_tier
            }
            Ok(None) => SubscriptionTier::Free,
            Err(e) => {
                tracing::warn!(tenant_id = %tenant_id, error = %e, "Tier lookup failed, using free tier");
                SubscriptionTier::Free
            }
        }
    }
}
