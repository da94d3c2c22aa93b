//! Age-based audit retention. The only deletion path for audit records.

use chrono::{DateTime, Duration, Utc};

use crate::observability::metrics;
use crate::store::{Persistence, StoreError};

/// Oldest timestamp kept when retaining `retention_days` days.
pub fn cutoff(now: DateTime<Utc>, retention_days: i64) -> DateTime<Utc> {
    now - Duration::days(retention_days)
}

/// Delete records older than the retention window, across all tenants.
pub async fn prune_expired(
    persistence: &dyn Persistence,
    retention_days: i64,
    now: DateTime<Utc>,
) -> Result<u64, StoreError> {
    let cutoff = cutoff(now, retention_days);
    let deleted = persistence.prune_audit_records(cutoff).await?;
    metrics::record_audit_pruned(deleted);
    tracing::info!(deleted, cutoff = %cutoff, "Pruned audit records");
    Ok(deleted)
}
