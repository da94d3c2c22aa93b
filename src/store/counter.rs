//! Shared counter store backing the sliding-window rate limiter.
//!
//! A window is a time-ordered set of `(timestamp:subject) -> timestamp`
//! entries under the key `rate_limit:<tenant_id>`, with a TTL equal to the
//! window length. `admit` runs prune → count → compare → insert → expire as a
//! single atomic step per key.

use std::collections::BTreeMap;

use async_trait::async_trait;
use dashmap::DashMap;
use thiserror::Error;
use uuid::Uuid;

/// Key prefix for per-tenant windows.
pub const KEY_PREFIX: &str = "rate_limit:";

/// Window key for a tenant.
pub fn window_key(tenant_id: Uuid) -> String {
    format!("{KEY_PREFIX}{tenant_id}")
}

/// One admission attempt against a window.
#[derive(Debug, Clone, Copy)]
pub struct WindowRequest<'a> {
    pub key: &'a str,
    pub subject: &'a str,
    pub now_ms: i64,
    pub window_ms: i64,
    pub limit: u64,
}

/// Outcome of an admission attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowDecision {
    pub admitted: bool,
    /// Entries inside the window before this request was considered.
    pub count: u64,
    /// Timestamp of the oldest entry still inside the window, if any.
    pub oldest_ms: Option<i64>,
}

#[derive(Debug, Clone, Error)]
pub enum CounterStoreError {
    #[error("counter store unavailable: {0}")]
    Unavailable(String),
}

#[async_trait]
pub trait CounterStore: Send + Sync {
    /// Atomically prune, count, and (if under `limit`) record one entry.
    async fn admit(&self, request: WindowRequest<'_>) -> Result<WindowDecision, CounterStoreError>;

    /// Liveness probe used by the health endpoint.
    async fn ping(&self) -> Result<(), CounterStoreError>;

    /// Drop windows whose TTL has passed. Returns how many were dropped.
    async fn purge_expired(&self, _now_ms: i64) -> Result<usize, CounterStoreError> {
        Ok(0)
    }
}

#[derive(Debug, Default)]
struct SlidingLog {
    /// (timestamp_ms, sequence) -> member "timestamp:subject".
    entries: BTreeMap<(i64, u64), String>,
    next_seq: u64,
    expires_at_ms: i64,
}

/// In-process counter store. Each key's entry lock serializes its window.
#[derive(Debug, Default)]
pub struct MemoryCounterStore {
    windows: DashMap<String, SlidingLog>,
}

impl MemoryCounterStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Live entries under `key`, without pruning.
    pub fn len(&self, key: &str) -> usize {
        self.windows.get(key).map_or(0, |log| log.entries.len())
    }

    pub fn is_empty(&self, key: &str) -> bool {
        self.len(key) == 0
    }
}

#[async_trait]
impl CounterStore for MemoryCounterStore {
    async fn admit(&self, request: WindowRequest<'_>) -> Result<WindowDecision, CounterStoreError> {
        let mut log = self.windows.entry(request.key.to_string()).or_default();

        if log.expires_at_ms <= request.now_ms {
            log.entries.clear();
        }

        let cutoff = request.now_ms - request.window_ms;
        let kept = log.entries.split_off(&(cutoff.saturating_add(1), 0));
        log.entries = kept;

        let count = log.entries.len() as u64;
        let admitted = count < request.limit;

        if admitted {
            let seq = log.next_seq;
            log.next_seq = log.next_seq.wrapping_add(1);
            log.entries.insert(
                (request.now_ms, seq),
                format!("{}:{}", request.now_ms, request.subject),
            );
            log.expires_at_ms = request.now_ms + request.window_ms;
        }

        let oldest_ms = log.entries.keys().next().map(|(ts, _)| *ts);

        Ok(WindowDecision {
            admitted,
            count,
            oldest_ms,
        })
    }

    async fn ping(&self) -> Result<(), CounterStoreError> {
        Ok(())
    }

    async fn purge_expired(&self, now_ms: i64) -> Result<usize, CounterStoreError> {
        let before = self.windows.len();
        self.windows.retain(|_, log| log.expires_at_ms > now_ms);
        Ok(before - self.windows.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn req(key: &str, now_ms: i64, limit: u64) -> WindowRequest<'_> {
        WindowRequest {
            key,
            subject: "user-1",
            now_ms,
            window_ms: 1_000,
            limit,
        }
    }

    #[tokio::test]
    async fn test_admits_up_to_limit() {
        let store = MemoryCounterStore::new();
        for i in 0..3 {
            let d = store.admit(req("k", 100 + i, 3)).await.unwrap();
            assert!(d.admitted);
            assert_eq!(d.count, i as u64);
        }
        let d = store.admit(req("k", 110, 3)).await.unwrap();
        assert!(!d.admitted);
        assert_eq!(d.count, 3);
        assert_eq!(d.oldest_ms, Some(100));
        assert_eq!(store.len("k"), 3);
    }

    #[tokio::test]
    async fn test_same_millisecond_entries_are_distinct() {
        let store = MemoryCounterStore::new();
        for _ in 0..5 {
            store.admit(req("k", 500, 10)).await.unwrap();
        }
        assert_eq!(store.len("k"), 5);
    }

    #[tokio::test]
    async fn test_old_entries_age_out() {
        let store = MemoryCounterStore::new();
        store.admit(req("k", 0, 2)).await.unwrap();
        store.admit(req("k", 400, 2)).await.unwrap();
        assert!(!store.admit(req("k", 999, 2)).await.unwrap().admitted);

        // First entry is exactly one window old at t=1000.
        let d = store.admit(req("k", 1_000, 2)).await.unwrap();
        assert!(d.admitted);
        assert_eq!(d.count, 1);
        assert_eq!(d.oldest_ms, Some(400));
    }

    #[tokio::test]
    async fn test_keys_are_independent() {
        let store = MemoryCounterStore::new();
        store.admit(req("a", 0, 1)).await.unwrap();
        assert!(!store.admit(req("a", 1, 1)).await.unwrap().admitted);
        assert!(store.admit(req("b", 1, 1)).await.unwrap().admitted);
    }

    #[tokio::test]
    async fn test_purge_drops_idle_windows() {
        let store = MemoryCounterStore::new();
        store.admit(req("idle", 0, 5)).await.unwrap();
        store.admit(req("busy", 900, 5)).await.unwrap();

        assert_eq!(store.purge_expired(1_000).await.unwrap(), 1);
        assert!(store.is_empty("idle"));
        assert_eq!(store.len("busy"), 1);
    }

    #[tokio::test]
    async fn test_concurrent_admissions_never_exceed_limit() {
        let store = Arc::new(MemoryCounterStore::new());
        let mut handles = Vec::new();
        for _ in 0..50 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store
                    .admit(WindowRequest {
                        key: "shared",
                        subject: "s",
                        now_ms: 10,
                        window_ms: 60_000,
                        limit: 20,
                    })
                    .await
                    .unwrap()
                    .admitted
            }));
        }

        let mut admitted = 0;
        for h in handles {
            if h.await.unwrap() {
                admitted += 1;
            }
        }
        assert_eq!(admitted, 20);
        assert_eq!(store.len("shared"), 20);
    }
}
