//! Periodic jobs: daily audit retention and counter-store sweeping.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::broadcast;
use tokio::time::{interval, interval_at, Instant, MissedTickBehavior};

use crate::store::CounterStore;
use crate::tasks::queue::{Job, TaskQueue};

pub struct Scheduler {
    queue: TaskQueue,
    counters: Arc<dyn CounterStore>,
    retention_days: i64,
    prune_interval: Duration,
    sweep_interval: Duration,
}

impl Scheduler {
    pub fn new(
        queue: TaskQueue,
        counters: Arc<dyn CounterStore>,
        retention_days: i64,
        prune_interval: Duration,
        sweep_interval: Duration,
    ) -> Self {
        Self {
            queue,
            counters,
            retention_days,
            prune_interval,
            sweep_interval,
        }
    }

    /// Run until shutdown. Retention runs once at startup, then every
    /// `prune_interval`; the first sweep waits one full interval.
    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        let mut prune = interval(self.prune_interval);
        let mut sweep = interval_at(Instant::now() + self.sweep_interval, self.sweep_interval);
        prune.set_missed_tick_behavior(MissedTickBehavior::Delay);
        sweep.set_missed_tick_behavior(MissedTickBehavior::Delay);

        tracing::info!(
            prune_interval_secs = self.prune_interval.as_secs(),
            retention_days = self.retention_days,
            "Scheduler started"
        );

        loop {
            tokio::select! {
                _ = prune.tick() => {
                    self.queue.enqueue(Job::PruneAuditRecords { retention_days: self.retention_days });
                }
                _ = sweep.tick() => {
                    match self.counters.purge_expired(Utc::now().timestamp_millis()).await {
                        Ok(0) => {}
                        Ok(dropped) => tracing::debug!(dropped, "Purged idle rate windows"),
                        Err(e) => tracing::warn!(error = %e, "Counter store sweep failed"),
                    }
                }
                _ = shutdown.recv() => break,
            }
        }

        tracing::info!("Scheduler stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lifecycle::Shutdown;
    use crate::models::NewAuditRecord;
    use crate::store::{MemoryCounterStore, MemoryPersistence, Persistence, WindowRequest};
    use uuid::Uuid;

    #[tokio::test]
    async fn test_retention_runs_at_startup() {
        let persistence = Arc::new(MemoryPersistence::new());
        persistence
            .insert_audit_record(
                Uuid::new_v4(),
                NewAuditRecord {
                    user_id: None,
                    action: "create".into(),
                    resource_type: "users".into(),
                    resource_id: None,
                    details: serde_json::json!({}),
                    ip_address: None,
                    user_agent: None,
                    timestamp: Utc::now() - chrono::Duration::days(120),
                },
            )
            .await
            .unwrap();

        let shutdown = Shutdown::new();
        let (queue, _worker) = TaskQueue::start(persistence.clone(), 8, shutdown.subscribe());
        let scheduler = Scheduler::new(
            queue,
            Arc::new(MemoryCounterStore::new()),
            90,
            Duration::from_secs(86_400),
            Duration::from_secs(3600),
        );
        let handle = tokio::spawn(scheduler.run(shutdown.subscribe()));

        let mut pruned = false;
        for _ in 0..100 {
            if persistence.audit_len() == 0 {
                pruned = true;
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert!(pruned, "retention must not wait a full day");

        shutdown.trigger();
        tokio::time::timeout(Duration::from_secs(5), handle).await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_sweep_and_shutdown() {
        let counters = Arc::new(MemoryCounterStore::new());
        counters
            .admit(WindowRequest {
                key: "rate_limit:idle",
                subject: "s",
                now_ms: 0,
                window_ms: 1,
                limit: 10,
            })
            .await
            .unwrap();

        let shutdown = Shutdown::new();
        let (queue, _worker) = TaskQueue::start(Arc::new(MemoryPersistence::new()), 8, shutdown.subscribe());
        let scheduler = Scheduler::new(
            queue,
            counters.clone(),
            90,
            Duration::from_secs(3600),
            Duration::from_millis(20),
        );
        let handle = tokio::spawn(scheduler.run(shutdown.subscribe()));

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(counters.is_empty("rate_limit:idle"));

        shutdown.trigger();
        tokio::time::timeout(Duration::from_secs(5), handle).await.unwrap().unwrap();
    }
}
