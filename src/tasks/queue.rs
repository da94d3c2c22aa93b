//! Deferred job queue.
//!
//! A bounded channel feeding a single worker task. Enqueueing never blocks a
//! request: a full queue drops the job with a warning.

use std::sync::Arc;

use chrono::Utc;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;

use crate::audit::retention;
use crate::models::SubscriptionTier;
use crate::observability::metrics;
use crate::store::{Persistence, StoreError};

/// Default channel capacity.
pub const DEFAULT_CAPACITY: usize = 1024;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Job {
    WelcomeNotification {
        email: String,
        organization_name: String,
    },
    SubscriptionConfirmation {
        email: String,
        tier: SubscriptionTier,
    },
    InvoiceNotification {
        email: String,
        invoice_url: String,
    },
    PruneAuditRecords {
        retention_days: i64,
    },
}

impl Job {
    pub fn name(&self) -> &'static str {
        match self {
            Job::WelcomeNotification { .. } => "welcome_notification",
            Job::SubscriptionConfirmation { .. } => "subscription_confirmation",
            Job::InvoiceNotification { .. } => "invoice_notification",
            Job::PruneAuditRecords { .. } => "prune_audit_records",
        }
    }
}

/// Cloneable handle for submitting jobs.
#[derive(Clone)]
pub struct TaskQueue {
    tx: mpsc::Sender<Job>,
}

impl TaskQueue {
    /// Spawn the worker and return a handle to it. The worker exits on
    /// shutdown or once every handle is dropped.
    pub fn start(
        persistence: Arc<dyn Persistence>,
        capacity: usize,
        shutdown: broadcast::Receiver<()>,
    ) -> (Self, JoinHandle<()>) {
        let (tx, rx) = mpsc::channel(capacity);
        let worker = Worker { persistence };
        let handle = tokio::spawn(worker.run(rx, shutdown));
        (Self { tx }, handle)
    }

    /// Submit a job. Returns false if it was dropped.
    pub fn enqueue(&self, job: Job) -> bool {
        let name = job.name();
        match self.tx.try_send(job) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                tracing::warn!(job = name, "Task queue full, dropping job");
                metrics::record_job(name, "dropped");
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                tracing::warn!(job = name, "Task queue closed, dropping job");
                metrics::record_job(name, "dropped");
                false
            }
        }
    }
}

struct Worker {
    persistence: Arc<dyn Persistence>,
}

impl Worker {
    async fn run(self, mut rx: mpsc::Receiver<Job>, mut shutdown: broadcast::Receiver<()>) {
        tracing::info!("Task worker started");
        loop {
            tokio::select! {
                job = rx.recv() => match job {
                    Some(job) => self.execute(job).await,
                    None => break,
                },
                _ = shutdown.recv() => break,
            }
        }
        tracing::info!("Task worker stopped");
    }

    async fn execute(&self, job: Job) {
        let name = job.name();
        match self.handle(job).await {
            Ok(()) => metrics::record_job(name, "ok"),
            Err(e) => {
                tracing::error!(job = name, error = %e, "Job failed");
                metrics::record_job(name, "error");
            }
        }
    }

    async fn handle(&self, job: Job) -> Result<(), StoreError> {
        match job {
            Job::WelcomeNotification {
                email,
                organization_name,
            } => {
                tracing::info!(email = %email, organization = %organization_name, "Dispatching welcome notification");
            }
            Job::SubscriptionConfirmation { email, tier } => {
                tracing::info!(email = %email, tier = tier.as_str(), "Dispatching subscription confirmation");
            }
            Job::InvoiceNotification { email, invoice_url } => {
                tracing::info!(email = %email, invoice_url = %invoice_url, "Dispatching invoice notification");
            }
            Job::PruneAuditRecords { retention_days } => {
                retention::prune_expired(self.persistence.as_ref(), retention_days, Utc::now()).await?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lifecycle::Shutdown;
    use crate::models::NewAuditRecord;
    use crate::store::MemoryPersistence;
    use std::time::Duration;
    use uuid::Uuid;

    #[tokio::test]
    async fn test_prune_job_runs() {
        let store = Arc::new(MemoryPersistence::new());
        store
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
        let (queue, worker) = TaskQueue::start(store.clone(), 8, shutdown.subscribe());
        assert!(queue.enqueue(Job::PruneAuditRecords { retention_days: 90 }));
        drop(queue);

        tokio::time::timeout(Duration::from_secs(5), worker).await.unwrap().unwrap();
        assert_eq!(store.audit_len(), 0);
    }

    #[tokio::test]
    async fn test_worker_stops_on_shutdown() {
        let shutdown = Shutdown::new();
        let (queue, worker) = TaskQueue::start(Arc::new(MemoryPersistence::new()), 8, shutdown.subscribe());

        shutdown.trigger();
        tokio::time::timeout(Duration::from_secs(5), worker).await.unwrap().unwrap();
        assert!(!queue.enqueue(Job::WelcomeNotification {
            email: "a@acme.io".into(),
            organization_name: "Acme".into(),
        }));
    }
}
