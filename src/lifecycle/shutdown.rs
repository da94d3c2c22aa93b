//! Shutdown coordination.

use std::future::Future;
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::task::JoinHandle;

/// How long background workers get to finish after the server stops.
pub const DRAIN_TIMEOUT: Duration = Duration::from_secs(10);

/// Broadcasts a single shutdown notice to the server, the task worker and
/// the scheduler.
#[derive(Clone)]
pub struct Shutdown {
    tx: broadcast::Sender<()>,
}

impl Shutdown {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(1);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.tx.subscribe()
    }

    pub fn trigger(&self) {
        let _ = self.tx.send(());
    }

    /// Resolves once [`trigger`](Self::trigger) is called. Subscribes
    /// eagerly, so a trigger after this call is never missed.
    pub fn signalled(&self) -> impl Future<Output = ()> + Send + 'static {
        let mut rx = self.tx.subscribe();
        async move {
            let _ = rx.recv().await;
        }
    }

    pub fn receiver_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

/// Wait for `task` up to `timeout`; abandon it after that.
pub async fn drain(name: &'static str, task: JoinHandle<()>, timeout: Duration) {
    match tokio::time::timeout(timeout, task).await {
        Ok(Ok(())) => tracing::debug!(task = name, "Task drained"),
        Ok(Err(e)) => tracing::error!(task = name, error = %e, "Task panicked during shutdown"),
        Err(_) => tracing::warn!(task = name, "Task did not stop before the drain deadline"),
    }
}
