//! Startup orchestration.
//!
//! Builds the collaborators in dependency order: persistence and counter
//! store, payment provider, task worker, scheduler, then application state.
//! Any failure is fatal.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::task::JoinHandle;

use crate::auth::TokenError;
use crate::billing::{PaymentProvider, ProviderError, StripeClient};
use crate::config::PlatformConfig;
use crate::http::AppState;
use crate::lifecycle::shutdown::Shutdown;
use crate::store::{CounterStore, MemoryCounterStore, MemoryPersistence, Persistence};
use crate::tasks::{queue::DEFAULT_CAPACITY, Scheduler, TaskQueue};

/// Interval between sweeps of idle rate windows.
pub const COUNTER_SWEEP_INTERVAL: Duration = Duration::from_secs(300);

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("token codec: {0}")]
    Token(#[from] TokenError),

    #[error("payment provider: {0}")]
    Provider(#[from] ProviderError),
}

/// Running platform services.
pub struct Platform {
    pub state: AppState,
    pub worker: JoinHandle<()>,
    pub scheduler: JoinHandle<()>,
}

/// Collaborators that can be swapped out, mainly for tests.
pub struct Backends {
    pub persistence: Arc<dyn Persistence>,
    pub counters: Arc<dyn CounterStore>,
    pub payments: Arc<dyn PaymentProvider>,
}

impl Backends {
    /// In-process stores and the HTTP payment client.
    pub fn from_config(config: &PlatformConfig) -> Result<Self, StartupError> {
        let payments = StripeClient::new(&config.billing, Duration::from_secs(config.timeouts.provider_secs))?;
        Ok(Self {
            persistence: Arc::new(MemoryPersistence::new()),
            counters: Arc::new(MemoryCounterStore::new()),
            payments: Arc::new(payments),
        })
    }
}

/// Start background workers and assemble application state.
pub fn bootstrap(config: PlatformConfig, backends: Backends, shutdown: &Shutdown) -> Result<Platform, StartupError> {
    let (tasks, worker) = TaskQueue::start(backends.persistence.clone(), DEFAULT_CAPACITY, shutdown.subscribe());

    let scheduler = Scheduler::new(
        tasks.clone(),
        backends.counters.clone(),
        config.audit.retention_days,
        Duration::from_secs(config.audit.prune_interval_secs),
        COUNTER_SWEEP_INTERVAL,
    );
    let scheduler = tokio::spawn(scheduler.run(shutdown.subscribe()));

    let state = AppState::new(config, backends.persistence, backends.counters, backends.payments, tasks)?;

    tracing::info!("Platform services initialized");
    Ok(Platform {
        state,
        worker,
        scheduler,
    })
}
