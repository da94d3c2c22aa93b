//! Background work.
//!
//! # Data Flow
//! ```text
//! handlers / webhook ──enqueue──▶ queue.rs (bounded channel) ──▶ worker
//! scheduler.rs ──daily──▶ PruneAuditRecords job
//!              ──periodic──▶ CounterStore::purge_expired
//! ```

pub mod queue;
pub mod scheduler;

pub use queue::{Job, TaskQueue};
pub use scheduler::Scheduler;
