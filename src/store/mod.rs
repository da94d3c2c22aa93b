//! Storage collaborators.
//!
//! # Data Flow
//! ```text
//! handler
//!     → Session (tenant variable set once per request)
//!     → Persistence (row filtering by tenant id)
//!
//! rate limiter
//!     → CounterStore::admit (atomic prune/count/insert/expire per tenant key)
//! ```
//!
//! # Design Decisions
//! - Both collaborators are traits so an external database or counter
//!   service can replace the in-process implementations
//! - Handles are created once at startup and shared via Arc

pub mod counter;
pub mod memory;
pub mod persistence;
pub mod session;

pub use counter::{CounterStore, CounterStoreError, MemoryCounterStore, WindowDecision, WindowRequest};
pub use memory::MemoryPersistence;
pub use persistence::{Persistence, StoreError, StoreResult};
pub use session::Session;
