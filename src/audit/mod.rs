//! Audit trail for mutating requests.
//!
//! - recorder.rs: pipeline stage, fire-and-forget writes
//! - retention.rs: scheduled age-based pruning

pub mod recorder;
pub mod retention;

pub use recorder::record_audit;
pub use retention::prune_expired;
