//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Load config → Build stores and provider → Start worker and scheduler
//!     → AppState → Bind listener
//!
//! Shutdown (shutdown.rs):
//!     Signal received → Stop accepting → Drain requests
//!     → Stop worker and scheduler (bounded wait) → Exit
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Trigger graceful shutdown
//! ```
//!
//! Config reload is driven by the file watcher, not by SIGHUP.

pub mod shutdown;
pub mod signals;
pub mod startup;

pub use shutdown::{drain, Shutdown, DRAIN_TIMEOUT};
pub use signals::spawn_signal_handler;
pub use startup::{bootstrap, Backends, Platform, StartupError};
