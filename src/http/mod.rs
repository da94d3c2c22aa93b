//! HTTP serving subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (request id, trace span, body limit, timeout, metrics)
//!     → pipeline.rs (CORS → audit → tenant resolver → rate limiter)
//!     → api handlers
//! ```
//!
//! paths.rs holds the exemption lists each stage consults.

pub mod paths;
pub mod pipeline;
pub mod server;

pub use pipeline::{Stage, STAGES};
pub use server::{AppState, HttpServer, X_REQUEST_ID};
