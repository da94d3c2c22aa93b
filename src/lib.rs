//! Multi-tenant SaaS platform backend.
//!
//! Every request passes through a tenant-isolation pipeline before it
//! reaches a handler:
//!
//! ```text
//!     Client Request
//!         │
//!         ▼
//!   ┌───────────┐   ┌────────────┐   ┌─────────────────┐   ┌──────────────┐   ┌─────────┐
//!   │   CORS    │──▶│   audit    │──▶│ tenant resolver │──▶│ rate limiter │──▶│ handler │
//!   └───────────┘   │  recorder  │   │  (token codec)  │   │ (sliding log)│   └────┬────┘
//!                   └─────┬──────┘   └─────────────────┘   └──────────────┘        │
//!                         │ after response: fire-and-forget write                  │
//!                         ▼                                                        ▼
//!                   persistence ◀──────────── tenant-bound Session ◀───────────────┘
//! ```
//!
//! Cross-cutting: config (TOML + hot reload), observability (tracing,
//! Prometheus), lifecycle (startup, signals, drain), tasks (queue and
//! scheduler), billing (checkout, webhooks, tier cache).

pub mod api;
pub mod audit;
pub mod auth;
pub mod billing;
pub mod config;
pub mod error;
pub mod http;
pub mod lifecycle;
pub mod models;
pub mod observability;
pub mod security;
pub mod store;
pub mod tasks;
pub mod tenant;

pub use config::schema::PlatformConfig;
pub use error::ApiError;
pub use http::{AppState, HttpServer};
pub use lifecycle::Shutdown;
