//! Route handlers.
//!
//! Every protected handler takes [`AuthContext`](extract::AuthContext) and
//! [`TenantSession`](extract::TenantSession); role checks go through
//! [`require_role`](crate::auth::require_role).

pub mod audit_logs;
pub mod auth;
pub mod extract;
pub mod health;
pub mod organizations;
pub mod subscriptions;
pub mod users;

use axum::{
    routing::{get, patch, post},
    Router,
};
use serde::{Deserialize, Serialize};

use crate::http::server::AppState;

pub const API_PREFIX: &str = "/api/v1";

#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// All routes, unlayered and without state.
pub fn routes() -> Router<AppState> {
    let v1 = Router::new()
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/auth/refresh", post(auth::refresh))
        .route(
            "/organizations/me",
            get(organizations::get_current).patch(organizations::update_current),
        )
        .route("/users/me", get(users::me))
        .route("/users", get(users::list).post(users::create))
        .route("/users/{id}", patch(users::update).delete(users::delete))
        .route("/subscriptions/current", get(subscriptions::current))
        .route("/subscriptions/create-checkout", post(subscriptions::create_checkout))
        .route("/subscriptions/webhook", post(subscriptions::webhook))
        .route("/audit-logs", get(audit_logs::list));

    Router::new()
        .route("/", get(health::root))
        .route("/health", get(health::health))
        .nest(API_PREFIX, v1)
}
