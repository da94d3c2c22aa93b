//! Liveness and service banner.

use axum::{extract::State, Json};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::http::server::AppState;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

impl HealthStatus {
    /// Persistence is required; the counter store only degrades service
    /// since the limiter fails open.
    pub fn from_checks(database_ok: bool, counter_store_ok: bool) -> Self {
        match (database_ok, counter_store_ok) {
            (false, _) => HealthStatus::Unhealthy,
            (true, false) => HealthStatus::Degraded,
            (true, true) => HealthStatus::Healthy,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthReport {
    pub status: HealthStatus,
    pub version: String,
    pub timestamp: DateTime<Utc>,
    pub database: String,
    pub counter_store: String,
}

fn describe(ok: bool) -> String {
    if ok { "healthy" } else { "unhealthy" }.to_string()
}

pub async fn health(State(state): State<AppState>) -> Json<HealthReport> {
    let database_ok = match state.persistence.ping().await {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!(error = %e, "Health check: persistence unavailable");
            false
        }
    };
    let counter_store_ok = match state.limiter.store().ping().await {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!(error = %e, "Health check: counter store unavailable");
            false
        }
    };

    Json(HealthReport {
        status: HealthStatus::from_checks(database_ok, counter_store_ok),
        version: VERSION.to_string(),
        timestamp: Utc::now(),
        database: describe(database_ok),
        counter_store: describe(counter_store_ok),
    })
}

pub async fn root() -> Json<Value> {
    Json(json!({
        "message": "Multi-tenant SaaS platform API",
        "version": VERSION,
        "health": "/health",
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_rules() {
        assert_eq!(HealthStatus::from_checks(true, true), HealthStatus::Healthy);
        assert_eq!(HealthStatus::from_checks(true, false), HealthStatus::Degraded);
        assert_eq!(HealthStatus::from_checks(false, true), HealthStatus::Unhealthy);
    }
}
