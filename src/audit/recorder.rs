//! Audit recording middleware.
//!
//! Outermost tenant-aware stage. Installs a [`RequestAttributes`] slot,
//! lets the inner stages and handler run, then spawns the write for
//! mutating requests that resolved a tenant. The response is returned
//! without waiting for the write.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{header::USER_AGENT, HeaderMap, Method, Request},
    middleware::Next,
    response::Response,
};
use chrono::{DateTime, Utc};
use serde_json::json;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::http::paths;
use crate::http::server::AppState;
use crate::models::NewAuditRecord;
use crate::observability::metrics;
use crate::store::{Persistence, Session, StoreError};
use crate::tenant::{RequestAttributes, TenantContext};

/// Verb recorded for a request method.
pub fn action_for(method: &Method) -> String {
    match *method {
        Method::POST => "create".to_string(),
        Method::PUT | Method::PATCH => "update".to_string(),
        Method::DELETE => "delete".to_string(),
        ref other => other.as_str().to_lowercase(),
    }
}

/// `(resource_type, resource_id)` from `/api/v1/<type>/<id>/...`.
pub fn resource_of(path: &str) -> (String, Option<String>) {
    let segments: Vec<&str> = path.split('/').collect();
    let resource_type = segments
        .get(3)
        .filter(|s| !s.is_empty())
        .map_or_else(|| "unknown".to_string(), |s| s.to_string());
    let resource_id = segments
        .get(4)
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string());
    (resource_type, resource_id)
}

/// What the recorder observed about one request.
#[derive(Debug, Clone)]
pub struct RequestSummary {
    pub method: Method,
    pub path: String,
    pub status: u16,
    pub elapsed: Duration,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

pub fn build_record(ctx: &TenantContext, summary: &RequestSummary, now: DateTime<Utc>) -> NewAuditRecord {
    let (resource_type, resource_id) = resource_of(&summary.path);
    NewAuditRecord {
        user_id: Some(ctx.subject_id),
        action: action_for(&summary.method),
        resource_type,
        resource_id,
        details: json!({
            "method": summary.method.as_str(),
            "path": summary.path,
            "status_code": summary.status,
            "process_time": (summary.elapsed.as_secs_f64() * 1000.0).round() / 1000.0,
        }),
        ip_address: summary.ip_address.clone(),
        user_agent: summary.user_agent.clone(),
        timestamp: now,
    }
}

/// Write `record` for `tenant_id` on a detached task with its own session.
/// Failures are logged and counted, never retried.
pub fn dispatch(persistence: Arc<dyn Persistence>, tenant_id: Uuid, record: NewAuditRecord) -> JoinHandle<()> {
    tokio::spawn(async move {
        match write(persistence, tenant_id, record).await {
            Ok(()) => metrics::record_audit_write("ok"),
            Err(e) => {
                tracing::error!(tenant_id = %tenant_id, error = %e, "Audit write failed");
                metrics::record_audit_write("error");
            }
        }
    })
}

async fn write(persistence: Arc<dyn Persistence>, tenant_id: Uuid, record: NewAuditRecord) -> Result<(), StoreError> {
    let mut session = Session::open(persistence);
    session.set_tenant_context(tenant_id)?;
    session.insert_audit_record(record).await?;
    Ok(())
}

fn client_address(req: &Request<Body>) -> Option<String> {
    if let Some(forwarded) = forwarded_for(req.headers()) {
        return Some(forwarded);
    }
    req.extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
}

fn forwarded_for(headers: &HeaderMap) -> Option<String> {
    headers
        .get("x-forwarded-for")?
        .to_str()
        .ok()?
        .split(',')
        .next()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

pub async fn record_audit(State(state): State<AppState>, mut req: Request<Body>, next: Next) -> Response {
    if !state.config().features.audit_logs || paths::skips_audit(req.uri().path()) {
        return next.run(req).await;
    }

    let attributes = RequestAttributes::default();
    req.extensions_mut().insert(attributes.clone());

    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let ip_address = client_address(&req);
    let user_agent = req
        .headers()
        .get(USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let start = Instant::now();

    let response = next.run(req).await;

    if method == Method::GET {
        return response;
    }
    let Some(ctx) = attributes.tenant() else {
        return response;
    };

    let summary = RequestSummary {
        method,
        path,
        status: response.status().as_u16(),
        elapsed: start.elapsed(),
        ip_address,
        user_agent,
    };
    let record = build_record(&ctx, &summary, Utc::now());
    dispatch(state.persistence.clone(), ctx.tenant_id, record);

    response
}
