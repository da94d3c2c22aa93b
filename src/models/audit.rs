//! Append-only audit records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A persisted audit record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditRecord {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub user_id: Option<Uuid>,
    pub action: String,
    pub resource_type: String,
    pub resource_id: Option<String>,
    pub details: serde_json::Value,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub timestamp: DateTime<Utc>,
}

/// Insert payload. Carries no tenant id: the writing session stamps its own.
#[derive(Debug, Clone)]
pub struct NewAuditRecord {
    pub user_id: Option<Uuid>,
    pub action: String,
    pub resource_type: String,
    pub resource_id: Option<String>,
    pub details: serde_json::Value,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl NewAuditRecord {
    pub fn into_record(self, organization_id: Uuid) -> AuditRecord {
        AuditRecord {
            id: Uuid::new_v4(),
            organization_id,
            user_id: self.user_id,
            action: self.action,
            resource_type: self.resource_type,
            resource_id: self.resource_id,
            details: self.details,
            ip_address: self.ip_address,
            user_agent: self.user_agent,
            timestamp: self.timestamp,
        }
    }
}

/// Filters for listing audit records, newest first.
#[derive(Debug, Clone)]
pub struct AuditQuery {
    pub action: Option<String>,
    pub resource_type: Option<String>,
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
    pub limit: usize,
    pub offset: usize,
}

impl Default for AuditQuery {
    fn default() -> Self {
        Self {
            action: None,
            resource_type: None,
            start: None,
            end: None,
            limit: 100,
            offset: 0,
        }
    }
}

impl AuditQuery {
    pub fn matches(&self, record: &AuditRecord) -> bool {
        self.action.as_deref().map_or(true, |a| record.action == a)
            && self
                .resource_type
                .as_deref()
                .map_or(true, |r| record.resource_type == r)
            && self.start.map_or(true, |s| record.timestamp >= s)
            && self.end.map_or(true, |e| record.timestamp <= e)
    }
}
