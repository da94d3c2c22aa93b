//! Audit log queries (admin only).

use axum::Json;
use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::api::extract::{ApiQuery, AuthContext, TenantSession};
use crate::auth::{require_role, Role};
use crate::error::ApiError;
use crate::models::{AuditQuery, AuditRecord};

pub const MAX_LIMIT: usize = 1000;

#[derive(Debug, Default, Deserialize)]
pub struct AuditLogParams {
    pub action: Option<String>,
    pub resource_type: Option<String>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

impl AuditLogParams {
    pub fn into_query(self) -> Result<AuditQuery, ApiError> {
        let defaults = AuditQuery::default();
        let limit = self.limit.unwrap_or(defaults.limit);
        if !(1..=MAX_LIMIT).contains(&limit) {
            return Err(ApiError::Validation(format!("limit must be between 1 and {MAX_LIMIT}")));
        }
        Ok(AuditQuery {
            action: self.action,
            resource_type: self.resource_type,
            start: self.start_date,
            end: self.end_date,
            limit,
            offset: self.offset.unwrap_or(defaults.offset),
        })
    }
}

pub async fn list(
    AuthContext(ctx): AuthContext,
    TenantSession(session): TenantSession,
    ApiQuery(params): ApiQuery<AuditLogParams>,
) -> Result<Json<Vec<AuditRecord>>, ApiError> {
    require_role(&ctx, Role::Admin)?;
    let records = session.audit_records(params.into_query()?).await?;
    Ok(Json(records))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_limit_bounds() {
        assert_eq!(AuditLogParams::default().into_query().unwrap().limit, 100);
        let zero = AuditLogParams {
            limit: Some(0),
            ..Default::default()
        };
        assert!(zero.into_query().is_err());
        let too_many = AuditLogParams {
            limit: Some(1001),
            ..Default::default()
        };
        assert!(too_many.into_query().is_err());
    }
}
