//! The caller's own organization.

use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::api::extract::{ApiJson, AuthContext, TenantSession};
use crate::auth::{require_role, Role};
use crate::error::ApiError;
use crate::models::{Organization, OrganizationUpdate, SubscriptionTier};

#[derive(Debug, Serialize, Deserialize)]
pub struct OrganizationView {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub subscription_tier: SubscriptionTier,
    pub subscription_status: Option<String>,
    pub created_at: DateTime<Utc>,
    pub is_active: bool,
}

impl From<Organization> for OrganizationView {
    fn from(org: Organization) -> Self {
        Self {
            id: org.id,
            name: org.name,
            slug: org.slug,
            subscription_tier: org.subscription_tier,
            subscription_status: org.subscription_status,
            created_at: org.created_at,
            is_active: org.is_active,
        }
    }
}

pub async fn get_current(TenantSession(session): TenantSession) -> Result<Json<OrganizationView>, ApiError> {
    Ok(Json(session.organization().await?.into()))
}

pub async fn update_current(
    AuthContext(ctx): AuthContext,
    TenantSession(session): TenantSession,
    ApiJson(update): ApiJson<OrganizationUpdate>,
) -> Result<Json<OrganizationView>, ApiError> {
    require_role(&ctx, Role::Admin)?;

    if let Some(name) = &update.name {
        if name.trim().is_empty() || name.len() > 255 {
            return Err(ApiError::Validation("Organization name must be 1-255 characters".into()));
        }
    }

    let organization = session.update_organization(update).await?;
    tracing::info!(organization_id = %organization.id, "Organization updated");
    Ok(Json(organization.into()))
}
