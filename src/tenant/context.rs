//! Request-scoped tenant identity.

use std::sync::Arc;

use parking_lot::Mutex;
use uuid::Uuid;

use crate::auth::{Claims, Role};
use crate::error::ApiError;

/// Identity of the caller for the current request, derived from a validated
/// access token. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TenantContext {
    pub tenant_id: Uuid,
    pub subject_id: Uuid,
    pub email: String,
    pub role: Role,
}

impl From<&Claims> for TenantContext {
    fn from(claims: &Claims) -> Self {
        Self {
            tenant_id: claims.organization_id,
            subject_id: claims.sub,
            email: claims.email.clone(),
            role: claims.role,
        }
    }
}

/// Shared slot the audit stage installs before the resolver runs, so it can
/// read the resolved context after the handler returns.
#[derive(Debug, Clone, Default)]
pub struct RequestAttributes {
    tenant: Arc<Mutex<Option<TenantContext>>>,
}

impl RequestAttributes {
    pub fn tenant(&self) -> Option<TenantContext> {
        self.tenant.lock().clone()
    }

    pub(crate) fn set_tenant(&self, ctx: TenantContext) {
        *self.tenant.lock() = Some(ctx);
    }
}

/// Left in request extensions when a bearer token was presented but rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialRejection {
    Expired,
    Invalid,
}

impl From<CredentialRejection> for ApiError {
    fn from(rejection: CredentialRejection) -> Self {
        match rejection {
            CredentialRejection::Expired => ApiError::ExpiredToken,
            CredentialRejection::Invalid => ApiError::InvalidToken,
        }
    }
}
