//! Tenant-bound persistence sessions.
//!
//! A `Session` carries a session-level tenant variable, set once per request.
//! Every tenant-scoped call passes that id and nothing else, so a handler
//! holding a session for tenant A has no way to name tenant B's rows.

use std::sync::Arc;

use uuid::Uuid;

use crate::models::{
    AuditQuery, AuditRecord, NewAuditRecord, NewUser, Organization, OrganizationUpdate, User,
    UserUpdate,
};
use crate::store::persistence::{Persistence, StoreError, StoreResult};

pub struct Session {
    backend: Arc<dyn Persistence>,
    tenant_id: Option<Uuid>,
}

impl Session {
    /// Open an unbound session.
    pub fn open(backend: Arc<dyn Persistence>) -> Self {
        Self {
            backend,
            tenant_id: None,
        }
    }

    /// Bind the session to a tenant. Rebinding to the same tenant is a no-op;
    /// rebinding to another tenant fails.
    pub fn set_tenant_context(&mut self, tenant_id: Uuid) -> StoreResult<()> {
        match self.tenant_id {
            Some(current) if current != tenant_id => Err(StoreError::TenantContextConflict),
            _ => {
                self.tenant_id = Some(tenant_id);
                Ok(())
            }
        }
    }

    pub fn tenant_id(&self) -> Option<Uuid> {
        self.tenant_id
    }

    fn tenant(&self) -> StoreResult<Uuid> {
        self.tenant_id.ok_or(StoreError::TenantContextMissing)
    }

    pub async fn organization(&self) -> StoreResult<Organization> {
        self.backend.tenant_organization(self.tenant()?).await
    }

    pub async fn update_organization(&self, update: OrganizationUpdate) -> StoreResult<Organization> {
        self.backend.update_organization(self.tenant()?, update).await
    }

    pub async fn list_users(&self) -> StoreResult<Vec<User>> {
        self.backend.list_users(self.tenant()?).await
    }

    pub async fn get_user(&self, user_id: Uuid) -> StoreResult<User> {
        self.backend.get_user(self.tenant()?, user_id).await
    }

    pub async fn create_user(&self, user: NewUser) -> StoreResult<User> {
        self.backend.create_user(self.tenant()?, user).await
    }

    pub async fn update_user(&self, user_id: Uuid, update: UserUpdate) -> StoreResult<User> {
        self.backend.update_user(self.tenant()?, user_id, update).await
    }

    pub async fn delete_user(&self, user_id: Uuid) -> StoreResult<()> {
        self.backend.delete_user(self.tenant()?, user_id).await
    }

    pub async fn insert_audit_record(&self, record: NewAuditRecord) -> StoreResult<AuditRecord> {
        self.backend.insert_audit_record(self.tenant()?, record).await
    }

    pub async fn audit_records(&self, query: AuditQuery) -> StoreResult<Vec<AuditRecord>> {
        self.backend.query_audit_records(self.tenant()?, query).await
    }
}
