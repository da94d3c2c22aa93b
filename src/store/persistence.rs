//! Persistence boundary.
//!
//! System-scope operations run before a tenant is known (registration,
//! login, billing callbacks, retention). Tenant-scoped operations take the
//! tenant id explicitly and implementations must filter every row by it.
//! Handlers never call the tenant-scoped methods directly; they go through
//! [`Session`](crate::store::Session), which supplies the id.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::models::{
    AuditQuery, AuditRecord, NewAuditRecord, NewUser, Organization, OrganizationUpdate,
    SubscriptionChange, User, UserUpdate,
};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("{0} not found")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("persistence unavailable: {0}")]
    Unavailable(String),

    #[error("tenant context not set on session")]
    TenantContextMissing,

    #[error("session already bound to a different tenant")]
    TenantContextConflict,
}

pub type StoreResult<T> = Result<T, StoreError>;

#[async_trait]
pub trait Persistence: Send + Sync {
    async fn ping(&self) -> StoreResult<()>;

    // ---------------------------------------------------------------------
    // System scope
    // ---------------------------------------------------------------------

    async fn organization_by_id(&self, id: Uuid) -> StoreResult<Option<Organization>>;

    async fn organization_by_slug(&self, slug: &str) -> StoreResult<Option<Organization>>;

    async fn organization_by_subscription(&self, subscription_id: &str) -> StoreResult<Option<Organization>>;

    async fn user_by_email(&self, email: &str) -> StoreResult<Option<User>>;

    async fn user_by_id(&self, id: Uuid) -> StoreResult<Option<User>>;

    /// Create an organization and its first user atomically.
    /// Fails with `Conflict` if the slug or email is taken.
    async fn register_organization(
        &self,
        organization: Organization,
        admin: NewUser,
    ) -> StoreResult<(Organization, User)>;

    async fn record_login(&self, user_id: Uuid, at: DateTime<Utc>) -> StoreResult<()>;

    async fn set_customer_id(&self, organization_id: Uuid, customer_id: &str) -> StoreResult<()>;

    async fn apply_subscription_change(
        &self,
        organization_id: Uuid,
        change: SubscriptionChange,
    ) -> StoreResult<Organization>;

    /// Delete audit records older than `cutoff`, across all tenants.
    async fn prune_audit_records(&self, cutoff: DateTime<Utc>) -> StoreResult<u64>;

    // ---------------------------------------------------------------------
    // Tenant scope
    // ---------------------------------------------------------------------

    async fn tenant_organization(&self, tenant_id: Uuid) -> StoreResult<Organization>;

    async fn update_organization(
        &self,
        tenant_id: Uuid,
        update: OrganizationUpdate,
    ) -> StoreResult<Organization>;

    async fn list_users(&self, tenant_id: Uuid) -> StoreResult<Vec<User>>;

    async fn get_user(&self, tenant_id: Uuid, user_id: Uuid) -> StoreResult<User>;

    async fn create_user(&self, tenant_id: Uuid, user: NewUser) -> StoreResult<User>;

    async fn update_user(&self, tenant_id: Uuid, user_id: Uuid, update: UserUpdate) -> StoreResult<User>;

    async fn delete_user(&self, tenant_id: Uuid, user_id: Uuid) -> StoreResult<()>;

    async fn insert_audit_record(&self, tenant_id: Uuid, record: NewAuditRecord) -> StoreResult<AuditRecord>;

    async fn query_audit_records(&self, tenant_id: Uuid, query: AuditQuery) -> StoreResult<Vec<AuditRecord>>;
}
