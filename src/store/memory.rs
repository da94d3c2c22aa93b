//! In-process persistence.
//!
//! All tables sit behind one lock so multi-row operations (registration) are
//! atomic. Tenant-scoped reads and writes match on `organization_id` before
//! touching a row; a row owned by another tenant is indistinguishable from a
//! missing one.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use uuid::Uuid;

use crate::models::{
    AuditQuery, AuditRecord, NewAuditRecord, NewUser, Organization, OrganizationUpdate,
    SubscriptionChange, User, UserUpdate,
};
use crate::store::persistence::{Persistence, StoreError, StoreResult};

#[derive(Debug, Default)]
struct Tables {
    organizations: HashMap<Uuid, Organization>,
    users: HashMap<Uuid, User>,
    audit: Vec<AuditRecord>,
}

impl Tables {
    fn email_taken(&self, email: &str) -> bool {
        self.users.values().any(|u| u.email.eq_ignore_ascii_case(email))
    }

    fn slug_taken(&self, slug: &str) -> bool {
        self.organizations.values().any(|o| o.slug == slug)
    }

    fn scoped_user_mut(&mut self, tenant_id: Uuid, user_id: Uuid) -> StoreResult<&mut User> {
        self.users
            .get_mut(&user_id)
            .filter(|u| u.organization_id == tenant_id)
            .ok_or_else(|| StoreError::NotFound("User".into()))
    }
}

/// In-memory implementation of [`Persistence`].
#[derive(Debug, Default)]
pub struct MemoryPersistence {
    tables: RwLock<Tables>,
}

impl MemoryPersistence {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total audit rows across all tenants.
    pub fn audit_len(&self) -> usize {
        self.tables.read().audit.len()
    }
}

#[async_trait]
impl Persistence for MemoryPersistence {
    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }

    async fn organization_by_id(&self, id: Uuid) -> StoreResult<Option<Organization>> {
        Ok(self.tables.read().organizations.get(&id).cloned())
    }

    async fn organization_by_slug(&self, slug: &str) -> StoreResult<Option<Organization>> {
        Ok(self
            .tables
            .read()
            .organizations
            .values()
            .find(|o| o.slug == slug)
            .cloned())
    }

    async fn organization_by_subscription(&self, subscription_id: &str) -> StoreResult<Option<Organization>> {
        Ok(self
            .tables
            .read()
            .organizations
            .values()
            .find(|o| o.subscription_id.as_deref() == Some(subscription_id))
            .cloned())
    }

    async fn user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        Ok(self
            .tables
            .read()
            .users
            .values()
            .find(|u| u.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    async fn user_by_id(&self, id: Uuid) -> StoreResult<Option<User>> {
        Ok(self.tables.read().users.get(&id).cloned())
    }

    async fn register_organization(
        &self,
        organization: Organization,
        admin: NewUser,
    ) -> StoreResult<(Organization, User)> {
        let mut tables = self.tables.write();

        if tables.slug_taken(&organization.slug) {
            return Err(StoreError::Conflict("Organization slug already taken".into()));
        }
        if tables.email_taken(&admin.email) {
            return Err(StoreError::Conflict("Email already registered".into()));
        }

        let user = admin.into_user(organization.id, organization.created_at);
        tables.organizations.insert(organization.id, organization.clone());
        tables.users.insert(user.id, user.clone());

        Ok((organization, user))
    }

    async fn record_login(&self, user_id: Uuid, at: DateTime<Utc>) -> StoreResult<()> {
        let mut tables = self.tables.write();
        let user = tables
            .users
            .get_mut(&user_id)
            .ok_or_else(|| StoreError::NotFound("User".into()))?;
        user.last_login = Some(at);
        Ok(())
    }

    async fn set_customer_id(&self, organization_id: Uuid, customer_id: &str) -> StoreResult<()> {
        let mut tables = self.tables.write();
        let org = tables
            .organizations
            .get_mut(&organization_id)
            .ok_or_else(|| StoreError::NotFound("Organization".into()))?;
        org.customer_id = Some(customer_id.to_string());
        org.updated_at = Utc::now();
        Ok(())
    }

    async fn apply_subscription_change(
        &self,
        organization_id: Uuid,
        change: SubscriptionChange,
    ) -> StoreResult<Organization> {
        let mut tables = self.tables.write();
        let org = tables
            .organizations
            .get_mut(&organization_id)
            .ok_or_else(|| StoreError::NotFound("Organization".into()))?;

        org.subscription_tier = change.tier;
        org.subscription_status = Some(change.status);
        if let Some(id) = change.subscription_id {
            org.subscription_id = Some(id);
        }
        org.updated_at = Utc::now();
        Ok(org.clone())
    }

    async fn prune_audit_records(&self, cutoff: DateTime<Utc>) -> StoreResult<u64> {
        let mut tables = self.tables.write();
        let before = tables.audit.len();
        tables.audit.retain(|r| r.timestamp >= cutoff);
        Ok((before - tables.audit.len()) as u64)
    }

    async fn tenant_organization(&self, tenant_id: Uuid) -> StoreResult<Organization> {
        self.tables
            .read()
            .organizations
            .get(&tenant_id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound("Organization".into()))
    }

    async fn update_organization(
        &self,
        tenant_id: Uuid,
        update: OrganizationUpdate,
    ) -> StoreResult<Organization> {
        let mut tables = self.tables.write();
        let org = tables
            .organizations
            .get_mut(&tenant_id)
            .ok_or_else(|| StoreError::NotFound("Organization".into()))?;

        if let Some(name) = update.name {
            org.name = name;
        }
        org.updated_at = Utc::now();
        Ok(org.clone())
    }

    async fn list_users(&self, tenant_id: Uuid) -> StoreResult<Vec<User>> {
        let mut users: Vec<User> = self
            .tables
            .read()
            .users
            .values()
            .filter(|u| u.organization_id == tenant_id)
            .cloned()
            .collect();
        users.sort_by_key(|u| u.created_at);
        Ok(users)
    }

    async fn get_user(&self, tenant_id: Uuid, user_id: Uuid) -> StoreResult<User> {
        self.tables
            .read()
            .users
            .get(&user_id)
            .filter(|u| u.organization_id == tenant_id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound("User".into()))
    }

    async fn create_user(&self, tenant_id: Uuid, user: NewUser) -> StoreResult<User> {
        let mut tables = self.tables.write();

        if !tables.organizations.contains_key(&tenant_id) {
            return Err(StoreError::NotFound("Organization".into()));
        }
        if tables.email_taken(&user.email) {
            return Err(StoreError::Conflict("Email already registered".into()));
        }

        let user = user.into_user(tenant_id, Utc::now());
        tables.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn update_user(&self, tenant_id: Uuid, user_id: Uuid, update: UserUpdate) -> StoreResult<User> {
        let mut tables = self.tables.write();
        let user = tables.scoped_user_mut(tenant_id, user_id)?;

        if let Some(full_name) = update.full_name {
            user.full_name = Some(full_name);
        }
        if let Some(role) = update.role {
            user.role = role;
        }
        if let Some(is_active) = update.is_active {
            user.is_active = is_active;
        }
        user.updated_at = Utc::now();
        Ok(user.clone())
    }

    async fn delete_user(&self, tenant_id: Uuid, user_id: Uuid) -> StoreResult<()> {
        let mut tables = self.tables.write();
        tables.scoped_user_mut(tenant_id, user_id)?;
        tables.users.remove(&user_id);
        Ok(())
    }

    async fn insert_audit_record(&self, tenant_id: Uuid, record: NewAuditRecord) -> StoreResult<AuditRecord> {
        let record = record.into_record(tenant_id);
        self.tables.write().audit.push(record.clone());
        Ok(record)
    }

    async fn query_audit_records(&self, tenant_id: Uuid, query: AuditQuery) -> StoreResult<Vec<AuditRecord>> {
        let tables = self.tables.read();
        let mut records: Vec<AuditRecord> = tables
            .audit
            .iter()
            .filter(|r| r.organization_id == tenant_id && query.matches(r))
            .cloned()
            .collect();
        records.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Ok(records
            .into_iter()
            .skip(query.offset)
            .take(query.limit)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Role;

    fn new_user(email: &str) -> NewUser {
        NewUser {
            email: email.into(),
            password_hash: "hash".into(),
            full_name: None,
            role: Role::Admin,
        }
    }

    async fn register(store: &MemoryPersistence, slug: &str, email: &str) -> (Organization, User) {
        let org = Organization::new(slug.to_uppercase(), slug.into(), Utc::now());
        store.register_organization(org, new_user(email)).await.unwrap()
    }

    #[tokio::test]
    async fn test_register_enforces_unique_slug_and_email() {
        let store = MemoryPersistence::new();
        register(&store, "acme-co", "a@acme.io").await;

        let dup_slug = Organization::new("Other".into(), "acme-co".into(), Utc::now());
        assert!(matches!(
            store.register_organization(dup_slug, new_user("b@acme.io")).await,
            Err(StoreError::Conflict(_))
        ));

        let dup_email = Organization::new("Other".into(), "other-co".into(), Utc::now());
        assert!(matches!(
            store.register_organization(dup_email, new_user("A@ACME.IO")).await,
            Err(StoreError::Conflict(_))
        ));
        assert!(store.organization_by_slug("other-co").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_scoped_user_access_is_filtered() {
        let store = MemoryPersistence::new();
        let (acme, _) = register(&store, "acme-co", "a@acme.io").await;
        let (globex, globex_admin) = register(&store, "globex", "g@globex.io").await;

        assert!(matches!(
            store.get_user(acme.id, globex_admin.id).await,
            Err(StoreError::NotFound(_))
        ));
        assert!(matches!(
            store.update_user(acme.id, globex_admin.id, UserUpdate::default()).await,
            Err(StoreError::NotFound(_))
        ));
        assert!(matches!(
            store.delete_user(acme.id, globex_admin.id).await,
            Err(StoreError::NotFound(_))
        ));
        assert_eq!(store.list_users(globex.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_audit_query_and_prune() {
        let store = MemoryPersistence::new();
        let (acme, admin) = register(&store, "acme-co", "a@acme.io").await;
        let now = Utc::now();

        for (age_days, action) in [(100, "create"), (10, "update"), (1, "delete")] {
            store
                .insert_audit_record(
                    acme.id,
                    NewAuditRecord {
                        user_id: Some(admin.id),
                        action: action.into(),
                        resource_type: "users".into(),
                        resource_id: None,
                        details: serde_json::json!({}),
                        ip_address: None,
                        user_agent: None,
                        timestamp: now - chrono::Duration::days(age_days),
                    },
                )
                .await
                .unwrap();
        }

        let newest_first = store
            .query_audit_records(acme.id, AuditQuery::default())
            .await
            .unwrap();
        let actions: Vec<_> = newest_first.iter().map(|r| r.action.as_str()).collect();
        assert_eq!(actions, vec!["delete", "update", "create"]);

        let filtered = store
            .query_audit_records(
                acme.id,
                AuditQuery {
                    action: Some("update".into()),
                    ..AuditQuery::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(filtered.len(), 1);

        let pruned = store
            .prune_audit_records(now - chrono::Duration::days(90))
            .await
            .unwrap();
        assert_eq!(pruned, 1);
        assert_eq!(store.audit_len(), 2);
    }
}
