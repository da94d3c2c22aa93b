//! Users, always owned by exactly one organization.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::Role;

/// A user row. `password_hash` never leaves the service.
#[derive(Debug, Clone)]
pub struct User {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub email: String,
    pub password_hash: String,
    pub full_name: Option<String>,
    pub role: Role,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub last_login: Option<DateTime<Utc>>,
}

/// Insert payload. The owning tenant is supplied by the session, not the caller.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub password_hash: String,
    pub full_name: Option<String>,
    pub role: Role,
}

impl NewUser {
    pub fn into_user(self, organization_id: Uuid, now: DateTime<Utc>) -> User {
        User {
            id: Uuid::new_v4(),
            organization_id,
            email: self.email,
            password_hash: self.password_hash,
            full_name: self.full_name,
            role: self.role,
            is_active: true,
            created_at: now,
            updated_at: now,
            last_login: None,
        }
    }
}

/// Partial update applied by tenant admins.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserUpdate {
    pub full_name: Option<String>,
    pub role: Option<Role>,
    pub is_active: Option<bool>,
}

/// Public view of a user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserView {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub email: String,
    pub full_name: Option<String>,
    pub role: Role,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub last_login: Option<DateTime<Utc>>,
}

impl From<User> for UserView {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            organization_id: user.organization_id,
            email: user.email,
            full_name: user.full_name,
            role: user.role,
            is_active: user.is_active,
            created_at: user.created_at,
            last_login: user.last_login,
        }
    }
}

/// Minimal shape check: one `@`, non-empty local part, dotted domain.
pub fn is_valid_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !email.chars().any(char::is_whitespace)
        }
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_email_shape() {
        assert!(is_valid_email("a@acme.io"));
        assert!(!is_valid_email("acme.io"));
        assert!(!is_valid_email("a@acme"));
        assert!(!is_valid_email("a@@acme.io"));
        assert!(!is_valid_email("a b@acme.io"));
    }
}
