//! Roles and the authorization predicate.

use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::tenant::TenantContext;

/// Tenant-local roles, ordered by privilege.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Viewer,
    #[default]
    Member,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Viewer => "viewer",
            Role::Member => "member",
            Role::Admin => "admin",
        }
    }

    /// True when this role grants at least `required`.
    pub fn satisfies(&self, required: Role) -> bool {
        *self >= required
    }
}

/// The one place handlers check roles.
pub fn require_role(ctx: &TenantContext, required: Role) -> Result<(), ApiError> {
    if ctx.role.satisfies(required) {
        Ok(())
    } else {
        tracing::debug!(
            subject = %ctx.subject_id,
            role = ctx.role.as_str(),
            required = required.as_str(),
            "Role check failed"
        );
        Err(ApiError::Forbidden(format!(
            "{} role required",
            required.as_str()
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn ctx(role: Role) -> TenantContext {
        TenantContext {
            tenant_id: Uuid::new_v4(),
            subject_id: Uuid::new_v4(),
            email: "x@y.io".into(),
            role,
        }
    }

    #[test]
    fn test_role_ordering() {
        assert!(Role::Admin.satisfies(Role::Member));
        assert!(Role::Member.satisfies(Role::Viewer));
        assert!(!Role::Viewer.satisfies(Role::Member));
        assert!(!Role::Member.satisfies(Role::Admin));
    }

    #[test]
    fn test_require_role() {
        assert!(require_role(&ctx(Role::Admin), Role::Admin).is_ok());
        assert!(matches!(
            require_role(&ctx(Role::Member), Role::Admin),
            Err(ApiError::Forbidden(_))
        ));
    }
}
