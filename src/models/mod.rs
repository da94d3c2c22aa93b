//! Persisted entities.

pub mod audit;
pub mod organization;
pub mod user;

pub use audit::{AuditQuery, AuditRecord, NewAuditRecord};
pub use organization::{Organization, OrganizationUpdate, SubscriptionChange, SubscriptionTier};
pub use user::{NewUser, User, UserUpdate, UserView};
