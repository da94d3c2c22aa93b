//! Organizations: the unit of tenancy.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Subscription tier; selects the rate-limit ceiling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionTier {
    #[default]
    Free,
    Pro,
    Enterprise,
}

impl SubscriptionTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubscriptionTier::Free => "free",
            SubscriptionTier::Pro => "pro",
            SubscriptionTier::Enterprise => "enterprise",
        }
    }
}

impl std::str::FromStr for SubscriptionTier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "free" => Ok(SubscriptionTier::Free),
            "pro" => Ok(SubscriptionTier::Pro),
            "enterprise" => Ok(SubscriptionTier::Enterprise),
            other => Err(format!("unknown subscription tier: {other}")),
        }
    }
}

/// An organization row. `id` is the tenant id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Organization {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub subscription_tier: SubscriptionTier,
    pub subscription_status: Option<String>,
    pub customer_id: Option<String>,
    pub subscription_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub is_active: bool,
}

impl Organization {
    pub fn new(name: String, slug: String, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name,
            slug,
            subscription_tier: SubscriptionTier::Free,
            subscription_status: None,
            customer_id: None,
            subscription_id: None,
            created_at: now,
            updated_at: now,
            is_active: true,
        }
    }
}

/// Partial update applied by tenant admins.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OrganizationUpdate {
    pub name: Option<String>,
}

/// Billing-driven change applied by the webhook handler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriptionChange {
    pub tier: SubscriptionTier,
    pub status: String,
    /// `Some` replaces the stored subscription id; `None` leaves it.
    pub subscription_id: Option<String>,
}

/// True when `slug` is 3-100 chars of lowercase ascii, digits and inner hyphens.
pub fn is_valid_slug(slug: &str) -> bool {
    (3..=100).contains(&slug.len())
        && !slug.starts_with('-')
        && !slug.ends_with('-')
        && slug
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slug_rules() {
        assert!(is_valid_slug("acme-co"));
        assert!(is_valid_slug("a1b"));
        assert!(!is_valid_slug("ab"));
        assert!(!is_valid_slug("Acme"));
        assert!(!is_valid_slug("-acme"));
        assert!(!is_valid_slug("acme co"));
    }

    #[test]
    fn test_tier_wire_format() {
        let tier: SubscriptionTier = serde_json::from_str("\"enterprise\"").unwrap();
        assert_eq!(tier, SubscriptionTier::Enterprise);
        assert_eq!("pro".parse::<SubscriptionTier>().unwrap(), SubscriptionTier::Pro);
        assert!("gold".parse::<SubscriptionTier>().is_err());
    }
}
