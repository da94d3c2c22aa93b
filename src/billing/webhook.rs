//! Payment provider webhooks: signature verification and event parsing.
//!
//! The signature header has the form `t=<unix secs>,v1=<hex>[,v1=<hex>...]`.
//! The signed payload is `"<t>.<raw body>"`, keyed with the endpoint secret
//! using HMAC-SHA256. Any matching `v1` entry accepts the request.

use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;
use thiserror::Error;
use uuid::Uuid;

use crate::models::SubscriptionTier;

type HmacSha256 = Hmac<Sha256>;

pub const SIGNATURE_HEADER: &str = "stripe-signature";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WebhookError {
    #[error("Missing signature header")]
    MissingSignature,

    #[error("Invalid signature")]
    InvalidSignature,

    #[error("Signature timestamp outside tolerance")]
    StaleTimestamp,

    #[error("Invalid payload: {0}")]
    InvalidPayload(String),
}

/// Check `header` against `payload`. `now_secs` is injected for tests.
pub fn verify_signature(
    payload: &[u8],
    header: &str,
    secret: &str,
    tolerance_secs: i64,
    now_secs: i64,
) -> Result<(), WebhookError> {
    // HMAC accepts an empty key; anyone could sign with it.
    if secret.is_empty() {
        return Err(WebhookError::InvalidSignature);
    }

    let mut timestamp: Option<i64> = None;
    let mut signatures = Vec::new();

    for part in header.split(',') {
        match part.trim().split_once('=') {
            Some(("t", value)) => timestamp = value.parse().ok(),
            Some(("v1", value)) => signatures.push(value),
            _ => {}
        }
    }

    let timestamp = timestamp.ok_or(WebhookError::InvalidSignature)?;
    if signatures.is_empty() {
        return Err(WebhookError::InvalidSignature);
    }

    let mac = signed_mac(secret, timestamp, payload)?;
    let matched = signatures.iter().any(|candidate| match hex::decode(candidate) {
        Ok(expected) => mac.clone().verify_slice(&expected).is_ok(),
        Err(_) => false,
    });

    if !matched {
        return Err(WebhookError::InvalidSignature);
    }
    if (now_secs - timestamp).abs() > tolerance_secs {
        return Err(WebhookError::StaleTimestamp);
    }
    Ok(())
}

fn signed_mac(secret: &str, timestamp: i64, payload: &[u8]) -> Result<HmacSha256, WebhookError> {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).map_err(|_| WebhookError::InvalidSignature)?;
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload);
    Ok(mac)
}

/// Compute a signature header value for `payload`.
pub fn sign(payload: &[u8], secret: &str, timestamp: i64) -> Result<String, WebhookError> {
    let mac = signed_mac(secret, timestamp, payload)?;
    Ok(format!("t={},v1={}", timestamp, hex::encode(mac.finalize().into_bytes())))
}

/// Events this service acts on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookEvent {
    CheckoutCompleted {
        organization_id: Uuid,
        tier: SubscriptionTier,
        subscription_id: Option<String>,
        customer_email: Option<String>,
    },
    SubscriptionDeleted {
        subscription_id: String,
    },
    InvoicePaid {
        customer_email: Option<String>,
        invoice_url: Option<String>,
    },
    Ignored(String),
}

#[derive(Deserialize)]
struct RawEvent {
    #[serde(rename = "type")]
    kind: String,
    data: RawData,
}

#[derive(Deserialize)]
struct RawData {
    object: serde_json::Value,
}

#[derive(Deserialize)]
struct CheckoutObject {
    metadata: CheckoutMetadata,
    subscription: Option<String>,
    customer_details: Option<CustomerDetails>,
}

#[derive(Deserialize)]
struct CustomerDetails {
    email: Option<String>,
}

#[derive(Deserialize)]
struct CheckoutMetadata {
    organization_id: Uuid,
    tier: SubscriptionTier,
}

#[derive(Deserialize)]
struct SubscriptionObject {
    id: String,
}

#[derive(Deserialize)]
struct InvoiceObject {
    customer_email: Option<String>,
    hosted_invoice_url: Option<String>,
}

fn object<T: for<'de> Deserialize<'de>>(value: serde_json::Value) -> Result<T, WebhookError> {
    serde_json::from_value(value).map_err(|e| WebhookError::InvalidPayload(e.to_string()))
}

impl WebhookEvent {
    pub fn parse(payload: &[u8]) -> Result<Self, WebhookError> {
        let raw: RawEvent = serde_json::from_slice(payload)
            .map_err(|e| WebhookError::InvalidPayload(e.to_string()))?;

        match raw.kind.as_str() {
            "checkout.session.completed" => {
                let checkout: CheckoutObject = object(raw.data.object)?;
                Ok(WebhookEvent::CheckoutCompleted {
                    organization_id: checkout.metadata.organization_id,
                    tier: checkout.metadata.tier,
                    subscription_id: checkout.subscription,
                    customer_email: checkout.customer_details.and_then(|d| d.email),
                })
            }
            "customer.subscription.deleted" => {
                let subscription: SubscriptionObject = object(raw.data.object)?;
                Ok(WebhookEvent::SubscriptionDeleted {
                    subscription_id: subscription.id,
                })
            }
            "invoice.paid" => {
                let invoice: InvoiceObject = object(raw.data.object)?;
                Ok(WebhookEvent::InvoicePaid {
                    customer_email: invoice.customer_email,
                    invoice_url: invoice.hosted_invoice_url,
                })
            }
            _ => Ok(WebhookEvent::Ignored(raw.kind)),
        }
    }
}
