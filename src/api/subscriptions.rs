//! Subscription status, checkout and provider webhooks.

use axum::{
    body::Bytes,
    extract::State,
    http::HeaderMap,
    Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::api::extract::{ApiJson, AuthContext, TenantSession};
use crate::api::MessageResponse;
use crate::auth::{require_role, Role};
use crate::billing::webhook::{verify_signature, WebhookError, WebhookEvent, SIGNATURE_HEADER};
use crate::billing::CheckoutRequest;
use crate::error::ApiError;
use crate::http::server::AppState;
use crate::models::{SubscriptionChange, SubscriptionTier};
use crate::tasks::Job;

#[derive(Debug, Serialize, Deserialize)]
pub struct SubscriptionView {
    pub tier: SubscriptionTier,
    pub status: Option<String>,
    pub customer_id: Option<String>,
    pub subscription_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CheckoutBody {
    pub tier: SubscriptionTier,
    pub success_url: String,
    pub cancel_url: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CheckoutView {
    pub checkout_url: String,
    pub session_id: String,
}

pub async fn current(TenantSession(session): TenantSession) -> Result<Json<SubscriptionView>, ApiError> {
    let org = session.organization().await?;
    Ok(Json(SubscriptionView {
        tier: org.subscription_tier,
        status: org.subscription_status,
        customer_id: org.customer_id,
        subscription_id: org.subscription_id,
    }))
}

pub async fn create_checkout(
    State(state): State<AppState>,
    AuthContext(ctx): AuthContext,
    TenantSession(session): TenantSession,
    ApiJson(body): ApiJson<CheckoutBody>,
) -> Result<Json<CheckoutView>, ApiError> {
    require_role(&ctx, Role::Admin)?;

    let config = state.config();
    if !config.features.billing {
        return Err(ApiError::FeatureDisabled("Billing is currently disabled".into()));
    }

    let price_id = match body.tier {
        SubscriptionTier::Pro => config.billing.pro_price_id.clone(),
        SubscriptionTier::Enterprise => config.billing.enterprise_price_id.clone(),
        SubscriptionTier::Free => return Err(ApiError::BadRequest("Invalid subscription tier".into())),
    };

    let org = session.organization().await?;
    let customer_id = match org.customer_id {
        Some(id) => id,
        None => {
            let id = state
                .payments
                .create_customer(&ctx.email, org.id, &org.name)
                .await?;
            state.persistence.set_customer_id(org.id, &id).await?;
            id
        }
    };

    let checkout = state
        .payments
        .create_checkout_session(CheckoutRequest {
            customer_id: &customer_id,
            price_id: &price_id,
            organization_id: org.id,
            tier: body.tier,
            success_url: &body.success_url,
            cancel_url: &body.cancel_url,
        })
        .await?;

    tracing::info!(organization_id = %org.id, tier = body.tier.as_str(), session_id = %checkout.id, "Checkout session created");
    Ok(Json(CheckoutView {
        checkout_url: checkout.url,
        session_id: checkout.id,
    }))
}

/// Provider callback. Unauthenticated; trust comes from the signature.
pub async fn webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Bytes,
) -> Result<Json<MessageResponse>, ApiError> {
    let config = state.config();
    if !config.features.billing {
        return Ok(Json(MessageResponse::new("Billing disabled")));
    }
    if config.billing.webhook_secret.is_empty() {
        tracing::warn!("Webhook received but no signing secret is configured");
        return Err(ApiError::FeatureDisabled("Webhook signing is not configured".into()));
    }

    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or(WebhookError::MissingSignature)?;
    verify_signature(
        &payload,
        signature,
        &config.billing.webhook_secret,
        config.billing.webhook_tolerance_secs,
        Utc::now().timestamp(),
    )?;

    match WebhookEvent::parse(&payload)? {
        WebhookEvent::CheckoutCompleted {
            organization_id,
            tier,
            subscription_id,
            customer_email,
        } => {
            let change = SubscriptionChange {
                tier,
                status: "active".into(),
                subscription_id,
            };
            match state.persistence.apply_subscription_change(organization_id, change).await {
                Ok(org) => {
                    state.tiers.set(org.id, org.subscription_tier);
                    tracing::info!(organization_id = %org.id, tier = tier.as_str(), "Subscription activated");
                    if let Some(email) = customer_email {
                        state.tasks.enqueue(Job::SubscriptionConfirmation { email, tier });
                    }
                }
                Err(crate::store::StoreError::NotFound(_)) => {
                    tracing::warn!(organization_id = %organization_id, "Checkout completed for unknown organization");
                }
                Err(e) => return Err(e.into()),
            }
        }
        WebhookEvent::SubscriptionDeleted { subscription_id } => {
            match state.persistence.organization_by_subscription(&subscription_id).await? {
                Some(org) => {
                    let change = SubscriptionChange {
                        tier: SubscriptionTier::Free,
                        status: "canceled".into(),
                        subscription_id: None,
                    };
                    let org = state.persistence.apply_subscription_change(org.id, change).await?;
                    state.tiers.set(org.id, org.subscription_tier);
                    tracing::info!(organization_id = %org.id, "Subscription canceled, downgraded to free");
                }
                None => {
                    tracing::warn!(subscription_id = %subscription_id, "Cancellation for unknown subscription");
                }
            }
        }
        WebhookEvent::InvoicePaid {
            customer_email: Some(email),
            invoice_url: Some(invoice_url),
        } => {
            state.tasks.enqueue(Job::InvoiceNotification { email, invoice_url });
        }
        WebhookEvent::InvoicePaid { .. } => {
            tracing::debug!("Invoice event without email or url");
        }
        WebhookEvent::Ignored(kind) => {
            tracing::debug!(event = %kind, "Ignoring webhook event");
        }
    }

    Ok(Json(MessageResponse::new("Webhook processed")))
}
