//! Payment provider client.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;
use uuid::Uuid;

use crate::config::BillingConfig;
use crate::models::SubscriptionTier;

#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    /// The provider answered with an error for this request.
    #[error("{0}")]
    Rejected(String),

    /// The provider could not be reached or answered garbage.
    #[error("payment provider unreachable: {0}")]
    Transport(String),
}

/// A hosted checkout page for one subscription purchase.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CheckoutSession {
    pub id: String,
    pub url: String,
}

/// Parameters for starting a subscription checkout.
#[derive(Debug, Clone)]
pub struct CheckoutRequest<'a> {
    pub customer_id: &'a str,
    pub price_id: &'a str,
    pub organization_id: Uuid,
    pub tier: SubscriptionTier,
    pub success_url: &'a str,
    pub cancel_url: &'a str,
}

#[async_trait]
pub trait PaymentProvider: Send + Sync {
    /// Create a billing customer and return its provider id.
    async fn create_customer(
        &self,
        email: &str,
        organization_id: Uuid,
        organization_name: &str,
    ) -> Result<String, ProviderError>;

    async fn create_checkout_session(&self, request: CheckoutRequest<'_>) -> Result<CheckoutSession, ProviderError>;
}

#[derive(Deserialize)]
struct CustomerResponse {
    id: String,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

/// Stripe REST client (form-encoded requests, JSON responses).
#[derive(Debug, Clone)]
pub struct StripeClient {
    http: reqwest::Client,
    api_base: String,
    secret_key: String,
}

impl StripeClient {
    pub fn new(config: &BillingConfig, timeout: Duration) -> Result<Self, ProviderError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ProviderError::Transport(e.to_string()))?;

        Ok(Self {
            http,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            secret_key: config.secret_key.clone(),
        })
    }

    async fn post<T: for<'de> Deserialize<'de>>(
        &self,
        path: &str,
        form: &[(String, String)],
    ) -> Result<T, ProviderError> {
        let res = self
            .http
            .post(format!("{}{}", self.api_base, path))
            .bearer_auth(&self.secret_key)
            .form(form)
            .send()
            .await
            .map_err(|e| ProviderError::Transport(e.to_string()))?;

        let status = res.status();
        if !status.is_success() {
            let message = match res.json::<ErrorEnvelope>().await {
                Ok(envelope) => envelope.error.message,
                Err(_) => format!("provider returned status {status}"),
            };
            tracing::warn!(path, status = %status, error = %message, "Payment provider rejected request");
            return Err(ProviderError::Rejected(message));
        }

        res.json::<T>()
            .await
            .map_err(|e| ProviderError::Transport(e.to_string()))
    }
}

fn field(key: &str, value: impl Into<String>) -> (String, String) {
    (key.to_string(), value.into())
}

#[async_trait]
impl PaymentProvider for StripeClient {
    async fn create_customer(
        &self,
        email: &str,
        organization_id: Uuid,
        organization_name: &str,
    ) -> Result<String, ProviderError> {
        let form = [
            field("email", email),
            field("metadata[organization_id]", organization_id.to_string()),
            field("metadata[organization_name]", organization_name),
        ];
        let customer: CustomerResponse = self.post("/v1/customers", &form).await?;
        tracing::info!(organization_id = %organization_id, customer_id = %customer.id, "Billing customer created");
        Ok(customer.id)
    }

    async fn create_checkout_session(&self, request: CheckoutRequest<'_>) -> Result<CheckoutSession, ProviderError> {
        let form = [
            field("customer", request.customer_id),
            field("payment_method_types[0]", "card"),
            field("line_items[0][price]", request.price_id),
            field("line_items[0][quantity]", "1"),
            field("mode", "subscription"),
            field("success_url", request.success_url),
            field("cancel_url", request.cancel_url),
            field("metadata[organization_id]", request.organization_id.to_string()),
            field("metadata[tier]", request.tier.as_str()),
        ];
        self.post("/v1/checkout/sessions", &form).await
    }
}
