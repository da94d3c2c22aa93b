//! Subscription billing.
//!
//! # Data Flow
//! ```text
//! POST /subscriptions/create-checkout
//!     → provider.rs (create customer if needed, create checkout session)
//!
//! POST /subscriptions/webhook
//!     → webhook.rs (verify signature, parse event)
//!     → persistence (apply subscription change)
//!     → tiers.rs (refresh cached tier for the rate limiter)
//! ```

pub mod provider;
pub mod tiers;
pub mod webhook;

pub use provider::{CheckoutRequest, CheckoutSession, PaymentProvider, ProviderError, StripeClient};
pub use tiers::TierCache;
pub use webhook::{verify_signature, WebhookError, WebhookEvent};
