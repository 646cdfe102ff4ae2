//! Payment port
//!
//! Checkout session creation and webhook event decoding for the billing
//! provider. Signature verification lives behind this port so use cases
//! never see raw webhook bytes.

use async_trait::async_trait;
use council_domain::Plan;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PaymentError {
    #[error("Payment backend error: {0}")]
    Backend(String),

    #[error("Webhook signature verification failed")]
    InvalidSignature,

    #[error("Webhook timestamp outside tolerance window")]
    StaleTimestamp,

    #[error("Malformed webhook event: {0}")]
    MalformedEvent(String),
}

/// A checkout session handed to the caller for redirect
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutSession {
    pub id: String,
    pub url: String,
}

/// An active subscription as reported by the provider
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subscription {
    pub id: String,
    pub customer_id: String,
    pub active: bool,
}

/// A verified `checkout.session.completed` event
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutCompleted {
    /// Provider event id, used for idempotent processing
    pub event_id: String,
    pub session_id: String,
    pub account_id: String,
    pub plan: Plan,
    pub amount_cents: i64,
}

/// Billing provider backend
#[async_trait]
pub trait PaymentPort: Send + Sync {
    /// Create a checkout session upgrading `account_id` to the given plan
    async fn create_checkout(
        &self,
        account_id: &str,
        plan: Plan,
    ) -> Result<CheckoutSession, PaymentError>;

    /// Verify a webhook payload and decode the completed-checkout event.
    /// Returns Ok(None) for valid events of types we do not act on.
    fn decode_webhook(
        &self,
        payload: &[u8],
        signature_header: &str,
    ) -> Result<Option<CheckoutCompleted>, PaymentError>;

    /// Cancel the subscription attached to an account at period end
    async fn cancel_subscription(
        &self,
        subscription_id: &str,
    ) -> Result<Subscription, PaymentError>;
}
