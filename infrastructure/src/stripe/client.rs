//! Stripe payment adapter
//!
//! Checkout sessions and subscription cancellation go through the Stripe
//! REST API with form-encoded bodies. Webhook deliveries are verified by
//! [`WebhookVerifier`] before the event is decoded.

use super::webhook::WebhookVerifier;
use async_trait::async_trait;
use council_application::ports::payment::{
    CheckoutCompleted, CheckoutSession, PaymentError, PaymentPort, Subscription,
};
use council_domain::Plan;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

const API_BASE: &str = "https://api.stripe.com/v1";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(20);

pub struct StripeClient {
    client: reqwest::Client,
    api_base: String,
    secret_key: String,
    price_id: String,
    redirect_url: String,
    verifier: WebhookVerifier,
}

impl StripeClient {
    pub fn new(
        secret_key: impl Into<String>,
        webhook_secret: impl Into<String>,
        price_id: impl Into<String>,
        redirect_url: impl Into<String>,
    ) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_base: API_BASE.to_string(),
            secret_key: secret_key.into(),
            price_id: price_id.into(),
            redirect_url: redirect_url.into(),
            verifier: WebhookVerifier::new(webhook_secret),
        }
    }

    async fn post_form(
        &self,
        path: &str,
        form: &[(&str, &str)],
    ) -> Result<Value, PaymentError> {
        let url = format!("{}/{}", self.api_base, path);
        debug!(path, "stripe request");

        let response = self
            .client
            .post(&url)
            .timeout(REQUEST_TIMEOUT)
            .basic_auth(&self.secret_key, None::<&str>)
            .form(form)
            .send()
            .await
            .map_err(|e| PaymentError::Backend(e.to_string()))?;

        let status = response.status();
        let body: Value = response
            .json()
            .await
            .map_err(|e| PaymentError::Backend(e.to_string()))?;

        if !status.is_success() {
            let message = body
                .pointer("/error/message")
                .and_then(Value::as_str)
                .unwrap_or("Stripe request failed");
            return Err(PaymentError::Backend(message.to_string()));
        }
        Ok(body)
    }
}

#[async_trait]
impl PaymentPort for StripeClient {
    async fn create_checkout(
        &self,
        account_id: &str,
        plan: Plan,
    ) -> Result<CheckoutSession, PaymentError> {
        if plan != Plan::Pro {
            return Err(PaymentError::Backend(format!(
                "no checkout flow for plan: {}",
                plan
            )));
        }

        let body = self
            .post_form(
                "checkout/sessions",
                &[
                    ("mode", "subscription"),
                    ("line_items[0][price]", &self.price_id),
                    ("line_items[0][quantity]", "1"),
                    ("client_reference_id", account_id),
                    ("success_url", &self.redirect_url),
                    ("cancel_url", &self.redirect_url),
                ],
            )
            .await?;

        Ok(CheckoutSession {
            id: require_str(&body, "/id")?,
            url: require_str(&body, "/url")?,
        })
    }

    fn decode_webhook(
        &self,
        payload: &[u8],
        signature_header: &str,
    ) -> Result<Option<CheckoutCompleted>, PaymentError> {
        self.verifier.verify(payload, signature_header)?;

        let event: Value = serde_json::from_slice(payload)
            .map_err(|e| PaymentError::MalformedEvent(e.to_string()))?;

        let event_type = event.get("type").and_then(Value::as_str).unwrap_or("");
        if event_type != "checkout.session.completed" {
            debug!(event_type, "ignoring webhook event");
            return Ok(None);
        }

        let session = event
            .pointer("/data/object")
            .ok_or_else(|| PaymentError::MalformedEvent("event has no object".to_string()))?;

        Ok(Some(CheckoutCompleted {
            event_id: require_str(&event, "/id")?,
            session_id: require_str(session, "/id")?,
            account_id: require_str(session, "/client_reference_id")?,
            plan: Plan::Pro,
            amount_cents: session
                .get("amount_total")
                .and_then(Value::as_i64)
                .unwrap_or(0),
        }))
    }

    async fn cancel_subscription(
        &self,
        subscription_id: &str,
    ) -> Result<Subscription, PaymentError> {
        let body = self
            .post_form(
                &format!("subscriptions/{}", subscription_id),
                &[("cancel_at_period_end", "true")],
            )
            .await?;
        Ok(Subscription {
            id: require_str(&body, "/id")?,
            customer_id: require_str(&body, "/customer")?,
            active: body.get("status").and_then(Value::as_str) == Some("active"),
        })
    }
}

fn require_str(value: &Value, pointer: &str) -> Result<String, PaymentError> {
    value
        .pointer(pointer)
        .and_then(Value::as_str)
        .map(String::from)
        .ok_or_else(|| PaymentError::MalformedEvent(format!("missing field: {}", pointer)))
}
