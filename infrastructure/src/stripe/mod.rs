//! Stripe adapter
//!
//! Webhook signature verification plus a thin client for checkout sessions
//! and subscription management.

pub mod client;
pub mod webhook;

pub use client::StripeClient;
pub use webhook::WebhookVerifier;
