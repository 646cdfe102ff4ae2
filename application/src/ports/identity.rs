//! Identity port
//!
//! Resolves a bearer credential to an account profile with plan information.

use async_trait::async_trait;
use council_domain::Plan;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum IdentityError {
    #[error("Invalid or expired credential")]
    InvalidCredential,

    #[error("Identity backend error: {0}")]
    Backend(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountRole {
    User,
    Admin,
}

/// Billing attributes attached to an account
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BillingProfile {
    pub plan: Plan,
    pub stripe_customer_id: Option<String>,
    pub stripe_subscription_id: Option<String>,
}

impl BillingProfile {
    pub fn free() -> Self {
        Self {
            plan: Plan::Free,
            stripe_customer_id: None,
            stripe_subscription_id: None,
        }
    }
}

/// A resolved account
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountProfile {
    pub id: String,
    pub email: Option<String>,
    pub role: AccountRole,
    pub billing: BillingProfile,
}

/// Credential verification backend
#[async_trait]
pub trait IdentityPort: Send + Sync {
    /// Validate a bearer credential and return the account it belongs to
    async fn validate(&self, credential: &str) -> Result<AccountProfile, IdentityError>;
}
