//! Supabase identity adapter
//!
//! Validates the caller's access token against GoTrue and maps the user
//! payload onto an account profile. The plan and billing ids live in
//! `app_metadata`, written by the payment webhook handler.

use async_trait::async_trait;
use council_application::ports::identity::{
    AccountProfile, AccountRole, BillingProfile, IdentityError, IdentityPort,
};
use council_domain::Plan;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(20);

pub struct SupabaseIdentity {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl SupabaseIdentity {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        }
    }
}

#[async_trait]
impl IdentityPort for SupabaseIdentity {
    async fn validate(&self, credential: &str) -> Result<AccountProfile, IdentityError> {
        let url = format!("{}/auth/v1/user", self.base_url);
        let response = self
            .client
            .get(&url)
            .timeout(REQUEST_TIMEOUT)
            .header("apikey", &self.api_key)
            .bearer_auth(credential)
            .send()
            .await
            .map_err(|e| IdentityError::Backend(e.to_string()))?;

        if !response.status().is_success() {
            return Err(IdentityError::InvalidCredential);
        }

        let user: Value = response
            .json()
            .await
            .map_err(|e| IdentityError::Backend(e.to_string()))?;
        debug!("validated credential");

        parse_profile(&user)
    }
}

fn parse_profile(user: &Value) -> Result<AccountProfile, IdentityError> {
    let id = user
        .get("id")
        .and_then(Value::as_str)
        .ok_or_else(|| IdentityError::Backend("user payload has no id".to_string()))?
        .to_string();

    let app_metadata = user.get("app_metadata");
    let metadata_str = |key: &str| {
        app_metadata
            .and_then(|m| m.get(key))
            .and_then(Value::as_str)
            .map(String::from)
    };

    let role = match metadata_str("role").as_deref() {
        Some("admin") => AccountRole::Admin,
        _ => AccountRole::User,
    };

    Ok(AccountProfile {
        id,
        email: user.get("email").and_then(Value::as_str).map(String::from),
        role,
        billing: BillingProfile {
            plan: Plan::from_metadata(metadata_str("plan").as_deref()),
            stripe_customer_id: metadata_str("stripe_customer_id"),
            stripe_subscription_id: metadata_str("stripe_subscription_id"),
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_pro_profile() {
        let user = json!({
            "id": "user-1",
            "email": "pro@example.com",
            "app_metadata": {
                "plan": "pro",
                "stripe_customer_id": "cus_1",
                "stripe_subscription_id": "sub_1",
            }
        });
        let profile = parse_profile(&user).unwrap();
        assert_eq!(profile.billing.plan, Plan::Pro);
        assert_eq!(profile.billing.stripe_customer_id.as_deref(), Some("cus_1"));
        assert_eq!(profile.role, AccountRole::User);
    }

    #[test]
    fn test_missing_metadata_defaults_to_free() {
        let user = json!({"id": "user-2"});
        let profile = parse_profile(&user).unwrap();
        assert_eq!(profile.billing.plan, Plan::Free);
        assert!(profile.email.is_none());
    }

    #[test]
    fn test_unknown_plan_defaults_to_free() {
        let user = json!({
            "id": "user-3",
            "app_metadata": {"plan": "enterprise", "role": "admin"}
        });
        let profile = parse_profile(&user).unwrap();
        assert_eq!(profile.billing.plan, Plan::Free);
        assert_eq!(profile.role, AccountRole::Admin);
    }

    #[test]
    fn test_payload_without_id_rejected() {
        assert!(parse_profile(&json!({"email": "x@y.z"})).is_err());
    }
}
