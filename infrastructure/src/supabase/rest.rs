//! Minimal PostgREST client
//!
//! All storage calls share this thin request helper: service-role
//! authentication, query-string filters, optional `Prefer` header, and
//! readable error extraction from PostgREST's error payloads.

use council_application::ports::conversation_store::StoreError;
use reqwest::Method;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(20);

/// Authenticated PostgREST access to one Supabase project
pub struct SupabaseRest {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl SupabaseRest {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            client: reqwest::Client::new(),
            base_url,
            api_key: api_key.into(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    /// Issue one PostgREST request. Returns `None` for empty bodies.
    pub async fn request(
        &self,
        method: Method,
        resource: &str,
        params: &[(&str, String)],
        json_body: Option<&Value>,
        prefer: Option<&str>,
    ) -> Result<Option<Value>, StoreError> {
        let url = format!("{}/rest/v1/{}", self.base_url, resource);
        debug!(%method, resource, "postgrest request");

        let mut builder = self
            .client
            .request(method, &url)
            .timeout(REQUEST_TIMEOUT)
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
            .query(params);
        if let Some(body) = json_body {
            builder = builder.json(body);
        }
        if let Some(prefer) = prefer {
            builder = builder.header("Prefer", prefer);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;

        let status = response.status();
        let bytes = response
            .bytes()
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;

        if status.as_u16() >= 400 {
            let payload: Option<Value> = serde_json::from_slice(&bytes).ok();
            return Err(StoreError::Backend(extract_error_message(
                payload.as_ref(),
                &format!("Database request failed ({}).", status.as_u16()),
            )));
        }

        if bytes.is_empty() {
            return Ok(None);
        }
        Ok(serde_json::from_slice(&bytes).ok())
    }
}

/// Readable message from a PostgREST error payload.
fn extract_error_message(payload: Option<&Value>, fallback: &str) -> String {
    let Some(Value::Object(map)) = payload else {
        return fallback.to_string();
    };
    for key in ["message", "hint", "details"] {
        if let Some(Value::String(text)) = map.get(key) {
            if !text.is_empty() {
                return text.clone();
            }
        }
    }
    fallback.to_string()
}
