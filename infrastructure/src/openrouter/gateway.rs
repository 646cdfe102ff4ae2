//! OpenRouter model gateway
//!
//! One reqwest client is shared across all calls; per-call timeouts come
//! from the query options. The session id is normalized (trimmed, capped at
//! 128 chars) and sent both in the body and as an `X-Session-Id` header so
//! upstream request logs can be correlated.

use super::types::{CompletionRequest, CompletionResponse, UsageRequest};
use async_trait::async_trait;
use council_application::ports::model_gateway::{
    GatewayError, ModelGateway, ModelReply, QueryOptions,
};
use council_domain::{CallUsage, ChatMessage, Model};
use tracing::debug;

const DEFAULT_API_URL: &str = "https://openrouter.ai/api/v1/chat/completions";
const MAX_SESSION_ID_CHARS: usize = 128;

/// Model gateway backed by the OpenRouter HTTP API
pub struct OpenRouterGateway {
    client: reqwest::Client,
    api_url: String,
    api_key: String,
}

impl OpenRouterGateway {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::with_api_url(api_key, DEFAULT_API_URL)
    }

    pub fn with_api_url(api_key: impl Into<String>, api_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_url: api_url.into(),
            api_key: api_key.into(),
        }
    }
}

/// Trim and cap a session id; blank ids are dropped.
fn normalize_session_id(session_id: Option<&str>) -> Option<String> {
    let trimmed = session_id?.trim();
    if trimmed.is_empty() {
        return None;
    }
    Some(trimmed.chars().take(MAX_SESSION_ID_CHARS).collect())
}

#[async_trait]
impl ModelGateway for OpenRouterGateway {
    async fn query(
        &self,
        model: &Model,
        messages: &[ChatMessage],
        options: &QueryOptions,
    ) -> Result<ModelReply, GatewayError> {
        let session_id = normalize_session_id(options.session_id.as_deref());

        let request = CompletionRequest {
            model: model.as_str().to_string(),
            messages: messages.to_vec(),
            session_id: session_id.clone(),
            metadata: options.metadata.clone(),
            plugins: options.plugins.clone(),
            usage: UsageRequest { include: true },
        };

        debug!(model = %model, url = %self.api_url, "querying model");

        let mut builder = self
            .client
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .timeout(options.timeout)
            .json(&request);
        if let Some(session_id) = &session_id {
            builder = builder.header("X-Session-Id", session_id);
        }

        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                GatewayError::Timeout
            } else {
                GatewayError::RequestFailed(e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(GatewayError::UpstreamStatus {
                status: status.as_u16(),
                detail,
            });
        }

        let body: CompletionResponse = response
            .json()
            .await
            .map_err(|e| GatewayError::MalformedResponse(e.to_string()))?;

        let content = body
            .choices
            .first()
            .and_then(|choice| choice.message.content.clone())
            .ok_or_else(|| {
                GatewayError::MalformedResponse("response has no message content".to_string())
            })?;

        Ok(ModelReply {
            content,
            usage: CallUsage::from_value(body.usage.as_ref()),
        })
    }
}
