//! Model gateway port
//!
//! Defines the uniform async call to one named model backend. Fan-out
//! callers absorb per-call failures so a single bad model never aborts a
//! stage; the trait itself still reports errors so adapters stay honest.

use async_trait::async_trait;
use council_domain::{CallUsage, ChatMessage, Model, TurnPhase};
use std::collections::BTreeMap;
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur during a single model call
#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("Request failed: {0}")]
    RequestFailed(String),

    #[error("Upstream returned status {status}: {detail}")]
    UpstreamStatus { status: u16, detail: String },

    #[error("Malformed upstream response: {0}")]
    MalformedResponse(String),

    #[error("Timeout")]
    Timeout,
}

/// Normalized reply from one model call
#[derive(Debug, Clone, PartialEq)]
pub struct ModelReply {
    pub content: String,
    pub usage: CallUsage,
}

/// Per-call options threaded through the gateway
#[derive(Debug, Clone)]
pub struct QueryOptions {
    pub timeout: Duration,
    /// Correlation id for one conversation's call lineage; trimmed to 128
    /// chars by adapters
    pub session_id: Option<String>,
    /// Free-form tags attached to the upstream call (e.g. the stage name)
    pub metadata: BTreeMap<String, String>,
    /// Opaque plugin directives passed through to the backend
    pub plugins: Vec<serde_json::Value>,
}

impl Default for QueryOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(120),
            session_id: None,
            metadata: BTreeMap::new(),
            plugins: Vec::new(),
        }
    }
}

impl QueryOptions {
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_session_id(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    /// Tag the call with the pipeline phase it belongs to
    pub fn with_stage(mut self, phase: TurnPhase) -> Self {
        self.metadata
            .insert("stage".to_string(), phase.as_str().to_string());
        self
    }

    pub fn with_plugins(mut self, plugins: Vec<serde_json::Value>) -> Self {
        self.plugins = plugins;
        self
    }
}

/// Gateway for model backend communication
///
/// This port defines how the application layer calls a model. Adapters live
/// in the infrastructure layer.
#[async_trait]
pub trait ModelGateway: Send + Sync {
    /// Issue one chat completion call to the named model
    async fn query(
        &self,
        model: &Model,
        messages: &[ChatMessage],
        options: &QueryOptions,
    ) -> Result<ModelReply, GatewayError>;
}
