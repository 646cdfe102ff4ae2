//! Conversation title generation
//!
//! Runs in the background for a conversation's first turn. Failures never
//! surface to the caller; the fallback title is used instead.

use crate::config::CouncilConfig;
use crate::ports::model_gateway::{ModelGateway, QueryOptions};
use council_domain::{CallUsage, ChatMessage, PromptTemplate, TurnPhase};
use std::sync::Arc;
use tracing::{debug, warn};

pub const FALLBACK_TITLE: &str = "New Conversation";
const MAX_TITLE_CHARS: usize = 50;

/// A resolved title plus the usage the call cost
#[derive(Debug, Clone, PartialEq)]
pub struct TitleResult {
    pub title: String,
    pub usage: CallUsage,
}

impl TitleResult {
    pub fn fallback() -> Self {
        Self {
            title: FALLBACK_TITLE.to_string(),
            usage: CallUsage::zero(),
        }
    }
}

/// Generates a short conversation title from the first user message
pub struct TitleGenerator<G: ModelGateway + 'static> {
    gateway: Arc<G>,
    config: CouncilConfig,
}

impl<G: ModelGateway + 'static> TitleGenerator<G> {
    pub fn new(gateway: Arc<G>, config: CouncilConfig) -> Self {
        Self { gateway, config }
    }

    /// Generate a title. Never errors; the fallback is used on any failure.
    pub async fn generate(&self, query: &str, session_id: Option<&str>) -> TitleResult {
        let prompt = PromptTemplate::title_prompt(query);
        let messages = vec![ChatMessage::user(prompt)];

        let mut options = QueryOptions::default()
            .with_timeout(self.config.title_timeout)
            .with_stage(TurnPhase::Title);
        if let Some(session_id) = session_id {
            options = options.with_session_id(session_id);
        }

        match self
            .gateway
            .query(&self.config.title_model, &messages, &options)
            .await
        {
            Ok(reply) => {
                let title = clean_title(&reply.content);
                if title.is_empty() {
                    debug!("Title model returned empty text, using fallback");
                    TitleResult {
                        title: FALLBACK_TITLE.to_string(),
                        usage: reply.usage,
                    }
                } else {
                    TitleResult {
                        title,
                        usage: reply.usage,
                    }
                }
            }
            Err(e) => {
                warn!("Title generation failed: {}", e);
                TitleResult::fallback()
            }
        }
    }
}

/// Strip surrounding quotes and cap the length, ellipsis included.
fn clean_title(raw: &str) -> String {
    let trimmed = raw.trim().trim_matches(['"', '\'']).trim();
    if trimmed.chars().count() <= MAX_TITLE_CHARS {
        return trimmed.to_string();
    }
    let cut: String = trimmed.chars().take(MAX_TITLE_CHARS - 3).collect();
    format!("{}...", cut.trim_end())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::model_gateway::{GatewayError, ModelReply};
    use async_trait::async_trait;
    use council_domain::Model;

    struct ScriptedTitle(Result<String, ()>);

    #[async_trait]
    impl ModelGateway for ScriptedTitle {
        async fn query(
            &self,
            _model: &Model,
            _messages: &[ChatMessage],
            _options: &QueryOptions,
        ) -> Result<ModelReply, GatewayError> {
            match &self.0 {
                Ok(text) => Ok(ModelReply {
                    content: text.clone(),
                    usage: CallUsage {
                        input_tokens: 4,
                        output_tokens: 3,
                        total_tokens: 7,
                        cost: None,
                    },
                }),
                Err(()) => Err(GatewayError::Timeout),
            }
        }
    }

    fn generator(script: Result<String, ()>) -> TitleGenerator<ScriptedTitle> {
        TitleGenerator::new(Arc::new(ScriptedTitle(script)), CouncilConfig::default())
    }

    #[tokio::test]
    async fn test_quotes_are_stripped() {
        let result = generator(Ok("\"Rust Ownership Basics\"".to_string()))
            .generate("What is ownership?", None)
            .await;
        assert_eq!(result.title, "Rust Ownership Basics");
        assert_eq!(result.usage.total_tokens, 7);
    }

    #[tokio::test]
    async fn test_long_title_is_capped_with_ellipsis_included() {
        let long = "A ".repeat(60);
        let result = generator(Ok(long)).generate("q", None).await;
        assert!(result.title.chars().count() <= MAX_TITLE_CHARS);
        assert!(result.title.ends_with("..."));
    }

    #[tokio::test]
    async fn test_failure_uses_fallback() {
        let result = generator(Err(())).generate("q", None).await;
        assert_eq!(result.title, FALLBACK_TITLE);
        assert_eq!(result.usage, CallUsage::zero());
    }

    #[tokio::test]
    async fn test_empty_reply_uses_fallback_but_keeps_usage() {
        let result = generator(Ok("  \"\"  ".to_string())).generate("q", None).await;
        assert_eq!(result.title, FALLBACK_TITLE);
        assert_eq!(result.usage.total_tokens, 7);
    }
}
