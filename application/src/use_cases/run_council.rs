//! Run Council use case
//!
//! Orchestrates the three-stage council pipeline for one turn: parallel
//! Stage-1 answers, anonymized Stage-2 peer ranking, and the chairman's
//! Stage-3 synthesis. Individual model failures are absorbed per stage;
//! only an empty council or a fully failed Stage 1 changes the flow.

use crate::config::CouncilConfig;
use crate::ports::model_gateway::{ModelGateway, QueryOptions};
use crate::use_cases::shared::fan_out_queries;
use council_domain::{
    aggregate_rankings, assign_labels, derive_label_map, describe_attachments,
    history_to_context_text, parse_ranking, ChatMessage, ContentPart, HistoryRole, HistoryTurn,
    Model, PromptTemplate, Stage1Response, Stage2Ranking, Stage3Synthesis, TurnMetadata,
    TurnPhase, UsageSummary,
};
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

/// Errors that can occur before any model is called
#[derive(Error, Debug)]
pub enum RunTurnError {
    #[error("No council models configured")]
    NoCouncilModels,
}

/// Input for one council turn
#[derive(Debug, Clone)]
pub struct TurnInput {
    /// The user's question for this turn
    pub query: String,
    /// Raw attachment parts forwarded to Stage 1
    pub attachments: Vec<ContentPart>,
    /// Prior turns of the conversation, oldest first
    pub history: Vec<HistoryTurn>,
    /// Correlation id threaded through every model call
    pub session_id: Option<String>,
    /// Opaque plugin directives passed through to the backend
    pub plugins: Vec<serde_json::Value>,
    /// Override for which models rank in Stage 2; defaults to the council
    pub ranking_council: Option<Vec<Model>>,
}

impl TurnInput {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            attachments: Vec::new(),
            history: Vec::new(),
            session_id: None,
            plugins: Vec::new(),
            ranking_council: None,
        }
    }

    pub fn with_history(mut self, history: Vec<HistoryTurn>) -> Self {
        self.history = history;
        self
    }

    pub fn with_attachments(mut self, attachments: Vec<ContentPart>) -> Self {
        self.attachments = attachments;
        self
    }

    pub fn with_session_id(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }
}

/// Complete result of one council turn
#[derive(Debug, Clone)]
pub struct TurnOutput {
    pub stage1: Vec<Stage1Response>,
    pub stage2: Vec<Stage2Ranking>,
    pub stage3: Stage3Synthesis,
    pub metadata: TurnMetadata,
}

/// Use case driving the three council stages
pub struct CouncilOrchestrator<G: ModelGateway + 'static> {
    gateway: Arc<G>,
    config: CouncilConfig,
}

impl<G: ModelGateway + 'static> CouncilOrchestrator<G> {
    pub fn new(gateway: Arc<G>, config: CouncilConfig) -> Self {
        Self { gateway, config }
    }

    pub fn config(&self) -> &CouncilConfig {
        &self.config
    }

    /// Run all three stages back to back
    pub async fn execute(&self, input: &TurnInput) -> Result<TurnOutput, RunTurnError> {
        let stage1 = self.stage1(input).await?;

        if stage1.is_empty() {
            warn!("Every council model failed in stage 1");
            return Ok(TurnOutput {
                stage1,
                stage2: Vec::new(),
                stage3: Stage3Synthesis::all_failed_placeholder(self.config.chairman.clone()),
                metadata: TurnMetadata::empty(),
            });
        }

        let stage2 = self.stage2(input, &stage1).await;
        let stage3 = self.stage3(input, &stage1, &stage2).await;
        let metadata = self.build_metadata(&stage1, &stage2, &stage3);

        Ok(TurnOutput {
            stage1,
            stage2,
            stage3,
            metadata,
        })
    }

    /// Stage 1: every council model answers in parallel. Failures are
    /// dropped; the returned array holds successes in council order.
    pub async fn stage1(&self, input: &TurnInput) -> Result<Vec<Stage1Response>, RunTurnError> {
        if self.config.council.is_empty() {
            return Err(RunTurnError::NoCouncilModels);
        }

        info!("Stage 1: querying {} council models", self.config.council.len());

        let messages = self.stage1_messages(input);
        let options = self.query_options(input, TurnPhase::Stage1);

        let results = fan_out_queries(
            &self.gateway,
            &self.config.council,
            |_| messages.clone(),
            &options,
        )
        .await;

        let mut responses = Vec::new();
        for (model, result) in results {
            match result {
                Ok(reply) => {
                    info!("Model {} responded", model);
                    responses.push(Stage1Response::new(model, reply.content, reply.usage));
                }
                Err(e) => {
                    warn!("Model {} failed in stage 1: {}", model, e);
                }
            }
        }

        Ok(responses)
    }

    /// Stage 2: each ranker evaluates the anonymized Stage-1 answers.
    /// Ranker failures are dropped.
    pub async fn stage2(
        &self,
        input: &TurnInput,
        stage1: &[Stage1Response],
    ) -> Vec<Stage2Ranking> {
        let rankers = input
            .ranking_council
            .clone()
            .unwrap_or_else(|| self.config.council.clone());

        info!("Stage 2: {} models ranking {} responses", rankers.len(), stage1.len());

        let labeled: Vec<(String, String)> = assign_labels(stage1)
            .into_iter()
            .map(|(label, text)| (label, text.to_string()))
            .collect();

        let context = self.context_text(input);
        let prompt =
            PromptTemplate::ranking_prompt(&input.query, context.as_deref(), &labeled);
        let messages = vec![ChatMessage::user(prompt)];
        let options = self.query_options(input, TurnPhase::Stage2);

        let results =
            fan_out_queries(&self.gateway, &rankers, |_| messages.clone(), &options).await;

        let mut rankings = Vec::new();
        for (model, result) in results {
            match result {
                Ok(reply) => {
                    let parsed = parse_ranking(&reply.content);
                    if parsed.is_empty() {
                        warn!("Model {} produced an unparseable ranking", model);
                    }
                    rankings.push(Stage2Ranking {
                        model,
                        ranking: reply.content,
                        parsed_ranking: parsed,
                        usage: reply.usage,
                    });
                }
                Err(e) => {
                    warn!("Model {} failed in stage 2: {}", model, e);
                }
            }
        }

        rankings
    }

    /// Stage 3: chairman synthesis. Never fails; a gateway error yields the
    /// error placeholder so the turn can still be persisted.
    pub async fn stage3(
        &self,
        input: &TurnInput,
        stage1: &[Stage1Response],
        stage2: &[Stage2Ranking],
    ) -> Stage3Synthesis {
        let chairman = self.config.chairman.clone();
        info!("Stage 3: chairman {} synthesizing", chairman);

        let responses: Vec<(String, String)> = stage1
            .iter()
            .map(|r| (r.model.to_string(), r.response.clone()))
            .collect();
        let rankings: Vec<(String, String)> = stage2
            .iter()
            .map(|r| (r.model.to_string(), r.ranking.clone()))
            .collect();

        let context = self.context_text(input);
        let prompt = PromptTemplate::synthesis_prompt(
            &input.query,
            context.as_deref(),
            &responses,
            &rankings,
        );
        let messages = vec![ChatMessage::user(prompt)];
        let options = self.query_options(input, TurnPhase::Stage3);

        match self.gateway.query(&chairman, &messages, &options).await {
            Ok(reply) => Stage3Synthesis::new(chairman, reply.content, reply.usage),
            Err(e) => {
                warn!("Chairman {} failed: {}", chairman, e);
                Stage3Synthesis::error_placeholder(chairman)
            }
        }
    }

    /// Label map, aggregate rankings, and the turn's usage summary.
    pub fn build_metadata(
        &self,
        stage1: &[Stage1Response],
        stage2: &[Stage2Ranking],
        stage3: &Stage3Synthesis,
    ) -> TurnMetadata {
        let label_to_model = derive_label_map(stage1);
        let aggregates = aggregate_rankings(stage2, &label_to_model);

        let usage = UsageSummary::of_calls(
            stage1
                .iter()
                .map(|r| &r.usage)
                .chain(stage2.iter().map(|r| &r.usage))
                .chain(std::iter::once(&stage3.usage)),
        );

        TurnMetadata {
            label_to_model,
            aggregate_rankings: aggregates,
            usage,
            title_usage: None,
        }
    }

    fn stage1_messages(&self, input: &TurnInput) -> Vec<ChatMessage> {
        let mut messages = vec![ChatMessage::system(PromptTemplate::stage1_system())];

        for turn in &input.history {
            messages.push(match turn.role {
                HistoryRole::User => ChatMessage::user(turn.content.clone()),
                HistoryRole::Assistant => ChatMessage::assistant(turn.content.clone()),
            });
        }

        let summary = if input.attachments.is_empty() {
            None
        } else {
            Some(describe_attachments(&input.attachments))
        };
        let text = PromptTemplate::stage1_user_text(&input.query, summary.as_deref());

        if input.attachments.is_empty() {
            messages.push(ChatMessage::user(text));
        } else {
            messages.push(ChatMessage::user_with_parts(text, &input.attachments));
        }

        messages
    }

    fn context_text(&self, input: &TurnInput) -> Option<String> {
        if input.history.is_empty() {
            return None;
        }
        let text = history_to_context_text(&input.history);
        if text.is_empty() { None } else { Some(text) }
    }

    fn query_options(&self, input: &TurnInput, phase: TurnPhase) -> QueryOptions {
        let mut options = QueryOptions::default()
            .with_timeout(self.config.query_timeout)
            .with_stage(phase)
            .with_plugins(input.plugins.clone());
        if let Some(session_id) = &input.session_id {
            options = options.with_session_id(session_id.clone());
        }
        options
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::model_gateway::{GatewayError, ModelReply};
    use async_trait::async_trait;
    use council_domain::CallUsage;
    use std::collections::HashSet;
    use std::sync::Mutex;

    /// Scripted gateway: canned answers per model, optional failure set,
    /// and a log of every call it receives.
    struct MockGateway {
        failing: HashSet<Model>,
        ranking_text: String,
        calls: Mutex<Vec<(Model, String)>>,
    }

    impl MockGateway {
        fn new() -> Self {
            Self {
                failing: HashSet::new(),
                ranking_text: "Looks good.\n\nFINAL RANKING:\n1. Response A\n2. Response B"
                    .to_string(),
                calls: Mutex::new(Vec::new()),
            }
        }

        fn failing(mut self, model: Model) -> Self {
            self.failing.insert(model);
            self
        }

        fn last_prompt(&self) -> String {
            let calls = self.calls.lock().unwrap();
            calls.last().map(|(_, p)| p.clone()).unwrap_or_default()
        }
    }

    #[async_trait]
    impl ModelGateway for MockGateway {
        async fn query(
            &self,
            model: &Model,
            messages: &[ChatMessage],
            _options: &QueryOptions,
        ) -> Result<ModelReply, GatewayError> {
            let prompt = messages
                .iter()
                .map(|m| match &m.content {
                    council_domain::MessageContent::Text(t) => t.clone(),
                    council_domain::MessageContent::Parts(_) => "<parts>".to_string(),
                })
                .collect::<Vec<_>>()
                .join("\n---\n");
            self.calls.lock().unwrap().push((model.clone(), prompt.clone()));

            if self.failing.contains(model) {
                return Err(GatewayError::RequestFailed("scripted failure".to_string()));
            }

            let content = if prompt.contains("Chairman of an LLM Council") {
                format!("synthesis by {}", model)
            } else if prompt.contains("FINAL RANKING") {
                self.ranking_text.clone()
            } else {
                format!("answer from {}", model)
            };

            Ok(ModelReply {
                content,
                usage: CallUsage {
                    input_tokens: 10,
                    output_tokens: 5,
                    total_tokens: 15,
                    cost: Some(0.001),
                },
            })
        }
    }

    fn two_model_config() -> CouncilConfig {
        CouncilConfig {
            council: vec![Model::Gpt51, Model::Grok4],
            ..CouncilConfig::default()
        }
    }

    #[tokio::test]
    async fn test_full_pipeline_happy_path() {
        let gateway = Arc::new(MockGateway::new());
        let orchestrator = CouncilOrchestrator::new(Arc::clone(&gateway), two_model_config());

        let output = orchestrator
            .execute(&TurnInput::new("What is Rust?"))
            .await
            .unwrap();

        assert_eq!(output.stage1.len(), 2);
        assert_eq!(output.stage1[0].model, Model::Gpt51);
        assert_eq!(output.stage2.len(), 2);
        assert_eq!(
            output.stage2[0].parsed_ranking,
            vec!["Response A", "Response B"]
        );
        assert!(output.stage3.response.starts_with("synthesis by"));
        assert_eq!(output.stage3.model, Model::Gemini3Pro);

        // Labels follow stage-1 array order
        assert_eq!(output.metadata.label_to_model["Response A"], Model::Gpt51);
        assert_eq!(output.metadata.label_to_model["Response B"], Model::Grok4);

        // Everyone agreed: A first, B second
        let aggregates = &output.metadata.aggregate_rankings;
        assert_eq!(aggregates[0].model, Model::Gpt51);
        assert_eq!(aggregates[0].average_rank, 1.0);
        assert_eq!(aggregates[1].average_rank, 2.0);

        // 2 stage-1 calls + 2 rankings + 1 synthesis
        assert_eq!(output.metadata.usage.model_calls, 5);
        assert_eq!(output.metadata.usage.total_tokens, 75);
    }

    #[tokio::test]
    async fn test_stage1_failure_absorbed_and_labels_reassigned() {
        let gateway = Arc::new(MockGateway::new().failing(Model::Gpt51));
        let orchestrator = CouncilOrchestrator::new(Arc::clone(&gateway), two_model_config());

        let output = orchestrator
            .execute(&TurnInput::new("What is Rust?"))
            .await
            .unwrap();

        // Only the surviving model appears, relabeled from position zero
        assert_eq!(output.stage1.len(), 1);
        assert_eq!(output.stage1[0].model, Model::Grok4);
        assert_eq!(output.metadata.label_to_model["Response A"], Model::Grok4);
        assert!(!output.metadata.label_to_model.contains_key("Response B"));

        // Stage 2 still runs with the full council as rankers
        assert_eq!(output.stage2.len(), 1);
        assert!(!output.stage3.is_placeholder());
    }

    #[tokio::test]
    async fn test_all_failed_yields_placeholder_without_later_stages() {
        let gateway = Arc::new(
            MockGateway::new()
                .failing(Model::Gpt51)
                .failing(Model::Grok4),
        );
        let orchestrator = CouncilOrchestrator::new(Arc::clone(&gateway), two_model_config());

        let output = orchestrator
            .execute(&TurnInput::new("What is Rust?"))
            .await
            .unwrap();

        assert!(output.stage1.is_empty());
        assert!(output.stage2.is_empty());
        assert!(output.stage3.is_placeholder());
        assert_eq!(
            output.stage3.response,
            "All models failed to respond. Please try again."
        );
        // Only the two failed stage-1 calls happened
        assert_eq!(gateway.calls.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_chairman_failure_yields_error_placeholder() {
        let gateway = Arc::new(MockGateway::new().failing(Model::Gemini3Pro));
        let orchestrator = CouncilOrchestrator::new(Arc::clone(&gateway), two_model_config());

        let output = orchestrator
            .execute(&TurnInput::new("What is Rust?"))
            .await
            .unwrap();

        assert_eq!(output.stage1.len(), 2);
        assert!(output.stage3.is_placeholder());
        assert_eq!(
            output.stage3.response,
            "Error: Unable to generate final synthesis."
        );
    }

    #[tokio::test]
    async fn test_history_flows_into_prompts() {
        let gateway = Arc::new(MockGateway::new());
        let orchestrator = CouncilOrchestrator::new(Arc::clone(&gateway), two_model_config());

        let input = TurnInput::new("And in Haskell?").with_history(vec![
            HistoryTurn::user("What is a monad?"),
            HistoryTurn::assistant("A monad is a composable computation wrapper."),
        ]);
        orchestrator.execute(&input).await.unwrap();

        // The chairman call was last; its prompt carries the context block
        let prompt = gateway.last_prompt();
        assert!(prompt.contains("Conversation Context (previous turns):"));
        assert!(prompt.contains("User: What is a monad?"));
    }

    #[tokio::test]
    async fn test_empty_council_rejected() {
        let gateway = Arc::new(MockGateway::new());
        let config = CouncilConfig {
            council: Vec::new(),
            ..CouncilConfig::default()
        };
        let orchestrator = CouncilOrchestrator::new(gateway, config);

        let result = orchestrator.execute(&TurnInput::new("hi")).await;
        assert!(matches!(result, Err(RunTurnError::NoCouncilModels)));
    }
}
