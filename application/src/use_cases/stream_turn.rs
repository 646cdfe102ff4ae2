//! Streaming turn controller
//!
//! Drives one council turn as an ordered event stream. Quota and ownership
//! are checked before the stream opens; the pipeline then runs in a spawned
//! task, emitting one event per phase boundary. Cancellation is polled only
//! at stage boundaries, so an in-flight stage always runs to completion and
//! its usage is accounted for.

use crate::config::CouncilConfig;
use crate::ports::conversation_store::{ConversationStore, StoreError};
use crate::ports::identity::AccountProfile;
use crate::ports::model_gateway::ModelGateway;
use crate::use_cases::quota::{QuotaError, QuotaLedger};
use crate::use_cases::run_council::{CouncilOrchestrator, TurnInput};
use crate::use_cases::title::{TitleGenerator, TitleResult};
use chrono_tz::Tz;
use council_domain::{
    aggregate_rankings, derive_label_map, resolve_session_id, resolve_timezone, turn_history,
    AttachmentMeta, ContentPart, Conversation, Plan, QuotaExceeded, RankingMetadata,
    Stage1Response, Stage2Ranking, Stage3Synthesis, StoredMessage, TurnEvent, TurnState,
    UsageSummary,
};
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Errors raised before the event stream opens
#[derive(Error, Debug)]
pub enum TurnError {
    #[error("Conversation not found: {0}")]
    NotFound(String),

    #[error("Conversation does not belong to the caller")]
    Forbidden,

    #[error("Daily quota exceeded")]
    QuotaExceeded(QuotaExceeded),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Input for one streamed turn
#[derive(Debug, Clone)]
pub struct StreamTurnInput {
    pub conversation_id: String,
    pub account: AccountProfile,
    pub query: String,
    pub attachments: Vec<ContentPart>,
    /// Caller's IANA timezone for quota day boundaries
    pub timezone: Option<String>,
    pub cancellation: CancellationToken,
}

/// Ordered stream of turn events; ends after a terminal event
#[derive(Debug)]
pub struct TurnStream {
    rx: mpsc::Receiver<TurnEvent>,
}

impl TurnStream {
    pub async fn next_event(&mut self) -> Option<TurnEvent> {
        self.rx.recv().await
    }
}

impl futures::Stream for TurnStream {
    type Item = TurnEvent;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<TurnEvent>> {
        self.rx.poll_recv(cx)
    }
}

/// Use case for running one council turn as an event stream
pub struct StreamTurnUseCase<G: ModelGateway + 'static, S: ConversationStore + 'static> {
    orchestrator: Arc<CouncilOrchestrator<G>>,
    titles: Arc<TitleGenerator<G>>,
    ledger: Arc<QuotaLedger<S>>,
    store: Arc<S>,
    config: CouncilConfig,
}

impl<G: ModelGateway + 'static, S: ConversationStore + 'static> StreamTurnUseCase<G, S> {
    pub fn new(
        orchestrator: Arc<CouncilOrchestrator<G>>,
        titles: Arc<TitleGenerator<G>>,
        ledger: Arc<QuotaLedger<S>>,
        store: Arc<S>,
        config: CouncilConfig,
    ) -> Self {
        Self {
            orchestrator,
            titles,
            ledger,
            store,
            config,
        }
    }

    /// Validate ownership and quota, then open the event stream.
    pub async fn execute(&self, input: StreamTurnInput) -> Result<TurnStream, TurnError> {
        let conversation = self
            .store
            .get_conversation(&input.conversation_id)
            .await
            .map_err(|e| match e {
                StoreError::NotFound(id) => TurnError::NotFound(id),
                other => TurnError::Store(other),
            })?;

        if conversation.owner_id != input.account.id {
            return Err(TurnError::Forbidden);
        }

        let tz = resolve_timezone(input.timezone.as_deref(), self.config.default_timezone);
        let plan = input.account.billing.plan;
        let remaining = self
            .ledger
            .check(&input.account.id, plan, tz)
            .await
            .map_err(|e| match e {
                QuotaError::Exceeded(detail) => TurnError::QuotaExceeded(detail),
                QuotaError::Store(e) => TurnError::Store(e),
            })?;

        let (tx, rx) = mpsc::channel(32);
        let pipeline = Pipeline {
            orchestrator: Arc::clone(&self.orchestrator),
            titles: Arc::clone(&self.titles),
            ledger: Arc::clone(&self.ledger),
            store: Arc::clone(&self.store),
            tx,
            conversation,
            plan,
            tz,
            account_id: input.account.id,
            query: input.query,
            attachments: input.attachments,
            cancellation: input.cancellation,
            remaining,
        };

        tokio::spawn(pipeline.run());
        Ok(TurnStream { rx })
    }
}

/// One turn's worth of pipeline state, moved into the spawned task
struct Pipeline<G: ModelGateway + 'static, S: ConversationStore + 'static> {
    orchestrator: Arc<CouncilOrchestrator<G>>,
    titles: Arc<TitleGenerator<G>>,
    ledger: Arc<QuotaLedger<S>>,
    store: Arc<S>,
    tx: mpsc::Sender<TurnEvent>,
    conversation: Conversation,
    plan: Plan,
    tz: Tz,
    account_id: String,
    query: String,
    attachments: Vec<ContentPart>,
    cancellation: CancellationToken,
    remaining: i64,
}

impl<G: ModelGateway + 'static, S: ConversationStore + 'static> Pipeline<G, S> {
    async fn run(mut self) {
        let conversation_id = self.conversation.id.clone();
        let is_first = !self
            .conversation
            .messages
            .iter()
            .any(|m| matches!(m, StoredMessage::User { .. }));
        let history = turn_history(&self.conversation.messages);
        let session_id = resolve_session_id(&self.conversation);

        // Persist the user message before anything can fail
        let user_message = StoredMessage::User {
            content: self.query.clone(),
            attachments: AttachmentMeta::from_parts(&self.attachments),
            session_id: Some(session_id.clone()),
        };
        if let Err(e) = self.store.add_message(&conversation_id, user_message).await {
            self.fail(format!("Failed to save message: {}", e)).await;
            return;
        }

        // Title generation runs concurrently with the pipeline and is
        // resolved after stage 3
        let title_task: Option<JoinHandle<TitleResult>> = if is_first {
            let titles = Arc::clone(&self.titles);
            let query = self.query.clone();
            let session_id = session_id.clone();
            Some(tokio::spawn(async move {
                titles.generate(&query, Some(&session_id)).await
            }))
        } else {
            None
        };

        let turn_input = TurnInput {
            query: self.query.clone(),
            attachments: self.attachments.clone(),
            history,
            session_id: Some(session_id.clone()),
            plugins: Vec::new(),
            ranking_council: None,
        };

        // Stage 1; cancellation is only polled once the stage has finished,
        // so a saved user message always ends up with a reply of some kind
        let mut state = TurnState::Stage1;
        self.emit(TurnEvent::Stage1Start).await;
        let stage1 = match self.orchestrator.stage1(&turn_input).await {
            Ok(stage1) => stage1,
            Err(e) => {
                abort_title(title_task);
                self.fail(e.to_string()).await;
                return;
            }
        };

        if stage1.is_empty() {
            self.finish_all_failed(&conversation_id, &session_id, title_task)
                .await;
            return;
        }
        self.emit(TurnEvent::Stage1Complete {
            data: stage1.clone(),
        })
        .await;

        // FREE accounts spend one query unit per conversation opener, once
        // stage 1 has produced something
        if self.plan == Plan::Free && is_first {
            self.consume(1).await;
        }

        if self.cancelled(state).await {
            self.persist_cancelled(&conversation_id, &session_id, &stage1, &[], title_task)
                .await;
            return;
        }

        // Stage 2
        state = TurnState::Stage2;
        self.emit(TurnEvent::Stage2Start).await;
        let stage2 = self.orchestrator.stage2(&turn_input, &stage1).await;
        let label_to_model = derive_label_map(&stage1);
        self.emit(TurnEvent::Stage2Complete {
            data: stage2.clone(),
            metadata: RankingMetadata {
                label_to_model: label_to_model.clone(),
                aggregate_rankings: aggregate_rankings(&stage2, &label_to_model),
            },
        })
        .await;

        if self.cancelled(state).await {
            self.persist_cancelled(&conversation_id, &session_id, &stage1, &stage2, title_task)
                .await;
            return;
        }

        // Stage 3 runs to completion once started; the last cancellation
        // poll above is the final exit point
        self.emit(TurnEvent::Stage3Start).await;
        let mut stage3 = self.orchestrator.stage3(&turn_input, &stage1, &stage2).await;
        self.emit(TurnEvent::Stage3Complete {
            data: stage3.clone(),
        })
        .await;

        // Title resolution: the task is joined at its natural completion;
        // the generator's own timeout bounds the wait
        if let Some(result) = self.resolve_title(&conversation_id, title_task).await {
            stage3 = stage3.with_title_usage(result.usage);
        }

        let mut metadata = self.orchestrator.build_metadata(&stage1, &stage2, &stage3);
        if let Some(title_usage) = &stage3.title_usage {
            metadata.usage = metadata.usage.fold_call(title_usage);
            metadata.title_usage = Some(title_usage.clone());
        }

        // Persist the assistant turn and the usage fold
        let assistant = StoredMessage::Assistant {
            stage1,
            stage2,
            stage3,
            session_id: Some(session_id),
        };
        if let Err(e) = self.store.add_message(&conversation_id, assistant).await {
            self.fail(format!("Failed to save response: {}", e)).await;
            return;
        }
        if let Err(e) = self.store.add_usage(&conversation_id, &metadata.usage).await {
            warn!("Failed to record conversation usage: {}", e);
        }

        // PRO accounts spend the turn's token total, title included
        if self.plan == Plan::Pro {
            self.consume(metadata.usage.total_tokens.max(0)).await;
        }

        info!(
            conversation_id,
            total_tokens = metadata.usage.total_tokens,
            "turn complete"
        );
        self.emit(TurnEvent::Complete {
            metadata,
            remaining_quota: self.remaining,
        })
        .await;
    }

    /// Poll the cancellation token; on cancellation emit the terminal event.
    async fn cancelled(&self, state: TurnState) -> bool {
        if !self.cancellation.is_cancelled() {
            return false;
        }
        info!(state = ?state, "turn cancelled");
        self.emit(TurnEvent::Cancelled { state }).await;
        true
    }

    /// Persist the partial turn after a mid-pipeline cancellation.
    ///
    /// A title task that already finished still lands (title saved, usage
    /// accounted); an unfinished one is aborted without waiting.
    async fn persist_cancelled(
        &mut self,
        conversation_id: &str,
        session_id: &str,
        stage1: &[Stage1Response],
        stage2: &[Stage2Ranking],
        title_task: Option<JoinHandle<TitleResult>>,
    ) {
        let title = match title_task {
            Some(handle) if handle.is_finished() => match handle.await {
                Ok(result) => Some(result),
                Err(e) => {
                    warn!("Title task failed: {}", e);
                    None
                }
            },
            Some(handle) => {
                handle.abort();
                None
            }
            None => None,
        };

        let chairman = self.orchestrator.config().chairman.clone();
        let mut stage3 = Stage3Synthesis::cancelled_placeholder(chairman);
        let mut usage = UsageSummary::of_calls(
            stage1
                .iter()
                .map(|r| &r.usage)
                .chain(stage2.iter().map(|r| &r.usage)),
        );
        if let Some(result) = &title {
            if let Err(e) = self.store.update_title(conversation_id, &result.title).await {
                warn!("Failed to save title: {}", e);
            }
            usage = usage.fold_call(&result.usage);
            stage3 = stage3.with_title_usage(result.usage.clone());
        }

        let assistant = StoredMessage::Assistant {
            stage1: stage1.to_vec(),
            stage2: stage2.to_vec(),
            stage3,
            session_id: Some(session_id.to_string()),
        };
        if let Err(e) = self.store.add_message(conversation_id, assistant).await {
            warn!("Failed to persist cancelled turn: {}", e);
        }
        if let Err(e) = self.store.add_usage(conversation_id, &usage).await {
            warn!("Failed to record cancelled turn usage: {}", e);
        }

        // Work already done still counts against PRO quota; a started stage
        // with no reported usage is billed as one token
        if self.plan == Plan::Pro {
            let amount = usage.total_tokens.max(1);
            self.consume(amount).await;
        }
    }

    /// Every stage-1 call failed: persist the placeholder turn and finish
    /// without running stages 2 and 3.
    async fn finish_all_failed(
        &mut self,
        conversation_id: &str,
        session_id: &str,
        title_task: Option<JoinHandle<TitleResult>>,
    ) {
        warn!(conversation_id, "every council model failed in stage 1");
        self.emit(TurnEvent::Stage1Complete { data: Vec::new() })
            .await;

        let chairman = self.orchestrator.config().chairman.clone();
        let stage3 = Stage3Synthesis::all_failed_placeholder(chairman);
        let assistant = StoredMessage::Assistant {
            stage1: Vec::new(),
            stage2: Vec::new(),
            stage3: stage3.clone(),
            session_id: Some(session_id.to_string()),
        };
        if let Err(e) = self.store.add_message(conversation_id, assistant).await {
            warn!("Failed to persist failed turn: {}", e);
        }

        self.emit(TurnEvent::Stage3Complete { data: stage3 }).await;

        let mut metadata = council_domain::TurnMetadata::empty();
        if let Some(result) = self.resolve_title(conversation_id, title_task).await {
            metadata.usage = metadata.usage.fold_call(&result.usage);
            metadata.title_usage = Some(result.usage);
        }
        self.emit(TurnEvent::Complete {
            metadata,
            remaining_quota: self.remaining,
        })
        .await;
    }

    /// Join the background title task, save the title, and emit the event.
    async fn resolve_title(
        &self,
        conversation_id: &str,
        title_task: Option<JoinHandle<TitleResult>>,
    ) -> Option<TitleResult> {
        let handle = title_task?;
        let result = match handle.await {
            Ok(result) => result,
            Err(e) => {
                warn!("Title task failed: {}", e);
                return None;
            }
        };
        if let Err(e) = self.store.update_title(conversation_id, &result.title).await {
            warn!("Failed to save title: {}", e);
        }
        self.emit(TurnEvent::TitleComplete {
            title: result.title.clone(),
        })
        .await;
        Some(result)
    }

    /// Spend quota mid-pipeline; a bookkeeping failure never fails the turn.
    async fn consume(&mut self, amount: i64) {
        match self
            .ledger
            .consume(&self.account_id, self.plan, amount, self.tz)
            .await
        {
            Ok(balance) => self.remaining = balance,
            Err(e) => warn!("Quota bookkeeping failed: {}", e),
        }
    }

    async fn fail(&self, message: String) {
        warn!("turn failed: {}", message);
        self.emit(TurnEvent::Error { message }).await;
    }

    /// Send an event; a dropped receiver does not stop the pipeline, the
    /// cancellation token does.
    async fn emit(&self, event: TurnEvent) {
        let _ = self.tx.send(event).await;
    }
}

fn abort_title(title_task: Option<JoinHandle<TitleResult>>) {
    if let Some(handle) = title_task {
        handle.abort();
    }
}
