//! Domain layer for llm-council
//!
//! This crate contains the core business logic, entities, and value objects
//! for the council pipeline. It has no dependencies on infrastructure or
//! presentation concerns.
//!
//! # Core Concepts
//!
//! ## Council
//!
//! A panel of independent model backends answers one user question:
//!
//! - **Stage 1**: every council model answers the question in parallel
//! - **Stage 2**: the answers are anonymized ("Response A", "Response B", ...)
//!   and every council model ranks them
//! - **Stage 3**: a fixed chairman model synthesizes the final answer from
//!   the responses and the peer rankings
//!
//! ## Quota
//!
//! Turns are gated by a per-account daily balance that resets once per
//! account-local calendar day: FREE accounts spend one query unit per
//! conversation opener, PRO accounts spend the turn's token total.

pub mod conversation;
pub mod core;
pub mod council;
pub mod orchestration;
pub mod prompt;
pub mod quota;
pub mod usage;

// Re-export commonly used types
pub use conversation::{
    entities::{
        AttachmentKind, AttachmentMeta, ChatMessage, ContentPart, Conversation,
        ConversationSummary, FileAttachment, ImageUrl, MessageContent, Role, StoredMessage,
        describe_attachments,
    },
    history::{
        HistoryRole, HistoryTurn, history_to_context_text, resolve_session_id, turn_history,
    },
};
pub use core::model::Model;
pub use council::{
    labels::{assign_labels, derive_label_map, position_label},
    ranking::{aggregate_rankings, parse_ranking},
    results::{
        AggregateRanking, RankingMetadata, Stage1Response, Stage2Ranking, Stage3Synthesis,
        TurnMetadata,
    },
};
pub use orchestration::{
    events::TurnEvent,
    phase::{TurnPhase, TurnState},
};
pub use prompt::PromptTemplate;
pub use quota::{
    Plan, QuotaExceeded, QuotaState, QuotaUnit, needs_reset, next_reset_at, resolve_timezone,
};
pub use usage::{CallUsage, UsageSummary};
