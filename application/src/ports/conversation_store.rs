//! Conversation store port
//!
//! Durable storage for conversations, messages, quota state, and processed
//! payment events. The in-memory adapter backs tests and offline runs; the
//! Supabase adapter backs production.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use council_domain::{
    Conversation, ConversationSummary, QuotaState, StoredMessage, UsageSummary,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from the storage backend
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Conversation not found: {0}")]
    NotFound(String),

    #[error("Storage backend error: {0}")]
    Backend(String),

    #[error("Invalid stored record: {0}")]
    InvalidRecord(String),
}

/// A processed payment event, kept for idempotence and audit
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentRecord {
    /// Checkout session id; the idempotence key
    pub session_id: String,
    /// Provider-side event id, kept for audit
    pub event_id: String,
    pub account_id: String,
    pub kind: String,
    pub amount_cents: i64,
    pub created_at: DateTime<Utc>,
}

/// Storage backend for conversations and account bookkeeping
#[async_trait]
pub trait ConversationStore: Send + Sync {
    /// Create an empty conversation owned by `owner_id`
    async fn create_conversation(&self, owner_id: &str) -> Result<Conversation, StoreError>;

    /// Fetch a conversation with its full message list
    async fn get_conversation(&self, id: &str) -> Result<Conversation, StoreError>;

    /// List the caller's conversations, newest first
    async fn list_conversations(
        &self,
        owner_id: &str,
    ) -> Result<Vec<ConversationSummary>, StoreError>;

    /// Append a message to the conversation
    async fn add_message(&self, id: &str, message: StoredMessage) -> Result<(), StoreError>;

    /// Replace the conversation title
    async fn update_title(&self, id: &str, title: &str) -> Result<(), StoreError>;

    /// Fold a turn's usage into the conversation total
    async fn add_usage(&self, id: &str, usage: &UsageSummary) -> Result<(), StoreError>;

    /// Archive or unarchive a conversation
    async fn set_archived(&self, id: &str, archived: bool) -> Result<(), StoreError>;

    /// Delete a conversation and its messages
    async fn delete_conversation(&self, id: &str) -> Result<(), StoreError>;

    /// Current quota balance for an account, if one has been written
    async fn quota_state(&self, account_id: &str) -> Result<Option<QuotaState>, StoreError>;

    /// Overwrite the quota balance for an account
    async fn set_quota_state(
        &self,
        account_id: &str,
        state: QuotaState,
    ) -> Result<(), StoreError>;

    /// Record a payment event. Returns false when the checkout session was
    /// already recorded, so webhook redeliveries stay idempotent even under
    /// a fresh event id.
    async fn record_payment(&self, record: PaymentRecord) -> Result<bool, StoreError>;

    /// Payment history for an account, newest first
    async fn list_payments(&self, account_id: &str) -> Result<Vec<PaymentRecord>, StoreError>;
}
