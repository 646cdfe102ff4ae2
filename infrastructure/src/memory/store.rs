//! In-memory conversation store
//!
//! Backs local runs without Supabase credentials. State lives for the
//! process lifetime only.

use async_trait::async_trait;
use chrono::Utc;
use council_application::ports::conversation_store::{
    ConversationStore, PaymentRecord, StoreError,
};
use council_domain::{
    Conversation, ConversationSummary, QuotaState, StoredMessage, UsageSummary,
};
use std::collections::HashMap;
use std::sync::Mutex;
use uuid::Uuid;

#[derive(Default)]
struct State {
    conversations: HashMap<String, Conversation>,
    quotas: HashMap<String, QuotaState>,
    payments: Vec<PaymentRecord>,
}

/// Process-local store for offline use and tests
#[derive(Default)]
pub struct InMemoryStore {
    state: Mutex<State>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_conversation<T>(
        &self,
        id: &str,
        f: impl FnOnce(&mut Conversation) -> T,
    ) -> Result<T, StoreError> {
        let mut state = self.lock();
        let conversation = state
            .conversations
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        Ok(f(conversation))
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        // A poisoned lock means a panic mid-mutation; the data is still
        // usable for a best-effort local store
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl ConversationStore for InMemoryStore {
    async fn create_conversation(&self, owner_id: &str) -> Result<Conversation, StoreError> {
        let conversation = Conversation {
            id: Uuid::new_v4().to_string(),
            owner_id: owner_id.to_string(),
            created_at: Utc::now(),
            title: "New Conversation".to_string(),
            archived: false,
            messages: Vec::new(),
            usage: UsageSummary::empty(),
        };
        self.lock()
            .conversations
            .insert(conversation.id.clone(), conversation.clone());
        Ok(conversation)
    }

    async fn get_conversation(&self, id: &str) -> Result<Conversation, StoreError> {
        self.lock()
            .conversations
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    async fn list_conversations(
        &self,
        owner_id: &str,
    ) -> Result<Vec<ConversationSummary>, StoreError> {
        let state = self.lock();
        let mut summaries: Vec<ConversationSummary> = state
            .conversations
            .values()
            .filter(|c| c.owner_id == owner_id)
            .map(|c| ConversationSummary {
                id: c.id.clone(),
                created_at: c.created_at,
                title: c.title.clone(),
                archived: c.archived,
                message_count: c.messages.len(),
            })
            .collect();
        summaries.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(summaries)
    }

    async fn add_message(&self, id: &str, message: StoredMessage) -> Result<(), StoreError> {
        self.with_conversation(id, |c| c.messages.push(message))
    }

    async fn update_title(&self, id: &str, title: &str) -> Result<(), StoreError> {
        self.with_conversation(id, |c| c.title = title.to_string())
    }

    async fn add_usage(&self, id: &str, usage: &UsageSummary) -> Result<(), StoreError> {
        self.with_conversation(id, |c| {
            c.usage.input_tokens += usage.input_tokens;
            c.usage.output_tokens += usage.output_tokens;
            c.usage.total_tokens += usage.total_tokens;
            c.usage.total_cost =
                ((c.usage.total_cost + usage.total_cost) * 1e8).round() / 1e8;
            c.usage.model_calls += usage.model_calls;
        })
    }

    async fn set_archived(&self, id: &str, archived: bool) -> Result<(), StoreError> {
        self.with_conversation(id, |c| c.archived = archived)
    }

    async fn delete_conversation(&self, id: &str) -> Result<(), StoreError> {
        self.lock()
            .conversations
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    async fn quota_state(&self, account_id: &str) -> Result<Option<QuotaState>, StoreError> {
        Ok(self.lock().quotas.get(account_id).copied())
    }

    async fn set_quota_state(
        &self,
        account_id: &str,
        state: QuotaState,
    ) -> Result<(), StoreError> {
        self.lock().quotas.insert(account_id.to_string(), state);
        Ok(())
    }

    async fn record_payment(&self, record: PaymentRecord) -> Result<bool, StoreError> {
        let mut state = self.lock();
        if state
            .payments
            .iter()
            .any(|p| p.session_id == record.session_id)
        {
            return Ok(false);
        }
        state.payments.push(record);
        Ok(true)
    }

    async fn list_payments(&self, account_id: &str) -> Result<Vec<PaymentRecord>, StoreError> {
        let state = self.lock();
        let mut payments: Vec<PaymentRecord> = state
            .payments
            .iter()
            .filter(|p| p.account_id == account_id)
            .cloned()
            .collect();
        payments.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(payments)
    }
}
