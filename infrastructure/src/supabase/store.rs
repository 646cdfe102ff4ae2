//! Supabase conversation store
//!
//! Tables:
//! - `conversations(id, user_id, created_at, title, archived, usage)`
//! - `messages(conversation_id, role, content, attachments, session_id,
//!   stage1, stage2, stage3, created_at)`
//! - `quotas(user_id, balance, updated_at)`
//! - `payments(session_id, event_id, user_id, kind, amount_cents,
//!   created_at)`
//!
//! Message rows are validated into [`StoredMessage`] on load; a row that
//! does not deserialize is an [`StoreError::InvalidRecord`], not silently
//! skipped.

use super::rest::SupabaseRest;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use council_application::ports::conversation_store::{
    ConversationStore, PaymentRecord, StoreError,
};
use council_domain::{
    Conversation, ConversationSummary, QuotaState, StoredMessage, UsageSummary,
};
use reqwest::Method;
use serde_json::{json, Value};
use std::collections::HashMap;
use uuid::Uuid;

pub struct SupabaseStore {
    rest: SupabaseRest,
}

impl SupabaseStore {
    pub fn new(rest: SupabaseRest) -> Self {
        Self { rest }
    }

    async fn conversation_row(&self, id: &str) -> Result<Value, StoreError> {
        let rows = self
            .rest
            .request(
                Method::GET,
                "conversations",
                &[
                    (
                        "select",
                        "id,user_id,created_at,title,archived,usage".to_string(),
                    ),
                    ("id", format!("eq.{}", id)),
                    ("limit", "1".to_string()),
                ],
                None,
                None,
            )
            .await?;
        first_row(rows).ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    fn parse_conversation(row: &Value, messages: Vec<StoredMessage>) -> Result<Conversation, StoreError> {
        Ok(Conversation {
            id: require_str(row, "id")?,
            owner_id: require_str(row, "user_id")?,
            created_at: require_timestamp(row, "created_at")?,
            title: row
                .get("title")
                .and_then(Value::as_str)
                .filter(|t| !t.is_empty())
                .unwrap_or("New Conversation")
                .to_string(),
            archived: row
                .get("archived")
                .and_then(Value::as_bool)
                .unwrap_or(false),
            usage: row
                .get("usage")
                .filter(|v| !v.is_null())
                .map(|v| {
                    serde_json::from_value(v.clone())
                        .map_err(|e| StoreError::InvalidRecord(e.to_string()))
                })
                .transpose()?
                .unwrap_or_default(),
            messages,
        })
    }
}

#[async_trait]
impl ConversationStore for SupabaseStore {
    async fn create_conversation(&self, owner_id: &str) -> Result<Conversation, StoreError> {
        let id = Uuid::new_v4().to_string();
        let rows = self
            .rest
            .request(
                Method::POST,
                "conversations",
                &[],
                Some(&json!({
                    "id": id,
                    "user_id": owner_id,
                    "title": "New Conversation",
                })),
                Some("return=representation"),
            )
            .await?;
        let row = first_row(rows)
            .ok_or_else(|| StoreError::Backend("insert returned no row".to_string()))?;
        Self::parse_conversation(&row, Vec::new())
    }

    async fn get_conversation(&self, id: &str) -> Result<Conversation, StoreError> {
        let row = self.conversation_row(id).await?;

        let message_rows = self
            .rest
            .request(
                Method::GET,
                "messages",
                &[
                    (
                        "select",
                        "role,content,attachments,session_id,stage1,stage2,stage3".to_string(),
                    ),
                    ("conversation_id", format!("eq.{}", id)),
                    ("order", "created_at.asc,id.asc".to_string()),
                ],
                None,
                None,
            )
            .await?;

        let mut messages = Vec::new();
        if let Some(Value::Array(rows)) = message_rows {
            for row in rows {
                messages.push(parse_message_row(row)?);
            }
        }

        Self::parse_conversation(&row, messages)
    }

    async fn list_conversations(
        &self,
        owner_id: &str,
    ) -> Result<Vec<ConversationSummary>, StoreError> {
        let rows = self
            .rest
            .request(
                Method::GET,
                "conversations",
                &[
                    ("select", "id,created_at,title,archived".to_string()),
                    ("user_id", format!("eq.{}", owner_id)),
                    ("order", "created_at.desc".to_string()),
                ],
                None,
                None,
            )
            .await?;
        let Some(Value::Array(rows)) = rows else {
            return Ok(Vec::new());
        };
        if rows.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<String> = rows
            .iter()
            .filter_map(|row| row.get("id").and_then(Value::as_str))
            .map(String::from)
            .collect();
        let message_rows = self
            .rest
            .request(
                Method::GET,
                "messages",
                &[
                    ("select", "conversation_id".to_string()),
                    ("conversation_id", format!("in.({})", ids.join(","))),
                ],
                None,
                None,
            )
            .await?;

        let mut counts: HashMap<String, usize> = HashMap::new();
        if let Some(Value::Array(rows)) = message_rows {
            for row in rows {
                if let Some(id) = row.get("conversation_id").and_then(Value::as_str) {
                    *counts.entry(id.to_string()).or_insert(0) += 1;
                }
            }
        }

        rows.iter()
            .map(|row| {
                let id = require_str(row, "id")?;
                Ok(ConversationSummary {
                    message_count: counts.get(&id).copied().unwrap_or(0),
                    created_at: require_timestamp(row, "created_at")?,
                    title: row
                        .get("title")
                        .and_then(Value::as_str)
                        .filter(|t| !t.is_empty())
                        .unwrap_or("New Conversation")
                        .to_string(),
                    archived: row
                        .get("archived")
                        .and_then(Value::as_bool)
                        .unwrap_or(false),
                    id,
                })
            })
            .collect()
    }

    async fn add_message(&self, id: &str, message: StoredMessage) -> Result<(), StoreError> {
        let mut row = serde_json::to_value(&message)
            .map_err(|e| StoreError::InvalidRecord(e.to_string()))?;
        if let Value::Object(map) = &mut row {
            map.insert("conversation_id".to_string(), json!(id));
        }
        self.rest
            .request(
                Method::POST,
                "messages",
                &[],
                Some(&row),
                Some("return=minimal"),
            )
            .await?;
        Ok(())
    }

    async fn update_title(&self, id: &str, title: &str) -> Result<(), StoreError> {
        self.rest
            .request(
                Method::PATCH,
                "conversations",
                &[("id", format!("eq.{}", id))],
                Some(&json!({ "title": title })),
                Some("return=minimal"),
            )
            .await?;
        Ok(())
    }

    async fn add_usage(&self, id: &str, usage: &UsageSummary) -> Result<(), StoreError> {
        let row = self.conversation_row(id).await?;
        let current: UsageSummary = row
            .get("usage")
            .filter(|v| !v.is_null())
            .map(|v| {
                serde_json::from_value(v.clone())
                    .map_err(|e| StoreError::InvalidRecord(e.to_string()))
            })
            .transpose()?
            .unwrap_or_default();

        let merged = merge_usage(&current, usage);
        self.rest
            .request(
                Method::PATCH,
                "conversations",
                &[("id", format!("eq.{}", id))],
                Some(&json!({ "usage": merged })),
                Some("return=minimal"),
            )
            .await?;
        Ok(())
    }

    async fn set_archived(&self, id: &str, archived: bool) -> Result<(), StoreError> {
        self.rest
            .request(
                Method::PATCH,
                "conversations",
                &[("id", format!("eq.{}", id))],
                Some(&json!({ "archived": archived })),
                Some("return=minimal"),
            )
            .await?;
        Ok(())
    }

    async fn delete_conversation(&self, id: &str) -> Result<(), StoreError> {
        self.rest
            .request(
                Method::DELETE,
                "messages",
                &[("conversation_id", format!("eq.{}", id))],
                None,
                Some("return=minimal"),
            )
            .await?;
        self.rest
            .request(
                Method::DELETE,
                "conversations",
                &[("id", format!("eq.{}", id))],
                None,
                Some("return=minimal"),
            )
            .await?;
        Ok(())
    }

    async fn quota_state(&self, account_id: &str) -> Result<Option<QuotaState>, StoreError> {
        let rows = self
            .rest
            .request(
                Method::GET,
                "quotas",
                &[
                    ("select", "balance,updated_at".to_string()),
                    ("user_id", format!("eq.{}", account_id)),
                    ("limit", "1".to_string()),
                ],
                None,
                None,
            )
            .await?;
        let Some(row) = first_row(rows) else {
            return Ok(None);
        };
        serde_json::from_value(row)
            .map(Some)
            .map_err(|e| StoreError::InvalidRecord(e.to_string()))
    }

    async fn set_quota_state(
        &self,
        account_id: &str,
        state: QuotaState,
    ) -> Result<(), StoreError> {
        self.rest
            .request(
                Method::POST,
                "quotas",
                &[("on_conflict", "user_id".to_string())],
                Some(&json!({
                    "user_id": account_id,
                    "balance": state.balance,
                    "updated_at": state.updated_at,
                })),
                Some("resolution=merge-duplicates,return=minimal"),
            )
            .await?;
        Ok(())
    }

    async fn record_payment(&self, record: PaymentRecord) -> Result<bool, StoreError> {
        let rows = self
            .rest
            .request(
                Method::POST,
                "payments",
                &[("on_conflict", "session_id".to_string())],
                Some(&json!({
                    "session_id": record.session_id,
                    "event_id": record.event_id,
                    "user_id": record.account_id,
                    "kind": record.kind,
                    "amount_cents": record.amount_cents,
                    "created_at": record.created_at,
                })),
                Some("resolution=ignore-duplicates,return=representation"),
            )
            .await?;
        // A duplicate insert returns an empty representation
        Ok(first_row(rows).is_some())
    }

    async fn list_payments(&self, account_id: &str) -> Result<Vec<PaymentRecord>, StoreError> {
        let rows = self
            .rest
            .request(
                Method::GET,
                "payments",
                &[
                    (
                        "select",
                        "session_id,event_id,user_id,kind,amount_cents,created_at".to_string(),
                    ),
                    ("user_id", format!("eq.{}", account_id)),
                    ("order", "created_at.desc".to_string()),
                ],
                None,
                None,
            )
            .await?;
        let Some(Value::Array(rows)) = rows else {
            return Ok(Vec::new());
        };
        rows.into_iter()
            .map(|row| {
                Ok(PaymentRecord {
                    session_id: require_str(&row, "session_id")?,
                    event_id: require_str(&row, "event_id")?,
                    account_id: require_str(&row, "user_id")?,
                    kind: require_str(&row, "kind")?,
                    amount_cents: row
                        .get("amount_cents")
                        .and_then(Value::as_i64)
                        .unwrap_or(0),
                    created_at: require_timestamp(&row, "created_at")?,
                })
            })
            .collect()
    }
}

fn first_row(rows: Option<Value>) -> Option<Value> {
    match rows {
        Some(Value::Array(mut rows)) if !rows.is_empty() => Some(rows.remove(0)),
        _ => None,
    }
}

fn require_str(row: &Value, key: &str) -> Result<String, StoreError> {
    row.get(key)
        .and_then(Value::as_str)
        .map(String::from)
        .ok_or_else(|| StoreError::InvalidRecord(format!("missing column: {}", key)))
}

fn require_timestamp(row: &Value, key: &str) -> Result<DateTime<Utc>, StoreError> {
    let raw = require_str(row, key)?;
    raw.parse()
        .map_err(|_| StoreError::InvalidRecord(format!("bad timestamp in column: {}", key)))
}

/// Validate a message row into the tagged domain shape. Null columns are
/// dropped first so role-specific fields can use their defaults.
fn parse_message_row(row: Value) -> Result<StoredMessage, StoreError> {
    let Value::Object(map) = row else {
        return Err(StoreError::InvalidRecord("message row is not an object".to_string()));
    };
    let cleaned: serde_json::Map<String, Value> =
        map.into_iter().filter(|(_, v)| !v.is_null()).collect();
    serde_json::from_value(Value::Object(cleaned))
        .map_err(|e| StoreError::InvalidRecord(format!("bad message row: {}", e)))
}

fn merge_usage(current: &UsageSummary, delta: &UsageSummary) -> UsageSummary {
    UsageSummary {
        input_tokens: current.input_tokens + delta.input_tokens,
        output_tokens: current.output_tokens + delta.output_tokens,
        total_tokens: current.total_tokens + delta.total_tokens,
        total_cost: ((current.total_cost + delta.total_cost) * 1e8).round() / 1e8,
        model_calls: current.model_calls + delta.model_calls,
    }
}
