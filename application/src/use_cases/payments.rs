//! Checkout webhook processing
//!
//! Verifies and decodes a billing webhook through the payment port, then
//! records the event. Redeliveries are detected by their checkout session
//! id and skipped, so one completed checkout upgrades a plan exactly once
//! even when the provider redelivers it under a fresh event id.

use crate::ports::conversation_store::{ConversationStore, PaymentRecord, StoreError};
use crate::ports::payment::{CheckoutCompleted, PaymentError, PaymentPort};
use chrono::Utc;
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

#[derive(Error, Debug)]
pub enum CheckoutError {
    #[error(transparent)]
    Payment(#[from] PaymentError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// What a webhook delivery amounted to
#[derive(Debug, Clone, PartialEq)]
pub enum CheckoutOutcome {
    /// Valid event of a type we do not act on
    Ignored,
    /// Checkout session seen before; nothing changed
    AlreadyProcessed,
    /// First delivery; the caller should apply the plan change
    Completed(CheckoutCompleted),
}

/// Use case for handling billing webhook deliveries
pub struct ProcessCheckoutUseCase<P: PaymentPort, S: ConversationStore> {
    payments: Arc<P>,
    store: Arc<S>,
}

impl<P: PaymentPort, S: ConversationStore> ProcessCheckoutUseCase<P, S> {
    pub fn new(payments: Arc<P>, store: Arc<S>) -> Self {
        Self { payments, store }
    }

    /// Verify a raw webhook delivery and record it idempotently.
    pub async fn handle_webhook(
        &self,
        payload: &[u8],
        signature_header: &str,
    ) -> Result<CheckoutOutcome, CheckoutError> {
        let Some(event) = self.payments.decode_webhook(payload, signature_header)? else {
            return Ok(CheckoutOutcome::Ignored);
        };

        let record = PaymentRecord {
            session_id: event.session_id.clone(),
            event_id: event.event_id.clone(),
            account_id: event.account_id.clone(),
            kind: "checkout.session.completed".to_string(),
            amount_cents: event.amount_cents,
            created_at: Utc::now(),
        };

        if !self.store.record_payment(record).await? {
            info!(session_id = %event.session_id, "webhook redelivery, skipping");
            return Ok(CheckoutOutcome::AlreadyProcessed);
        }

        info!(
            account_id = %event.account_id,
            plan = %event.plan,
            "checkout completed"
        );
        Ok(CheckoutOutcome::Completed(event))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::payment::{CheckoutSession, Subscription};
    use async_trait::async_trait;
    use council_domain::{
        Conversation, ConversationSummary, Plan, QuotaState, StoredMessage, UsageSummary,
    };
    use std::collections::HashSet;
    use std::sync::Mutex;

    struct ScriptedPayments(Option<CheckoutCompleted>);

    #[async_trait]
    impl PaymentPort for ScriptedPayments {
        async fn create_checkout(
            &self,
            _: &str,
            _: Plan,
        ) -> Result<CheckoutSession, PaymentError> {
            Err(PaymentError::Backend("not used".to_string()))
        }

        fn decode_webhook(
            &self,
            _: &[u8],
            signature_header: &str,
        ) -> Result<Option<CheckoutCompleted>, PaymentError> {
            if signature_header == "bad" {
                return Err(PaymentError::InvalidSignature);
            }
            Ok(self.0.clone())
        }

        async fn cancel_subscription(&self, _: &str) -> Result<Subscription, PaymentError> {
            Err(PaymentError::Backend("not used".to_string()))
        }
    }

    #[derive(Default)]
    struct PaymentLog {
        seen: Mutex<HashSet<String>>,
    }

    #[async_trait]
    impl ConversationStore for PaymentLog {
        async fn create_conversation(&self, _: &str) -> Result<Conversation, StoreError> {
            Err(StoreError::Backend("not used".to_string()))
        }
        async fn get_conversation(&self, id: &str) -> Result<Conversation, StoreError> {
            Err(StoreError::NotFound(id.to_string()))
        }
        async fn list_conversations(
            &self,
            _: &str,
        ) -> Result<Vec<ConversationSummary>, StoreError> {
            Ok(Vec::new())
        }
        async fn add_message(&self, _: &str, _: StoredMessage) -> Result<(), StoreError> {
            Ok(())
        }
        async fn update_title(&self, _: &str, _: &str) -> Result<(), StoreError> {
            Ok(())
        }
        async fn add_usage(&self, _: &str, _: &UsageSummary) -> Result<(), StoreError> {
            Ok(())
        }
        async fn set_archived(&self, _: &str, _: bool) -> Result<(), StoreError> {
            Ok(())
        }
        async fn delete_conversation(&self, _: &str) -> Result<(), StoreError> {
            Ok(())
        }
        async fn quota_state(&self, _: &str) -> Result<Option<QuotaState>, StoreError> {
            Ok(None)
        }
        async fn set_quota_state(&self, _: &str, _: QuotaState) -> Result<(), StoreError> {
            Ok(())
        }
        async fn record_payment(&self, record: PaymentRecord) -> Result<bool, StoreError> {
            Ok(self.seen.lock().unwrap().insert(record.session_id))
        }
        async fn list_payments(&self, _: &str) -> Result<Vec<PaymentRecord>, StoreError> {
            Ok(Vec::new())
        }
    }

    fn completed_event() -> CheckoutCompleted {
        CheckoutCompleted {
            event_id: "evt_123".to_string(),
            session_id: "cs_456".to_string(),
            account_id: "acct-1".to_string(),
            plan: Plan::Pro,
            amount_cents: 2000,
        }
    }

    #[tokio::test]
    async fn test_first_delivery_completes() {
        let use_case = ProcessCheckoutUseCase::new(
            Arc::new(ScriptedPayments(Some(completed_event()))),
            Arc::new(PaymentLog::default()),
        );

        let outcome = use_case.handle_webhook(b"{}", "ok").await.unwrap();
        assert_eq!(outcome, CheckoutOutcome::Completed(completed_event()));
    }

    #[tokio::test]
    async fn test_redelivery_is_skipped() {
        let use_case = ProcessCheckoutUseCase::new(
            Arc::new(ScriptedPayments(Some(completed_event()))),
            Arc::new(PaymentLog::default()),
        );

        use_case.handle_webhook(b"{}", "ok").await.unwrap();
        let outcome = use_case.handle_webhook(b"{}", "ok").await.unwrap();
        assert_eq!(outcome, CheckoutOutcome::AlreadyProcessed);
    }

    #[tokio::test]
    async fn test_redelivery_under_fresh_event_id_is_skipped() {
        let store = Arc::new(PaymentLog::default());
        let first = ProcessCheckoutUseCase::new(
            Arc::new(ScriptedPayments(Some(completed_event()))),
            Arc::clone(&store),
        );
        first.handle_webhook(b"{}", "ok").await.unwrap();

        // Same checkout session, new provider event id
        let mut event = completed_event();
        event.event_id = "evt_124".to_string();
        let second = ProcessCheckoutUseCase::new(Arc::new(ScriptedPayments(Some(event))), store);
        let outcome = second.handle_webhook(b"{}", "ok").await.unwrap();
        assert_eq!(outcome, CheckoutOutcome::AlreadyProcessed);
    }

    #[tokio::test]
    async fn test_unhandled_event_type_ignored() {
        let use_case = ProcessCheckoutUseCase::new(
            Arc::new(ScriptedPayments(None)),
            Arc::new(PaymentLog::default()),
        );

        let outcome = use_case.handle_webhook(b"{}", "ok").await.unwrap();
        assert_eq!(outcome, CheckoutOutcome::Ignored);
    }

    #[tokio::test]
    async fn test_bad_signature_propagates() {
        let use_case = ProcessCheckoutUseCase::new(
            Arc::new(ScriptedPayments(Some(completed_event()))),
            Arc::new(PaymentLog::default()),
        );

        let err = use_case.handle_webhook(b"{}", "bad").await.unwrap_err();
        assert!(matches!(
            err,
            CheckoutError::Payment(PaymentError::InvalidSignature)
        ));
    }
}
