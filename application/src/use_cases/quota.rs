//! Daily quota ledger
//!
//! Applies the domain's reset rules against the stored balance row. A stale
//! row is snapped back to the plan's daily limit and written back when it is
//! read, so its date advances with the account's local day. Reads and writes
//! are not atomic; concurrent turns racing a day boundary may each reset,
//! which is accepted.

use crate::config::CouncilConfig;
use crate::ports::conversation_store::{ConversationStore, StoreError};
use chrono::Utc;
use chrono_tz::Tz;
use council_domain::{needs_reset, Plan, QuotaExceeded, QuotaState};
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum QuotaError {
    #[error("Daily quota exceeded")]
    Exceeded(QuotaExceeded),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Per-account daily balance bookkeeping
pub struct QuotaLedger<S: ConversationStore> {
    store: Arc<S>,
    config: CouncilConfig,
}

impl<S: ConversationStore> QuotaLedger<S> {
    pub fn new(store: Arc<S>, config: CouncilConfig) -> Self {
        Self { store, config }
    }

    /// Remaining balance in the plan's unit, never negative. A missing row
    /// reads as the full daily limit; a stale row is reset and written back.
    pub async fn remaining(
        &self,
        account_id: &str,
        plan: Plan,
        tz: Tz,
    ) -> Result<i64, QuotaError> {
        let limit = self.config.plan_limit(plan);
        let now = Utc::now();

        let balance = match self.store.quota_state(account_id).await? {
            Some(state) if !needs_reset(state.updated_at, now, tz) => state.balance,
            Some(_) => {
                // Materialize the day reset so the row's date advances
                let state = QuotaState {
                    balance: limit,
                    updated_at: now,
                };
                self.store.set_quota_state(account_id, state).await?;
                limit
            }
            None => limit,
        };

        Ok(balance.max(0))
    }

    /// Reject with structured detail when nothing is left to spend.
    pub async fn check(&self, account_id: &str, plan: Plan, tz: Tz) -> Result<i64, QuotaError> {
        let remaining = self.remaining(account_id, plan, tz).await?;
        if remaining <= 0 {
            let limit = self.config.plan_limit(plan);
            return Err(QuotaError::Exceeded(QuotaExceeded::new(
                plan,
                limit,
                remaining,
                tz,
                Utc::now(),
            )));
        }
        Ok(remaining)
    }

    /// Spend `amount` units, clamping the balance at zero, and persist the
    /// new row. Returns the new balance.
    pub async fn consume(
        &self,
        account_id: &str,
        plan: Plan,
        amount: i64,
        tz: Tz,
    ) -> Result<i64, QuotaError> {
        let limit = self.config.plan_limit(plan);
        let now = Utc::now();

        let balance = match self.store.quota_state(account_id).await? {
            Some(state) if !needs_reset(state.updated_at, now, tz) => state.balance,
            _ => limit,
        };

        let new_balance = (balance - amount).max(0);
        debug!(
            account_id,
            plan = plan.as_str(),
            amount,
            new_balance,
            "consuming quota"
        );

        self.store
            .set_quota_state(
                account_id,
                QuotaState {
                    balance: new_balance,
                    updated_at: now,
                },
            )
            .await?;

        Ok(new_balance)
    }
}
