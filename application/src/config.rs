//! Resolved runtime configuration.
//!
//! [`CouncilConfig`] is built once at startup (by the infrastructure config
//! loader) and injected into orchestrator components. Business logic never
//! consults ambient configuration.

use chrono_tz::Tz;
use council_domain::{Model, Plan};
use std::time::Duration;

/// Immutable council configuration resolved at startup
#[derive(Debug, Clone)]
pub struct CouncilConfig {
    /// Council membership queried in Stage 1 (and, by default, Stage 2)
    pub council: Vec<Model>,
    /// Fixed, plan-independent chairman for Stage 3
    pub chairman: Model,
    /// Model used for conversation title generation
    pub title_model: Model,
    /// Per-call timeout for council/chairman queries
    pub query_timeout: Duration,
    /// Per-call timeout for title generation
    pub title_timeout: Duration,
    /// FREE plan: queries per account-local day
    pub free_daily_queries: i64,
    /// PRO plan: tokens per account-local day
    pub pro_daily_tokens: i64,
    /// Timezone applied when the caller supplies none (or an invalid one)
    pub default_timezone: Tz,
}

impl Default for CouncilConfig {
    fn default() -> Self {
        Self {
            council: Model::default_council(),
            chairman: Model::default_chairman(),
            title_model: Model::default_title_model(),
            query_timeout: Duration::from_secs(120),
            title_timeout: Duration::from_secs(30),
            free_daily_queries: 3,
            pro_daily_tokens: 2_000_000,
            default_timezone: chrono_tz::UTC,
        }
    }
}

impl CouncilConfig {
    /// Daily limit for a plan, in that plan's unit
    pub fn plan_limit(&self, plan: Plan) -> i64 {
        match plan {
            Plan::Free => self.free_daily_queries,
            Plan::Pro => self.pro_daily_tokens,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_complete() {
        let config = CouncilConfig::default();
        assert_eq!(config.council.len(), 4);
        assert_eq!(config.chairman, Model::Gemini3Pro);
        assert!(config.plan_limit(Plan::Free) > 0);
        assert!(config.plan_limit(Plan::Pro) > config.plan_limit(Plan::Free));
    }
}
