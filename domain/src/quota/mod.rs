//! Daily quota rules.
//!
//! One mechanism serves both plan policies: an integer balance that snaps
//! back to the plan's daily limit once per account-local calendar day. The
//! reset comparison uses the caller's IANA timezone; consumption is a
//! floor-clamped decrement. FREE accounts spend `queries` units, PRO
//! accounts spend `tokens`.
//!
//! The balance row is mutated read-then-write without pessimistic locking:
//! concurrent requests racing a day boundary may each independently reset.
//! That is an accepted approximation, not a defect.

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

/// Billing plan attached to an account
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Plan {
    Free,
    Pro,
}

impl Plan {
    pub fn as_str(&self) -> &str {
        match self {
            Plan::Free => "free",
            Plan::Pro => "pro",
        }
    }

    /// The unit this plan's daily limit is denominated in
    pub fn unit(&self) -> QuotaUnit {
        match self {
            Plan::Free => QuotaUnit::Queries,
            Plan::Pro => QuotaUnit::Tokens,
        }
    }

    /// Suggested client action when the quota is exhausted
    pub fn exhausted_action(&self) -> &'static str {
        match self {
            Plan::Free => "upgrade",
            Plan::Pro => "wait_for_reset",
        }
    }

    /// Parse a plan from identity metadata; anything unrecognized is FREE.
    pub fn from_metadata(value: Option<&str>) -> Plan {
        match value.map(str::trim) {
            Some("pro") => Plan::Pro,
            _ => Plan::Free,
        }
    }
}

impl std::fmt::Display for Plan {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuotaUnit {
    Queries,
    Tokens,
}

impl QuotaUnit {
    pub fn as_str(&self) -> &str {
        match self {
            QuotaUnit::Queries => "queries",
            QuotaUnit::Tokens => "tokens",
        }
    }
}

/// Persisted per-account balance row
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QuotaState {
    pub balance: i64,
    pub updated_at: DateTime<Utc>,
}

/// Structured detail carried by a blocking quota rejection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuotaExceeded {
    pub code: String,
    pub plan: Plan,
    pub unit: QuotaUnit,
    pub limit: i64,
    pub remaining: i64,
    pub action: String,
    pub timezone: String,
    pub reset_at: DateTime<Utc>,
}

impl QuotaExceeded {
    pub fn new(plan: Plan, limit: i64, remaining: i64, tz: Tz, now: DateTime<Utc>) -> Self {
        Self {
            code: "quota_exceeded".to_string(),
            plan,
            unit: plan.unit(),
            limit,
            remaining: remaining.max(0),
            action: plan.exhausted_action().to_string(),
            timezone: tz.name().to_string(),
            reset_at: next_reset_at(now, tz),
        }
    }
}

/// Resolve an IANA timezone name, falling back to the default when the name
/// is absent or unparseable.
pub fn resolve_timezone(name: Option<&str>, default: Tz) -> Tz {
    name.and_then(|n| n.trim().parse().ok()).unwrap_or(default)
}

/// Whether the balance row is stale: its local calendar date under `tz`
/// differs from the local date of `now`.
pub fn needs_reset(last_update: DateTime<Utc>, now: DateTime<Utc>, tz: Tz) -> bool {
    last_update.with_timezone(&tz).date_naive() != now.with_timezone(&tz).date_naive()
}

/// Instant of the next local midnight under `tz`.
///
/// Degenerate calendar edges fall back to `now`, which only makes the
/// advertised reset earlier than reality.
pub fn next_reset_at(now: DateTime<Utc>, tz: Tz) -> DateTime<Utc> {
    let local_date = now.with_timezone(&tz).date_naive();
    let Some(next_day) = local_date.succ_opt() else {
        return now;
    };
    let Some(midnight) = next_day.and_hms_opt(0, 0, 0) else {
        return now;
    };
    match midnight.and_local_timezone(tz).earliest() {
        Some(instant) => instant.with_timezone(&Utc),
        None => now,
    }
}
