//! Council stage results - immutable value objects for each pipeline stage.
//!
//! These types are created fresh per turn and handed to storage; only
//! [`Stage3Synthesis`] may be amended (title usage, cancellation marker)
//! before persistence.

use crate::core::model::Model;
use crate::usage::{CallUsage, UsageSummary};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Response from a single council model in Stage 1
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stage1Response {
    pub model: Model,
    pub response: String,
    #[serde(default)]
    pub usage: CallUsage,
}

impl Stage1Response {
    pub fn new(model: Model, response: impl Into<String>, usage: CallUsage) -> Self {
        Self {
            model,
            response: response.into(),
            usage,
        }
    }
}

/// One council model's peer evaluation in Stage 2
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stage2Ranking {
    pub model: Model,
    /// Full evaluation text as returned by the model
    pub ranking: String,
    /// Labels parsed from the evaluation text, best first
    pub parsed_ranking: Vec<String>,
    #[serde(default)]
    pub usage: CallUsage,
}

/// Per-model aggregate position across all Stage-2 rankings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateRanking {
    pub model: Model,
    /// Average parsed position, rounded to 2 decimals; lower is better
    pub average_rank: f64,
    pub rankings_count: u32,
}

/// Chairman synthesis result from Stage 3
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stage3Synthesis {
    pub model: Model,
    pub response: String,
    #[serde(default)]
    pub usage: CallUsage,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title_usage: Option<CallUsage>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub cancelled: bool,
}

impl Stage3Synthesis {
    pub fn new(model: Model, response: impl Into<String>, usage: CallUsage) -> Self {
        Self {
            model,
            response: response.into(),
            usage,
            title_usage: None,
            cancelled: false,
        }
    }

    /// Placeholder produced when the chairman call fails; the stage must
    /// always yield something persistable.
    pub fn error_placeholder(chairman: Model) -> Self {
        Self::new(
            chairman,
            "Error: Unable to generate final synthesis.",
            CallUsage::zero(),
        )
    }

    /// Placeholder produced when every Stage-1 call failed.
    pub fn all_failed_placeholder(chairman: Model) -> Self {
        Self::new(
            chairman,
            "All models failed to respond. Please try again.",
            CallUsage::zero(),
        )
    }

    /// Placeholder synthesized when the turn is cancelled before Stage 3
    /// produced a result.
    pub fn cancelled_placeholder(chairman: Model) -> Self {
        let mut synthesis = Self::new(
            chairman,
            "Response generation was cancelled.",
            CallUsage::zero(),
        );
        synthesis.cancelled = true;
        synthesis
    }

    pub fn with_title_usage(mut self, usage: CallUsage) -> Self {
        self.title_usage = Some(usage);
        self
    }

    pub fn is_placeholder(&self) -> bool {
        self.cancelled
            || self.response.starts_with("Error:")
            || self.response.starts_with("All models failed")
    }
}

/// Label-to-model mapping plus aggregate rankings, as emitted mid-stream
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankingMetadata {
    pub label_to_model: BTreeMap<String, Model>,
    pub aggregate_rankings: Vec<AggregateRanking>,
}

/// Complete turn metadata returned by the upward boundary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TurnMetadata {
    pub label_to_model: BTreeMap<String, Model>,
    pub aggregate_rankings: Vec<AggregateRanking>,
    pub usage: UsageSummary,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title_usage: Option<CallUsage>,
}

impl TurnMetadata {
    pub fn empty() -> Self {
        Self {
            label_to_model: BTreeMap::new(),
            aggregate_rankings: Vec::new(),
            usage: UsageSummary::empty(),
            title_usage: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cancelled_placeholder_is_marked() {
        let synthesis = Stage3Synthesis::cancelled_placeholder(Model::Gemini3Pro);
        assert!(synthesis.cancelled);
        assert_eq!(synthesis.usage, CallUsage::zero());
    }

    #[test]
    fn test_cancelled_flag_omitted_when_false() {
        let synthesis = Stage3Synthesis::new(Model::Gemini3Pro, "ok", CallUsage::zero());
        let value = serde_json::to_value(&synthesis).unwrap();
        assert!(value.get("cancelled").is_none());
    }

    #[test]
    fn test_error_placeholder_has_zero_usage() {
        let synthesis = Stage3Synthesis::error_placeholder(Model::Gemini3Pro);
        assert!(synthesis.is_placeholder());
        assert_eq!(synthesis.usage.total_tokens, 0);
    }
}
