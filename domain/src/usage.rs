//! Token/cost accounting for model calls.
//!
//! Upstream backends disagree on usage payload keys (`input_tokens` vs
//! `prompt_tokens`, `cost` vs `total_cost`) and occasionally return
//! non-numeric values. [`CallUsage::from_value`] normalizes all of that into
//! one shape; [`UsageSummary`] is a pure summation over the calls of a turn.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Normalized usage for a single model call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallUsage {
    #[serde(default)]
    pub input_tokens: i64,
    #[serde(default)]
    pub output_tokens: i64,
    #[serde(default)]
    pub total_tokens: i64,
    #[serde(default)]
    pub cost: Option<f64>,
}

impl CallUsage {
    pub fn zero() -> Self {
        Self {
            input_tokens: 0,
            output_tokens: 0,
            total_tokens: 0,
            cost: None,
        }
    }

    /// Normalize a raw usage payload across key variants.
    ///
    /// A present key wins over its alias even when its value is unusable;
    /// non-numeric values count as 0. `total_tokens` is recomputed from the
    /// parts when absent or non-positive.
    pub fn from_value(raw: Option<&Value>) -> Self {
        let Some(Value::Object(usage)) = raw else {
            return Self::zero();
        };

        let input_tokens = to_int(usage.get("input_tokens").or(usage.get("prompt_tokens")));
        let output_tokens = to_int(
            usage
                .get("output_tokens")
                .or(usage.get("completion_tokens")),
        );
        let mut total_tokens = to_int(usage.get("total_tokens"));
        if total_tokens <= 0 {
            total_tokens = input_tokens + output_tokens;
        }

        let cost = ["cost", "total_cost"]
            .iter()
            .find_map(|key| to_float(usage.get(*key)));

        Self {
            input_tokens,
            output_tokens,
            total_tokens,
            cost,
        }
    }
}

impl Default for CallUsage {
    fn default() -> Self {
        Self::zero()
    }
}

/// Best-effort integer conversion; anything non-numeric counts as 0.
fn to_int(value: Option<&Value>) -> i64 {
    match value {
        Some(Value::Number(n)) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f as i64))
            .unwrap_or(0),
        Some(Value::String(s)) => s.trim().parse().unwrap_or(0),
        Some(Value::Bool(b)) => *b as i64,
        _ => 0,
    }
}

/// Best-effort float conversion; `None` when the value is not numeric.
fn to_float(value: Option<&Value>) -> Option<f64> {
    match value {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse().ok(),
        Some(Value::Bool(b)) => Some(*b as i64 as f64),
        _ => None,
    }
}

/// Aggregated usage across all model calls of one turn
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsageSummary {
    #[serde(default)]
    pub input_tokens: i64,
    #[serde(default)]
    pub output_tokens: i64,
    #[serde(default)]
    pub total_tokens: i64,
    #[serde(default)]
    pub total_cost: f64,
    #[serde(default)]
    pub model_calls: u32,
}

impl UsageSummary {
    pub fn empty() -> Self {
        Self {
            input_tokens: 0,
            output_tokens: 0,
            total_tokens: 0,
            total_cost: 0.0,
            model_calls: 0,
        }
    }

    /// Sum usage over the given calls.
    ///
    /// Cost accumulates at full precision and is rounded to 8 decimals
    /// exactly once, here at the end. An empty iterator yields the all-zero
    /// summary.
    pub fn of_calls<'a, I>(calls: I) -> Self
    where
        I: IntoIterator<Item = &'a CallUsage>,
    {
        let mut summary = Self::empty();
        for usage in calls {
            summary.add(usage);
        }
        summary.total_cost = round_cost(summary.total_cost);
        summary
    }

    /// Fold one more call into an already-rounded summary, re-rounding.
    ///
    /// Used for the title-generation call that joins after the main pipeline.
    pub fn fold_call(mut self, usage: &CallUsage) -> Self {
        self.add(usage);
        self.total_cost = round_cost(self.total_cost);
        self
    }

    fn add(&mut self, usage: &CallUsage) {
        self.input_tokens += usage.input_tokens;
        self.output_tokens += usage.output_tokens;
        self.total_tokens += usage.total_tokens;
        if let Some(cost) = usage.cost {
            self.total_cost += cost;
        }
        self.model_calls += 1;
    }
}

impl Default for UsageSummary {
    fn default() -> Self {
        Self::empty()
    }
}

fn round_cost(cost: f64) -> f64 {
    (cost * 1e8).round() / 1e8
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_normalize_openai_style_keys() {
        let raw = json!({"prompt_tokens": 10, "completion_tokens": 5, "total_tokens": 15});
        let usage = CallUsage::from_value(Some(&raw));
        assert_eq!(usage.input_tokens, 10);
        assert_eq!(usage.output_tokens, 5);
        assert_eq!(usage.total_tokens, 15);
        assert_eq!(usage.cost, None);
    }

    #[test]
    fn test_normalize_prefers_canonical_keys() {
        let raw = json!({"input_tokens": 7, "prompt_tokens": 99, "output_tokens": 3});
        let usage = CallUsage::from_value(Some(&raw));
        assert_eq!(usage.input_tokens, 7);
        assert_eq!(usage.output_tokens, 3);
    }

    #[test]
    fn test_normalize_recomputes_missing_total() {
        let raw = json!({"input_tokens": 4, "output_tokens": 6, "total_tokens": 0});
        let usage = CallUsage::from_value(Some(&raw));
        assert_eq!(usage.total_tokens, 10);
    }

    #[test]
    fn test_normalize_non_numeric_counts_as_zero() {
        let raw = json!({"input_tokens": "abc", "output_tokens": null, "cost": "oops"});
        let usage = CallUsage::from_value(Some(&raw));
        assert_eq!(usage.input_tokens, 0);
        assert_eq!(usage.output_tokens, 0);
        assert_eq!(usage.total_tokens, 0);
        assert_eq!(usage.cost, None);
    }

    #[test]
    fn test_normalize_cost_fallback_key() {
        let raw = json!({"total_cost": 0.001234});
        let usage = CallUsage::from_value(Some(&raw));
        assert_eq!(usage.cost, Some(0.001234));
    }

    #[test]
    fn test_normalize_non_object_payload() {
        assert_eq!(CallUsage::from_value(None), CallUsage::zero());
        let raw = json!("not usage");
        assert_eq!(CallUsage::from_value(Some(&raw)), CallUsage::zero());
    }

    #[test]
    fn test_empty_summary_is_all_zero() {
        let summary = UsageSummary::of_calls([]);
        assert_eq!(summary, UsageSummary::empty());
        assert_eq!(summary.total_cost, 0.0);
        assert_eq!(summary.model_calls, 0);
    }

    #[test]
    fn test_summary_sums_and_counts_calls() {
        let a = CallUsage {
            input_tokens: 10,
            output_tokens: 20,
            total_tokens: 30,
            cost: Some(0.000000015),
        };
        let b = CallUsage {
            input_tokens: 1,
            output_tokens: 2,
            total_tokens: 3,
            cost: None,
        };
        let summary = UsageSummary::of_calls([&a, &b]);
        assert_eq!(summary.input_tokens, 11);
        assert_eq!(summary.output_tokens, 22);
        assert_eq!(summary.total_tokens, 33);
        assert_eq!(summary.model_calls, 2);
        // Rounded once, to 8 decimals
        assert_eq!(summary.total_cost, 0.00000002);
    }

    #[test]
    fn test_fold_call_re_rounds() {
        let base = UsageSummary::of_calls([&CallUsage {
            input_tokens: 1,
            output_tokens: 1,
            total_tokens: 2,
            cost: Some(0.00000001),
        }]);
        let title = CallUsage {
            input_tokens: 5,
            output_tokens: 5,
            total_tokens: 10,
            cost: Some(0.000000006),
        };
        let folded = base.fold_call(&title);
        assert_eq!(folded.total_tokens, 12);
        assert_eq!(folded.model_calls, 2);
        assert_eq!(folded.total_cost, 0.00000002);
    }
}
