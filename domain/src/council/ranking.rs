//! Ranking text parsing and aggregation for Stage 2.
//!
//! Stage-2 prompts require a literal `FINAL RANKING:` line followed by a
//! numbered best-to-worst list of labels. Models do not always comply, so
//! parsing degrades in steps rather than failing:
//!
//! 1. take the text after the *last* `FINAL RANKING:` marker and prefer
//!    numbered `<n>. Response <X>` entries in listed order
//! 2. else scan that section for bare `Response <X>` mentions
//! 3. with no marker at all, scan the whole text for `Response <X>`
//!
//! Step 3 can pick up labels mentioned in prose analysis rather than an
//! actual ranking. That best-effort degradation is intentional and covered
//! by tests; do not "fix" it.

use super::results::{AggregateRanking, Stage2Ranking};
use crate::core::model::Model;
use regex::Regex;
use std::collections::BTreeMap;
use std::sync::OnceLock;

const RANKING_MARKER: &str = "FINAL RANKING:";

fn numbered_label_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\d+\.\s*Response [A-Z]").unwrap())
}

fn label_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"Response [A-Z]").unwrap())
}

/// Parse the ranked labels out of a Stage-2 evaluation text, best first.
pub fn parse_ranking(ranking_text: &str) -> Vec<String> {
    if let Some(marker) = ranking_text.rfind(RANKING_MARKER) {
        let section = &ranking_text[marker + RANKING_MARKER.len()..];

        let numbered: Vec<String> = numbered_label_re()
            .find_iter(section)
            .filter_map(|m| label_re().find(m.as_str()))
            .map(|m| m.as_str().to_string())
            .collect();
        if !numbered.is_empty() {
            return numbered;
        }

        return label_re()
            .find_iter(section)
            .map(|m| m.as_str().to_string())
            .collect();
    }

    // No marker: best-effort scan of the whole text
    label_re()
        .find_iter(ranking_text)
        .map(|m| m.as_str().to_string())
        .collect()
}

/// Aggregate parsed rankings into per-model average positions.
///
/// Unknown labels are ignored; models that never received a parsed position
/// are omitted entirely rather than scored worst. Averages are rounded to
/// 2 decimals and the result is sorted ascending (lower is better).
pub fn aggregate_rankings(
    stage2: &[Stage2Ranking],
    label_to_model: &BTreeMap<String, Model>,
) -> Vec<AggregateRanking> {
    // Vec keyed by first appearance keeps the pre-sort order deterministic
    let mut positions: Vec<(Model, Vec<u32>)> = Vec::new();

    for ranking in stage2 {
        for (position, label) in ranking.parsed_ranking.iter().enumerate() {
            let Some(model) = label_to_model.get(label) else {
                continue;
            };
            let position = position as u32 + 1;
            match positions.iter_mut().find(|(m, _)| m == model) {
                Some((_, list)) => list.push(position),
                None => positions.push((model.clone(), vec![position])),
            }
        }
    }

    let mut aggregate: Vec<AggregateRanking> = positions
        .into_iter()
        .map(|(model, list)| {
            let average = list.iter().sum::<u32>() as f64 / list.len() as f64;
            AggregateRanking {
                model,
                average_rank: (average * 100.0).round() / 100.0,
                rankings_count: list.len() as u32,
            }
        })
        .collect();

    aggregate.sort_by(|a, b| {
        a.average_rank
            .partial_cmp(&b.average_rank)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    aggregate
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::usage::CallUsage;

    fn ranking(model: Model, text: &str) -> Stage2Ranking {
        Stage2Ranking {
            model,
            ranking: text.to_string(),
            parsed_ranking: parse_ranking(text),
            usage: CallUsage::zero(),
        }
    }

    fn label_map(models: &[Model]) -> BTreeMap<String, Model> {
        models
            .iter()
            .enumerate()
            .map(|(i, m)| (super::super::labels::position_label(i), m.clone()))
            .collect()
    }

    #[test]
    fn test_parse_numbered_ranking() {
        let text = "Response A is strong.\nResponse B is weak.\n\nFINAL RANKING:\n1. Response B\n2. Response A\n3. Response C";
        assert_eq!(
            parse_ranking(text),
            vec!["Response B", "Response A", "Response C"]
        );
    }

    #[test]
    fn test_parse_uses_last_marker() {
        let text = "FINAL RANKING:\n1. Response A\n\nRevised after reflection.\n\nFINAL RANKING:\n1. Response C\n2. Response A";
        assert_eq!(parse_ranking(text), vec!["Response C", "Response A"]);
    }

    #[test]
    fn test_parse_unnumbered_after_marker() {
        let text = "FINAL RANKING:\nResponse B, then Response A";
        assert_eq!(parse_ranking(text), vec!["Response B", "Response A"]);
    }

    #[test]
    fn test_parse_without_marker_scans_whole_text() {
        // Intentional degradation: prose mentions are captured as a ranking
        let text = "I found Response B most persuasive, though Response A had better sources.";
        assert_eq!(parse_ranking(text), vec!["Response B", "Response A"]);
    }

    #[test]
    fn test_parse_empty_text() {
        assert!(parse_ranking("").is_empty());
    }

    #[test]
    fn test_aggregate_averages_and_sorts() {
        let models = [Model::Gpt51, Model::Gemini3Pro];
        let map = label_map(&models);
        let stage2 = vec![
            ranking(
                Model::Gpt51,
                "FINAL RANKING:\n1. Response B\n2. Response A",
            ),
            ranking(
                Model::Gemini3Pro,
                "FINAL RANKING:\n1. Response A\n2. Response B",
            ),
        ];
        let aggregate = aggregate_rankings(&stage2, &map);
        assert_eq!(aggregate.len(), 2);
        // Both models averaged 1.5 across two rankings
        assert_eq!(aggregate[0].average_rank, 1.5);
        assert_eq!(aggregate[0].rankings_count, 2);
    }

    #[test]
    fn test_aggregate_ignores_unknown_labels() {
        let map = label_map(&[Model::Gpt51]);
        let stage2 = vec![ranking(
            Model::Gpt51,
            "FINAL RANKING:\n1. Response Z\n2. Response A",
        )];
        let aggregate = aggregate_rankings(&stage2, &map);
        assert_eq!(aggregate.len(), 1);
        assert_eq!(aggregate[0].model, Model::Gpt51);
        assert_eq!(aggregate[0].average_rank, 2.0);
    }

    #[test]
    fn test_aggregate_omits_unranked_models() {
        let map = label_map(&[Model::Gpt51, Model::Grok4]);
        let stage2 = vec![ranking(Model::Gpt51, "FINAL RANKING:\n1. Response A")];
        let aggregate = aggregate_rankings(&stage2, &map);
        assert_eq!(aggregate.len(), 1);
        assert_eq!(aggregate[0].model, Model::Gpt51);
    }

    #[test]
    fn test_aggregate_invariant_under_stage1_permutation() {
        // Permuting the Stage-1 array and remapping labels accordingly must
        // yield identical per-model average ranks.
        let order_a = [Model::Gpt51, Model::Gemini3Pro, Model::Grok4];
        let order_b = [Model::Grok4, Model::Gpt51, Model::Gemini3Pro];
        let map_a = label_map(&order_a);
        let map_b = label_map(&order_b);

        // Judges agree: grok best, gpt second, gemini last.
        // Labels differ per ordering.
        let stage2_a = vec![
            ranking(
                Model::Gpt51,
                "FINAL RANKING:\n1. Response C\n2. Response A\n3. Response B",
            ),
            ranking(
                Model::Grok4,
                "FINAL RANKING:\n1. Response C\n2. Response A\n3. Response B",
            ),
        ];
        let stage2_b = vec![
            ranking(
                Model::Gpt51,
                "FINAL RANKING:\n1. Response A\n2. Response B\n3. Response C",
            ),
            ranking(
                Model::Grok4,
                "FINAL RANKING:\n1. Response A\n2. Response B\n3. Response C",
            ),
        ];

        let agg_a = aggregate_rankings(&stage2_a, &map_a);
        let agg_b = aggregate_rankings(&stage2_b, &map_b);

        let ranks = |agg: &[AggregateRanking]| -> BTreeMap<String, f64> {
            agg.iter()
                .map(|e| (e.model.as_str().to_string(), e.average_rank))
                .collect()
        };
        assert_eq!(ranks(&agg_a), ranks(&agg_b));
    }
}
