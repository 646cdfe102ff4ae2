//! Console output formatter for council turn results

use crate::output::formatter::OutputFormatter;
use colored::Colorize;
use council_application::TurnOutput;
use council_domain::position_label;
use serde_json::json;

/// Formats council turn results for console display
pub struct ConsoleFormatter;

impl ConsoleFormatter {
    /// Format the complete turn result
    pub fn format(result: &TurnOutput) -> String {
        let mut output = String::new();

        // Header
        output.push_str(&Self::header("LLM Council Results"));
        output.push('\n');

        // Stage 1: Collected Responses
        output.push_str(&Self::section_header("Stage 1: Collected Responses"));
        for (position, response) in result.stage1.iter().enumerate() {
            output.push_str(&format!(
                "\n{}\n{}\n",
                format!("── {} ({}) ──", position_label(position), response.model)
                    .yellow()
                    .bold(),
                response.response
            ));
        }

        // Stage 2: Peer Rankings (if any)
        if !result.stage2.is_empty() {
            output.push_str(&Self::section_header("Stage 2: Peer Rankings"));
            for ranking in &result.stage2 {
                output.push_str(&format!(
                    "\n{}\n{}\n",
                    format!("── {} ──", ranking.model).yellow().bold(),
                    ranking.ranking
                ));
                if !ranking.parsed_ranking.is_empty() {
                    output.push_str(&format!(
                        "{} {}\n",
                        "Parsed:".dimmed(),
                        ranking.parsed_ranking.join(" > ")
                    ));
                }
            }
        }

        // Aggregate leaderboard (if any ranking parsed)
        if !result.metadata.aggregate_rankings.is_empty() {
            output.push_str(&format!("\n{}\n", "Leaderboard:".cyan().bold()));
            for (position, entry) in result.metadata.aggregate_rankings.iter().enumerate() {
                output.push_str(&format!(
                    "  {}. {} (avg rank {:.2} across {} rankings)\n",
                    position + 1,
                    entry.model,
                    entry.average_rank,
                    entry.rankings_count
                ));
            }
        }

        // Stage 3: Chairman Synthesis
        output.push_str(&Self::section_header("Stage 3: Chairman Synthesis"));
        output.push_str(&format!(
            "\n{}\n\n{}\n",
            format!("Chairman: {}", result.stage3.model).yellow().bold(),
            result.stage3.response
        ));

        output.push_str(&Self::usage_footer(result));
        output.push_str(&Self::footer());

        output
    }

    /// Format as JSON
    pub fn format_json(result: &TurnOutput) -> String {
        let value = json!({
            "stage1": result.stage1,
            "stage2": result.stage2,
            "stage3": result.stage3,
            "metadata": result.metadata,
        });
        serde_json::to_string_pretty(&value).unwrap_or_else(|_| "{}".to_string())
    }

    /// Format the chairman synthesis only (concise output)
    pub fn format_synthesis_only(result: &TurnOutput) -> String {
        let mut output = String::new();

        output.push_str(&format!(
            "{}\n\n",
            "=== LLM Council Synthesis ===".cyan().bold()
        ));

        let models: Vec<String> = result.stage1.iter().map(|r| r.model.to_string()).collect();
        output.push_str(&format!(
            "{} {}\n\n",
            "Council:".dimmed(),
            models.join(", ")
        ));

        output.push_str(&result.stage3.response);
        output.push('\n');

        output
    }

    fn header(title: &str) -> String {
        let line = "=".repeat(60);
        format!("{}\n{:^60}\n{}", line.cyan(), title.bold(), line.cyan())
    }

    fn section_header(title: &str) -> String {
        format!("\n{}\n{}\n", title.cyan().bold(), "-".repeat(40))
    }

    fn usage_footer(result: &TurnOutput) -> String {
        let usage = &result.metadata.usage;
        format!(
            "\n{} {} calls, {} tokens ({} in / {} out), ${:.8}\n",
            "Usage:".cyan().bold(),
            usage.model_calls,
            usage.total_tokens,
            usage.input_tokens,
            usage.output_tokens,
            usage.total_cost
        )
    }

    fn footer() -> String {
        format!("\n{}\n", "=".repeat(60).cyan())
    }
}

impl OutputFormatter for ConsoleFormatter {
    fn format(&self, result: &TurnOutput) -> String {
        Self::format(result)
    }

    fn format_json(&self, result: &TurnOutput) -> String {
        Self::format_json(result)
    }

    fn format_synthesis_only(&self, result: &TurnOutput) -> String {
        Self::format_synthesis_only(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use council_domain::{
        AggregateRanking, CallUsage, Model, Stage1Response, Stage2Ranking, Stage3Synthesis,
        TurnMetadata, UsageSummary,
    };
    use std::collections::BTreeMap;

    fn sample_result() -> TurnOutput {
        let stage1 = vec![
            Stage1Response::new(Model::Gpt51, "Answer one", CallUsage::zero()),
            Stage1Response::new(Model::Grok4, "Answer two", CallUsage::zero()),
        ];
        let stage2 = vec![Stage2Ranking {
            model: Model::Gpt51,
            ranking: "FINAL RANKING:\n1. Response B\n2. Response A".to_string(),
            parsed_ranking: vec!["Response B".to_string(), "Response A".to_string()],
            usage: CallUsage::zero(),
        }];
        let mut label_to_model = BTreeMap::new();
        label_to_model.insert("Response A".to_string(), Model::Gpt51);
        label_to_model.insert("Response B".to_string(), Model::Grok4);
        TurnOutput {
            stage1,
            stage2,
            stage3: Stage3Synthesis::new(Model::Gemini3Pro, "Final answer", CallUsage::zero()),
            metadata: TurnMetadata {
                label_to_model,
                aggregate_rankings: vec![AggregateRanking {
                    model: Model::Grok4,
                    average_rank: 1.0,
                    rankings_count: 1,
                }],
                usage: UsageSummary::empty(),
                title_usage: None,
            },
        }
    }

    #[test]
    fn test_full_format_contains_all_stages() {
        let output = ConsoleFormatter::format(&sample_result());
        assert!(output.contains("Answer one"));
        assert!(output.contains("Answer two"));
        assert!(output.contains("Response B > Response A"));
        assert!(output.contains("Final answer"));
        assert!(output.contains("avg rank 1.00"));
    }

    #[test]
    fn test_synthesis_only_omits_stage1_bodies() {
        let output = ConsoleFormatter::format_synthesis_only(&sample_result());
        assert!(output.contains("Final answer"));
        assert!(!output.contains("Answer one"));
    }

    #[test]
    fn test_json_format_round_trips() {
        let output = ConsoleFormatter::format_json(&sample_result());
        let value: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(value["stage1"][0]["response"], "Answer one");
        assert_eq!(value["stage3"]["response"], "Final answer");
        assert_eq!(
            value["metadata"]["label_to_model"]["Response B"],
            "x-ai/grok-4"
        );
    }
}
