//! Output formatter trait

use council_application::TurnOutput;

/// Trait for formatting council turn results
pub trait OutputFormatter {
    /// Format the complete turn result
    fn format(&self, result: &TurnOutput) -> String;

    /// Format as JSON
    fn format_json(&self, result: &TurnOutput) -> String;

    /// Format the chairman synthesis only (concise output)
    fn format_synthesis_only(&self, result: &TurnOutput) -> String;
}
