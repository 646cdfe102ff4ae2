//! CLI command definitions

use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// Output format for council results
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    /// Full formatted output with all stages
    Full,
    /// Only the chairman synthesis
    Synthesis,
    /// JSON output
    Json,
}

/// CLI arguments for llm-council
#[derive(Parser, Debug)]
#[command(name = "llm-council")]
#[command(author, version, about = "LLM Council - parallel answers, peer ranking, chairman synthesis")]
#[command(long_about = r#"
llm-council runs a council of LLMs over OpenRouter to answer a question.

Each turn has three stages:
1. Collect Responses: every council model answers the question in parallel
2. Peer Ranking: each model ranks the anonymized answers of its peers
3. Chairman Synthesis: a fixed chairman model writes the final answer

Configuration files are loaded from (in priority order):
1. COUNCIL_* environment variables
2. --config <path>     Explicit config file
3. ./council.toml      Project-level config
4. ~/.config/llm-council/config.toml   Global config

Example:
  llm-council "What's the best way to handle errors in Rust?"
  llm-council -m openai/gpt-5.1 -m x-ai/grok-4 "Compare async/await patterns"
  llm-council --stream "Summarize the CAP theorem"
"#)]
pub struct Cli {
    /// The question to ask the council
    pub question: Option<String>,

    /// Run the full streaming pipeline with persistence and quota metering
    #[arg(long)]
    pub stream: bool,

    /// Models to include in the council (can be specified multiple times)
    #[arg(short, long, value_name = "MODEL")]
    pub model: Vec<String>,

    /// Model to use as chairman for the final synthesis
    #[arg(long, value_name = "MODEL")]
    pub chairman: Option<String>,

    /// Correlation id threaded through every model call
    #[arg(long, value_name = "ID")]
    pub session_id: Option<String>,

    /// IANA timezone for quota day boundaries (stream mode)
    #[arg(long, value_name = "TZ")]
    pub timezone: Option<String>,

    /// Meter tokens instead of queries in stream mode
    #[arg(long)]
    pub pro: bool,

    /// Output format
    #[arg(short, long, value_enum, default_value = "synthesis")]
    pub output: OutputFormat,

    /// Verbosity level (-v = info, -vv = debug, -vvv = trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress progress indicators
    #[arg(short, long)]
    pub quiet: bool,

    /// Path to configuration file
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Show configuration file locations and exit
    #[arg(long)]
    pub show_config: bool,
}
