//! Raw TOML configuration data types
//!
//! These structs represent the exact structure of the TOML config file.
//! Credentials can also come from `COUNCIL_*` environment variables, which
//! the loader merges over file values.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Complete file configuration (raw TOML structure)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    /// Council membership and special-role models
    pub models: FileModelsConfig,
    /// Timeouts, quota limits, and the default timezone
    pub limits: FileLimitsConfig,
    /// OpenRouter credentials
    pub openrouter: FileOpenRouterConfig,
    /// Supabase credentials (optional; the in-memory store is used without)
    pub supabase: FileSupabaseConfig,
    /// Stripe credentials (optional; payments are disabled without)
    pub stripe: FileStripeConfig,
    /// Logging settings
    pub log: FileLogConfig,
}

/// Model selection from TOML (`[models]` section)
///
/// # Example
///
/// ```toml
/// [models]
/// council = ["openai/gpt-5.1", "x-ai/grok-4"]
/// chairman = "google/gemini-3-pro-preview"
/// title = "google/gemini-2.5-flash"
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FileModelsConfig {
    /// Council members queried in stage 1
    pub council: Option<Vec<String>>,
    /// Chairman model for stage 3
    pub chairman: Option<String>,
    /// Title generation model
    pub title: Option<String>,
}

/// Timeouts and quota limits (`[limits]` section)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FileLimitsConfig {
    pub query_timeout_secs: u64,
    pub title_timeout_secs: u64,
    pub free_daily_queries: i64,
    pub pro_daily_tokens: i64,
    /// IANA name used when the caller supplies no timezone
    pub default_timezone: String,
}

impl Default for FileLimitsConfig {
    fn default() -> Self {
        Self {
            query_timeout_secs: 120,
            title_timeout_secs: 30,
            free_daily_queries: 3,
            pro_daily_tokens: 2_000_000,
            default_timezone: "UTC".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FileOpenRouterConfig {
    pub api_key: Option<String>,
    /// Override for testing against a local stub
    pub api_url: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FileSupabaseConfig {
    pub url: Option<String>,
    pub secret_key: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FileStripeConfig {
    pub secret_key: Option<String>,
    pub webhook_secret: Option<String>,
    pub price_id: Option<String>,
    pub redirect_url: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FileLogConfig {
    /// JSONL file receiving every turn event, if set
    pub turn_log: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = FileConfig::default();
        assert!(config.models.council.is_none());
        assert_eq!(config.limits.free_daily_queries, 3);
        assert_eq!(config.limits.default_timezone, "UTC");
        assert!(config.openrouter.api_key.is_none());
    }

    #[test]
    fn test_partial_toml() {
        let toml_str = r#"
[models]
chairman = "google/gemini-3-pro-preview"

[limits]
free_daily_queries = 5

[openrouter]
api_key = "sk-or-test"
"#;
        let config: FileConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(
            config.models.chairman.as_deref(),
            Some("google/gemini-3-pro-preview")
        );
        assert!(config.models.council.is_none());
        assert_eq!(config.limits.free_daily_queries, 5);
        // Untouched fields keep their defaults
        assert_eq!(config.limits.pro_daily_tokens, 2_000_000);
        assert_eq!(config.openrouter.api_key.as_deref(), Some("sk-or-test"));
    }
}
