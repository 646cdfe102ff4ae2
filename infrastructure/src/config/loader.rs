//! Configuration file loader with multi-source merging

use super::file_config::FileConfig;
use council_application::CouncilConfig;
use council_domain::Model;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] Box<figment::Error>),

    #[error("Missing credential: {0} (set it in the config file or via COUNCIL_{1})")]
    MissingCredential(&'static str, &'static str),

    #[error("Invalid timezone: {0}")]
    InvalidTimezone(String),
}

/// Supabase connection credentials
#[derive(Debug, Clone)]
pub struct SupabaseCredentials {
    pub url: String,
    pub secret_key: String,
}

/// Stripe credentials; all four values are required together
#[derive(Debug, Clone)]
pub struct StripeCredentials {
    pub secret_key: String,
    pub webhook_secret: String,
    pub price_id: String,
    pub redirect_url: String,
}

/// Fully validated runtime configuration
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub council: CouncilConfig,
    pub openrouter_api_key: String,
    pub openrouter_api_url: Option<String>,
    pub supabase: Option<SupabaseCredentials>,
    pub stripe: Option<StripeCredentials>,
    pub turn_log: Option<PathBuf>,
}

/// Configuration loader that handles file discovery and merging
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from all sources with proper priority
    ///
    /// Priority (highest to lowest):
    /// 1. `COUNCIL_*` environment variables (e.g. `COUNCIL_OPENROUTER__API_KEY`)
    /// 2. Explicit config path (if provided)
    /// 3. Project root: `./council.toml` or `./.council.toml`
    /// 4. Global: `~/.config/llm-council/config.toml`
    /// 5. Default values
    pub fn load(config_path: Option<&PathBuf>) -> Result<FileConfig, ConfigError> {
        let mut figment = Figment::new().merge(Serialized::defaults(FileConfig::default()));

        if let Some(global_path) = Self::global_config_path() {
            if global_path.exists() {
                figment = figment.merge(Toml::file(&global_path));
            }
        }

        for filename in &["council.toml", ".council.toml"] {
            let path = PathBuf::from(filename);
            if path.exists() {
                figment = figment.merge(Toml::file(&path));
                break;
            }
        }

        if let Some(path) = config_path {
            figment = figment.merge(Toml::file(path));
        }

        figment = figment.merge(Env::prefixed("COUNCIL_").split("__"));

        figment.extract().map_err(|e| ConfigError::Load(Box::new(e)))
    }

    /// Get the global config file path
    pub fn global_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("llm-council").join("config.toml"))
    }

    /// Validate the raw file config into runtime configuration.
    ///
    /// Fails fast when the OpenRouter key is missing or the timezone does
    /// not parse; Supabase and Stripe credentials are optional blocks that
    /// must each be complete when present.
    pub fn resolve(file: FileConfig) -> Result<ResolvedConfig, ConfigError> {
        let openrouter_api_key = file
            .openrouter
            .api_key
            .filter(|k| !k.trim().is_empty())
            .ok_or(ConfigError::MissingCredential(
                "openrouter.api_key",
                "OPENROUTER__API_KEY",
            ))?;

        let default_timezone = file
            .limits
            .default_timezone
            .parse()
            .map_err(|_| ConfigError::InvalidTimezone(file.limits.default_timezone.clone()))?;

        // Model::from_str is infallible; unknown ids become Custom(...)
        let parse_models = |names: &[String]| -> Vec<Model> {
            names
                .iter()
                .filter(|n| !n.trim().is_empty())
                .map(|n| n.parse().unwrap())
                .collect()
        };

        let council = match &file.models.council {
            Some(names) => {
                let models = parse_models(names);
                if models.is_empty() {
                    Model::default_council()
                } else {
                    models
                }
            }
            None => Model::default_council(),
        };
        let parse_model = |name: &Option<String>, fallback: Model| {
            name.as_deref()
                .map(str::trim)
                .filter(|n| !n.is_empty())
                .map(|n| n.parse().unwrap())
                .unwrap_or(fallback)
        };

        let council_config = CouncilConfig {
            council,
            chairman: parse_model(&file.models.chairman, Model::default_chairman()),
            title_model: parse_model(&file.models.title, Model::default_title_model()),
            query_timeout: Duration::from_secs(file.limits.query_timeout_secs),
            title_timeout: Duration::from_secs(file.limits.title_timeout_secs),
            free_daily_queries: file.limits.free_daily_queries,
            pro_daily_tokens: file.limits.pro_daily_tokens,
            default_timezone,
        };

        let supabase = match (file.supabase.url, file.supabase.secret_key) {
            (Some(url), Some(secret_key))
                if !url.trim().is_empty() && !secret_key.trim().is_empty() =>
            {
                Some(SupabaseCredentials { url, secret_key })
            }
            (Some(_), None) | (None, Some(_)) => {
                return Err(ConfigError::MissingCredential(
                    "supabase.url and supabase.secret_key are required together",
                    "SUPABASE__SECRET_KEY",
                ));
            }
            _ => None,
        };

        let stripe = match (
            file.stripe.secret_key,
            file.stripe.webhook_secret,
            file.stripe.price_id,
            file.stripe.redirect_url,
        ) {
            (Some(secret_key), Some(webhook_secret), Some(price_id), Some(redirect_url)) => {
                Some(StripeCredentials {
                    secret_key,
                    webhook_secret,
                    price_id,
                    redirect_url,
                })
            }
            (None, None, None, None) => None,
            _ => {
                return Err(ConfigError::MissingCredential(
                    "stripe.* values are required together",
                    "STRIPE__SECRET_KEY",
                ));
            }
        };

        Ok(ResolvedConfig {
            council: council_config,
            openrouter_api_key,
            openrouter_api_url: file.openrouter.api_url,
            supabase,
            stripe,
            turn_log: file.log.turn_log,
        })
    }
}
