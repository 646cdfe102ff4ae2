//! Configuration loading
//!
//! Raw TOML structure in [`file_config`], multi-source merging and
//! credential validation in [`loader`].

pub mod file_config;
pub mod loader;

pub use file_config::{
    FileConfig, FileLimitsConfig, FileLogConfig, FileModelsConfig, FileOpenRouterConfig,
    FileStripeConfig, FileSupabaseConfig,
};
pub use loader::{
    ConfigError, ConfigLoader, ResolvedConfig, StripeCredentials, SupabaseCredentials,
};
