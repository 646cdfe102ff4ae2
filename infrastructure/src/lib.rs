//! Infrastructure layer for llm-council
//!
//! This crate contains adapters that implement the ports defined in the
//! application layer: the OpenRouter model gateway, Supabase storage and
//! identity, Stripe payments, and configuration file loading.

pub mod config;
pub mod logging;
pub mod memory;
pub mod openrouter;
pub mod stripe;
pub mod supabase;

// Re-export commonly used types
pub use config::{ConfigError, ConfigLoader, FileConfig, ResolvedConfig};
pub use logging::JsonlTurnLogger;
pub use memory::InMemoryStore;
pub use openrouter::OpenRouterGateway;
pub use stripe::{StripeClient, WebhookVerifier};
pub use supabase::{SupabaseIdentity, SupabaseStore};
