//! OpenRouter adapter
//!
//! Implements the model gateway port against the OpenRouter
//! chat-completions API.

pub mod gateway;
pub mod types;

pub use gateway::OpenRouterGateway;
