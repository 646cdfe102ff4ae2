//! Prompt templates for the council pipeline

pub mod template;

pub use template::PromptTemplate;
