//! Model value object representing an OpenRouter model id

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// An OpenRouter model identifier (Value Object)
///
/// The council is configured as a list of these; the chairman and the title
/// model are single values. Unknown identifiers are preserved verbatim as
/// [`Model::Custom`] so configuration can reference any OpenRouter model.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Model {
    Gpt51,
    Gemini3Pro,
    ClaudeSonnet45,
    Grok4,
    Gemini25Flash,
    Custom(String),
}

impl Model {
    /// Get the OpenRouter identifier for this model
    pub fn as_str(&self) -> &str {
        match self {
            Model::Gpt51 => "openai/gpt-5.1",
            Model::Gemini3Pro => "google/gemini-3-pro-preview",
            Model::ClaudeSonnet45 => "anthropic/claude-sonnet-4.5",
            Model::Grok4 => "x-ai/grok-4",
            Model::Gemini25Flash => "google/gemini-2.5-flash",
            Model::Custom(s) => s,
        }
    }

    /// The default council membership
    pub fn default_council() -> Vec<Model> {
        vec![
            Model::Gpt51,
            Model::Gemini3Pro,
            Model::ClaudeSonnet45,
            Model::Grok4,
        ]
    }

    /// The default chairman model for Stage 3 synthesis
    pub fn default_chairman() -> Model {
        Model::Gemini3Pro
    }

    /// The default model for conversation title generation
    pub fn default_title_model() -> Model {
        Model::Gemini25Flash
    }
}

impl std::fmt::Display for Model {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Model {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(match s {
            "openai/gpt-5.1" => Model::Gpt51,
            "google/gemini-3-pro-preview" => Model::Gemini3Pro,
            "anthropic/claude-sonnet-4.5" => Model::ClaudeSonnet45,
            "x-ai/grok-4" => Model::Grok4,
            "google/gemini-2.5-flash" => Model::Gemini25Flash,
            other => Model::Custom(other.to_string()),
        })
    }
}

impl Serialize for Model {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Model {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        // FromStr is infallible; unknown ids become Custom(...)
        Ok(s.parse().unwrap_or(Model::Custom(s)))
    }
}
