//! Pipeline phases and streaming-controller states

use serde::{Deserialize, Serialize};

/// Phase of a council turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnPhase {
    /// Stage 1 - every council model answers
    Stage1,
    /// Stage 2 - peer ranking of anonymized answers
    Stage2,
    /// Stage 3 - chairman synthesis
    Stage3,
    /// Background title generation for a conversation's first turn
    Title,
}

impl TurnPhase {
    pub fn as_str(&self) -> &str {
        match self {
            TurnPhase::Stage1 => "stage1",
            TurnPhase::Stage2 => "stage2",
            TurnPhase::Stage3 => "stage3",
            TurnPhase::Title => "title",
        }
    }

    pub fn display_name(&self) -> &str {
        match self {
            TurnPhase::Stage1 => "Stage 1: Collect Responses",
            TurnPhase::Stage2 => "Stage 2: Peer Ranking",
            TurnPhase::Stage3 => "Stage 3: Chairman Synthesis",
            TurnPhase::Title => "Title Generation",
        }
    }
}

impl std::fmt::Display for TurnPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// State of the streaming turn controller.
///
/// Progression is strictly forward; `Cancelled` is reachable from any state
/// when a client disconnect is detected at a stage boundary, and `Error` is
/// the terminal for unhandled failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnState {
    Init,
    UserMessageSaved,
    Stage1,
    Stage2,
    Stage3,
    TitleResolution,
    Persisted,
    Complete,
    Cancelled,
    Error,
}

impl TurnState {
    /// Whether the user message was durably saved before this state.
    pub fn user_message_saved(&self) -> bool {
        !matches!(self, TurnState::Init)
    }

    /// Whether any pipeline stage started before this state.
    pub fn stage_started(&self) -> bool {
        matches!(
            self,
            TurnState::Stage1
                | TurnState::Stage2
                | TurnState::Stage3
                | TurnState::TitleResolution
                | TurnState::Persisted
                | TurnState::Complete
        )
    }
}
