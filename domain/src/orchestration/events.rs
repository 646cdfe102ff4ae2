//! Streaming turn events.
//!
//! One discrete event per phase start/complete, emitted in strict program
//! order - never reordered or batched. The `type` tag matches the wire
//! format consumed by clients.

use super::phase::TurnState;
use crate::council::results::{
    RankingMetadata, Stage1Response, Stage2Ranking, Stage3Synthesis, TurnMetadata,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TurnEvent {
    Stage1Start,
    Stage1Complete {
        data: Vec<Stage1Response>,
    },
    Stage2Start,
    Stage2Complete {
        data: Vec<Stage2Ranking>,
        metadata: RankingMetadata,
    },
    Stage3Start,
    Stage3Complete {
        data: Stage3Synthesis,
    },
    TitleComplete {
        title: String,
    },
    /// Terminal event of a successful turn
    Complete {
        metadata: TurnMetadata,
        remaining_quota: i64,
    },
    /// Terminal event of a cancelled turn; `state` is where the disconnect
    /// was detected
    Cancelled {
        state: TurnState,
    },
    /// Terminal event of a failed turn
    Error {
        message: String,
    },
}

impl TurnEvent {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TurnEvent::Complete { .. } | TurnEvent::Cancelled { .. } | TurnEvent::Error { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_type_tags() {
        let value = serde_json::to_value(TurnEvent::Stage1Start).unwrap();
        assert_eq!(value["type"], "stage1_start");

        let value = serde_json::to_value(TurnEvent::Error {
            message: "boom".to_string(),
        })
        .unwrap();
        assert_eq!(value["type"], "error");
        assert_eq!(value["message"], "boom");
    }

    #[test]
    fn test_terminal_events() {
        assert!(
            TurnEvent::Cancelled {
                state: TurnState::Stage2
            }
            .is_terminal()
        );
        assert!(!TurnEvent::Stage2Start.is_terminal());
    }
}
