//! Turn orchestration vocabulary - phases, controller states, stream events

pub mod events;
pub mod phase;

pub use events::TurnEvent;
pub use phase::{TurnPhase, TurnState};
