//! Use case implementations

pub mod payments;
pub mod quota;
pub mod run_council;
pub(crate) mod shared;
pub mod stream_turn;
pub mod title;
