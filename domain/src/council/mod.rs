//! Council domain - stage results, anonymization labels, ranking rules.
//!
//! # Pipeline
//!
//! ```text
//! Stage 1 (collect)   every council model answers the question
//!        |
//! Stage 2 (rank)      answers anonymized as "Response A/B/C..." strictly by
//!                     Stage-1 array position; every model ranks them; the
//!                     parsed positions are averaged per model
//!        |
//! Stage 3 (synthesize) one chairman call combines responses + rankings
//! ```
//!
//! The Stage-1 array order is authoritative: labels are assigned by position
//! and `label_to_model` can be re-derived later from a stored Stage-1 array
//! using the same indexing rule, so the array must never be re-sorted.

pub mod labels;
pub mod ranking;
pub mod results;

pub use labels::{assign_labels, derive_label_map, position_label};
pub use ranking::{aggregate_rankings, parse_ranking};
pub use results::{
    AggregateRanking, RankingMetadata, Stage1Response, Stage2Ranking, Stage3Synthesis,
    TurnMetadata,
};
