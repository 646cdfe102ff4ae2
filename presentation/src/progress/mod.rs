//! Streaming progress reporting

pub mod reporter;

pub use reporter::{EventReporter, ProgressReporter, SimpleProgress};
