//! Core copy operations.
//!
//! [`copy`] and [`copy_job`] fan one source out to many targets;
//! [`copy_all`] drives many jobs with bounded parallelism.

mod fanout;
mod outcome;
mod recursive;

// Re-export public API
pub use fanout::{copy, copy_job};
pub use outcome::{CopyJob, CopyOutcome};
pub use recursive::{CopyReport, CopyStats, copy_all, copy_all_with_stats};
