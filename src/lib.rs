//! # fancopy
//!
//! Multi-destination copying for Rust: one source stream, many targets,
//! one well-defined outcome.
//!
//! ## Core Features
//!
//! - **Single read, many writes**: each chunk is read once and written to
//!   every target in order, so memory per copy is one chunk
//! - **Failure policies**: abort on the first failing target
//!   ([`FailurePolicy::FailFast`]) or isolate it and keep the rest going
//!   ([`FailurePolicy::BestEffort`])
//! - **Exactly-once close**: every opened target is closed exactly once on
//!   every path, success or failure
//! - **Truncation detection**: a source that ends early is an error, never a
//!   short success
//! - **Checksum verification**: SHA-256 computed while streaming when the
//!   source or job declares a digest
//! - **Bounded parallelism**: recursive copies run at most `parallel` jobs at
//!   once on a rayon pool, pulling jobs lazily
//! - **Cancellation**: checked at every chunk boundary
//! - **Pluggable storage**: the engine only sees [`Resolver`], [`SourceHandle`]
//!   and [`TargetHandle`]; [`LocalFs`] covers local paths
//!
//! ## Quick Start with Builder API
//!
//! ```no_run
//! use fancopy::CopyBuilder;
//!
//! let report = CopyBuilder::new("disk.img", ["/mnt/a/disk.img", "/mnt/b/disk.img"])
//!     .fail_fast()
//!     .run()?;
//! if !report.is_success() {
//!     for error in report.errors() {
//!         eprintln!("{error}");
//!     }
//! }
//! # Ok::<(), std::io::Error>(())
//! ```
//!
//! ## Function API
//!
//! [`copy`] works on handles you opened yourself:
//!
//! ```
//! use fancopy::{copy, CopyOptions, NoProgress, SourceHandle, TargetHandle, WriterSink};
//!
//! let data = b"payload".to_vec();
//! let source = SourceHandle::new("mem://src", std::io::Cursor::new(data), 7);
//! let targets = vec![
//!     TargetHandle::new("mem://one", WriterSink::new(Vec::new())),
//!     TargetHandle::new("mem://two", WriterSink::new(Vec::new())),
//! ];
//!
//! let outcome = copy(source, targets, &NoProgress, &CopyOptions::default());
//! assert!(outcome.is_success());
//! ```
//!
//! [`copy_job`] opens through a [`Resolver`], and [`copy_all`] drives a lazy
//! sequence of jobs such as [`DirJobs`]:
//!
//! ```no_run
//! use fancopy::{copy_all, CopyOptions, DirJobs, LocalFs, NoProgress};
//!
//! let jobs = DirJobs::new("data", ["backup-a", "backup-b"])?;
//! let options = CopyOptions::default().with_parallel(8);
//! for (job, outcome) in copy_all(jobs, &LocalFs::new(), &NoProgress, &options) {
//!     if !outcome.is_success() {
//!         eprintln!("{} failed", job.source_url());
//!     }
//! }
//! # Ok::<(), std::io::Error>(())
//! ```
//!
//! ## Error Messages
//!
//! Every failure renders as `<action> with following reason: [<reason>]`,
//! for example:
//!
//! ```text
//! Writing to target URL: [/mnt/b/disk.img] failed with following reason: [No space left on device (os error 28)]
//! ```
//!
//! ## Optional Features
//!
//! | Feature | Description |
//! |---------|-------------|
//! | `progress` | Progress bar support with indicatif |
//! | `serde` | Serialize/Deserialize for [`CopyOptions`] and friends |
//! | `full` | Enable all optional features |

#![cfg_attr(docsrs, feature(doc_cfg))]

mod builder;
mod copy;
mod error;
mod handle;
mod local;
mod options;
mod progress;

#[cfg(test)]
mod testing;

pub use builder::CopyBuilder;
pub use copy::{
    CopyJob, CopyOutcome, CopyReport, CopyStats, copy, copy_all, copy_all_with_stats, copy_job,
};
pub use error::{Cause, Error, ErrorKind, Phase, is_no_space_error};
pub use handle::{Resolver, Sink, SourceHandle, TargetHandle, WriterSink};
pub use local::{DirJobs, LocalFs, path_to_url, url_to_path};
pub use options::{CopyOptions, DEFAULT_BUFFER_SIZE, FailurePolicy};
pub use progress::{AtomicProgress, NoProgress, ProgressSink};

#[cfg(feature = "progress")]
#[cfg_attr(docsrs, doc(cfg(feature = "progress")))]
pub use progress::create_progress_bar;
