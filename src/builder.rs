//! Builder API for ergonomic copying operations.
//!
//! The builder pattern provides a fluent interface for configuring and
//! executing copies between local paths. This is often more convenient than
//! building [`CopyJob`]s and [`CopyOptions`] by hand.
//!
//! # Examples
//!
//! ## One file, two destinations
//!
//! ```no_run
//! use fancopy::CopyBuilder;
//!
//! let report = CopyBuilder::new("disk.img", ["/mnt/a/disk.img", "/mnt/b/disk.img"]).run()?;
//! println!("Copied {} bytes", report.stats.bytes_copied);
//! # Ok::<(), std::io::Error>(())
//! ```
//!
//! ## Mirror a directory, stop a file at the first bad target
//!
//! ```no_run
//! use fancopy::CopyBuilder;
//!
//! let report = CopyBuilder::new("data", ["backup-a", "backup-b"])
//!     .fail_fast()
//!     .parallel(8)
//!     .atomic()
//!     .run_recursive()?;
//!
//! for error in report.errors() {
//!     eprintln!("{error}");
//! }
//! # Ok::<(), std::io::Error>(())
//! ```

use crate::copy::{CopyJob, CopyOutcome, CopyReport, CopyStats, copy_all_with_stats, copy_job};
use crate::local::{DirJobs, LocalFs, url_to_path};
use crate::options::{CopyOptions, FailurePolicy};
use crate::progress::{NoProgress, ProgressSink};
use std::fmt;
use std::io;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::time::Instant;

/// A builder for configuring and executing local copy operations.
///
/// Detects whether the source is a file or a directory and runs a single
/// fan-out copy or a recursive copy accordingly.
#[derive(Clone)]
pub struct CopyBuilder {
    source: String,
    targets: Vec<String>,
    options: CopyOptions,
    fs: LocalFs,
    max_depth: Option<usize>,
    progress: Option<Arc<dyn ProgressSink>>,
}

impl fmt::Debug for CopyBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CopyBuilder")
            .field("source", &self.source)
            .field("targets", &self.targets)
            .field("options", &self.options)
            .field("fs", &self.fs)
            .field("max_depth", &self.max_depth)
            .field("progress", &self.progress.is_some())
            .finish()
    }
}

impl CopyBuilder {
    /// Create a builder copying `source` to every path in `targets`.
    ///
    /// Uses default options: best-effort, parallel 4, fsync on, no atomic
    /// staging.
    pub fn new<I, T>(source: impl Into<String>, targets: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        Self {
            source: source.into(),
            targets: targets.into_iter().map(Into::into).collect(),
            options: CopyOptions::default(),
            fs: LocalFs::new(),
            max_depth: None,
            progress: None,
        }
    }

    /// Abort a file at its first failing target.
    #[must_use]
    pub fn fail_fast(mut self) -> Self {
        self.options = self.options.with_policy(FailurePolicy::FailFast);
        self
    }

    /// Keep copying a file while at least one target is healthy (default).
    #[must_use]
    pub fn best_effort(mut self) -> Self {
        self.options = self.options.with_policy(FailurePolicy::BestEffort);
        self
    }

    /// Set how many files are copied concurrently.
    ///
    /// Default is 4. Set to 1 for sequential copying.
    #[must_use]
    pub fn parallel(mut self, jobs: usize) -> Self {
        self.options = self.options.with_parallel(jobs);
        self
    }

    /// Set the chunk size used for reads and writes.
    #[must_use]
    pub fn buffer_size(mut self, bytes: usize) -> Self {
        self.options = self.options.with_buffer_size(bytes);
        self
    }

    /// Suppress progress reporting.
    #[must_use]
    pub fn quiet(mut self) -> Self {
        self.options = self.options.quiet();
        self
    }

    /// Stage targets in temp files and rename them into place only when
    /// the copy completed.
    #[must_use]
    pub fn atomic(mut self) -> Self {
        self.fs = self.fs.with_atomic_writes();
        self
    }

    /// Skip fsync for faster but less durable copies.
    #[must_use]
    pub fn no_fsync(mut self) -> Self {
        self.fs = self.fs.without_fsync();
        self
    }

    /// Limit how deep a recursive copy descends.
    #[must_use]
    pub fn max_depth(mut self, depth: usize) -> Self {
        self.max_depth = Some(depth);
        self
    }

    /// Stop the copy when `token` is set.
    #[must_use]
    pub fn cancel_token(mut self, token: Arc<AtomicBool>) -> Self {
        self.options = self.options.with_cancel_token(token);
        self
    }

    /// Route warnings to `handler` instead of tracing.
    #[must_use]
    pub fn warn_handler(mut self, handler: fn(&str)) -> Self {
        self.options = self.options.with_warn_handler(handler);
        self
    }

    /// Report transferred bytes to `progress`.
    #[must_use]
    pub fn progress(mut self, progress: Arc<dyn ProgressSink>) -> Self {
        self.progress = Some(progress);
        self
    }

    /// Get a reference to the current options.
    pub fn options(&self) -> &CopyOptions {
        &self.options
    }

    /// Execute the copy.
    ///
    /// A directory source is copied recursively, anything else as a single
    /// file.
    ///
    /// # Errors
    ///
    /// Returns an error only if a directory source cannot be walked; copy
    /// failures are recorded in the report.
    pub fn run(self) -> io::Result<CopyReport> {
        let is_dir = url_to_path(&self.source)?.is_dir();
        if is_dir {
            self.run_recursive()
        } else {
            let start = Instant::now();
            let job = self.job();
            let outcome = self.run_file();
            let mut stats = CopyStats::from_outcomes([&outcome]);
            stats.duration = start.elapsed();
            Ok(CopyReport {
                results: vec![(job, outcome)],
                stats,
            })
        }
    }

    /// Copy a single file to every target.
    pub fn run_file(self) -> CopyOutcome {
        let job = self.job();
        copy_job(&job, &self.fs, self.progress_sink(), &self.options)
    }

    /// Copy every file under the source directory to the same relative path
    /// under each target.
    ///
    /// # Errors
    ///
    /// Returns an error if the source is not a readable directory or a
    /// target is not a local path.
    pub fn run_recursive(self) -> io::Result<CopyReport> {
        let warn = self.options.warn_handler;
        let mut jobs = DirJobs::new(&self.source, &self.targets)?;
        if let Some(depth) = self.max_depth {
            jobs = jobs.with_max_depth(depth);
        }
        if let Some(handler) = warn {
            jobs = jobs.with_warn_handler(handler);
        }
        Ok(copy_all_with_stats(
            jobs,
            &self.fs,
            self.progress_sink(),
            &self.options,
        ))
    }

    fn job(&self) -> CopyJob {
        let length = url_to_path(&self.source)
            .and_then(|path| path.metadata())
            .map(|meta| meta.len())
            .unwrap_or(0);
        CopyJob::new(self.source.clone(), self.targets.clone(), length)
    }

    fn progress_sink(&self) -> &dyn ProgressSink {
        match &self.progress {
            Some(progress) => progress.as_ref(),
            None => &NoProgress,
        }
    }
}
