//! Copy jobs and their outcomes.

use crate::error::Error;
use crate::options::FailurePolicy;
use std::time::Duration;

/// One unit of work: copy one source to an ordered list of targets.
///
/// Built once per single copy, or once per discovered object in a
/// recursive copy. Immutable after construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CopyJob {
    source_url: String,
    target_urls: Vec<String>,
    expected_length: u64,
    expected_checksum: Option<Vec<u8>>,
}

impl CopyJob {
    /// Create a job for `source` with `expected_length` bytes.
    pub fn new<I, T>(source: impl Into<String>, targets: I, expected_length: u64) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        Self {
            source_url: source.into(),
            target_urls: targets.into_iter().map(Into::into).collect(),
            expected_length,
            expected_checksum: None,
        }
    }

    /// Expected SHA-256 digest, used when the source does not declare one.
    #[must_use]
    pub fn with_checksum(mut self, checksum: impl Into<Vec<u8>>) -> Self {
        self.expected_checksum = Some(checksum.into());
        self
    }

    /// Source URL.
    pub fn source_url(&self) -> &str {
        &self.source_url
    }

    /// Target URLs in order.
    pub fn target_urls(&self) -> &[String] {
        &self.target_urls
    }

    /// Length reported by whoever created the job.
    pub fn expected_length(&self) -> u64 {
        self.expected_length
    }

    /// Expected checksum, if known.
    pub fn expected_checksum(&self) -> Option<&[u8]> {
        self.expected_checksum.as_deref()
    }
}

/// Result of one copy.
///
/// Produced once per job, after every handle has been closed. Errors are
/// collected here rather than returned, so the caller decides whether a
/// failed job is fatal.
///
/// # Example
///
/// ```no_run
/// use fancopy::{copy_job, CopyJob, CopyOptions, LocalFs, NoProgress};
///
/// let job = CopyJob::new("a.bin", ["b.bin", "c.bin"], 1024);
/// let outcome = copy_job(&job, &LocalFs::new(), &NoProgress, &CopyOptions::default());
/// if !outcome.is_success() {
///     for error in outcome.errors() {
///         eprintln!("{error}");
///     }
/// }
/// ```
#[derive(Debug)]
pub struct CopyOutcome {
    /// Source URL
    pub source_url: String,
    /// Target URLs in order
    pub target_urls: Vec<String>,
    /// Bytes delivered to every target that was still live after each chunk
    pub bytes_transferred: u64,
    /// Declared source length (0 if the source never opened)
    pub expected_length: u64,
    /// Per-target failures, in target order
    pub target_errors: Vec<(String, Error)>,
    /// Source open, read or verification failure
    pub source_error: Option<Error>,
    /// Set when the copy stopped because of cancellation
    pub cancelled: Option<Error>,
    /// Whether the transfer stopped before the source was exhausted
    pub aborted: bool,
    /// Policy the copy ran under
    pub policy: FailurePolicy,
    /// Wall time of the copy, including opening and closing
    pub duration: Duration,
}

impl CopyOutcome {
    /// Whether the copy met its success condition.
    ///
    /// No source error, no cancellation, the full length transferred, and
    /// either no target errors (fail-fast) or at least one target without an
    /// error (best-effort).
    pub fn is_success(&self) -> bool {
        if self.source_error.is_some() || self.cancelled.is_some() {
            return false;
        }
        if self.bytes_transferred != self.expected_length {
            return false;
        }
        match self.policy {
            FailurePolicy::FailFast => self.target_errors.is_empty(),
            FailurePolicy::BestEffort => self.target_errors.len() < self.target_urls.len(),
        }
    }

    /// Whether the caller cancelled this copy.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.is_some()
    }

    /// Error recorded for `url`, if any.
    pub fn target_error(&self, url: &str) -> Option<&Error> {
        self.target_errors
            .iter()
            .find(|(target, _)| target == url)
            .map(|(_, error)| error)
    }

    /// Targets that received the complete, verified stream.
    ///
    /// Empty unless the transfer itself completed.
    pub fn succeeded_targets(&self) -> Vec<&str> {
        let transfer_complete = self.source_error.is_none()
            && self.cancelled.is_none()
            && !self.aborted
            && self.bytes_transferred == self.expected_length;
        if !transfer_complete {
            return Vec::new();
        }
        self.target_urls
            .iter()
            .filter(|url| self.target_error(url).is_none())
            .map(String::as_str)
            .collect()
    }

    /// All errors: source first, then cancellation, then targets in order.
    pub fn errors(&self) -> impl Iterator<Item = &Error> {
        self.source_error
            .iter()
            .chain(self.cancelled.iter())
            .chain(self.target_errors.iter().map(|(_, error)| error))
    }

    pub(crate) fn with_job_context(mut self, job: &str) -> Self {
        self.source_error = self.source_error.map(|e| e.with_job(job));
        self.cancelled = self.cancelled.map(|e| e.with_job(job));
        self.target_errors = self
            .target_errors
            .into_iter()
            .map(|(url, e)| (url, e.with_job(job)))
            .collect();
        self
    }
}
