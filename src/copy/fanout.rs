//! Fan-out copy of one source stream to many targets.
//!
//! The source is read in sequential chunks. Each chunk is written to every
//! live target, in target order, and reported to the progress sink before
//! the next chunk is read. Memory per copy is therefore one chunk, and the
//! slowest target sets the pace.

use super::outcome::{CopyJob, CopyOutcome};
use crate::error::Error;
use crate::handle::{Resolver, SourceHandle, Sink, TargetHandle};
use crate::options::{CopyOptions, FailurePolicy};
use crate::progress::{NoProgress, ProgressSink};
use sha2::{Digest, Sha256};
use std::io::{self, Read};
use std::time::Instant;

/// Per-target state for the duration of one copy.
struct Slot {
    url: String,
    /// `None` once closed, or if the target never opened
    sink: Option<Box<dyn Sink>>,
    error: Option<Error>,
}

impl Slot {
    fn open(url: String, sink: Box<dyn Sink>) -> Self {
        Self {
            url,
            sink: Some(sink),
            error: None,
        }
    }

    fn failed(url: String, error: Error) -> Self {
        Self {
            url,
            sink: None,
            error: Some(error),
        }
    }

    fn is_live(&self) -> bool {
        self.sink.is_some() && self.error.is_none()
    }

    /// Close the sink if it was opened. A close error never replaces an
    /// earlier error for this target.
    fn close(&mut self, completed: bool) {
        let Some(sink) = self.sink.take() else {
            return;
        };
        let completed = completed && self.error.is_none();

        if let Err(e) = sink.close(completed) {
            let error = Error::target_close(&self.url, e);
            match &self.error {
                Some(earlier) => {
                    tracing::debug!(
                        target_url = %self.url,
                        earlier = %earlier,
                        error = %error,
                        "close failed after an earlier failure"
                    );
                }
                None => self.error = Some(error),
            }
        }
    }
}

/// Copy an open source to open targets.
///
/// Transfers exactly `source.length()` bytes to every target, reports each
/// chunk to `progress`, verifies the checksum if one is known, then closes
/// every target exactly once and releases the source.
///
/// This never returns an error: every failure is recorded in the
/// [`CopyOutcome`].
///
/// # Example
///
/// ```
/// use fancopy::{copy, CopyOptions, NoProgress, SourceHandle, TargetHandle, WriterSink};
///
/// let source = SourceHandle::new("mem://src", &b"hello"[..], 5);
/// let targets = vec![
///     TargetHandle::new("mem://a", WriterSink::new(Vec::new())),
///     TargetHandle::new("mem://b", WriterSink::new(Vec::new())),
/// ];
///
/// let outcome = copy(source, targets, &NoProgress, &CopyOptions::default());
/// assert!(outcome.is_success());
/// assert_eq!(outcome.bytes_transferred, 5);
/// ```
pub fn copy(
    source: SourceHandle,
    targets: Vec<TargetHandle>,
    progress: &dyn ProgressSink,
    options: &CopyOptions,
) -> CopyOutcome {
    let start = Instant::now();
    let target_urls = targets.iter().map(|t| t.url().to_owned()).collect();
    let slots = targets
        .into_iter()
        .map(|target| {
            let (url, sink) = target.into_parts();
            Slot::open(url, sink)
        })
        .collect();
    fan_out(source, target_urls, slots, progress, options, start)
}

/// Open the job's source and targets through `resolver`, then copy.
///
/// - Source open failure: no target is opened.
/// - A target that [`Resolver::is_same_object`] matches with the source is
///   never opened and fails like a target that could not be opened.
/// - Target open failure: recorded for that target. Under
///   [`FailurePolicy::FailFast`] the job stops before any byte is read;
///   under [`FailurePolicy::BestEffort`] the target is left out.
///
/// Every error in the outcome carries the job's source URL as context.
pub fn copy_job(
    job: &CopyJob,
    resolver: &dyn Resolver,
    progress: &dyn ProgressSink,
    options: &CopyOptions,
) -> CopyOutcome {
    let start = Instant::now();
    let target_urls = job.target_urls().to_vec();

    if options.is_cancelled() {
        return not_started(job, target_urls, None, Some(Error::cancelled(0)), options, start)
            .with_job_context(job.source_url());
    }

    let mut source = match resolver.open_source(job.source_url()) {
        Ok(source) => source,
        Err(e) => {
            let error = Error::source_open(job.source_url(), e);
            return not_started(job, target_urls, Some(error), None, options, start)
                .with_job_context(job.source_url());
        }
    };
    source.set_checksum_if_missing(job.expected_checksum());

    if source.length() != job.expected_length() {
        tracing::debug!(
            source_url = job.source_url(),
            declared = source.length(),
            listed = job.expected_length(),
            "source length differs from job, using source"
        );
    }

    let mut slots = Vec::with_capacity(target_urls.len());
    for url in &target_urls {
        let opened = if resolver.is_same_object(job.source_url(), url) {
            Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "target is the same file as the source",
            ))
        } else {
            resolver.open_target(url, source.length(), source.checksum())
        };
        match opened {
            Ok(target) => {
                let (_, sink) = target.into_parts();
                slots.push(Slot::open(url.clone(), sink));
            }
            Err(e) => {
                slots.push(Slot::failed(url.clone(), Error::target_open(url, e)));
                if options.policy == FailurePolicy::FailFast {
                    break;
                }
            }
        }
    }

    fan_out(source, target_urls, slots, progress, options, start)
        .with_job_context(job.source_url())
}

fn not_started(
    job: &CopyJob,
    target_urls: Vec<String>,
    source_error: Option<Error>,
    cancelled: Option<Error>,
    options: &CopyOptions,
    start: Instant,
) -> CopyOutcome {
    CopyOutcome {
        source_url: job.source_url().to_owned(),
        target_urls,
        bytes_transferred: 0,
        expected_length: job.expected_length(),
        target_errors: Vec::new(),
        source_error,
        cancelled,
        aborted: true,
        policy: options.policy,
        duration: start.elapsed(),
    }
}

#[allow(clippy::too_many_lines)]
fn fan_out(
    mut source: SourceHandle,
    target_urls: Vec<String>,
    mut slots: Vec<Slot>,
    progress: &dyn ProgressSink,
    options: &CopyOptions,
    start: Instant,
) -> CopyOutcome {
    let progress: &dyn ProgressSink = if options.quiet { &NoProgress } else { progress };
    let policy = options.policy;
    let source_url = source.url().to_owned();
    let length = source.length();

    let mut transferred: u64 = 0;
    let mut source_error: Option<Error> = None;
    let mut cancelled: Option<Error> = None;
    let mut aborted = false;
    let mut hasher = (options.verify_checksum && source.checksum().is_some()).then(Sha256::new);

    if policy == FailurePolicy::FailFast && slots.iter().any(|s| s.error.is_some()) {
        // A target failed to open; nothing is read
        aborted = true;
    } else {
        // `buffer_size` is a public field and may be 0
        let chunk_size = options.buffer_size.max(1);
        let buf_len = usize::try_from(length).map_or(chunk_size, |len| len.min(chunk_size));
        let mut buf = vec![0u8; buf_len];

        while transferred < length {
            if options.is_cancelled() {
                cancelled = Some(Error::cancelled(transferred));
                aborted = true;
                break;
            }
            if !slots.iter().any(Slot::is_live) {
                aborted = true;
                break;
            }

            let remaining = length - transferred;
            let want = usize::try_from(remaining).map_or(buf.len(), |r| r.min(buf.len()));

            let n = match source.stream_mut().read(&mut buf[..want]) {
                Ok(0) => {
                    source_error = Some(Error::truncated(&source_url, transferred, length));
                    aborted = true;
                    break;
                }
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    source_error = Some(Error::source_read(&source_url, e));
                    aborted = true;
                    break;
                }
            };
            let chunk = &buf[..n];

            if let Some(hasher) = hasher.as_mut() {
                hasher.update(chunk);
            }

            let mut fail_fast_hit = false;
            for slot in slots.iter_mut().filter(|s| s.is_live()) {
                let Some(sink) = slot.sink.as_mut() else {
                    continue;
                };
                if let Err(e) = sink.write_all(chunk) {
                    tracing::debug!(
                        target_url = %slot.url,
                        offset = transferred,
                        error = %e,
                        "target write failed"
                    );
                    slot.error = Some(Error::target_write(&slot.url, e));
                    if policy == FailurePolicy::FailFast {
                        fail_fast_hit = true;
                        break;
                    }
                }
            }

            if fail_fast_hit || !slots.iter().any(Slot::is_live) {
                aborted = true;
                break;
            }

            transferred += n as u64;
            if let Err(e) = progress.inc(n as u64) {
                tracing::trace!(error = %e, "progress update failed, ignoring");
            }
        }
    }

    if !aborted && transferred == length {
        if let (Some(hasher), Some(expected)) = (hasher, source.checksum()) {
            let actual = hasher.finalize();
            if actual.as_slice() != expected {
                source_error = Some(Error::checksum_mismatch(&source_url, expected, actual.as_slice()));
            }
        }
    }

    let completed = !aborted && source_error.is_none() && transferred == length;
    for slot in &mut slots {
        slot.close(completed);
    }
    drop(source);

    let target_errors: Vec<(String, Error)> = slots
        .into_iter()
        .filter_map(|slot| slot.error.map(|error| (slot.url, error)))
        .collect();

    tracing::debug!(
        source_url = %source_url,
        bytes = transferred,
        expected = length,
        targets = target_urls.len(),
        failed_targets = target_errors.len(),
        aborted,
        "copy finished"
    );

    CopyOutcome {
        source_url,
        target_urls,
        bytes_transferred: transferred,
        expected_length: length,
        target_errors,
        source_error,
        cancelled,
        aborted,
        policy,
        duration: start.elapsed(),
    }
}

// =============================================================================
// Tests
// =============================================================================
