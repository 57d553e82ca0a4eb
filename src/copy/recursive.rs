//! Recursive copy driver: many jobs, bounded parallelism.

use super::fanout::copy_job;
use super::outcome::{CopyJob, CopyOutcome};
use crate::error::Error;
use crate::handle::Resolver;
use crate::options::CopyOptions;
use crate::progress::ProgressSink;
use rayon::prelude::*;
use std::time::{Duration, Instant};

/// Summary of a recursive copy.
///
/// # Example
///
/// ```no_run
/// use fancopy::{copy_all, CopyOptions, CopyStats, DirJobs, LocalFs, NoProgress};
///
/// let jobs = DirJobs::new("data", ["backup"])?;
/// let results = copy_all(jobs, &LocalFs::new(), &NoProgress, &CopyOptions::default());
/// let stats = CopyStats::from_outcomes(results.iter().map(|(_, outcome)| outcome));
/// println!("{} copied, {} failed", stats.jobs_succeeded, stats.jobs_failed);
/// # Ok::<(), std::io::Error>(())
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct CopyStats {
    /// Jobs that met their success condition
    pub jobs_succeeded: u64,
    /// Jobs that did not, including cancelled ones
    pub jobs_failed: u64,
    /// Jobs stopped by cancellation
    pub jobs_cancelled: u64,
    /// Per-target failures across all jobs
    pub target_errors: u64,
    /// Bytes transferred, counted once per job regardless of target count
    pub bytes_copied: u64,
    /// Wall time of the whole run
    pub duration: Duration,
}

impl CopyStats {
    /// Tally a set of outcomes.
    ///
    /// `duration` is the longest single outcome; [`copy_all_with_stats`] and
    /// [`CopyBuilder`](crate::CopyBuilder) replace it with the wall time of
    /// the whole run.
    pub fn from_outcomes<'a>(outcomes: impl IntoIterator<Item = &'a CopyOutcome>) -> Self {
        let mut stats = Self::default();
        for outcome in outcomes {
            if outcome.is_success() {
                stats.jobs_succeeded += 1;
            } else {
                stats.jobs_failed += 1;
            }
            if outcome.is_cancelled() {
                stats.jobs_cancelled += 1;
            }
            stats.target_errors += outcome.target_errors.len() as u64;
            stats.bytes_copied += outcome.bytes_transferred;
            stats.duration = stats.duration.max(outcome.duration);
        }
        stats
    }

    /// Total jobs run.
    pub fn jobs(&self) -> u64 {
        self.jobs_succeeded + self.jobs_failed
    }
}

/// Results of a recursive copy, in job order, with their summary.
#[derive(Debug)]
pub struct CopyReport {
    /// Every job that was started, paired with its outcome
    pub results: Vec<(CopyJob, CopyOutcome)>,
    /// Summary of `results`
    pub stats: CopyStats,
}

impl CopyReport {
    /// Whether every job succeeded.
    pub fn is_success(&self) -> bool {
        self.results.iter().all(|(_, outcome)| outcome.is_success())
    }

    /// Whether any job was cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.stats.jobs_cancelled > 0
    }

    /// Outcomes that did not succeed.
    pub fn failures(&self) -> impl Iterator<Item = &CopyOutcome> {
        self.results
            .iter()
            .map(|(_, outcome)| outcome)
            .filter(|outcome| !outcome.is_success())
    }

    /// Every error across all jobs, in job order.
    pub fn errors(&self) -> impl Iterator<Item = &Error> {
        self.results.iter().flat_map(|(_, outcome)| outcome.errors())
    }
}

/// Run a fan-out copy for every job in `jobs`.
///
/// Jobs are pulled lazily by a rayon pool of `options.parallel` workers.
/// Each worker takes the next job as soon as its previous one finishes, so
/// at most `parallel` copies are in flight and a slow job never holds the
/// others back. Outcomes are returned in the order the jobs were produced.
///
/// A failed job never stops the walk. Cancellation stops pulling new jobs;
/// jobs already pulled report `Cancelled`.
pub fn copy_all<I>(
    jobs: I,
    resolver: &dyn Resolver,
    progress: &dyn ProgressSink,
    options: &CopyOptions,
) -> Vec<(CopyJob, CopyOutcome)>
where
    I: IntoIterator<Item = CopyJob>,
    I::IntoIter: Send,
{
    let parallel = options.parallel.max(1);

    let mut jobs = jobs.into_iter();
    let pending = std::iter::from_fn(move || {
        if options.is_cancelled() {
            None
        } else {
            jobs.next()
        }
    });

    let run = |job: CopyJob| -> (CopyJob, CopyOutcome) {
        let outcome = copy_job(&job, resolver, progress, options);
        if !outcome.is_success() {
            tracing::debug!(
                source_url = job.source_url(),
                errors = outcome.errors().count(),
                "job failed"
            );
        }
        (job, outcome)
    };

    let results: Vec<(CopyJob, CopyOutcome)> = if parallel == 1 {
        pending.map(run).collect()
    } else {
        let pool = match rayon::ThreadPoolBuilder::new().num_threads(parallel).build() {
            Ok(pool) => Some(pool),
            Err(e) => {
                options.warn(&format!(
                    "Failed to create thread pool ({e}), using global pool"
                ));
                None
            }
        };

        let run_all = move || -> Vec<(CopyJob, CopyOutcome)> {
            let mut indexed: Vec<(usize, (CopyJob, CopyOutcome))> = pending
                .enumerate()
                .par_bridge()
                .map(|(index, job)| (index, run(job)))
                .collect();
            indexed.sort_unstable_by_key(|(index, _)| *index);
            indexed.into_iter().map(|(_, result)| result).collect()
        };
        match &pool {
            Some(pool) => pool.install(run_all),
            None => run_all(),
        }
    };

    if options.is_cancelled() {
        tracing::debug!(completed = results.len(), "cancelled, no more jobs pulled");
    }

    results
}

/// [`copy_all`], timed and summarised.
pub fn copy_all_with_stats<I>(
    jobs: I,
    resolver: &dyn Resolver,
    progress: &dyn ProgressSink,
    options: &CopyOptions,
) -> CopyReport
where
    I: IntoIterator<Item = CopyJob>,
    I::IntoIter: Send,
{
    let start = Instant::now();
    let results = copy_all(jobs, resolver, progress, options);
    let mut stats = CopyStats::from_outcomes(results.iter().map(|(_, outcome)| outcome));
    stats.duration = start.elapsed();

    tracing::info!(
        jobs = stats.jobs(),
        failed = stats.jobs_failed,
        bytes = stats.bytes_copied,
        elapsed_ms = stats.duration.as_millis() as u64,
        "recursive copy finished"
    );

    CopyReport { results, stats }
}

// =============================================================================
// Tests
// =============================================================================
