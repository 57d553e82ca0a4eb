//! Progress reporting.
//!
//! The engine reports every chunk it fans out to a [`ProgressSink`]. Sinks
//! are observers: an error returned by a sink is logged and ignored, it
//! never changes the outcome of a copy.

use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Consumer of transferred byte counts.
///
/// `inc` receives the size of each chunk delivered to the targets, so the
/// running sum is monotonic. One sink may be shared by concurrent jobs.
pub trait ProgressSink: Send + Sync {
    /// Record `bytes` more bytes transferred.
    fn inc(&self, bytes: u64) -> io::Result<()>;
}

/// Sink that discards all updates. Used when `quiet` is set.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn inc(&self, _bytes: u64) -> io::Result<()> {
        Ok(())
    }
}

/// Shared atomic byte counter.
///
/// Clones share the same total.
#[derive(Debug, Clone, Default)]
pub struct AtomicProgress {
    total: Arc<AtomicU64>,
}

impl AtomicProgress {
    /// Create a counter starting at zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Bytes recorded so far.
    pub fn total(&self) -> u64 {
        self.total.load(Ordering::Relaxed)
    }
}

impl ProgressSink for AtomicProgress {
    fn inc(&self, bytes: u64) -> io::Result<()> {
        self.total.fetch_add(bytes, Ordering::Relaxed);
        Ok(())
    }
}

impl<P: ProgressSink + ?Sized> ProgressSink for Arc<P> {
    fn inc(&self, bytes: u64) -> io::Result<()> {
        (**self).inc(bytes)
    }
}

#[cfg(feature = "progress")]
mod bar {
    use super::ProgressSink;
    use indicatif::{ProgressBar, ProgressStyle};
    use std::io;

    impl ProgressSink for ProgressBar {
        fn inc(&self, bytes: u64) -> io::Result<()> {
            ProgressBar::inc(self, bytes);
            Ok(())
        }
    }

    /// Create a default byte progress bar for a transfer of `total` bytes
    #[must_use]
    pub fn create_progress_bar(total: u64) -> ProgressBar {
        let pb = ProgressBar::new(total);
        pb.set_style(
            ProgressStyle::default_bar()
                .template(
                    "{spinner:.green} [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({bytes_per_sec}, {eta})",
                )
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("=>-"),
        );
        pb
    }
}

#[cfg(feature = "progress")]
pub use bar::create_progress_bar;
