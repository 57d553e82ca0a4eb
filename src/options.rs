//! Configuration options for copy operations.
//!
//! This module provides [`CopyOptions`] for configuring the engine and
//! [`FailurePolicy`] for choosing how a target failure affects the others.
//!
//! # Example
//!
//! ```
//! use fancopy::{CopyOptions, FailurePolicy};
//!
//! let options = CopyOptions::default()
//!     .with_policy(FailurePolicy::FailFast)
//!     .with_parallel(8)
//!     .with_buffer_size(64 * 1024);
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Default chunk size for the fan-out loop (32 KiB).
pub const DEFAULT_BUFFER_SIZE: usize = 32 * 1024;

/// How a write failure on one target affects the rest of the transfer.
///
/// # Default
///
/// The default is [`FailurePolicy::BestEffort`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum FailurePolicy {
    /// The first target write error aborts the whole transfer.
    ///
    /// Remaining targets receive no further bytes. Bytes already written to
    /// other targets are left in place.
    FailFast,
    /// A failing target leaves the active set; the others keep receiving
    /// data until the source is exhausted or no target is left.
    #[default]
    BestEffort,
}

impl FailurePolicy {
    /// Stable machine-readable name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::FailFast => "fail_fast",
            Self::BestEffort => "best_effort",
        }
    }
}

/// Options for copy operations.
///
/// Use [`Default::default()`] to get sensible defaults, then customize
/// using the builder methods.
///
/// # Default Values
///
/// | Field | Default | Description |
/// |-------|---------|-------------|
/// | `policy` | `BestEffort` | Isolate failing targets |
/// | `buffer_size` | 32 KiB | Chunk size of the fan-out loop |
/// | `parallel` | 4 | Concurrent jobs in a recursive copy |
/// | `quiet` | `false` | Suppress progress reporting |
/// | `verify_checksum` | `true` | Compare SHA-256 when a checksum is known |
/// | `cancel_token` | `None` | No cancellation |
///
/// # Example
///
/// ```
/// use fancopy::CopyOptions;
///
/// let options = CopyOptions::default()
///     .with_parallel(1)   // One job at a time
///     .quiet();
/// ```
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CopyOptions {
    /// Failure policy for target write errors
    pub policy: FailurePolicy,

    /// Bytes read from the source per chunk (default: 32 KiB)
    ///
    /// Every chunk reaches every live target before the next one is read,
    /// so this also bounds memory per job.
    pub buffer_size: usize,

    /// Number of jobs run concurrently by [`copy_all`](crate::copy_all) (default: 4)
    ///
    /// Always bounded. Remote storage backends tend to throttle or fail
    /// under unbounded fan-in, so keep this modest.
    pub parallel: usize,

    /// Suppress progress reporting (default: false)
    ///
    /// Never changes transfer semantics or error content.
    pub quiet: bool,

    /// Verify the SHA-256 of the streamed bytes when a checksum is known (default: true)
    pub verify_checksum: bool,

    /// Cancellation token (optional)
    ///
    /// Checked at every chunk boundary and before each job starts.
    #[cfg_attr(feature = "serde", serde(skip))]
    pub cancel_token: Option<Arc<AtomicBool>>,

    /// Callback for warnings (optional)
    ///
    /// If not set, warnings are logged via tracing.
    #[cfg_attr(feature = "serde", serde(skip))]
    pub warn_handler: Option<fn(&str)>,
}

impl Default for CopyOptions {
    fn default() -> Self {
        Self {
            policy: FailurePolicy::BestEffort,
            buffer_size: DEFAULT_BUFFER_SIZE,
            parallel: 4,
            quiet: false,
            verify_checksum: true,
            cancel_token: None,
            warn_handler: None,
        }
    }
}

impl CopyOptions {
    /// Set the failure policy
    #[must_use]
    pub fn with_policy(mut self, policy: FailurePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Set the chunk size
    ///
    /// Value is clamped to at least 1 byte.
    #[must_use]
    pub fn with_buffer_size(mut self, bytes: usize) -> Self {
        self.buffer_size = bytes.max(1);
        self
    }

    /// Set the number of concurrent jobs
    ///
    /// Value is clamped to at least 1 to prevent panics.
    #[must_use]
    pub fn with_parallel(mut self, n: usize) -> Self {
        self.parallel = n.max(1);
        self
    }

    /// Suppress progress reporting
    #[must_use]
    pub fn quiet(mut self) -> Self {
        self.quiet = true;
        self
    }

    /// Skip checksum verification
    #[must_use]
    pub fn without_checksum_verification(mut self) -> Self {
        self.verify_checksum = false;
        self
    }

    /// Set a cancellation token
    #[must_use]
    pub fn with_cancel_token(mut self, token: Arc<AtomicBool>) -> Self {
        self.cancel_token = Some(token);
        self
    }

    /// Create options with a warning handler
    #[must_use]
    pub fn with_warn_handler(mut self, handler: fn(&str)) -> Self {
        self.warn_handler = Some(handler);
        self
    }

    pub(crate) fn is_cancelled(&self) -> bool {
        self.cancel_token
            .as_ref()
            .is_some_and(|token| token.load(Ordering::Relaxed))
    }

    pub(crate) fn warn(&self, msg: &str) {
        if let Some(handler) = self.warn_handler {
            handler(msg);
        } else {
            tracing::warn!("{}", msg);
        }
    }
}
