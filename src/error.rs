//! Error types for fancopy.
//!
//! Every failure the engine can observe is represented by one [`Error`]
//! value. An error carries its taxonomy [`ErrorKind`], the [`Phase`] of the
//! copy it happened in, the URL it concerns, optionally the job it belongs
//! to, and the innermost [`Cause`].
//!
//! # Error Categories
//!
//! | Kind | Meaning |
//! |------|---------|
//! | [`ErrorKind::SourceOpen`] | Source URL could not be opened |
//! | [`ErrorKind::SourceRead`] | Source failed, ended early, or did not match its checksum |
//! | [`ErrorKind::TargetOpen`] | Target URL could not be opened |
//! | [`ErrorKind::TargetWrite`] | Writing a chunk to a target failed |
//! | [`ErrorKind::TargetClose`] | Closing a target failed |
//! | [`ErrorKind::Cancelled`] | The caller cancelled the copy |
//!
//! The [`Display`](std::fmt::Display) form follows the message shape used by
//! existing tooling:
//!
//! ```text
//! <action> with following reason: [<underlying reason>]
//! ```

use std::fmt;
use std::io;
use thiserror::Error;

/// Check if an IO error indicates "no space left on device".
///
/// This helper function detects storage-full conditions across platforms.
///
/// # Platform Support
///
/// | Platform | Error Detection |
/// |----------|-----------------|
/// | Unix | `ENOSPC` (errno 28) |
/// | Windows | `ERROR_DISK_FULL` (0x70) |
///
/// # Example
///
/// ```no_run
/// use std::io;
/// use fancopy::is_no_space_error;
///
/// let error = io::Error::new(io::ErrorKind::StorageFull, "disk full");
/// assert!(is_no_space_error(&error));
/// ```
pub fn is_no_space_error(error: &io::Error) -> bool {
    if error.kind() == io::ErrorKind::StorageFull {
        return true;
    }

    #[cfg(unix)]
    {
        // The raw OS error might be available even if kind() isn't StorageFull
        if let Some(raw_error) = error.raw_os_error() {
            const ENOSPC: i32 = 28;
            return raw_error == ENOSPC;
        }
    }

    #[cfg(windows)]
    {
        if let Some(raw_error) = error.raw_os_error() {
            const ERROR_DISK_FULL: i32 = 112;
            return raw_error == ERROR_DISK_FULL;
        }
    }

    false
}

/// Taxonomy of copy failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[non_exhaustive]
pub enum ErrorKind {
    /// Source URL could not be resolved to a readable stream.
    SourceOpen,
    /// Source stream failed, produced fewer bytes than declared, or its
    /// content did not match the declared checksum.
    SourceRead,
    /// Target URL could not be resolved to a writable stream.
    TargetOpen,
    /// A write to one target failed.
    TargetWrite,
    /// Closing one target failed.
    TargetClose,
    /// The caller requested cancellation.
    Cancelled,
}

impl ErrorKind {
    /// Stable machine-readable name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::SourceOpen => "source_open",
            Self::SourceRead => "source_read",
            Self::TargetOpen => "target_open",
            Self::TargetWrite => "target_write",
            Self::TargetClose => "target_close",
            Self::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Stage of a copy in which an error was observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Phase {
    /// Opening the source or a target.
    Open,
    /// The chunked read/write loop.
    Transfer,
    /// Checksum comparison after the last chunk.
    Verify,
    /// Closing a target.
    Close,
}

impl Phase {
    /// Stable machine-readable name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Transfer => "transfer",
            Self::Verify => "verify",
            Self::Close => "close",
        }
    }
}

/// Innermost reason for an [`Error`].
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Cause {
    /// IO error reported by a stream or a resolver.
    #[error("{0}")]
    Io(#[from] io::Error),

    /// Source stream ended before its declared length.
    #[error("source ended after {read} of {expected} bytes")]
    Truncated {
        /// Bytes actually read
        read: u64,
        /// Declared length
        expected: u64,
    },

    /// Digest of the streamed bytes differs from the declared checksum.
    #[error("checksum mismatch: expected {expected}, got {actual}")]
    ChecksumMismatch {
        /// Declared digest (hex)
        expected: String,
        /// Computed digest (hex)
        actual: String,
    },

    /// Cancellation was observed at a chunk boundary.
    #[error("operation cancelled after {bytes} bytes")]
    Cancelled {
        /// Bytes transferred before cancellation
        bytes: u64,
    },
}

/// A structured copy failure.
///
/// Constructed by the engine; callers inspect it through [`Error::kind`],
/// [`Error::phase`], [`Error::url`], [`Error::job`] and [`Error::cause`].
/// The kind never changes once the error exists, including when job context
/// is attached with [`Error::with_job`].
#[derive(Error, Debug)]
#[error("{action} with following reason: [{cause}]", action = self.action())]
pub struct Error {
    kind: ErrorKind,
    phase: Phase,
    url: Option<String>,
    job: Option<String>,
    #[source]
    cause: Cause,
}

impl Error {
    /// Short phrase naming the failed step, e.g. `Writing to target URL: [t1] failed`.
    pub fn action(&self) -> String {
        let url = self.url.as_deref().unwrap_or("");
        match self.kind {
            ErrorKind::SourceOpen => format!("Reading from source URL: [{url}] failed"),
            ErrorKind::SourceRead => format!("Copying data from source URL: [{url}] failed"),
            ErrorKind::TargetOpen => format!("Opening target URL: [{url}] failed"),
            ErrorKind::TargetWrite => format!("Writing to target URL: [{url}] failed"),
            ErrorKind::TargetClose => format!("Closing target URL: [{url}] failed"),
            ErrorKind::Cancelled => "Copy cancelled".to_owned(),
        }
    }

    fn new(kind: ErrorKind, phase: Phase, url: Option<&str>, cause: Cause) -> Self {
        Self {
            kind,
            phase,
            url: url.map(str::to_owned),
            job: None,
            cause,
        }
    }

    pub(crate) fn source_open(url: &str, err: io::Error) -> Self {
        Self::new(ErrorKind::SourceOpen, Phase::Open, Some(url), err.into())
    }

    pub(crate) fn source_read(url: &str, err: io::Error) -> Self {
        Self::new(ErrorKind::SourceRead, Phase::Transfer, Some(url), err.into())
    }

    pub(crate) fn truncated(url: &str, read: u64, expected: u64) -> Self {
        Self::new(
            ErrorKind::SourceRead,
            Phase::Transfer,
            Some(url),
            Cause::Truncated { read, expected },
        )
    }

    pub(crate) fn checksum_mismatch(url: &str, expected: &[u8], actual: &[u8]) -> Self {
        Self::new(
            ErrorKind::SourceRead,
            Phase::Verify,
            Some(url),
            Cause::ChecksumMismatch {
                expected: hex::encode(expected),
                actual: hex::encode(actual),
            },
        )
    }

    pub(crate) fn target_open(url: &str, err: io::Error) -> Self {
        Self::new(ErrorKind::TargetOpen, Phase::Open, Some(url), err.into())
    }

    pub(crate) fn target_write(url: &str, err: io::Error) -> Self {
        Self::new(ErrorKind::TargetWrite, Phase::Transfer, Some(url), err.into())
    }

    pub(crate) fn target_close(url: &str, err: io::Error) -> Self {
        Self::new(ErrorKind::TargetClose, Phase::Close, Some(url), err.into())
    }

    pub(crate) fn cancelled(bytes: u64) -> Self {
        Self::new(
            ErrorKind::Cancelled,
            Phase::Transfer,
            None,
            Cause::Cancelled { bytes },
        )
    }

    /// Attach the source URL of the job this error belongs to.
    #[must_use]
    pub fn with_job(mut self, job: impl Into<String>) -> Self {
        self.job = Some(job.into());
        self
    }

    /// Taxonomy kind.
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Phase the error was observed in.
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// URL of the source or target the error concerns.
    pub fn url(&self) -> Option<&str> {
        self.url.as_deref()
    }

    /// Source URL of the job, if attached.
    pub fn job(&self) -> Option<&str> {
        self.job.as_deref()
    }

    /// Innermost reason.
    pub fn cause(&self) -> &Cause {
        &self.cause
    }

    /// Whether the underlying IO failure is a full device.
    pub fn is_no_space(&self) -> bool {
        matches!(&self.cause, Cause::Io(err) if is_no_space_error(err))
    }
}
