//! Local filesystem collaborator.
//!
//! [`LocalFs`] resolves plain paths and `file://` URLs to source and target
//! handles. [`DirJobs`] walks a local directory lazily and yields one
//! [`CopyJob`](crate::CopyJob) per file, for use with
//! [`copy_all`](crate::copy_all).
//!
//! # Target behavior
//!
//! | Setting | Default | Effect |
//! |---------|---------|--------|
//! | `fsync` | `true` | `sync_all` before a completed target is closed |
//! | `atomic` | `false` | Stage into a temp file, rename on completion, discard otherwise |
//!
//! Missing parent directories of a target are created. A target path that
//! is an existing directory is refused rather than replaced, and so is a
//! target that is the source file itself (same path, hard link or symlink).

mod path;
mod sink;
mod walk;

pub use path::{path_to_url, url_to_path};
pub use walk::DirJobs;

use crate::handle::{Resolver, SourceHandle, TargetHandle};
use path::safe_path;
use sink::FileSink;
use std::fs::{self, File};
use std::io;
use std::path::Path;

/// [`Resolver`] for the local filesystem.
#[derive(Debug, Clone)]
pub struct LocalFs {
    fsync: bool,
    atomic: bool,
}

impl Default for LocalFs {
    fn default() -> Self {
        Self {
            fsync: true,
            atomic: false,
        }
    }
}

impl LocalFs {
    /// Resolver with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Skip `fsync` for faster (but less durable) copies.
    #[must_use]
    pub fn without_fsync(mut self) -> Self {
        self.fsync = false;
        self
    }

    /// Stage targets in temp files and only rename them into place when the
    /// copy completed; incomplete targets never appear at their destination.
    #[must_use]
    pub fn with_atomic_writes(mut self) -> Self {
        self.atomic = true;
        self
    }
}

impl Resolver for LocalFs {
    fn open_source(&self, url: &str) -> io::Result<SourceHandle> {
        let path = url_to_path(url)?;
        let file = File::open(safe_path(&path))?;
        let meta = file.metadata()?;

        if meta.is_dir() {
            return Err(io::Error::new(
                io::ErrorKind::IsADirectory,
                format!("{} is a directory, copy it recursively", path.display()),
            ));
        }

        tracing::trace!(url, length = meta.len(), "opened local source");
        Ok(SourceHandle::new(url, file, meta.len()))
    }

    fn open_target(
        &self,
        url: &str,
        _length: u64,
        _checksum: Option<&[u8]>,
    ) -> io::Result<TargetHandle> {
        let path = url_to_path(url)?;

        if path.is_dir() {
            return Err(io::Error::new(
                io::ErrorKind::IsADirectory,
                format!("{} is a directory", path.display()),
            ));
        }

        let parent = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        fs::create_dir_all(safe_path(parent))?;

        let sink = if self.atomic {
            FileSink::atomic(&path, parent, self.fsync)?
        } else {
            FileSink::direct(&path, self.fsync)?
        };

        tracing::trace!(url, atomic = self.atomic, "opened local target");
        Ok(TargetHandle::new(url, sink))
    }

    fn is_same_object(&self, source: &str, target: &str) -> bool {
        let (Ok(source), Ok(target)) = (url_to_path(source), url_to_path(target)) else {
            return false;
        };
        match (file_key(&source), file_key(&target)) {
            (Ok(a), Ok(b)) => a == b,
            // A target that does not exist yet cannot be the source
            _ => false,
        }
    }
}

/// Identity of an existing file, following symlinks.
#[cfg(unix)]
fn file_key(path: &Path) -> io::Result<(u64, u64)> {
    use std::os::unix::fs::MetadataExt;
    let meta = fs::metadata(safe_path(path))?;
    Ok((meta.dev(), meta.ino()))
}

#[cfg(not(unix))]
fn file_key(path: &Path) -> io::Result<std::path::PathBuf> {
    fs::canonicalize(safe_path(path))
}
