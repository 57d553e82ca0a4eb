//! Lazy job source over a local directory tree.

use super::path::{path_to_url, url_to_path};
use crate::copy::CopyJob;
use std::fs::{self, ReadDir};
use std::io;
use std::path::{Path, PathBuf};

/// One level of the walk: an open directory and its path relative to the root.
struct Frame {
    entries: ReadDir,
    rel: PathBuf,
    depth: usize,
}

/// Iterator yielding one [`CopyJob`] per regular file under a source root.
///
/// Directories are read one at a time as the iterator is advanced, so memory
/// stays proportional to the directory depth, never to the tree size.
/// For a file at `root/rel`, the job targets `target/rel` under every target
/// root.
///
/// Symlinks, special files and entries whose name is not valid UTF-8 are
/// skipped. Directories that cannot be read, and directories deeper than
/// `max_depth`, are skipped with a warning.
///
/// # Example
///
/// ```no_run
/// use fancopy::{DirJobs, LocalFs, NoProgress, CopyOptions, copy_all};
///
/// let jobs = DirJobs::new("data", ["backup-a", "backup-b"])?;
/// let results = copy_all(jobs, &LocalFs::new(), &NoProgress, &CopyOptions::default());
/// # Ok::<(), std::io::Error>(())
/// ```
pub struct DirJobs {
    root: PathBuf,
    targets: Vec<PathBuf>,
    stack: Vec<Frame>,
    max_depth: Option<usize>,
    warn_handler: Option<fn(&str)>,
}

impl DirJobs {
    /// Start walking `source`. Fails if it cannot be read as a directory.
    pub fn new<I, T>(source: impl AsRef<str>, targets: I) -> io::Result<Self>
    where
        I: IntoIterator<Item = T>,
        T: AsRef<str>,
    {
        let root = url_to_path(source.as_ref())?;
        let targets = targets
            .into_iter()
            .map(|t| url_to_path(t.as_ref()))
            .collect::<io::Result<Vec<_>>>()?;
        let entries = fs::read_dir(&root)?;

        Ok(Self {
            root,
            targets,
            stack: vec![Frame {
                entries,
                rel: PathBuf::new(),
                depth: 0,
            }],
            max_depth: None,
            warn_handler: None,
        })
    }

    /// Do not descend below `depth` levels of subdirectories.
    #[must_use]
    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = Some(depth);
        self
    }

    /// Route skip warnings to `handler` instead of tracing.
    #[must_use]
    pub fn with_warn_handler(mut self, handler: fn(&str)) -> Self {
        self.warn_handler = Some(handler);
        self
    }

    fn warn(&self, msg: &str) {
        if let Some(handler) = self.warn_handler {
            handler(msg);
        } else {
            tracing::warn!("{}", msg);
        }
    }

    fn job_for(&self, rel: &Path, len: u64) -> io::Result<CopyJob> {
        let source = path_to_url(&self.root.join(rel))?;
        let targets = self
            .targets
            .iter()
            .map(|t| path_to_url(&t.join(rel)))
            .collect::<io::Result<Vec<_>>>()?;
        Ok(CopyJob::new(source, targets, len))
    }
}

impl Iterator for DirJobs {
    type Item = CopyJob;

    fn next(&mut self) -> Option<CopyJob> {
        loop {
            let frame = self.stack.last_mut()?;
            let Some(entry) = frame.entries.next() else {
                self.stack.pop();
                continue;
            };
            let rel_dir = frame.rel.clone();
            let depth = frame.depth;

            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    self.warn(&format!(
                        "Skipping unreadable entry in {}: {}",
                        self.root.join(&rel_dir).display(),
                        e
                    ));
                    continue;
                }
            };
            // Such a name has no URL that maps back to the same file
            if entry.file_name().to_str().is_none() {
                self.warn(&format!(
                    "Skipping {}: name is not valid UTF-8",
                    entry.path().display()
                ));
                continue;
            }
            let rel = rel_dir.join(entry.file_name());

            // file_type() does not follow symlinks
            let file_type = match entry.file_type() {
                Ok(file_type) => file_type,
                Err(e) => {
                    self.warn(&format!("Skipping {}: {}", entry.path().display(), e));
                    continue;
                }
            };

            if file_type.is_symlink() {
                self.warn(&format!("Skipping symlink: {}", entry.path().display()));
            } else if file_type.is_dir() {
                if self.max_depth.is_some_and(|max| depth >= max) {
                    self.warn(&format!(
                        "Skipping {}: maximum depth {} reached",
                        entry.path().display(),
                        depth
                    ));
                    continue;
                }
                match fs::read_dir(entry.path()) {
                    Ok(entries) => self.stack.push(Frame {
                        entries,
                        rel,
                        depth: depth + 1,
                    }),
                    Err(e) => {
                        self.warn(&format!(
                            "Skipping unreadable directory {}: {}",
                            entry.path().display(),
                            e
                        ));
                    }
                }
            } else if file_type.is_file() {
                match entry.metadata().and_then(|meta| self.job_for(&rel, meta.len())) {
                    Ok(job) => return Some(job),
                    Err(e) => {
                        self.warn(&format!("Skipping {}: {}", entry.path().display(), e));
                    }
                }
            } else {
                self.warn(&format!("Skipping special file: {}", entry.path().display()));
            }
        }
    }
}
