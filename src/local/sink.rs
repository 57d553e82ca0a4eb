//! Local file target sink.

use super::path::safe_path;
use crate::handle::Sink;
use std::fs::File;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// Where the bytes of a local target go until it is closed.
#[derive(Debug)]
enum Staging {
    /// Written in place; partial data stays if the copy fails.
    Direct(File),
    /// Written to a temp file in the destination directory and renamed
    /// over the destination only when the copy completed.
    Temp(tempfile::NamedTempFile),
}

/// Sink writing one local file.
#[derive(Debug)]
pub(crate) struct FileSink {
    path: PathBuf,
    staging: Staging,
    fsync: bool,
}

impl FileSink {
    /// Create (or truncate) `path` and write straight into it.
    pub(crate) fn direct(path: &Path, fsync: bool) -> io::Result<Self> {
        let file = File::create(safe_path(path))?;
        Ok(Self {
            path: path.to_path_buf(),
            staging: Staging::Direct(file),
            fsync,
        })
    }

    /// Stage into a temp file next to `path`.
    ///
    /// On Unix the temp file is created with mode `0o666` minus the umask,
    /// like a directly created target.
    pub(crate) fn atomic(path: &Path, parent: &Path, fsync: bool) -> io::Result<Self> {
        #[cfg(unix)]
        let temp = {
            use std::os::unix::fs::PermissionsExt;
            tempfile::Builder::new()
                .permissions(std::fs::Permissions::from_mode(0o666))
                .tempfile_in(safe_path(parent))?
        };
        #[cfg(not(unix))]
        let temp = tempfile::NamedTempFile::new_in(safe_path(parent))?;
        Ok(Self {
            path: path.to_path_buf(),
            staging: Staging::Temp(temp),
            fsync,
        })
    }

}

impl Sink for FileSink {
    fn write_all(&mut self, buf: &[u8]) -> io::Result<()> {
        match &mut self.staging {
            Staging::Direct(file) => file.write_all(buf),
            Staging::Temp(temp) => temp.write_all(buf),
        }
    }

    fn close(self: Box<Self>, completed: bool) -> io::Result<()> {
        let FileSink {
            path,
            staging,
            fsync,
        } = *self;

        match staging {
            Staging::Direct(file) => {
                if completed && fsync {
                    file.sync_all()?;
                }
                Ok(())
            }
            Staging::Temp(temp) => {
                if !completed {
                    // Removes the temp file; the destination is untouched
                    return temp.close();
                }
                if fsync {
                    temp.as_file().sync_all()?;
                }
                temp.persist(safe_path(&path)).map_err(|e| e.error)?;
                Ok(())
            }
        }
    }
}
