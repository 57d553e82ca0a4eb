//! Mapping between local URLs and filesystem paths.
//!
//! Accepts plain paths and `file://` URLs. Any other `scheme://` prefix is
//! rejected with [`io::ErrorKind::Unsupported`] so a misrouted remote URL
//! never turns into a local file named `s3:`.
//!
//! On Windows, paths handed to the OS are converted to extended-length form
//! (`\\?\`) so deep destination trees and temp file names do not hit
//! `MAX_PATH`.

use std::io;
use std::path::{Path, PathBuf};

const FILE_SCHEME: &str = "file://";

/// Resolve a local URL to a path.
pub fn url_to_path(url: &str) -> io::Result<PathBuf> {
    if let Some(rest) = url.strip_prefix(FILE_SCHEME) {
        return Ok(PathBuf::from(rest));
    }

    if let Some((scheme, _)) = url.split_once("://") {
        let looks_like_scheme = !scheme.is_empty()
            && scheme
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'));
        if looks_like_scheme {
            return Err(io::Error::new(
                io::ErrorKind::Unsupported,
                format!("unsupported URL scheme: {scheme}"),
            ));
        }
    }

    Ok(PathBuf::from(url))
}

/// Render a path as the URL form used in jobs and error messages.
///
/// Fails with [`io::ErrorKind::InvalidData`] if the path is not valid
/// UTF-8, since the URL could not be mapped back to the same file.
pub fn path_to_url(path: &Path) -> io::Result<String> {
    path.to_str().map(str::to_owned).ok_or_else(|| {
        io::Error::new(
            io::ErrorKind::InvalidData,
            format!("path is not valid UTF-8: {}", path.display()),
        )
    })
}

/// Convert a path to an extended-length path format on Windows.
///
/// - Absolute paths like `C:\path` become `\\?\C:\path`
/// - UNC paths like `\\server\share\path` become `\\?\UNC\server\share\path`
/// - Relative paths are made absolute first
#[cfg(windows)]
pub(crate) fn safe_path(path: &Path) -> PathBuf {
    let path_str = path.as_os_str().to_string_lossy();
    if path_str.starts_with(r"\\?\") {
        return path.to_path_buf();
    }

    if let Some(without_prefix) = path_str.strip_prefix(r"\\") {
        return PathBuf::from(format!(r"\\?\UNC\{without_prefix}"));
    }

    let absolute_path = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::fs::canonicalize(path).unwrap_or_else(|_| match std::env::current_dir() {
            Ok(cwd) => cwd.join(path),
            Err(_) => path.to_path_buf(),
        })
    };

    PathBuf::from(format!(r"\\?\{}", absolute_path.display()))
}

/// Convert a path for safe use with file operations.
///
/// On non-Windows platforms, this simply returns a clone of the input path.
#[cfg(not(windows))]
pub(crate) fn safe_path(path: &Path) -> PathBuf {
    path.to_path_buf()
}
