//! Output directory preparation.

use std::io;
use std::path::{Path, PathBuf};

use frameforge_common::error::FrameforgeError;

use crate::settle::Settlement;

/// Filesystem operations needed to prepare an output location.
pub trait Filesystem: Send + Sync {
    fn exists(&self, path: &Path) -> bool;

    /// Create `path` and any missing parents.
    fn create_dir_all(&self, path: &Path) -> io::Result<()>;
}

/// [`Filesystem`] backed by `std::fs`.
#[derive(Debug, Clone, Copy, Default)]
pub struct StdFilesystem;

impl Filesystem for StdFilesystem {
    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn create_dir_all(&self, path: &Path) -> io::Result<()> {
        std::fs::create_dir_all(path)
    }
}

/// Directory an output file will be written into.
///
/// A bare file name lives in the current directory.
pub fn output_parent(output: &Path) -> PathBuf {
    match output.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

/// Make sure the parent directory of `output` exists.
///
/// On failure the job is rejected with `DirectoryUnavailable` and `false` is
/// returned.
pub fn ensure_output_dir<T>(
    fs: &dyn Filesystem,
    output: &Path,
    silent: bool,
    settlement: &Settlement<T>,
) -> bool {
    let dir = output_parent(output);
    if fs.exists(&dir) {
        return true;
    }

    match fs.create_dir_all(&dir) {
        Ok(()) => {
            tracing::debug!(dir = %dir.display(), "Created output directory");
            true
        }
        Err(e) => {
            if !silent {
                tracing::warn!(dir = %dir.display(), error = %e, "Could not create/access output directory");
            }
            settlement.reject(FrameforgeError::directory_unavailable(dir, e.to_string()));
            false
        }
    }
}
