//! Request-scoped scratch directories.
//!
//! A [`ScratchWorkspace`] is acquired at the start of a request and removed
//! when the request finishes. Removal happens exactly once: through
//! [`ScratchWorkspace::release`] on the normal path, or in `Drop` if the
//! handle goes out of scope first. Removal failures are logged and never
//! returned to the caller.

use std::path::{Path, PathBuf};
use tempfile::TempDir;

use crate::error::{FetchError, FetchResult};

pub const DEFAULT_PREFIX: &str = "downloader-";

#[derive(Debug)]
pub struct ScratchWorkspace {
    dir: Option<TempDir>,
    path: PathBuf,
}

impl ScratchWorkspace {
    /// Create a fresh, uniquely named directory under `root` (system temp dir if `None`)
    pub fn acquire(root: Option<&Path>, prefix: &str) -> FetchResult<Self> {
        let mut builder = tempfile::Builder::new();
        builder.prefix(prefix);

        let dir = match root {
            Some(root) => {
                fs_err::create_dir_all(root).map_err(FetchError::Workspace)?;
                builder.tempdir_in(root)
            }
            None => builder.tempdir(),
        }
        .map_err(FetchError::Workspace)?;

        let path = dir.path().to_path_buf();
        tracing::debug!("Acquired scratch workspace {}", path.display());

        Ok(Self {
            dir: Some(dir),
            path,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Recursively delete the directory
    pub fn release(mut self) {
        self.remove();
    }

    fn remove(&mut self) {
        let Some(dir) = self.dir.take() else {
            return;
        };

        match dir.close() {
            Ok(()) => tracing::debug!("Removed scratch workspace {}", self.path.display()),
            Err(e) => tracing::warn!("Cleanup error for {}: {}", self.path.display(), e),
        }
    }
}

impl Drop for ScratchWorkspace {
    fn drop(&mut self) {
        if self.dir.is_some() {
            tracing::debug!("Scratch workspace {} dropped without release", self.path.display());
            self.remove();
        }
    }
}
