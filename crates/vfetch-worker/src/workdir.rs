//! Process-wide working directory.
//!
//! Created at startup and removed, with everything in it, at shutdown.
//! Completed artifacts that were never downloaded are lost at that point.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, info, warn};

use vfetch_models::{sanitize_filename, TaskId};

use crate::error::WorkerResult;

#[derive(Debug)]
pub struct WorkDir {
    path: PathBuf,
    purged: AtomicBool,
}

impl WorkDir {
    /// Create (or reuse) the directory.
    pub async fn create(path: impl Into<PathBuf>) -> WorkerResult<Self> {
        let path = path.into();
        tokio::fs::create_dir_all(&path).await?;
        info!(path = %path.display(), "Working directory ready");
        Ok(Self {
            path,
            purged: AtomicBool::new(false),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether the directory is still present on disk.
    pub fn exists(&self) -> bool {
        self.path.is_dir()
    }

    /// Absolute path of a file inside the directory.
    ///
    /// Only the final component of `file_name` is used, so callers cannot
    /// escape the directory.
    pub fn path_for(&self, file_name: &str) -> PathBuf {
        let name = Path::new(file_name)
            .file_name()
            .map(PathBuf::from)
            .unwrap_or_default();
        self.path.join(name)
    }

    /// Deterministic working file name: `{task_id}_{title}_{stage}.{ext}`.
    pub fn file_name(task_id: &TaskId, title: &str, stage: &str, ext: &str) -> String {
        format!("{}_{}_{}.{}", task_id, sanitize_filename(title), stage, ext)
    }

    /// Remove every file and the directory itself.
    ///
    /// Returns the number of files removed. Only the first call does any work.
    pub async fn purge(&self) -> WorkerResult<usize> {
        if self.purged.swap(true, Ordering::SeqCst) {
            return Ok(0);
        }

        let mut entries = match tokio::fs::read_dir(&self.path).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(e.into()),
        };

        let mut removed = 0;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            let result = if entry.file_type().await?.is_dir() {
                tokio::fs::remove_dir_all(&path).await
            } else {
                tokio::fs::remove_file(&path).await
            };
            match result {
                Ok(()) => removed += 1,
                Err(e) => warn!(path = %path.display(), "Failed to remove working file: {}", e),
            }
        }

        tokio::fs::remove_dir_all(&self.path).await?;

        if removed > 0 {
            warn!(
                path = %self.path.display(),
                files = removed,
                "Purged working directory; unretrieved downloads are no longer available"
            );
        } else {
            info!(path = %self.path.display(), "Purged working directory");
        }

        Ok(removed)
    }
}

impl Drop for WorkDir {
    fn drop(&mut self) {
        if self.purged.swap(true, Ordering::SeqCst) {
            return;
        }
        match std::fs::remove_dir_all(&self.path) {
            Ok(()) => debug!(path = %self.path.display(), "Removed working directory on drop"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(path = %self.path.display(), "Failed to remove working directory: {}", e),
        }
    }
}
