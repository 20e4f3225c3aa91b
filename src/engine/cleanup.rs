// Scoped cleanup of encoder statistics and incomplete renditions

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::utils::path::JobLayout;

/// Deletes every statistics artifact in a job directory when dropped, so
/// logs go away on success, failure, cancellation and panics alike
#[derive(Debug)]
pub struct StatsCleanupGuard {
    job_dir: PathBuf,
}

impl StatsCleanupGuard {
    pub fn new(job_dir: impl Into<PathBuf>) -> Self {
        Self {
            job_dir: job_dir.into(),
        }
    }

    pub fn job_dir(&self) -> &Path {
        &self.job_dir
    }

    /// Remove matching files now; returns how many were deleted
    pub fn sweep(&self) -> usize {
        if !self.job_dir.is_dir() {
            debug!(dir = %self.job_dir.display(), "Nothing to clean");
            return 0;
        }

        let mut removed = 0;
        let entries = WalkDir::new(&self.job_dir).min_depth(1).max_depth(1);
        for entry in entries.into_iter().filter_map(Result::ok) {
            if !entry.file_type().is_file()
                || !JobLayout::is_stats_artifact(&entry.file_name().to_string_lossy())
            {
                continue;
            }
            match fs::remove_file(entry.path()) {
                Ok(()) => removed += 1,
                Err(err) => warn!(
                    path = %entry.path().display(),
                    error = %err,
                    "Failed to remove statistics log"
                ),
            }
        }
        removed
    }
}

impl Drop for StatsCleanupGuard {
    fn drop(&mut self) {
        let removed = self.sweep();
        if removed > 0 {
            debug!(dir = %self.job_dir.display(), removed, "Removed statistics logs");
        }
    }
}

/// Removes a rendition on drop unless the job reached `Completed` and
/// called [`RenditionGuard::keep`]
#[derive(Debug)]
pub struct RenditionGuard {
    output: PathBuf,
    keep: bool,
}

impl RenditionGuard {
    pub fn new(output: impl Into<PathBuf>) -> Self {
        Self {
            output: output.into(),
            keep: false,
        }
    }

    pub fn keep(mut self) {
        self.keep = true;
    }
}

impl Drop for RenditionGuard {
    fn drop(&mut self) {
        if self.keep {
            return;
        }
        match fs::remove_file(&self.output) {
            Ok(()) => debug!(path = %self.output.display(), "Removed incomplete rendition"),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
            Err(err) => warn!(
                path = %self.output.display(),
                error = %err,
                "Failed to remove incomplete rendition"
            ),
        }
    }
}
