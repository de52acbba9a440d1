//! Exclusive ownership of a repository's working tree.
//!
//! git bisect keeps one checkout and one search state per repository, so two
//! sessions against the same location would corrupt each other.

use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

use fs2::FileExt;
use tracing::{debug, warn};

use crate::error::BisectError;

const LOCK_FILE_NAME: &str = "clang-bisect.lock";

/// Held for the lifetime of a session; released on drop.
#[derive(Debug)]
pub struct RepoLock {
    file: File,
    path: PathBuf,
}

impl RepoLock {
    /// Acquire the lock without blocking.
    pub fn acquire(repo_dir: &Path) -> Result<Self, BisectError> {
        let path = lock_path(repo_dir);
        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(false)
            .open(&path)
            .map_err(|e| BisectError::io(format!("open lock {}", path.display()), e))?;

        if let Err(e) = file.try_lock_exclusive() {
            debug!(err = %e, lock = %path.display(), "repository lock is held");
            return Err(BisectError::RepositoryBusy {
                repo: repo_dir.to_path_buf(),
                lock_path: path,
            });
        }
        debug!(lock = %path.display(), "acquired repository lock");
        Ok(Self { file, path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for RepoLock {
    fn drop(&mut self) {
        if let Err(e) = FileExt::unlock(&self.file) {
            warn!(err = %e, lock = %self.path.display(), "failed to release repository lock");
        }
    }
}

/// Lock inside `.git` when possible so it never shows up as an untracked file.
fn lock_path(repo_dir: &Path) -> PathBuf {
    let git_dir = repo_dir.join(".git");
    if git_dir.is_dir() {
        git_dir.join(LOCK_FILE_NAME)
    } else {
        repo_dir.join(format!(".{LOCK_FILE_NAME}"))
    }
}
