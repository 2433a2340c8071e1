//! Local scratch files for downloaded objects.

use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::error::TransferResult;

/// Default scratch directory for staged downloads.
pub const DEFAULT_STAGING_DIR: &str = "/tmp";

/// What happens to a [`StagingFile`] once the loader is done with it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StagingCleanup {
    /// Remove the local copy on every exit path, success or failure.
    Delete,
    /// Leave the local copy in place for the caller.
    Retain,
}

/// Maps object names to local scratch paths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagingArea {
    dir: PathBuf,
}

impl Default for StagingArea {
    fn default() -> Self {
        Self::new(DEFAULT_STAGING_DIR)
    }
}

impl StagingArea {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Local path for `object_name`: the scratch directory joined with the name, unchanged.
    ///
    /// Names are trusted; there is no traversal or collision check.
    pub fn local_path(&self, object_name: &str) -> PathBuf {
        self.dir.join(object_name)
    }
}

/// A downloaded object on local disk.
///
/// The [`StagingCleanup`] policy is applied when the handle is finished or dropped, so a
/// parse failure cannot leak a file that was meant to be deleted.
#[derive(Debug)]
pub struct StagingFile {
    path: PathBuf,
    cleanup: StagingCleanup,
    bytes: u64,
    done: bool,
}

impl StagingFile {
    pub(crate) fn new(path: PathBuf, bytes: u64) -> Self {
        Self {
            path,
            cleanup: StagingCleanup::Retain,
            bytes,
            done: false,
        }
    }

    /// Set the policy applied on [`Self::finish`] or drop.
    pub fn with_cleanup(mut self, cleanup: StagingCleanup) -> Self {
        self.cleanup = cleanup;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn cleanup(&self) -> StagingCleanup {
        self.cleanup
    }

    /// Size of the staged object in bytes.
    pub fn len(&self) -> u64 {
        self.bytes
    }

    pub fn is_empty(&self) -> bool {
        self.bytes == 0
    }

    pub fn open(&self) -> TransferResult<File> {
        Ok(File::open(&self.path)?)
    }

    /// The staged bytes, undecoded.
    pub fn read_bytes(&self) -> TransferResult<Vec<u8>> {
        Ok(fs::read(&self.path)?)
    }

    /// Apply the cleanup policy now, reporting removal failures.
    ///
    /// Returns the local path, which only still exists under [`StagingCleanup::Retain`].
    pub fn finish(mut self) -> TransferResult<PathBuf> {
        self.done = true;
        if self.cleanup == StagingCleanup::Delete {
            remove_if_present(&self.path)?;
            debug!(path = %self.path.display(), "removed staging file");
        }
        Ok(std::mem::take(&mut self.path))
    }
}

impl Drop for StagingFile {
    fn drop(&mut self) {
        if self.done || self.cleanup == StagingCleanup::Retain {
            return;
        }
        if let Err(e) = remove_if_present(&self.path) {
            warn!(path = %self.path.display(), error = %e, "failed to remove staging file");
        }
    }
}

fn remove_if_present(path: &Path) -> io::Result<()> {
    match fs::remove_file(path) {
        Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn local_path_joins_name_unchanged() {
        let area = StagingArea::default();
        assert_eq!(area.local_path("data.json"), PathBuf::from("/tmp/data.json"));
        assert_eq!(
            area.local_path("nested/data.csv"),
            PathBuf::from("/tmp/nested/data.csv")
        );
    }

    #[test]
    fn drop_applies_delete_policy() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("obj");
        fs::write(&path, b"x").unwrap();

        drop(StagingFile::new(path.clone(), 1).with_cleanup(StagingCleanup::Delete));
        assert!(!path.exists());
    }

    #[test]
    fn retain_policy_keeps_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("obj");
        fs::write(&path, b"x").unwrap();

        let kept = StagingFile::new(path.clone(), 1).finish().unwrap();
        assert_eq!(kept, path);
        assert!(path.exists());
    }
}
