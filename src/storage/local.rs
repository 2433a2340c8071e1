//! Directory-backed object store.
//!
//! Each bucket is a subdirectory of the root and each object a file beneath it, so
//! `root/my-bucket/raw/data.csv` is object `raw/data.csv` in bucket `my-bucket`.

use std::fs::File;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use crate::error::{TransferError, TransferResult};

use super::ObjectStoreClient;

#[derive(Debug, Clone)]
pub struct LocalObjectStore {
    root: PathBuf,
}

impl LocalObjectStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Filesystem path backing `bucket/object`.
    pub fn object_path(&self, bucket: &str, object: &str) -> PathBuf {
        self.root.join(bucket).join(object)
    }

    /// Write `bytes` as `bucket/object`, creating the bucket directory as needed.
    pub fn put_object(&self, bucket: &str, object: &str, bytes: &[u8]) -> TransferResult<()> {
        let path = self.object_path(bucket, object);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, bytes)?;
        Ok(())
    }
}

impl ObjectStoreClient for LocalObjectStore {
    fn copy_object_to(&self, bucket: &str, object: &str, out: &mut dyn Write) -> TransferResult<u64> {
        let not_found = || TransferError::NotFound {
            bucket: bucket.to_string(),
            object: object.to_string(),
        };

        if !self.root.join(bucket).is_dir() {
            return Err(not_found());
        }

        let mut file = File::open(self.object_path(bucket, object)).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => not_found(),
            io::ErrorKind::PermissionDenied => TransferError::Authorization {
                message: format!("read denied for {bucket}/{object}: {e}"),
            },
            _ => TransferError::Io(e),
        })?;

        Ok(io::copy(&mut file, out)?)
    }
}
