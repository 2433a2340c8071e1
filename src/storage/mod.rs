//! Object storage access and local staging.
//!
//! [`ObjectStoreReader`] copies one remote object into the [`StagingArea`] through an injected
//! [`ObjectStoreClient`], and hands back a [`StagingFile`] for the loaders to parse.

pub mod local;
pub mod staging;

use std::fmt;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::Arc;

use tracing::debug;

use crate::error::TransferResult;

pub use local::LocalObjectStore;
pub use staging::{StagingArea, StagingCleanup, StagingFile, DEFAULT_STAGING_DIR};

/// Read access to a bucket/object store.
///
/// Implementations map a missing bucket or object to [`crate::TransferError::NotFound`] and
/// rejected credentials to [`crate::TransferError::Authorization`].
pub trait ObjectStoreClient: Send + Sync {
    /// Stream the full contents of `bucket/object` into `out`, returning the byte count.
    fn copy_object_to(&self, bucket: &str, object: &str, out: &mut dyn Write) -> TransferResult<u64>;
}

/// Downloads objects into the staging area.
#[derive(Clone)]
pub struct ObjectStoreReader {
    client: Arc<dyn ObjectStoreClient>,
    staging: StagingArea,
}

impl fmt::Debug for ObjectStoreReader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectStoreReader")
            .field("staging", &self.staging)
            .finish_non_exhaustive()
    }
}

impl ObjectStoreReader {
    pub fn new(client: Arc<dyn ObjectStoreClient>, staging: StagingArea) -> Self {
        Self { client, staging }
    }

    pub fn staging(&self) -> &StagingArea {
        &self.staging
    }

    /// Copy `bucket/object` to its staging path, overwriting any file already there.
    ///
    /// The returned handle retains the file; set a policy with [`StagingFile::with_cleanup`].
    /// A failed download removes the partially written file.
    pub fn stage(&self, bucket: &str, object: &str) -> TransferResult<StagingFile> {
        let path = self.staging.local_path(object);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        match self.download(bucket, object, &path) {
            Ok(bytes) => {
                debug!(bucket, object, path = %path.display(), bytes, "staged object");
                Ok(StagingFile::new(path, bytes))
            }
            Err(e) => {
                let _ = fs::remove_file(&path);
                Err(e)
            }
        }
    }

    fn download(&self, bucket: &str, object: &str, path: &Path) -> TransferResult<u64> {
        let mut out = BufWriter::new(File::create(path)?);
        let n = self.client.copy_object_to(bucket, object, &mut out)?;
        out.flush()?;
        Ok(n)
    }
}
