use thiserror::Error;

/// Convenience result type for staging, loading and append operations.
pub type TransferResult<T> = Result<T, TransferError>;

/// The step of an operation that produced a [`TransferError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransferStage {
    /// Column-set validation that runs before any I/O.
    SchemaCheck,
    /// Fetching an object and writing it to the local staging path.
    Staging,
    /// Decoding staged bytes into a [`crate::types::DataSet`].
    Parse,
    /// Submitting or waiting on a warehouse load job.
    LoadJob,
}

/// Error type returned by every operation in this crate.
///
/// Nothing is retried or swallowed internally; each variant carries the originating cause.
#[derive(Debug, Error)]
pub enum TransferError {
    /// Local filesystem error while staging (create/write/read/remove).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed CSV payload.
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    /// Payload is not valid JSON.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// Payload is valid JSON but not shaped as expected (e.g. not an array of arrays).
    #[error("malformed payload: {message}")]
    MalformedPayload { message: String },

    /// A value could not be parsed into the requested [`crate::types::DataType`].
    #[error("failed to parse value at row {row} column '{column}': {message} (raw='{raw}')")]
    ParseError {
        row: usize,
        column: String,
        raw: String,
        message: String,
    },

    /// Table columns and the declared column-type mapping disagree.
    #[error("schema mismatch: {message}")]
    SchemaMismatch { message: String },

    /// The bucket or object does not exist.
    #[error("object not found: gs://{bucket}/{object}")]
    NotFound { bucket: String, object: String },

    /// The ambient credentials were rejected.
    #[error("not authorized: {message}")]
    Authorization { message: String },

    /// Any other object store failure.
    #[error("object store error: {message}")]
    Store { message: String },

    /// The warehouse rejected the load job or the job finished with an error.
    #[error("load job {} failed: {message}", .job_id.as_deref().unwrap_or("<unsubmitted>"))]
    LoadJob {
        job_id: Option<String>,
        message: String,
    },

    /// Client configuration is missing or invalid.
    #[error("configuration error: {message}")]
    Config { message: String },

    /// HTTP transport error from a storage download or client construction.
    ///
    /// BigQuery transport failures are reported as [`TransferError::LoadJob`] instead.
    #[cfg(feature = "gcp")]
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
}

impl TransferError {
    /// The step that failed, for diagnostics and alerting.
    pub fn stage(&self) -> TransferStage {
        match self {
            TransferError::SchemaMismatch { .. } => TransferStage::SchemaCheck,
            TransferError::Csv(_)
            | TransferError::Json(_)
            | TransferError::MalformedPayload { .. }
            | TransferError::ParseError { .. } => TransferStage::Parse,
            TransferError::Io(_)
            | TransferError::NotFound { .. }
            | TransferError::Authorization { .. }
            | TransferError::Store { .. }
            | TransferError::Config { .. } => TransferStage::Staging,
            TransferError::LoadJob { .. } => TransferStage::LoadJob,
            #[cfg(feature = "gcp")]
            TransferError::Http(_) => TransferStage::Staging,
        }
    }

    pub(crate) fn schema_mismatch(message: impl Into<String>) -> Self {
        TransferError::SchemaMismatch {
            message: message.into(),
        }
    }

    pub(crate) fn malformed(message: impl Into<String>) -> Self {
        TransferError::MalformedPayload {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_job_message_names_job_or_placeholder() {
        let with_id = TransferError::LoadJob {
            job_id: Some("job_123".to_string()),
            message: "quota exceeded".to_string(),
        };
        assert_eq!(with_id.to_string(), "load job job_123 failed: quota exceeded");

        let without_id = TransferError::LoadJob {
            job_id: None,
            message: "permission denied".to_string(),
        };
        assert_eq!(
            without_id.to_string(),
            "load job <unsubmitted> failed: permission denied"
        );
    }

    #[test]
    fn stage_classifies_variants() {
        assert_eq!(
            TransferError::schema_mismatch("x").stage(),
            TransferStage::SchemaCheck
        );
        assert_eq!(TransferError::malformed("x").stage(), TransferStage::Parse);
        assert_eq!(
            TransferError::NotFound {
                bucket: "b".into(),
                object: "o".into()
            }
            .stage(),
            TransferStage::Staging
        );
        assert_eq!(
            TransferError::LoadJob {
                job_id: None,
                message: "x".into()
            }
            .stage(),
            TransferStage::LoadJob
        );
    }
}
