use std::fmt;
use std::sync::Arc;

use tracing::{error, info, warn};

use crate::error::TransferError;

/// Severity classification used for observer callbacks and alerting thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum TransferSeverity {
    /// Informational event.
    Info,
    /// Warning-level event (non-fatal).
    Warning,
    /// The operation failed because of its input (schema, payload, rejected job).
    Error,
    /// The operation failed because of infrastructure (missing object, credentials, disk, network).
    Critical,
}

impl TransferSeverity {
    /// Classify a failure.
    pub fn for_error(e: &TransferError) -> Self {
        match e {
            TransferError::Io(_)
            | TransferError::NotFound { .. }
            | TransferError::Authorization { .. }
            | TransferError::Store { .. }
            | TransferError::Config { .. } => TransferSeverity::Critical,
            TransferError::Csv(err) => match err.kind() {
                ::csv::ErrorKind::Io(_) => TransferSeverity::Critical,
                _ => TransferSeverity::Error,
            },
            #[cfg(feature = "gcp")]
            TransferError::Http(_) => TransferSeverity::Critical,
            TransferError::Json(_)
            | TransferError::MalformedPayload { .. }
            | TransferError::ParseError { .. }
            | TransferError::SchemaMismatch { .. }
            | TransferError::LoadJob { .. } => TransferSeverity::Error,
        }
    }
}

/// Which public operation an event belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferOperation {
    LoadValues,
    LoadCsv,
    Append,
}

/// Context about one operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferContext {
    pub operation: TransferOperation,
    /// `gs://bucket/object` for loads, `dataset.table` for appends.
    pub target: String,
}

/// Stats reported on success.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferStats {
    /// Rows loaded or appended.
    pub rows: usize,
}

/// Observer interface for operation outcomes.
///
/// Implementors can record metrics, logs, or trigger alerts.
pub trait TransferObserver: Send + Sync {
    fn on_success(&self, _ctx: &TransferContext, _stats: TransferStats) {}

    fn on_failure(&self, _ctx: &TransferContext, _severity: TransferSeverity, _error: &TransferError) {}

    /// Called when a failure meets the alert threshold.
    ///
    /// Default behavior forwards to [`Self::on_failure`].
    fn on_alert(&self, ctx: &TransferContext, severity: TransferSeverity, error: &TransferError) {
        self.on_failure(ctx, severity, error)
    }
}

/// Fans callbacks out to a list of observers.
#[derive(Default)]
pub struct CompositeObserver {
    observers: Vec<Arc<dyn TransferObserver>>,
}

impl CompositeObserver {
    pub fn new(observers: Vec<Arc<dyn TransferObserver>>) -> Self {
        Self { observers }
    }
}

impl fmt::Debug for CompositeObserver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompositeObserver")
            .field("observers_len", &self.observers.len())
            .finish()
    }
}

impl TransferObserver for CompositeObserver {
    fn on_success(&self, ctx: &TransferContext, stats: TransferStats) {
        for o in &self.observers {
            o.on_success(ctx, stats);
        }
    }

    fn on_failure(&self, ctx: &TransferContext, severity: TransferSeverity, error: &TransferError) {
        for o in &self.observers {
            o.on_failure(ctx, severity, error);
        }
    }

    fn on_alert(&self, ctx: &TransferContext, severity: TransferSeverity, error: &TransferError) {
        for o in &self.observers {
            o.on_alert(ctx, severity, error);
        }
    }
}

/// Emits outcomes as `tracing` events.
#[derive(Debug, Default)]
pub struct TracingObserver;

impl TransferObserver for TracingObserver {
    fn on_success(&self, ctx: &TransferContext, stats: TransferStats) {
        info!(operation = ?ctx.operation, target = %ctx.target, rows = stats.rows, "transfer ok");
    }

    fn on_failure(&self, ctx: &TransferContext, severity: TransferSeverity, error: &TransferError) {
        warn!(
            operation = ?ctx.operation,
            target = %ctx.target,
            ?severity,
            stage = ?error.stage(),
            %error,
            "transfer failed"
        );
    }

    fn on_alert(&self, ctx: &TransferContext, severity: TransferSeverity, error: &TransferError) {
        error!(
            operation = ?ctx.operation,
            target = %ctx.target,
            ?severity,
            stage = ?error.stage(),
            %error,
            "transfer alert"
        );
    }
}
