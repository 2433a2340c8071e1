//! Single entry point over the loaders and the appender.
//!
//! [`Transfer`] owns the injected object store and warehouse clients, resolves the staging
//! area from [`TransferOptions`], and reports every outcome to the configured observer.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use crate::clock::Clock;
use crate::error::TransferResult;
use crate::storage::{ObjectStoreClient, ObjectStoreReader, StagingArea, DEFAULT_STAGING_DIR};
use crate::types::DataSet;
use crate::warehouse::{
    AppendSummary, ColumnModes, ColumnTypes, WarehouseAppender, WarehouseClient, INGESTION_TIME_COLUMN,
};

use super::csv::{self, CsvLoadOptions, TypeHints};
use super::observability::{
    TransferContext, TransferObserver, TransferOperation, TransferSeverity, TransferStats,
};
use super::values::{self, ValuesLoadOptions};

/// Options shared by every [`Transfer`] operation.
///
/// Use [`Default`] for common cases.
#[derive(Clone)]
pub struct TransferOptions {
    /// Scratch directory for staged downloads.
    pub staging_dir: PathBuf,
    /// Name of the synthesized ingestion timestamp column.
    pub ingestion_column: String,
    /// Optional observer for logging/alerts.
    pub observer: Option<Arc<dyn TransferObserver>>,
    /// Severity threshold at which `on_alert` is invoked.
    pub alert_at_or_above: TransferSeverity,
}

impl fmt::Debug for TransferOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransferOptions")
            .field("staging_dir", &self.staging_dir)
            .field("ingestion_column", &self.ingestion_column)
            .field("observer_set", &self.observer.is_some())
            .field("alert_at_or_above", &self.alert_at_or_above)
            .finish()
    }
}

impl Default for TransferOptions {
    fn default() -> Self {
        Self {
            staging_dir: PathBuf::from(DEFAULT_STAGING_DIR),
            ingestion_column: INGESTION_TIME_COLUMN.to_string(),
            observer: None,
            alert_at_or_above: TransferSeverity::Critical,
        }
    }
}

/// Moves data between object storage, memory and the warehouse.
///
/// When an observer is configured, each operation reports:
///
/// - `on_success` with the row count
/// - `on_failure` with a computed severity
/// - `on_alert` when that severity is >= `options.alert_at_or_above`
///
/// ```no_run
/// use std::sync::Arc;
///
/// use rust_warehouse_ingest::ingestion::{Transfer, TransferOptions};
/// use rust_warehouse_ingest::storage::LocalObjectStore;
/// use rust_warehouse_ingest::warehouse::{ColumnTypes, InMemoryWarehouse, WarehouseType};
///
/// # fn main() -> Result<(), rust_warehouse_ingest::TransferError> {
/// let warehouse = Arc::new(InMemoryWarehouse::new());
/// warehouse.create_table("census", "population");
///
/// let transfer = Transfer::new(
///     Arc::new(LocalObjectStore::new("/data/buckets")),
///     warehouse,
///     TransferOptions::default(),
/// );
///
/// let table = transfer.load_values("raw-bucket", "population.json")?;
/// let types = ColumnTypes::from([
///     ("state".to_string(), WarehouseType::String),
///     ("population".to_string(), WarehouseType::Integer),
/// ]);
/// transfer.append(&table, &types, "census", "population", None)?;
/// # Ok(())
/// # }
/// ```
pub struct Transfer {
    reader: ObjectStoreReader,
    appender: WarehouseAppender,
    options: TransferOptions,
}

impl fmt::Debug for Transfer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transfer")
            .field("reader", &self.reader)
            .field("appender", &self.appender)
            .field("options", &self.options)
            .finish()
    }
}

impl Transfer {
    pub fn new(
        store: Arc<dyn ObjectStoreClient>,
        warehouse: Arc<dyn WarehouseClient>,
        options: TransferOptions,
    ) -> Self {
        let reader = ObjectStoreReader::new(store, StagingArea::new(options.staging_dir.clone()));
        let appender =
            WarehouseAppender::new(warehouse).with_ingestion_column(options.ingestion_column.clone());
        Self {
            reader,
            appender,
            options,
        }
    }

    /// Replace the clock used for ingestion timestamps.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.appender = self.appender.with_clock(clock);
        self
    }

    pub fn options(&self) -> &TransferOptions {
        &self.options
    }

    /// Local staging path used for `object`.
    pub fn local_path(&self, object: &str) -> PathBuf {
        self.reader.staging().local_path(object)
    }

    /// Load a values-format JSON object; the staging file is deleted afterwards.
    pub fn load_values(&self, bucket: &str, object: &str) -> TransferResult<DataSet> {
        self.load_values_with(bucket, object, &ValuesLoadOptions::default())
    }

    pub fn load_values_with(
        &self,
        bucket: &str,
        object: &str,
        options: &ValuesLoadOptions,
    ) -> TransferResult<DataSet> {
        let result = values::load_values(&self.reader, bucket, object, options);
        self.report(
            TransferOperation::LoadValues,
            || object_uri(bucket, object),
            &result,
            DataSet::row_count,
        );
        result
    }

    /// Load a CSV object with optional type hints; the staging file is kept.
    pub fn load_csv(
        &self,
        bucket: &str,
        object: &str,
        type_hints: Option<&TypeHints>,
    ) -> TransferResult<DataSet> {
        let options = CsvLoadOptions {
            type_hints: type_hints.cloned().unwrap_or_default(),
            ..Default::default()
        };
        self.load_csv_with(bucket, object, &options)
    }

    pub fn load_csv_with(
        &self,
        bucket: &str,
        object: &str,
        options: &CsvLoadOptions,
    ) -> TransferResult<DataSet> {
        let result = csv::load_csv(&self.reader, bucket, object, options);
        self.report(
            TransferOperation::LoadCsv,
            || object_uri(bucket, object),
            &result,
            DataSet::row_count,
        );
        result
    }

    /// Append `data` to `dataset.table`; see [`WarehouseAppender::append`].
    pub fn append(
        &self,
        data: &DataSet,
        column_types: &ColumnTypes,
        dataset: &str,
        table: &str,
        column_modes: Option<&ColumnModes>,
    ) -> TransferResult<AppendSummary> {
        let result = self
            .appender
            .append(data, column_types, dataset, table, column_modes);
        self.report(
            TransferOperation::Append,
            || format!("{dataset}.{table}"),
            &result,
            |summary| summary.rows,
        );
        result
    }

    fn report<T>(
        &self,
        operation: TransferOperation,
        target: impl FnOnce() -> String,
        result: &TransferResult<T>,
        rows: impl FnOnce(&T) -> usize,
    ) {
        let Some(obs) = self.options.observer.as_ref() else {
            return;
        };
        let ctx = TransferContext {
            operation,
            target: target(),
        };
        match result {
            Ok(value) => obs.on_success(&ctx, TransferStats { rows: rows(value) }),
            Err(e) => {
                let sev = TransferSeverity::for_error(e);
                obs.on_failure(&ctx, sev, e);
                if sev >= self.options.alert_at_or_above {
                    obs.on_alert(&ctx, sev, e);
                }
            }
        }
    }
}

fn object_uri(bucket: &str, object: &str) -> String {
    format!("gs://{bucket}/{object}")
}
