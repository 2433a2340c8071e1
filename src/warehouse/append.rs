//! Append a [`DataSet`] to a warehouse table with an ingestion timestamp.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use tracing::{debug, info};

use crate::clock::{Clock, SystemClock};
use crate::error::{TransferError, TransferResult};
use crate::types::{DataSet, DataType, Value};

use super::schema::{ColumnModes, ColumnTypes, SchemaField, WarehouseType};
use super::{LoadJob, SourceFormat, TableRef, WarehouseClient, WriteDisposition};

/// Name of the synthesized column holding the append time.
pub const INGESTION_TIME_COLUMN: &str = "ingestion_time";

/// Outcome of a successful [`WarehouseAppender::append`].
#[derive(Debug, Clone, PartialEq)]
pub struct AppendSummary {
    pub destination: TableRef,
    pub job_id: String,
    /// Rows sent with the job.
    pub rows: usize,
    /// The ingestion timestamp written to every row, in seconds since the Unix epoch.
    pub ingestion_time: f64,
}

/// Appends datasets to existing warehouse tables.
///
/// Every call adds one `ingestion_time` column (type `TIMESTAMP`) holding a single clock reading
/// shared by all rows, and submits an append-only load job. Nothing is ever overwritten, so
/// repeating a call appends the rows again.
#[derive(Clone)]
pub struct WarehouseAppender {
    client: Arc<dyn WarehouseClient>,
    clock: Arc<dyn Clock>,
    ingestion_column: String,
}

impl fmt::Debug for WarehouseAppender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WarehouseAppender")
            .field("ingestion_column", &self.ingestion_column)
            .finish_non_exhaustive()
    }
}

impl WarehouseAppender {
    /// Create an appender that timestamps rows with the system clock.
    pub fn new(client: Arc<dyn WarehouseClient>) -> Self {
        Self {
            client,
            clock: Arc::new(SystemClock),
            ingestion_column: INGESTION_TIME_COLUMN.to_string(),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Override the name of the synthesized timestamp column.
    pub fn with_ingestion_column(mut self, name: impl Into<String>) -> Self {
        self.ingestion_column = name.into();
        self
    }

    pub fn ingestion_column(&self) -> &str {
        &self.ingestion_column
    }

    /// Append `data` to `dataset.table`.
    ///
    /// `column_types` must name exactly the columns of `data`: same count, same names, and every
    /// row must hold one value per column. Anything else is [`TransferError::SchemaMismatch`],
    /// returned before the warehouse is contacted.
    /// `column_modes` sets per-column modes; unlisted columns are `NULLABLE`.
    ///
    /// `data` itself is not modified; the timestamp column is added to a copy.
    pub fn append(
        &self,
        data: &DataSet,
        column_types: &ColumnTypes,
        dataset: &str,
        table: &str,
        column_modes: Option<&ColumnModes>,
    ) -> TransferResult<AppendSummary> {
        check_columns(data, column_types)?;
        check_row_widths(data)?;

        let mut types = column_types.clone();
        types.insert(self.ingestion_column.clone(), WarehouseType::Timestamp);

        let ingestion_time = self.clock.now_epoch_seconds();
        let stamped = data.with_constant_column(
            &self.ingestion_column,
            DataType::Float64,
            Value::Float64(ingestion_time),
        );

        let job = LoadJob {
            destination: TableRef::new(dataset, table),
            schema: build_schema(&stamped, &types, column_modes)?,
            write_disposition: WriteDisposition::Append,
            source_format: SourceFormat::NewlineDelimitedJson,
            rows: to_records(&stamped),
        };
        debug!(
            destination = %job.destination,
            fields = job.schema.len(),
            rows = job.rows.len(),
            "submitting load job"
        );

        let completed = self.client.run_load_job(&job)?;
        info!(
            destination = %job.destination,
            job_id = %completed.job_id,
            rows = job.rows.len(),
            ingestion_time,
            "appended rows"
        );

        Ok(AppendSummary {
            destination: job.destination,
            job_id: completed.job_id,
            rows: job.rows.len(),
            ingestion_time,
        })
    }
}

/// Require `column_types` keys to equal the dataset's columns exactly.
///
/// Counts are compared as well as names, so a dataset with a repeated column name never matches.
pub fn check_columns(data: &DataSet, column_types: &ColumnTypes) -> TransferResult<()> {
    let columns: BTreeSet<&str> = data.schema.field_names().collect();
    let declared: BTreeSet<&str> = column_types.keys().map(String::as_str).collect();

    if columns == declared && column_types.len() == data.schema.len() {
        return Ok(());
    }

    let missing: Vec<&str> = columns.difference(&declared).copied().collect();
    let unexpected: Vec<&str> = declared.difference(&columns).copied().collect();
    let mut message = format!(
        "column types did not match table columns ({} declared, {} in table)",
        column_types.len(),
        data.schema.len()
    );
    if !missing.is_empty() {
        message.push_str(&format!("; no type for {missing:?}"));
    }
    if !unexpected.is_empty() {
        message.push_str(&format!("; not in table {unexpected:?}"));
    }
    if missing.is_empty() && unexpected.is_empty() {
        message.push_str("; table has duplicate column names");
    }
    Err(TransferError::schema_mismatch(message))
}

/// Require every row to hold exactly one value per schema column.
pub fn check_row_widths(data: &DataSet) -> TransferResult<()> {
    match data.first_ragged_row() {
        None => Ok(()),
        Some((row, len)) => Err(TransferError::schema_mismatch(format!(
            "row {row} has {len} values but the table has {} columns",
            data.schema.len()
        ))),
    }
}

/// One field per column of `data`, in column order.
fn build_schema(
    data: &DataSet,
    types: &ColumnTypes,
    modes: Option<&ColumnModes>,
) -> TransferResult<Vec<SchemaField>> {
    data.schema
        .field_names()
        .map(|name| {
            let field_type = types
                .get(name)
                .copied()
                .ok_or_else(|| TransferError::schema_mismatch(format!("no type for column '{name}'")))?;
            let mode = modes
                .and_then(|m| m.get(name))
                .copied()
                .unwrap_or_default();
            Ok(SchemaField::new(name, field_type, mode))
        })
        .collect()
}

fn to_records(data: &DataSet) -> Vec<serde_json::Map<String, serde_json::Value>> {
    data.rows
        .iter()
        .map(|row| {
            data.schema
                .field_names()
                .zip(row)
                .map(|(name, value)| (name.to_string(), value.to_json()))
                .collect()
        })
        .collect()
}
