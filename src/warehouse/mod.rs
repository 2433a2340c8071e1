//! Warehouse load jobs.
//!
//! [`WarehouseAppender`] turns a [`crate::types::DataSet`] plus a [`ColumnTypes`] mapping into a
//! [`LoadJob`] and runs it through an injected [`WarehouseClient`]. Jobs built by the appender
//! always use [`WriteDisposition::Append`].

pub mod append;
pub mod memory;
pub mod schema;

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::TransferResult;

pub use append::{AppendSummary, WarehouseAppender, INGESTION_TIME_COLUMN};
pub use memory::InMemoryWarehouse;
pub use schema::{ColumnModes, ColumnTypes, FieldMode, SchemaField, WarehouseType};

/// Runs load jobs against a warehouse.
pub trait WarehouseClient: Send + Sync {
    /// Submit `job` and block until it completes.
    ///
    /// A rejected or failed job is [`crate::TransferError::LoadJob`].
    fn run_load_job(&self, job: &LoadJob) -> TransferResult<CompletedJob>;
}

/// Destination `(dataset, table)` pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TableRef {
    pub dataset: String,
    pub table: String,
}

impl TableRef {
    pub fn new(dataset: impl Into<String>, table: impl Into<String>) -> Self {
        Self {
            dataset: dataset.into(),
            table: table.into(),
        }
    }
}

impl fmt::Display for TableRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.dataset, self.table)
    }
}

/// What a load job does with rows already in the destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WriteDisposition {
    #[serde(rename = "WRITE_APPEND")]
    Append,
    #[serde(rename = "WRITE_TRUNCATE")]
    Truncate,
    #[serde(rename = "WRITE_EMPTY")]
    Empty,
}

/// Encoding of the rows shipped with a load job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SourceFormat {
    #[serde(rename = "NEWLINE_DELIMITED_JSON")]
    NewlineDelimitedJson,
}

/// A row-oriented JSON load into one table.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadJob {
    pub destination: TableRef,
    pub schema: Vec<SchemaField>,
    pub write_disposition: WriteDisposition,
    pub source_format: SourceFormat,
    /// Row objects (column name → value), in load order.
    pub rows: Vec<serde_json::Map<String, serde_json::Value>>,
}

impl LoadJob {
    /// Rows as newline-delimited JSON, the body format of the load request.
    pub fn to_ndjson(&self) -> TransferResult<Vec<u8>> {
        let mut out = Vec::new();
        for row in &self.rows {
            serde_json::to_writer(&mut out, row)?;
            out.push(b'\n');
        }
        Ok(out)
    }
}

/// A load job that finished successfully.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletedJob {
    pub job_id: String,
    pub output_rows: u64,
}
