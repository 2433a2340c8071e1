//! CSV loader.
//!
//! The first record is the header. Each column is typed either by a caller-supplied hint or by
//! inspecting every non-empty cell:
//!
//! - all cells parse as `i64` → [`DataType::Int64`]
//! - else all parse as `f64` → [`DataType::Float64`]
//! - else all are `true`/`false` (any case) → [`DataType::Bool`]
//! - otherwise → [`DataType::Utf8`]
//!
//! Empty cells are [`Value::Null`] regardless of type.

use std::collections::HashMap;

use tracing::debug;

use crate::error::{TransferError, TransferResult};
use crate::storage::{ObjectStoreReader, StagingCleanup};
use crate::types::{DataSet, DataType, Field, Schema, Value};

/// Per-column parse types, keyed by header name.
pub type TypeHints = HashMap<String, DataType>;

/// Options for [`load_csv`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsvLoadOptions {
    /// Forced parse types. Unhinted columns are auto-detected; hints for absent columns are ignored.
    pub type_hints: TypeHints,
    /// Policy for the staged copy; retained by default.
    pub cleanup: StagingCleanup,
}

impl Default for CsvLoadOptions {
    fn default() -> Self {
        Self {
            type_hints: TypeHints::new(),
            cleanup: StagingCleanup::Retain,
        }
    }
}

impl CsvLoadOptions {
    /// Add a type hint for `column`.
    pub fn with_hint(mut self, column: impl Into<String>, data_type: DataType) -> Self {
        self.type_hints.insert(column.into(), data_type);
        self
    }
}

/// Stage `bucket/object` and parse it as CSV with a header row.
pub fn load_csv(
    reader: &ObjectStoreReader,
    bucket: &str,
    object: &str,
    options: &CsvLoadOptions,
) -> TransferResult<DataSet> {
    let staged = reader.stage(bucket, object)?.with_cleanup(options.cleanup);
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_reader(staged.open()?);
    let dataset = parse_csv_from_reader(&mut rdr, &options.type_hints)?;
    drop(rdr);
    staged.finish()?;

    debug!(
        bucket,
        object,
        rows = dataset.row_count(),
        columns = dataset.schema.len(),
        "loaded csv object"
    );
    Ok(dataset)
}

/// Parse CSV text (header row first).
pub fn parse_csv_from_str(input: &str, hints: &TypeHints) -> TransferResult<DataSet> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_reader(input.as_bytes());
    parse_csv_from_reader(&mut rdr, hints)
}

/// Parse CSV data from an existing reader configured with headers.
pub fn parse_csv_from_reader<R: std::io::Read>(
    rdr: &mut csv::Reader<R>,
    hints: &TypeHints,
) -> TransferResult<DataSet> {
    let headers = rdr.headers()?.clone();
    let records = rdr.records().collect::<Result<Vec<_>, _>>()?;

    for column in hints.keys() {
        if !headers.iter().any(|h| h == column) {
            debug!(column = %column, "type hint names a column missing from the csv header");
        }
    }

    let fields: Vec<Field> = headers
        .iter()
        .enumerate()
        .map(|(idx, name)| {
            let data_type = match hints.get(name) {
                Some(hinted) => *hinted,
                None => infer_column(records.iter().map(|r| r.get(idx).unwrap_or(""))),
            };
            Field::new(name, data_type)
        })
        .collect();

    let mut rows: Vec<Vec<Value>> = Vec::with_capacity(records.len());
    for (row_idx0, record) in records.iter().enumerate() {
        // 1-based, and the header is row 1.
        let user_row = row_idx0 + 2;
        let mut row: Vec<Value> = Vec::with_capacity(fields.len());
        for (idx, field) in fields.iter().enumerate() {
            let raw = record.get(idx).unwrap_or("");
            row.push(parse_typed_value(user_row, &field.name, field.data_type, raw)?);
        }
        rows.push(row);
    }

    Ok(DataSet::new(Schema::new(fields), rows))
}

fn infer_column<'a>(cells: impl Iterator<Item = &'a str> + Clone) -> DataType {
    let mut present = cells.map(str::trim).filter(|c| !c.is_empty()).peekable();
    if present.peek().is_none() {
        return DataType::Utf8;
    }

    if present.clone().all(|c| c.parse::<i64>().is_ok()) {
        DataType::Int64
    } else if present.clone().all(|c| c.parse::<f64>().is_ok()) {
        DataType::Float64
    } else if present.all(|c| c.eq_ignore_ascii_case("true") || c.eq_ignore_ascii_case("false")) {
        DataType::Bool
    } else {
        DataType::Utf8
    }
}

fn parse_typed_value(row: usize, column: &str, data_type: DataType, raw: &str) -> TransferResult<Value> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(Value::Null);
    }

    let parse_error = |message: String| TransferError::ParseError {
        row,
        column: column.to_owned(),
        raw: raw.to_owned(),
        message,
    };

    match data_type {
        DataType::Utf8 => Ok(Value::Utf8(raw.to_owned())),
        DataType::Int64 => trimmed
            .parse::<i64>()
            .map(Value::Int64)
            .map_err(|e| parse_error(e.to_string())),
        DataType::Float64 => trimmed
            .parse::<f64>()
            .map(Value::Float64)
            .map_err(|e| parse_error(e.to_string())),
        DataType::Bool => parse_bool(trimmed).map(Value::Bool).map_err(parse_error),
    }
}

fn parse_bool(s: &str) -> Result<bool, String> {
    match s.to_ascii_lowercase().as_str() {
        "true" | "t" | "1" | "yes" | "y" => Ok(true),
        "false" | "f" | "0" | "no" | "n" => Ok(false),
        _ => Err("expected bool (true/false/1/0/yes/no)".to_string()),
    }
}
