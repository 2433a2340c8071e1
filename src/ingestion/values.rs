//! Loader for "values"-format JSON objects.
//!
//! A values document is a single JSON array whose first element is the header (column names)
//! and whose remaining elements are rows aligned to the header by position:
//!
//! ```text
//! [["id", "name"], [1, "Ada"], [2, "Grace"]]
//! ```
//!
//! Column types are inferred from the cells: integers stay [`DataType::Int64`] unless the column
//! also holds floats (then every number widens to [`DataType::Float64`]), all-boolean columns are
//! [`DataType::Bool`], and anything else (strings, mixed kinds, nested arrays/objects, all-null)
//! becomes [`DataType::Utf8`].

use tracing::{debug, warn};

use crate::error::{TransferError, TransferResult};
use crate::storage::{ObjectStoreReader, StagingCleanup};
use crate::types::{DataSet, DataType, Field, Schema, Value};

/// Options for [`load_values`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValuesLoadOptions {
    /// Policy for the staged copy; deleted by default.
    pub cleanup: StagingCleanup,
}

impl Default for ValuesLoadOptions {
    fn default() -> Self {
        Self {
            cleanup: StagingCleanup::Delete,
        }
    }
}

/// Stage `bucket/object` and parse it as a values document.
///
/// The staging file is handled according to `options.cleanup` whether parsing succeeds or not.
pub fn load_values(
    reader: &ObjectStoreReader,
    bucket: &str,
    object: &str,
    options: &ValuesLoadOptions,
) -> TransferResult<DataSet> {
    let staged = reader.stage(bucket, object)?.with_cleanup(options.cleanup);
    let dataset = parse_values_from_slice(&staged.read_bytes()?)?;
    staged.finish()?;

    debug!(
        bucket,
        object,
        rows = dataset.row_count(),
        columns = dataset.schema.len(),
        "loaded values object"
    );
    Ok(dataset)
}

/// Parse a values document from a string.
pub fn parse_values_from_str(input: &str) -> TransferResult<DataSet> {
    parse_values_from_slice(input.as_bytes())
}

/// Parse a values document from raw bytes.
pub fn parse_values_from_slice(input: &[u8]) -> TransferResult<DataSet> {
    let doc: serde_json::Value = serde_json::from_slice(input)?;
    parse_values(&doc)
}

/// Convert an already-decoded values document into a [`DataSet`].
///
/// Rows shorter than the header are padded with [`Value::Null`]; extra trailing values are dropped.
pub fn parse_values(doc: &serde_json::Value) -> TransferResult<DataSet> {
    let items = doc
        .as_array()
        .ok_or_else(|| TransferError::malformed("values document must be a json array of arrays"))?;
    let (header, records) = items
        .split_first()
        .ok_or_else(|| TransferError::malformed("values document has no header row"))?;

    let names = header_names(header)?;
    let width = names.len();

    let mut rows: Vec<Vec<Value>> = Vec::with_capacity(records.len());
    let mut ragged = 0usize;
    for (idx0, record) in records.iter().enumerate() {
        let cells = record.as_array().ok_or_else(|| {
            TransferError::malformed(format!("row {} is not a json array", idx0 + 1))
        })?;
        if cells.len() != width {
            ragged += 1;
        }
        let mut row: Vec<Value> = cells.iter().take(width).map(cell_value).collect();
        row.resize(width, Value::Null);
        rows.push(row);
    }
    if ragged > 0 {
        warn!(ragged, width, "values rows differ in length from the header; padded or truncated");
    }

    let fields = names
        .into_iter()
        .enumerate()
        .map(|(idx, name)| {
            let data_type = unify_column(&rows, idx);
            Field::new(name, data_type)
        })
        .collect::<Vec<_>>();

    for (idx, field) in fields.iter().enumerate() {
        for row in &mut rows {
            coerce(&mut row[idx], field.data_type);
        }
    }

    Ok(DataSet::new(Schema::new(fields), rows))
}

fn header_names(header: &serde_json::Value) -> TransferResult<Vec<String>> {
    let cols = header
        .as_array()
        .ok_or_else(|| TransferError::malformed("header row is not a json array"))?;
    cols.iter()
        .enumerate()
        .map(|(idx, c)| {
            c.as_str().map(str::to_owned).ok_or_else(|| {
                TransferError::malformed(format!("header column {idx} is not a string: {c}"))
            })
        })
        .collect()
}

fn cell_value(v: &serde_json::Value) -> Value {
    match v {
        serde_json::Value::Null => Value::Null,
        serde_json::Value::Bool(b) => Value::Bool(*b),
        serde_json::Value::Number(n) => match n.as_i64() {
            Some(i) => Value::Int64(i),
            None => n.as_f64().map(Value::Float64).unwrap_or(Value::Null),
        },
        serde_json::Value::String(s) => Value::Utf8(s.clone()),
        nested => Value::Utf8(nested.to_string()),
    }
}

fn kind_of(v: &Value) -> Option<DataType> {
    match v {
        Value::Null => None,
        Value::Int64(_) => Some(DataType::Int64),
        Value::Float64(_) => Some(DataType::Float64),
        Value::Bool(_) => Some(DataType::Bool),
        Value::Utf8(_) => Some(DataType::Utf8),
    }
}

fn unify_column(rows: &[Vec<Value>], idx: usize) -> DataType {
    rows.iter()
        .filter_map(|row| kind_of(&row[idx]))
        .reduce(|acc, next| match (acc, next) {
            (a, b) if a == b => a,
            (DataType::Int64, DataType::Float64) | (DataType::Float64, DataType::Int64) => {
                DataType::Float64
            }
            _ => DataType::Utf8,
        })
        .unwrap_or(DataType::Utf8)
}

fn coerce(v: &mut Value, to: DataType) {
    let converted = match (&*v, to) {
        (Value::Int64(i), DataType::Float64) => Value::Float64(*i as f64),
        (Value::Int64(_) | Value::Float64(_) | Value::Bool(_), DataType::Utf8) => {
            Value::Utf8(v.to_string())
        }
        _ => return,
    };
    *v = converted;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ints_widen_to_float_when_mixed() {
        let ds = parse_values_from_str(r#"[["x"],[1],[2.5],[null]]"#).unwrap();
        assert_eq!(ds.schema.fields[0].data_type, DataType::Float64);
        assert_eq!(
            ds.column("x").unwrap(),
            vec![&Value::Float64(1.0), &Value::Float64(2.5), &Value::Null]
        );
    }

    #[test]
    fn mixed_kinds_fall_back_to_text() {
        let ds = parse_values_from_str(r#"[["x"],[1],["two"],[true],[[3,4]]]"#).unwrap();
        assert_eq!(ds.schema.fields[0].data_type, DataType::Utf8);
        assert_eq!(ds.value(0, "x"), Some(&Value::Utf8("1".into())));
        assert_eq!(ds.value(2, "x"), Some(&Value::Utf8("true".into())));
        assert_eq!(ds.value(3, "x"), Some(&Value::Utf8("[3,4]".into())));
    }

    #[test]
    fn all_null_column_is_text() {
        let ds = parse_values_from_str(r#"[["x","y"],[null,true]]"#).unwrap();
        assert_eq!(ds.schema.fields[0].data_type, DataType::Utf8);
        assert_eq!(ds.schema.fields[1].data_type, DataType::Bool);
    }

    #[test]
    fn header_must_hold_strings() {
        let err = parse_values_from_str(r#"[["a", 2], [1, 2]]"#).unwrap_err();
        assert!(err.to_string().contains("header column 1 is not a string"));
    }
}
