//! In-memory table model.
//!
//! Loaders produce a [`DataSet`]: an ordered list of named [`Field`]s plus row-major [`Value`]s.
//! Row order is preserved from the source object through to the warehouse load.

use std::fmt;
use std::str::FromStr;

/// Logical type of a loaded column.
///
/// This is the in-memory parse type, not the warehouse type; see
/// [`crate::warehouse::WarehouseType`] for the latter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataType {
    /// 64-bit signed integer.
    Int64,
    /// 64-bit floating point number.
    Float64,
    /// Boolean.
    Bool,
    /// UTF-8 string.
    Utf8,
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DataType::Int64 => "int64",
            DataType::Float64 => "float64",
            DataType::Bool => "bool",
            DataType::Utf8 => "utf8",
        };
        f.write_str(name)
    }
}

impl FromStr for DataType {
    type Err = String;

    /// Accepts the common spellings used for CSV type hints (`int`, `str`, `float64`, ...).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "int" | "int64" | "integer" => Ok(DataType::Int64),
            "float" | "float64" | "double" => Ok(DataType::Float64),
            "bool" | "boolean" => Ok(DataType::Bool),
            "str" | "string" | "utf8" | "object" => Ok(DataType::Utf8),
            other => Err(format!("unknown data type '{other}'")),
        }
    }
}

/// A single named, typed column in a [`Schema`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    /// Column name, verbatim from the source header.
    pub name: String,
    /// Logical type of the column's non-null values.
    pub data_type: DataType,
}

impl Field {
    /// Create a new field.
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type,
        }
    }
}

/// Ordered column list of a [`DataSet`].
///
/// Duplicate names are allowed; lookups by name resolve to the first occurrence.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Schema {
    /// Ordered list of fields.
    pub fields: Vec<Field>,
}

impl Schema {
    /// Create a new schema from fields.
    pub fn new(fields: Vec<Field>) -> Self {
        Self { fields }
    }

    /// Iterate field names in order.
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|f| f.name.as_str())
    }

    /// Index of the first field called `name`.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }

    /// Number of fields, counting duplicates.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// `true` when the schema has no fields.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// A single cell of a [`DataSet`].
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Missing/empty value.
    Null,
    /// 64-bit signed integer.
    Int64(i64),
    /// 64-bit float.
    Float64(f64),
    /// Boolean.
    Bool(bool),
    /// UTF-8 string.
    Utf8(String),
}

impl Value {
    /// `true` for [`Value::Null`].
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Convert to a JSON value for row-oriented load payloads.
    ///
    /// Non-finite floats have no JSON representation and become `null`.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Null => serde_json::Value::Null,
            Value::Int64(n) => serde_json::Value::from(*n),
            Value::Float64(x) => serde_json::Number::from_f64(*x)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::Utf8(s) => serde_json::Value::String(s.clone()),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str(""),
            Value::Int64(n) => write!(f, "{n}"),
            Value::Float64(x) => write!(f, "{x}"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Utf8(s) => f.write_str(s),
        }
    }
}

static NULL_VALUE: Value = Value::Null;

/// In-memory tabular dataset.
///
/// Rows are stored as `Vec<Vec<Value>>` in the same order as the [`Schema`] fields.
#[derive(Debug, Clone, PartialEq)]
pub struct DataSet {
    /// Schema describing row shape.
    pub schema: Schema,
    /// Row-major value storage.
    pub rows: Vec<Vec<Value>>,
}

impl DataSet {
    /// Create a dataset from schema and rows.
    pub fn new(schema: Schema, rows: Vec<Vec<Value>>) -> Self {
        Self { schema, rows }
    }

    /// Number of rows in the dataset.
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Column names in schema order.
    pub fn column_names(&self) -> Vec<&str> {
        self.schema.field_names().collect()
    }

    /// The value at `row` in the first column called `column`.
    pub fn value(&self, row: usize, column: &str) -> Option<&Value> {
        let idx = self.schema.index_of(column)?;
        self.rows.get(row)?.get(idx)
    }

    /// All values of the first column called `column`, in row order.
    ///
    /// Rows too short to reach the column yield [`Value::Null`].
    pub fn column(&self, column: &str) -> Option<Vec<&Value>> {
        let idx = self.schema.index_of(column)?;
        Some(
            self.rows
                .iter()
                .map(|row| row.get(idx).unwrap_or(&NULL_VALUE))
                .collect(),
        )
    }

    /// Index and length of the first row whose length differs from the schema width.
    pub fn first_ragged_row(&self) -> Option<(usize, usize)> {
        let width = self.schema.len();
        self.rows
            .iter()
            .enumerate()
            .find(|(_, row)| row.len() != width)
            .map(|(idx, row)| (idx, row.len()))
    }

    /// Return a copy with `name` set to `value` in every row.
    ///
    /// An existing column of that name is overwritten in place (keeping its position);
    /// otherwise the column is appended. Rows are first padded with [`Value::Null`] or truncated
    /// to the schema width, so the new value always lands under `name`.
    pub fn with_constant_column(&self, name: &str, data_type: DataType, value: Value) -> Self {
        let mut out = self.clone();
        let width = out.schema.len();
        for row in &mut out.rows {
            row.resize(width, Value::Null);
        }
        match out.schema.index_of(name) {
            Some(idx) => {
                out.schema.fields[idx].data_type = data_type;
                for row in &mut out.rows {
                    row[idx] = value.clone();
                }
            }
            None => {
                out.schema.fields.push(Field::new(name, data_type));
                for row in &mut out.rows {
                    row.push(value.clone());
                }
            }
        }
        out
    }
}
