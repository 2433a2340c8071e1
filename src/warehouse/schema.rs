use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Column name → warehouse type, describing the destination schema of an append.
pub type ColumnTypes = HashMap<String, WarehouseType>;

/// Column name → field mode. Columns without an entry are [`FieldMode::Nullable`].
pub type ColumnModes = HashMap<String, FieldMode>;

/// Scalar column types understood by the warehouse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum WarehouseType {
    String,
    Bytes,
    Integer,
    Float,
    Numeric,
    Bignumeric,
    Boolean,
    Timestamp,
    Date,
    Time,
    Datetime,
    Geography,
    Json,
}

impl WarehouseType {
    pub fn as_str(&self) -> &'static str {
        match self {
            WarehouseType::String => "STRING",
            WarehouseType::Bytes => "BYTES",
            WarehouseType::Integer => "INTEGER",
            WarehouseType::Float => "FLOAT",
            WarehouseType::Numeric => "NUMERIC",
            WarehouseType::Bignumeric => "BIGNUMERIC",
            WarehouseType::Boolean => "BOOLEAN",
            WarehouseType::Timestamp => "TIMESTAMP",
            WarehouseType::Date => "DATE",
            WarehouseType::Time => "TIME",
            WarehouseType::Datetime => "DATETIME",
            WarehouseType::Geography => "GEOGRAPHY",
            WarehouseType::Json => "JSON",
        }
    }
}

impl fmt::Display for WarehouseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WarehouseType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let t = match s.trim().to_ascii_uppercase().as_str() {
            "STRING" => WarehouseType::String,
            "BYTES" => WarehouseType::Bytes,
            "INTEGER" | "INT64" => WarehouseType::Integer,
            "FLOAT" | "FLOAT64" => WarehouseType::Float,
            "NUMERIC" | "DECIMAL" => WarehouseType::Numeric,
            "BIGNUMERIC" | "BIGDECIMAL" => WarehouseType::Bignumeric,
            "BOOLEAN" | "BOOL" => WarehouseType::Boolean,
            "TIMESTAMP" => WarehouseType::Timestamp,
            "DATE" => WarehouseType::Date,
            "TIME" => WarehouseType::Time,
            "DATETIME" => WarehouseType::Datetime,
            "GEOGRAPHY" => WarehouseType::Geography,
            "JSON" => WarehouseType::Json,
            other => return Err(format!("unknown warehouse type '{other}'")),
        };
        Ok(t)
    }
}

/// Nullability/repetition of a schema field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum FieldMode {
    #[default]
    Nullable,
    Required,
    Repeated,
}

impl FromStr for FieldMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "NULLABLE" => Ok(FieldMode::Nullable),
            "REQUIRED" => Ok(FieldMode::Required),
            "REPEATED" => Ok(FieldMode::Repeated),
            other => Err(format!("unknown field mode '{other}'")),
        }
    }
}

/// One column of a load-job schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaField {
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: WarehouseType,
    pub mode: FieldMode,
}

impl SchemaField {
    pub fn new(name: impl Into<String>, field_type: WarehouseType, mode: FieldMode) -> Self {
        Self {
            name: name.into(),
            field_type,
            mode,
        }
    }
}
