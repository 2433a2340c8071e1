//! An in-process warehouse for tests and local runs.
//!
//! Tables must be created before loading. Each job is checked row by row against its schema
//! (types, `REQUIRED`, `REPEATED`, unknown fields) and against the types already recorded for
//! the table; a job either lands completely or not at all.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use crate::error::{TransferError, TransferResult};

use super::schema::{FieldMode, SchemaField, WarehouseType};
use super::{CompletedJob, LoadJob, TableRef, WarehouseClient, WriteDisposition};

type Row = serde_json::Map<String, serde_json::Value>;

#[derive(Debug, Default)]
struct StoredTable {
    schema: Vec<SchemaField>,
    rows: Vec<Row>,
}

#[derive(Debug, Default)]
struct State {
    tables: HashMap<TableRef, StoredTable>,
    jobs: Vec<LoadJob>,
    submitted: u64,
    fail_next: Option<String>,
}

#[derive(Debug, Default)]
pub struct InMemoryWarehouse {
    state: Mutex<State>,
}

impl InMemoryWarehouse {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty table. Creating an existing table is a no-op.
    pub fn create_table(&self, dataset: &str, table: &str) {
        self.lock()
            .tables
            .entry(TableRef::new(dataset, table))
            .or_default();
    }

    /// Rows currently stored in `dataset.table`, in load order.
    pub fn rows(&self, dataset: &str, table: &str) -> Option<Vec<Row>> {
        self.lock()
            .tables
            .get(&TableRef::new(dataset, table))
            .map(|t| t.rows.clone())
    }

    pub fn row_count(&self, dataset: &str, table: &str) -> usize {
        self.lock()
            .tables
            .get(&TableRef::new(dataset, table))
            .map_or(0, |t| t.rows.len())
    }

    /// Every load job that completed, in order.
    pub fn completed_jobs(&self) -> Vec<LoadJob> {
        self.lock().jobs.clone()
    }

    /// Number of jobs submitted, including failed ones.
    pub fn submitted_jobs(&self) -> u64 {
        self.lock().submitted
    }

    /// Make the next submitted job fail with `message`, as a quota or permission error would.
    pub fn fail_next_job(&self, message: impl Into<String>) {
        self.lock().fail_next = Some(message.into());
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl WarehouseClient for InMemoryWarehouse {
    fn run_load_job(&self, job: &LoadJob) -> TransferResult<CompletedJob> {
        let mut state = self.lock();
        state.submitted += 1;
        let job_id = format!("job_{}", state.submitted);
        let fail = |message: String| TransferError::LoadJob {
            job_id: Some(job_id.clone()),
            message,
        };

        if let Some(message) = state.fail_next.take() {
            return Err(fail(message));
        }

        let target = state
            .tables
            .get_mut(&job.destination)
            .ok_or_else(|| fail(format!("Not found: Table {}", job.destination)))?;

        if job.write_disposition == WriteDisposition::Empty && !target.rows.is_empty() {
            return Err(fail(format!("Already Exists: Table {} is not empty", job.destination)));
        }
        reconcile_schema(&target.schema, &job.schema).map_err(&fail)?;
        for (idx, row) in job.rows.iter().enumerate() {
            check_row(&job.schema, row).map_err(|m| fail(format!("row {idx}: {m}")))?;
        }

        if job.write_disposition == WriteDisposition::Truncate {
            target.rows.clear();
        }
        for field in &job.schema {
            if !target.schema.iter().any(|f| f.name == field.name) {
                target.schema.push(field.clone());
            }
        }
        target.rows.extend(job.rows.iter().cloned());

        let output_rows = job.rows.len() as u64;
        state.jobs.push(job.clone());
        Ok(CompletedJob { job_id, output_rows })
    }
}

fn reconcile_schema(existing: &[SchemaField], incoming: &[SchemaField]) -> Result<(), String> {
    for field in incoming {
        if let Some(prev) = existing.iter().find(|f| f.name == field.name) {
            if prev.field_type != field.field_type {
                return Err(format!(
                    "Provided Schema does not match Table. Field {} has changed type from {} to {}",
                    field.name, prev.field_type, field.field_type
                ));
            }
        }
    }
    Ok(())
}

fn check_row(schema: &[SchemaField], row: &Row) -> Result<(), String> {
    if let Some(unknown) = row.keys().find(|k| !schema.iter().any(|f| &f.name == *k)) {
        return Err(format!("no such field: {unknown}"));
    }

    for field in schema {
        let value = row.get(&field.name).unwrap_or(&serde_json::Value::Null);
        match (field.mode, value) {
            (FieldMode::Required, serde_json::Value::Null) => {
                return Err(format!("missing required field: {}", field.name));
            }
            (_, serde_json::Value::Null) => {}
            (FieldMode::Repeated, serde_json::Value::Array(items)) => {
                for item in items {
                    check_scalar(field, item)?;
                }
            }
            (FieldMode::Repeated, other) => {
                return Err(format!("field {} is REPEATED but got {other}", field.name));
            }
            (_, scalar) => check_scalar(field, scalar)?,
        }
    }
    Ok(())
}

fn check_scalar(field: &SchemaField, value: &serde_json::Value) -> Result<(), String> {
    use serde_json::Value as J;

    let ok = match field.field_type {
        WarehouseType::Integer => match value {
            J::Number(n) => n.is_i64() || n.is_u64(),
            J::String(s) => s.trim().parse::<i64>().is_ok(),
            _ => false,
        },
        WarehouseType::Float | WarehouseType::Numeric | WarehouseType::Bignumeric => match value {
            J::Number(_) => true,
            J::String(s) => s.trim().parse::<f64>().is_ok(),
            _ => false,
        },
        WarehouseType::Boolean => matches!(value, J::Bool(_)),
        WarehouseType::Timestamp => matches!(value, J::Number(_) | J::String(_)),
        WarehouseType::Json => true,
        _ => matches!(value, J::String(_)),
    };

    if ok {
        Ok(())
    } else {
        Err(format!(
            "Could not convert value {value} to {} for field {}",
            field.field_type, field.name
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::warehouse::SourceFormat;

    fn job(rows: Vec<serde_json::Value>, schema: Vec<SchemaField>) -> LoadJob {
        LoadJob {
            destination: TableRef::new("ds", "t"),
            schema,
            write_disposition: WriteDisposition::Append,
            source_format: SourceFormat::NewlineDelimitedJson,
            rows: rows
                .into_iter()
                .map(|v| v.as_object().cloned().unwrap())
                .collect(),
        }
    }

    fn int_field(mode: FieldMode) -> Vec<SchemaField> {
        vec![SchemaField::new("n", WarehouseType::Integer, mode)]
    }

    #[test]
    fn missing_table_is_rejected() {
        let wh = InMemoryWarehouse::new();
        let err = wh
            .run_load_job(&job(vec![serde_json::json!({"n": 1})], int_field(FieldMode::Nullable)))
            .unwrap_err();
        assert!(err.to_string().contains("Not found: Table ds.t"));
    }

    #[test]
    fn type_mismatch_rejects_whole_job() {
        let wh = InMemoryWarehouse::new();
        wh.create_table("ds", "t");
        let err = wh
            .run_load_job(&job(
                vec![serde_json::json!({"n": 1}), serde_json::json!({"n": "x"})],
                int_field(FieldMode::Nullable),
            ))
            .unwrap_err();
        assert!(err.to_string().contains("row 1"));
        assert_eq!(wh.row_count("ds", "t"), 0);
    }

    #[test]
    fn required_field_rejects_null() {
        let wh = InMemoryWarehouse::new();
        wh.create_table("ds", "t");
        let err = wh
            .run_load_job(&job(vec![serde_json::json!({"n": null})], int_field(FieldMode::Required)))
            .unwrap_err();
        assert!(err.to_string().contains("missing required field: n"));
    }

    #[test]
    fn changed_field_type_is_rejected() {
        let wh = InMemoryWarehouse::new();
        wh.create_table("ds", "t");
        wh.run_load_job(&job(vec![serde_json::json!({"n": 1})], int_field(FieldMode::Nullable)))
            .unwrap();
        let err = wh
            .run_load_job(&job(
                vec![serde_json::json!({"n": "a"})],
                vec![SchemaField::new("n", WarehouseType::String, FieldMode::Nullable)],
            ))
            .unwrap_err();
        assert!(err.to_string().contains("changed type from INTEGER to STRING"));
    }

    #[test]
    fn fail_next_job_applies_once() {
        let wh = InMemoryWarehouse::new();
        wh.create_table("ds", "t");
        wh.fail_next_job("Quota exceeded");
        let j = job(vec![serde_json::json!({"n": 1})], int_field(FieldMode::Nullable));
        assert!(wh.run_load_job(&j).is_err());
        let done = wh.run_load_job(&j).unwrap();
        assert_eq!(done.job_id, "job_2");
        assert_eq!(wh.row_count("ds", "t"), 1);
        assert_eq!(wh.submitted_jobs(), 2);
        assert_eq!(wh.completed_jobs().len(), 1);
    }
}
