use std::sync::Arc;

use rust_warehouse_ingest::clock::SteppingClock;
use rust_warehouse_ingest::types::{DataSet, DataType, Field, Schema, Value};
use rust_warehouse_ingest::warehouse::{
    ColumnModes, ColumnTypes, FieldMode, InMemoryWarehouse, SchemaField, WarehouseAppender,
    WarehouseType, WriteDisposition,
};
use rust_warehouse_ingest::{TransferError, TransferStage};

fn people() -> DataSet {
    DataSet::new(
        Schema::new(vec![
            Field::new("name", DataType::Utf8),
            Field::new("age", DataType::Int64),
        ]),
        vec![
            vec![Value::Utf8("Ada".into()), Value::Int64(36)],
            vec![Value::Utf8("Grace".into()), Value::Null],
        ],
    )
}

fn people_types() -> ColumnTypes {
    ColumnTypes::from([
        ("name".to_string(), WarehouseType::String),
        ("age".to_string(), WarehouseType::Integer),
    ])
}

fn appender(warehouse: &Arc<InMemoryWarehouse>) -> WarehouseAppender {
    WarehouseAppender::new(warehouse.clone()).with_clock(Arc::new(SteppingClock::new(1_700_000_000.0, 1.0)))
}

#[test]
fn schema_is_columns_plus_ingestion_time() {
    let warehouse = Arc::new(InMemoryWarehouse::new());
    warehouse.create_table("ds", "people");

    let summary = appender(&warehouse)
        .append(&people(), &people_types(), "ds", "people", None)
        .unwrap();
    assert_eq!(summary.rows, 2);
    assert_eq!(summary.ingestion_time, 1_700_000_000.0);

    let jobs = warehouse.completed_jobs();
    assert_eq!(jobs.len(), 1);
    assert_eq!(jobs[0].write_disposition, WriteDisposition::Append);
    assert_eq!(
        jobs[0].schema,
        vec![
            SchemaField::new("name", WarehouseType::String, FieldMode::Nullable),
            SchemaField::new("age", WarehouseType::Integer, FieldMode::Nullable),
            SchemaField::new("ingestion_time", WarehouseType::Timestamp, FieldMode::Nullable),
        ]
    );
}

#[test]
fn every_row_shares_one_timestamp_per_call() {
    let warehouse = Arc::new(InMemoryWarehouse::new());
    warehouse.create_table("ds", "people");
    let appender = appender(&warehouse);

    let first = appender
        .append(&people(), &people_types(), "ds", "people", None)
        .unwrap();
    let second = appender
        .append(&people(), &people_types(), "ds", "people", None)
        .unwrap();
    assert_ne!(first.ingestion_time, second.ingestion_time);

    let rows = warehouse.rows("ds", "people").unwrap();
    assert_eq!(rows.len(), 4);
    let stamps: Vec<f64> = rows
        .iter()
        .map(|r| r["ingestion_time"].as_f64().unwrap())
        .collect();
    assert_eq!(stamps[0], stamps[1]);
    assert_eq!(stamps[2], stamps[3]);
    assert_eq!(stamps[0], first.ingestion_time);
    assert_eq!(stamps[2], second.ingestion_time);
}

#[test]
fn rows_keep_values_and_order() {
    let warehouse = Arc::new(InMemoryWarehouse::new());
    warehouse.create_table("ds", "people");

    appender(&warehouse)
        .append(&people(), &people_types(), "ds", "people", None)
        .unwrap();

    let rows = warehouse.rows("ds", "people").unwrap();
    assert_eq!(rows[0]["name"], "Ada");
    assert_eq!(rows[0]["age"], 36);
    assert_eq!(rows[1]["name"], "Grace");
    assert!(rows[1]["age"].is_null());
}

#[test]
fn caller_dataset_is_left_untouched() {
    let warehouse = Arc::new(InMemoryWarehouse::new());
    warehouse.create_table("ds", "people");
    let data = people();

    appender(&warehouse)
        .append(&data, &people_types(), "ds", "people", None)
        .unwrap();
    assert_eq!(data, people());
}

#[test]
fn mismatched_types_are_rejected_before_submitting() {
    let warehouse = Arc::new(InMemoryWarehouse::new());
    warehouse.create_table("ds", "people");

    let mut types = people_types();
    types.remove("age");
    types.insert("height".to_string(), WarehouseType::Float);

    let err = appender(&warehouse)
        .append(&people(), &types, "ds", "people", None)
        .unwrap_err();
    assert!(matches!(err, TransferError::SchemaMismatch { .. }));
    assert_eq!(err.stage(), TransferStage::SchemaCheck);
    assert!(err.to_string().contains("age"));
    assert!(err.to_string().contains("height"));
    assert_eq!(warehouse.submitted_jobs(), 0);
}

#[test]
fn extra_declared_column_is_rejected() {
    let warehouse = Arc::new(InMemoryWarehouse::new());
    warehouse.create_table("ds", "people");

    let mut types = people_types();
    types.insert("extra".to_string(), WarehouseType::String);

    let err = appender(&warehouse)
        .append(&people(), &types, "ds", "people", None)
        .unwrap_err();
    assert!(matches!(err, TransferError::SchemaMismatch { .. }));
    assert_eq!(warehouse.submitted_jobs(), 0);
}

#[test]
fn duplicate_column_names_never_match() {
    let warehouse = Arc::new(InMemoryWarehouse::new());
    warehouse.create_table("ds", "t");
    let data = DataSet::new(
        Schema::new(vec![
            Field::new("a", DataType::Int64),
            Field::new("a", DataType::Int64),
        ]),
        vec![vec![Value::Int64(1), Value::Int64(2)]],
    );
    let types = ColumnTypes::from([("a".to_string(), WarehouseType::Integer)]);

    let err = appender(&warehouse)
        .append(&data, &types, "ds", "t", None)
        .unwrap_err();
    assert!(err.to_string().contains("duplicate"));
}

#[test]
fn column_modes_are_applied() {
    let warehouse = Arc::new(InMemoryWarehouse::new());
    warehouse.create_table("ds", "people");
    let modes = ColumnModes::from([("name".to_string(), FieldMode::Required)]);

    appender(&warehouse)
        .append(&people(), &people_types(), "ds", "people", Some(&modes))
        .unwrap();

    let schema = &warehouse.completed_jobs()[0].schema;
    assert_eq!(schema[0].mode, FieldMode::Required);
    assert_eq!(schema[1].mode, FieldMode::Nullable);
}

#[test]
fn required_mode_rejects_null_column() {
    let warehouse = Arc::new(InMemoryWarehouse::new());
    warehouse.create_table("ds", "people");
    let modes = ColumnModes::from([("age".to_string(), FieldMode::Required)]);

    let err = appender(&warehouse)
        .append(&people(), &people_types(), "ds", "people", Some(&modes))
        .unwrap_err();
    assert_eq!(err.stage(), TransferStage::LoadJob);
    assert_eq!(warehouse.row_count("ds", "people"), 0);
}

#[test]
fn missing_table_fails_the_load_job() {
    let warehouse = Arc::new(InMemoryWarehouse::new());

    let err = appender(&warehouse)
        .append(&people(), &people_types(), "ds", "nope", None)
        .unwrap_err();
    match err {
        TransferError::LoadJob { job_id, message } => {
            assert_eq!(job_id.as_deref(), Some("job_1"));
            assert!(message.contains("Not found"));
        }
        other => panic!("expected LoadJob, got {other:?}"),
    }
}

#[test]
fn rejected_job_surfaces_warehouse_message() {
    let warehouse = Arc::new(InMemoryWarehouse::new());
    warehouse.create_table("ds", "people");
    warehouse.fail_next_job("Quota exceeded");

    let err = appender(&warehouse)
        .append(&people(), &people_types(), "ds", "people", None)
        .unwrap_err();
    assert!(err.to_string().contains("Quota exceeded"));
    assert_eq!(warehouse.row_count("ds", "people"), 0);
}

#[test]
fn empty_dataset_still_submits_a_job() {
    let warehouse = Arc::new(InMemoryWarehouse::new());
    warehouse.create_table("ds", "people");
    let empty = DataSet::new(people().schema, Vec::new());

    let summary = appender(&warehouse)
        .append(&empty, &people_types(), "ds", "people", None)
        .unwrap();
    assert_eq!(summary.rows, 0);
    assert_eq!(warehouse.submitted_jobs(), 1);
}

#[test]
fn custom_ingestion_column_name() {
    let warehouse = Arc::new(InMemoryWarehouse::new());
    warehouse.create_table("ds", "people");

    appender(&warehouse)
        .with_ingestion_column("loaded_at")
        .append(&people(), &people_types(), "ds", "people", None)
        .unwrap();

    let rows = warehouse.rows("ds", "people").unwrap();
    assert!(rows[0].contains_key("loaded_at"));
    assert!(!rows[0].contains_key("ingestion_time"));
}

#[test]
fn ragged_rows_are_rejected_before_submitting() {
    let warehouse = Arc::new(InMemoryWarehouse::new());
    warehouse.create_table("ds", "t");
    let data = DataSet::new(
        Schema::new(vec![
            Field::new("a", DataType::Int64),
            Field::new("b", DataType::Utf8),
        ]),
        vec![
            vec![Value::Int64(1), Value::Utf8("x".into())],
            vec![Value::Int64(3)],
        ],
    );
    let types = ColumnTypes::from([
        ("a".to_string(), WarehouseType::Integer),
        ("b".to_string(), WarehouseType::String),
    ]);

    let err = WarehouseAppender::new(warehouse.clone())
        .with_clock(Arc::new(SteppingClock::fixed(5.0)))
        .append(&data, &types, "ds", "t", None)
        .unwrap_err();
    assert!(matches!(err, TransferError::SchemaMismatch { .. }));
    assert!(err.to_string().contains("row 1"));
    assert_eq!(warehouse.submitted_jobs(), 0);
    assert_eq!(warehouse.row_count("ds", "t"), 0);
}

#[test]
fn existing_ingestion_time_column_is_overwritten_in_place() {
    let warehouse = Arc::new(InMemoryWarehouse::new());
    warehouse.create_table("ds", "t");
    let data = DataSet::new(
        Schema::new(vec![
            Field::new("ingestion_time", DataType::Utf8),
            Field::new("name", DataType::Utf8),
        ]),
        vec![vec![Value::Utf8("stale".into()), Value::Utf8("Ada".into())]],
    );
    let types = ColumnTypes::from([
        ("ingestion_time".to_string(), WarehouseType::String),
        ("name".to_string(), WarehouseType::String),
    ]);

    let summary = appender(&warehouse)
        .append(&data, &types, "ds", "t", None)
        .unwrap();

    let job = &warehouse.completed_jobs()[0];
    assert_eq!(
        job.schema,
        vec![
            SchemaField::new("ingestion_time", WarehouseType::Timestamp, FieldMode::Nullable),
            SchemaField::new("name", WarehouseType::String, FieldMode::Nullable),
        ]
    );
    let rows = warehouse.rows("ds", "t").unwrap();
    assert_eq!(rows[0]["ingestion_time"].as_f64(), Some(summary.ingestion_time));
    assert_eq!(rows[0]["name"], "Ada");
    assert_eq!(data.value(0, "ingestion_time"), Some(&Value::Utf8("stale".into())));
}
