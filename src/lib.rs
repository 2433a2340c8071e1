//! `rust-warehouse-ingest` moves tabular data between cloud object storage and a data warehouse.
//!
//! It performs three operations:
//!
//! - **Load values JSON**: stage an object shaped as `[header, row, row, ...]` and parse it into
//!   an in-memory [`types::DataSet`] ([`ingestion::values`]).
//! - **Load CSV**: stage a CSV object (first row = header) and parse it into a
//!   [`types::DataSet`], with optional per-column type hints ([`ingestion::csv`]).
//! - **Append**: append a [`types::DataSet`] to an existing warehouse table, adding an
//!   `ingestion_time` column that holds the same timestamp for every row of the call
//!   ([`warehouse::WarehouseAppender`]).
//!
//! Object storage and the warehouse are reached through the [`storage::ObjectStoreClient`] and
//! [`warehouse::WarehouseClient`] traits. The crate ships a directory-backed store and an
//! in-memory warehouse; Google Cloud Storage and BigQuery clients are behind the `gcp` feature.
//!
//! ## Quick example
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use rust_warehouse_ingest::ingestion::{Transfer, TransferOptions};
//! use rust_warehouse_ingest::storage::LocalObjectStore;
//! use rust_warehouse_ingest::types::Value;
//! use rust_warehouse_ingest::warehouse::{ColumnTypes, InMemoryWarehouse, WarehouseType};
//!
//! # fn main() -> Result<(), rust_warehouse_ingest::TransferError> {
//! let buckets = std::env::temp_dir().join("rust-warehouse-ingest-doc");
//! let store = LocalObjectStore::new(&buckets);
//! store.put_object("raw", "scores.json", br#"[["name","score"],["Ada",98],["Grace",87]]"#)?;
//!
//! let warehouse = Arc::new(InMemoryWarehouse::new());
//! warehouse.create_table("analytics", "scores");
//!
//! let transfer = Transfer::new(
//!     Arc::new(store),
//!     warehouse.clone(),
//!     TransferOptions {
//!         staging_dir: buckets.join("staging"),
//!         ..Default::default()
//!     },
//! );
//!
//! let table = transfer.load_values("raw", "scores.json")?;
//! assert_eq!(table.value(1, "name"), Some(&Value::Utf8("Grace".to_string())));
//!
//! let types = ColumnTypes::from([
//!     ("name".to_string(), WarehouseType::String),
//!     ("score".to_string(), WarehouseType::Integer),
//! ]);
//! transfer.append(&table, &types, "analytics", "scores", None)?;
//! assert_eq!(warehouse.row_count("analytics", "scores"), 2);
//! # Ok(())
//! # }
//! ```
//!
//! ## Modules
//!
//! - [`ingestion`]: loaders, the unified [`ingestion::Transfer`] entry point, observers
//! - [`storage`]: object store trait, staging area and staged files
//! - [`warehouse`]: load jobs, the appender, warehouse schema types
//! - [`types`]: the in-memory dataset
//! - [`error`]: the error type shared by every operation

pub mod clock;
pub mod error;
#[cfg(feature = "gcp")]
pub mod gcp;
pub mod ingestion;
pub mod storage;
pub mod types;
pub mod warehouse;

pub use error::{TransferError, TransferResult, TransferStage};
