//! Google Cloud clients (feature `gcp`).
//!
//! [`GcsClient`] implements [`crate::storage::ObjectStoreClient`] and [`BigQueryClient`]
//! implements [`crate::warehouse::WarehouseClient`]. Both authenticate with a bearer token taken
//! from the environment; obtaining or refreshing that token is left to the caller.
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use rust_warehouse_ingest::gcp::{BigQueryClient, GcpConfig, GcsClient};
//! use rust_warehouse_ingest::ingestion::{Transfer, TransferOptions};
//!
//! # fn main() -> Result<(), rust_warehouse_ingest::TransferError> {
//! let config = GcpConfig::from_env()?;
//! let transfer = Transfer::new(
//!     Arc::new(GcsClient::new(&config)?),
//!     Arc::new(BigQueryClient::new(&config)?),
//!     TransferOptions::default(),
//! );
//! let table = transfer.load_csv("my-bucket", "exports/people.csv", None)?;
//! println!("rows={}", table.row_count());
//! # Ok(())
//! # }
//! ```

pub mod bigquery;
pub mod config;
pub mod gcs;

pub use bigquery::BigQueryClient;
pub use config::GcpConfig;
pub use gcs::GcsClient;
