//! Loaders and the unified entry point.
//!
//! Most callers should use [`Transfer`] (from [`unified`]) which:
//!
//! - stages objects through an injected [`crate::storage::ObjectStoreClient`]
//! - loads them into an in-memory [`crate::types::DataSet`]
//! - appends datasets through an injected [`crate::warehouse::WarehouseClient`]
//! - optionally reports success/failure/alerts to a [`TransferObserver`]
//!
//! Format-specific loaders are also available under:
//! - [`values`]
//! - [`csv`]

pub mod csv;
pub mod observability;
pub mod unified;
pub mod values;

pub use csv::{CsvLoadOptions, TypeHints};
pub use observability::{
    CompositeObserver, TracingObserver, TransferContext, TransferObserver, TransferOperation, TransferSeverity,
    TransferStats,
};
pub use unified::{Transfer, TransferOptions};
pub use values::ValuesLoadOptions;
