//! Platon: Prometheus Time Series as Cube Tables
//!
//! Pivots labeled time series from a Prometheus server into row-oriented
//! tables where every row is one timestamp and every column is either a
//! label name or a metric name. Finished tables are written to an in-memory
//! columnar store.
//!
//! # Features
//!
//! - **Schema Discovery**: label and metric columns discovered at run time
//! - **Row Merging**: one row per distinct timestamp, sparse cells
//! - **Cubes**: named metric sets, explicit or selected by pattern
//! - **Prometheus Client**: typed `query_range` and metric name results
//! - **Columnar Storage**: dictionary-encoded labels, nullable metrics
//!
//! # Example
//!
//! ```no_run
//! use platon::cube::{Cube, CubeLoader, LoaderConfig};
//! use platon::source::PromClient;
//! use platon::storage::StorageEngine;
//! use std::sync::Arc;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let client = PromClient::new("http://localhost:9090")?;
//! let engine = Arc::new(StorageEngine::new());
//! let loader = CubeLoader::new(client, Arc::clone(&engine), LoaderConfig::default());
//!
//! let report = loader.load_cube(&Cube::node_memory()).await?;
//! println!("Loaded {} rows", report.rows);
//! # Ok(())
//! # }
//! ```

pub mod cube;
pub mod data;
pub mod pivot;
pub mod source;
pub mod storage;

// Re-export commonly used types
pub use cube::{Cube, CubeLoader, LoadError, LoaderConfig};
pub use data::{DataType, Table, Value};
pub use pivot::{pivot, ColumnSet, PivotError, PivotOptions, PivotTable, Row, Series};
pub use source::{MetricSource, PromClient, SourceError};
pub use storage::{StorageEngine, StorageError, TableWriter};
