//! Cube loading
//!
//! A cube names the metrics that make up one table. Loading a cube fetches
//! every metric over the configured lookback window, pivots the combined
//! series and writes the result, replacing the previous table of that name.
//!
//! Cube files are JSON arrays:
//! ```json
//! [
//!   {"name": "node_memory", "description": "Node memory",
//!    "metrics": ["node_memory_Cached_bytes", "node_memory_MemFree_bytes"]},
//!   {"name": "cpu", "metric_pattern": "node_cpu_.*"}
//! ]
//! ```

pub mod config;
pub mod loader;

pub use config::{load_cubes_file, ConfigError, Cube, LoaderConfig};
pub use loader::{CubeLoader, CubeReport, LoadError};
