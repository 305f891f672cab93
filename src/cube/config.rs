//! Cube definitions and loader configuration

use fxhash::FxHashSet;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::pivot::{ColumnOrder, DuplicatePolicy, PivotOptions};

/// A named set of metrics loaded into one table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cube {
    /// Table name
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Metric names to fetch
    #[serde(default)]
    pub metrics: Vec<String>,
    /// Regex selecting additional metrics from the source's metric names.
    /// Matched against the whole name.
    #[serde(default)]
    pub metric_pattern: Option<String>,
}

impl Cube {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            metrics: Vec::new(),
            metric_pattern: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_metric(mut self, metric: impl Into<String>) -> Self {
        self.metrics.push(metric.into());
        self
    }

    pub fn with_metric_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.metric_pattern = Some(pattern.into());
        self
    }

    /// Node memory cube used when no cube file is configured
    pub fn node_memory() -> Self {
        Self::new("node_memory")
            .with_description("Cached and free node memory")
            .with_metric("node_memory_Cached_bytes")
            .with_metric("node_memory_MemFree_bytes")
    }
}

/// Read a JSON array of cubes from a file
pub fn load_cubes_file(path: impl AsRef<Path>) -> Result<Vec<Cube>, ConfigError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path)
        .map_err(|e| ConfigError::Io(format!("{}: {}", path.display(), e)))?;
    let cubes: Vec<Cube> =
        serde_json::from_str(&content).map_err(|e| ConfigError::Parse(e.to_string()))?;

    let mut names = FxHashSet::default();
    for cube in &cubes {
        if !names.insert(cube.name.as_str()) {
            return Err(ConfigError::DuplicateCube(cube.name.clone()));
        }
    }
    Ok(cubes)
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read cube file: {0}")]
    Io(String),

    #[error("Invalid cube file: {0}")]
    Parse(String),

    #[error("Cube '{0}' is defined more than once")]
    DuplicateCube(String),
}

/// Settings shared by every cube load
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoaderConfig {
    /// How far back from now to query, in seconds
    pub lookback_secs: u64,
    pub column_order: ColumnOrder,
    /// Sort rows by time before writing
    pub sort_rows: bool,
    pub duplicates: DuplicatePolicy,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            lookback_secs: 3600,
            column_order: ColumnOrder::FirstSeen,
            sort_rows: false,
            duplicates: DuplicatePolicy::Overwrite,
        }
    }
}

impl LoaderConfig {
    /// Read loader settings from environment variables
    /// PLATON_LOOKBACK_SECS=3600
    /// PLATON_COLUMN_ORDER=first_seen|sorted
    /// PLATON_SORT_ROWS=false
    /// PLATON_REJECT_DUPLICATES=false
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let lookback_secs = std::env::var("PLATON_LOOKBACK_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(defaults.lookback_secs);
        let column_order = match std::env::var("PLATON_COLUMN_ORDER").as_deref() {
            Ok("sorted") => ColumnOrder::Sorted,
            _ => defaults.column_order,
        };
        let sort_rows = std::env::var("PLATON_SORT_ROWS")
            .map(|v| v == "true" || v == "1")
            .unwrap_or(defaults.sort_rows);
        let duplicates = match std::env::var("PLATON_REJECT_DUPLICATES").as_deref() {
            Ok("true") | Ok("1") => DuplicatePolicy::Reject,
            _ => defaults.duplicates,
        };

        Self {
            lookback_secs,
            column_order,
            sort_rows,
            duplicates,
        }
    }

    pub fn with_lookback(mut self, lookback: Duration) -> Self {
        self.lookback_secs = lookback.as_secs();
        self
    }

    pub fn with_sort_rows(mut self, sort: bool) -> Self {
        self.sort_rows = sort;
        self
    }

    pub fn with_duplicates(mut self, policy: DuplicatePolicy) -> Self {
        self.duplicates = policy;
        self
    }

    pub fn lookback(&self) -> Duration {
        Duration::from_secs(self.lookback_secs)
    }

    /// Pivot options for one cube load, without metadata
    pub fn pivot_options(&self) -> PivotOptions {
        PivotOptions::default()
            .with_column_order(self.column_order)
            .with_sort_by_time(self.sort_rows)
            .with_duplicates(self.duplicates)
    }
}
