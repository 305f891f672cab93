//! Time-series to table pivot
//!
//! Reshapes labeled series (one query response per metric) into rows keyed by
//! timestamp. Column names are discovered at run time:
//!
//! - every label key except `__name__` becomes a label column
//! - every distinct `__name__` value becomes a metric column
//!
//! ```
//! use platon::pivot::{pivot, PivotOptions, Series};
//!
//! let series = vec![
//!     Series::new("cpu").with_point(100, 0.5).with_point(200, 0.6),
//!     Series::new("mem").with_point(100, 0.7),
//! ];
//! let table = pivot("hosts", &series, &PivotOptions::default()).unwrap();
//! assert_eq!(table.rows.len(), 2);
//! ```

pub mod merge;
pub mod schema;
pub mod series;

pub use merge::{merge_rows, DuplicatePolicy, MergeOptions, PivotError, Row};
pub use schema::{discover_columns, ColumnList, ColumnOrder, ColumnSet};
pub use series::{Point, Series, METRIC_NAME_LABEL};

use serde::{Deserialize, Serialize};

/// Descriptive metadata attached to a pivoted table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CubeMeta {
    pub name: String,
    pub description: String,
    /// RFC 3339 time of the load that produced the table
    pub last_refresh: String,
}

/// Settings for one pivot run
#[derive(Debug, Clone, Default)]
pub struct PivotOptions {
    pub column_order: ColumnOrder,
    pub sort_by_time: bool,
    pub duplicates: DuplicatePolicy,
    pub meta: Option<CubeMeta>,
}

impl PivotOptions {
    pub fn with_column_order(mut self, order: ColumnOrder) -> Self {
        self.column_order = order;
        self
    }

    pub fn with_sort_by_time(mut self, sort: bool) -> Self {
        self.sort_by_time = sort;
        self
    }

    pub fn with_duplicates(mut self, policy: DuplicatePolicy) -> Self {
        self.duplicates = policy;
        self
    }

    pub fn with_meta(mut self, meta: CubeMeta) -> Self {
        self.meta = Some(meta);
        self
    }

    fn merge_options(&self) -> MergeOptions {
        MergeOptions {
            sort_by_time: self.sort_by_time,
            duplicates: self.duplicates,
        }
    }
}

/// The result of one pivot run, ready to hand to a table writer
#[derive(Debug, Clone, Serialize)]
pub struct PivotTable {
    pub name: String,
    pub columns: ColumnSet,
    pub rows: Vec<Row>,
    pub meta: Option<CubeMeta>,
}

impl PivotTable {
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }
}

/// Discover columns and merge rows for one table
pub fn pivot(
    name: impl Into<String>,
    series: &[Series],
    options: &PivotOptions,
) -> Result<PivotTable, PivotError> {
    let name = name.into();
    let columns = discover_columns(series, options.column_order);
    let rows = merge_rows(series, &columns, options.merge_options())?;

    tracing::debug!(
        "Pivoted {} series into table '{}': {} label columns, {} metric columns, {} rows",
        series.len(),
        name,
        columns.label_columns.len(),
        columns.metric_columns.len(),
        rows.len()
    );

    Ok(PivotTable {
        name,
        columns,
        rows,
        meta: options.meta.clone(),
    })
}
