use super::column::Column;
use super::value::{DataType, Value};
use crate::pivot::{CubeMeta, PivotTable};
use std::collections::HashMap;

/// Name of the timestamp column every table carries
pub const TIME_COLUMN: &str = "time";
/// Prefix of label column names
pub const LABELS_PREFIX: &str = "labels.";
/// Prefix of metric column names
pub const METRICS_PREFIX: &str = "metrics.";

pub fn label_column_name(label: &str) -> String {
    format!("{}{}", LABELS_PREFIX, label)
}

pub fn metric_column_name(metric: &str) -> String {
    format!("{}{}", METRICS_PREFIX, metric)
}

/// A stored cube table: one timestamp column, one string column per label
/// and one float column per metric
#[derive(Debug)]
pub struct Table {
    name: String,
    meta: Option<CubeMeta>,
    time: Column,
    /// Label columns in declared order
    labels: Vec<(String, Column)>,
    /// Metric columns in declared order
    metrics: Vec<(String, Column)>,
    row_count: usize,
}

impl Table {
    /// Build a columnar table from pivoted rows.
    ///
    /// Every populated row cell must belong to a declared column.
    pub fn from_pivot(pivot: &PivotTable) -> Result<Self, TableError> {
        let capacity = pivot.rows.len();
        let columns = &pivot.columns;

        for row in &pivot.rows {
            if let Some(label) = row.labels.keys().find(|l| !columns.has_label(l)) {
                return Err(TableError::UndeclaredColumn(label_column_name(label)));
            }
            if let Some(metric) = row.metrics.keys().find(|m| !columns.has_metric(m)) {
                return Err(TableError::UndeclaredColumn(metric_column_name(metric)));
            }
        }

        let mut time = Column::with_capacity(DataType::Timestamp, capacity);
        let mut labels: Vec<(String, Column)> = columns
            .label_columns
            .iter()
            .map(|l| (l.to_string(), Column::with_capacity(DataType::String, capacity)))
            .collect();
        let mut metrics: Vec<(String, Column)> = columns
            .metric_columns
            .iter()
            .map(|m| (m.to_string(), Column::with_capacity(DataType::Float64, capacity)))
            .collect();

        for row in &pivot.rows {
            time.push(&Value::Timestamp(row.time));
            for (name, col) in labels.iter_mut() {
                col.push(&Value::from(row.label(name)));
            }
            for (name, col) in metrics.iter_mut() {
                col.push(&Value::from(row.metric(name)));
            }
        }

        Ok(Self {
            name: pivot.name.clone(),
            meta: pivot.meta.clone(),
            time,
            labels,
            metrics,
            row_count: capacity,
        })
    }

    /// Get the name of this table
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn meta(&self) -> Option<&CubeMeta> {
        self.meta.as_ref()
    }

    pub fn row_count(&self) -> usize {
        self.row_count
    }

    /// All column names: `time`, then `labels.*`, then `metrics.*`
    pub fn column_names(&self) -> Vec<String> {
        std::iter::once(TIME_COLUMN.to_string())
            .chain(self.labels.iter().map(|(l, _)| label_column_name(l)))
            .chain(self.metrics.iter().map(|(m, _)| metric_column_name(m)))
            .collect()
    }

    /// Column name -> data type, in column order
    pub fn get_schema(&self) -> Vec<(String, DataType)> {
        self.column_names()
            .into_iter()
            .filter_map(|name| {
                let data_type = self.get_column(&name)?.data_type();
                Some((name, data_type))
            })
            .collect()
    }

    /// Get column by its full name (`time`, `labels.<name>`, `metrics.<name>`)
    pub fn get_column(&self, name: &str) -> Option<&Column> {
        if name == TIME_COLUMN {
            return Some(&self.time);
        }
        if let Some(label) = name.strip_prefix(LABELS_PREFIX) {
            return self.labels.iter().find(|(l, _)| l == label).map(|(_, c)| c);
        }
        if let Some(metric) = name.strip_prefix(METRICS_PREFIX) {
            return self.metrics.iter().find(|(m, _)| m == metric).map(|(_, c)| c);
        }
        None
    }

    /// Get value at specific row and column
    pub fn get_value(&self, row_idx: usize, column: &str) -> Option<Value> {
        if row_idx >= self.row_count {
            return None;
        }
        self.get_column(column).map(|col| col.get(row_idx))
    }

    /// Get a row as a HashMap; absent cells are `Value::Null`
    pub fn get_row(&self, idx: usize) -> Option<HashMap<String, Value>> {
        if idx >= self.row_count {
            return None;
        }

        let mut row = HashMap::new();
        row.insert(TIME_COLUMN.to_string(), self.time.get(idx));
        for (label, col) in &self.labels {
            row.insert(label_column_name(label), col.get(idx));
        }
        for (metric, col) in &self.metrics {
            row.insert(metric_column_name(metric), col.get(idx));
        }
        Some(row)
    }

    /// Estimate memory usage in bytes
    pub fn memory_usage(&self) -> usize {
        self.time.memory_usage()
            + self
                .labels
                .iter()
                .chain(self.metrics.iter())
                .map(|(name, col)| name.capacity() + col.memory_usage())
                .sum::<usize>()
    }

    pub fn stats(&self) -> TableStats {
        let range = self.time.time_range();

        TableStats {
            name: self.name.clone(),
            description: self.meta.as_ref().map(|m| m.description.clone()),
            last_refresh: self.meta.as_ref().map(|m| m.last_refresh.clone()),
            row_count: self.row_count,
            label_columns: self.labels.len(),
            metric_columns: self.metrics.len(),
            memory_bytes: self.memory_usage(),
            oldest_data_time: range.map(|(min, _)| min),
            newest_data_time: range.map(|(_, max)| max),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TableError {
    #[error("Row field '{0}' has no declared column")]
    UndeclaredColumn(String),
}

/// Statistics about a table
#[derive(Debug, Clone, serde::Serialize)]
pub struct TableStats {
    pub name: String,
    pub description: Option<String>,
    pub last_refresh: Option<String>,
    pub row_count: usize,
    pub label_columns: usize,
    pub metric_columns: usize,
    pub memory_bytes: usize,
    pub oldest_data_time: Option<i64>,
    pub newest_data_time: Option<i64>,
}
