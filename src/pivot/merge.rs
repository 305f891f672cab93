use fxhash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::collections::hash_map::Entry;

use super::schema::ColumnSet;
use super::series::Series;

/// One timestamp-keyed output record with sparse label and metric cells
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Row {
    pub time: i64,
    pub labels: FxHashMap<String, String>,
    pub metrics: FxHashMap<String, f64>,
}

impl Row {
    pub fn new(time: i64) -> Self {
        Self {
            time,
            labels: FxHashMap::default(),
            metrics: FxHashMap::default(),
        }
    }

    pub fn label(&self, column: &str) -> Option<&str> {
        self.labels.get(column).map(String::as_str)
    }

    pub fn metric(&self, column: &str) -> Option<f64> {
        self.metrics.get(column).copied()
    }
}

/// What to do when two series report the same metric at the same timestamp
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicatePolicy {
    /// The later value replaces the earlier one
    #[default]
    Overwrite,
    /// Fail the merge with `PivotError::DuplicateSample`
    Reject,
}

/// Row merger settings
#[derive(Debug, Clone, Copy, Default)]
pub struct MergeOptions {
    /// Sort rows by ascending time instead of first-seen order
    pub sort_by_time: bool,
    pub duplicates: DuplicatePolicy,
}

#[derive(Debug, thiserror::Error)]
pub enum PivotError {
    #[error("inconsistent table data: {rows} rows for {timestamps} distinct timestamps")]
    InconsistentTable { rows: usize, timestamps: usize },

    #[error("duplicate sample for metric '{metric}' at {time}")]
    DuplicateSample { metric: String, time: i64 },
}

/// Merge all samples into one row per distinct timestamp.
///
/// Metric cells are written only for declared metric columns, label cells
/// only for declared label columns. A label cell keeps the first value
/// written at its timestamp.
pub fn merge_rows(
    series: &[Series],
    columns: &ColumnSet,
    options: MergeOptions,
) -> Result<Vec<Row>, PivotError> {
    let mut rows: Vec<Row> = Vec::new();
    let mut index: FxHashMap<i64, usize> = FxHashMap::default();

    for s in series {
        let metric = columns.has_metric(&s.metric).then_some(s.metric.as_str());

        for point in &s.points {
            let pos = match index.entry(point.timestamp) {
                Entry::Occupied(e) => *e.get(),
                Entry::Vacant(e) => {
                    rows.push(Row::new(point.timestamp));
                    *e.insert(rows.len() - 1)
                }
            };
            let row = &mut rows[pos];

            if let Some(metric) = metric {
                let previous = row.metrics.insert(metric.to_string(), point.value);
                if previous.is_some() {
                    if options.duplicates == DuplicatePolicy::Reject {
                        return Err(PivotError::DuplicateSample {
                            metric: metric.to_string(),
                            time: point.timestamp,
                        });
                    }
                    tracing::debug!(
                        "Overwriting {} at {} with a later sample",
                        metric,
                        point.timestamp
                    );
                }
            }

            for (key, value) in &s.labels {
                if columns.has_label(key) && !row.labels.contains_key(key) {
                    row.labels.insert(key.clone(), value.clone());
                }
            }
        }
    }

    if rows.len() != index.len() {
        return Err(PivotError::InconsistentTable {
            rows: rows.len(),
            timestamps: index.len(),
        });
    }

    if options.sort_by_time {
        rows.sort_by_key(|r| r.time);
    }

    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pivot::schema::{discover_columns, ColumnOrder};

    fn merge(series: &[Series], options: MergeOptions) -> Result<Vec<Row>, PivotError> {
        let columns = discover_columns(series, ColumnOrder::FirstSeen);
        merge_rows(series, &columns, options)
    }

    #[test]
    fn test_same_timestamp_merges_metrics() {
        let series = vec![
            Series::new("A").with_point(100, 1.0),
            Series::new("B").with_point(100, 2.0),
        ];

        let rows = merge(&series, MergeOptions::default()).unwrap();

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].time, 100);
        assert_eq!(rows[0].metric("A"), Some(1.0));
        assert_eq!(rows[0].metric("B"), Some(2.0));
    }

    #[test]
    fn test_label_first_writer_wins() {
        let series = vec![
            Series::new("A").with_label("city", "Paris").with_point(100, 1.0),
            Series::new("B").with_label("city", "Berlin").with_point(100, 2.0),
        ];

        let rows = merge(&series, MergeOptions::default()).unwrap();

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].label("city"), Some("Paris"));
    }

    #[test]
    fn test_cpu_mem_scenario() {
        let series = vec![
            Series::new("cpu").with_point(100, 0.5),
            Series::new("mem").with_point(100, 0.7),
            Series::new("cpu").with_point(200, 0.6),
        ];

        let rows = merge(&series, MergeOptions::default()).unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].time, 100);
        assert_eq!(rows[0].metrics.len(), 2);
        assert_eq!(rows[0].metric("cpu"), Some(0.5));
        assert_eq!(rows[0].metric("mem"), Some(0.7));
        assert_eq!(rows[1].time, 200);
        assert_eq!(rows[1].metrics.len(), 1);
        assert_eq!(rows[1].metric("cpu"), Some(0.6));
        assert_eq!(rows[1].metric("mem"), None);
    }

    #[test]
    fn test_row_count_equals_distinct_timestamps() {
        let series = vec![
            Series::new("a")
                .with_point(300, 1.0)
                .with_point(100, 1.0)
                .with_point(200, 1.0),
            Series::new("b").with_point(200, 2.0).with_point(400, 2.0),
            Series::new("c").with_label("x", "y").with_point(100, 3.0),
        ];

        let rows = merge(&series, MergeOptions::default()).unwrap();
        assert_eq!(rows.len(), 4);
    }

    #[test]
    fn test_first_seen_order_preserved() {
        let series = vec![Series::new("a")
            .with_point(300, 1.0)
            .with_point(100, 2.0)
            .with_point(200, 3.0)];

        let rows = merge(&series, MergeOptions::default()).unwrap();
        let times: Vec<i64> = rows.iter().map(|r| r.time).collect();
        assert_eq!(times, vec![300, 100, 200]);
    }

    #[test]
    fn test_sort_by_time() {
        let series = vec![Series::new("a")
            .with_point(300, 1.0)
            .with_point(100, 2.0)
            .with_point(200, 3.0)];

        let options = MergeOptions {
            sort_by_time: true,
            ..Default::default()
        };
        let rows = merge(&series, options).unwrap();
        let times: Vec<i64> = rows.iter().map(|r| r.time).collect();
        assert_eq!(times, vec![100, 200, 300]);
    }

    #[test]
    fn test_duplicate_overwrite_keeps_last() {
        let series = vec![
            Series::new("a").with_label("host", "x").with_point(100, 1.0),
            Series::new("a").with_label("host", "y").with_point(100, 5.0),
        ];

        let rows = merge(&series, MergeOptions::default()).unwrap();
        assert_eq!(rows[0].metric("a"), Some(5.0));
        assert_eq!(rows[0].label("host"), Some("x"));
    }

    #[test]
    fn test_duplicate_reject() {
        let series = vec![
            Series::new("a").with_label("host", "x").with_point(100, 1.0),
            Series::new("a").with_label("host", "y").with_point(100, 5.0),
        ];

        let options = MergeOptions {
            duplicates: DuplicatePolicy::Reject,
            ..Default::default()
        };
        let result = merge(&series, options);
        assert!(matches!(
            result,
            Err(PivotError::DuplicateSample { ref metric, time: 100 }) if metric == "a"
        ));
    }

    #[test]
    fn test_missing_cells_stay_absent() {
        let series = vec![
            Series::new("a").with_label("host", "x").with_point(100, 0.0),
            Series::new("b").with_point(200, 1.0),
        ];

        let rows = merge(&series, MergeOptions::default()).unwrap();
        assert_eq!(rows[0].metric("a"), Some(0.0));
        assert_eq!(rows[1].metric("a"), None);
        assert_eq!(rows[1].label("host"), None);
    }

    #[test]
    fn test_undeclared_columns_skipped() {
        let series = vec![Series::new("a").with_label("host", "x").with_point(100, 1.0)];
        let columns = ColumnSet::default();

        let rows = merge_rows(&series, &columns, MergeOptions::default()).unwrap();
        assert_eq!(rows.len(), 1);
        assert!(rows[0].metrics.is_empty());
        assert!(rows[0].labels.is_empty());
    }

    #[test]
    fn test_empty_input() {
        let rows = merge(&[], MergeOptions::default()).unwrap();
        assert!(rows.is_empty());
    }
}
