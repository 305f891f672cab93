use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Reserved label carrying the metric name in Prometheus label sets
pub const METRIC_NAME_LABEL: &str = "__name__";

/// A single timestamped observation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    /// Epoch milliseconds
    pub timestamp: i64,
    pub value: f64,
}

impl Point {
    pub fn new(timestamp: i64, value: f64) -> Self {
        Self { timestamp, value }
    }
}

/// One metric/label-combination and its ordered points
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Series {
    /// Metric name (empty when the result carried no `__name__`)
    pub metric: String,
    /// Label set without the reserved metric name label
    pub labels: BTreeMap<String, String>,
    pub points: Vec<Point>,
}

impl Series {
    pub fn new(metric: impl Into<String>) -> Self {
        Self {
            metric: metric.into(),
            labels: BTreeMap::new(),
            points: Vec::new(),
        }
    }

    /// Build a series from a full label set, splitting off `__name__`
    pub fn from_label_set(mut label_set: BTreeMap<String, String>, points: Vec<Point>) -> Self {
        let metric = label_set.remove(METRIC_NAME_LABEL).unwrap_or_default();
        Self {
            metric,
            labels: label_set,
            points,
        }
    }

    pub fn with_label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        let key = key.into();
        if key == METRIC_NAME_LABEL {
            self.metric = value.into();
        } else {
            self.labels.insert(key, value.into());
        }
        self
    }

    pub fn with_point(mut self, timestamp: i64, value: f64) -> Self {
        self.points.push(Point::new(timestamp, value));
        self
    }

    /// Iterate the label set as the source reported it, `__name__` included
    pub fn label_set(&self) -> impl Iterator<Item = (&str, &str)> {
        let name = (!self.metric.is_empty()).then_some((METRIC_NAME_LABEL, self.metric.as_str()));
        name.into_iter()
            .chain(self.labels.iter().map(|(k, v)| (k.as_str(), v.as_str())))
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}
