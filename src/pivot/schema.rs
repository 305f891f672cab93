use fxhash::FxHashSet;
use serde::{Deserialize, Serialize};

use super::series::{Series, METRIC_NAME_LABEL};

/// How discovered column names are ordered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnOrder {
    /// Order of first appearance across the input series
    #[default]
    FirstSeen,
    /// Lexicographic order
    Sorted,
}

/// An ordered, duplicate-free list of column names
#[derive(Debug, Clone, Default)]
pub struct ColumnList {
    names: Vec<String>,
    seen: FxHashSet<String>,
}

impl ColumnList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a name unless already present. Returns true if it was added.
    pub fn insert(&mut self, name: &str) -> bool {
        if self.seen.contains(name) {
            return false;
        }
        self.seen.insert(name.to_string());
        self.names.push(name.to_string());
        true
    }

    pub fn contains(&self, name: &str) -> bool {
        self.seen.contains(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }

    pub fn as_slice(&self) -> &[String] {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    fn sort(&mut self) {
        self.names.sort();
    }
}

impl PartialEq for ColumnList {
    fn eq(&self, other: &Self) -> bool {
        self.names == other.names
    }
}

impl Eq for ColumnList {}

impl Serialize for ColumnList {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.names.serialize(serializer)
    }
}

impl<'a> FromIterator<&'a str> for ColumnList {
    fn from_iter<I: IntoIterator<Item = &'a str>>(iter: I) -> Self {
        let mut list = ColumnList::new();
        for name in iter {
            list.insert(name);
        }
        list
    }
}

/// Discovered schema of one table build
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ColumnSet {
    pub label_columns: ColumnList,
    pub metric_columns: ColumnList,
}

impl ColumnSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.label_columns.is_empty() && self.metric_columns.is_empty()
    }

    pub fn has_label(&self, name: &str) -> bool {
        self.label_columns.contains(name)
    }

    pub fn has_metric(&self, name: &str) -> bool {
        self.metric_columns.contains(name)
    }
}

/// Derive label and metric columns from a sequence of series.
///
/// Every label key except `__name__` becomes a label column; every distinct
/// `__name__` value becomes a metric column. Pure and deterministic for a
/// fixed input order.
pub fn discover_columns(series: &[Series], order: ColumnOrder) -> ColumnSet {
    let mut columns = ColumnSet::new();

    for s in series {
        for (key, value) in s.label_set() {
            if key == METRIC_NAME_LABEL {
                columns.metric_columns.insert(value);
            } else {
                columns.label_columns.insert(key);
            }
        }
    }

    if order == ColumnOrder::Sorted {
        columns.label_columns.sort();
        columns.metric_columns.sort();
    }

    columns
}
