use super::value::{DataType, Value};
use crate::storage::dictionary::StringDictionary;

/// Nullable columnar storage for one table column
#[derive(Debug, Clone)]
pub enum Column {
    /// 64-bit floating point column (metric values)
    Float64(Vec<Option<f64>>),
    /// String column with dictionary encoding (label values)
    String {
        /// Dictionary IDs (None = null)
        ids: Vec<Option<u32>>,
        dictionary: StringDictionary,
    },
    /// Timestamp column (epoch milliseconds)
    Timestamp(Vec<Option<i64>>),
}

impl Column {
    pub fn new(data_type: DataType) -> Self {
        Self::with_capacity(data_type, 0)
    }

    pub fn with_capacity(data_type: DataType, capacity: usize) -> Self {
        match data_type {
            DataType::Float64 => Column::Float64(Vec::with_capacity(capacity)),
            DataType::String => Column::String {
                ids: Vec::with_capacity(capacity),
                dictionary: StringDictionary::new(),
            },
            DataType::Timestamp => Column::Timestamp(Vec::with_capacity(capacity)),
        }
    }

    pub fn data_type(&self) -> DataType {
        match self {
            Column::Float64(_) => DataType::Float64,
            Column::String { .. } => DataType::String,
            Column::Timestamp(_) => DataType::Timestamp,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Column::Float64(v) => v.len(),
            Column::String { ids, .. } => ids.len(),
            Column::Timestamp(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Push a value to the column. Mismatched types are stored as null.
    pub fn push(&mut self, value: &Value) {
        match (self, value) {
            (Column::Float64(v), Value::Float64(f)) => v.push(Some(*f)),
            (Column::String { ids, dictionary }, Value::String(s)) => {
                ids.push(Some(dictionary.intern(s)));
            }
            (Column::Timestamp(v), Value::Timestamp(t)) => v.push(Some(*t)),
            (Column::Float64(v), _) => v.push(None),
            (Column::String { ids, .. }, _) => ids.push(None),
            (Column::Timestamp(v), _) => v.push(None),
        }
    }

    /// Get value at index
    pub fn get(&self, index: usize) -> Value {
        match self {
            Column::Float64(v) => v
                .get(index)
                .and_then(|v| *v)
                .map(Value::Float64)
                .unwrap_or(Value::Null),
            Column::String { ids, dictionary } => ids
                .get(index)
                .and_then(|id| *id)
                .and_then(|id| dictionary.resolve(id))
                .map(|s| Value::String(s.to_string()))
                .unwrap_or(Value::Null),
            Column::Timestamp(v) => v
                .get(index)
                .and_then(|v| *v)
                .map(Value::Timestamp)
                .unwrap_or(Value::Null),
        }
    }

    /// Number of null cells
    pub fn null_count(&self) -> usize {
        match self {
            Column::Float64(v) => v.iter().filter(|v| v.is_none()).count(),
            Column::String { ids, .. } => ids.iter().filter(|v| v.is_none()).count(),
            Column::Timestamp(v) => v.iter().filter(|v| v.is_none()).count(),
        }
    }

    /// Smallest and largest non-null timestamp
    pub fn time_range(&self) -> Option<(i64, i64)> {
        let Column::Timestamp(v) = self else {
            return None;
        };
        let min = v.iter().flatten().min()?;
        let max = v.iter().flatten().max()?;
        Some((*min, *max))
    }

    /// Estimate memory usage in bytes
    pub fn memory_usage(&self) -> usize {
        match self {
            Column::Float64(v) => v.capacity() * std::mem::size_of::<Option<f64>>(),
            Column::String { ids, dictionary } => {
                ids.capacity() * std::mem::size_of::<Option<u32>>() + dictionary.memory_usage()
            }
            Column::Timestamp(v) => v.capacity() * std::mem::size_of::<Option<i64>>(),
        }
    }
}
