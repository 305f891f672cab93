use crate::data::{Table, TableError, TableStats};
use crate::pivot::PivotTable;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::Arc;

use super::memory::{MemoryBudget, MemoryStats, DEFAULT_LIMIT_BYTES};
use super::TableWriter;

/// In-memory columnar store holding one table per cube
pub struct StorageEngine {
    /// Tables indexed by name
    tables: DashMap<String, Arc<Table>>,
    memory: MemoryBudget,
}

impl StorageEngine {
    pub fn new() -> Self {
        Self::with_memory_limit(DEFAULT_LIMIT_BYTES)
    }

    pub fn with_memory_limit(limit_bytes: usize) -> Self {
        Self {
            tables: DashMap::new(),
            memory: MemoryBudget::new(limit_bytes),
        }
    }

    /// Get an existing table
    pub fn get_table(&self, name: &str) -> Option<Arc<Table>> {
        self.tables.get(name).map(|t| Arc::clone(&t))
    }

    /// Drop a table
    pub fn drop_table(&self, name: &str) -> Result<(), StorageError> {
        match self.tables.remove(name) {
            Some((_, table)) => {
                self.memory.release(table.memory_usage());
                Ok(())
            }
            None => Err(StorageError::TableNotFound(name.to_string())),
        }
    }

    /// List all table names
    pub fn list_tables(&self) -> Vec<String> {
        self.tables.iter().map(|e| e.key().clone()).collect()
    }

    /// Get table statistics
    pub fn table_stats(&self, name: &str) -> Option<TableStats> {
        self.tables.get(name).map(|t| t.stats())
    }

    /// Get all table statistics
    pub fn all_table_stats(&self) -> Vec<TableStats> {
        self.tables.iter().map(|e| e.value().stats()).collect()
    }

    /// Get memory statistics
    pub fn memory_stats(&self) -> MemoryStats {
        self.memory.stats()
    }

    /// Check if under memory pressure
    pub fn is_under_memory_pressure(&self) -> bool {
        self.memory.is_under_pressure()
    }
}

impl Default for StorageEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl TableWriter for StorageEngine {
    /// Store a pivoted table, replacing any previous table of the same name
    fn write_table(&self, pivot: &PivotTable) -> Result<usize, StorageError> {
        let table = Table::from_pivot(pivot)?;
        let new_bytes = table.memory_usage();
        let rows = table.row_count();

        // The entry guard holds the shard lock across the budget swap, so
        // concurrent writers of one name never count the same old table twice.
        let entry = self.tables.entry(pivot.name.clone());
        let (old_bytes, replaced) = match &entry {
            Entry::Occupied(existing) => (existing.get().memory_usage(), true),
            Entry::Vacant(_) => (0, false),
        };
        if !self.memory.try_replace(old_bytes, new_bytes) {
            return Err(StorageError::MemoryLimitExceeded {
                table: pivot.name.clone(),
                required: new_bytes,
            });
        }
        entry.insert(Arc::new(table));

        tracing::info!(
            "Wrote table '{}': {} rows, {} label columns, {} metric columns{}",
            pivot.name,
            rows,
            pivot.columns.label_columns.len(),
            pivot.columns.metric_columns.len(),
            if replaced { " (replaced)" } else { "" }
        );

        if self.memory.is_under_pressure() {
            tracing::warn!(
                "Storage memory usage at {:.0}%",
                self.memory.usage_ratio() * 100.0
            );
        }

        Ok(rows)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Table '{0}' not found")]
    TableNotFound(String),

    #[error("Table error: {0}")]
    TableError(#[from] TableError),

    #[error("Memory limit exceeded writing table '{table}' ({required} bytes)")]
    MemoryLimitExceeded { table: String, required: usize },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Value;
    use crate::pivot::{pivot, PivotOptions, Row, Series};

    fn make_table(name: &str, points: usize) -> PivotTable {
        let mut cpu = Series::new("cpu").with_label("host", "a");
        for i in 0..points {
            cpu = cpu.with_point(i as i64 * 1000, i as f64);
        }
        pivot(name, &[cpu], &PivotOptions::default()).unwrap()
    }

    #[test]
    fn test_write_and_read_table() {
        let engine = StorageEngine::new();

        let rows = engine.write_table(&make_table("hosts", 3)).unwrap();
        assert_eq!(rows, 3);

        let table = engine.get_table("hosts").unwrap();
        assert_eq!(table.row_count(), 3);
        assert_eq!(table.get_value(2, "metrics.cpu"), Some(Value::Float64(2.0)));
        assert!(engine.get_table("nonexistent").is_none());
    }

    #[test]
    fn test_write_replaces_table() {
        let engine = StorageEngine::new();

        engine.write_table(&make_table("hosts", 5)).unwrap();
        engine.write_table(&make_table("hosts", 2)).unwrap();

        assert_eq!(engine.list_tables(), vec!["hosts".to_string()]);
        assert_eq!(engine.table_stats("hosts").unwrap().row_count, 2);
        assert_eq!(
            engine.memory_stats().used_bytes,
            engine.get_table("hosts").unwrap().memory_usage()
        );
    }

    #[test]
    fn test_concurrent_replace_keeps_accounting() {
        let engine = Arc::new(StorageEngine::new());

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let engine = Arc::clone(&engine);
                std::thread::spawn(move || {
                    for round in 0..25 {
                        engine.write_table(&make_table("hosts", 1 + (i + round) % 6)).unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(
            engine.memory_stats().used_bytes,
            engine.get_table("hosts").unwrap().memory_usage()
        );
    }

    #[test]
    fn test_undeclared_column_rejected() {
        let engine = StorageEngine::new();
        let mut table = make_table("hosts", 1);
        let mut row = Row::new(99_000);
        row.labels.insert("zone".to_string(), "eu".to_string());
        table.rows.push(row);

        let result = engine.write_table(&table);
        assert!(matches!(
            result,
            Err(StorageError::TableError(TableError::UndeclaredColumn(_)))
        ));
        assert!(engine.get_table("hosts").is_none());
    }

    #[test]
    fn test_memory_limit() {
        let engine = StorageEngine::with_memory_limit(64);

        let result = engine.write_table(&make_table("big", 100));
        assert!(matches!(
            result,
            Err(StorageError::MemoryLimitExceeded { .. })
        ));
        assert!(engine.list_tables().is_empty());
        assert_eq!(engine.memory_stats().used_bytes, 0);
    }

    #[test]
    fn test_drop_table() {
        let engine = StorageEngine::new();

        engine.write_table(&make_table("to_drop", 3)).unwrap();
        engine.drop_table("to_drop").unwrap();

        assert!(engine.get_table("to_drop").is_none());
        assert_eq!(engine.memory_stats().used_bytes, 0);
        assert!(matches!(
            engine.drop_table("nonexistent"),
            Err(StorageError::TableNotFound(_))
        ));
    }

    #[test]
    fn test_all_table_stats() {
        let engine = StorageEngine::new();

        engine.write_table(&make_table("a", 1)).unwrap();
        engine.write_table(&make_table("b", 2)).unwrap();

        let mut stats = engine.all_table_stats();
        stats.sort_by(|x, y| x.name.cmp(&y.name));
        assert_eq!(stats.len(), 2);
        assert_eq!(stats[1].row_count, 2);
    }
}
