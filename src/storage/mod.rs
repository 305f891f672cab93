pub mod dictionary;
pub mod engine;
pub mod memory;

pub use dictionary::StringDictionary;
pub use engine::{StorageEngine, StorageError};
pub use memory::{MemoryBudget, MemoryStats};

use crate::pivot::PivotTable;
use std::sync::Arc;

/// Destination of finished pivot tables
pub trait TableWriter: Send + Sync {
    /// Store the table under its name. Returns the number of rows written.
    fn write_table(&self, table: &PivotTable) -> Result<usize, StorageError>;
}

impl<W: TableWriter + ?Sized> TableWriter for Arc<W> {
    fn write_table(&self, table: &PivotTable) -> Result<usize, StorageError> {
        (**self).write_table(table)
    }
}
