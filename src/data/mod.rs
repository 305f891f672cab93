pub mod column;
pub mod table;
pub mod value;

pub use column::Column;
pub use table::{
    label_column_name, metric_column_name, Table, TableError, TableStats, TIME_COLUMN,
};
pub use value::{DataType, Value};
