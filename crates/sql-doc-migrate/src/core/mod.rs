//! Core types shared across the migration engine.

pub mod schema;
pub mod traits;
pub mod value;

pub use schema::{ColumnDescriptor, TableSchema};
pub use traits::{Progress, ProgressSink, SourceConnection, TargetCollection, TargetStore};
pub use value::{DocValue, Document, RawRow, RawValue, RowBatch, ValueKind};
