//! Schema metadata captured from a source table at inspection time.

use serde::{Deserialize, Serialize};

use crate::core::value::ValueKind;
use crate::typemap;

/// Metadata for one source column.
///
/// Immutable once produced for a given table snapshot; the declared type
/// string is dialect-specific (e.g. `VARCHAR(255)`, `BIGINT`, `JSONB`) and is
/// only ever interpreted by the type mapper.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDescriptor {
    /// Column name.
    pub name: String,

    /// Declared type as spelled by the source dialect.
    pub declared_type: String,

    /// Whether the column admits NULL.
    pub nullable: bool,
}

impl ColumnDescriptor {
    /// Create a descriptor.
    pub fn new(name: impl Into<String>, declared_type: impl Into<String>, nullable: bool) -> Self {
        Self {
            name: name.into(),
            declared_type: declared_type.into(),
            nullable,
        }
    }
}

/// The inspected shape of one table: its name and ordered column list.
///
/// Column order is the source's natural order and serves as the positional
/// alignment key for every row read from the table in the same pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableSchema {
    /// Table name as known to the source.
    pub table: String,

    /// Columns in the source's natural order.
    pub columns: Vec<ColumnDescriptor>,
}

impl TableSchema {
    /// Create a schema snapshot.
    pub fn new(table: impl Into<String>, columns: Vec<ColumnDescriptor>) -> Self {
        Self {
            table: table.into(),
            columns,
        }
    }

    /// Number of columns.
    #[must_use]
    pub fn width(&self) -> usize {
        self.columns.len()
    }

    /// Column names in order.
    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }

    /// Each column paired with the target kind its declared type classifies
    /// to. Useful for previewing a migration before running it.
    pub fn mapped_kinds(&self) -> Vec<(&ColumnDescriptor, ValueKind)> {
        self.columns
            .iter()
            .map(|c| (c, typemap::classify(&c.declared_type)))
            .collect()
    }
}
