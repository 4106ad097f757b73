//! Error types for the migration library.

use thiserror::Error;

/// Main error type for migration operations.
#[derive(Error, Debug)]
pub enum MigrateError {
    /// Configuration error (invalid YAML, missing fields, bad batch size, etc.)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Schema inspection failed for a table. Table-fatal.
    #[error("Schema inspection failed for table {table}: {message}")]
    Schema { table: String, message: String },

    /// Source read failure during a batch fetch. Table-fatal: the remaining
    /// batches of that table are abandoned.
    #[error("Read failed for table {table}: {message}")]
    Read { table: String, message: String },

    /// Target rejected a batch of documents. Batch-fatal only: the table
    /// continues with the next batch.
    #[error("Write failed for collection {collection}: {message}")]
    Write { collection: String, message: String },

    /// Row width disagrees with the inspected column list. This is an internal
    /// inconsistency between inspector and reader, not a data error, and it
    /// aborts the whole table.
    #[error("Row/column misalignment in table {table}: row has {actual} values, schema has {expected} columns")]
    Alignment {
        table: String,
        expected: usize,
        actual: usize,
    },

    /// Migration was cancelled (SIGINT, etc.)
    #[error("Migration cancelled")]
    Cancelled,

    /// IO error (file operations)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML serialization/deserialization error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl MigrateError {
    /// Create a Schema error.
    pub fn schema(table: impl Into<String>, message: impl Into<String>) -> Self {
        MigrateError::Schema {
            table: table.into(),
            message: message.into(),
        }
    }

    /// Create a Read error.
    pub fn read(table: impl Into<String>, message: impl Into<String>) -> Self {
        MigrateError::Read {
            table: table.into(),
            message: message.into(),
        }
    }

    /// Create a Write error.
    pub fn write(collection: impl Into<String>, message: impl Into<String>) -> Self {
        MigrateError::Write {
            collection: collection.into(),
            message: message.into(),
        }
    }

    /// Whether this error aborts the whole table rather than a single batch.
    pub fn is_table_fatal(&self) -> bool {
        matches!(
            self,
            MigrateError::Schema { .. } | MigrateError::Read { .. } | MigrateError::Alignment { .. }
        )
    }

    /// Format error with full details including error chain.
    pub fn format_detailed(&self) -> String {
        let mut output = format!("Error: {}\n", self);

        let mut source = std::error::Error::source(self);
        let mut depth = 1;
        while let Some(err) = source {
            output.push_str(&format!("\nCaused by:\n  {}: {}", depth, err));
            source = err.source();
            depth += 1;
        }

        output
    }
}

/// Result type alias for migration operations.
pub type Result<T> = std::result::Result<T, MigrateError>;
