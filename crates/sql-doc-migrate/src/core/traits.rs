//! Core traits for the migration engine's external capabilities.
//!
//! The engine never speaks a wire protocol itself. It drives two opaque
//! capabilities supplied by the caller:
//!
//! - [`SourceConnection`]: read-only access to a relational source
//! - [`TargetStore`] / [`TargetCollection`]: bulk-insert access to a
//!   document-oriented target
//!
//! Dialect differences between source engines only show through in the
//! declared type strings returned by `describe`; they never change the
//! engine's control flow.

use std::sync::Arc;

use async_trait::async_trait;

use crate::core::schema::ColumnDescriptor;
use crate::core::value::{Document, RawRow};
use crate::error::Result;

/// Read-only access to one relational source database.
///
/// A connection is owned exclusively by the orchestrator for the duration of
/// a run; implementations only need interior synchronization if they share
/// state with something else.
#[async_trait]
pub trait SourceConnection: Send + Sync {
    /// Describe a table: its columns in the source's natural order.
    ///
    /// Fails with [`MigrateError::Schema`](crate::MigrateError::Schema) if the
    /// table does not exist or the connection cannot answer metadata queries.
    async fn describe(&self, table: &str) -> Result<Vec<ColumnDescriptor>>;

    /// Read up to `limit` rows starting at `offset`, in the source's stable
    /// iteration order. An empty result means the table is exhausted.
    ///
    /// Every row must be positionally aligned with the column list returned
    /// by [`describe`](Self::describe) for the same table.
    async fn read_rows(&self, table: &str, offset: u64, limit: usize) -> Result<Vec<RawRow>>;

    /// Best-effort row count for progress estimates. Sources that cannot
    /// answer cheaply return `Ok(None)`.
    async fn estimate_row_count(&self, table: &str) -> Result<Option<i64>> {
        let _ = table;
        Ok(None)
    }

    /// Driver-specific dialect identity string (e.g. "mysql", "postgres",
    /// "sqlite", "mssql"). Informational only.
    fn dialect(&self) -> &str;
}

/// One named collection in the target store.
#[async_trait]
pub trait TargetCollection: Send + Sync {
    /// Insert a batch of documents in one bulk operation, returning the
    /// number of documents the target acknowledged.
    async fn insert_many(&self, documents: &[Document]) -> Result<u64>;

    /// Collection name.
    fn name(&self) -> &str;
}

/// A document-oriented target store holding one collection per source table.
pub trait TargetStore: Send + Sync {
    /// Get a handle to the named collection, creating it lazily if the store
    /// supports that.
    fn collection(&self, name: &str) -> Arc<dyn TargetCollection>;
}

/// Progress for one table, reported after each batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Progress {
    /// Table being migrated.
    pub table: String,

    /// Rows processed so far, monotonically increasing per table. Rows in
    /// failed batches count as processed; they are accounted for in the
    /// table's failure list, never silently dropped.
    pub rows_processed: u64,

    /// Source's row count estimate, if it could provide one.
    pub rows_total: Option<i64>,
}

/// Caller-supplied observer invoked after each batch completes.
///
/// Fire-and-continue: the pipeline blocks only for as long as the sink's own
/// processing takes.
pub trait ProgressSink: Send + Sync {
    /// Called once per completed batch (written or failed).
    fn batch_complete(&self, progress: &Progress);
}

impl<F> ProgressSink for F
where
    F: Fn(&Progress) + Send + Sync,
{
    fn batch_complete(&self, progress: &Progress) {
        self(progress)
    }
}
