//! Source-side operations: schema inspection and batched row reading.

use tracing::debug;

use crate::core::schema::TableSchema;
use crate::core::traits::SourceConnection;
use crate::core::value::RowBatch;
use crate::error::{MigrateError, Result};

/// Inspect a table's schema through the source connection.
///
/// The returned column order is the source's natural order and is the
/// positional alignment key for every row read from this table in the same
/// migration pass. A table the source reports as having no columns is treated
/// as a schema error.
pub async fn inspect_schema(conn: &dyn SourceConnection, table: &str) -> Result<TableSchema> {
    let columns = conn.describe(table).await?;

    if columns.is_empty() {
        return Err(MigrateError::schema(table, "source reported no columns"));
    }

    debug!(
        table,
        columns = columns.len(),
        dialect = conn.dialect(),
        "inspected schema"
    );

    Ok(TableSchema::new(table, columns))
}

/// Pulls a table's rows as a lazy, finite sequence of batches.
///
/// Uses offset/limit pagination over the connection, so at most one
/// batch_size worth of rows is materialized at a time and a failed run can be
/// restarted from a known offset. The sequence exhausts the table exactly
/// once: reads continue until the connection returns an empty reply, so a
/// driver that replies with fewer than `limit` rows per call loses nothing.
pub struct BatchReader<'a> {
    conn: &'a dyn SourceConnection,
    table: String,
    batch_size: usize,
    offset: u64,
    next_index: usize,
    exhausted: bool,
}

impl<'a> BatchReader<'a> {
    /// Create a reader for `table`. `batch_size` must be at least 1.
    pub fn new(conn: &'a dyn SourceConnection, table: impl Into<String>, batch_size: usize) -> Result<Self> {
        if batch_size == 0 {
            return Err(MigrateError::Config("batch_size must be at least 1".into()));
        }
        Ok(Self {
            conn,
            table: table.into(),
            batch_size,
            offset: 0,
            next_index: 0,
            exhausted: false,
        })
    }

    /// Start reading at `offset` instead of the beginning. Used for explicit
    /// caller-driven retries of a known range.
    #[must_use]
    pub fn starting_at(mut self, offset: u64) -> Self {
        self.offset = offset;
        self
    }

    /// Current read offset (rows consumed so far plus the starting offset).
    #[must_use]
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Fetch the next batch, or `None` once the table is exhausted.
    pub async fn next_batch(&mut self) -> Result<Option<RowBatch>> {
        if self.exhausted {
            return Ok(None);
        }

        let rows = self
            .conn
            .read_rows(&self.table, self.offset, self.batch_size)
            .await?;

        if rows.is_empty() {
            self.exhausted = true;
            return Ok(None);
        }

        // A short reply is not end-of-table: the connection contract allows
        // fewer than `limit` rows per call. Only an empty reply exhausts.
        self.offset += rows.len() as u64;
        let batch = RowBatch::new(self.next_index, rows);
        self.next_index += 1;

        debug!(
            table = %self.table,
            batch = batch.index,
            rows = batch.len(),
            "read batch"
        );

        Ok(Some(batch))
    }
}
