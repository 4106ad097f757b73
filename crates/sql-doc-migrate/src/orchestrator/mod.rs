//! Migration orchestrator - main workflow coordinator.
//!
//! Drives one table at a time, and within a table exactly one batch at a
//! time: read, transform, load are sequential steps, so peak memory is
//! bounded by one batch and every failure is attributable to exactly one
//! batch. Tables are processed in selection order; failure of one table
//! never prevents attempting the next.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::watch;
use tracing::{error, info, warn};

use crate::config::Config;
use crate::core::traits::{Progress, ProgressSink, SourceConnection, TargetStore};
use crate::error::{MigrateError, Result};
use crate::log::{EventKind, LogEntry, MigrationLog};
use crate::source::{inspect_schema, BatchReader};
use crate::target::load_batch;
use crate::transform::transform_batch;

/// Final status of one table's migration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TableStatus {
    /// Reader exhausted, zero failed batches.
    Success,

    /// Reader exhausted, at least one batch written and at least one failed.
    PartialFailure,

    /// Schema inspection failed, every batch failed, or a table-fatal error
    /// aborted the table.
    Failed,
}

/// One failed batch: its index in the table's read sequence and the error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchFailure {
    /// Zero-based batch index.
    pub batch_index: usize,

    /// Error message from the loader.
    pub error: String,
}

/// Outcome of migrating one table. Finalized when the table's migration
/// ends; immutable thereafter.
#[derive(Debug, Clone, Serialize)]
pub struct TableMigrationResult {
    /// Source table name.
    pub table_name: String,

    /// Rows pulled from the source, including rows in failed batches.
    pub rows_read: u64,

    /// Rows acknowledged by the target.
    pub rows_written: u64,

    /// Failed batches in read order.
    pub batches_failed: Vec<BatchFailure>,

    /// Final status.
    pub status: TableStatus,
}

impl TableMigrationResult {
    fn started(table: impl Into<String>) -> Self {
        Self {
            table_name: table.into(),
            rows_read: 0,
            rows_written: 0,
            batches_failed: Vec::new(),
            status: TableStatus::Failed,
        }
    }

    fn failed(table: impl Into<String>) -> Self {
        Self::started(table)
    }

    /// Resolve the end-of-table status from the accumulated counts. Only
    /// valid when the reader was exhausted (table-fatal paths set Failed
    /// directly).
    fn finalize(&mut self) {
        self.status = if self.batches_failed.is_empty() {
            TableStatus::Success
        } else if self.rows_written > 0 {
            TableStatus::PartialFailure
        } else {
            TableStatus::Failed
        };
    }
}

/// Result of a whole migration run: one entry per selected table, in
/// selection order, plus run-level counters.
#[derive(Debug, Clone, Serialize)]
pub struct MigrationReport {
    /// Unique run identifier.
    pub run_id: String,

    /// When the run started.
    pub started_at: DateTime<Utc>,

    /// When the run completed.
    pub completed_at: DateTime<Utc>,

    /// Whether the run was cut short by a cancellation request.
    pub cancelled: bool,

    /// Tables fully migrated.
    pub tables_success: usize,

    /// Tables that ended PartialFailure or Failed.
    pub tables_failed: usize,

    /// Total rows written across all tables.
    pub rows_written: u64,

    /// Per-table results, one per selected table.
    pub tables: Vec<TableMigrationResult>,
}

impl MigrationReport {
    /// Convert to a pretty-printed JSON string.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Migration orchestrator.
///
/// Owns the source connection and target store exclusively for the duration
/// of a run.
pub struct Orchestrator {
    source: Arc<dyn SourceConnection>,
    target: Arc<dyn TargetStore>,
    config: Config,
    log: Arc<MigrationLog>,
    progress: Option<Arc<dyn ProgressSink>>,
}

impl Orchestrator {
    /// Create an orchestrator. Validates the configuration up front.
    pub fn new(
        source: Arc<dyn SourceConnection>,
        target: Arc<dyn TargetStore>,
        config: Config,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            source,
            target,
            config,
            log: Arc::new(MigrationLog::new()),
            progress: None,
        })
    }

    /// Attach a progress sink, invoked after each batch.
    #[must_use]
    pub fn with_progress_sink(mut self, sink: impl ProgressSink + 'static) -> Self {
        self.progress = Some(Arc::new(sink));
        self
    }

    /// Shared handle to the run's log. Grab this before [`run`](Self::run)
    /// to snapshot the log mid-run or export it afterwards.
    #[must_use]
    pub fn log_handle(&self) -> Arc<MigrationLog> {
        self.log.clone()
    }

    /// Run the migration across all selected tables.
    ///
    /// Nothing here is globally fatal: the report always carries one result
    /// per selected table. A cancellation request takes effect at the next
    /// batch boundary, never mid-batch.
    pub async fn run(self, cancel: Option<watch::Receiver<bool>>) -> MigrationReport {
        let run_id = uuid::Uuid::new_v4().to_string();
        let started_at = Utc::now();

        info!(
            run_id = %run_id,
            tables = self.config.tables.len(),
            batch_size = self.config.migration.get_batch_size(),
            "starting migration run"
        );

        let mut results = Vec::with_capacity(self.config.tables.len());
        let mut cancelled = false;

        for table in &self.config.tables {
            if is_cancelled(&cancel) {
                cancelled = true;
            }

            if cancelled {
                self.log.record(LogEntry::new(
                    table.clone(),
                    EventKind::TableFailed,
                    serde_json::json!({ "error": "migration cancelled before table started" }),
                ));
                results.push(TableMigrationResult::failed(table.clone()));
                continue;
            }

            let (result, table_cancelled) = self.migrate_table(table, &cancel).await;
            cancelled |= table_cancelled;
            results.push(result);
        }

        let completed_at = Utc::now();
        let tables_success = results
            .iter()
            .filter(|r| r.status == TableStatus::Success)
            .count();
        let rows_written = results.iter().map(|r| r.rows_written).sum();

        let report = MigrationReport {
            run_id,
            started_at,
            completed_at,
            cancelled,
            tables_success,
            tables_failed: results.len() - tables_success,
            rows_written,
            tables: results,
        };

        info!(
            run_id = %report.run_id,
            tables_success = report.tables_success,
            tables_failed = report.tables_failed,
            rows_written = report.rows_written,
            cancelled = report.cancelled,
            "migration run finished"
        );

        report
    }

    /// Migrate one table through its full state machine. Returns the result
    /// and whether cancellation was observed while the table ran.
    async fn migrate_table(
        &self,
        table: &str,
        cancel: &Option<watch::Receiver<bool>>,
    ) -> (TableMigrationResult, bool) {
        // NotStarted -> Running only once the schema is known.
        let schema = match inspect_schema(self.source.as_ref(), table).await {
            Ok(schema) => schema,
            Err(e) => {
                error!(table, error = %e, "schema inspection failed");
                self.log.record(LogEntry::new(
                    table,
                    EventKind::TableFailed,
                    serde_json::json!({ "error": e.to_string() }),
                ));
                return (TableMigrationResult::failed(table), false);
            }
        };

        let collection_name = self.config.collection_for(table);
        let collection = self.target.collection(collection_name);
        let rows_total = self
            .source
            .estimate_row_count(table)
            .await
            .unwrap_or(None);

        let mut result = TableMigrationResult::started(table);

        self.log.record(LogEntry::new(
            table,
            EventKind::TableStarted,
            serde_json::json!({
                "columns": schema.width(),
                "dialect": self.source.dialect(),
                "collection": collection_name,
                "rows_estimate": rows_total,
            }),
        ));
        info!(table, collection = collection_name, "table migration started");

        let mut reader = match BatchReader::new(
            self.source.as_ref(),
            table,
            self.config.migration.get_batch_size(),
        ) {
            Ok(reader) => reader,
            Err(e) => {
                self.record_table_failed(&mut result, &e);
                return (result, false);
            }
        };

        loop {
            if is_cancelled(cancel) {
                warn!(table, "cancellation requested, stopping after current batch");
                self.log.record(LogEntry::new(
                    table,
                    EventKind::TableFailed,
                    serde_json::json!({
                        "error": "migration cancelled",
                        "rows_read": result.rows_read,
                        "rows_written": result.rows_written,
                    }),
                ));
                result.status = TableStatus::Failed;
                return (result, true);
            }

            let batch = match reader.next_batch().await {
                Ok(Some(batch)) => batch,
                Ok(None) => break,
                Err(e) => {
                    // Table-fatal: the remaining batches are unreachable.
                    self.record_table_failed(&mut result, &e);
                    return (result, false);
                }
            };

            let batch_rows = batch.len() as u64;
            result.rows_read += batch_rows;

            let (documents, fallbacks) = match transform_batch(&schema, &batch.rows) {
                Ok(out) => out,
                Err(e) => {
                    self.record_table_failed(&mut result, &e);
                    return (result, false);
                }
            };

            if !fallbacks.is_empty() {
                warn!(
                    table,
                    batch = batch.index,
                    fallbacks = fallbacks.len(),
                    "values coerced to text"
                );
            }
            let fallback_detail = serde_json::to_value(&fallbacks).unwrap_or_default();

            let mut stop = false;
            match load_batch(collection.as_ref(), &documents).await {
                Ok(written) => {
                    result.rows_written += written;
                    self.log.record(LogEntry::new(
                        table,
                        EventKind::BatchWritten,
                        serde_json::json!({
                            "batch_index": batch.index,
                            "rows": written,
                            "fallbacks": fallback_detail,
                        }),
                    ));
                }
                Err(e) => {
                    // Batch-fatal only: skip and continue with the next batch
                    // unless configured to stop.
                    error!(table, batch = batch.index, error = %e, "batch failed");
                    self.log.record(LogEntry::new(
                        table,
                        EventKind::BatchFailed,
                        serde_json::json!({
                            "batch_index": batch.index,
                            "rows": batch_rows,
                            "error": e.to_string(),
                            "fallbacks": fallback_detail,
                        }),
                    ));
                    result.batches_failed.push(BatchFailure {
                        batch_index: batch.index,
                        error: e.to_string(),
                    });
                    stop = self.config.migration.stop_on_batch_failure;
                }
            }

            // The sink hears about every completed batch, written or failed,
            // including the one that stops the table.
            if let Some(sink) = &self.progress {
                sink.batch_complete(&Progress {
                    table: table.to_string(),
                    rows_processed: result.rows_read,
                    rows_total,
                });
            }

            if stop {
                break;
            }
        }

        result.finalize();

        match result.status {
            TableStatus::Failed => {
                self.log.record(LogEntry::new(
                    table,
                    EventKind::TableFailed,
                    serde_json::json!({
                        "error": "all batches failed",
                        "rows_read": result.rows_read,
                        "batches_failed": result.batches_failed.len(),
                    }),
                ));
            }
            _ => {
                self.log.record(LogEntry::new(
                    table,
                    EventKind::TableCompleted,
                    serde_json::json!({
                        "status": result.status,
                        "rows_read": result.rows_read,
                        "rows_written": result.rows_written,
                        "batches_failed": result.batches_failed.len(),
                    }),
                ));
            }
        }

        info!(
            table,
            status = ?result.status,
            rows_read = result.rows_read,
            rows_written = result.rows_written,
            "table migration finished"
        );

        (result, false)
    }

    fn record_table_failed(&self, result: &mut TableMigrationResult, error: &MigrateError) {
        error!(table = %result.table_name, error = %error, "table migration aborted");
        self.log.record(LogEntry::new(
            result.table_name.clone(),
            EventKind::TableFailed,
            serde_json::json!({
                "error": error.to_string(),
                "rows_read": result.rows_read,
                "rows_written": result.rows_written,
            }),
        ));
        result.status = TableStatus::Failed;
    }
}

fn is_cancelled(cancel: &Option<watch::Receiver<bool>>) -> bool {
    cancel.as_ref().map(|rx| *rx.borrow()).unwrap_or(false)
}
