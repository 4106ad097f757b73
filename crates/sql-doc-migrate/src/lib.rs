//! # sql-doc-migrate
//!
//! Migration engine for copying relational tables into a document-oriented
//! store, converting each row into a structured document while preserving
//! and re-typing column values.
//!
//! The engine inspects the source schema, classifies each declared column
//! type into a small closed set of target value kinds, streams rows in
//! bounded-memory batches, bulk-inserts them into the target collection, and
//! keeps a structured per-batch audit log. Wire-level connectivity is out of
//! scope: callers supply [`SourceConnection`] and [`TargetStore`]
//! capabilities, and the dialect of the source only shows through in the
//! declared type strings the type mapper classifies.
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use sql_doc_migrate::{Config, MemorySource, MemoryStore, Orchestrator};
//!
//! #[tokio::main]
//! async fn main() -> sql_doc_migrate::Result<()> {
//!     let source = Arc::new(MemorySource::new("sqlite"));
//!     let target = Arc::new(MemoryStore::new());
//!     let config = Config::for_tables(["users"]);
//!
//!     let orchestrator = Orchestrator::new(source, target, config)?;
//!     let log = orchestrator.log_handle();
//!     let report = orchestrator.run(None).await;
//!
//!     println!("{} rows written", report.rows_written);
//!     println!("{}", log.to_json()?);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod core;
pub mod error;
pub mod log;
pub mod memory;
pub mod orchestrator;
pub mod source;
pub mod target;
pub mod transform;
pub mod typemap;

// Re-exports for convenient access
pub use crate::config::{Config, MigrationConfig};
pub use crate::core::schema::{ColumnDescriptor, TableSchema};
pub use crate::core::traits::{
    Progress, ProgressSink, SourceConnection, TargetCollection, TargetStore,
};
pub use crate::core::value::{DocValue, Document, RawRow, RawValue, RowBatch, ValueKind};
pub use crate::error::{MigrateError, Result};
pub use crate::log::{EventKind, LogEntry, MigrationLog};
pub use crate::memory::{MemoryCollection, MemorySource, MemoryStore};
pub use crate::orchestrator::{
    BatchFailure, MigrationReport, Orchestrator, TableMigrationResult, TableStatus,
};
pub use crate::transform::{ConversionFallback, TransformedRow};
