//! In-memory source and target adapters.
//!
//! The engine's wire drivers live outside this crate; these adapters provide
//! the same capabilities over plain vectors so the pipeline can be exercised
//! in tests and embedded callers can prototype without a live database.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::core::schema::ColumnDescriptor;
use crate::core::traits::{SourceConnection, TargetCollection, TargetStore};
use crate::core::value::{Document, RawRow};
use crate::error::{MigrateError, Result};

struct MemoryTable {
    columns: Vec<ColumnDescriptor>,
    rows: Vec<RawRow>,
}

/// A relational source backed by in-memory tables.
#[derive(Default)]
pub struct MemorySource {
    dialect: String,
    tables: HashMap<String, MemoryTable>,
    fail_read_at: HashMap<String, u64>,
    reply_cap: Option<usize>,
}

impl MemorySource {
    /// Create a source reporting the given dialect identity.
    pub fn new(dialect: impl Into<String>) -> Self {
        Self {
            dialect: dialect.into(),
            tables: HashMap::new(),
            fail_read_at: HashMap::new(),
            reply_cap: None,
        }
    }

    /// Add a table with its column list and rows.
    pub fn with_table(
        mut self,
        name: impl Into<String>,
        columns: Vec<ColumnDescriptor>,
        rows: Vec<RawRow>,
    ) -> Self {
        self.tables.insert(name.into(), MemoryTable { columns, rows });
        self
    }

    /// Make reads of `table` fail once the given offset is reached, to
    /// simulate a connection dropping mid-table.
    pub fn with_read_failure_at(mut self, table: impl Into<String>, offset: u64) -> Self {
        self.fail_read_at.insert(table.into(), offset);
        self
    }

    /// Return at most `cap` rows per read call, regardless of the requested
    /// limit. Simulates drivers that chunk their replies.
    pub fn with_reply_cap(mut self, cap: usize) -> Self {
        self.reply_cap = Some(cap);
        self
    }
}

#[async_trait]
impl SourceConnection for MemorySource {
    async fn describe(&self, table: &str) -> Result<Vec<ColumnDescriptor>> {
        self.tables
            .get(table)
            .map(|t| t.columns.clone())
            .ok_or_else(|| MigrateError::schema(table, "table does not exist"))
    }

    async fn read_rows(&self, table: &str, offset: u64, limit: usize) -> Result<Vec<RawRow>> {
        if let Some(&fail_at) = self.fail_read_at.get(table) {
            if offset >= fail_at {
                return Err(MigrateError::read(table, "connection dropped"));
            }
        }

        let t = self
            .tables
            .get(table)
            .ok_or_else(|| MigrateError::read(table, "table does not exist"))?;

        let effective = self.reply_cap.map_or(limit, |cap| limit.min(cap));
        let start = (offset as usize).min(t.rows.len());
        let end = (start + effective).min(t.rows.len());
        Ok(t.rows[start..end].to_vec())
    }

    async fn estimate_row_count(&self, table: &str) -> Result<Option<i64>> {
        Ok(self.tables.get(table).map(|t| t.rows.len() as i64))
    }

    fn dialect(&self) -> &str {
        &self.dialect
    }
}

/// One in-memory collection. Supports failure injection by insert call
/// index so tests can fail a specific batch.
pub struct MemoryCollection {
    name: String,
    documents: Mutex<Vec<Document>>,
    fail_on_calls: Mutex<HashSet<usize>>,
    calls: Mutex<usize>,
}

impl MemoryCollection {
    fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            documents: Mutex::new(Vec::new()),
            fail_on_calls: Mutex::new(HashSet::new()),
            calls: Mutex::new(0),
        }
    }

    /// Fail the Nth (zero-based) insert call against this collection.
    pub fn fail_on_call(&self, call: usize) {
        self.fail_on_calls.lock().expect("lock poisoned").insert(call);
    }

    /// Documents inserted so far, in insertion order.
    pub fn documents(&self) -> Vec<Document> {
        self.documents.lock().expect("lock poisoned").clone()
    }
}

#[async_trait]
impl TargetCollection for MemoryCollection {
    async fn insert_many(&self, documents: &[Document]) -> Result<u64> {
        let call = {
            let mut calls = self.calls.lock().expect("lock poisoned");
            let current = *calls;
            *calls += 1;
            current
        };

        if self.fail_on_calls.lock().expect("lock poisoned").contains(&call) {
            return Err(MigrateError::write(&self.name, "injected write failure"));
        }

        self.documents
            .lock()
            .expect("lock poisoned")
            .extend_from_slice(documents);
        Ok(documents.len() as u64)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// A document store backed by in-memory collections, created lazily.
#[derive(Default)]
pub struct MemoryStore {
    collections: Mutex<HashMap<String, Arc<MemoryCollection>>>,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Get or create the named collection as its concrete type, e.g. to
    /// configure failure injection or to inspect inserted documents.
    pub fn open(&self, name: &str) -> Arc<MemoryCollection> {
        self.collections
            .lock()
            .expect("lock poisoned")
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(MemoryCollection::new(name)))
            .clone()
    }
}

impl TargetStore for MemoryStore {
    fn collection(&self, name: &str) -> Arc<dyn TargetCollection> {
        self.open(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::value::{DocValue, RawValue};

    #[tokio::test]
    async fn test_memory_source_round_trip() {
        let source = MemorySource::new("sqlite").with_table(
            "t",
            vec![ColumnDescriptor::new("n", "INT", false)],
            vec![vec![RawValue::Integer(1)], vec![RawValue::Integer(2)]],
        );

        assert_eq!(source.describe("t").await.unwrap().len(), 1);
        assert_eq!(source.read_rows("t", 0, 10).await.unwrap().len(), 2);
        assert_eq!(source.read_rows("t", 1, 10).await.unwrap().len(), 1);
        assert_eq!(source.estimate_row_count("t").await.unwrap(), Some(2));
        assert!(source.describe("ghost").await.is_err());
    }

    #[tokio::test]
    async fn test_memory_store_failure_injection() {
        let store = MemoryStore::new();
        let coll = store.open("c");
        coll.fail_on_call(1);

        let mut doc = Document::with_capacity(1);
        doc.push("x", DocValue::Integer(1));
        let docs = vec![doc];

        assert!(coll.insert_many(&docs).await.is_ok());
        assert!(coll.insert_many(&docs).await.is_err());
        assert!(coll.insert_many(&docs).await.is_ok());
        assert_eq!(coll.documents().len(), 2);
    }
}
