//! Row transformation: raw rows into target documents.

use serde::Serialize;

use crate::core::schema::{ColumnDescriptor, TableSchema};
use crate::core::value::{Document, RawRow, ValueKind};
use crate::error::{MigrateError, Result};
use crate::typemap;

/// One field that could not be converted to its classified kind and was
/// coerced to text instead. Not an error; recorded as log detail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConversionFallback {
    /// Column whose value fell back.
    pub column: String,

    /// The column's declared source type.
    pub declared_type: String,

    /// The kind the value was supposed to become.
    pub expected_kind: ValueKind,
}

/// A transformed row plus any conversion fallbacks that occurred.
#[derive(Debug, Clone, PartialEq)]
pub struct TransformedRow {
    /// The document, one field per source column, in column order.
    pub document: Document,

    /// Fields coerced to text because the classified kind did not fit.
    pub fallbacks: Vec<ConversionFallback>,
}

/// Convert one raw row into a target document.
///
/// Requires the row to be positionally aligned with `columns`; a width
/// mismatch means the inspector and the reader disagree on the table's shape,
/// which is a programming-contract failure that aborts the whole table.
/// Deterministic: the same row and columns always yield the same document.
pub fn transform_row(
    table: &str,
    row: &RawRow,
    columns: &[ColumnDescriptor],
) -> Result<TransformedRow> {
    if row.len() != columns.len() {
        return Err(MigrateError::Alignment {
            table: table.to_string(),
            expected: columns.len(),
            actual: row.len(),
        });
    }

    let mut document = Document::with_capacity(columns.len());
    let mut fallbacks = Vec::new();

    for (value, column) in row.iter().zip(columns) {
        let kind = typemap::classify(&column.declared_type);
        let outcome = typemap::coerce(value, kind);
        if outcome.fell_back {
            fallbacks.push(ConversionFallback {
                column: column.name.clone(),
                declared_type: column.declared_type.clone(),
                expected_kind: kind,
            });
        }
        document.push(column.name.clone(), outcome.value);
    }

    Ok(TransformedRow {
        document,
        fallbacks,
    })
}

/// Transform a whole batch of rows against one schema snapshot.
///
/// Fails on the first misaligned row; fallbacks are aggregated across the
/// batch for a single log entry.
pub fn transform_batch(
    schema: &TableSchema,
    rows: &[RawRow],
) -> Result<(Vec<Document>, Vec<ConversionFallback>)> {
    let mut documents = Vec::with_capacity(rows.len());
    let mut fallbacks = Vec::new();

    for row in rows {
        let transformed = transform_row(&schema.table, row, &schema.columns)?;
        documents.push(transformed.document);
        fallbacks.extend(transformed.fallbacks);
    }

    Ok((documents, fallbacks))
}
