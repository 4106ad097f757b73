//! Value types for source rows, converted documents, and row batches.
//!
//! The migration pipeline handles values in two representations: [`RawValue`]
//! as surfaced by a source driver, and [`DocValue`] after classification and
//! coercion to one of the closed set of target kinds ([`ValueKind`]).

use chrono::{DateTime, NaiveDateTime, Utc};
use rust_decimal::Decimal;
use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;

/// The closed set of value kinds a source value is normalized into before
/// storage in the target collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueKind {
    Integer,
    Float,
    Boolean,
    DateTime,
    Json,
    Binary,
    String,
    Null,
}

/// A raw scalar value as produced by a source driver.
///
/// Drivers normalize their wire types into this enum; the dialect only shows
/// through in the declared type strings carried by the schema, never here.
#[derive(Debug, Clone, PartialEq)]
pub enum RawValue {
    /// SQL NULL.
    Null,

    /// Any integer width (tinyint through bigint).
    Integer(i64),

    /// Floating point (real, float, double precision).
    Float(f64),

    /// Exact numeric (decimal, numeric, money).
    Decimal(Decimal),

    /// Boolean or bit.
    Boolean(bool),

    /// Character data of any length.
    Text(String),

    /// Binary data (blob, varbinary, bytea).
    Bytes(Vec<u8>),

    /// Date/time without timezone, as most drivers surface timestamps.
    DateTime(NaiveDateTime),
}

impl RawValue {
    /// Check if this value is NULL.
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, RawValue::Null)
    }

    /// Textual rendering used for String coercion and fallback values.
    pub fn render_text(&self) -> String {
        match self {
            RawValue::Null => String::new(),
            RawValue::Integer(v) => v.to_string(),
            RawValue::Float(v) => v.to_string(),
            RawValue::Decimal(v) => v.to_string(),
            RawValue::Boolean(v) => v.to_string(),
            RawValue::Text(v) => v.clone(),
            RawValue::Bytes(v) => String::from_utf8_lossy(v).into_owned(),
            RawValue::DateTime(v) => v.and_utc().to_rfc3339(),
        }
    }
}

impl From<i64> for RawValue {
    fn from(v: i64) -> Self {
        RawValue::Integer(v)
    }
}

impl From<i32> for RawValue {
    fn from(v: i32) -> Self {
        RawValue::Integer(v as i64)
    }
}

impl From<f64> for RawValue {
    fn from(v: f64) -> Self {
        RawValue::Float(v)
    }
}

impl From<bool> for RawValue {
    fn from(v: bool) -> Self {
        RawValue::Boolean(v)
    }
}

impl From<&str> for RawValue {
    fn from(v: &str) -> Self {
        RawValue::Text(v.to_string())
    }
}

impl From<String> for RawValue {
    fn from(v: String) -> Self {
        RawValue::Text(v)
    }
}

impl From<Vec<u8>> for RawValue {
    fn from(v: Vec<u8>) -> Self {
        RawValue::Bytes(v)
    }
}

impl From<Decimal> for RawValue {
    fn from(v: Decimal) -> Self {
        RawValue::Decimal(v)
    }
}

impl From<NaiveDateTime> for RawValue {
    fn from(v: NaiveDateTime) -> Self {
        RawValue::DateTime(v)
    }
}

/// One row as read from the source, positionally aligned with the table's
/// column descriptors.
pub type RawRow = Vec<RawValue>;

/// A converted value ready for insertion into the target collection.
#[derive(Debug, Clone, PartialEq)]
pub enum DocValue {
    /// Explicit null marker, kept regardless of the column's kind.
    Null,

    Integer(i64),

    Float(f64),

    Boolean(bool),

    /// Canonical timestamp, always UTC.
    DateTime(DateTime<Utc>),

    /// Structured JSON carried through as-is.
    Json(serde_json::Value),

    /// Binary payload passed through unchanged.
    Binary(Vec<u8>),

    String(String),
}

impl DocValue {
    /// The kind this value belongs to.
    #[must_use]
    pub fn kind(&self) -> ValueKind {
        match self {
            DocValue::Null => ValueKind::Null,
            DocValue::Integer(_) => ValueKind::Integer,
            DocValue::Float(_) => ValueKind::Float,
            DocValue::Boolean(_) => ValueKind::Boolean,
            DocValue::DateTime(_) => ValueKind::DateTime,
            DocValue::Json(_) => ValueKind::Json,
            DocValue::Binary(_) => ValueKind::Binary,
            DocValue::String(_) => ValueKind::String,
        }
    }

    /// Check if this value is the explicit null marker.
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, DocValue::Null)
    }
}

impl Serialize for DocValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            DocValue::Null => serializer.serialize_none(),
            DocValue::Integer(v) => serializer.serialize_i64(*v),
            DocValue::Float(v) => serializer.serialize_f64(*v),
            DocValue::Boolean(v) => serializer.serialize_bool(*v),
            DocValue::DateTime(v) => serializer.serialize_str(&v.to_rfc3339()),
            DocValue::Json(v) => v.serialize(serializer),
            DocValue::Binary(v) => serializer.serialize_bytes(v),
            DocValue::String(v) => serializer.serialize_str(v),
        }
    }
}

/// A target document: ordered mapping from column name to converted value.
///
/// Field order follows the source table's column order, and the field count
/// always equals the column count for that table.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Document {
    fields: Vec<(String, DocValue)>,
}

impl Document {
    /// Create an empty document with capacity for `columns` fields.
    #[must_use]
    pub fn with_capacity(columns: usize) -> Self {
        Self {
            fields: Vec::with_capacity(columns),
        }
    }

    /// Append a field. Column names are unique within a table, so this does
    /// not check for duplicates.
    pub fn push(&mut self, name: impl Into<String>, value: DocValue) {
        self.fields.push((name.into(), value));
    }

    /// Look up a field by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&DocValue> {
        self.fields
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v)
    }

    /// Number of fields.
    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Check if the document has no fields.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Field names in document order.
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(n, _)| n.as_str())
    }

    /// Iterate over fields in document order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &DocValue)> {
        self.fields.iter().map(|(n, v)| (n.as_str(), v))
    }
}

impl Serialize for Document {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (name, value) in &self.fields {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

impl FromIterator<(String, DocValue)> for Document {
    fn from_iter<I: IntoIterator<Item = (String, DocValue)>>(iter: I) -> Self {
        Self {
            fields: iter.into_iter().collect(),
        }
    }
}

/// A bounded batch of raw rows pulled from the source in one read pass.
#[derive(Debug, Clone)]
pub struct RowBatch {
    /// Zero-based position of this batch within the table's read sequence.
    pub index: usize,

    /// Rows in this batch, at most one batch_size worth.
    pub rows: Vec<RawRow>,
}

impl RowBatch {
    /// Create a batch with the given index and rows.
    #[must_use]
    pub fn new(index: usize, rows: Vec<RawRow>) -> Self {
        Self { index, rows }
    }

    /// Number of rows in this batch.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Check if the batch is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
