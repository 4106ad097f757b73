//! Type mapping from declared source types to target value kinds.
//!
//! [`classify`] is pure, total, case-insensitive and dialect-agnostic: it
//! matches substrings of the declared type name, so `BIGINT`, `INT UNSIGNED`
//! and `serial4` all land on [`ValueKind::Integer`] without any per-dialect
//! table. Unknown types fall back to [`ValueKind::String`]; classification
//! itself never fails.
//!
//! [`coerce`] converts one raw scalar to a classified kind. It never fails
//! either: a value that cannot be represented in the requested kind is
//! conservatively coerced to its textual form, and the outcome is flagged so
//! the caller can record the fallback.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use rust_decimal::prelude::ToPrimitive;

use crate::core::value::{DocValue, RawValue, ValueKind};

/// Classify a declared source type name into a target value kind.
///
/// Match order follows specificity: integer spellings first (so `BIGINT`
/// wins over the `BIT` rule), then exact numerics, booleans, temporal types,
/// JSON, binary, and finally the String catch-all.
#[must_use]
pub fn classify(declared_type: &str) -> ValueKind {
    let t = declared_type.to_lowercase();

    if t.contains("int") || t.contains("serial") {
        ValueKind::Integer
    } else if t.contains("float")
        || t.contains("double")
        || t.contains("decimal")
        || t.contains("numeric")
        || t.contains("real")
        || t.contains("money")
    {
        ValueKind::Float
    } else if t.contains("bool") || t.contains("bit") {
        ValueKind::Boolean
    } else if t.contains("date") || t.contains("time") {
        ValueKind::DateTime
    } else if t.contains("json") {
        ValueKind::Json
    } else if t.contains("blob") || t.contains("binary") || t.contains("bytea") {
        ValueKind::Binary
    } else {
        ValueKind::String
    }
}

/// Outcome of coercing one raw value.
#[derive(Debug, Clone, PartialEq)]
pub struct Coercion {
    /// The converted value.
    pub value: DocValue,

    /// True when the value could not be represented in the requested kind
    /// and was coerced to its textual form instead.
    pub fell_back: bool,
}

impl Coercion {
    fn ok(value: DocValue) -> Self {
        Self {
            value,
            fell_back: false,
        }
    }

    fn fallback(raw: &RawValue) -> Self {
        Self {
            value: DocValue::String(raw.render_text()),
            fell_back: true,
        }
    }
}

/// Coerce a raw scalar to the given target kind.
///
/// NULL maps to the explicit null marker regardless of kind. Deterministic
/// and stateless: the same input always yields the same outcome.
#[must_use]
pub fn coerce(raw: &RawValue, kind: ValueKind) -> Coercion {
    if raw.is_null() {
        return Coercion::ok(DocValue::Null);
    }

    match kind {
        ValueKind::Null => Coercion::ok(DocValue::Null),
        ValueKind::Integer => coerce_integer(raw),
        ValueKind::Float => coerce_float(raw),
        ValueKind::Boolean => coerce_boolean(raw),
        ValueKind::DateTime => coerce_datetime(raw),
        ValueKind::Json => coerce_json(raw),
        ValueKind::Binary => coerce_binary(raw),
        ValueKind::String => Coercion::ok(DocValue::String(raw.render_text())),
    }
}

fn coerce_integer(raw: &RawValue) -> Coercion {
    match raw {
        RawValue::Integer(v) => Coercion::ok(DocValue::Integer(*v)),
        RawValue::Boolean(v) => Coercion::ok(DocValue::Integer(i64::from(*v))),
        RawValue::Float(v) if v.fract() == 0.0 && v.is_finite() && v.abs() < i64::MAX as f64 => {
            Coercion::ok(DocValue::Integer(*v as i64))
        }
        RawValue::Decimal(d) if d.is_integer() => match d.to_i64() {
            Some(v) => Coercion::ok(DocValue::Integer(v)),
            None => Coercion::fallback(raw),
        },
        RawValue::Text(s) => match s.trim().parse::<i64>() {
            Ok(v) => Coercion::ok(DocValue::Integer(v)),
            Err(_) => Coercion::fallback(raw),
        },
        _ => Coercion::fallback(raw),
    }
}

fn coerce_float(raw: &RawValue) -> Coercion {
    match raw {
        RawValue::Float(v) => Coercion::ok(DocValue::Float(*v)),
        RawValue::Integer(v) => Coercion::ok(DocValue::Float(*v as f64)),
        RawValue::Decimal(d) => match d.to_f64() {
            Some(v) => Coercion::ok(DocValue::Float(v)),
            None => Coercion::fallback(raw),
        },
        RawValue::Text(s) => match s.trim().parse::<f64>() {
            Ok(v) => Coercion::ok(DocValue::Float(v)),
            Err(_) => Coercion::fallback(raw),
        },
        _ => Coercion::fallback(raw),
    }
}

fn coerce_boolean(raw: &RawValue) -> Coercion {
    match raw {
        RawValue::Boolean(v) => Coercion::ok(DocValue::Boolean(*v)),
        RawValue::Integer(0) => Coercion::ok(DocValue::Boolean(false)),
        RawValue::Integer(1) => Coercion::ok(DocValue::Boolean(true)),
        RawValue::Float(v) if *v == 0.0 => Coercion::ok(DocValue::Boolean(false)),
        RawValue::Float(v) if *v == 1.0 => Coercion::ok(DocValue::Boolean(true)),
        RawValue::Text(s) => match s.trim().to_lowercase().as_str() {
            "true" | "t" | "yes" | "y" | "1" => Coercion::ok(DocValue::Boolean(true)),
            "false" | "f" | "no" | "n" | "0" => Coercion::ok(DocValue::Boolean(false)),
            _ => Coercion::fallback(raw),
        },
        _ => Coercion::fallback(raw),
    }
}

fn coerce_datetime(raw: &RawValue) -> Coercion {
    match raw {
        RawValue::DateTime(v) => Coercion::ok(DocValue::DateTime(v.and_utc())),
        RawValue::Text(s) => match parse_datetime_text(s.trim()) {
            Some(ts) => Coercion::ok(DocValue::DateTime(ts)),
            None => Coercion::fallback(raw),
        },
        _ => Coercion::fallback(raw),
    }
}

/// Accept the timestamp spellings commonly emitted by drivers: RFC 3339,
/// `YYYY-MM-DD HH:MM:SS[.fff]` (with space or `T`), and bare dates.
fn parse_datetime_text(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(s) {
        return Some(ts.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(naive.and_utc());
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Some(date.and_hms_opt(0, 0, 0)?.and_utc());
    }
    None
}

fn coerce_json(raw: &RawValue) -> Coercion {
    match raw {
        RawValue::Text(s) => match serde_json::from_str::<serde_json::Value>(s) {
            Ok(v) => Coercion::ok(DocValue::Json(v)),
            Err(_) => Coercion::fallback(raw),
        },
        RawValue::Integer(v) => Coercion::ok(DocValue::Json(serde_json::json!(v))),
        RawValue::Boolean(v) => Coercion::ok(DocValue::Json(serde_json::json!(v))),
        RawValue::Float(v) => match serde_json::Number::from_f64(*v) {
            Some(n) => Coercion::ok(DocValue::Json(serde_json::Value::Number(n))),
            None => Coercion::fallback(raw),
        },
        RawValue::Decimal(d) => match d.to_f64().and_then(serde_json::Number::from_f64) {
            Some(n) => Coercion::ok(DocValue::Json(serde_json::Value::Number(n))),
            None => Coercion::fallback(raw),
        },
        _ => Coercion::fallback(raw),
    }
}

fn coerce_binary(raw: &RawValue) -> Coercion {
    match raw {
        RawValue::Bytes(b) => Coercion::ok(DocValue::Binary(b.clone())),
        RawValue::Text(s) => Coercion::ok(DocValue::Binary(s.clone().into_bytes())),
        _ => Coercion::fallback(raw),
    }
}
