//! Row Decoder
//!
//! Turns an engine [`ResultSet`] into transport-safe values, choosing how to
//! scan each column from its declared [`EngineType`] rather than from the
//! runtime value.
//!
//! # Decode Table
//!
//! ```text
//! Date, DateTime*, DateTime64*      → timestamp (RFC3339) or null when zero
//! String, FixedString, UUID         → string (empty stays empty)
//! LowCardinality(T)                 → as T
//! Int8..Int64 / UInt8..UInt64       → int64 / uint64
//! Int128+ / UInt128+                → string
//! Float32 / Float64                 → float64 (null for NaN/Inf)
//! Bool                              → bool
//! Array(...)                        → string (JSON text of the array)
//! Map(...)                          → string map, null map → {}
//! Nullable(T)                       → null or as T
//! anything else                     → plain string scan
//! ```
//!
//! This is the only decode policy in the crate; explore queries, raw SQL and
//! log search all go through it.
//!
//! A row that fails to scan is logged and skipped. It never fails the result.

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use thiserror::Error;

use crate::engine::{ColumnMeta, EngineType, RawRow, ResultSet};

/// A decoded cell
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum DecodedValue {
    Null,
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
    String(String),
    /// RFC3339, UTC
    Timestamp(String),
    Map(BTreeMap<String, String>),
}

impl DecodedValue {
    /// Borrow the text of a string or timestamp value
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) | Self::Timestamp(s) => Some(s),
            _ => None,
        }
    }
}

/// A decoded row, keyed by column name
pub type DecodedRow = BTreeMap<String, DecodedValue>;

/// Decoded columns and rows
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DecodedResult {
    pub columns: Vec<String>,
    pub rows: Vec<DecodedRow>,
    /// Rows dropped because they failed to scan
    pub skipped: usize,
}

/// Why a single row could not be scanned
#[derive(Error, Debug, PartialEq)]
pub enum DecodeError {
    #[error("malformed row: {0}")]
    Malformed(String),

    #[error("expected {expected} cells, found {found}")]
    Arity { expected: usize, found: usize },

    #[error("column {column} ({type_name}): {reason}")]
    Cell {
        column: String,
        type_name: String,
        reason: String,
    },
}

/// Column-typed row decoder
pub struct RowDecoder {
    columns: Vec<(ColumnMeta, EngineType)>,
}

impl RowDecoder {
    /// Prepare a decoder for the given columns
    pub fn new(columns: &[ColumnMeta]) -> Self {
        Self {
            columns: columns
                .iter()
                .map(|c| (c.clone(), EngineType::parse(&c.type_name)))
                .collect(),
        }
    }

    /// Decode a whole result set, skipping rows that fail to scan
    pub fn decode(result: ResultSet) -> DecodedResult {
        let decoder = Self::new(&result.columns);
        let mut rows = Vec::with_capacity(result.rows.len());
        let mut skipped = 0;

        for (index, raw) in result.rows.iter().enumerate() {
            match decoder.decode_row(raw) {
                Ok(row) => rows.push(row),
                Err(e) => {
                    skipped += 1;
                    tracing::warn!(row = index, error = %e, "Skipping row that failed to decode");
                }
            }
        }

        if skipped > 0 {
            tracing::warn!(skipped, decoded = rows.len(), "Some rows were dropped while decoding");
        }

        DecodedResult {
            columns: result.columns.into_iter().map(|c| c.name).collect(),
            rows,
            skipped,
        }
    }

    /// Decode one row
    pub fn decode_row(&self, raw: &RawRow) -> Result<DecodedRow, DecodeError> {
        let cells: Vec<Value> = serde_json::from_str(raw.as_str())
            .map_err(|e| DecodeError::Malformed(e.to_string()))?;

        if cells.len() != self.columns.len() {
            return Err(DecodeError::Arity {
                expected: self.columns.len(),
                found: cells.len(),
            });
        }

        let mut row = DecodedRow::new();
        for ((meta, ty), cell) in self.columns.iter().zip(&cells) {
            let value = decode_cell(ty, cell).map_err(|reason| DecodeError::Cell {
                column: meta.name.clone(),
                type_name: meta.type_name.clone(),
                reason,
            })?;
            row.insert(meta.name.clone(), value);
        }

        Ok(row)
    }
}

/// Decode a single cell according to its declared type
pub fn decode_cell(ty: &EngineType, cell: &Value) -> Result<DecodedValue, String> {
    match ty {
        EngineType::Nullable(inner) => {
            if cell.is_null() {
                Ok(DecodedValue::Null)
            } else {
                decode_cell(inner, cell)
            }
        }
        EngineType::LowCardinality(inner) => decode_cell(inner, cell),
        EngineType::Date | EngineType::DateTime { .. } | EngineType::DateTime64 { .. } => {
            scan_timestamp(cell)
        }
        EngineType::String | EngineType::FixedString(_) | EngineType::Uuid => {
            scan_string(cell).map(DecodedValue::String)
        }
        EngineType::Int(bits) if *bits <= 64 => scan_i64(cell).map(DecodedValue::Int),
        EngineType::UInt(bits) if *bits <= 64 => scan_u64(cell).map(DecodedValue::UInt),
        EngineType::Int(_) | EngineType::UInt(_) => scan_wide_integer(cell),
        EngineType::Float(_) => scan_f64(cell),
        EngineType::Bool => scan_bool(cell).map(DecodedValue::Bool),
        EngineType::Array(_) => match cell {
            Value::Array(_) => Ok(DecodedValue::String(cell.to_string())),
            other => Err(format!("expected array, found {}", kind_of(other))),
        },
        EngineType::Map(..) => scan_map(cell),
        EngineType::Other(_) => scan_other(cell),
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn scan_string(cell: &Value) -> Result<String, String> {
    match cell {
        Value::String(s) => Ok(s.clone()),
        other => Err(format!("expected string, found {}", kind_of(other))),
    }
}

fn scan_i64(cell: &Value) -> Result<i64, String> {
    match cell {
        Value::Number(n) => n
            .as_i64()
            .ok_or_else(|| format!("{} does not fit a signed 64-bit integer", n)),
        // 64-bit integers are quoted by default
        Value::String(s) => s
            .parse::<i64>()
            .map_err(|e| format!("invalid integer '{}': {}", s, e)),
        other => Err(format!("expected integer, found {}", kind_of(other))),
    }
}

fn scan_u64(cell: &Value) -> Result<u64, String> {
    match cell {
        Value::Number(n) => n
            .as_u64()
            .ok_or_else(|| format!("{} does not fit an unsigned 64-bit integer", n)),
        Value::String(s) => s
            .parse::<u64>()
            .map_err(|e| format!("invalid unsigned integer '{}': {}", s, e)),
        other => Err(format!("expected unsigned integer, found {}", kind_of(other))),
    }
}

fn scan_wide_integer(cell: &Value) -> Result<DecodedValue, String> {
    match cell {
        Value::String(s) => Ok(DecodedValue::String(s.clone())),
        Value::Number(n) => Ok(DecodedValue::String(n.to_string())),
        other => Err(format!("expected integer, found {}", kind_of(other))),
    }
}

fn scan_f64(cell: &Value) -> Result<DecodedValue, String> {
    match cell {
        Value::Number(n) => n
            .as_f64()
            .map(DecodedValue::Float)
            .ok_or_else(|| format!("{} is not a float", n)),
        Value::String(s) => match s.parse::<f64>() {
            Ok(f) if f.is_finite() => Ok(DecodedValue::Float(f)),
            Ok(_) => Ok(DecodedValue::Null),
            Err(e) => Err(format!("invalid float '{}': {}", s, e)),
        },
        // NaN and infinities are written as null
        Value::Null => Ok(DecodedValue::Null),
        other => Err(format!("expected float, found {}", kind_of(other))),
    }
}

fn scan_bool(cell: &Value) -> Result<bool, String> {
    match cell {
        Value::Bool(b) => Ok(*b),
        Value::Number(n) => match n.as_u64() {
            Some(0) => Ok(false),
            Some(1) => Ok(true),
            _ => Err(format!("{} is not a boolean", n)),
        },
        Value::String(s) => match s.as_str() {
            "true" | "1" => Ok(true),
            "false" | "0" => Ok(false),
            _ => Err(format!("'{}' is not a boolean", s)),
        },
        other => Err(format!("expected bool, found {}", kind_of(other))),
    }
}

fn scan_map(cell: &Value) -> Result<DecodedValue, String> {
    match cell {
        Value::Object(entries) => Ok(DecodedValue::Map(
            entries
                .iter()
                .map(|(k, v)| {
                    let v = match v {
                        Value::String(s) => s.clone(),
                        Value::Null => String::new(),
                        other => other.to_string(),
                    };
                    (k.clone(), v)
                })
                .collect(),
        )),
        Value::Null => Ok(DecodedValue::Map(BTreeMap::new())),
        other => Err(format!("expected map, found {}", kind_of(other))),
    }
}

fn scan_other(cell: &Value) -> Result<DecodedValue, String> {
    match cell {
        Value::String(s) => Ok(DecodedValue::String(s.clone())),
        Value::Null => Err("cannot scan null into a string".to_string()),
        other => Ok(DecodedValue::String(other.to_string())),
    }
}

fn scan_timestamp(cell: &Value) -> Result<DecodedValue, String> {
    let ts = match cell {
        Value::String(s) => match parse_timestamp(s)? {
            Some(ts) => ts,
            None => return Ok(DecodedValue::Null),
        },
        Value::Number(n) => {
            let secs = n
                .as_i64()
                .ok_or_else(|| format!("{} is not a unix timestamp", n))?;
            DateTime::from_timestamp(secs, 0)
                .ok_or_else(|| format!("{} is out of range", secs))?
        }
        other => return Err(format!("expected timestamp, found {}", kind_of(other))),
    };

    if ts.timestamp() == 0 && ts.timestamp_subsec_nanos() == 0 {
        return Ok(DecodedValue::Null);
    }

    Ok(DecodedValue::Timestamp(
        ts.to_rfc3339_opts(SecondsFormat::Secs, true),
    ))
}

/// Parse the engine's date/time text. `Ok(None)` is the all-zero value.
fn parse_timestamp(s: &str) -> Result<Option<DateTime<Utc>>, String> {
    if s.starts_with("0000-00-00") {
        return Ok(None);
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(Some(dt.with_timezone(&Utc)));
    }

    if let Ok(dt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f") {
        return Ok(Some(dt.and_utc()));
    }

    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        if let Some(dt) = date.and_hms_opt(0, 0, 0) {
            return Ok(Some(dt.and_utc()));
        }
    }

    Err(format!("cannot parse timestamp '{}'", s))
}
