//! Runtime type dispatch for result columns
//!
//! Result shapes are only known once a query has run. Each reported column
//! type resolves to a [`ColumnKind`] once per execution, and each kind knows
//! how to allocate a [`ScanSlot`] that decodes one cell.

use std::fmt;

use chrono::NaiveDateTime;
use thiserror::Error;

use super::materialize::Value;
use crate::utils::time::{format_timestamp, parse_clickhouse_datetime};

/// Decoding strategy for one result column
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Temporal,
    UInt64,
    Float64,
    Text,
    /// Any type without a dedicated decoder; cells pass through as-is
    Opaque,
}

impl ColumnKind {
    /// Map a store-reported type name to its kind. Unknown names are `Opaque`.
    pub fn resolve(type_name: &str) -> Self {
        let t = type_name.trim();
        match t {
            "Date" | "Date32" | "DateTime" => Self::Temporal,
            "UInt64" => Self::UInt64,
            "Float64" => Self::Float64,
            "String" | "LowCardinality(String)" => Self::Text,
            _ if t.starts_with("DateTime(") || t.starts_with("DateTime64(") => Self::Temporal,
            _ if t.starts_with("FixedString(") || t.starts_with("LowCardinality(FixedString(") => {
                Self::Text
            }
            _ => Self::Opaque,
        }
    }

    /// Fresh, empty slot for one cell of this kind
    pub fn allocate(&self) -> ScanSlot {
        match self {
            Self::Temporal => ScanSlot::Temporal(None),
            Self::UInt64 => ScanSlot::UInt64(None),
            Self::Float64 => ScanSlot::Float64(None),
            Self::Text => ScanSlot::Text(None),
            Self::Opaque => ScanSlot::Opaque(serde_json::Value::Null),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Temporal => "temporal",
            Self::UInt64 => "uint64",
            Self::Float64 => "float64",
            Self::Text => "text",
            Self::Opaque => "opaque",
        }
    }
}

impl fmt::Display for ColumnKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Typed destination for a single cell. `None` means SQL NULL.
#[derive(Debug, Clone, PartialEq)]
pub enum ScanSlot {
    Temporal(Option<NaiveDateTime>),
    UInt64(Option<u64>),
    Float64(Option<f64>),
    Text(Option<String>),
    Opaque(serde_json::Value),
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum DecodeError {
    /// The cell does not fit the slot; the cell is handed back untouched
    #[error("expected {expected} cell, got {cell}")]
    Mismatch {
        expected: ColumnKind,
        cell: serde_json::Value,
    },

    #[error("row has {actual} cells but {expected} columns were reported")]
    Arity { expected: usize, actual: usize },

    #[error("column {column}: expected {expected}")]
    Shape {
        column: String,
        expected: &'static str,
    },
}

impl ScanSlot {
    pub fn kind(&self) -> ColumnKind {
        match self {
            Self::Temporal(_) => ColumnKind::Temporal,
            Self::UInt64(_) => ColumnKind::UInt64,
            Self::Float64(_) => ColumnKind::Float64,
            Self::Text(_) => ColumnKind::Text,
            Self::Opaque(_) => ColumnKind::Opaque,
        }
    }

    /// Decode `cell` into this slot.
    ///
    /// 64-bit integers arrive either as JSON numbers or as quoted strings,
    /// and both are accepted. On mismatch the slot is left empty.
    pub fn scan(&mut self, cell: serde_json::Value) -> Result<(), DecodeError> {
        use serde_json::Value as Json;

        if cell.is_null() {
            if let Self::Opaque(v) = self {
                *v = Json::Null;
            }
            return Ok(());
        }

        let expected = self.kind();
        let mismatch = |cell| DecodeError::Mismatch { expected, cell };

        match self {
            Self::Temporal(slot) => match cell.as_str().and_then(parse_clickhouse_datetime) {
                Some(dt) => *slot = Some(dt),
                None => return Err(mismatch(cell)),
            },
            Self::UInt64(slot) => {
                let parsed = match &cell {
                    Json::Number(n) => n.as_u64(),
                    Json::String(s) => s.parse::<u64>().ok(),
                    _ => None,
                };
                match parsed {
                    Some(v) => *slot = Some(v),
                    None => return Err(mismatch(cell)),
                }
            }
            Self::Float64(slot) => {
                let parsed = match &cell {
                    Json::Number(n) => n.as_f64(),
                    // nan/inf are rendered as strings
                    Json::String(s) => s.parse::<f64>().ok(),
                    _ => None,
                };
                match parsed {
                    Some(v) => *slot = Some(v),
                    None => return Err(mismatch(cell)),
                }
            }
            Self::Text(slot) => match cell {
                Json::String(s) => *slot = Some(s),
                other => return Err(mismatch(other)),
            },
            Self::Opaque(v) => *v = cell,
        }
        Ok(())
    }

    /// Converts the decoded cell into a record value.
    ///
    /// Opaque scalars map onto the matching [`Value`] variant, so a record
    /// parsed back from its JSON form compares equal. Only arrays and objects
    /// stay [`Value::Opaque`].
    pub fn into_value(self) -> Value {
        match self {
            Self::Temporal(v) => v
                .map(|dt| Value::Text(format_timestamp(&dt)))
                .unwrap_or(Value::Null),
            Self::UInt64(v) => v.map(Value::UInt).unwrap_or(Value::Null),
            Self::Float64(v) => v.map(Value::Float).unwrap_or(Value::Null),
            Self::Text(v) => v.map(Value::Text).unwrap_or(Value::Null),
            Self::Opaque(raw) => Value::from(raw),
        }
    }
}
