//! Result materialization into ordered records
//!
//! A [`MaterializedRecord`] keeps its fields in select-list order, which is
//! also the key order of its JSON object.

use std::fmt;

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::dispatch::{ColumnKind, DecodeError, ScanSlot};
use crate::data::types::ResultSet;

/// A single decoded field value
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    UInt(u64),
    Int(i64),
    Float(f64),
    Text(String),
    /// Cell of a type with no dedicated decoder, carried verbatim
    Opaque(serde_json::Value),
}

impl Value {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::UInt(v) => Some(*v as f64),
            Self::Int(v) => Some(*v as f64),
            Self::Float(v) => Some(*v),
            _ => None,
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Null => serializer.serialize_unit(),
            Self::Bool(b) => serializer.serialize_bool(*b),
            Self::UInt(v) => serializer.serialize_u64(*v),
            Self::Int(v) => serializer.serialize_i64(*v),
            Self::Float(v) => serializer.serialize_f64(*v),
            Self::Text(s) => serializer.serialize_str(s),
            Self::Opaque(raw) => raw.serialize(serializer),
        }
    }
}

impl From<serde_json::Value> for Value {
    fn from(v: serde_json::Value) -> Self {
        match v {
            serde_json::Value::Null => Self::Null,
            serde_json::Value::Bool(b) => Self::Bool(b),
            serde_json::Value::Number(n) => {
                if let Some(u) = n.as_u64() {
                    Self::UInt(u)
                } else if let Some(i) = n.as_i64() {
                    Self::Int(i)
                } else {
                    n.as_f64().map(Self::Float).unwrap_or(Self::Opaque(serde_json::Value::Number(n)))
                }
            }
            serde_json::Value::String(s) => Self::Text(s),
            other => Self::Opaque(other),
        }
    }
}

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        serde_json::Value::deserialize(deserializer).map(Value::from)
    }
}

/// One result row as ordered `(column, value)` pairs
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MaterializedRecord {
    fields: Vec<(String, Value)>,
}

impl MaterializedRecord {
    pub fn new(fields: Vec<(String, Value)>) -> Self {
        Self { fields }
    }

    /// First field with the given name
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.iter().find(|(k, _)| k == name).map(|(_, v)| v)
    }

    pub fn fields(&self) -> &[(String, Value)] {
        &self.fields
    }

    pub fn into_fields(self) -> Vec<(String, Value)> {
        self.fields
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl Serialize for MaterializedRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (key, value) in &self.fields {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

struct RecordVisitor;

impl<'de> Visitor<'de> for RecordVisitor {
    type Value = MaterializedRecord;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a JSON object")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
        let mut fields = Vec::with_capacity(access.size_hint().unwrap_or(0));
        while let Some((key, value)) = access.next_entry::<String, Value>()? {
            fields.push((key, value));
        }
        Ok(MaterializedRecord { fields })
    }
}

impl<'de> Deserialize<'de> for MaterializedRecord {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(RecordVisitor)
    }
}

/// Resolve the decoding kind of every column once for an execution
pub fn column_kinds(result: &ResultSet) -> Vec<ColumnKind> {
    result
        .columns
        .iter()
        .map(|c| ColumnKind::resolve(&c.type_name))
        .collect()
}

/// Scan one row into freshly allocated slots.
///
/// A cell that does not fit its typed slot degrades to an opaque passthrough.
/// A row with the wrong number of cells is an error.
pub fn scan_row(kinds: &[ColumnKind], cells: Vec<serde_json::Value>) -> Result<Vec<ScanSlot>, DecodeError> {
    if cells.len() != kinds.len() {
        return Err(DecodeError::Arity {
            expected: kinds.len(),
            actual: cells.len(),
        });
    }

    let mut slots = Vec::with_capacity(kinds.len());
    for (index, (kind, cell)) in kinds.iter().zip(cells).enumerate() {
        let mut slot = kind.allocate();
        match slot.scan(cell) {
            Ok(()) => slots.push(slot),
            Err(DecodeError::Mismatch { expected, cell }) => {
                tracing::debug!(
                    column = index,
                    expected = %expected,
                    "Cell did not decode, passing through as-is"
                );
                slots.push(ScanSlot::Opaque(cell));
            }
            Err(e) => return Err(e),
        }
    }
    Ok(slots)
}

/// Decode every row of a result set into records, preserving column order
pub fn materialize(result: ResultSet) -> Result<Vec<MaterializedRecord>, DecodeError> {
    let kinds = column_kinds(&result);
    let names: Vec<String> = result.columns.into_iter().map(|c| c.name).collect();

    result
        .rows
        .into_iter()
        .map(|cells| {
            let slots = scan_row(&kinds, cells)?;
            let fields = names
                .iter()
                .cloned()
                .zip(slots.into_iter().map(ScanSlot::into_value))
                .collect();
            Ok(MaterializedRecord { fields })
        })
        .collect()
}
