//! Fixed-shape rows decoded from scan slots
//!
//! The raw and time-series queries have a known select list, so their rows
//! are decoded positionally into concrete structs. Aggregate rows keep the
//! generic record form, split into group and metric parts.

use std::collections::BTreeMap;

use serde::Serialize;
use serde::ser::SerializeMap;
use utoipa::ToSchema;

use super::builder::FACT_COLUMNS;
use super::dispatch::{DecodeError, ScanSlot};
use super::materialize::{MaterializedRecord, Value};
use crate::utils::time::{format_date, format_rfc3339_utc, format_timestamp};

fn shape(column: &str, expected: &'static str) -> DecodeError {
    DecodeError::Shape {
        column: column.to_string(),
        expected,
    }
}

fn take_text(column: &str, slot: ScanSlot) -> Result<String, DecodeError> {
    match slot {
        ScanSlot::Text(Some(s)) => Ok(s),
        ScanSlot::Text(None) => Ok(String::new()),
        _ => Err(shape(column, "text")),
    }
}

fn take_u64(column: &str, slot: ScanSlot) -> Result<u64, DecodeError> {
    match slot {
        ScanSlot::UInt64(Some(v)) => Ok(v),
        _ => Err(shape(column, "uint64")),
    }
}

fn take_f64(column: &str, slot: ScanSlot) -> Result<f64, DecodeError> {
    match slot {
        ScanSlot::Float64(Some(v)) => Ok(v),
        ScanSlot::UInt64(Some(v)) => Ok(v as f64),
        ScanSlot::Float64(None) | ScanSlot::UInt64(None) => Ok(0.0),
        _ => Err(shape(column, "numeric")),
    }
}

fn take_temporal(column: &str, slot: ScanSlot) -> Result<chrono::NaiveDateTime, DecodeError> {
    match slot {
        ScanSlot::Temporal(Some(dt)) => Ok(dt),
        _ => Err(shape(column, "temporal")),
    }
}

fn check_arity(slots: &[ScanSlot], expected: usize) -> Result<(), DecodeError> {
    if slots.len() == expected {
        Ok(())
    } else {
        Err(DecodeError::Arity {
            expected,
            actual: slots.len(),
        })
    }
}

/// One stored fact as returned by `GET /api/facts`
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct FactRow {
    /// `YYYY-MM-DD`
    pub event_date: String,
    /// RFC 3339, UTC
    pub event_time: String,
    pub user_id: u64,
    pub session_id: String,
    pub event_type: String,
    pub metric_name: String,
    pub metric_value: f64,
    /// Always `null`; the table has no dimension columns
    pub dimensions: Option<BTreeMap<String, String>>,
}

impl FactRow {
    /// Decode slots scanned in [`FACT_COLUMNS`] order
    pub fn from_slots(slots: Vec<ScanSlot>) -> Result<Self, DecodeError> {
        check_arity(&slots, FACT_COLUMNS.len())?;
        let [
            event_date,
            event_time,
            user_id,
            session_id,
            event_type,
            metric_name,
            metric_value,
        ]: [ScanSlot; 7] = slots
            .try_into()
            .map_err(|_| shape("row", "7 columns"))?;

        Ok(Self {
            event_date: format_date(&take_temporal(FACT_COLUMNS[0], event_date)?),
            event_time: format_rfc3339_utc(&take_temporal(FACT_COLUMNS[1], event_time)?),
            user_id: take_u64(FACT_COLUMNS[2], user_id)?,
            session_id: take_text(FACT_COLUMNS[3], session_id)?,
            event_type: take_text(FACT_COLUMNS[4], event_type)?,
            metric_name: take_text(FACT_COLUMNS[5], metric_name)?,
            metric_value: take_f64(FACT_COLUMNS[6], metric_value)?,
            dimensions: None,
        })
    }
}

/// One bucket of a time series
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct TimeseriesPoint {
    /// Bucket start, `YYYY-MM-DDTHH:MM:SS`
    pub period: String,
    pub value: f64,
}

impl TimeseriesPoint {
    /// Decode `[period, value]`; `value` may be Float64 or UInt64
    pub fn from_slots(slots: Vec<ScanSlot>) -> Result<Self, DecodeError> {
        check_arity(&slots, 2)?;
        let [period, value]: [ScanSlot; 2] = slots
            .try_into()
            .map_err(|_| shape("row", "2 columns"))?;

        Ok(Self {
            period: format_timestamp(&take_temporal("period", period)?),
            value: take_f64("value", value)?,
        })
    }
}

/// One grouped aggregate row: group-by values, then metric values.
///
/// Serializes as a single flat object in select-list order.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregateResult {
    pub groups: Vec<(String, Value)>,
    pub values: Vec<(String, Value)>,
}

impl AggregateResult {
    /// The first `group_count` fields of `record` are the group-by columns
    pub fn from_record(record: MaterializedRecord, group_count: usize) -> Result<Self, DecodeError> {
        let mut groups = record.into_fields();
        if group_count > groups.len() {
            return Err(DecodeError::Arity {
                expected: group_count,
                actual: groups.len(),
            });
        }
        let values = groups.split_off(group_count);
        Ok(Self { groups, values })
    }

    pub fn value(&self, metric: &str) -> Option<&Value> {
        self.values.iter().find(|(k, _)| k == metric).map(|(_, v)| v)
    }
}

impl Serialize for AggregateResult {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.groups.len() + self.values.len()))?;
        for (key, value) in self.groups.iter().chain(&self.values) {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}
