//! Client requests and their validation
//!
//! Group-by columns and metric names end up as SQL identifiers, so they are
//! only accepted from fixed whitelists and carried onward as closed enums.
//! Everything else a client sends is bound as a query argument.

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer};
use thiserror::Error;
use utoipa::ToSchema;

use crate::core::constants::{DEFAULT_QUERY_LIMIT, MAX_QUERY_LIMIT};

/// Columns a grouped aggregate may group by
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupColumn {
    EventDate,
    EventType,
    MetricName,
    UserId,
    SessionId,
}

impl GroupColumn {
    pub const ALL: [GroupColumn; 5] = [
        Self::EventDate,
        Self::EventType,
        Self::MetricName,
        Self::UserId,
        Self::SessionId,
    ];

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.as_str() == s)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::EventDate => "event_date",
            Self::EventType => "event_type",
            Self::MetricName => "metric_name",
            Self::UserId => "user_id",
            Self::SessionId => "session_id",
        }
    }
}

/// Aggregate metrics; the name doubles as the output column alias
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Metric {
    Sum,
    Avg,
    Count,
    Min,
    Max,
    /// Distinct user count
    Uniq,
}

impl Metric {
    pub const ALL: [Metric; 6] = [
        Self::Sum,
        Self::Avg,
        Self::Count,
        Self::Min,
        Self::Max,
        Self::Uniq,
    ];

    /// Substituted when a request names no metrics
    pub const DEFAULT: [Metric; 2] = [Self::Sum, Self::Count];

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|m| m.as_str() == s)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sum => "sum",
            Self::Avg => "avg",
            Self::Count => "count",
            Self::Min => "min",
            Self::Max => "max",
            Self::Uniq => "uniq",
        }
    }

    pub fn expression(&self) -> &'static str {
        match self {
            Self::Sum => "sum(metric_value)",
            Self::Avg => "avg(metric_value)",
            Self::Count => "count()",
            Self::Min => "min(metric_value)",
            Self::Max => "max(metric_value)",
            Self::Uniq => "uniq(user_id)",
        }
    }
}

/// Deserialize an explicit `null` the same as an absent field
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Body of `POST /api/facts/aggregate`
///
/// Every field may be omitted or `null`.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(default)]
pub struct QueryRequest {
    /// Inclusive start date, e.g. `2024-01-01`
    #[serde(deserialize_with = "null_as_default")]
    pub date_from: String,
    /// Inclusive end date, e.g. `2024-01-31`
    #[serde(deserialize_with = "null_as_default")]
    pub date_to: String,
    #[serde(deserialize_with = "null_as_default")]
    pub event_types: Vec<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub user_ids: Vec<u64>,
    #[serde(deserialize_with = "null_as_default")]
    pub group_by: Vec<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub metrics: Vec<String>,
    /// Dimension filters. Accepted but not applied to the query.
    #[serde(deserialize_with = "null_as_default")]
    pub filters: BTreeMap<String, String>,
    #[serde(deserialize_with = "null_as_default")]
    pub limit: i64,
    #[serde(deserialize_with = "null_as_default")]
    pub offset: i64,
}

/// A [`QueryRequest`] that passed validation, with defaults applied.
///
/// Only [`validate`] constructs one, so `metrics` is never empty.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedRequest {
    pub(crate) date_from: Option<String>,
    pub(crate) date_to: Option<String>,
    pub(crate) event_types: Vec<String>,
    pub(crate) user_ids: Vec<u64>,
    pub(crate) group_by: Vec<GroupColumn>,
    pub(crate) metrics: Vec<Metric>,
    pub(crate) limit: u64,
    pub(crate) offset: u64,
}

impl ValidatedRequest {
    pub fn group_by(&self) -> &[GroupColumn] {
        &self.group_by
    }

    pub fn metrics(&self) -> &[Metric] {
        &self.metrics
    }

    pub fn limit(&self) -> u64 {
        self.limit
    }
}

/// Query string of `GET /api/facts`. Values stay raw until [`normalize_raw`].
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawQueryRequest {
    pub date_from: Option<String>,
    pub date_to: Option<String>,
    pub event_type: Option<String>,
    pub user_id: Option<String>,
    pub limit: Option<String>,
    pub offset: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawQueryParams {
    pub date_from: Option<String>,
    pub date_to: Option<String>,
    pub event_type: Option<String>,
    pub user_id: Option<u64>,
    pub limit: u64,
    pub offset: u64,
}

/// Query string of `GET /api/facts/timeseries`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TimeseriesRequest {
    pub date_from: Option<String>,
    pub date_to: Option<String>,
    pub event_type: Option<String>,
    pub metric: Option<String>,
    pub granularity: Option<String>,
}

/// Time-series parameters with the required date range present.
///
/// `metric` and `granularity` stay as sent; the builder resolves them with
/// silent fallbacks rather than rejecting unknown values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeseriesParams {
    pub date_from: String,
    pub date_to: String,
    pub event_type: Option<String>,
    pub metric: Option<String>,
    pub granularity: Option<String>,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("invalid group_by column: {0}")]
    InvalidGroupBy(String),

    #[error("invalid metric: {0}")]
    InvalidMetric(String),

    #[error("date_from and date_to required")]
    MissingDateRange,
}

impl ValidationError {
    /// Machine-readable code for API responses
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidGroupBy(_) => "INVALID_GROUP_BY",
            Self::InvalidMetric(_) => "INVALID_METRIC",
            Self::MissingDateRange => "MISSING_DATE_RANGE",
        }
    }

    /// The offending token, when there is one
    pub fn value(&self) -> Option<&str> {
        match self {
            Self::InvalidGroupBy(v) | Self::InvalidMetric(v) => Some(v),
            Self::MissingDateRange => None,
        }
    }
}

/// Clamp a client limit into `(0, MAX_QUERY_LIMIT]`, defaulting when out of range
pub fn clamp_limit(limit: i64) -> u64 {
    if limit <= 0 || limit > MAX_QUERY_LIMIT as i64 {
        DEFAULT_QUERY_LIMIT
    } else {
        limit as u64
    }
}

fn non_empty(s: Option<String>) -> Option<String> {
    s.filter(|v| !v.is_empty())
}

/// Validate an aggregate request.
///
/// Group-by columns are checked before metrics, and within each list the
/// first invalid token in request order is the one reported.
pub fn validate(request: QueryRequest) -> Result<ValidatedRequest, ValidationError> {
    let group_by = request
        .group_by
        .iter()
        .map(|col| GroupColumn::parse(col).ok_or_else(|| ValidationError::InvalidGroupBy(col.clone())))
        .collect::<Result<Vec<_>, _>>()?;

    let metrics = if request.metrics.is_empty() {
        Metric::DEFAULT.to_vec()
    } else {
        request
            .metrics
            .iter()
            .map(|m| Metric::parse(m).ok_or_else(|| ValidationError::InvalidMetric(m.clone())))
            .collect::<Result<Vec<_>, _>>()?
    };

    if !request.filters.is_empty() {
        tracing::debug!(
            filters = request.filters.len(),
            "Dimension filters accepted but not applied"
        );
    }

    Ok(ValidatedRequest {
        date_from: non_empty(Some(request.date_from)),
        date_to: non_empty(Some(request.date_to)),
        event_types: request.event_types,
        user_ids: request.user_ids,
        group_by,
        metrics,
        limit: clamp_limit(request.limit),
        offset: request.offset.max(0) as u64,
    })
}

/// Normalize raw-fetch query parameters.
///
/// Unparseable `limit`/`offset` count as 0 (so the limit falls back to the
/// default) and an unparseable `user_id` drops that filter.
pub fn normalize_raw(request: RawQueryRequest) -> RawQueryParams {
    let limit = request
        .limit
        .as_deref()
        .and_then(|s| s.trim().parse::<i64>().ok())
        .unwrap_or(0);
    let offset = request
        .offset
        .as_deref()
        .and_then(|s| s.trim().parse::<u64>().ok())
        .unwrap_or(0);

    let user_id = match non_empty(request.user_id) {
        Some(raw) => match raw.trim().parse::<u64>() {
            Ok(id) => Some(id),
            Err(_) => {
                tracing::debug!(user_id = %raw, "Ignoring unparseable user_id filter");
                None
            }
        },
        None => None,
    };

    RawQueryParams {
        date_from: non_empty(request.date_from),
        date_to: non_empty(request.date_to),
        event_type: non_empty(request.event_type),
        user_id,
        limit: clamp_limit(limit),
        offset,
    }
}

/// Validate a time-series request; the date range is required.
pub fn validate_timeseries(request: TimeseriesRequest) -> Result<TimeseriesParams, ValidationError> {
    let (Some(date_from), Some(date_to)) =
        (non_empty(request.date_from), non_empty(request.date_to))
    else {
        return Err(ValidationError::MissingDateRange);
    };

    Ok(TimeseriesParams {
        date_from,
        date_to,
        event_type: non_empty(request.event_type),
        metric: non_empty(request.metric),
        granularity: non_empty(request.granularity),
    })
}
