//! Parameterized SQL for the three query shapes
//!
//! # SQL Injection Safety
//! Every client-supplied value is emitted as a `?` placeholder with a matching
//! [`QueryArg`]. Column names and aggregate expressions come only from the
//! closed enums in [`super::request`] and the fixed tables below. Limits and
//! offsets are already clamped integers and are written as literals.

use super::request::{RawQueryParams, TimeseriesParams, ValidatedRequest};
use crate::data::types::{BuiltQuery, QueryArg};

pub const FACTS_TABLE: &str = "facts";

/// Columns returned by the raw fetch, in output order
pub const FACT_COLUMNS: [&str; 7] = [
    "event_date",
    "event_time",
    "user_id",
    "session_id",
    "event_type",
    "metric_name",
    "metric_value",
];

/// Collects WHERE conditions and their arguments in placeholder order
#[derive(Default)]
struct ConditionBuilder {
    conditions: Vec<String>,
    args: Vec<QueryArg>,
}

impl ConditionBuilder {
    fn new() -> Self {
        Self::default()
    }

    /// `column >= ?`
    fn add_gte(&mut self, column: &str, value: &str) {
        self.conditions.push(format!("{} >= ?", column));
        self.args.push(QueryArg::Text(value.to_string()));
    }

    /// `column <= ?`
    fn add_lte(&mut self, column: &str, value: &str) {
        self.conditions.push(format!("{} <= ?", column));
        self.args.push(QueryArg::Text(value.to_string()));
    }

    /// `column = ?`
    fn add_eq(&mut self, column: &str, arg: QueryArg) {
        self.conditions.push(format!("{} = ?", column));
        self.args.push(arg);
    }

    /// `column IN (?, ?, ...)`; no-op for an empty list
    fn add_in(&mut self, column: &str, values: impl IntoIterator<Item = QueryArg>) {
        let before = self.args.len();
        self.args.extend(values);
        let count = self.args.len() - before;
        if count == 0 {
            return;
        }
        let placeholders = vec!["?"; count].join(", ");
        self.conditions
            .push(format!("{} IN ({})", column, placeholders));
    }

    fn add_date_range(&mut self, date_from: Option<&str>, date_to: Option<&str>) {
        if let Some(from) = date_from {
            self.add_gte("event_date", from);
        }
        if let Some(to) = date_to {
            self.add_lte("event_date", to);
        }
    }

    /// ` WHERE ...` including the leading space, or empty
    fn where_clause(&self) -> String {
        if self.conditions.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", self.conditions.join(" AND "))
        }
    }

    fn finish(self, sql: String) -> BuiltQuery {
        BuiltQuery {
            sql,
            args: self.args,
        }
    }
}

/// Raw fact rows, newest first
pub fn build_raw_query(params: &RawQueryParams) -> BuiltQuery {
    let mut cb = ConditionBuilder::new();
    cb.add_date_range(params.date_from.as_deref(), params.date_to.as_deref());
    if let Some(ref event_type) = params.event_type {
        cb.add_eq("event_type", QueryArg::Text(event_type.clone()));
    }
    if let Some(user_id) = params.user_id {
        cb.add_eq("user_id", QueryArg::UInt(user_id));
    }

    let sql = format!(
        "SELECT {} FROM {}{} ORDER BY event_time DESC LIMIT {} OFFSET {}",
        FACT_COLUMNS.join(", "),
        FACTS_TABLE,
        cb.where_clause(),
        params.limit,
        params.offset
    );
    cb.finish(sql)
}

/// Grouped aggregate, ordered by the first metric descending
pub fn build_aggregate_query(request: &ValidatedRequest) -> BuiltQuery {
    debug_assert!(!request.metrics.is_empty(), "validated request without metrics");

    let select: Vec<String> = request
        .group_by
        .iter()
        .map(|col| col.as_str().to_string())
        .chain(
            request
                .metrics
                .iter()
                .map(|m| format!("{} AS {}", m.expression(), m.as_str())),
        )
        .collect();

    let mut cb = ConditionBuilder::new();
    cb.add_date_range(request.date_from.as_deref(), request.date_to.as_deref());
    cb.add_in(
        "event_type",
        request.event_types.iter().cloned().map(QueryArg::Text),
    );
    cb.add_in("user_id", request.user_ids.iter().copied().map(QueryArg::UInt));

    let mut sql = format!(
        "SELECT {} FROM {}{}",
        select.join(", "),
        FACTS_TABLE,
        cb.where_clause()
    );
    if !request.group_by.is_empty() {
        let cols: Vec<&str> = request.group_by.iter().map(|c| c.as_str()).collect();
        sql.push_str(&format!(" GROUP BY {}", cols.join(", ")));
    }
    if let Some(first) = request.metrics.first() {
        sql.push_str(&format!(" ORDER BY {} DESC", first.as_str()));
    }
    sql.push_str(&format!(" LIMIT {}", request.limit));
    if request.offset > 0 {
        sql.push_str(&format!(" OFFSET {}", request.offset));
    }
    cb.finish(sql)
}

/// Aggregate expression for a time-series `metric` parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TimeseriesMetric {
    Sum,
    Avg,
    Count,
    Uniq,
}

impl TimeseriesMetric {
    /// Unknown names (and `min`/`max`) fall back to `sum`
    fn resolve(name: Option<&str>) -> Self {
        match name {
            Some("avg") => Self::Avg,
            Some("count") => Self::Count,
            Some("uniq") => Self::Uniq,
            _ => Self::Sum,
        }
    }

    fn expression(&self) -> &'static str {
        match self {
            Self::Sum => "sum(metric_value)",
            Self::Avg => "avg(metric_value)",
            Self::Count => "count()",
            Self::Uniq => "uniq(user_id)",
        }
    }
}

/// Time bucket for a time-series `granularity` parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Granularity {
    Day,
    Hour,
    Week,
    Month,
}

impl Granularity {
    /// Unknown names fall back to daily buckets
    fn resolve(name: Option<&str>) -> Self {
        match name {
            Some("hour") => Self::Hour,
            Some("week") => Self::Week,
            Some("month") => Self::Month,
            _ => Self::Day,
        }
    }

    fn bucket(&self) -> &'static str {
        match self {
            Self::Day => "event_date",
            Self::Hour => "toStartOfHour(event_time)",
            Self::Week => "toMonday(event_date)",
            Self::Month => "toStartOfMonth(event_date)",
        }
    }
}

/// One aggregated value per time bucket, oldest first
pub fn build_timeseries_query(params: &TimeseriesParams) -> BuiltQuery {
    let metric = TimeseriesMetric::resolve(params.metric.as_deref());
    let granularity = Granularity::resolve(params.granularity.as_deref());

    let mut cb = ConditionBuilder::new();
    cb.add_gte("event_date", &params.date_from);
    cb.add_lte("event_date", &params.date_to);
    if let Some(ref event_type) = params.event_type {
        cb.add_eq("event_type", QueryArg::Text(event_type.clone()));
    }

    let sql = format!(
        "SELECT {} AS period, {} AS value FROM {}{} GROUP BY period ORDER BY period",
        granularity.bucket(),
        metric.expression(),
        FACTS_TABLE,
        cb.where_clause()
    );
    cb.finish(sql)
}
