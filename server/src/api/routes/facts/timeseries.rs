//! Time-bucketed series

use axum::Json;
use axum::extract::State;

use super::FactsApiState;
use crate::api::extractors::QueryParams;
use crate::api::types::{ApiError, ApiResponse, ErrorBody};
use crate::domain::facts::{TimeseriesPoint, TimeseriesRequest};

/// One aggregated value per time bucket
///
/// Unknown `metric` values fall back to `sum` and unknown `granularity`
/// values to daily buckets.
#[utoipa::path(
    get,
    path = "/api/facts/timeseries",
    tag = "facts",
    params(
        ("date_from" = String, Query, description = "Inclusive start date (YYYY-MM-DD)"),
        ("date_to" = String, Query, description = "Inclusive end date (YYYY-MM-DD)"),
        ("event_type" = Option<String>, Query, description = "Filter by event type"),
        ("metric" = Option<String>, Query, description = "sum, avg, count or uniq"),
        ("granularity" = Option<String>, Query, description = "hour, day, week or month")
    ),
    responses(
        (status = 200, description = "Series points", body = ApiResponse<TimeseriesPoint>),
        (status = 400, description = "Missing date range", body = ErrorBody),
        (status = 500, description = "Store failure", body = ErrorBody)
    )
)]
pub async fn facts_timeseries(
    State(state): State<FactsApiState>,
    QueryParams(query): QueryParams<TimeseriesRequest>,
) -> Result<Json<ApiResponse<TimeseriesPoint>>, ApiError> {
    let cancel = state.request_token();
    let _guard = cancel.clone().drop_guard();

    let points = state.facts.timeseries(query, &cancel).await?;
    Ok(Json(ApiResponse::new(points)))
}
