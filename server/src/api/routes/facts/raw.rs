//! Raw fact rows

use axum::Json;
use axum::extract::State;

use super::FactsApiState;
use crate::api::extractors::QueryParams;
use crate::api::types::{ApiError, ApiResponse, ErrorBody};
use crate::domain::facts::request::normalize_raw;
use crate::domain::facts::{FactRow, RawQueryRequest};

/// List raw facts, newest first
#[utoipa::path(
    get,
    path = "/api/facts",
    tag = "facts",
    params(
        ("date_from" = Option<String>, Query, description = "Inclusive start date (YYYY-MM-DD)"),
        ("date_to" = Option<String>, Query, description = "Inclusive end date (YYYY-MM-DD)"),
        ("event_type" = Option<String>, Query, description = "Filter by event type"),
        ("user_id" = Option<String>, Query, description = "Filter by user ID; ignored if not numeric"),
        ("limit" = Option<String>, Query, description = "Max rows, 1-10000 (default 100)"),
        ("offset" = Option<String>, Query, description = "Rows to skip")
    ),
    responses(
        (status = 200, description = "Fact rows", body = ApiResponse<FactRow>),
        (status = 500, description = "Store failure", body = ErrorBody),
        (status = 503, description = "Server shutting down", body = ErrorBody)
    )
)]
pub async fn list_facts(
    State(state): State<FactsApiState>,
    QueryParams(query): QueryParams<RawQueryRequest>,
) -> Result<Json<ApiResponse<FactRow>>, ApiError> {
    let cancel = state.request_token();
    let _guard = cancel.clone().drop_guard();

    let rows = state.facts.list_facts(normalize_raw(query), &cancel).await?;
    Ok(Json(ApiResponse::new(rows)))
}
