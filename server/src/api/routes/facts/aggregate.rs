//! Grouped aggregates

use axum::Json;
use axum::extract::State;

use super::FactsApiState;
use crate::api::extractors::JsonBody;
use crate::api::types::{ApiError, ApiResponse, ErrorBody};
use crate::domain::facts::{AggregateResult, QueryRequest};

/// Aggregate facts grouped by whitelisted columns
///
/// Each row is a flat object: group-by columns in request order, then one
/// field per metric named after it.
#[utoipa::path(
    post,
    path = "/api/facts/aggregate",
    tag = "facts",
    request_body = QueryRequest,
    responses(
        (status = 200, description = "Aggregated rows in `{data, count}`"),
        (status = 400, description = "Invalid body, group_by column or metric", body = ErrorBody),
        (status = 500, description = "Store failure", body = ErrorBody)
    )
)]
pub async fn aggregate_facts(
    State(state): State<FactsApiState>,
    JsonBody(request): JsonBody<QueryRequest>,
) -> Result<Json<ApiResponse<AggregateResult>>, ApiError> {
    let cancel = state.request_token();
    let _guard = cancel.clone().drop_guard();

    let results = state.facts.aggregate(request, &cancel).await?;
    Ok(Json(ApiResponse::new(results)))
}
