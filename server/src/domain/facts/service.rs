//! Query execution against the injected fact store

use std::sync::Arc;
use std::time::{Duration, Instant};

use thiserror::Error;
use tokio_util::sync::CancellationToken;

use super::builder::{build_aggregate_query, build_raw_query, build_timeseries_query};
use super::dispatch::DecodeError;
use super::materialize::{column_kinds, materialize, scan_row};
use super::request::{
    QueryRequest, RawQueryParams, TimeseriesRequest, ValidationError, validate,
    validate_timeseries,
};
use super::rows::{AggregateResult, FactRow, TimeseriesPoint};
use crate::data::{BuiltQuery, FactStore, ResultSet, StoreError};

#[derive(Error, Debug)]
pub enum FactsError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Store(#[from] StoreError),

    /// The store returned rows that do not match the query's shape
    #[error("{0}")]
    Decode(#[from] DecodeError),
}

/// Validates requests, builds their SQL and materializes the results.
///
/// Holds no per-request state and is shared by all handlers.
pub struct FactsService {
    store: Arc<dyn FactStore>,
    query_timeout: Duration,
}

impl FactsService {
    pub fn new(store: Arc<dyn FactStore>, query_timeout: Duration) -> Self {
        Self {
            store,
            query_timeout,
        }
    }

    /// Raw fact rows, newest first
    pub async fn list_facts(
        &self,
        params: RawQueryParams,
        cancel: &CancellationToken,
    ) -> Result<Vec<FactRow>, FactsError> {
        let query = build_raw_query(&params);
        let result = self.execute(&query, "raw", cancel).await?;

        let kinds = column_kinds(&result);
        result
            .rows
            .into_iter()
            .map(|cells| -> Result<FactRow, FactsError> {
                Ok(FactRow::from_slots(scan_row(&kinds, cells)?)?)
            })
            .collect()
    }

    /// Grouped aggregate over the validated request
    pub async fn aggregate(
        &self,
        request: QueryRequest,
        cancel: &CancellationToken,
    ) -> Result<Vec<AggregateResult>, FactsError> {
        let validated = validate(request)?;
        let query = build_aggregate_query(&validated);
        let result = self.execute(&query, "aggregate", cancel).await?;

        let group_count = validated.group_by().len();
        materialize(result)?
            .into_iter()
            .map(|record| -> Result<AggregateResult, FactsError> {
                Ok(AggregateResult::from_record(record, group_count)?)
            })
            .collect()
    }

    /// One value per time bucket
    pub async fn timeseries(
        &self,
        request: TimeseriesRequest,
        cancel: &CancellationToken,
    ) -> Result<Vec<TimeseriesPoint>, FactsError> {
        let params = validate_timeseries(request)?;
        let query = build_timeseries_query(&params);
        let result = self.execute(&query, "timeseries", cancel).await?;

        let kinds = column_kinds(&result);
        result
            .rows
            .into_iter()
            .map(|cells| -> Result<TimeseriesPoint, FactsError> {
                Ok(TimeseriesPoint::from_slots(scan_row(&kinds, cells)?)?)
            })
            .collect()
    }

    /// Ping the store
    pub async fn health(&self) -> Result<(), StoreError> {
        self.store.ping().await
    }

    pub fn backend_name(&self) -> &'static str {
        self.store.backend_name()
    }

    /// Run a query, giving up on cancellation or when the deadline passes.
    ///
    /// Giving up drops the store future, which closes the response stream
    /// and stops the query on the server. No partial rows are returned.
    async fn execute(
        &self,
        query: &BuiltQuery,
        shape: &'static str,
        cancel: &CancellationToken,
    ) -> Result<ResultSet, StoreError> {
        let started = Instant::now();
        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(StoreError::Cancelled),
            res = tokio::time::timeout(self.query_timeout, self.store.query(query)) => {
                res.unwrap_or_else(|_| Err(StoreError::timeout(self.query_timeout.as_secs())))
            }
        };

        match &result {
            Ok(rows) => tracing::debug!(
                shape,
                rows = rows.rows.len(),
                elapsed_ms = started.elapsed().as_millis() as u64,
                "Query executed"
            ),
            Err(e) if e.is_cancellation() => tracing::info!(shape, error = %e, "Query abandoned"),
            Err(e) => tracing::error!(
                shape,
                backend = self.store.backend_name(),
                args = query.args.len(),
                error = %e,
                "Query failed"
            ),
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::QueryArg;
    use crate::data::testing::FakeStore;
    use serde_json::json;

    fn service(store: Arc<FakeStore>) -> FactsService {
        FactsService::new(store, Duration::from_secs(5))
    }

    #[tokio::test]
    async fn test_aggregate_example() {
        let store = Arc::new(FakeStore::with_result(
            &[
                ("event_type", "LowCardinality(String)"),
                ("sum", "Float64"),
                ("count", "UInt64"),
            ],
            vec![
                vec![json!("click"), json!(12.5), json!("3")],
                vec![json!("view"), json!(4.0), json!("1")],
            ],
        ));
        let request: QueryRequest = serde_json::from_value(json!({
            "date_from": "2024-01-01",
            "date_to": "2024-01-31",
            "group_by": ["event_type"],
            "metrics": ["sum", "count"]
        }))
        .unwrap();

        let results = service(store.clone())
            .aggregate(request, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(
            serde_json::to_value(&results).unwrap(),
            json!([
                {"event_type": "click", "sum": 12.5, "count": 3},
                {"event_type": "view", "sum": 4.0, "count": 1}
            ])
        );
        let query = store.last_query().unwrap();
        assert!(query.sql.contains("GROUP BY event_type ORDER BY sum DESC LIMIT 100"));
        assert_eq!(query.args[0], QueryArg::Text("2024-01-01".to_string()));
    }

    #[tokio::test]
    async fn test_invalid_request_never_reaches_store() {
        let store = Arc::new(FakeStore::empty());
        let svc = service(store.clone());
        let request = QueryRequest {
            group_by: vec!["region".to_string()],
            ..Default::default()
        };
        let err = svc
            .aggregate(request, &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, FactsError::Validation(ValidationError::InvalidGroupBy(_))));

        let err = svc
            .timeseries(TimeseriesRequest::default(), &CancellationToken::new())
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "date_from and date_to required");
        assert_eq!(store.calls(), 0);
    }

    #[tokio::test]
    async fn test_list_facts_decodes_rows() {
        let store = Arc::new(FakeStore::with_result(
            &[
                ("event_date", "Date"),
                ("event_time", "DateTime"),
                ("user_id", "UInt64"),
                ("session_id", "String"),
                ("event_type", "LowCardinality(String)"),
                ("metric_name", "LowCardinality(String)"),
                ("metric_value", "Float64"),
            ],
            vec![vec![
                json!("2024-01-02"),
                json!("2024-01-02 08:00:00"),
                json!("9"),
                json!("abc"),
                json!("view"),
                json!("latency"),
                json!(250.0),
            ]],
        ));
        let params = RawQueryParams {
            date_from: None,
            date_to: None,
            event_type: None,
            user_id: Some(9),
            limit: 100,
            offset: 0,
        };
        let rows = service(store.clone())
            .list_facts(params, &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].event_time, "2024-01-02T08:00:00Z");
        assert_eq!(rows[0].user_id, 9);
        assert_eq!(store.last_query().unwrap().args, vec![QueryArg::UInt(9)]);
    }

    #[tokio::test]
    async fn test_timeseries_points() {
        let store = Arc::new(FakeStore::with_result(
            &[("period", "Date"), ("value", "Float64")],
            vec![
                vec![json!("2024-01-01"), json!(1.0)],
                vec![json!("2024-01-02"), json!(2.5)],
            ],
        ));
        let request = TimeseriesRequest {
            date_from: Some("2024-01-01".to_string()),
            date_to: Some("2024-01-02".to_string()),
            ..Default::default()
        };
        let points = service(store)
            .timeseries(request, &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(points.len(), 2);
        assert_eq!(points[1].period, "2024-01-02T00:00:00");
        assert_eq!(points[1].value, 2.5);
    }

    #[tokio::test]
    async fn test_store_failure_surfaces_message() {
        let store = Arc::new(FakeStore::failing("connection refused"));
        let svc = service(store);
        let err = svc
            .aggregate(QueryRequest::default(), &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, FactsError::Store(StoreError::Connection(_))));
        assert!(err.to_string().contains("connection refused"));
        assert!(svc.health().await.is_err());
    }

    #[tokio::test]
    async fn test_arity_mismatch_is_decode_error() {
        let store = Arc::new(FakeStore::with_result(
            &[("sum", "Float64"), ("count", "UInt64")],
            vec![vec![json!(1.0)]],
        ));
        let err = service(store)
            .aggregate(QueryRequest::default(), &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, FactsError::Decode(DecodeError::Arity { .. })));
    }

    #[tokio::test]
    async fn test_cancellation_stops_query() {
        let store = Arc::new(FakeStore::empty().slow(Duration::from_secs(30)));
        let svc = service(store.clone());
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            trigger.cancel();
        });

        let started = Instant::now();
        let err = svc
            .aggregate(QueryRequest::default(), &cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, FactsError::Store(StoreError::Cancelled)));
        assert!(started.elapsed() < Duration::from_secs(5));
        assert_eq!(store.calls(), 1);
    }

    #[tokio::test]
    async fn test_query_timeout() {
        let store = Arc::new(FakeStore::empty().slow(Duration::from_secs(30)));
        let svc = FactsService::new(store, Duration::from_millis(20));
        let err = svc
            .aggregate(QueryRequest::default(), &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, FactsError::Store(StoreError::Timeout { .. })));
    }

    #[tokio::test]
    async fn test_health_and_backend() {
        let svc = service(Arc::new(FakeStore::empty()));
        assert!(svc.health().await.is_ok());
        assert_eq!(svc.backend_name(), "fake");
    }
}
