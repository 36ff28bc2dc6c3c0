//! API server initialization

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::routing::get;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::compression::CompressionLayer;
use tower_http::trace::TraceLayer;

use super::middleware::{self, AllowedOrigins};
use super::openapi::{openapi_json, swagger_ui_html};
use super::routes::facts;
use super::routes::health::{self, HealthState};
use crate::core::CoreApp;
use crate::core::constants::DEFAULT_BODY_LIMIT;
use crate::domain::FactsService;

pub struct ApiServer {
    app: CoreApp,
    allowed_origins: AllowedOrigins,
}

impl ApiServer {
    pub fn new(app: CoreApp) -> Self {
        let allowed_origins = AllowedOrigins::new(&app.config.server.host, app.config.server.port);
        Self {
            app,
            allowed_origins,
        }
    }

    /// Serve until shutdown; returns CoreApp for graceful shutdown
    pub async fn start(self) -> Result<CoreApp> {
        let Self {
            app,
            allowed_origins,
        } = self;

        let shutdown = app.shutdown.clone();
        let host = app.config.server.host.clone();
        let port = app.config.server.port;

        let router = build_router(app.facts.clone(), shutdown.token(), &allowed_origins);

        let listener = TcpListener::bind((host.as_str(), port))
            .await
            .with_context(|| format!("Failed to bind {}:{}", host, port))?;
        tracing::info!(addr = %listener.local_addr()?, "Listening");

        axum::serve(
            listener,
            router.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(shutdown.wait())
        .await?;

        Ok(app)
    }
}

/// Assemble all routes with shared middleware
pub(crate) fn build_router(
    facts: Arc<FactsService>,
    shutdown: CancellationToken,
    allowed_origins: &AllowedOrigins,
) -> Router {
    let health_routes = Router::new()
        .route(
            "/health",
            get(health::health).fallback(middleware::method_not_allowed),
        )
        .with_state(HealthState {
            facts: facts.clone(),
        });

    Router::new()
        .route("/api/openapi.json", get(openapi_json))
        .route("/api/docs", get(swagger_ui_html))
        .merge(health_routes)
        .merge(facts::routes(facts, shutdown))
        .fallback(middleware::handle_404)
        .layer(CompressionLayer::new())
        .layer(middleware::cors(allowed_origins))
        .layer(DefaultBodyLimit::max(DEFAULT_BODY_LIMIT))
        .layer(TraceLayer::new_for_http())
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use axum::body::{Body, to_bytes};
    use axum::http::{Method, Request, StatusCode};
    use serde_json::{Value, json};
    use tower::ServiceExt;

    use super::*;
    use crate::data::QueryArg;
    use crate::data::testing::FakeStore;

    fn router_with(store: Arc<FakeStore>) -> Router {
        let facts = Arc::new(FactsService::new(store, Duration::from_secs(5)));
        build_router(
            facts,
            CancellationToken::new(),
            &AllowedOrigins::new("127.0.0.1", 8080),
        )
    }

    fn aggregate_store() -> Arc<FakeStore> {
        Arc::new(FakeStore::with_result(
            &[
                ("event_type", "LowCardinality(String)"),
                ("sum", "Float64"),
                ("count", "UInt64"),
            ],
            vec![
                vec![json!("click"), json!(12.5), json!("3")],
                vec![json!("view"), json!(4.0), json!("1")],
            ],
        ))
    }

    async fn send(router: Router, method: Method, uri: &str, body: Body) -> (StatusCode, Value) {
        let response = router
            .oneshot(
                Request::builder()
                    .method(method)
                    .uri(uri)
                    .body(body)
                    .unwrap(),
            )
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    #[tokio::test]
    async fn test_aggregate_endpoint() {
        let store = aggregate_store();
        let body = json!({
            "date_from": "2024-01-01",
            "date_to": "2024-01-31",
            "group_by": ["event_type"],
            "metrics": ["sum", "count"]
        });
        let (status, value) = send(
            router_with(store.clone()),
            Method::POST,
            "/api/facts/aggregate",
            Body::from(body.to_string()),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            value,
            json!({
                "data": [
                    {"event_type": "click", "sum": 12.5, "count": 3},
                    {"event_type": "view", "sum": 4.0, "count": 1}
                ],
                "count": 2
            })
        );
        assert_eq!(store.calls(), 1);
    }

    #[tokio::test]
    async fn test_aggregate_preserves_field_order_on_wire() {
        let response = router_with(aggregate_store())
            .oneshot(
                Request::builder()
                    .method(Method::POST)
                    .uri("/api/facts/aggregate")
                    .body(Body::from(r#"{"group_by":["event_type"]}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let text = String::from_utf8(bytes.to_vec()).unwrap();
        assert!(text.starts_with(r#"{"data":[{"event_type":"click","sum":12.5,"count":3}"#));
    }

    #[tokio::test]
    async fn test_aggregate_accepts_null_fields() {
        let store = aggregate_store();
        let body = r#"{"date_from":"2024-01-01","date_to":"2024-01-31","event_types":null,
            "user_ids":null,"group_by":["event_type"],"metrics":null,"filters":null,
            "limit":0,"offset":0}"#;
        let (status, value) = send(
            router_with(store.clone()),
            Method::POST,
            "/api/facts/aggregate",
            Body::from(body),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(value["count"], 2);
        let sql = store.last_query().unwrap().sql;
        assert!(sql.starts_with(
            "SELECT event_type, sum(metric_value) AS sum, count() AS count FROM facts"
        ));
    }

    #[tokio::test]
    async fn test_aggregate_invalid_group_by() {
        let store = aggregate_store();
        let (status, value) = send(
            router_with(store.clone()),
            Method::POST,
            "/api/facts/aggregate",
            Body::from(r#"{"group_by":["region"]}"#),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(value["error"], "invalid group_by column: region");
        assert_eq!(value["code"], "INVALID_GROUP_BY");
        assert_eq!(store.calls(), 0);
    }

    #[tokio::test]
    async fn test_aggregate_malformed_body() {
        let (status, value) = send(
            router_with(aggregate_store()),
            Method::POST,
            "/api/facts/aggregate",
            Body::from("{not json"),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(value["error"], "invalid request body");
    }

    #[tokio::test]
    async fn test_wrong_method_is_405() {
        let (status, value) = send(
            router_with(aggregate_store()),
            Method::GET,
            "/api/facts/aggregate",
            Body::empty(),
        )
        .await;
        assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(value["error"], "method not allowed");

        let (status, _) = send(
            router_with(aggregate_store()),
            Method::DELETE,
            "/api/facts",
            Body::empty(),
        )
        .await;
        assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);

        let (status, _) = send(
            router_with(aggregate_store()),
            Method::POST,
            "/health",
            Body::empty(),
        )
        .await;
        assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
    }

    #[tokio::test]
    async fn test_unknown_route_is_404() {
        let (status, value) =
            send(router_with(aggregate_store()), Method::GET, "/api/nope", Body::empty()).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(value["error"], "not found");
    }

    #[tokio::test]
    async fn test_timeseries_requires_dates() {
        let store = aggregate_store();
        let (status, value) = send(
            router_with(store.clone()),
            Method::GET,
            "/api/facts/timeseries?date_from=2024-01-01",
            Body::empty(),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(value["error"], "date_from and date_to required");
        assert_eq!(store.calls(), 0);
    }

    #[tokio::test]
    async fn test_timeseries_endpoint() {
        let store = Arc::new(FakeStore::with_result(
            &[("period", "DateTime"), ("value", "Float64")],
            vec![vec![json!("2024-01-01 13:00:00"), json!(2.0)]],
        ));
        let (status, value) = send(
            router_with(store.clone()),
            Method::GET,
            "/api/facts/timeseries?date_from=2024-01-01&date_to=2024-01-02&metric=avg&granularity=hour",
            Body::empty(),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            value,
            json!({"data": [{"period": "2024-01-01T13:00:00", "value": 2.0}], "count": 1})
        );
        let sql = store.last_query().unwrap().sql;
        assert!(sql.starts_with("SELECT toStartOfHour(event_time) AS period, avg(metric_value) AS value"));
    }

    #[tokio::test]
    async fn test_raw_endpoint_lenient_params() {
        let store = Arc::new(FakeStore::empty());
        let (status, value) = send(
            router_with(store.clone()),
            Method::GET,
            "/api/facts?limit=abc&offset=-4&user_id=xyz&event_type=click",
            Body::empty(),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(value, json!({"data": [], "count": 0}));

        let query = store.last_query().unwrap();
        assert!(query.sql.ends_with("LIMIT 100 OFFSET 0"));
        assert!(!query.sql.contains("user_id = ?"));
        assert_eq!(query.args.len(), 1);
    }

    #[tokio::test]
    async fn test_raw_endpoint_rows_and_repeated_params() {
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
                json!("2024-01-15"),
                json!("2024-01-15 10:30:00"),
                json!("42"),
                json!("s-1"),
                json!("click"),
                json!("duration"),
                json!(1.5),
            ]],
        ));
        let (status, value) = send(
            router_with(store.clone()),
            Method::GET,
            "/api/facts?limit=7&limit=2000&event_type=click&event_type=view",
            Body::empty(),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            value,
            json!({
                "data": [{
                    "event_date": "2024-01-15",
                    "event_time": "2024-01-15T10:30:00Z",
                    "user_id": 42,
                    "session_id": "s-1",
                    "event_type": "click",
                    "metric_name": "duration",
                    "metric_value": 1.5,
                    "dimensions": null
                }],
                "count": 1
            })
        );

        let query = store.last_query().unwrap();
        assert!(query.sql.ends_with("LIMIT 7 OFFSET 0"));
        assert_eq!(query.args, vec![QueryArg::Text("click".to_string())]);
    }

    #[tokio::test]
    async fn test_store_error_is_500_with_message() {
        let store = Arc::new(FakeStore::failing("Code: 60. Table default.facts does not exist"));
        let (status, value) = send(
            router_with(store),
            Method::POST,
            "/api/facts/aggregate",
            Body::from("{}"),
        )
        .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(
            value["error"]
                .as_str()
                .unwrap()
                .contains("Table default.facts does not exist")
        );
    }

    #[tokio::test]
    async fn test_health() {
        let (status, value) =
            send(router_with(aggregate_store()), Method::GET, "/health", Body::empty()).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(value, json!({"status": "ok"}));

        let (status, value) = send(
            router_with(Arc::new(FakeStore::failing("down"))),
            Method::GET,
            "/health",
            Body::empty(),
        )
        .await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(value["status"], "unhealthy");
        assert!(value["error"].is_string());
    }

    #[tokio::test]
    async fn test_openapi_served() {
        let (status, value) = send(
            router_with(aggregate_store()),
            Method::GET,
            "/api/openapi.json",
            Body::empty(),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(value["info"]["title"], "FactLens API");
    }
}
