//! OpenAPI specification and Swagger UI

use axum::http::header;
use axum::response::{Html, IntoResponse, Json};
use utoipa::OpenApi;

use crate::api::routes::{facts, health};
use crate::api::types::ErrorBody;
use crate::domain::facts::{FactRow, QueryRequest, TimeseriesPoint};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "FactLens API",
        version = env!("CARGO_PKG_VERSION"),
        description = "Analytics queries over ClickHouse fact tables"
    ),
    tags(
        (name = "health", description = "Health check endpoint"),
        (name = "facts", description = "Raw, aggregate and time-series fact queries")
    ),
    paths(
        health::health,
        facts::raw::list_facts,
        facts::aggregate::aggregate_facts,
        facts::timeseries::facts_timeseries,
    ),
    components(schemas(
        ErrorBody,
        health::HealthResponse,
        QueryRequest,
        FactRow,
        TimeseriesPoint,
    ))
)]
pub struct ApiDoc;

/// Serve OpenAPI JSON specification
pub async fn openapi_json() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "application/json")],
        Json(ApiDoc::openapi()),
    )
}

/// Serve Swagger UI from CDN
pub async fn swagger_ui_html() -> Html<&'static str> {
    Html(SWAGGER_UI_HTML)
}

const SWAGGER_UI_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>FactLens API Documentation</title>
    <link rel="stylesheet" type="text/css" href="https://unpkg.com/swagger-ui-dist@5/swagger-ui.css">
</head>
<body>
    <div id="swagger-ui"></div>
    <script src="https://unpkg.com/swagger-ui-dist@5/swagger-ui-bundle.js"></script>
    <script>
        window.onload = () => {
            window.ui = SwaggerUIBundle({
                url: "/api/openapi.json",
                dom_id: '#swagger-ui',
                deepLinking: true
            });
        };
    </script>
</body>
</html>"#;
