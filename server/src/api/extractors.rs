//! Request extractors with uniform JSON error responses
//!
//! Axum's built-in `Json` and `Query` extractors reject with plain-text
//! bodies and, for `Json`, insist on a JSON content type. These wrappers map
//! every rejection onto [`ApiError`].

use std::ops::Deref;

use axum::body::Bytes;
use axum::extract::{FromRequest, FromRequestParts, Query, Request};
use axum::http::request::Parts;
use serde::de::DeserializeOwned;

use super::types::ApiError;

/// JSON body extractor that ignores the `Content-Type` header.
///
/// Any read or parse failure becomes `400 {"error":"invalid request body"}`.
#[derive(Debug)]
pub struct JsonBody<T>(pub T);

impl<T> Deref for JsonBody<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<S, T> FromRequest<S> for JsonBody<T>
where
    S: Send + Sync,
    T: DeserializeOwned,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let bytes = Bytes::from_request(req, state).await.map_err(|e| {
            tracing::debug!(error = %e, "Failed to read request body");
            ApiError::invalid_body()
        })?;
        let value = serde_json::from_slice(&bytes).map_err(|e| {
            tracing::debug!(error = %e, "Failed to parse request body");
            ApiError::invalid_body()
        })?;
        Ok(Self(value))
    }
}

/// Query string extractor rejecting with a JSON 400.
///
/// A key given more than once keeps its first value. All values reach `T`
/// as strings.
#[derive(Debug)]
pub struct QueryParams<T>(pub T);

impl<S, T> FromRequestParts<S> for QueryParams<T>
where
    S: Send + Sync,
    T: DeserializeOwned,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(pairs) = Query::<Vec<(String, String)>>::from_request_parts(parts, state)
            .await
            .map_err(|e| ApiError::bad_request("INVALID_QUERY", e.body_text()))?;

        let mut fields = serde_json::Map::new();
        for (key, value) in pairs {
            fields
                .entry(key)
                .or_insert_with(|| serde_json::Value::String(value));
        }

        let value = serde_json::from_value(serde_json::Value::Object(fields))
            .map_err(|e| ApiError::bad_request("INVALID_QUERY", e.to_string()))?;
        Ok(Self(value))
    }
}

#[cfg(test)]
mod tests {
    use axum::http::Request;
    use serde::Deserialize;

    use super::*;

    #[derive(Debug, Deserialize)]
    struct Params {
        limit: Option<String>,
        event_type: Option<String>,
    }

    async fn extract(uri: &str) -> Result<Params, ApiError> {
        let (mut parts, _) = Request::builder().uri(uri).body(()).unwrap().into_parts();
        QueryParams::<Params>::from_request_parts(&mut parts, &())
            .await
            .map(|QueryParams(p)| p)
    }

    #[tokio::test]
    async fn test_repeated_key_keeps_first_value() {
        let params = extract("/api/facts?limit=1&limit=2&event_type=click")
            .await
            .unwrap();
        assert_eq!(params.limit.as_deref(), Some("1"));
        assert_eq!(params.event_type.as_deref(), Some("click"));
    }

    #[tokio::test]
    async fn test_missing_query_string() {
        let params = extract("/api/facts").await.unwrap();
        assert!(params.limit.is_none());
        assert!(params.event_type.is_none());
    }

    #[tokio::test]
    async fn test_values_are_percent_decoded() {
        let params = extract("/api/facts?event_type=page%20view").await.unwrap();
        assert_eq!(params.event_type.as_deref(), Some("page view"));
    }
}
