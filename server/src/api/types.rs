//! Shared API types
//!
//! Error responses and the list envelope used by every endpoint.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use utoipa::ToSchema;

use crate::data::StoreError;
use crate::domain::facts::FactsError;

/// List envelope: `{"data": [...], "count": n}`
#[derive(Debug, Serialize, ToSchema)]
pub struct ApiResponse<T> {
    pub data: Vec<T>,
    pub count: usize,
}

impl<T> ApiResponse<T> {
    pub fn new(data: Vec<T>) -> Self {
        let count = data.len();
        Self { data, count }
    }
}

/// Error body: `{"error": "...", "code": "..."}`
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorBody {
    pub error: String,
    pub code: String,
}

/// Standard API error response
#[derive(Debug)]
pub enum ApiError {
    BadRequest { code: String, message: String },
    NotFound,
    MethodNotAllowed,
    ServiceUnavailable { message: String },
    Internal { code: String, message: String },
}

impl ApiError {
    pub fn bad_request(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::BadRequest {
            code: code.into(),
            message: message.into(),
        }
    }

    pub fn internal(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Internal {
            code: code.into(),
            message: message.into(),
        }
    }

    pub fn service_unavailable(message: impl Into<String>) -> Self {
        Self::ServiceUnavailable {
            message: message.into(),
        }
    }

    /// Malformed or unreadable request body
    pub fn invalid_body() -> Self {
        Self::bad_request("INVALID_BODY", "invalid request body")
    }
}

impl From<FactsError> for ApiError {
    fn from(e: FactsError) -> Self {
        match e {
            FactsError::Validation(e) => Self::bad_request(e.code(), e.to_string()),
            // Only reachable when the server is shutting down
            FactsError::Store(StoreError::Cancelled) => {
                Self::service_unavailable(StoreError::Cancelled.to_string())
            }
            // The store's own message is surfaced as-is
            FactsError::Store(e) => {
                let code = match &e {
                    StoreError::Timeout { .. } => "QUERY_TIMEOUT",
                    _ => "STORE_ERROR",
                };
                Self::internal(code, e.to_string())
            }
            FactsError::Decode(e) => {
                tracing::error!(error = %e, "Result did not match query shape");
                Self::internal("DECODE_ERROR", e.to_string())
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message) = match self {
            Self::BadRequest { code, message } => (StatusCode::BAD_REQUEST, code, message),
            Self::NotFound => (
                StatusCode::NOT_FOUND,
                "NOT_FOUND".to_string(),
                "not found".to_string(),
            ),
            Self::MethodNotAllowed => (
                StatusCode::METHOD_NOT_ALLOWED,
                "METHOD_NOT_ALLOWED".to_string(),
                "method not allowed".to_string(),
            ),
            Self::ServiceUnavailable { message } => (
                StatusCode::SERVICE_UNAVAILABLE,
                "SERVICE_UNAVAILABLE".to_string(),
                message,
            ),
            Self::Internal { code, message } => {
                (StatusCode::INTERNAL_SERVER_ERROR, code, message)
            }
        };
        (
            status,
            Json(ErrorBody {
                error: message,
                code,
            }),
        )
            .into_response()
    }
}
