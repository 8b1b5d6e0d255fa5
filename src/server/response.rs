use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use serde_json::json;

use crate::error::Result as StoreResult;

/// Plain acknowledgement body: `{"message": ...}`
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// A single invalid request field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

#[derive(Debug)]
enum ErrorBody {
    Message(String),
    Fields(Vec<FieldError>),
}

/// API error that converts to a proper HTTP response
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    body: ErrorBody,
}

impl ApiError {
    fn message(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            body: ErrorBody::Message(message.into()),
        }
    }

    #[must_use]
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::message(StatusCode::BAD_REQUEST, message)
    }

    /// Field-level validation failure, rendered as `{"errors": [...]}`.
    #[must_use]
    pub fn validation(errors: Vec<FieldError>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            body: ErrorBody::Fields(errors),
        }
    }

    #[must_use]
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::message(StatusCode::NOT_FOUND, message)
    }

    #[must_use]
    pub fn internal() -> Self {
        Self::message(StatusCode::INTERNAL_SERVER_ERROR, "Server error")
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = match self.body {
            ErrorBody::Message(message) => json!({ "message": message }),
            ErrorBody::Fields(errors) => json!({ "errors": errors }),
        };
        (self.status, Json(body)).into_response()
    }
}

/// Extension trait for converting database results to API errors.
/// The underlying error is logged; clients only see a generic message.
pub trait StoreResultExt<T> {
    fn api_err(self, context: &'static str) -> Result<T, ApiError>;
}

impl<T> StoreResultExt<T> for StoreResult<T> {
    fn api_err(self, context: &'static str) -> Result<T, ApiError> {
        self.map_err(|e| {
            tracing::error!("{context}: {e}");
            ApiError::internal()
        })
    }
}

/// Extension for Option types from database lookups.
pub trait StoreOptionExt<T> {
    fn or_not_found(self, message: &'static str) -> Result<T, ApiError>;
}

impl<T> StoreOptionExt<T> for Option<T> {
    fn or_not_found(self, message: &'static str) -> Result<T, ApiError> {
        self.ok_or_else(|| ApiError::not_found(message))
    }
}
