use axum::extract::{FromRequest, rejection::JsonRejection};

use crate::server::response::ApiError;

/// `axum::Json` whose rejections render as `{"message": ...}` with status 400.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        tracing::debug!("Rejected request body: {rejection}");
        ApiError::bad_request(rejection.body_text())
    }
}
