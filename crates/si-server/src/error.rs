//! Error-to-HTTP response conversion.
//!
//! Implements `IntoResponse` for [`si_core::Error`] so that route handlers
//! can return `Result<T, AppError>` and use `?` on store calls.

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use crate::middleware::request_id::current_request_id;

/// Wrapper so we can implement `IntoResponse` for an external type.
///
/// The body's `request_id` is taken from the request being handled.
#[derive(Debug)]
pub struct AppError {
    inner: si_core::Error,
}

impl AppError {
    pub fn new(inner: si_core::Error) -> Self {
        Self { inner }
    }
}

impl From<si_core::Error> for AppError {
    fn from(e: si_core::Error) -> Self {
        Self::new(e)
    }
}

// Extractor rejections are all client input problems and surface as 422.

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        Self::new(si_core::Error::Validation(rejection.body_text()))
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        Self::new(si_core::Error::Validation(rejection.body_text()))
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.inner.http_status())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        if status.is_server_error() {
            tracing::error!(
                status = %status,
                error = %self.inner,
                "Server error in API handler"
            );
        } else {
            tracing::debug!(status = %status, error = %self.inner, "Request rejected");
        }

        let body = json!({
            "error": self.inner.to_string(),
            "code": self.inner.code(),
            "request_id": current_request_id(),
        });

        (status, axum::Json(body)).into_response()
    }
}
