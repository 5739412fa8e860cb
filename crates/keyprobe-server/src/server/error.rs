//! Mapping of core errors onto HTTP responses

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use keyprobe_core::KeyprobeError;
use tracing::error;

use super::messages::ErrorResponse;

/// Message returned in place of internal error details
const INTERNAL_MESSAGE: &str = "internal server error";

/// Error returned by REST handlers
#[derive(Debug)]
pub struct ApiError(pub KeyprobeError);

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self.0 {
            KeyprobeError::Validation(_)
            | KeyprobeError::Conflict(_)
            | KeyprobeError::InvalidState(_) => StatusCode::BAD_REQUEST,
            KeyprobeError::NotFound { .. } => StatusCode::NOT_FOUND,
            KeyprobeError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self.0 {
            KeyprobeError::Internal(detail) => {
                error!("Request failed: {}", detail);
                INTERNAL_MESSAGE.to_string()
            }
            other => other.to_string(),
        };
        let body = ErrorResponse {
            error: message,
            code: self.0.error_code(),
        };
        (status, Json(body)).into_response()
    }
}

impl From<KeyprobeError> for ApiError {
    fn from(err: KeyprobeError) -> Self {
        ApiError(err)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError(KeyprobeError::Validation(rejection.body_text()))
    }
}
