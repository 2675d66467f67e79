//! API errors and their JSON representation.
//!
//! Every failure is answered with `{"error": <message>, "code": <CODE>}`.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use thrones_executor::ExecutionError;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("missing required parameter '{0}'")]
    MissingParameter(&'static str),

    #[error("parameter '{name}' must be an integer, got '{value}'")]
    InvalidParameter { name: &'static str, value: String },

    #[error(transparent)]
    Execution(#[from] ExecutionError),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::MissingParameter(_) | ApiError::InvalidParameter { .. } => StatusCode::BAD_REQUEST,
            ApiError::Execution(e) => match e {
                ExecutionError::NotFound(_) => StatusCode::NOT_FOUND,
                ExecutionError::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
                ExecutionError::Storage(e) if e.is_unavailable() => StatusCode::SERVICE_UNAVAILABLE,
                ExecutionError::Projection(_) | ExecutionError::Storage(_) | ExecutionError::EmptyResult(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            ApiError::MissingParameter(_) => "MISSING_PARAMETER",
            ApiError::InvalidParameter { .. } => "INVALID_PARAMETER",
            ApiError::Execution(e) => match e {
                ExecutionError::NotFound(_) => "NOT_FOUND",
                ExecutionError::Timeout { .. } => "TIMEOUT",
                ExecutionError::Projection(_) => "MALFORMED_RECORD",
                ExecutionError::Storage(e) if e.is_unavailable() => "UNAVAILABLE",
                ExecutionError::Storage(_) | ExecutionError::EmptyResult(_) => "INTERNAL",
            },
        }
    }
}

/// Error response body.
#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
    code: &'static str,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let code = self.code();
        if status.is_server_error() {
            tracing::error!(code, error = %self, "Request failed");
        } else {
            tracing::warn!(code, error = %self, "Request rejected");
        }

        let body = ErrorBody {
            error: self.to_string(),
            code,
        };
        (status, Json(body)).into_response()
    }
}
