use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use dsapi_core::{BackendErrorKind, DataError};
use serde::Serialize;
use thiserror::Error;

/// Error returned by handlers; renders as a JSON body with a stable `error` code.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Data(#[from] DataError),

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("internal error: {0}")]
    Internal(String),
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl ErrorResponse {
    fn new(error: &'static str, message: String) -> Self {
        Self {
            error,
            message,
            field: None,
            position: None,
            reason: None,
        }
    }
}

impl ApiError {
    fn parts(&self) -> (StatusCode, ErrorResponse) {
        let message = self.to_string();
        match self {
            ApiError::BadRequest(_) => (
                StatusCode::BAD_REQUEST,
                ErrorResponse::new("bad_request", message),
            ),
            ApiError::Internal(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorResponse::new("internal_error", message),
            ),
            ApiError::Data(err) => match err {
                DataError::DatasetNotFound { .. } => (
                    StatusCode::NOT_FOUND,
                    ErrorResponse::new("dataset_not_found", message),
                ),
                DataError::NoRecords => (
                    StatusCode::NOT_FOUND,
                    ErrorResponse::new("no_records", message),
                ),
                DataError::InvalidField(name) => (
                    StatusCode::BAD_REQUEST,
                    ErrorResponse {
                        field: Some(name.clone()),
                        ..ErrorResponse::new("invalid_field", message)
                    },
                ),
                DataError::Parse(e) => (
                    StatusCode::BAD_REQUEST,
                    ErrorResponse {
                        position: Some(e.position),
                        reason: Some(e.reason.clone()),
                        ..ErrorResponse::new("parse_error", message)
                    },
                ),
                DataError::InvalidParam { name, .. } => (
                    StatusCode::BAD_REQUEST,
                    ErrorResponse {
                        field: Some(name.clone()),
                        ..ErrorResponse::new("invalid_param", message)
                    },
                ),
                DataError::Backend(e) => match e.kind {
                    BackendErrorKind::Unavailable => (
                        StatusCode::SERVICE_UNAVAILABLE,
                        ErrorResponse::new("backend_unavailable", message),
                    ),
                    BackendErrorKind::Timeout => (
                        StatusCode::GATEWAY_TIMEOUT,
                        ErrorResponse::new("backend_timeout", message),
                    ),
                    BackendErrorKind::Malformed => (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        ErrorResponse::new("backend_malformed", message),
                    ),
                },
                DataError::Cancelled => (
                    StatusCode::SERVICE_UNAVAILABLE,
                    ErrorResponse::new("cancelled", message),
                ),
                DataError::Catalog(_) => (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorResponse::new("catalog_error", message),
                ),
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = self.parts();
        if status.is_server_error() {
            tracing::error!(%status, code = body.error, error = %body.message, "request failed");
        } else {
            tracing::debug!(%status, code = body.error, error = %body.message, "request rejected");
        }
        (status, Json(body)).into_response()
    }
}
