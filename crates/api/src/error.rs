//! API error types with HTTP response mapping.

use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use domain::{DomainError, ErrorKind};
use thiserror::Error;

use crate::auth::AuthError;
use crate::response;

const INVALID_PARAMETER: &str = "Parameter tidak valid";
const NOT_FOUND: &str = "Tidak ditemukan";
const INTERNAL: &str = "Internal Server Error";

/// API-level error type that maps to HTTP responses.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error(transparent)]
    Auth(#[from] AuthError),

    /// The request body or path could not be decoded.
    #[error("{0}")]
    BadRequest(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Domain(DomainError::DeadlineExceeded) => StatusCode::GATEWAY_TIMEOUT,
            ApiError::Domain(err) => match err.kind() {
                ErrorKind::NotFound => StatusCode::NOT_FOUND,
                ErrorKind::Validation => StatusCode::BAD_REQUEST,
                ErrorKind::Forbidden => StatusCode::FORBIDDEN,
                ErrorKind::Conflict => StatusCode::UNPROCESSABLE_ENTITY,
                ErrorKind::Cancelled => StatusCode::REQUEST_TIMEOUT,
                ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
            },
            ApiError::Auth(AuthError::Signing(_)) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Auth(_) => StatusCode::UNAUTHORIZED,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            ApiError::Domain(err) => err.code(),
            ApiError::Auth(_) => "unauthorized",
            ApiError::BadRequest(_) => "invalid_parameter",
        }
    }

    /// Message shown to the client. Internal details stay in the logs.
    fn public_message(&self) -> String {
        match self {
            ApiError::Domain(err) => match err.kind() {
                ErrorKind::NotFound => NOT_FOUND.to_string(),
                ErrorKind::Internal => INTERNAL.to_string(),
                _ => err.to_string(),
            },
            ApiError::Auth(_) => "Unauthorized".to_string(),
            ApiError::BadRequest(message) => message.clone(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        metrics::counter!("http_errors_total", "code" => self.code()).increment(1);
        if status.is_server_error() {
            tracing::error!(error = %self, "internal server error");
        } else {
            tracing::debug!(error = %self, status = status.as_u16(), "request failed");
        }

        response::error(status, self.code(), self.public_message()).into_response()
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(_: PathRejection) -> Self {
        ApiError::BadRequest(INVALID_PARAMETER.to_string())
    }
}
