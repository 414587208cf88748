//! Maps the core error taxonomy onto HTTP responses.
//!
//! Each kind gets its own status code. Internal failures are reported with a
//! generic message; their detail was already logged where they happened.

use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use citadel_core::AppError;
use serde_json::json;
use std::fmt;
use tracing::error;

#[derive(Debug)]
pub struct ApiError(pub AppError);

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        ApiError(err)
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.0 {
            AppError::Internal(_) => f.write_str("internal server error"),
            AppError::InvalidArgument(msg)
            | AppError::Forbidden(msg)
            | AppError::Unauthorized(msg)
            | AppError::Conflict(msg) => f.write_str(msg),
            not_found @ AppError::NotFound(..) => write!(f, "{not_found}"),
        }
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self.0 {
            AppError::InvalidArgument(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(..) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        if let AppError::Internal(detail) = &self.0 {
            error!(detail = %detail, "request failed with an internal error");
        }
        HttpResponse::build(self.status_code()).json(json!({ "error": self.to_string() }))
    }
}

/// Extractor failures (bad JSON, non-numeric IDs) are the caller's fault.
pub fn invalid_request(err: impl fmt::Display) -> actix_web::Error {
    ApiError(AppError::InvalidArgument(err.to_string())).into()
}
