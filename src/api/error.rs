//! HTTP mapping for [`AppError`].

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use tracing::{error, warn};

use crate::domain::{AppError, DatabaseError, ErrorResponse};

impl AppError {
    /// The HTTP status this error is reported with.
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) | AppError::Domain(_) | AppError::Deserialization(_) => {
                StatusCode::BAD_REQUEST
            }
            AppError::NotFound { .. } => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Authentication(_) => StatusCode::UNAUTHORIZED,
            AppError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            AppError::Database(db_err) => match db_err {
                DatabaseError::NotFound(_) => StatusCode::NOT_FOUND,
                DatabaseError::Duplicate(_) | DatabaseError::StaleWrite(_) => StatusCode::CONFLICT,
                DatabaseError::Connection(_) | DatabaseError::PoolExhausted(_) => {
                    StatusCode::SERVICE_UNAVAILABLE
                }
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
            AppError::Config(_) | AppError::Serialization(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn to_error_response(&self) -> ErrorResponse {
        match self {
            AppError::Validation(e) => {
                ErrorResponse::new("Validation failed").with_errors(e.field_errors())
            }
            AppError::Deserialization(msg) => {
                ErrorResponse::new("Malformed request body").with_details(msg.clone())
            }
            AppError::Domain(e) => ErrorResponse::new(e.to_string()),
            AppError::NotFound { .. } => ErrorResponse::new(self.to_string()),
            AppError::Conflict(msg) => ErrorResponse::new(msg.clone()),
            AppError::Authentication(_) => ErrorResponse::new("Unauthorized"),
            AppError::RateLimited => ErrorResponse::new("Rate limit exceeded"),
            AppError::Database(DatabaseError::NotFound(_)) => {
                ErrorResponse::new("Resource not found")
            }
            AppError::Database(DatabaseError::Duplicate(_)) => {
                ErrorResponse::new("Resource already exists")
            }
            AppError::Database(DatabaseError::StaleWrite(_)) => {
                ErrorResponse::new("Resource was modified concurrently, retry the request")
            }
            AppError::Database(DatabaseError::Connection(_))
            | AppError::Database(DatabaseError::PoolExhausted(_)) => {
                ErrorResponse::new("Service temporarily unavailable")
            }
            _ => ErrorResponse::new("An internal error occurred"),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        if status.is_server_error() {
            error!(status = status.as_u16(), error = %self, "Server error");
        } else if status == StatusCode::CONFLICT {
            warn!(error = %self, "Conflict");
        }

        (status, Json(self.to_error_response())).into_response()
    }
}
