//! Mapping of engine errors onto HTTP responses.
//!
//! | kind         | status |
//! |--------------|--------|
//! | `validation` | 400    |
//! | `not_found`  | 404    |
//! | `conflict`   | 409    |
//! | `forbidden`  | 403    |
//! | `downstream` | 503    |
//!
//! Downstream failures are logged in full and answered with a generic,
//! retryable message.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use turnero::booking::BookingStep;
use turnero::{BookingError, DomainError, ErrorKind};

/// Error body returned by every endpoint
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: &'static str,
    pub message: String,
    /// Booking step that failed; only set by the booking endpoint
    #[serde(skip_serializing_if = "Option::is_none")]
    pub paso: Option<BookingStep>,
    pub retryable: bool,
}

/// HTTP-facing error
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    body: ErrorResponse,
}

/// Result type for handlers
pub type ApiResult<T> = Result<T, ApiError>;

impl ApiError {
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::UNAUTHORIZED,
            body: ErrorResponse {
                error: "unauthorized",
                message: message.into(),
                paso: None,
                retryable: false,
            },
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            body: ErrorResponse {
                error: ErrorKind::Validation.as_str(),
                message: message.into(),
                paso: None,
                retryable: false,
            },
        }
    }

    /// Booking errors also report the pipeline step that failed
    pub fn booking(err: BookingError) -> Self {
        let paso = err.step();
        let mut api = Self::from(err);
        api.body.paso = Some(paso);
        api
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn message(&self) -> &str {
        &self.body.message
    }
}

/// HTTP status for an error kind
pub fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::Validation => StatusCode::BAD_REQUEST,
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::Conflict => StatusCode::CONFLICT,
        ErrorKind::Forbidden => StatusCode::FORBIDDEN,
        ErrorKind::Downstream => StatusCode::SERVICE_UNAVAILABLE,
    }
}

impl<E> From<E> for ApiError
where
    E: DomainError,
{
    fn from(err: E) -> Self {
        let kind = err.kind();
        if kind == ErrorKind::Downstream {
            tracing::error!(error = %err, "Downstream failure");
        } else {
            tracing::debug!(kind = %kind, error = %err, "Request rejected");
        }
        Self {
            status: status_for(kind),
            body: ErrorResponse {
                error: kind.as_str(),
                message: err.client_message(),
                paso: None,
                retryable: kind.is_retryable(),
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use turnero::turno::TurnoError;

    #[test]
    fn test_status_mapping() {
        assert_eq!(status_for(ErrorKind::Validation), StatusCode::BAD_REQUEST);
        assert_eq!(status_for(ErrorKind::NotFound), StatusCode::NOT_FOUND);
        assert_eq!(status_for(ErrorKind::Conflict), StatusCode::CONFLICT);
        assert_eq!(status_for(ErrorKind::Forbidden), StatusCode::FORBIDDEN);
        assert_eq!(
            status_for(ErrorKind::Downstream),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }

    #[test]
    fn test_not_found_keeps_message() {
        let err = ApiError::from(TurnoError::NotFound(7));
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
        assert!(err.message().contains('7'));
    }

    #[test]
    fn test_downstream_message_is_generic() {
        let err = ApiError::from(TurnoError::Timeout(Duration::from_secs(5)));
        assert_eq!(err.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(err.message(), "Error interno del servidor");
        assert!(err.body.retryable);
    }

    #[test]
    fn test_booking_error_reports_step() {
        let err = ApiError::booking(BookingError::Reservation(TurnoError::NotFound(3)));
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
        assert_eq!(err.body.paso, Some(BookingStep::Reserva));
    }
}
