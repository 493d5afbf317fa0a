//! HTTP error handling and response types.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::db::RepositoryError;
use crate::services::ObservationError;

/// API error response body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    /// Error code for programmatic handling
    pub code: String,
    /// Human-readable error message
    pub message: String,
    /// Optional additional details
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ApiError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}

/// Application error type for HTTP handlers.
#[derive(Debug)]
pub enum AppError {
    /// Invalid request (validation error)
    BadRequest(String),
    /// Missing or unknown bearer token
    Unauthorized(String),
    /// Authenticated but not allowed
    Forbidden(String),
    /// Request clashes with current state
    Conflict(String),
    /// The telescope is not idle
    Busy(String),
    /// Internal server error
    Internal(String),
    /// Repository error
    Repository(RepositoryError),
    /// Observation refused by the validator, with its diagnostics
    NotObservable(ObservationError),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error) = match self {
            AppError::BadRequest(msg) => {
                (StatusCode::BAD_REQUEST, ApiError::new("BAD_REQUEST", msg))
            }
            AppError::Unauthorized(msg) => {
                (StatusCode::UNAUTHORIZED, ApiError::new("UNAUTHORIZED", msg))
            }
            AppError::Forbidden(msg) => (StatusCode::FORBIDDEN, ApiError::new("FORBIDDEN", msg)),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, ApiError::new("CONFLICT", msg)),
            AppError::Busy(msg) => (StatusCode::CONFLICT, ApiError::new("TELESCOPE_BUSY", msg)),
            AppError::Internal(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ApiError::new("INTERNAL_ERROR", msg),
            ),
            AppError::Repository(e) => {
                let context = e.context().to_string();
                let (status, code) = match &e {
                    RepositoryError::NotFound { .. } => (StatusCode::NOT_FOUND, "NOT_FOUND"),
                    RepositoryError::ValidationError { .. } => {
                        (StatusCode::BAD_REQUEST, "VALIDATION_ERROR")
                    }
                };
                (status, ApiError::new(code, e.to_string()).with_details(context))
            }
            AppError::NotObservable(e) => {
                let details = match &e {
                    ObservationError::NotObservable { observability, .. } => {
                        serde_json::to_string(observability).ok()
                    }
                    _ => None,
                };
                let mut error = ApiError::new("NOT_OBSERVABLE", e.to_string());
                error.details = details;
                (StatusCode::BAD_REQUEST, error)
            }
        };

        (status, Json(error)).into_response()
    }
}

impl From<RepositoryError> for AppError {
    fn from(err: RepositoryError) -> Self {
        AppError::Repository(err)
    }
}

impl From<ObservationError> for AppError {
    fn from(err: ObservationError) -> Self {
        match err {
            ObservationError::NotObservable { .. } => AppError::NotObservable(err),
            ObservationError::Repository(e) => AppError::Repository(e),
            ObservationError::Busy(e) => AppError::Busy(e.to_string()),
            ObservationError::Forbidden(_) | ObservationError::ReservationRequired => {
                AppError::Forbidden(err.to_string())
            }
            ObservationError::ReservationConflict(_) | ObservationError::AlreadyExecuted(_) => {
                AppError::Conflict(err.to_string())
            }
            ObservationError::Folder(_) => AppError::Internal(err.to_string()),
            ObservationError::InvalidCoordinate(_)
            | ObservationError::Ephemeris(_)
            | ObservationError::MissingTarget
            | ObservationError::InvalidTime(_)
            | ObservationError::NoFilters
            | ObservationError::InvalidFilter(_)
            | ObservationError::InvalidFrameMode(_)
            | ObservationError::InvalidExposure { .. }
            | ObservationError::InvalidReservationWindow(_)
            | ObservationError::UnknownUser(_) => AppError::BadRequest(err.to_string()),
        }
    }
}
