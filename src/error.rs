use axum::{Json, http::StatusCode, response::IntoResponse};
use serde::Serialize;
use thiserror::Error;
use validator::ValidationErrors;

use crate::{dao::storage::StorageError, progression::ProgressionError};

/// Errors that can occur in service layer operations.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Storage backend is unavailable.
    #[error("storage unavailable")]
    Unavailable(#[source] StorageError),
    /// Application is running in degraded mode without storage.
    #[error("storage unavailable (degraded mode)")]
    Degraded,
    /// Invalid input provided by the client.
    #[error("invalid input: {0}")]
    InvalidInput(String),
    /// Operation cannot be performed in the current state.
    #[error("invalid state: {0}")]
    InvalidState(String),
    /// Requested resource was not found.
    #[error("not found: {0}")]
    NotFound(String),
    /// Operation exceeded its timeout limit.
    #[error("operation timed out")]
    Timeout,
}

impl From<StorageError> for ServiceError {
    fn from(err: StorageError) -> Self {
        ServiceError::Unavailable(err)
    }
}

impl From<ProgressionError> for ServiceError {
    fn from(err: ProgressionError) -> Self {
        match err {
            ProgressionError::NotFound { .. } => ServiceError::NotFound(err.to_string()),
            ProgressionError::InvalidTransition(_) | ProgressionError::InvalidSetTransition { .. } => {
                ServiceError::InvalidState(err.to_string())
            }
            ProgressionError::InvalidArgument(message) => ServiceError::InvalidInput(message),
            ProgressionError::Storage(source) => ServiceError::Unavailable(source),
        }
    }
}

impl From<ValidationErrors> for AppError {
    fn from(err: ValidationErrors) -> Self {
        AppError::BadRequest(format!("validation failed: {}", err))
    }
}

/// Application-level errors that are converted to HTTP responses.
#[derive(Debug, Error)]
pub enum AppError {
    /// Bad request with invalid input.
    #[error("bad request: {0}")]
    BadRequest(String),
    /// Requested resource not found.
    #[error("not found: {0}")]
    NotFound(String),
    /// Conflict with current state.
    #[error("conflict: {0}")]
    Conflict(String),
    /// Service unavailable or degraded.
    #[error("service unavailable: {0}")]
    ServiceUnavailable(String),
}

impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::Unavailable(source) => AppError::ServiceUnavailable(source.to_string()),
            ServiceError::Degraded => AppError::ServiceUnavailable("degraded mode".into()),
            ServiceError::InvalidInput(message) => AppError::BadRequest(message),
            ServiceError::InvalidState(message) => AppError::Conflict(message),
            ServiceError::NotFound(message) => AppError::NotFound(message),
            ServiceError::Timeout => AppError::ServiceUnavailable("operation timed out".into()),
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let status = match &self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        };

        let payload = Json(ErrorBody {
            message: self.to_string(),
        });

        (status, payload).into_response()
    }
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::*;
    use crate::{
        dao::models::{MatchStatus, SetStatus},
        progression::SetAction,
        state::state_machine::{InvalidTransition, MatchEvent},
    };

    fn status_of(err: ServiceError) -> StatusCode {
        AppError::from(err).into_response().status()
    }

    #[test]
    fn progression_errors_map_to_http_statuses() {
        let not_found = ProgressionError::NotFound {
            entity: "set",
            id: Uuid::nil(),
        };
        assert_eq!(status_of(not_found.into()), StatusCode::NOT_FOUND);

        let bad_set = ProgressionError::InvalidSetTransition {
            from: SetStatus::Completed,
            action: SetAction::Complete,
        };
        assert_eq!(status_of(bad_set.into()), StatusCode::CONFLICT);

        let bad_match = ProgressionError::InvalidTransition(InvalidTransition {
            from: MatchStatus::Aborted,
            event: MatchEvent::Start,
        });
        assert_eq!(status_of(bad_match.into()), StatusCode::CONFLICT);

        let bad_arg = ProgressionError::InvalidArgument("winner must be 0 or 1".into());
        assert_eq!(status_of(bad_arg.into()), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn degraded_is_unavailable() {
        assert_eq!(
            status_of(ServiceError::Degraded),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            status_of(ServiceError::Timeout),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }
}
