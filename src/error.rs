use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

/// Application-level errors
///
/// Every variant is recoverable: a session that hits one stays usable and the
/// user may retry.
#[derive(thiserror::Error, Debug)]
pub enum AppError {
    #[error("Recommender request failed: {0}")]
    NetworkFailure(String),

    #[error("Invalid recommender response: {0}")]
    InvalidResponse(String),

    #[error("Invalid input: {0}")]
    ValidationFailure(String),

    #[error("A recommendation request is already in flight")]
    Busy,

    #[error("Cannot {action} while {phase}")]
    InvalidTransition {
        action: &'static str,
        phase: &'static str,
    },

    #[error("Session not found: {0}")]
    SessionNotFound(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            AppError::InvalidResponse(err.to_string())
        } else {
            AppError::NetworkFailure(err.to_string())
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match self {
            AppError::ValidationFailure(_) => StatusCode::BAD_REQUEST,
            AppError::SessionNotFound(_) => StatusCode::NOT_FOUND,
            AppError::Busy | AppError::InvalidTransition { .. } => StatusCode::CONFLICT,
            AppError::NetworkFailure(_) | AppError::InvalidResponse(_) => StatusCode::BAD_GATEWAY,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(json!({
            "error": self.to_string()
        }));

        (status, body).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;
