//! Layered error types: internal `ServiceError`, wire `GameErrorCode` for
//! WebSocket frames, and HTTP-facing `AppError` for the `/api/*` surface.

use axum::{Json, http::StatusCode, response::IntoResponse};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

/// Internal error surfaced by game logic, player registry, playlist
/// loading, and persistence.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("storage unavailable: {0}")]
    Unavailable(String),
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("invalid state: {0}")]
    InvalidState(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("unauthorized: {0}")]
    Unauthorized(String),
}

/// Wire error code sent to WebSocket clients, per the documented protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GameErrorCode {
    NameTaken,
    NameInvalid,
    GameNotStarted,
    GameAlreadyStarted,
    GameEnded,
    GameFull,
    NotAdmin,
    AdminExists,
    RoundExpired,
    AlreadySubmitted,
    NotInGame,
    InvalidAction,
    MaUnavailable,
    UnsupportedPlatform,
}

impl GameErrorCode {
    /// Human-readable message shown alongside the code, matching the
    /// friendly strings the original handler sends to joiners.
    pub fn message(self) -> &'static str {
        match self {
            GameErrorCode::NameTaken => "Name taken, choose another",
            GameErrorCode::NameInvalid => "Please enter a name",
            GameErrorCode::GameNotStarted => "No active game",
            GameErrorCode::GameAlreadyStarted => "Game already started",
            GameErrorCode::GameEnded => "This game has ended",
            GameErrorCode::GameFull => "Game is full",
            GameErrorCode::NotAdmin => "Only admin can perform this action",
            GameErrorCode::AdminExists => "Game already has an admin",
            GameErrorCode::RoundExpired => "Time's up!",
            GameErrorCode::AlreadySubmitted => "Already submitted",
            GameErrorCode::NotInGame => "Not in game",
            GameErrorCode::InvalidAction => "Action not valid in the current phase",
            GameErrorCode::MaUnavailable => "Media player unavailable",
            GameErrorCode::UnsupportedPlatform => "Unsupported media player platform",
        }
    }
}

/// HTTP-facing error for the `/api/*` surface.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("unauthorized: {0}")]
    Unauthorized(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("service unavailable: {0}")]
    ServiceUnavailable(String),
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::Unavailable(message) => AppError::ServiceUnavailable(message),
            ServiceError::Unauthorized(message) => AppError::Unauthorized(message),
            ServiceError::InvalidInput(message) => AppError::BadRequest(message),
            ServiceError::InvalidState(message) => AppError::Conflict(message),
            ServiceError::NotFound(message) => AppError::NotFound(message),
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
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let payload = Json(ErrorBody {
            message: self.to_string(),
        });

        (status, payload).into_response()
    }
}
