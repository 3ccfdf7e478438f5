use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chess_core::ChessError;
use serde_json::json;

use crate::db::RepositoryError;

/// Outcomes of game session operations other than success. Everything but
/// `Unavailable` and `Storage` is an expected rejection that leaves the
/// match untouched.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GameError {
    #[error("invalid coordinate: {0}")]
    InvalidCoordinate(String),

    #[error("invalid position: {0}")]
    InvalidPosition(String),

    #[error("illegal move")]
    IllegalMove,

    #[error("match not found")]
    MatchNotFound,

    #[error("match is not joinable")]
    MatchNotJoinable,

    #[error("not this player's turn")]
    NotPlayersTurn,

    #[error("match is not in progress")]
    MatchNotInProgress,

    #[error("match store unavailable")]
    Unavailable,

    #[error("storage error: {0}")]
    Storage(String),
}

impl From<ChessError> for GameError {
    fn from(err: ChessError) -> Self {
        match err {
            ChessError::InvalidCoordinate(text) => GameError::InvalidCoordinate(text),
            ChessError::InvalidFen(reason) => GameError::InvalidPosition(reason),
            ChessError::InvalidMoveNotation(_) | ChessError::IllegalMove => GameError::IllegalMove,
        }
    }
}

impl From<RepositoryError> for GameError {
    fn from(err: RepositoryError) -> Self {
        if err.is_transient() {
            tracing::warn!("Transient store fault: {err}");
            return GameError::Unavailable;
        }
        match err {
            RepositoryError::Missing(_) => GameError::MatchNotFound,
            other => GameError::Storage(other.to_string()),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{0}")]
    BadRequest(String),

    #[error("Not authenticated")]
    Unauthorized,

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    Unavailable(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl From<GameError> for AppError {
    fn from(err: GameError) -> Self {
        let message = err.to_string();
        match err {
            GameError::MatchNotFound => AppError::NotFound(message),
            GameError::InvalidCoordinate(_)
            | GameError::InvalidPosition(_)
            | GameError::IllegalMove => AppError::BadRequest(message),
            GameError::MatchNotJoinable
            | GameError::NotPlayersTurn
            | GameError::MatchNotInProgress => AppError::Conflict(message),
            GameError::Unavailable => AppError::Unavailable(message),
            GameError::Storage(_) => AppError::Internal(message),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::Unauthorized => (StatusCode::UNAUTHORIZED, "Not authenticated".to_string()),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, msg.clone()),
            AppError::Unavailable(msg) => (StatusCode::SERVICE_UNAVAILABLE, msg.clone()),
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {msg}");
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".to_string())
            }
        };

        (status, Json(json!({ "detail": message }))).into_response()
    }
}
