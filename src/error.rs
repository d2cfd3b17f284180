use thiserror::Error;
use warp::http::StatusCode;

use crate::game::{MAX_PLAYERS_PER_ROOM, MAX_ROOMS};

/// Error types for the quiz server
#[derive(Debug, Error)]
pub enum QuizError {
    /// Client input errors
    #[error("{0}")]
    Validation(String),

    /// Room and player lookup errors
    #[error("Room not found")]
    RoomNotFound(String),

    #[error("Player {0} not found in room")]
    PlayerNotFound(String),

    #[error("Username '{0}' is already taken. Please choose another username.")]
    UsernameTaken(String),

    /// Capacity errors
    #[error("Maximum number of rooms ({}) reached. Cannot create more rooms.", MAX_ROOMS)]
    RoomLimitReached,

    #[error("Room is full, only {} members can join in one room", MAX_PLAYERS_PER_ROOM)]
    RoomFull,

    #[error("Game has already started. You cannot join now.")]
    AlreadyStarted,

    /// Connection errors
    #[error("Failed to deliver message to player {0}")]
    DeliveryFailed(String),

    /// Question bank errors
    #[error("Failed to generate questions: {0}")]
    QuestionBank(String),

    #[error("Failed to serialize message: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal server error: {0}")]
    Internal(String),
}

/// Convenience type alias for Results using QuizError
pub type Result<T> = std::result::Result<T, QuizError>;

impl QuizError {
    pub fn validation(msg: impl Into<String>) -> Self {
        QuizError::Validation(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        QuizError::Internal(msg.into())
    }

    /// HTTP status reported by the request/response endpoints
    pub fn status_code(&self) -> StatusCode {
        match self {
            QuizError::Validation(_) => StatusCode::BAD_REQUEST,
            QuizError::RoomNotFound(_) | QuizError::PlayerNotFound(_) => StatusCode::NOT_FOUND,
            QuizError::UsernameTaken(_) => StatusCode::CONFLICT,
            QuizError::RoomLimitReached | QuizError::RoomFull => StatusCode::FORBIDDEN,
            QuizError::AlreadyStarted => StatusCode::UNAUTHORIZED,
            QuizError::DeliveryFailed(_)
            | QuizError::QuestionBank(_)
            | QuizError::Serialization(_)
            | QuizError::Io(_)
            | QuizError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}
