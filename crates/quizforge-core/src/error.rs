use crate::security::SecurityError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum QuizError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Security(#[from] SecurityError),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),
}

impl QuizError {
    pub fn not_found(what: impl Into<String>) -> Self {
        QuizError::NotFound(what.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        QuizError::Validation(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, QuizError>;
