use thiserror::Error;

/// Main error type for the match engine
#[derive(Error, Debug)]
pub enum MatchEngineError {
    /// Database errors
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Malformed JSON input (profile imports)
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Input rejected at the data-provider boundary
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Unknown user id
    #[error("Profile not found: {0}")]
    ProfileNotFound(String),

    /// Unknown swap request, message or skill
    #[error("Not found: {0}")]
    NotFound(String),

    /// The acting user may not touch this record
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// The record is in a state that does not allow the operation
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Store errors that are not plain SQLite failures
    #[error("Store error: {0}")]
    Store(String),
}

impl MatchEngineError {
    pub fn validation(message: impl Into<String>) -> Self {
        MatchEngineError::Validation(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        MatchEngineError::NotFound(message.into())
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        MatchEngineError::Forbidden(message.into())
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        MatchEngineError::Conflict(message.into())
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, MatchEngineError>;
