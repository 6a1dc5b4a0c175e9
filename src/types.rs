//! Shared error and result types for SkillForge

use thiserror::Error;

/// Top-level error type for SkillForge operations
#[derive(Debug, Error)]
pub enum ForgeError {
    /// MongoDB connection or query failures
    #[error("database error: {0}")]
    Database(String),

    /// Authentication and token failures
    #[error("authentication error: {0}")]
    Auth(String),

    /// HTTP transport failures (body read, malformed JSON)
    #[error("http error: {0}")]
    Http(String),

    /// Request payload failed validation
    #[error("validation error: {0}")]
    Validation(String),

    /// Referenced entity does not exist
    #[error("not found: {0}")]
    NotFound(String),

    /// Error message surfaced by the API to the client
    #[error("{0}")]
    Api(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ForgeError>;
