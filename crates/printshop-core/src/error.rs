//! Error types for printshop.

use thiserror::Error;

use crate::pricing::validator::ValidationReport;

/// Result type alias using printshop's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for printshop operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Database operation failed (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Resource not found (unknown or inactive product, unknown preset)
    #[error("Not found: {0}")]
    NotFound(String),

    /// Client-caused input problem, tied to a request field
    #[error("Validation error on {field}: {message}")]
    Validation { field: String, message: String },

    /// Stored pricing data cannot be used (missing preset, unknown model, bad config)
    #[error("Configuration error: {0}")]
    Config(String),

    /// A preset config write was rejected by the validator
    #[error("Invalid pricing config: {} error(s)", .0.errors.len())]
    InvalidConfig(ValidationReport),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Shorthand for a field-level validation error.
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Validation {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}
