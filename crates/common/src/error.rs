//! Error types for the Conduit E2E suite

use thiserror::Error;

/// Result type alias using the common Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by fixture loading and the seeding store
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Password hashing error: {0}")]
    PasswordHash(#[from] bcrypt::BcryptError),

    #[error("Resource not found: {kind} with key {key}")]
    NotFound { kind: String, key: String },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Fixture error: {0}")]
    Fixture(String),
}

impl Error {
    pub fn not_found(kind: &str, key: impl Into<String>) -> Self {
        Error::NotFound {
            kind: kind.to_string(),
            key: key.into(),
        }
    }
}
