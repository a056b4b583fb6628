//! Registry error types

use thiserror::Error;

/// Errors reported by a registry backend
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Resource in use: {0}")]
    ResourceInUse(String),

    #[error("Already exists: {0}")]
    AlreadyExists(String),

    #[error("Registry API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for RegistryError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

/// Result type for registry operations
pub type Result<T> = std::result::Result<T, RegistryError>;
