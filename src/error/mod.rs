//! Error handling module for Spherecast

use thiserror::Error;

use crate::domain::errors::DomainError;

/// Main error type for Spherecast operations
#[derive(Error, Debug)]
pub enum SphereError {
    /// Domain rule or pipeline failure
    #[error(transparent)]
    Domain(#[from] DomainError),

    /// Configuration file could not be parsed
    #[error("Failed to parse configuration: {0}")]
    ConfigParse(#[from] toml::de::Error),

    /// Image encode/decode error
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for Spherecast operations
pub type SphereResult<T> = std::result::Result<T, SphereError>;
