//! Error types shared by the scene clustering crates.

use thiserror::Error;

/// Error type for settings loading and shared type validation.
#[derive(Debug, Error)]
pub enum SceneError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Invalid input error
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}
