//! Vector store error types.

use scene_types::ItemId;
use thiserror::Error;

/// Errors that can occur during store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Dimension mismatch
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// Item not found
    #[error("Item not found: {0}")]
    NotFound(ItemId),

    /// Session used after close
    #[error("Store session is closed")]
    Closed,

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}
