//! Error types for the edit session

use thiserror::Error;

use crate::elements::{ElementKey, ElementType};

/// Errors raised synchronously by the edit and configuration boundaries.
///
/// Submission failures are never reported through this type; they surface
/// as [`crate::coordinator::RunOutcome::Preserved`].
#[derive(Error, Debug)]
pub enum RecalcError {
    #[error("Element '{key}' is a {actual}, beam assignments can only be made on piers")]
    InvalidElementType { key: ElementKey, actual: ElementType },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

/// Result type for edit session operations
pub type RecalcResult<T> = Result<T, RecalcError>;
