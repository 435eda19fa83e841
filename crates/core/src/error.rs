//! Error types for polypack.

use thiserror::Error;

/// Result type alias for polypack operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur before or around a packing solve.
///
/// Search outcomes (infeasible, time-out, invalid engine model) are not errors;
/// they are reported through [`crate::PackingStatus`].
#[derive(Debug, Error)]
pub enum Error {
    /// Invalid shape provided (empty cells, duplicate cells, inconsistent area).
    #[error("Invalid shape: {0}")]
    InvalidShape(String),

    /// Invalid board provided (non-positive dimensions, cells outside the grid).
    #[error("Invalid board: {0}")]
    InvalidBoard(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// A constraint model failed structural validation.
    #[error("Invalid model: {0}")]
    InvalidModel(String),

    /// A requested shape name is not present in the catalog.
    #[error("Unknown shape: {0}")]
    UnknownShape(String),

    /// A layout breaks bounds, overlap or admissibility rules.
    #[error("Layout violation: {0}")]
    LayoutViolation(String),

    /// Serialization error.
    #[cfg(feature = "serde")]
    #[error("Serialization error: {0}")]
    SerializationError(String),
}
