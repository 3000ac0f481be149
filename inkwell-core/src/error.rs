//! Error types for the Inkwell core library.

use thiserror::Error;

/// Top-level error type for core operations.
#[derive(Error, Debug)]
pub enum InkwellError {
    /// A span did not satisfy `start < end <= text length`.
    #[error("Invalid span [{start}, {end}) for text of {len} chars")]
    InvalidSpan {
        /// Requested start offset.
        start: usize,
        /// Requested end offset.
        end: usize,
        /// Character length of the text the span was checked against.
        len: usize,
    },

    /// Serialization or deserialization failure.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// SQLite journal error.
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Generic I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience Result type alias.
pub type Result<T> = std::result::Result<T, InkwellError>;
