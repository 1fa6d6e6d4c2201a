//! Error types for Tuber core primitives.

use thiserror::Error;

/// Core errors for envelope encoding and identifier handling.
#[derive(Debug, Error)]
pub enum CoreError {
    /// The envelope bytes did not parse as a valid post envelope.
    #[error("malformed envelope: {0}")]
    MalformedEnvelope(String),

    /// Envelope serialization failed.
    #[error("encoding error: {0}")]
    EncodingError(String),

    /// A byte-level identifier had the wrong shape.
    #[error("invalid identifier: {0}")]
    InvalidIdentifier(String),
}

/// Validation errors raised before any network call is made.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("title must not be empty")]
    EmptyTitle,

    #[error("preview must not be empty")]
    EmptyPreview,

    #[error("content must not be empty")]
    EmptyContent,

    #[error("too many media files: {got} exceeds maximum of {max}")]
    TooManyMediaFiles { got: usize, max: usize },

    #[error("media file {index} is empty")]
    EmptyMediaFile { index: usize },

    #[error("tier duration must be positive")]
    NonPositiveDuration,

    #[error("tier price must be positive")]
    NonPositivePrice,

    #[error("profile already has the maximum of {max} tiers")]
    TooManyTiers { max: usize },
}

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;
