//! Error types for the unified API.

use thiserror::Error;

use tuber_chain::ChainError;
use tuber_core::{CoreError, ValidationError};
use tuber_seal::SealError;
use tuber_store::StoreError;

/// Errors that can occur during publish and view operations.
#[derive(Debug, Error)]
pub enum TuberError {
    /// Input validation failed before any network call.
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Envelope encoding or decoding failed.
    #[error("envelope error: {0}")]
    Core(#[from] CoreError),

    /// Blob storage failed.
    #[error("storage error: {0}")]
    Store(#[from] StoreError),

    /// A ledger read or transaction failed.
    #[error("chain error: {0}")]
    Chain(#[from] ChainError),

    /// Sealing or unsealing failed.
    #[error("seal error: {0}")]
    Seal(#[from] SealError),

    /// The referenced post does not exist.
    #[error("post not found: profile {profile}, post {post}")]
    PostNotFound { profile: String, post: u64 },

    /// A publish was attempted while another is still in flight.
    #[error("a publish is already in progress")]
    PublishInProgress,
}

/// Result type for unified API operations.
pub type Result<T> = std::result::Result<T, TuberError>;
