//! Error types for the blob store.

use thiserror::Error;

use tuber_chain::ChainError;
use tuber_core::BlobId;

/// Errors that can occur during blob store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The storage host rejected or failed an upload.
    #[error("blob upload failed: {0}")]
    UploadFailed(String),

    /// The requested blob is not known to the storage host.
    #[error("blob not found: {0}")]
    NotFound(BlobId),

    /// The storage host could not serve a download.
    #[error("blob fetch failed: {0}")]
    FetchFailed(String),

    /// The storage host answered with a body we do not understand.
    #[error("unexpected storage response: {0}")]
    UnexpectedResponse(String),

    /// A write-flow phase was driven out of order.
    #[error("write flow out of order: expected {expected}, got {got}")]
    FlowOutOfOrder {
        expected: &'static str,
        got: &'static str,
    },

    /// A chain transaction inside the write flow failed.
    #[error(transparent)]
    Chain(#[from] ChainError),
}

/// Result type for blob store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
