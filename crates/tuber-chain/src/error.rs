//! Error types for chain operations.

use thiserror::Error;

use tuber_core::{ObjectId, ProfileId};

/// Errors that can occur during ledger interactions.
#[derive(Debug, Error)]
pub enum ChainError {
    /// Transaction aborted by the ledger; no state change occurred.
    #[error("transaction aborted: {0}")]
    TxAborted(String),

    /// The user declined to sign. A cancellation, not a system fault.
    #[error("authorization declined")]
    AuthorizationDeclined,

    /// Creator capability not found for the signing address.
    #[error("creator capability not found; is this address a registered creator?")]
    CreatorCapNotFound,

    /// Profile not found on the ledger.
    #[error("profile not found: {0}")]
    ProfileNotFound(ProfileId),

    /// Object not found on the ledger.
    #[error("object not found: {0}")]
    ObjectNotFound(ObjectId),

    /// The capability does not match the target profile.
    #[error("capability does not authorize profile {0}")]
    CapMismatch(ProfileId),

    /// The transaction bytes did not parse.
    #[error("malformed transaction: {0}")]
    MalformedTransaction(String),

    /// The approval transaction does not have the expected call shape.
    #[error("invalid approval transaction: {0}")]
    InvalidApproval(String),

    /// Invalid signature.
    #[error("invalid signature")]
    InvalidSignature,

    /// Invalid public key bytes.
    #[error("invalid public key")]
    InvalidPublicKey,

    /// Serialization failure.
    #[error("serialization error: {0}")]
    SerializationError(String),
}

/// Result type for chain operations.
pub type Result<T> = std::result::Result<T, ChainError>;
