//! Error types for the threshold encryption gateways.
//!
//! Three of these must stay distinguishable all the way to the user:
//! [`SealError::AccessDenied`] (a server refused), [`SealError::ThresholdUnavailable`]
//! (not enough servers reachable), and [`SealError::AuthorizationDeclined`]
//! (the wallet refused to sign). Conflating them turns a user cancellation
//! into a scary failure, or a transient outage into a permanent-looking
//! denial.

use thiserror::Error;

use tuber_chain::ChainError;

/// Errors that can occur during encryption and decryption.
#[derive(Debug, Error)]
pub enum SealError {
    /// Not enough key servers reachable to encrypt at the threshold.
    #[error("encryption unavailable: {0}")]
    EncryptionUnavailable(String),

    /// A key server verified the request and refused it.
    #[error("access denied: {0}")]
    AccessDenied(String),

    /// Too few servers answered to reach the recombination threshold.
    #[error("threshold service unreachable: have weight {have}, need {need}")]
    ThresholdUnavailable { have: u16, need: u16 },

    /// A single key server could not be reached.
    #[error("key server unreachable: {0}")]
    ServerUnreachable(String),

    /// The wallet declined to sign the session challenge.
    #[error("authorization declined")]
    AuthorizationDeclined,

    /// The session capability's time-to-live has elapsed.
    #[error("session expired")]
    SessionExpired,

    /// An encrypted object's bytes did not parse or are internally inconsistent.
    #[error("malformed encrypted object: {0}")]
    MalformedObject(String),

    /// A symmetric cipher operation failed during encryption.
    #[error("encryption error: {0}")]
    EncryptionError(String),

    /// A symmetric cipher operation failed during decryption.
    #[error("decryption error: {0}")]
    DecryptionError(String),

    /// CBOR serialization failure.
    #[error("serialization error: {0}")]
    SerializationError(String),

    /// A ledger read failed while verifying entitlement.
    #[error(transparent)]
    Chain(#[from] ChainError),
}

/// Result type for seal operations.
pub type Result<T> = std::result::Result<T, SealError>;
