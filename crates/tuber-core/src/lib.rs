//! # Tuber Core
//!
//! Core primitives for the Tuber content pipeline:
//!
//! - Strong identifier types (object ids, addresses, blob ids, digests)
//! - Policy identifier derivation (profile id plus deployment nonce)
//! - The post envelope codec (UTF-8 JSON)
//! - Pre-network input validation
//!
//! This crate is pure: no I/O, no async, no randomness.

pub mod envelope;
pub mod error;
pub mod policy;
pub mod types;
pub mod validation;

pub use envelope::{MediaKind, MediaRef, PostEnvelope};
pub use error::{CoreError, Result, ValidationError};
pub use policy::{PolicyId, PolicyNonce};
pub use types::{
    Address, BlobId, CapId, ClockId, ObjectId, PostId, ProfileId, SubscriptionId, TxDigest,
};
pub use validation::{
    validate_post_input, validate_tier, MediaUpload, PostInput, MAX_MEDIA_FILES, MAX_TIERS,
};
