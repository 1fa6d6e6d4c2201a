//! # Tuber Seal
//!
//! Threshold encryption for subscriber-gated content. A post's payload is
//! encrypted locally under a fresh content key; the key is split into
//! weighted Shamir shares and wrapped to a group of independent key
//! servers. Decryption requires a signed session, an on-chain approval
//! transaction, and fresh verification by at least a threshold weight of
//! servers.
//!
//! ## Key Types
//!
//! - [`seal_encrypt`] / [`seal_decrypt`] - The two gateways
//! - [`ServerGroup`] - Key servers, weights, and the threshold
//! - [`SessionKey`] - The short-lived per-decrypt capability
//! - [`KeyServer`] - The share-serving protocol trait
//! - [`EncryptedObject`] - The self-describing ciphertext
//!
//! ## Failure Taxonomy
//!
//! Denied, unreachable, and declined are distinct: a server that verified
//! and refused yields [`SealError::AccessDenied`]; too few reachable
//! servers yields [`SealError::ThresholdUnavailable`]; a wallet that
//! refused to sign yields [`SealError::AuthorizationDeclined`]. Callers
//! must surface them differently.

pub mod crypto;
pub mod decrypt;
pub mod encrypt;
pub mod error;
pub mod group;
pub mod object;
pub mod server;
pub mod session;
pub mod shamir;

pub use crypto::{ContentKey, SealNonce, WrappedShare, X25519PublicKey, X25519StaticSecret};
pub use decrypt::seal_decrypt;
pub use encrypt::seal_encrypt;
pub use error::{Result, SealError};
pub use group::{KeyServerEntry, ServerGroup};
pub use object::{EncryptedObject, ServerShares, OBJECT_VERSION};
pub use server::{memory::MemoryKeyServer, KeyServer, ShareRequest};
pub use session::{SessionCertificate, SessionKey};
